//! Transaction error types.

use thiserror::Error;

use crate::provider::ProviderError;
use crate::transaction::propagation::Propagation;

/// Result type for transaction operations.
pub type TransactionResult<T> = Result<T, TransactionError>;

/// Errors that can occur while coordinating transactions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransactionError {
    /// The policy requires an existing transaction but none is active.
    #[error("{propagation} propagation: existing transaction required but not found")]
    NoTransaction { propagation: Propagation },

    /// The policy forbids a transaction but one is active.
    #[error("transaction exists, but {propagation} propagation specified")]
    TransactionExists { propagation: Propagation },

    /// A connection was requested in strict mode with no active transaction.
    #[error("no active transaction available")]
    NoActiveTransaction,

    /// The active transaction's connection is already closed.
    #[error("connection is already closed")]
    ConnectionClosed,

    /// A write was attempted through a read-only transaction.
    #[error("write operation attempted on a read-only transaction")]
    ReadOnlyViolation,

    /// A write operation was declared read-only and rejected before start.
    #[error("operation {operation} is a write but was declared read-only")]
    ReadOnlyTransaction { operation: String },

    /// Backing resource provider error.
    #[error("resource provider error: {0}")]
    Provider(#[from] ProviderError),
}

impl TransactionError {
    /// Check if this error is a propagation precondition failure.
    pub fn is_propagation_violation(&self) -> bool {
        matches!(
            self,
            TransactionError::NoTransaction { .. } | TransactionError::TransactionExists { .. }
        )
    }

    /// Check if this error came from resolving the active connection.
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            TransactionError::NoActiveTransaction
                | TransactionError::ConnectionClosed
                | TransactionError::ReadOnlyViolation
        )
    }
}
