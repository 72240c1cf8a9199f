//! Invocation error types.

use thiserror::Error;

use crate::transaction::TransactionError;

/// Result type of an intercepted invocation whose operation fails with `E`.
pub type InvocationResult<T, E> = Result<T, InvocationError<E>>;

/// Failure of an intercepted invocation.
#[derive(Debug, Error)]
pub enum InvocationError<E> {
    /// The coordinator refused or failed the transaction itself.
    #[error("transaction error: {0}")]
    Transaction(#[from] TransactionError),

    /// The wrapped operation failed. If rolling back its transaction failed
    /// as well, that error rides along.
    #[error("operation failed: {source}")]
    Operation {
        #[source]
        source: E,
        rollback: Option<TransactionError>,
    },
}

impl<E> InvocationError<E> {
    /// The coordinator error, if this is not an operation failure.
    pub fn transaction_error(&self) -> Option<&TransactionError> {
        match self {
            InvocationError::Transaction(e) => Some(e),
            InvocationError::Operation { .. } => None,
        }
    }

    /// The wrapped operation's own error.
    pub fn operation_error(&self) -> Option<&E> {
        match self {
            InvocationError::Operation { source, .. } => Some(source),
            InvocationError::Transaction(_) => None,
        }
    }

    /// The rollback failure attached to an operation error.
    pub fn rollback_error(&self) -> Option<&TransactionError> {
        match self {
            InvocationError::Operation { rollback, .. } => rollback.as_ref(),
            InvocationError::Transaction(_) => None,
        }
    }
}

impl<E: From<TransactionError>> InvocationError<E> {
    /// Collapse into the operation's error type.
    ///
    /// An attached rollback failure is dropped; it was already logged when
    /// it happened.
    pub fn into_inner(self) -> E {
        match self {
            InvocationError::Transaction(e) => E::from(e),
            InvocationError::Operation { source, .. } => source,
        }
    }
}
