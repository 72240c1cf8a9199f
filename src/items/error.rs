//! Item service error types.

use thiserror::Error;

use crate::intercept::{InvocationError, InvocationResult};
use crate::provider::ProviderError;
use crate::transaction::TransactionError;

/// Result type for item service calls.
pub type ItemResult<T> = InvocationResult<T, ItemError>;

/// Errors raised by item operations.
#[derive(Debug, Error)]
pub enum ItemError {
    #[error("transaction error: {0}")]
    Transaction(#[from] TransactionError),

    #[error("storage error: {0}")]
    Provider(#[from] ProviderError),

    /// The nested audit call failed; its rollback failure, if any, is kept.
    #[error("audit record failed: {0}")]
    Audit(#[source] Box<InvocationError<ItemError>>),

    /// The operation refused the item after writing it.
    #[error("item rejected: {0}")]
    Rejected(String),
}
