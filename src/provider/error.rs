//! Resource provider error types.

use thiserror::Error;

/// Result type for provider operations.
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Errors raised by the backing resource provider.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// Acquiring a connection failed.
    #[error("failed to acquire connection: {0}")]
    Acquire(String),

    /// Every connection the provider may hand out is in use.
    #[error("connection limit reached ({max} open connections)")]
    Exhausted { max: usize },

    /// The connection was used after close.
    #[error("connection is closed")]
    Closed,

    /// A write was issued on a read-only connection.
    #[error("write attempted on a read-only connection")]
    ReadOnly,

    /// Any failure reported by the backing store (commit, rollback, ...).
    #[error("backend error: {0}")]
    Backend(String),
}

impl ProviderError {
    /// Check if the failure happened while acquiring a connection.
    pub fn is_acquire_failure(&self) -> bool {
        matches!(self, ProviderError::Acquire(_) | ProviderError::Exhausted { .. })
    }
}
