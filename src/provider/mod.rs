//! Resource provider abstraction.
//!
//! The coordinator never talks to a database directly. It acquires
//! connections from a [`ResourceProvider`] and drives them through the
//! [`Connection`] lifecycle: configure, commit or roll back, close.
//!
//! # Usage
//!
//! ```ignore
//! use txscope::provider::{Connection, MemoryProvider, ResourceProvider};
//!
//! let provider = MemoryProvider::new();
//! let mut conn = provider.acquire()?;
//! conn.insert("items", "Ice cream")?;
//! conn.commit()?;
//! conn.close()?;
//! ```

mod error;
mod memory;

pub use error::{ProviderError, ProviderResult};
pub use memory::{MemoryConnection, MemoryProvider, ProviderStats};

use crate::transaction::IsolationLevel;

/// A single backing-store connection.
///
/// Implementations are owned by exactly one transaction handle at a time,
/// so they only need to be `Send`.
pub trait Connection: Send {
    /// Make all work done on this connection durable.
    fn commit(&mut self) -> ProviderResult<()>;

    /// Discard all work done on this connection.
    fn rollback(&mut self) -> ProviderResult<()>;

    /// Release the connection. Closing twice is not an error.
    fn close(&mut self) -> ProviderResult<()>;

    /// Mark the connection read-only.
    fn set_read_only(&mut self, read_only: bool) -> ProviderResult<()>;

    /// Request an isolation level for work on this connection.
    fn set_isolation(&mut self, level: IsolationLevel) -> ProviderResult<()>;

    /// Whether the connection has been closed.
    fn is_closed(&self) -> bool;
}

/// Connection factory shared by every execution context.
///
/// Must be safe for concurrent acquisition; any blocking (pool waits,
/// network round trips) happens inside `acquire`.
pub trait ResourceProvider: Send + Sync {
    type Connection: Connection;

    /// Acquire a fresh connection.
    fn acquire(&self) -> ProviderResult<Self::Connection>;
}

impl<P: ResourceProvider + ?Sized> ResourceProvider for std::sync::Arc<P> {
    type Connection = P::Connection;

    fn acquire(&self) -> ProviderResult<Self::Connection> {
        (**self).acquire()
    }
}
