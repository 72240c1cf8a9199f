//! Transaction handles.
//!
//! A handle wraps one provider connection together with the attributes it
//! was opened with. Handles are cheap to clone; clones share the connection,
//! and identity comparisons look at that shared allocation.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use ulid::Ulid;

use crate::provider::{Connection, ProviderResult};
use crate::transaction::isolation::IsolationLevel;

/// An open (or formerly open) transaction on one backing connection.
pub struct TransactionHandle<C> {
    inner: Arc<HandleInner<C>>,
}

struct HandleInner<C> {
    /// Unique transaction ID.
    id: String,
    /// Whether the connection was marked read-only.
    read_only: bool,
    /// Isolation level requested from the provider.
    isolation: IsolationLevel,
    /// When the transaction started.
    started_at: DateTime<Utc>,
    /// Whether opening this handle parked an outer transaction.
    resumes_suspended: bool,
    connection: Mutex<C>,
}

impl<C> Clone for TransactionHandle<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C> TransactionHandle<C> {
    /// Wrap an already configured connection.
    pub(crate) fn new(connection: C, read_only: bool, isolation: IsolationLevel) -> Self {
        Self::build(connection, read_only, isolation, false)
    }

    /// Wrap a connection opened in place of a now suspended transaction.
    pub(crate) fn replacing_suspended(connection: C, read_only: bool, isolation: IsolationLevel) -> Self {
        Self::build(connection, read_only, isolation, true)
    }

    fn build(connection: C, read_only: bool, isolation: IsolationLevel, resumes_suspended: bool) -> Self {
        Self {
            inner: Arc::new(HandleInner {
                id: Ulid::new().to_string().to_lowercase(),
                read_only,
                isolation,
                started_at: Utc::now(),
                resumes_suspended,
                connection: Mutex::new(connection),
            }),
        }
    }

    /// Get the transaction ID.
    pub fn id(&self) -> &str {
        &self.inner.id
    }

    /// Whether writes are forbidden through this handle.
    pub fn is_read_only(&self) -> bool {
        self.inner.read_only
    }

    /// Get the isolation level requested for this handle.
    pub fn isolation(&self) -> IsolationLevel {
        self.inner.isolation
    }

    /// When the handle was created.
    pub fn started_at(&self) -> DateTime<Utc> {
        self.inner.started_at
    }

    /// Whether completing this handle hands control back to the transaction
    /// it suspended.
    pub fn resumes_suspended(&self) -> bool {
        self.inner.resumes_suspended
    }

    /// Whether `other` is the very same transaction (not merely equal ids).
    pub fn same_as(&self, other: &TransactionHandle<C>) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Run `f` with exclusive access to the backing connection.
    ///
    /// The connection stays locked for the duration of `f`; do not commit or
    /// roll back the same transaction from inside it.
    pub fn with_connection<R>(&self, f: impl FnOnce(&mut C) -> R) -> R {
        let mut conn = self.inner.connection.lock();
        f(&mut conn)
    }
}

impl<C: Connection> TransactionHandle<C> {
    /// Whether the backing connection is still open.
    pub fn is_open(&self) -> bool {
        !self.inner.connection.lock().is_closed()
    }

    pub(crate) fn commit(&self) -> ProviderResult<()> {
        self.inner.connection.lock().commit()
    }

    pub(crate) fn rollback(&self) -> ProviderResult<()> {
        self.inner.connection.lock().rollback()
    }

    pub(crate) fn close(&self) -> ProviderResult<()> {
        self.inner.connection.lock().close()
    }
}

impl<C> PartialEq for TransactionHandle<C> {
    fn eq(&self, other: &Self) -> bool {
        self.same_as(other)
    }
}

impl<C> Eq for TransactionHandle<C> {}

impl<C> fmt::Debug for TransactionHandle<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransactionHandle")
            .field("id", &self.inner.id)
            .field("read_only", &self.inner.read_only)
            .field("isolation", &self.inner.isolation)
            .finish()
    }
}
