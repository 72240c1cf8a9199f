//! In-memory resource provider.
//!
//! Tables are named lists of string rows. Each connection stages its writes
//! privately and publishes them on commit, so a rollback leaves the shared
//! tables untouched. Failure injection hooks let callers exercise the
//! coordinator's error paths.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::debug;

use super::error::{ProviderError, ProviderResult};
use super::{Connection, ResourceProvider};
use crate::transaction::IsolationLevel;

/// Counters describing provider activity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProviderStats {
    /// Connections handed out.
    pub acquired: usize,
    /// Successful commits.
    pub commits: usize,
    /// Successful rollbacks.
    pub rollbacks: usize,
    /// Connections closed.
    pub closed: usize,
}

#[derive(Debug, Clone, Copy)]
enum Fault {
    Acquire,
    Commit,
    Rollback,
}

/// Pending injected failures, by kind.
#[derive(Debug, Default)]
struct Faults {
    acquire: usize,
    commit: usize,
    rollback: usize,
}

impl Faults {
    fn slot(&mut self, fault: Fault) -> &mut usize {
        match fault {
            Fault::Acquire => &mut self.acquire,
            Fault::Commit => &mut self.commit,
            Fault::Rollback => &mut self.rollback,
        }
    }
}

struct ProviderInner {
    tables: RwLock<BTreeMap<String, Vec<String>>>,
    max_connections: Option<usize>,
    open: Mutex<usize>,
    created: Mutex<usize>,
    stats: Mutex<ProviderStats>,
    faults: Mutex<Faults>,
}

impl ProviderInner {
    fn release(&self) {
        let mut open = self.open.lock();
        *open = open.saturating_sub(1);
    }
}

/// Shared in-memory store handing out [`MemoryConnection`]s.
#[derive(Clone)]
pub struct MemoryProvider {
    inner: Arc<ProviderInner>,
}

impl Default for MemoryProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryProvider {
    /// Create a provider with no connection limit.
    pub fn new() -> Self {
        Self::build(None)
    }

    /// Create a provider that refuses to have more than `max` open connections.
    pub fn with_max_connections(max: usize) -> Self {
        Self::build(Some(max))
    }

    fn build(max_connections: Option<usize>) -> Self {
        Self {
            inner: Arc::new(ProviderInner {
                tables: RwLock::new(BTreeMap::new()),
                max_connections,
                open: Mutex::new(0),
                created: Mutex::new(0),
                stats: Mutex::new(ProviderStats::default()),
                faults: Mutex::new(Faults::default()),
            }),
        }
    }

    /// Committed rows of a table.
    pub fn rows(&self, table: &str) -> Vec<String> {
        self.inner
            .tables
            .read()
            .get(table)
            .cloned()
            .unwrap_or_default()
    }

    /// Snapshot of the activity counters.
    pub fn stats(&self) -> ProviderStats {
        *self.inner.stats.lock()
    }

    /// Number of connections acquired and not yet closed.
    pub fn open_connections(&self) -> usize {
        *self.inner.open.lock()
    }

    /// Make the next `acquire` fail.
    pub fn fail_next_acquire(&self) {
        self.inner.faults.lock().acquire += 1;
    }

    /// Make the next `commit` on any connection fail.
    pub fn fail_next_commit(&self) {
        self.inner.faults.lock().commit += 1;
    }

    /// Make the next `rollback` on any connection fail.
    pub fn fail_next_rollback(&self) {
        self.inner.faults.lock().rollback += 1;
    }

    fn take_fault(&self, fault: Fault) -> bool {
        let mut faults = self.inner.faults.lock();
        let slot = faults.slot(fault);
        if *slot > 0 {
            *slot -= 1;
            true
        } else {
            false
        }
    }
}

impl ResourceProvider for MemoryProvider {
    type Connection = MemoryConnection;

    fn acquire(&self) -> ProviderResult<MemoryConnection> {
        if self.take_fault(Fault::Acquire) {
            return Err(ProviderError::Acquire("injected acquire failure".into()));
        }

        {
            let mut open = self.inner.open.lock();
            if let Some(max) = self.inner.max_connections {
                if *open >= max {
                    return Err(ProviderError::Exhausted { max });
                }
            }
            *open += 1;
        }

        let id = {
            let mut created = self.inner.created.lock();
            *created += 1;
            *created
        };
        self.inner.stats.lock().acquired += 1;
        debug!(connection = id, "acquired memory connection");

        Ok(MemoryConnection {
            id,
            provider: self.clone(),
            staged: Vec::new(),
            read_only: false,
            isolation: IsolationLevel::Default,
            closed: false,
        })
    }
}

/// Connection to a [`MemoryProvider`].
pub struct MemoryConnection {
    id: usize,
    provider: MemoryProvider,
    staged: Vec<(String, String)>,
    read_only: bool,
    isolation: IsolationLevel,
    closed: bool,
}

impl MemoryConnection {
    /// Provider-assigned connection number.
    pub fn id(&self) -> usize {
        self.id
    }

    /// Isolation level last requested on this connection.
    pub fn isolation(&self) -> IsolationLevel {
        self.isolation
    }

    /// Whether the connection was marked read-only.
    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Stage a row for insertion; it becomes visible to others on commit.
    pub fn insert(&mut self, table: &str, value: impl Into<String>) -> ProviderResult<()> {
        self.ensure_open()?;
        if self.read_only {
            return Err(ProviderError::ReadOnly);
        }
        self.staged.push((table.to_string(), value.into()));
        Ok(())
    }

    /// Committed rows plus this connection's own staged rows.
    pub fn scan(&self, table: &str) -> ProviderResult<Vec<String>> {
        self.ensure_open()?;
        let mut rows = self.provider.rows(table);
        rows.extend(
            self.staged
                .iter()
                .filter(|(t, _)| t == table)
                .map(|(_, v)| v.clone()),
        );
        Ok(rows)
    }

    /// Number of staged, uncommitted rows.
    pub fn pending(&self) -> usize {
        self.staged.len()
    }

    fn ensure_open(&self) -> ProviderResult<()> {
        if self.closed {
            Err(ProviderError::Closed)
        } else {
            Ok(())
        }
    }
}

impl Connection for MemoryConnection {
    fn commit(&mut self) -> ProviderResult<()> {
        self.ensure_open()?;
        if self.provider.take_fault(Fault::Commit) {
            return Err(ProviderError::Backend("injected commit failure".into()));
        }

        let staged = std::mem::take(&mut self.staged);
        {
            let mut tables = self.provider.inner.tables.write();
            for (table, value) in staged {
                tables.entry(table).or_default().push(value);
            }
        }
        self.provider.inner.stats.lock().commits += 1;
        Ok(())
    }

    fn rollback(&mut self) -> ProviderResult<()> {
        self.ensure_open()?;
        if self.provider.take_fault(Fault::Rollback) {
            return Err(ProviderError::Backend("injected rollback failure".into()));
        }

        self.staged.clear();
        self.provider.inner.stats.lock().rollbacks += 1;
        Ok(())
    }

    fn close(&mut self) -> ProviderResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.staged.clear();
        self.provider.inner.release();
        self.provider.inner.stats.lock().closed += 1;
        debug!(connection = self.id, "closed memory connection");
        Ok(())
    }

    fn set_read_only(&mut self, read_only: bool) -> ProviderResult<()> {
        self.ensure_open()?;
        self.read_only = read_only;
        Ok(())
    }

    fn set_isolation(&mut self, level: IsolationLevel) -> ProviderResult<()> {
        self.ensure_open()?;
        self.isolation = level;
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}

impl Drop for MemoryConnection {
    fn drop(&mut self) {
        // Return the slot if the owner never closed us.
        if !self.closed {
            self.provider.inner.release();
        }
    }
}
