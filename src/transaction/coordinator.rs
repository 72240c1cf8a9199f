//! Transaction coordinator - the propagation state machine.
//!
//! The TransactionCoordinator is the main entry point for transactions.
//! It handles:
//! - Deciding, per propagation policy, whether to join, create, suspend or reject
//! - Creating handles from the resource provider with the declared attributes
//! - Resolving the active connection with read-only enforcement
//! - Commit/rollback/end lifecycle, including restoring suspended transactions

use std::fmt;
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::config::CoordinatorConfig;
use crate::provider::{Connection, ProviderResult, ResourceProvider};
use crate::transaction::context::{ContextId, TransactionContextStore};
use crate::transaction::error::{TransactionError, TransactionResult};
use crate::transaction::handle::TransactionHandle;
use crate::transaction::isolation::IsolationLevel;
use crate::transaction::propagation::Propagation;

/// Handle type produced by a coordinator over provider `P`.
pub type HandleOf<P> = TransactionHandle<<P as ResourceProvider>::Connection>;

/// What `start_transaction` decided for one invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionStatus {
    /// A new handle was created and is active; the caller owns it.
    New {
        /// A previously active handle was parked in the suspended slot.
        suspended: bool,
    },
    /// The already active handle is reused.
    Joined,
    /// The operation runs without a transaction.
    NoTransaction {
        /// A previously active handle was parked in the suspended slot.
        suspended: bool,
    },
}

impl TransactionStatus {
    /// Whether this invocation created the transaction and must finish it.
    pub fn owns_transaction(&self) -> bool {
        matches!(self, TransactionStatus::New { .. })
    }

    /// Whether an outer transaction was suspended.
    pub fn suspended(&self) -> bool {
        matches!(
            self,
            TransactionStatus::New { suspended: true }
                | TransactionStatus::NoTransaction { suspended: true }
        )
    }
}

#[derive(Debug, Clone, Copy)]
enum Outcome {
    Commit,
    Rollback,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Commit => write!(f, "commit"),
            Outcome::Rollback => write!(f, "rollback"),
        }
    }
}

/// Transaction coordinator.
///
/// Thread-safe: can be shared across threads via Clone (uses Arc internally).
pub struct TransactionCoordinator<P: ResourceProvider> {
    inner: Arc<CoordinatorInner<P>>,
}

struct CoordinatorInner<P: ResourceProvider> {
    /// Connection factory shared by every context.
    provider: P,
    /// Active/suspended slots per execution context.
    store: TransactionContextStore<P::Connection>,
    config: CoordinatorConfig,
}

impl<P: ResourceProvider> Clone for TransactionCoordinator<P> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<P: ResourceProvider> TransactionCoordinator<P> {
    /// Create a coordinator with the default configuration.
    pub fn new(provider: P) -> Self {
        Self::with_config(provider, CoordinatorConfig::default())
    }

    /// Create a coordinator with a custom configuration.
    pub fn with_config(provider: P, config: CoordinatorConfig) -> Self {
        Self {
            inner: Arc::new(CoordinatorInner {
                provider,
                store: TransactionContextStore::new(),
                config,
            }),
        }
    }

    /// Get a reference to the underlying provider.
    pub fn provider(&self) -> &P {
        &self.inner.provider
    }

    /// Get the coordinator configuration.
    pub fn config(&self) -> &CoordinatorConfig {
        &self.inner.config
    }

    /// Get the per-context slot store.
    pub fn store(&self) -> &TransactionContextStore<P::Connection> {
        &self.inner.store
    }

    /// Start with `propagation`, read-write, at the configured default isolation.
    pub fn start(&self, ctx: ContextId, propagation: Propagation) -> TransactionResult<TransactionStatus> {
        self.start_transaction(ctx, propagation, false, self.inner.config.default_isolation)
    }

    /// Apply a propagation policy in context `ctx`.
    ///
    /// Exactly one policy branch runs. The returned status tells the caller
    /// whether it owns a new transaction and therefore must commit or roll
    /// it back.
    pub fn start_transaction(
        &self,
        ctx: ContextId,
        propagation: Propagation,
        read_only: bool,
        isolation: IsolationLevel,
    ) -> TransactionResult<TransactionStatus> {
        info!(
            context = %ctx,
            %propagation,
            read_only,
            %isolation,
            "starting transaction"
        );
        let existing = self.existing(ctx);

        match propagation {
            Propagation::Required => match existing {
                Some(handle) => {
                    debug!(context = %ctx, tx = handle.id(), "joining active transaction");
                    Ok(TransactionStatus::Joined)
                }
                None => {
                    self.begin(ctx, read_only, isolation, false)?;
                    Ok(TransactionStatus::New { suspended: false })
                }
            },
            Propagation::RequiresNew => {
                let suspended = match existing {
                    Some(handle) => {
                        self.suspend(ctx, handle);
                        true
                    }
                    None => false,
                };
                if let Err(e) = self.begin(ctx, read_only, isolation, suspended) {
                    if suspended {
                        self.inner.store.restore_suspended(ctx);
                    }
                    return Err(e);
                }
                Ok(TransactionStatus::New { suspended })
            }
            Propagation::Supports => match existing {
                Some(_) => Ok(TransactionStatus::Joined),
                None => {
                    info!(context = %ctx, "no active transaction, proceeding without it");
                    self.inner.store.clear_active(ctx);
                    Ok(TransactionStatus::NoTransaction { suspended: false })
                }
            },
            Propagation::Mandatory => match existing {
                Some(_) => Ok(TransactionStatus::Joined),
                None => {
                    error!(context = %ctx, "MANDATORY propagation requires an existing transaction");
                    Err(TransactionError::NoTransaction { propagation })
                }
            },
            Propagation::Never => match existing {
                Some(handle) => {
                    error!(
                        context = %ctx,
                        tx = handle.id(),
                        "existing transaction detected under NEVER propagation"
                    );
                    Err(TransactionError::TransactionExists { propagation })
                }
                None => {
                    self.inner.store.clear_active(ctx);
                    info!(context = %ctx, "proceeding without a transaction");
                    Ok(TransactionStatus::NoTransaction { suspended: false })
                }
            },
            Propagation::NotSupported => match existing {
                Some(handle) => {
                    self.suspend(ctx, handle);
                    info!(context = %ctx, "proceeding without a transaction");
                    Ok(TransactionStatus::NoTransaction { suspended: true })
                }
                None => Ok(TransactionStatus::NoTransaction { suspended: false }),
            },
        }
    }

    /// Resolve the active transaction of `ctx`.
    ///
    /// With `allow_no_transaction` a missing transaction yields `Ok(None)`
    /// instead of an error. Write operations are refused on read-only handles.
    pub fn get_connection(
        &self,
        ctx: ContextId,
        allow_no_transaction: bool,
        is_write_operation: bool,
    ) -> TransactionResult<Option<HandleOf<P>>> {
        let Some(handle) = self.inner.store.get_active(ctx) else {
            if allow_no_transaction {
                warn!(context = %ctx, "no active transaction available, proceeding without connection");
                return Ok(None);
            }
            return Err(TransactionError::NoActiveTransaction);
        };

        if !handle.is_open() {
            return Err(TransactionError::ConnectionClosed);
        }
        if handle.is_read_only() && is_write_operation {
            return Err(TransactionError::ReadOnlyViolation);
        }
        Ok(Some(handle))
    }

    /// Commit and close the active transaction, then end it.
    ///
    /// A suspended transaction is restored only if this one suspended it;
    /// otherwise it stays parked for the call that did.
    pub fn commit_transaction(&self, ctx: ContextId, is_write_operation: bool) -> TransactionResult<()> {
        self.complete(ctx, Outcome::Commit, is_write_operation)
    }

    /// Roll back and close the active transaction, then end it.
    pub fn rollback_transaction(&self, ctx: ContextId, is_write_operation: bool) -> TransactionResult<()> {
        self.complete(ctx, Outcome::Rollback, is_write_operation)
    }

    /// Restore the suspended transaction, or clear the active slot.
    ///
    /// Idempotent: a second call with nothing suspended finds the slot
    /// already clear.
    pub fn end_transaction(&self, ctx: ContextId) {
        let store = &self.inner.store;
        if !store.has_suspended(ctx) {
            if let Some(active) = store.get_active(ctx) {
                if active.is_open() {
                    warn!(
                        context = %ctx,
                        tx = active.id(),
                        "ending context with an open transaction that was never completed"
                    );
                }
            }
        }

        match store.restore_suspended(ctx) {
            Some(handle) => {
                info!(context = %ctx, tx = handle.id(), "restored suspended transaction");
            }
            None => {
                debug!(context = %ctx, "cleared transaction");
            }
        }
    }

    /// Whether `ctx` has an open active transaction.
    pub fn has_active_transaction(&self, ctx: ContextId) -> bool {
        self.inner
            .store
            .get_active(ctx)
            .is_some_and(|handle| handle.is_open())
    }

    /// Whether `ctx` has a suspended transaction waiting to be restored.
    pub fn is_transaction_suspended(&self, ctx: ContextId) -> bool {
        let suspended = self.inner.store.has_suspended(ctx);
        debug!(context = %ctx, suspended, "transaction suspended state");
        suspended
    }

    /// The active handle of `ctx`, open or not.
    pub fn current_transaction(&self, ctx: ContextId) -> Option<HandleOf<P>> {
        self.inner.store.get_active(ctx)
    }

    /// Active handle of `ctx`; a closed one is dropped from the slot.
    fn existing(&self, ctx: ContextId) -> Option<HandleOf<P>> {
        let handle = self.inner.store.get_active(ctx)?;
        if handle.is_open() {
            Some(handle)
        } else {
            debug!(context = %ctx, tx = handle.id(), "dropping closed transaction from active slot");
            self.inner.store.clear_active(ctx);
            None
        }
    }

    /// Acquire and configure a connection, then make it the active handle.
    fn begin(
        &self,
        ctx: ContextId,
        read_only: bool,
        isolation: IsolationLevel,
        suspended: bool,
    ) -> TransactionResult<HandleOf<P>> {
        let effective = if read_only {
            isolation.at_least(self.inner.config.read_only_floor)
        } else {
            isolation
        };

        let mut conn = self.inner.provider.acquire()?;
        if let Err(e) = configure(&mut conn, read_only, effective) {
            let _ = conn.close();
            return Err(e.into());
        }

        let handle = if suspended {
            TransactionHandle::replacing_suspended(conn, read_only, effective)
        } else {
            TransactionHandle::new(conn, read_only, effective)
        };
        self.inner.store.set_active(ctx, handle.clone());
        info!(
            context = %ctx,
            tx = handle.id(),
            read_only,
            isolation = %effective,
            "new transaction created"
        );
        Ok(handle)
    }

    /// Move `handle` from the active slot to the suspended slot.
    fn suspend(&self, ctx: ContextId, handle: HandleOf<P>) {
        info!(context = %ctx, tx = handle.id(), "suspending existing transaction");
        self.inner.store.clear_active(ctx);
        if let Some(displaced) = self.inner.store.set_suspended(ctx, handle) {
            warn!(
                context = %ctx,
                tx = displaced.id(),
                "suspended transaction displaced before it was resumed, discarding it"
            );
            discard(&displaced);
        }
    }

    fn complete(&self, ctx: ContextId, outcome: Outcome, is_write_operation: bool) -> TransactionResult<()> {
        let (result, resumes) = match self.get_connection(ctx, false, is_write_operation) {
            Ok(Some(handle)) => {
                let finished = match outcome {
                    Outcome::Commit => handle.commit(),
                    Outcome::Rollback => handle.rollback(),
                };
                let closed = handle.close();
                self.inner.store.clear_active(ctx);

                match &finished {
                    Ok(()) => info!(context = %ctx, tx = handle.id(), "transaction {}", outcome),
                    Err(e) => error!(context = %ctx, tx = handle.id(), error = %e, "transaction {} failed", outcome),
                }
                (
                    finished.and(closed).map_err(TransactionError::from),
                    handle.resumes_suspended(),
                )
            }
            Ok(None) => (Err(TransactionError::NoActiveTransaction), true),
            Err(e) => {
                // The handle cannot be finished as asked; do not leak it.
                let resumes = match self.inner.store.clear_active(ctx) {
                    Some(handle) => {
                        discard(&handle);
                        handle.resumes_suspended()
                    }
                    None => true,
                };
                (Err(e), resumes)
            }
        };

        if resumes {
            self.end_transaction(ctx);
        } else if self.inner.store.has_suspended(ctx) {
            debug!(context = %ctx, "leaving suspended transaction to the call that parked it");
        }
        result
    }
}

fn configure<C: Connection>(conn: &mut C, read_only: bool, isolation: IsolationLevel) -> ProviderResult<()> {
    if read_only {
        conn.set_read_only(true)?;
    }
    conn.set_isolation(isolation)
}

/// Roll back and close a handle nobody will finish.
fn discard<C: Connection>(handle: &TransactionHandle<C>) {
    if !handle.is_open() {
        return;
    }
    if let Err(e) = handle.rollback() {
        warn!(tx = handle.id(), error = %e, "rollback of discarded transaction failed");
    }
    if let Err(e) = handle.close() {
        warn!(tx = handle.id(), error = %e, "close of discarded transaction failed");
    }
}

impl<P: ResourceProvider> fmt::Debug for TransactionCoordinator<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransactionCoordinator")
            .field("contexts", &self.inner.store.context_count())
            .field("config", &self.inner.config)
            .finish()
    }
}
