//! Per-execution-context transaction slots.
//!
//! Every execution context (a thread, a task, a request) owns at most one
//! active and one suspended transaction handle. The store maps an opaque
//! [`ContextId`] to those two slots. Contexts never see each other's slots,
//! and entries are evicted as soon as both slots are empty.

use std::collections::HashMap;
use std::fmt;

use parking_lot::Mutex;
use tracing::debug;
use ulid::Ulid;

use crate::transaction::handle::TransactionHandle;

/// Opaque identity of one execution context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextId(Ulid);

impl ContextId {
    /// Mint a fresh context, e.g. for an async task or a request.
    pub fn new() -> Self {
        Self(Ulid::new())
    }

    /// The context bound to the calling OS thread.
    ///
    /// Stable for the lifetime of the thread.
    pub fn current() -> Self {
        thread_local! {
            static CURRENT: ContextId = ContextId::new();
        }
        CURRENT.with(|id| *id)
    }
}

impl Default for ContextId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_string().to_lowercase())
    }
}

struct ContextSlots<C> {
    active: Option<TransactionHandle<C>>,
    suspended: Option<TransactionHandle<C>>,
}

impl<C> ContextSlots<C> {
    fn empty() -> Self {
        Self {
            active: None,
            suspended: None,
        }
    }

    fn is_empty(&self) -> bool {
        self.active.is_none() && self.suspended.is_none()
    }
}

/// Active and suspended transaction handles, keyed by execution context.
pub struct TransactionContextStore<C> {
    slots: Mutex<HashMap<ContextId, ContextSlots<C>>>,
}

impl<C> Default for TransactionContextStore<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> TransactionContextStore<C> {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Apply `f` to the slots of `ctx`, dropping the entry if it ends up empty.
    fn with_slots<R>(&self, ctx: ContextId, f: impl FnOnce(&mut ContextSlots<C>) -> R) -> R {
        let mut map = self.slots.lock();
        let slots = map.entry(ctx).or_insert_with(ContextSlots::empty);
        let result = f(slots);
        if slots.is_empty() {
            map.remove(&ctx);
        }
        result
    }

    /// The active handle of `ctx`, if any.
    pub fn get_active(&self, ctx: ContextId) -> Option<TransactionHandle<C>> {
        self.slots
            .lock()
            .get(&ctx)
            .and_then(|slots| slots.active.clone())
    }

    /// Make `handle` the active transaction of `ctx`.
    pub fn set_active(&self, ctx: ContextId, handle: TransactionHandle<C>) {
        debug!(context = %ctx, "set active transaction");
        self.with_slots(ctx, |slots| slots.active = Some(handle));
    }

    /// Clear the active slot, returning what was there.
    pub fn clear_active(&self, ctx: ContextId) -> Option<TransactionHandle<C>> {
        self.with_slots(ctx, |slots| slots.active.take())
    }

    /// Park `handle` in the suspended slot.
    ///
    /// Returns the handle that previously occupied the slot; it can no longer
    /// be resumed.
    pub fn set_suspended(
        &self,
        ctx: ContextId,
        handle: TransactionHandle<C>,
    ) -> Option<TransactionHandle<C>> {
        debug!(context = %ctx, "set suspended transaction");
        self.with_slots(ctx, |slots| slots.suspended.replace(handle))
    }

    /// Remove and return the suspended handle.
    pub fn take_suspended(&self, ctx: ContextId) -> Option<TransactionHandle<C>> {
        self.with_slots(ctx, |slots| slots.suspended.take())
    }

    /// Move the suspended handle into the active slot in one step.
    ///
    /// With nothing suspended the active slot is cleared instead. Returns the
    /// restored handle.
    pub fn restore_suspended(&self, ctx: ContextId) -> Option<TransactionHandle<C>> {
        self.with_slots(ctx, |slots| {
            slots.active = slots.suspended.take();
            slots.active.clone()
        })
    }

    /// Whether `ctx` has a suspended handle.
    pub fn has_suspended(&self, ctx: ContextId) -> bool {
        self.slots
            .lock()
            .get(&ctx)
            .is_some_and(|slots| slots.suspended.is_some())
    }

    /// Number of contexts with at least one occupied slot.
    pub fn context_count(&self) -> usize {
        self.slots.lock().len()
    }
}

impl<C> fmt::Debug for TransactionContextStore<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransactionContextStore")
            .field("contexts", &self.context_count())
            .finish()
    }
}
