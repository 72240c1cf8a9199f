//! Transactional item operations.

use tracing::warn;

use crate::config::TransactionalConfig;
use crate::intercept::{Invocation, TransactionAttributes, TransactionInterceptor};
use crate::items::error::{ItemError, ItemResult};
use crate::provider::MemoryProvider;
use crate::transaction::{ContextId, Propagation, TransactionCoordinator, TransactionError};

/// Table every item operation works on.
pub const ITEMS: &str = "items";

/// Item operations, each run under its declared attributes.
pub struct ItemService {
    interceptor: TransactionInterceptor<MemoryProvider>,
}

impl ItemService {
    /// Service using the built-in declarations.
    pub fn new(provider: MemoryProvider) -> Self {
        Self::from_config(provider, Self::declarations())
    }

    /// Service configured from a loaded [`TransactionalConfig`].
    pub fn from_config(provider: MemoryProvider, config: TransactionalConfig) -> Self {
        Self {
            interceptor: TransactionInterceptor::from_config(provider, config),
        }
    }

    /// Declared attributes of every item operation.
    pub fn declarations() -> TransactionalConfig {
        TransactionalConfig::default()
            .operation("get_items", TransactionAttributes::read_only())
            .operation("add_item_with_required", TransactionAttributes::new())
            .operation(
                "add_item_with_requires_new",
                TransactionAttributes::with(Propagation::RequiresNew),
            )
            .operation("add_item_with_never", TransactionAttributes::with(Propagation::Never))
            .operation(
                "add_item_with_mandatory",
                TransactionAttributes::with(Propagation::Mandatory),
            )
            .operation(
                "add_item_with_not_supported",
                TransactionAttributes::with(Propagation::NotSupported),
            )
            .operation(
                "add_item_with_supports",
                TransactionAttributes::with(Propagation::Supports),
            )
            .operation("add_item_then_fail", TransactionAttributes::new())
            .operation("add_rejected_item_with_audit", TransactionAttributes::new())
    }

    /// Get the interceptor.
    pub fn interceptor(&self) -> &TransactionInterceptor<MemoryProvider> {
        &self.interceptor
    }

    /// Get the coordinator.
    pub fn coordinator(&self) -> &TransactionCoordinator<MemoryProvider> {
        self.interceptor.coordinator()
    }

    /// All items visible to the current transaction.
    pub fn get_items(&self, ctx: ContextId) -> ItemResult<Vec<String>> {
        self.interceptor.call(ctx, "get_items", |inv| -> Result<_, ItemError> {
            let handle = inv
                .connection(false)?
                .ok_or(TransactionError::NoActiveTransaction)?;
            Ok(handle.with_connection(|conn| conn.scan(ITEMS))?)
        })
    }

    pub fn add_item_with_required(&self, ctx: ContextId, item: &str) -> ItemResult<()> {
        self.interceptor
            .call(ctx, "add_item_with_required", |inv| add_item(inv, item, false))
    }

    pub fn add_item_with_requires_new(&self, ctx: ContextId, item: &str) -> ItemResult<()> {
        self.interceptor
            .call(ctx, "add_item_with_requires_new", |inv| add_item(inv, item, false))
    }

    pub fn add_item_with_never(&self, ctx: ContextId, item: &str) -> ItemResult<()> {
        self.interceptor
            .call(ctx, "add_item_with_never", |inv| add_item(inv, item, true))
    }

    pub fn add_item_with_mandatory(&self, ctx: ContextId, item: &str) -> ItemResult<()> {
        self.interceptor
            .call(ctx, "add_item_with_mandatory", |inv| add_item(inv, item, false))
    }

    pub fn add_item_with_not_supported(&self, ctx: ContextId, item: &str) -> ItemResult<()> {
        self.interceptor
            .call(ctx, "add_item_with_not_supported", |inv| add_item(inv, item, true))
    }

    pub fn add_item_with_supports(&self, ctx: ContextId, item: &str) -> ItemResult<()> {
        self.interceptor
            .call(ctx, "add_item_with_supports", |inv| add_item(inv, item, true))
    }

    /// Write the item, then refuse it; the write must not survive.
    pub fn add_item_then_fail(&self, ctx: ContextId, item: &str) -> ItemResult<()> {
        self.interceptor.call(ctx, "add_item_then_fail", |inv| -> Result<(), ItemError> {
            add_item(inv, item, false)?;
            Err(ItemError::Rejected(item.to_string()))
        })
    }

    /// Write the item and an audit record in its own transaction, then
    /// refuse the item. Only the audit record survives.
    pub fn add_rejected_item_with_audit(&self, ctx: ContextId, item: &str) -> ItemResult<()> {
        self.interceptor
            .call(ctx, "add_rejected_item_with_audit", |inv| -> Result<(), ItemError> {
                add_item(inv, item, false)?;
                self.add_item_with_requires_new(inv.context(), &format!("audit: rejected {}", item))
                    .map_err(|e| ItemError::Audit(Box::new(e)))?;
                Err(ItemError::Rejected(item.to_string()))
            })
    }
}

fn add_item(
    inv: &Invocation<'_, MemoryProvider>,
    item: &str,
    allow_no_transaction: bool,
) -> Result<(), ItemError> {
    let Some(handle) = inv.connection(allow_no_transaction)? else {
        warn!(operation = inv.operation(), "no active transaction, skipping database operation");
        return Ok(());
    };
    handle.with_connection(|conn| conn.insert(ITEMS, item))?;
    Ok(())
}
