//! The around-protocol for transactional operations.
//!
//! `TransactionInterceptor::invoke` is what an interception layer (decorator,
//! middleware, or a plain wrapper function) runs around one call:
//!
//! 1. classify the operation as write or read
//! 2. reject a write declared read-only, before anything starts
//! 3. start (or join, suspend, skip) a transaction
//! 4. run the operation
//! 5. commit on success, or roll back on failure, if this invocation owns
//!    the transaction
//! 6. end, restoring the transaction this call suspended, if any
//!
//! Ownership of the transaction lives in the [`Invocation`] on the stack,
//! never in shared state keyed by operation name.

use std::collections::BTreeMap;

use tracing::{error, info};

use crate::config::TransactionalConfig;
use crate::intercept::attributes::TransactionAttributes;
use crate::intercept::classify::{OperationClassifier, WriteConvention};
use crate::intercept::error::{InvocationError, InvocationResult};
use crate::provider::ResourceProvider;
use crate::transaction::{
    ContextId, HandleOf, TransactionCoordinator, TransactionError, TransactionResult,
    TransactionStatus,
};

/// One in-flight call of a transactional operation.
pub struct Invocation<'a, P: ResourceProvider> {
    coordinator: &'a TransactionCoordinator<P>,
    context: ContextId,
    operation: &'a str,
    is_write: bool,
    status: TransactionStatus,
}

impl<'a, P: ResourceProvider> Invocation<'a, P> {
    /// The execution context this call runs in; pass it to nested calls.
    pub fn context(&self) -> ContextId {
        self.context
    }

    /// Name of the invoked operation.
    pub fn operation(&self) -> &str {
        self.operation
    }

    /// Whether the operation was classified as a write.
    pub fn is_write(&self) -> bool {
        self.is_write
    }

    /// What `start_transaction` decided for this call.
    pub fn status(&self) -> TransactionStatus {
        self.status
    }

    /// Whether this call created the transaction it runs in.
    pub fn owns_transaction(&self) -> bool {
        self.status.owns_transaction()
    }

    /// The transaction this call runs in, resolved with its write classification.
    pub fn connection(&self, allow_no_transaction: bool) -> TransactionResult<Option<HandleOf<P>>> {
        self.coordinator
            .get_connection(self.context, allow_no_transaction, self.is_write)
    }

    /// The coordinator driving this call.
    pub fn coordinator(&self) -> &TransactionCoordinator<P> {
        self.coordinator
    }
}

/// Finishes an invocation whose operation unwound instead of returning.
struct UnwindGuard<'a, P: ResourceProvider> {
    coordinator: &'a TransactionCoordinator<P>,
    context: ContextId,
    is_write: bool,
    status: TransactionStatus,
    armed: bool,
}

impl<P: ResourceProvider> Drop for UnwindGuard<'_, P> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        if self.status.owns_transaction() {
            error!(context = %self.context, "operation panicked, rolling back transaction");
            if let Err(e) = self.coordinator.rollback_transaction(self.context, self.is_write) {
                error!(context = %self.context, error = %e, "rollback after panic failed");
            }
        } else if self.status.suspended() {
            self.coordinator.end_transaction(self.context);
        }
    }
}

/// Runs operations under their declared transactional attributes.
pub struct TransactionInterceptor<P: ResourceProvider, W = WriteConvention> {
    coordinator: TransactionCoordinator<P>,
    classifier: W,
    operations: BTreeMap<String, TransactionAttributes>,
}

impl<P: ResourceProvider> TransactionInterceptor<P> {
    /// Interceptor with the default write convention and no declared operations.
    pub fn new(coordinator: TransactionCoordinator<P>) -> Self {
        Self::with_classifier(coordinator, WriteConvention::default())
    }

    /// Interceptor over `provider` set up entirely from `config`: coordinator
    /// settings, write convention and operation declarations.
    pub fn from_config(provider: P, config: TransactionalConfig) -> Self {
        Self {
            coordinator: TransactionCoordinator::with_config(provider, config.coordinator),
            classifier: config.write_convention,
            operations: config.operations,
        }
    }
}

impl<P: ResourceProvider, W: OperationClassifier> TransactionInterceptor<P, W> {
    /// Interceptor with a custom write classifier.
    pub fn with_classifier(coordinator: TransactionCoordinator<P>, classifier: W) -> Self {
        Self {
            coordinator,
            classifier,
            operations: BTreeMap::new(),
        }
    }

    /// Declare the attributes of an operation.
    pub fn declare(mut self, operation: impl Into<String>, attributes: TransactionAttributes) -> Self {
        self.operations.insert(operation.into(), attributes);
        self
    }

    /// Get the coordinator.
    pub fn coordinator(&self) -> &TransactionCoordinator<P> {
        &self.coordinator
    }

    /// Declared attributes of `operation`, or the defaults.
    pub fn attributes_for(&self, operation: &str) -> TransactionAttributes {
        self.operations.get(operation).copied().unwrap_or_default()
    }

    /// Whether `operation` is classified as a write.
    pub fn is_write(&self, operation: &str) -> bool {
        self.classifier.is_write(operation)
    }

    /// Run a declared operation under its registered attributes.
    pub fn call<T, E, F>(&self, ctx: ContextId, operation: &str, f: F) -> InvocationResult<T, E>
    where
        F: FnOnce(&Invocation<'_, P>) -> Result<T, E>,
    {
        let attributes = self.attributes_for(operation);
        self.invoke(ctx, operation, &attributes, f)
    }

    /// Run `f` as operation `operation` with `attributes`.
    pub fn invoke<T, E, F>(
        &self,
        ctx: ContextId,
        operation: &str,
        attributes: &TransactionAttributes,
        f: F,
    ) -> InvocationResult<T, E>
    where
        F: FnOnce(&Invocation<'_, P>) -> Result<T, E>,
    {
        let is_write = self.classifier.is_write(operation);
        info!(
            context = %ctx,
            operation,
            propagation = %attributes.propagation,
            read_only = attributes.read_only,
            "applying transactional attributes"
        );

        if is_write && attributes.read_only {
            error!(context = %ctx, operation, "write operation declared read-only");
            return Err(TransactionError::ReadOnlyTransaction {
                operation: operation.to_string(),
            }
            .into());
        }

        let status = self.coordinator.start_transaction(
            ctx,
            attributes.propagation,
            attributes.read_only,
            attributes.isolation,
        )?;

        let invocation = Invocation {
            coordinator: &self.coordinator,
            context: ctx,
            operation,
            is_write,
            status,
        };
        let mut guard = UnwindGuard {
            coordinator: &self.coordinator,
            context: ctx,
            is_write,
            status,
            armed: true,
        };
        let outcome = f(&invocation);
        guard.armed = false;

        match outcome {
            Ok(value) => {
                self.finish_success(&invocation)?;
                Ok(value)
            }
            Err(source) => {
                let rollback = self.finish_failure(&invocation).err();
                Err(InvocationError::Operation { source, rollback })
            }
        }
    }

    fn finish_success(&self, invocation: &Invocation<'_, P>) -> TransactionResult<()> {
        match invocation.status {
            TransactionStatus::New { .. } => {
                self.coordinator
                    .commit_transaction(invocation.context, invocation.is_write)?;
                info!(
                    context = %invocation.context,
                    operation = invocation.operation,
                    "transaction committed"
                );
            }
            TransactionStatus::NoTransaction { suspended: true } => {
                self.coordinator.end_transaction(invocation.context);
            }
            TransactionStatus::NoTransaction { suspended: false } | TransactionStatus::Joined => {}
        }
        Ok(())
    }

    fn finish_failure(&self, invocation: &Invocation<'_, P>) -> TransactionResult<()> {
        match invocation.status {
            TransactionStatus::New { .. } => {
                let result = self
                    .coordinator
                    .rollback_transaction(invocation.context, invocation.is_write);
                match &result {
                    Ok(()) => info!(
                        context = %invocation.context,
                        operation = invocation.operation,
                        "transaction rolled back"
                    ),
                    Err(e) => error!(
                        context = %invocation.context,
                        operation = invocation.operation,
                        error = %e,
                        "rollback failed"
                    ),
                }
                result
            }
            TransactionStatus::NoTransaction { suspended: true } => {
                self.coordinator.end_transaction(invocation.context);
                Ok(())
            }
            TransactionStatus::NoTransaction { suspended: false } | TransactionStatus::Joined => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::panic::{self, AssertUnwindSafe};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;

    use super::*;
    use crate::config::CoordinatorConfig;
    use crate::provider::{MemoryProvider, ProviderError};
    use crate::transaction::{IsolationLevel, Propagation};

    type Interceptor = TransactionInterceptor<MemoryProvider>;

    fn setup() -> (MemoryProvider, Interceptor) {
        let provider = MemoryProvider::new();
        let interceptor = TransactionInterceptor::new(TransactionCoordinator::new(provider.clone()));
        (provider, interceptor)
    }

    fn insert(inv: &Invocation<'_, MemoryProvider>, item: &str) -> TransactionResult<()> {
        let handle = inv.connection(false)?.ok_or(TransactionError::NoActiveTransaction)?;
        handle.with_connection(|c| c.insert("items", item))?;
        Ok(())
    }

    #[test]
    fn test_required_commits() {
        let (provider, interceptor) = setup();
        let ctx = ContextId::new();

        let owned = interceptor
            .invoke(ctx, "add_item", &TransactionAttributes::new(), |inv| {
                insert(inv, "Ice cream")?;
                Ok::<_, TransactionError>(inv.owns_transaction())
            })
            .unwrap();

        assert!(owned);
        assert_eq!(provider.rows("items"), vec!["Ice cream".to_string()]);
        assert_eq!(provider.stats().commits, 1);
        assert!(interceptor.coordinator().current_transaction(ctx).is_none());
    }

    #[test]
    fn test_read_only_write_rejected_before_start() {
        let (provider, interceptor) = setup();
        let ctx = ContextId::new();
        let mut called = false;

        let err = interceptor
            .invoke(ctx, "update", &TransactionAttributes::read_only(), |_| {
                called = true;
                Ok::<_, TransactionError>(())
            })
            .unwrap_err();

        assert!(!called);
        assert!(matches!(
            err.transaction_error(),
            Some(TransactionError::ReadOnlyTransaction { .. })
        ));
        assert_eq!(provider.stats().acquired, 0);
    }

    #[test]
    fn test_failure_rolls_back_once_and_reraises() {
        let (provider, interceptor) = setup();
        let ctx = ContextId::new();

        let err = interceptor
            .invoke(ctx, "add_item", &TransactionAttributes::new(), |inv| {
                insert(inv, "Apple").map_err(|e| e.to_string())?;
                Err::<(), _>("out of stock".to_string())
            })
            .unwrap_err();

        assert_eq!(err.operation_error().map(String::as_str), Some("out of stock"));
        assert!(err.rollback_error().is_none());
        assert_eq!(provider.stats().rollbacks, 1);
        assert_eq!(provider.stats().commits, 0);
        assert!(provider.rows("items").is_empty());
        assert!(interceptor.coordinator().current_transaction(ctx).is_none());
    }

    #[test]
    fn test_rollback_failure_surfaces_both() {
        let (provider, interceptor) = setup();
        let ctx = ContextId::new();
        provider.fail_next_rollback();

        let err = interceptor
            .invoke(ctx, "add_item", &TransactionAttributes::new(), |_| {
                Err::<(), _>("broken".to_string())
            })
            .unwrap_err();

        assert_eq!(err.operation_error().map(String::as_str), Some("broken"));
        assert!(matches!(
            err.rollback_error(),
            Some(TransactionError::Provider(ProviderError::Backend(_)))
        ));
        assert_eq!(provider.open_connections(), 0);
    }

    #[test]
    fn test_commit_failure_reported() {
        let (provider, interceptor) = setup();
        let ctx = ContextId::new();
        provider.fail_next_commit();

        let err = interceptor
            .invoke(ctx, "add_item", &TransactionAttributes::new(), |inv| {
                insert(inv, "Melon")
            })
            .unwrap_err();

        assert!(matches!(
            err.transaction_error(),
            Some(TransactionError::Provider(_))
        ));
        assert!(provider.rows("items").is_empty());
        assert!(interceptor.coordinator().current_transaction(ctx).is_none());
    }

    #[test]
    fn test_nested_requires_new_restores_outer() {
        let (provider, interceptor) = setup();
        let ctx = ContextId::new();
        let nested = TransactionAttributes::with(Propagation::RequiresNew);

        interceptor
            .invoke(ctx, "add_outer", &TransactionAttributes::new(), |outer| {
                let before = outer.connection(false)?.unwrap();
                insert(outer, "Snack")?;

                interceptor
                    .invoke(outer.context(), "add_inner", &nested, |inner| {
                        assert_eq!(inner.status(), TransactionStatus::New { suspended: true });
                        let current = inner.connection(false)?.unwrap();
                        assert!(!current.same_as(&before));
                        insert(inner, "Coffee")
                    })
                    .map_err(|e| e.transaction_error().cloned().unwrap())?;

                let after = outer.connection(false)?.unwrap();
                assert!(after.same_as(&before));
                Ok::<_, TransactionError>(())
            })
            .unwrap();

        assert_eq!(provider.stats().commits, 2);
        assert_eq!(provider.rows("items"), vec!["Coffee".to_string(), "Snack".to_string()]);
        assert_eq!(interceptor.coordinator().store().context_count(), 0);
    }

    #[test]
    fn test_inner_commit_survives_outer_rollback() {
        let (provider, interceptor) = setup();
        let ctx = ContextId::new();
        let nested = TransactionAttributes::with(Propagation::RequiresNew);

        let result = interceptor.invoke(ctx, "add_outer", &TransactionAttributes::new(), |outer| {
            insert(outer, "Lost").map_err(|e| e.to_string())?;
            interceptor
                .invoke(outer.context(), "add_audit", &nested, |inner| insert(inner, "Audit"))
                .map_err(|e| e.to_string())?;
            Err::<(), _>("abort".to_string())
        });

        assert!(result.is_err());
        assert_eq!(provider.rows("items"), vec!["Audit".to_string()]);
    }

    #[test]
    fn test_joined_invocation_leaves_outer_untouched() {
        let (provider, interceptor) = setup();
        let ctx = ContextId::new();

        interceptor
            .invoke(ctx, "add_outer", &TransactionAttributes::new(), |outer| {
                let before = outer.connection(false)?.unwrap();
                for policy in [Propagation::Required, Propagation::Supports, Propagation::Mandatory] {
                    interceptor
                        .invoke(outer.context(), "add_joined", &TransactionAttributes::with(policy), |inner| {
                            assert_eq!(inner.status(), TransactionStatus::Joined);
                            assert!(!inner.owns_transaction());
                            insert(inner, "Joined")
                        })
                        .map_err(|e| e.transaction_error().cloned().unwrap())?;
                    assert!(outer.connection(false)?.unwrap().same_as(&before));
                }
                Ok::<_, TransactionError>(())
            })
            .unwrap();

        assert_eq!(provider.stats().acquired, 1);
        assert_eq!(provider.stats().commits, 1);
        assert_eq!(provider.rows("items").len(), 3);
    }

    #[test]
    fn test_not_supported_restores_outer() {
        let (provider, interceptor) = setup();
        let ctx = ContextId::new();

        interceptor
            .invoke(ctx, "add_outer", &TransactionAttributes::new(), |outer| {
                let before = outer.connection(false)?.unwrap();
                interceptor
                    .invoke(
                        outer.context(),
                        "add_untracked",
                        &TransactionAttributes::with(Propagation::NotSupported),
                        |inner| {
                            assert!(inner.connection(true)?.is_none());
                            Ok::<_, TransactionError>(())
                        },
                    )
                    .map_err(|e| e.transaction_error().cloned().unwrap())?;
                assert!(outer.connection(false)?.unwrap().same_as(&before));
                Ok::<_, TransactionError>(())
            })
            .unwrap();

        assert_eq!(provider.stats().commits, 1);
    }

    /// REQUIRED -> NOT_SUPPORTED -> `innermost`, where `innermost` neither
    /// joins nor suspends. Returns the committed rows.
    fn run_under_not_supported(innermost: Propagation, fail: bool) -> Vec<String> {
        let (provider, interceptor) = setup();
        let ctx = ContextId::new();
        let untracked = TransactionAttributes::with(Propagation::NotSupported);

        interceptor
            .invoke(ctx, "add_outer", &TransactionAttributes::new(), |outer| {
                let before = outer.connection(false)?.unwrap();
                insert(outer, "Outer")?;

                interceptor
                    .invoke(outer.context(), "add_untracked", &untracked, |middle| {
                        let nested = interceptor.invoke(
                            middle.context(),
                            "add_nested",
                            &TransactionAttributes::with(innermost),
                            |inner| -> Result<(), TransactionError> {
                                assert_eq!(
                                    inner.status(),
                                    TransactionStatus::NoTransaction { suspended: false }
                                );
                                assert!(inner.connection(true)?.is_none());
                                if fail {
                                    Err(TransactionError::NoActiveTransaction)
                                } else {
                                    Ok(())
                                }
                            },
                        );
                        assert_eq!(nested.is_err(), fail);

                        // Still running without a transaction.
                        assert!(middle.connection(true)?.is_none());
                        assert!(middle.coordinator().is_transaction_suspended(middle.context()));
                        Ok::<_, TransactionError>(())
                    })
                    .map_err(InvocationError::into_inner)?;

                assert!(outer.connection(false)?.unwrap().same_as(&before));
                Ok::<_, TransactionError>(())
            })
            .unwrap();

        assert_eq!(interceptor.coordinator().store().context_count(), 0);
        assert_eq!(provider.open_connections(), 0);
        provider.rows("items")
    }

    #[test]
    fn test_supports_under_not_supported_keeps_outer_suspended() {
        assert_eq!(run_under_not_supported(Propagation::Supports, false), vec!["Outer".to_string()]);
        assert_eq!(run_under_not_supported(Propagation::Supports, true), vec!["Outer".to_string()]);
    }

    #[test]
    fn test_never_under_not_supported_keeps_outer_suspended() {
        assert_eq!(run_under_not_supported(Propagation::Never, false), vec!["Outer".to_string()]);
        assert_eq!(run_under_not_supported(Propagation::Never, true), vec!["Outer".to_string()]);
    }

    #[test]
    fn test_not_supported_under_not_supported_keeps_outer_suspended() {
        assert_eq!(
            run_under_not_supported(Propagation::NotSupported, false),
            vec!["Outer".to_string()]
        );
    }

    #[test]
    fn test_fresh_transactions_under_not_supported() {
        let (provider, interceptor) = setup();
        let ctx = ContextId::new();
        let untracked = TransactionAttributes::with(Propagation::NotSupported);

        interceptor
            .invoke(ctx, "add_outer", &TransactionAttributes::new(), |outer| {
                let before = outer.connection(false)?.unwrap();
                insert(outer, "Outer")?;

                interceptor
                    .invoke(outer.context(), "add_untracked", &untracked, |middle| {
                        for (policy, item) in [
                            (Propagation::Required, "Required"),
                            (Propagation::RequiresNew, "RequiresNew"),
                        ] {
                            interceptor
                                .invoke(
                                    middle.context(),
                                    "add_fresh",
                                    &TransactionAttributes::with(policy),
                                    |inner| -> Result<(), TransactionError> {
                                        assert_eq!(
                                            inner.status(),
                                            TransactionStatus::New { suspended: false }
                                        );
                                        let current = inner.connection(false)?.unwrap();
                                        assert!(!current.same_as(&before));
                                        insert(inner, item)
                                    },
                                )
                                .map_err(InvocationError::into_inner)?;
                            assert!(middle.connection(true)?.is_none());
                        }
                        Ok::<_, TransactionError>(())
                    })
                    .map_err(InvocationError::into_inner)?;

                assert!(outer.connection(false)?.unwrap().same_as(&before));
                Ok::<_, TransactionError>(())
            })
            .unwrap();

        assert_eq!(provider.stats().commits, 3);
        assert_eq!(
            provider.rows("items"),
            vec!["Required".to_string(), "RequiresNew".to_string(), "Outer".to_string()]
        );
        assert_eq!(provider.open_connections(), 0);
    }

    #[test]
    fn test_never_inside_transaction_fails() {
        let (_provider, interceptor) = setup();
        let ctx = ContextId::new();

        interceptor
            .invoke(ctx, "add_outer", &TransactionAttributes::new(), |outer| {
                let err = interceptor
                    .invoke(
                        outer.context(),
                        "add_never",
                        &TransactionAttributes::with(Propagation::Never),
                        |_| Ok::<_, TransactionError>(()),
                    )
                    .unwrap_err();
                assert!(matches!(
                    err.transaction_error(),
                    Some(TransactionError::TransactionExists { .. })
                ));
                assert!(outer.connection(false)?.is_some());
                Ok::<_, TransactionError>(())
            })
            .unwrap();
    }

    #[test]
    fn test_panic_rolls_back() {
        let (provider, interceptor) = setup();
        let ctx = ContextId::new();

        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            interceptor.invoke(
                ctx,
                "add_item",
                &TransactionAttributes::new(),
                |inv| -> Result<(), TransactionError> {
                    insert(inv, "Grenade").unwrap();
                    panic!("operation exploded")
                },
            )
        }));

        assert!(result.is_err());
        assert_eq!(provider.stats().rollbacks, 1);
        assert!(provider.rows("items").is_empty());
        assert!(interceptor.coordinator().current_transaction(ctx).is_none());
    }

    #[test]
    fn test_declared_operations() {
        let provider = MemoryProvider::new();
        let interceptor = TransactionInterceptor::new(TransactionCoordinator::new(provider.clone()))
            .declare(
                "get_items",
                TransactionAttributes::read_only().isolation(IsolationLevel::Serializable),
            );

        let isolation = interceptor
            .call(ContextId::new(), "get_items", |inv| {
                let handle = inv.connection(false)?.unwrap();
                assert!(handle.is_read_only());
                assert!(!inv.is_write());
                Ok::<_, TransactionError>(handle.isolation())
            })
            .unwrap();

        assert_eq!(isolation, IsolationLevel::Serializable);
        assert_eq!(interceptor.attributes_for("unknown"), TransactionAttributes::default());
    }

    #[test]
    fn test_from_config_applies_coordinator_settings() {
        let config = TransactionalConfig::default()
            .coordinator(CoordinatorConfig::new().read_only_floor(IsolationLevel::Serializable))
            .write_convention(WriteConvention::empty().prefix("save"))
            .operation("get_items", TransactionAttributes::read_only());
        let interceptor = TransactionInterceptor::from_config(MemoryProvider::new(), config);

        assert_eq!(
            interceptor.coordinator().config().read_only_floor,
            IsolationLevel::Serializable
        );
        assert!(interceptor.is_write("save_order"));
        assert!(!interceptor.is_write("add_item"));

        let isolation = interceptor
            .call(ContextId::new(), "get_items", |inv| {
                let handle = inv.connection(false)?.unwrap();
                Ok::<_, TransactionError>(handle.isolation())
            })
            .unwrap();
        assert_eq!(isolation, IsolationLevel::Serializable);
    }

    #[test]
    fn test_custom_classifier() {
        let provider = MemoryProvider::new();
        let interceptor = TransactionInterceptor::with_classifier(
            TransactionCoordinator::new(provider),
            |name: &str| name.starts_with("save"),
        );

        assert!(interceptor.is_write("save_order"));
        let err = interceptor
            .invoke(
                ContextId::new(),
                "save_order",
                &TransactionAttributes::read_only(),
                |_| Ok::<_, TransactionError>(()),
            )
            .unwrap_err();
        assert!(err.transaction_error().is_some());
    }

    #[test]
    fn test_same_operation_from_many_contexts() {
        let provider = MemoryProvider::new();
        let interceptor = Arc::new(TransactionInterceptor::new(TransactionCoordinator::new(
            provider.clone(),
        )));
        let failures = Arc::new(AtomicUsize::new(0));

        let workers: Vec<_> = (0..8)
            .map(|i| {
                let interceptor = Arc::clone(&interceptor);
                let failures = Arc::clone(&failures);
                thread::spawn(move || {
                    for n in 0..20 {
                        let fail = (i + n) % 2 == 0;
                        let result = interceptor.invoke(
                            ContextId::current(),
                            "add_item",
                            &TransactionAttributes::new(),
                            |inv| {
                                insert(inv, &format!("{}-{}", i, n)).map_err(|e| e.to_string())?;
                                if fail {
                                    Err("rejected".to_string())
                                } else {
                                    Ok(())
                                }
                            },
                        );
                        if result.is_err() {
                            failures.fetch_add(1, Ordering::SeqCst);
                        }
                    }
                })
            })
            .collect();

        for worker in workers {
            worker.join().unwrap();
        }

        assert_eq!(failures.load(Ordering::SeqCst), 80);
        assert_eq!(provider.stats().commits, 80);
        assert_eq!(provider.stats().rollbacks, 80);
        assert_eq!(provider.rows("items").len(), 80);
        assert_eq!(provider.open_connections(), 0);
    }
}
