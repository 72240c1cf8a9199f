//! Transaction propagation for txscope.
//!
//! Each execution context owns one active and at most one suspended
//! transaction handle. The coordinator applies a propagation policy to those
//! slots: join the active transaction, create a new one, suspend and later
//! restore it, or reject the call.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  TransactionCoordinator                     │
//! │  (propagation state machine, commit/rollback/end lifecycle) │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!        ┌─────────────────────┼─────────────────────┐
//!        │                     │                     │
//!        ▼                     ▼                     ▼
//!  ┌─────────────┐       ┌─────────────┐       ┌─────────────┐
//!  │   Context   │       │ Transaction │       │  Resource   │
//!  │    Store    │       │   Handle    │       │  Provider   │
//!  └─────────────┘       └─────────────┘       └─────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use txscope::provider::MemoryProvider;
//! use txscope::transaction::{ContextId, Propagation, TransactionCoordinator};
//!
//! let coordinator = TransactionCoordinator::new(MemoryProvider::new());
//! let ctx = ContextId::current();
//!
//! coordinator.start(ctx, Propagation::Required)?;
//! let tx = coordinator.get_connection(ctx, false, true)?.unwrap();
//! tx.with_connection(|conn| conn.insert("items", "Ice cream"))?;
//! coordinator.commit_transaction(ctx, true)?;
//! ```

mod context;
mod coordinator;
mod error;
mod handle;
mod isolation;
mod propagation;

pub use context::{ContextId, TransactionContextStore};
pub use coordinator::{HandleOf, TransactionCoordinator, TransactionStatus};
pub use error::{TransactionError, TransactionResult};
pub use handle::TransactionHandle;
pub use isolation::IsolationLevel;
pub use propagation::Propagation;
