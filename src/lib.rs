//! txscope - declarative transaction propagation
//!
//! Operations declare a propagation policy, an isolation level and a
//! read-only flag. The coordinator decides, per execution context, whether
//! a call joins the running transaction, starts a new one, suspends and
//! later restores the running one, or is rejected. It then drives commit,
//! rollback and cleanup around the call.
//!
//! # Example
//!
//! ```no_run
//! use txscope::intercept::{TransactionAttributes, TransactionInterceptor};
//! use txscope::provider::MemoryProvider;
//! use txscope::transaction::{ContextId, TransactionCoordinator, TransactionError};
//!
//! let interceptor = TransactionInterceptor::new(TransactionCoordinator::new(MemoryProvider::new()));
//! interceptor
//!     .invoke(ContextId::current(), "add_item", &TransactionAttributes::new(), |inv| {
//!         let tx = inv.connection(false)?.unwrap();
//!         tx.with_connection(|conn| conn.insert("items", "Ice cream"))?;
//!         Ok::<_, TransactionError>(())
//!     })
//!     .unwrap();
//! ```

pub mod config;
pub mod intercept;
pub mod items;
pub mod provider;
pub mod transaction;
