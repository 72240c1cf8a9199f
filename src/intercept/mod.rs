//! Declarative transaction interception.
//!
//! An operation declares [`TransactionAttributes`]; the
//! [`TransactionInterceptor`] runs it under those attributes by driving the
//! coordinator around the call.
//!
//! # Usage
//!
//! ```ignore
//! use txscope::intercept::{TransactionAttributes, TransactionInterceptor};
//! use txscope::provider::MemoryProvider;
//! use txscope::transaction::{ContextId, Propagation, TransactionCoordinator};
//!
//! let interceptor = TransactionInterceptor::new(TransactionCoordinator::new(MemoryProvider::new()))
//!     .declare("add_item", TransactionAttributes::with(Propagation::RequiresNew));
//!
//! interceptor.call(ContextId::current(), "add_item", |inv| {
//!     let tx = inv.connection(false)?.expect("transaction started");
//!     tx.with_connection(|conn| conn.insert("items", "Coffee"))?;
//!     Ok::<_, txscope::transaction::TransactionError>(())
//! })?;
//! ```

mod attributes;
mod classify;
mod error;
mod interceptor;

pub use attributes::TransactionAttributes;
pub use classify::{OperationClassifier, WriteConvention};
pub use error::{InvocationError, InvocationResult};
pub use interceptor::{Invocation, TransactionInterceptor};
