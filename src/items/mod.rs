//! Item service.
//!
//! A small catalogue of transactional operations over the `items` table,
//! one per propagation policy. The demo binary and the tests use it to show
//! how each policy behaves with and without an outer transaction.

mod error;
mod service;

pub use error::{ItemError, ItemResult};
pub use service::{ItemService, ITEMS};
