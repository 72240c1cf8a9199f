//! Write classification of operation names.
//!
//! The coordinator only consumes a boolean; deciding whether an operation
//! writes is a naming convention supplied by the caller.

use serde::{Deserialize, Serialize};

/// Decides whether a named operation is a write.
pub trait OperationClassifier: Send + Sync {
    fn is_write(&self, operation: &str) -> bool;
}

impl<F> OperationClassifier for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn is_write(&self, operation: &str) -> bool {
        self(operation)
    }
}

/// Name-based convention: a verb prefix, or an exact mutating verb.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WriteConvention {
    /// Names starting with any of these are writes.
    pub prefixes: Vec<String>,
    /// Names equal to any of these are writes.
    pub exact: Vec<String>,
}

impl Default for WriteConvention {
    fn default() -> Self {
        Self {
            prefixes: vec!["add".to_string()],
            exact: vec!["update".to_string(), "delete".to_string()],
        }
    }
}

impl WriteConvention {
    /// A convention with no write verbs at all.
    pub fn empty() -> Self {
        Self {
            prefixes: Vec::new(),
            exact: Vec::new(),
        }
    }

    /// Add a write prefix.
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefixes.push(prefix.into());
        self
    }

    /// Add an exact write verb.
    pub fn exact(mut self, verb: impl Into<String>) -> Self {
        self.exact.push(verb.into());
        self
    }
}

impl OperationClassifier for WriteConvention {
    fn is_write(&self, operation: &str) -> bool {
        self.prefixes.iter().any(|p| operation.starts_with(p.as_str()))
            || self.exact.iter().any(|v| v == operation)
    }
}
