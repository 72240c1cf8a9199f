//! Configuration.
//!
//! [`CoordinatorConfig`] tunes the coordinator itself. [`TransactionalConfig`]
//! carries the declared metadata of every transactional operation and can be
//! loaded from JSON:
//!
//! ```json
//! {
//!   "coordinator": { "read_only_floor": "READ_COMMITTED" },
//!   "write_convention": { "prefixes": ["add", "save"], "exact": ["update", "delete"] },
//!   "operations": {
//!     "get_items": { "read_only": true },
//!     "add_item_with_requires_new": { "propagation": "REQUIRES_NEW" }
//!   }
//! }
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::intercept::{OperationClassifier, TransactionAttributes, WriteConvention};
use crate::transaction::IsolationLevel;

/// Result type for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Coordinator configuration options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    /// Weakest isolation a read-only transaction is opened with.
    pub read_only_floor: IsolationLevel,
    /// Isolation used when a caller does not declare one.
    pub default_isolation: IsolationLevel,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            read_only_floor: IsolationLevel::ReadCommitted,
            default_isolation: IsolationLevel::Default,
        }
    }
}

impl CoordinatorConfig {
    /// Create the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the read-only isolation floor.
    pub fn read_only_floor(mut self, level: IsolationLevel) -> Self {
        self.read_only_floor = level;
        self
    }

    /// Set the default isolation.
    pub fn default_isolation(mut self, level: IsolationLevel) -> Self {
        self.default_isolation = level;
        self
    }
}

/// Declared transactional operations plus the coordinator settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransactionalConfig {
    pub coordinator: CoordinatorConfig,
    pub write_convention: WriteConvention,
    pub operations: BTreeMap<String, TransactionAttributes>,
}

impl TransactionalConfig {
    /// Parse and validate a JSON document.
    pub fn from_json(json: &str) -> ConfigResult<Self> {
        let config: TransactionalConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Declare an operation.
    pub fn operation(mut self, name: impl Into<String>, attributes: TransactionAttributes) -> Self {
        self.operations.insert(name.into(), attributes);
        self
    }

    /// Set the write convention.
    pub fn write_convention(mut self, convention: WriteConvention) -> Self {
        self.write_convention = convention;
        self
    }

    /// Set the coordinator configuration.
    pub fn coordinator(mut self, coordinator: CoordinatorConfig) -> Self {
        self.coordinator = coordinator;
        self
    }

    /// Reject declarations that could never run.
    pub fn validate(&self) -> ConfigResult<()> {
        for (name, attributes) in &self.operations {
            if name.trim().is_empty() {
                return Err(ConfigError::Invalid("operation name is empty".into()));
            }
            if attributes.read_only && self.write_convention.is_write(name) {
                return Err(ConfigError::Invalid(format!(
                    "operation {} is declared read-only but is classified as a write",
                    name
                )));
            }
        }
        Ok(())
    }
}
