//! Transaction isolation levels.
//!
//! The coordinator never enforces isolation itself. It records the declared
//! level on the handle and forwards it to the resource provider when a new
//! connection is configured.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Transaction isolation level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IsolationLevel {
    /// Whatever the backing store uses by default.
    #[default]
    Default,

    /// Dirty reads allowed.
    ReadUncommitted,

    /// Each read sees the latest committed data.
    ReadCommitted,

    /// All reads see a consistent snapshot from transaction start.
    RepeatableRead,

    /// Transactions behave as if executed one after another.
    Serializable,
}

impl IsolationLevel {
    /// Relative strictness, `None` for `Default` since the provider decides.
    pub fn strictness(&self) -> Option<u8> {
        match self {
            IsolationLevel::Default => None,
            IsolationLevel::ReadUncommitted => Some(1),
            IsolationLevel::ReadCommitted => Some(2),
            IsolationLevel::RepeatableRead => Some(3),
            IsolationLevel::Serializable => Some(4),
        }
    }

    /// Raise this level to at least `floor`.
    ///
    /// `Default` is treated as weaker than any explicit level.
    pub fn at_least(self, floor: IsolationLevel) -> IsolationLevel {
        match (self.strictness(), floor.strictness()) {
            (_, None) => self,
            (None, Some(_)) => floor,
            (Some(own), Some(min)) if own < min => floor,
            _ => self,
        }
    }
}

impl fmt::Display for IsolationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IsolationLevel::Default => write!(f, "DEFAULT"),
            IsolationLevel::ReadUncommitted => write!(f, "READ UNCOMMITTED"),
            IsolationLevel::ReadCommitted => write!(f, "READ COMMITTED"),
            IsolationLevel::RepeatableRead => write!(f, "REPEATABLE READ"),
            IsolationLevel::Serializable => write!(f, "SERIALIZABLE"),
        }
    }
}

/// Parse isolation level from string (SQL syntax).
impl std::str::FromStr for IsolationLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "DEFAULT" => Ok(IsolationLevel::Default),
            "READ UNCOMMITTED" | "READ_UNCOMMITTED" | "READUNCOMMITTED" => {
                Ok(IsolationLevel::ReadUncommitted)
            }
            "READ COMMITTED" | "READ_COMMITTED" | "READCOMMITTED" => {
                Ok(IsolationLevel::ReadCommitted)
            }
            "REPEATABLE READ" | "REPEATABLE_READ" | "REPEATABLEREAD" | "SNAPSHOT" => {
                Ok(IsolationLevel::RepeatableRead)
            }
            "SERIALIZABLE" => Ok(IsolationLevel::Serializable),
            _ => Err(format!("unknown isolation level: {}", s)),
        }
    }
}
