//! Propagation policies.

use std::fmt;

use serde::{Deserialize, Serialize};

/// How a declared operation's transaction relates to the one already active
/// in its execution context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Propagation {
    /// Join the active transaction, or start one if there is none.
    #[default]
    Required,

    /// Suspend the active transaction (if any) and always start a new one.
    RequiresNew,

    /// Join the active transaction, or run without one.
    Supports,

    /// Join the active transaction; fail if there is none.
    Mandatory,

    /// Run without a transaction; fail if one is active.
    Never,

    /// Suspend the active transaction (if any) and run without one.
    NotSupported,
}

impl Propagation {
    /// Every policy, in declaration order.
    pub const ALL: [Propagation; 6] = [
        Propagation::Required,
        Propagation::RequiresNew,
        Propagation::Supports,
        Propagation::Mandatory,
        Propagation::Never,
        Propagation::NotSupported,
    ];

    /// Whether this policy can ever create a new transaction.
    pub fn may_create(&self) -> bool {
        matches!(self, Propagation::Required | Propagation::RequiresNew)
    }

    /// Whether this policy suspends an active transaction.
    pub fn suspends(&self) -> bool {
        matches!(self, Propagation::RequiresNew | Propagation::NotSupported)
    }
}

impl fmt::Display for Propagation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Propagation::Required => "REQUIRED",
            Propagation::RequiresNew => "REQUIRES_NEW",
            Propagation::Supports => "SUPPORTS",
            Propagation::Mandatory => "MANDATORY",
            Propagation::Never => "NEVER",
            Propagation::NotSupported => "NOT_SUPPORTED",
        };
        f.write_str(name)
    }
}

impl std::str::FromStr for Propagation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().replace('-', "_").as_str() {
            "REQUIRED" => Ok(Propagation::Required),
            "REQUIRES_NEW" | "REQUIRESNEW" => Ok(Propagation::RequiresNew),
            "SUPPORTS" => Ok(Propagation::Supports),
            "MANDATORY" => Ok(Propagation::Mandatory),
            "NEVER" => Ok(Propagation::Never),
            "NOT_SUPPORTED" | "NOTSUPPORTED" => Ok(Propagation::NotSupported),
            _ => Err(format!("unknown propagation: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_may_create() {
        let creating: Vec<_> = Propagation::ALL
            .iter()
            .filter(|p| p.may_create())
            .copied()
            .collect();
        assert_eq!(creating, vec![Propagation::Required, Propagation::RequiresNew]);
    }

    #[test]
    fn test_parse_round_trip_names() {
        for policy in Propagation::ALL {
            assert_eq!(policy.to_string().parse::<Propagation>().unwrap(), policy);
        }
        assert_eq!(
            "requires-new".parse::<Propagation>().unwrap(),
            Propagation::RequiresNew
        );
        assert!("sometimes".parse::<Propagation>().is_err());
    }
}
