//! Declared transactional attributes of an operation.

use serde::{Deserialize, Serialize};

use crate::transaction::{IsolationLevel, Propagation};

/// What an operation declares about the transaction it runs in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransactionAttributes {
    pub propagation: Propagation,
    pub isolation: IsolationLevel,
    pub read_only: bool,
}

impl TransactionAttributes {
    /// `Required`, default isolation, read-write.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read-only attributes with `Required` propagation.
    pub fn read_only() -> Self {
        Self::default().with_read_only(true)
    }

    /// Default attributes with the given propagation.
    pub fn with(propagation: Propagation) -> Self {
        Self::default().propagation(propagation)
    }

    /// Set the propagation policy.
    pub fn propagation(mut self, propagation: Propagation) -> Self {
        self.propagation = propagation;
        self
    }

    /// Set the isolation level.
    pub fn isolation(mut self, isolation: IsolationLevel) -> Self {
        self.isolation = isolation;
        self
    }

    /// Set the read-only flag.
    pub fn with_read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let attrs = TransactionAttributes::default();
        assert_eq!(attrs.propagation, Propagation::Required);
        assert_eq!(attrs.isolation, IsolationLevel::Default);
        assert!(!attrs.read_only);
    }

    #[test]
    fn test_builders() {
        let attrs = TransactionAttributes::with(Propagation::RequiresNew)
            .isolation(IsolationLevel::Serializable)
            .with_read_only(true);
        assert_eq!(attrs.propagation, Propagation::RequiresNew);
        assert_eq!(attrs.isolation, IsolationLevel::Serializable);
        assert!(attrs.read_only);
        assert!(TransactionAttributes::read_only().read_only);
    }
}
