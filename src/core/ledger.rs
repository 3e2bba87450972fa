use crate::core::ids::StakeholderId;
use crate::core::money::Money;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Running total owed to each stakeholder across the layers of one evaluation.
///
/// A positive position means the stakeholder receives money; a negative one
/// means they carry a share of a loss.
///
/// Ordered by stakeholder id so printed and serialized output is stable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StakeholderLedger {
    positions: BTreeMap<StakeholderId, Money>,
}

impl StakeholderLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `amount` to a stakeholder's position.
    pub fn credit(&mut self, stakeholder: &StakeholderId, amount: Money) {
        *self
            .positions
            .entry(stakeholder.clone())
            .or_insert(Money::ZERO) += amount;
    }

    /// Merge one layer's deltas.
    pub fn apply_deltas(&mut self, deltas: &BTreeMap<StakeholderId, Money>) {
        for (stakeholder, amount) in deltas {
            self.credit(stakeholder, *amount);
        }
    }

    pub fn position(&self, stakeholder: &StakeholderId) -> Money {
        self.positions
            .get(stakeholder)
            .copied()
            .unwrap_or(Money::ZERO)
    }

    pub fn positions(&self) -> &BTreeMap<StakeholderId, Money> {
        &self.positions
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Sum of all positions.
    pub fn total(&self) -> Money {
        self.positions.values().sum()
    }

    /// Whether the ledger accounts for exactly `expected`, no unit more or less.
    pub fn reconciles_with(&self, expected: Money) -> bool {
        self.total() == expected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ledger_basic() {
        let mut ledger = StakeholderLedger::new();
        let a = StakeholderId::new("A");
        ledger.credit(&a, Money::new(100));
        ledger.credit(&a, Money::new(-30));
        assert_eq!(ledger.position(&a), Money::new(70));
        assert_eq!(ledger.position(&StakeholderId::new("B")), Money::ZERO);
    }

    #[test]
    fn test_ledger_merges_layers() {
        let mut ledger = StakeholderLedger::new();
        let mut first = BTreeMap::new();
        first.insert(StakeholderId::new("A"), Money::new(600));
        first.insert(StakeholderId::new("B"), Money::new(400));
        let mut second = BTreeMap::new();
        second.insert(StakeholderId::new("B"), Money::new(50));

        ledger.apply_deltas(&first);
        ledger.apply_deltas(&second);

        assert_eq!(ledger.position(&StakeholderId::new("B")), Money::new(450));
        assert_eq!(ledger.total(), Money::new(1_050));
        assert!(ledger.reconciles_with(Money::new(1_050)));
        assert!(!ledger.reconciles_with(Money::new(1_000)));
    }

    #[test]
    fn test_ledger_serializes_as_map() {
        let mut ledger = StakeholderLedger::new();
        ledger.credit(&StakeholderId::new("A"), Money::new(5));
        assert_eq!(serde_json::to_string(&ledger).unwrap(), r#"{"A":5}"#);
    }
}
