use crate::core::currency::CurrencyCode;
use crate::core::ids::{PlanId, PropertyId, StakeholderId};
use crate::error::ValidationError;
use crate::split::rule::SplitRule;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A property's set of ordered layers.
///
/// At most one plan per property is active at a time; the store flips the
/// flag when activating. Outputs are denominated in `settlement_currency`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitPlan {
    id: PlanId,
    property_id: PropertyId,
    name: String,
    #[serde(default)]
    is_active: bool,
    #[serde(default)]
    expiration_date: Option<DateTime<Utc>>,
    settlement_currency: CurrencyCode,
    #[serde(default)]
    rules: Vec<SplitRule>,
}

impl SplitPlan {
    pub fn new(
        id: PlanId,
        property_id: PropertyId,
        name: impl Into<String>,
        settlement_currency: CurrencyCode,
    ) -> Self {
        Self {
            id,
            property_id,
            name: name.into(),
            is_active: false,
            expiration_date: None,
            settlement_currency,
            rules: Vec::new(),
        }
    }

    pub fn with_rule(mut self, rule: SplitRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn with_expiration(mut self, expiration_date: DateTime<Utc>) -> Self {
        self.expiration_date = Some(expiration_date);
        self
    }

    pub fn set_active(&mut self, active: bool) {
        self.is_active = active;
    }

    pub fn id(&self) -> &PlanId {
        &self.id
    }

    pub fn property_id(&self) -> &PropertyId {
        &self.property_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn expiration_date(&self) -> Option<DateTime<Utc>> {
        self.expiration_date
    }

    pub fn settlement_currency(&self) -> &CurrencyCode {
        &self.settlement_currency
    }

    pub fn rules(&self) -> &[SplitRule] {
        &self.rules
    }

    /// Rules in evaluation order (ascending `order`).
    pub fn ordered_rules(&self) -> Vec<&SplitRule> {
        let mut rules: Vec<&SplitRule> = self.rules.iter().collect();
        rules.sort_by_key(|r| r.order());
        rules
    }

    /// Expired plans no longer apply to periods starting at or after the date.
    pub fn is_expired_at(&self, at: DateTime<Utc>) -> bool {
        self.expiration_date.map_or(false, |expires| expires <= at)
    }

    /// Every stakeholder any rule allocates to.
    pub fn stakeholder_ids(&self) -> BTreeSet<&StakeholderId> {
        self.rules
            .iter()
            .flat_map(|r| r.allocations().iter().map(|a| a.stakeholder_id()))
            .collect()
    }

    /// Checks run before a plan may become active.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.rules.is_empty() {
            return Err(ValidationError::EmptyPlan(self.id.clone()));
        }
        let mut orders = BTreeSet::new();
        for rule in self.ordered_rules() {
            rule.validate()?;
            if !orders.insert(rule.order()) {
                return Err(ValidationError::DuplicateOrder {
                    plan_id: self.id.clone(),
                    order: rule.order(),
                });
            }
        }
        Ok(())
    }
}
