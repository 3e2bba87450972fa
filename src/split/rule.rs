use crate::core::ids::RuleId;
use crate::core::money::Money;
use crate::core::transaction::ResolvedComponent;
use crate::error::{AllocationError, ValidationError};
use crate::split::allocation::{Allocation, AllocationType, Share};
use crate::split::selector::{BaseSelector, Selection};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// State threaded from one layer to the next within a single plan evaluation.
///
/// Passed by value: each layer receives the accumulator its predecessor
/// returned, so `remaining` layers see exactly what lower orders consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayerAccumulator {
    total_fund: Money,
    consumed: Money,
    last_order: Option<u32>,
}

impl LayerAccumulator {
    pub fn new(total_fund: Money) -> Self {
        Self {
            total_fund,
            consumed: Money::ZERO,
            last_order: None,
        }
    }

    /// Gross income of the period, in settlement currency.
    pub fn total_fund(&self) -> Money {
        self.total_fund
    }

    /// Sum allocated by every layer evaluated so far.
    pub fn consumed(&self) -> Money {
        self.consumed
    }

    pub fn remaining(&self) -> Money {
        self.total_fund - self.consumed
    }

    pub fn last_order(&self) -> Option<u32> {
        self.last_order
    }

    /// Account for a finished layer.
    #[must_use]
    pub fn record(self, order: u32, allocated: Money) -> Self {
        Self {
            total_fund: self.total_fund,
            consumed: self.consumed + allocated,
            last_order: Some(order),
        }
    }
}

/// One ordered layer of a split plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitRule {
    id: RuleId,
    order: u32,
    base: BaseSelector,
    #[serde(default)]
    allocations: Vec<Allocation>,
}

impl SplitRule {
    pub fn new(id: RuleId, order: u32, base: BaseSelector) -> Self {
        Self {
            id,
            order,
            base,
            allocations: Vec::new(),
        }
    }

    pub fn with_allocation(mut self, allocation: Allocation) -> Self {
        self.allocations.push(allocation);
        self
    }

    pub fn id(&self) -> &RuleId {
        &self.id
    }

    pub fn order(&self) -> u32 {
        self.order
    }

    pub fn base(&self) -> &BaseSelector {
        &self.base
    }

    pub fn allocations(&self) -> &[Allocation] {
        &self.allocations
    }

    fn has_type(&self, kind: AllocationType) -> bool {
        self.allocations.iter().any(|a| a.allocation_type() == kind)
    }

    /// Whether method allocations share the rule with percent or fixed ones.
    pub fn mixes_method(&self) -> bool {
        self.has_type(AllocationType::Method)
            && (self.has_type(AllocationType::Percent) || self.has_type(AllocationType::Fixed))
    }

    /// Sum of percent values, `None` when the rule has no percent allocation.
    pub fn percent_total(&self) -> Option<Decimal> {
        let mut percents = self.allocations.iter().filter_map(|a| match a.share() {
            Share::Percent(value) => Some(*value),
            _ => None,
        });
        let first = percents.next()?;
        Some(percents.fold(first, |acc, v| acc + v))
    }

    /// Activation-time checks. Rules are built incrementally, so this is not
    /// run when allocations are added.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.order == 0 {
            return Err(ValidationError::InvalidOrder {
                rule_id: self.id.clone(),
            });
        }
        if self.allocations.is_empty() {
            return Err(ValidationError::EmptyRule {
                rule_id: self.id.clone(),
            });
        }
        for allocation in &self.allocations {
            allocation.validate()?;
        }
        if self.mixes_method() {
            return Err(ValidationError::MixedMethodAllocations {
                rule_id: self.id.clone(),
            });
        }
        match self.percent_total() {
            Some(total) if total != Decimal::ONE_HUNDRED => Err(ValidationError::PercentSum {
                rule_id: self.id.clone(),
                total,
            }),
            _ => Ok(()),
        }
    }

    /// Compute this layer's base from the period's components.
    ///
    /// Layers must arrive in strictly ascending order; the accumulator
    /// remembers the last one and anything else is rejected.
    pub fn evaluate_base(
        &self,
        components: &[ResolvedComponent],
        acc: &LayerAccumulator,
    ) -> Result<Selection, AllocationError> {
        if let Some(previous) = acc.last_order() {
            if self.order <= previous {
                return Err(AllocationError::LayerOutOfOrder {
                    rule_id: self.id.clone(),
                    order: self.order,
                    previous,
                });
            }
        }
        Ok(self.base.select(components, acc))
    }
}
