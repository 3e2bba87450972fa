//! Splits one layer's base among its stakeholders.
//!
//! Fixed allocations are taken off the top (converted into the settlement
//! currency), percentages divide what is left, and method allocations are
//! resolved one after another by an injected [`MethodResolver`]. Whatever
//! the allocation types, the deltas of a rule always sum to its base.
use crate::core::currency::{CurrencyCode, CurrencyTable};
use crate::core::ids::{RuleId, StakeholderId};
use crate::core::money::Money;
use crate::error::AllocationError;
use crate::split::allocation::Share;
use crate::split::method::{MethodContext, MethodResolver};
use crate::split::rule::SplitRule;
use rust_decimal::Decimal;
use std::collections::BTreeMap;

/// Per-stakeholder amounts produced by one layer.
pub type Deltas = BTreeMap<StakeholderId, Money>;

pub struct AllocationDistributor<'a, M> {
    currencies: &'a CurrencyTable,
    methods: M,
    settlement: &'a CurrencyCode,
}

/// One percent allocation's exact share, split into its floor and the
/// fractional part competing for residual units.
struct PercentShare<'r> {
    stakeholder_id: &'r StakeholderId,
    index: usize,
    floor: Money,
    fraction: Decimal,
}

impl<'a, M: MethodResolver> AllocationDistributor<'a, M> {
    pub fn new(currencies: &'a CurrencyTable, methods: M, settlement: &'a CurrencyCode) -> Self {
        Self {
            currencies,
            methods,
            settlement,
        }
    }

    pub fn settlement_currency(&self) -> &CurrencyCode {
        self.settlement
    }

    /// Distribute `base` according to `rule`'s allocations.
    ///
    /// Every stakeholder named by the rule appears in the result, possibly
    /// with zero. A stakeholder with several allocations in the rule gets the
    /// sum of them.
    pub fn distribute(&self, rule: &SplitRule, base: Money) -> Result<Deltas, AllocationError> {
        if rule.mixes_method() {
            return Err(AllocationError::MixedMethodAllocations {
                rule_id: rule.id().clone(),
            });
        }
        if let Some(total) = rule.percent_total() {
            if total != Decimal::ONE_HUNDRED {
                return Err(AllocationError::PercentSumMismatch {
                    rule_id: rule.id().clone(),
                    total,
                });
            }
        }

        let mut deltas: Deltas = rule
            .allocations()
            .iter()
            .map(|a| (a.stakeholder_id().clone(), Money::ZERO))
            .collect();

        let has_method = rule
            .allocations()
            .iter()
            .any(|a| matches!(a.share(), Share::Method(_)));
        if has_method {
            self.resolve_methods(rule, base, &mut deltas)?;
        } else {
            let pool = self.apply_fixed(rule, base, &mut deltas)?;
            self.apply_percent(rule, pool, &mut deltas)?;
        }

        let allocated: Money = deltas.values().sum();
        if allocated != base {
            return Err(AllocationError::Unreconciled {
                rule_id: rule.id().clone(),
                base,
                allocated,
            });
        }
        Ok(deltas)
    }

    /// Convert fixed allocations and credit them; returns what is left of
    /// the base for the percent pass.
    fn apply_fixed(
        &self,
        rule: &SplitRule,
        base: Money,
        deltas: &mut Deltas,
    ) -> Result<Money, AllocationError> {
        let overflow = || overflow_of(rule.id());

        let mut fixed_total = Money::ZERO;
        let mut has_fixed = false;
        for allocation in rule.allocations() {
            let Share::Fixed { amount, currency } = allocation.share() else {
                continue;
            };
            has_fixed = true;
            let converted = self
                .currencies
                .convert(*amount, currency, self.settlement)
                .map_err(|source| AllocationError::Conversion {
                    rule_id: rule.id().clone(),
                    allocation_id: allocation.id().clone(),
                    source,
                })?;
            fixed_total = fixed_total.checked_add(converted).ok_or_else(overflow)?;
            credit(deltas, allocation.stakeholder_id(), converted).ok_or_else(overflow)?;
        }

        // A percent-only rule splits any base, losses included.
        if has_fixed && fixed_total > base {
            return Err(AllocationError::FixedExceedsBase {
                rule_id: rule.id().clone(),
                fixed_total,
                base,
            });
        }
        base.checked_sub(fixed_total).ok_or_else(overflow)
    }

    /// Largest-remainder split of `pool` over the percent allocations.
    fn apply_percent(
        &self,
        rule: &SplitRule,
        pool: Money,
        deltas: &mut Deltas,
    ) -> Result<(), AllocationError> {
        let overflow = || overflow_of(rule.id());

        let mut shares = Vec::new();
        for (index, allocation) in rule.allocations().iter().enumerate() {
            let Share::Percent(percent) = allocation.share() else {
                continue;
            };
            let exact = pool
                .to_decimal()
                .checked_mul(*percent)
                .and_then(|v| v.checked_div(Decimal::ONE_HUNDRED))
                .ok_or_else(overflow)?;
            let floor = Money::floor(exact).ok_or_else(overflow)?;
            shares.push(PercentShare {
                stakeholder_id: allocation.stakeholder_id(),
                index,
                floor,
                fraction: exact - floor.to_decimal(),
            });
        }

        // Fixed-only rule: the fixed amounts must cover the base exactly.
        if shares.is_empty() {
            return Ok(());
        }

        let floored: Money = shares.iter().map(|s| s.floor).sum();
        let residual = pool.checked_sub(floored).ok_or_else(overflow)?;

        shares.sort_by(|a, b| {
            b.fraction
                .cmp(&a.fraction)
                .then_with(|| a.stakeholder_id.cmp(b.stakeholder_id))
                .then_with(|| a.index.cmp(&b.index))
        });

        // floor <= exact and the percents sum to 100, so 0 <= residual < shares.len()
        let extra = usize::try_from(residual.minor_units())
            .ok()
            .filter(|extra| *extra < shares.len())
            .ok_or_else(|| AllocationError::Unreconciled {
                rule_id: rule.id().clone(),
                base: pool,
                allocated: floored,
            })?;
        for (position, share) in shares.iter().enumerate() {
            let bonus = if position < extra { Money::new(1) } else { Money::ZERO };
            credit(deltas, share.stakeholder_id, share.floor + bonus).ok_or_else(overflow)?;
        }
        Ok(())
    }

    /// Resolve method allocations in rule order, each seeing what its
    /// predecessors left unresolved.
    fn resolve_methods(
        &self,
        rule: &SplitRule,
        base: Money,
        deltas: &mut Deltas,
    ) -> Result<(), AllocationError> {
        let mut unresolved = base;
        for allocation in rule.allocations() {
            let Share::Method(descriptor) = allocation.share() else {
                continue;
            };
            let context = MethodContext {
                rule_id: rule.id(),
                order: rule.order(),
                stakeholder_id: allocation.stakeholder_id(),
                settlement_currency: self.settlement,
                base,
                unresolved,
            };
            let amount = self
                .methods
                .resolve(descriptor, &context)
                .map_err(|source| AllocationError::Method {
                    rule_id: rule.id().clone(),
                    stakeholder_id: allocation.stakeholder_id().clone(),
                    source,
                })?;
            unresolved = unresolved
                .checked_sub(amount)
                .ok_or_else(|| overflow_of(rule.id()))?;
            credit(deltas, allocation.stakeholder_id(), amount)
                .ok_or_else(|| overflow_of(rule.id()))?;
        }
        Ok(())
    }
}

fn overflow_of(rule_id: &RuleId) -> AllocationError {
    AllocationError::Overflow {
        rule_id: rule_id.clone(),
    }
}

fn credit(deltas: &mut Deltas, stakeholder_id: &StakeholderId, amount: Money) -> Option<()> {
    let entry = deltas.entry(stakeholder_id.clone()).or_insert(Money::ZERO);
    *entry = entry.checked_add(amount)?;
    Some(())
}
