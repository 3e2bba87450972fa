//! Error taxonomy of the engine.
//!
//! - [`ValidationError`]: malformed input or a plan that may not be activated.
//! - [`AllocationError`]: a layer could not be distributed; the plan's
//!   evaluation is aborted with no partial result.
//! - [`SourceError`]: a collaborator failed to fetch data. Not retried here.
//!
//! "Nothing to split" (no active plan, no components) is not an error: the
//! runner returns an empty [`EvaluationResult`].
//!
//! [`EvaluationResult`]: crate::engine::runner::EvaluationResult
use crate::core::currency::FxError;
use crate::core::ids::{AllocationId, ContactId, PlanId, PropertyId, RuleId, StakeholderId};
use crate::core::money::Money;
use crate::split::method::MethodError;
use crate::split::selector::BaseMode;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("categories mode requires include or exclude category ids")]
    MissingCategoryFilter,
    #[error("include and exclude category ids are mutually exclusive")]
    ConflictingCategoryFilters,
    #[error("{mode} mode does not accept category filters")]
    UnexpectedCategoryFilter { mode: BaseMode },
    #[error("categories mode must include income, expenses or both")]
    NoTransactionTypeSelected,
    #[error("percent allocations of rule {rule_id} sum to {total}, expected 100")]
    PercentSum { rule_id: RuleId, total: Decimal },
    #[error("rule {rule_id} mixes method allocations with percent or fixed allocations")]
    MixedMethodAllocations { rule_id: RuleId },
    #[error("fixed allocation {allocation_id} requires a currency")]
    FixedWithoutCurrency { allocation_id: AllocationId },
    #[error("allocation {allocation_id} has an invalid value: {reason}")]
    InvalidAllocationValue {
        allocation_id: AllocationId,
        reason: String,
    },
    #[error("rule {rule_id} has no allocations")]
    EmptyRule { rule_id: RuleId },
    #[error("rule {rule_id} has order 0, orders start at 1")]
    InvalidOrder { rule_id: RuleId },
    #[error("order {order} is used by more than one rule in plan {plan_id}")]
    DuplicateOrder { plan_id: PlanId, order: u32 },
    #[error("plan {0} has no rules")]
    EmptyPlan(PlanId),
    #[error("contact {contact_id} is already a stakeholder of property {property_id}")]
    DuplicateStakeholder {
        property_id: PropertyId,
        contact_id: ContactId,
    },
    #[error("stakeholder {stakeholder_id} does not belong to property {property_id}")]
    ForeignStakeholder {
        stakeholder_id: StakeholderId,
        property_id: PropertyId,
    },
    #[error("unknown {kind} '{id}'")]
    UnknownReference { kind: &'static str, id: String },
    #[error("amount must not be negative, got {0}")]
    NegativeAmount(Money),
    #[error("exchange rate must be positive, got {0}")]
    InvalidExchangeRate(Decimal),
    #[error("final amount {stored} does not match original amount times rate ({expected})")]
    FinalAmountMismatch { stored: Money, expected: Money },
    #[error("amount overflows after applying exchange rate {0}")]
    AmountOverflow(Decimal),
    #[error("period start {start} must be before its end {end}")]
    EmptyPeriod {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

#[derive(Debug, Error)]
pub enum AllocationError {
    #[error("percent allocations of rule {rule_id} sum to {total}, expected 100")]
    PercentSumMismatch { rule_id: RuleId, total: Decimal },
    #[error("rule {rule_id} mixes method allocations with percent or fixed allocations")]
    MixedMethodAllocations { rule_id: RuleId },
    #[error("fixed allocations of rule {rule_id} total {fixed_total}, exceeding the base {base}")]
    FixedExceedsBase {
        rule_id: RuleId,
        fixed_total: Money,
        base: Money,
    },
    #[error("rule {rule_id} allocated {allocated} of a base of {base}")]
    Unreconciled {
        rule_id: RuleId,
        base: Money,
        allocated: Money,
    },
    #[error("method allocation for stakeholder {stakeholder_id} in rule {rule_id} failed")]
    Method {
        rule_id: RuleId,
        stakeholder_id: StakeholderId,
        #[source]
        source: MethodError,
    },
    #[error("fixed allocation {allocation_id} in rule {rule_id} cannot be converted")]
    Conversion {
        rule_id: RuleId,
        allocation_id: AllocationId,
        #[source]
        source: FxError,
    },
    #[error("rule {rule_id} has order {order} but layer {previous} was already evaluated")]
    LayerOutOfOrder {
        rule_id: RuleId,
        order: u32,
        previous: u32,
    },
    #[error("amounts of rule {rule_id} overflow")]
    Overflow { rule_id: RuleId },
    #[error("plan {plan_id} cannot be evaluated")]
    InvalidPlan {
        plan_id: PlanId,
        #[source]
        source: ValidationError,
    },
}

impl AllocationError {
    /// Re-express a failed plan check found at evaluation time. Percent and
    /// mixed-method failures keep their dedicated variants.
    pub fn from_plan_check(plan_id: &PlanId, error: ValidationError) -> Self {
        match error {
            ValidationError::PercentSum { rule_id, total } => {
                Self::PercentSumMismatch { rule_id, total }
            }
            ValidationError::MixedMethodAllocations { rule_id } => {
                Self::MixedMethodAllocations { rule_id }
            }
            source => Self::InvalidPlan {
                plan_id: plan_id.clone(),
                source,
            },
        }
    }
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("unknown property {0}")]
    UnknownProperty(PropertyId),
    #[error("data source unavailable: {0}")]
    Unavailable(String),
}

/// Everything a plan evaluation can fail with.
#[derive(Debug, Error)]
pub enum SplitError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Allocation(#[from] AllocationError),
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error(transparent)]
    Fx(#[from] FxError),
}
