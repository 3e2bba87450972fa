//! Plan evaluation: load, convert, fold the layers, report.
use crate::core::currency::{CurrencyCode, CurrencyTable};
use crate::core::ids::{ComponentId, PlanId, PropertyId, RuleId, StakeholderId};
use crate::core::ledger::StakeholderLedger;
use crate::core::money::Money;
use crate::core::transaction::ResolvedComponent;
use crate::engine::source::{ComponentSource, Period, PlanSource};
use crate::error::{AllocationError, SplitError, ValidationError};
use crate::split::distributor::AllocationDistributor;
use crate::split::method::{MethodResolver, NoMethods};
use crate::split::plan::SplitPlan;
use crate::split::rule::LayerAccumulator;
use crate::split::selector::BaseMode;
use log::{debug, info, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Why an evaluation produced nothing to split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyReason {
    NoActivePlan,
    PlanExpired,
    NoComponents,
}

impl fmt::Display for EmptyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoActivePlan => write!(f, "no active plan"),
            Self::PlanExpired => write!(f, "plan expired"),
            Self::NoComponents => write!(f, "no transaction components in period"),
        }
    }
}

/// Audit record of one layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerBreakdown {
    pub rule_id: RuleId,
    pub order: u32,
    pub mode: BaseMode,
    pub base_amount: Money,
    /// Components that fed the base.
    pub component_ids: Vec<ComponentId>,
    pub deltas: BTreeMap<StakeholderId, Money>,
}

impl LayerBreakdown {
    pub fn allocated(&self) -> Money {
        self.deltas.values().sum()
    }
}

/// Outcome of evaluating one property's plan over one period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationResult {
    property_id: PropertyId,
    plan_id: Option<PlanId>,
    settlement_currency: Option<CurrencyCode>,
    period: Period,
    total_fund: Money,
    per_stakeholder_total: StakeholderLedger,
    per_layer: Vec<LayerBreakdown>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    empty_reason: Option<EmptyReason>,
}

impl EvaluationResult {
    /// A well-formed result with nothing in it.
    pub fn empty(
        property_id: PropertyId,
        plan: Option<&SplitPlan>,
        period: Period,
        reason: EmptyReason,
    ) -> Self {
        Self {
            property_id,
            plan_id: plan.map(|p| p.id().clone()),
            settlement_currency: plan.map(|p| p.settlement_currency().clone()),
            period,
            total_fund: Money::ZERO,
            per_stakeholder_total: StakeholderLedger::new(),
            per_layer: Vec::new(),
            empty_reason: Some(reason),
        }
    }

    pub fn property_id(&self) -> &PropertyId {
        &self.property_id
    }

    pub fn plan_id(&self) -> Option<&PlanId> {
        self.plan_id.as_ref()
    }

    pub fn settlement_currency(&self) -> Option<&CurrencyCode> {
        self.settlement_currency.as_ref()
    }

    pub fn period(&self) -> &Period {
        &self.period
    }

    /// Gross income of the period in settlement currency.
    pub fn total_fund(&self) -> Money {
        self.total_fund
    }

    pub fn per_stakeholder_total(&self) -> &StakeholderLedger {
        &self.per_stakeholder_total
    }

    pub fn per_layer(&self) -> &[LayerBreakdown] {
        &self.per_layer
    }

    pub fn empty_reason(&self) -> Option<EmptyReason> {
        self.empty_reason
    }

    pub fn is_empty(&self) -> bool {
        self.empty_reason.is_some()
    }

    /// Final amount of one stakeholder; zero if no layer touched them.
    pub fn total_for(&self, stakeholder: &StakeholderId) -> Money {
        self.per_stakeholder_total.position(stakeholder)
    }

    /// Sum of all layer bases.
    pub fn total_base(&self) -> Money {
        self.per_layer.iter().map(|l| l.base_amount).sum()
    }

    pub fn total_allocated(&self) -> Money {
        self.per_stakeholder_total.total()
    }

    /// Every layer hands out exactly its base and the totals add up to the
    /// sum of the bases.
    pub fn is_conserved(&self) -> bool {
        self.per_layer.iter().all(|l| l.allocated() == l.base_amount)
            && self.per_stakeholder_total.reconciles_with(self.total_base())
    }
}

impl fmt::Display for EvaluationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Split Result ===")?;
        writeln!(f, "Property:   {}", self.property_id)?;
        writeln!(f, "Period:     {}", self.period)?;
        if let Some(reason) = self.empty_reason {
            return writeln!(f, "Empty:      {}", reason);
        }
        if let (Some(plan), Some(currency)) = (&self.plan_id, &self.settlement_currency) {
            writeln!(f, "Plan:       {} ({})", plan, currency)?;
        }
        writeln!(f, "Fund:       {}", self.total_fund)?;
        writeln!(f, "Allocated:  {}", self.total_allocated())?;

        for layer in &self.per_layer {
            writeln!(
                f,
                "\n--- Layer {} [{}] {} ---",
                layer.order, layer.rule_id, layer.mode
            )?;
            writeln!(f, "  Base: {}", layer.base_amount)?;
            for (stakeholder, amount) in &layer.deltas {
                writeln!(f, "  {}: {}", stakeholder, amount)?;
            }
        }

        writeln!(f, "\n--- Totals ---")?;
        for (stakeholder, amount) in self.per_stakeholder_total.positions() {
            writeln!(f, "  {}: {}", stakeholder, amount)?;
        }
        Ok(())
    }
}

/// Evaluates a property's active split plan against its transactions.
///
/// # Examples
///
/// ```
/// use split_engine::prelude::*;
/// use split_engine::core::stakeholder::Property;
/// use split_engine::core::ids::TeamId;
///
/// let mut store = InMemoryStore::new();
/// store.add_property(Property::new(
///     PropertyId::new("house"),
///     TeamId::new("team"),
///     "House",
///     CurrencyCode::new("EUR"),
/// ));
/// let currencies = CurrencyTable::seeded();
/// let runner = SplitPlanRunner::new(&store, &currencies);
///
/// let result = runner.evaluate(&PropertyId::new("house"), &Period::unbounded()).unwrap();
/// assert!(result.is_empty());
/// ```
pub struct SplitPlanRunner<'a, S, M = NoMethods> {
    source: &'a S,
    currencies: &'a CurrencyTable,
    methods: M,
}

impl<'a, S> SplitPlanRunner<'a, S, NoMethods> {
    pub fn new(source: &'a S, currencies: &'a CurrencyTable) -> Self {
        Self {
            source,
            currencies,
            methods: NoMethods,
        }
    }
}

impl<'a, S, M> SplitPlanRunner<'a, S, M>
where
    S: PlanSource + ComponentSource,
    M: MethodResolver,
{
    /// Swap in a resolver for `method` allocations.
    pub fn with_methods<N: MethodResolver>(self, methods: N) -> SplitPlanRunner<'a, S, N> {
        SplitPlanRunner {
            source: self.source,
            currencies: self.currencies,
            methods,
        }
    }

    pub fn currencies(&self) -> &CurrencyTable {
        self.currencies
    }

    /// Evaluate the property's active plan over `period`.
    ///
    /// No plan, an expired plan and an empty period all yield an empty
    /// result rather than an error. A plan that fails its checks here is an
    /// [`AllocationError`], before any components are loaded.
    pub fn evaluate(
        &self,
        property_id: &PropertyId,
        period: &Period,
    ) -> Result<EvaluationResult, SplitError> {
        let Some(plan) = self.source.load_active_plan(property_id)? else {
            warn!("property {}: no active split plan", property_id);
            return Ok(EvaluationResult::empty(
                property_id.clone(),
                None,
                *period,
                EmptyReason::NoActivePlan,
            ));
        };
        if plan.is_expired_at(period.start()) {
            warn!(
                "property {}: plan {} expired before {}",
                property_id,
                plan.id(),
                period.start()
            );
            return Ok(EvaluationResult::empty(
                property_id.clone(),
                Some(&plan),
                *period,
                EmptyReason::PlanExpired,
            ));
        }
        plan.validate()
            .map_err(|e| AllocationError::from_plan_check(plan.id(), e))?;

        let components = self.source.load_components(property_id, period)?;
        if components.is_empty() {
            warn!(
                "property {}: no transaction components in {}",
                property_id, period
            );
            return Ok(EvaluationResult::empty(
                property_id.clone(),
                Some(&plan),
                *period,
                EmptyReason::NoComponents,
            ));
        }

        self.evaluate_plan(&plan, &components, period)
    }

    /// Fold a plan's layers over already loaded components.
    ///
    /// The plan is not re-validated here; the distributor still refuses
    /// percent sets that do not add up to 100 and mixed method rules.
    pub fn evaluate_plan(
        &self,
        plan: &SplitPlan,
        components: &[ResolvedComponent],
        period: &Period,
    ) -> Result<EvaluationResult, SplitError> {
        let settlement = plan.settlement_currency();
        let components = self.to_settlement(components, settlement)?;

        let mut total_fund = Money::ZERO;
        for component in components.iter().filter(|c| c.is_income()) {
            total_fund = total_fund
                .checked_add(component.amount)
                .ok_or_else(|| ValidationError::AmountOverflow(component.amount.to_decimal()))?;
        }

        let distributor = AllocationDistributor::new(self.currencies, &self.methods, settlement);
        let mut ledger = StakeholderLedger::new();
        let mut per_layer = Vec::with_capacity(plan.rules().len());

        let mut acc = LayerAccumulator::new(total_fund);
        for rule in plan.ordered_rules() {
            let selection = rule.evaluate_base(&components, &acc)?;
            let deltas = distributor.distribute(rule, selection.base)?;
            debug!(
                "plan {} layer {} ({}, {}): base {} over {} allocations",
                plan.id(),
                rule.order(),
                rule.id(),
                rule.base().mode(),
                selection.base,
                rule.allocations().len()
            );

            let allocated: Money = deltas.values().sum();
            if acc.consumed().checked_add(allocated).is_none() {
                return Err(AllocationError::Overflow {
                    rule_id: rule.id().clone(),
                }
                .into());
            }
            acc = acc.record(rule.order(), allocated);
            ledger.apply_deltas(&deltas);
            per_layer.push(LayerBreakdown {
                rule_id: rule.id().clone(),
                order: rule.order(),
                mode: rule.base().mode(),
                base_amount: selection.base,
                component_ids: selection.component_ids,
                deltas,
            });
        }

        info!(
            "property {}: plan {} split {} across {} stakeholders in {} layers",
            plan.property_id(),
            plan.id(),
            ledger.total(),
            ledger.len(),
            per_layer.len()
        );

        Ok(EvaluationResult {
            property_id: plan.property_id().clone(),
            plan_id: Some(plan.id().clone()),
            settlement_currency: Some(settlement.clone()),
            period: *period,
            total_fund,
            per_stakeholder_total: ledger,
            per_layer,
            empty_reason: None,
        })
    }

    fn to_settlement(
        &self,
        components: &[ResolvedComponent],
        settlement: &CurrencyCode,
    ) -> Result<Vec<ResolvedComponent>, SplitError> {
        components
            .iter()
            .map(|c| -> Result<ResolvedComponent, SplitError> {
                let amount = self.currencies.convert(c.amount, &c.currency, settlement)?;
                Ok(ResolvedComponent {
                    amount,
                    currency: settlement.clone(),
                    ..c.clone()
                })
            })
            .collect()
    }
}

impl<'a, S, M> SplitPlanRunner<'a, S, M>
where
    S: PlanSource + ComponentSource + Sync,
    M: MethodResolver,
{
    /// Evaluate independent requests in parallel. Each request gets its own
    /// result; a failing plan does not affect the others.
    pub fn evaluate_batch(
        &self,
        requests: &[(PropertyId, Period)],
    ) -> Vec<Result<EvaluationResult, SplitError>> {
        requests
            .par_iter()
            .map(|(property_id, period)| self.evaluate(property_id, period))
            .collect()
    }
}
