//! Random but valid scenarios for benchmarks and smoke tests.
//!
//! Every generated plan passes activation: percentages are drawn in basis
//! points and always sum to exactly 100, and the last layer of each plan
//! splits whatever the earlier ones left.
use crate::core::currency::CurrencyCode;
use crate::core::ids::{
    AllocationId, CategoryId, ComponentId, ContactId, PlanId, PropertyId, RuleId, StakeholderId,
    TeamId, TransactionId,
};
use crate::core::money::Money;
use crate::core::stakeholder::{Contact, Property, Stakeholder};
use crate::core::transaction::{
    Transaction, TransactionCategory, TransactionComponent, TransactionType,
};
use crate::engine::source::Period;
use crate::error::ValidationError;
use crate::scenario::Scenario;
use crate::split::allocation::Allocation;
use crate::split::plan::SplitPlan;
use crate::split::rule::SplitRule;
use crate::split::selector::BaseSelector;
use chrono::{DateTime, Duration, TimeZone, Utc};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;

const BASIS_POINTS: i64 = 10_000;

#[derive(Debug, Clone)]
pub struct ScenarioConfig {
    pub property_count: usize,
    /// Stakeholders per property.
    pub stakeholder_count: usize,
    /// Transactions per property.
    pub transaction_count: usize,
    /// Layers per plan, the last one always in `remaining` mode.
    pub layer_count: usize,
    /// Currencies transactions are recorded in; plans settle in the first.
    pub currencies: Vec<CurrencyCode>,
    /// Inclusive bounds of a transaction amount, in minor units.
    pub min_amount: i64,
    pub max_amount: i64,
    /// Share of transactions that are income.
    pub income_ratio: f64,
    /// Fixed seed for reproducible output; `None` draws from the OS.
    pub seed: Option<u64>,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            property_count: 1,
            stakeholder_count: 4,
            transaction_count: 50,
            layer_count: 3,
            currencies: vec![CurrencyCode::new("EUR"), CurrencyCode::new("USD")],
            min_amount: 1_000,
            max_amount: 500_000,
            income_ratio: 0.7,
            seed: None,
        }
    }
}

/// The calendar year generated transactions fall into.
pub fn generated_period() -> Result<Period, ValidationError> {
    Period::new(year_start(), year_start() + Duration::days(365))
}

fn year_start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or_default()
}

pub fn generate_random_scenario(config: &ScenarioConfig) -> Result<Scenario, ValidationError> {
    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    generate_with_rng(config, &mut rng)
}

pub fn generate_with_rng<R: Rng>(
    config: &ScenarioConfig,
    rng: &mut R,
) -> Result<Scenario, ValidationError> {
    let team = TeamId::new("TEAM-000");
    let settlement = config
        .currencies
        .first()
        .cloned()
        .unwrap_or_else(|| CurrencyCode::new("EUR"));
    let categories: Vec<CategoryId> = TransactionCategory::stock_categories()
        .into_iter()
        .map(|c| c.id)
        .collect();

    let mut scenario = Scenario::default();
    scenario.contacts = (0..config.stakeholder_count)
        .map(|i| Contact::new(contact_id(i), team.clone(), format!("Contact {i}")))
        .collect();

    for p in 0..config.property_count {
        let property_id = PropertyId::new(format!("PROP-{p:03}"));
        scenario.properties.push(Property::new(
            property_id.clone(),
            team.clone(),
            format!("Property {p}"),
            settlement.clone(),
        ));

        let stakeholders: Vec<StakeholderId> = (0..config.stakeholder_count)
            .map(|i| StakeholderId::new(format!("SH-{p:03}-{i:03}")))
            .collect();
        for (i, id) in stakeholders.iter().enumerate() {
            scenario.stakeholders.push(Stakeholder::new(
                id.clone(),
                property_id.clone(),
                contact_id(i),
            ));
        }

        for t in 0..config.transaction_count {
            let tx = random_transaction(config, rng, &property_id, &categories, p, t)?;
            scenario.transactions.push(tx);
        }

        if !stakeholders.is_empty() {
            let mut plan = random_plan(config, rng, &property_id, &settlement, &stakeholders, &categories);
            plan.set_active(true);
            scenario.plans.push(plan);
        }
    }

    Ok(scenario)
}

fn contact_id(i: usize) -> ContactId {
    ContactId::new(format!("CONTACT-{i:03}"))
}

fn random_transaction<R: Rng>(
    config: &ScenarioConfig,
    rng: &mut R,
    property_id: &PropertyId,
    categories: &[CategoryId],
    property: usize,
    index: usize,
) -> Result<Transaction, ValidationError> {
    let id = TransactionId::new(format!("TX-{property:03}-{index:05}"));
    let kind = if rng.gen_bool(config.income_ratio.clamp(0.0, 1.0)) {
        TransactionType::Income
    } else {
        TransactionType::Expense
    };
    let currency = config
        .currencies
        .choose(rng)
        .cloned()
        .unwrap_or_else(|| CurrencyCode::new("EUR"));
    let low = config.min_amount.max(0);
    let high = config.max_amount.max(low);
    let amount = Money::new(rng.gen_range(low..=high));
    let occurred_at = year_start() + Duration::seconds(rng.gen_range(0..365 * 86_400));

    let mut tx = Transaction::unconverted(
        id.clone(),
        property_id.clone(),
        kind,
        amount,
        currency.clone(),
        occurred_at,
    )?;
    if let Some(category) = categories.choose(rng) {
        tx = tx.with_category(category.clone());
    }

    // A third of the transactions carry two components, the second with
    // its own category.
    if rng.gen_ratio(1, 3) && amount.minor_units() > 1 {
        let first = Money::new(rng.gen_range(1..amount.minor_units()));
        let second = amount - first;
        tx = tx.with_component(TransactionComponent::unconverted(
            ComponentId::new(format!("{id}-a")),
            first,
            currency.clone(),
        )?);
        let mut component =
            TransactionComponent::unconverted(ComponentId::new(format!("{id}-b")), second, currency)?;
        if let Some(category) = categories.choose(rng) {
            component = component.with_category(category.clone());
        }
        tx = tx.with_component(component);
    }
    Ok(tx)
}

fn random_plan<R: Rng>(
    config: &ScenarioConfig,
    rng: &mut R,
    property_id: &PropertyId,
    settlement: &CurrencyCode,
    stakeholders: &[StakeholderId],
    categories: &[CategoryId],
) -> SplitPlan {
    let plan_id = format!("PLAN-{property_id}");
    let mut plan = SplitPlan::new(PlanId::new(plan_id.clone()), property_id.clone(), "Generated", settlement.clone());

    let layers = config.layer_count.max(1);
    for order in 1..=layers {
        let base = if order == layers {
            BaseSelector::remaining()
        } else {
            random_selector(rng, categories)
        };
        let mut rule = SplitRule::new(RuleId::new(format!("{plan_id}-L{order}")), order as u32, base);
        for (i, (stakeholder, percent)) in random_percents(rng, stakeholders).into_iter().enumerate() {
            rule = rule.with_allocation(Allocation::percent(
                AllocationId::new(format!("{plan_id}-L{order}-A{i}")),
                stakeholder,
                percent,
            ));
        }
        plan = plan.with_rule(rule);
    }
    plan
}

fn random_selector<R: Rng>(rng: &mut R, categories: &[CategoryId]) -> BaseSelector {
    let picked: Vec<CategoryId> = categories
        .choose_multiple(rng, 2)
        .cloned()
        .collect();
    let selector = if rng.gen_bool(0.5) {
        BaseSelector::include_categories(picked)
    } else {
        BaseSelector::exclude_categories(picked)
    };
    match selector {
        Ok(selector) if rng.gen_bool(0.5) => selector.expenses_only(),
        Ok(selector) => selector,
        Err(_) => BaseSelector::profit(),
    }
}

/// A random subset of stakeholders with percentages summing to exactly 100.
fn random_percents<R: Rng>(
    rng: &mut R,
    stakeholders: &[StakeholderId],
) -> Vec<(StakeholderId, Decimal)> {
    let count = rng.gen_range(1..=stakeholders.len());
    let chosen: Vec<StakeholderId> = stakeholders.choose_multiple(rng, count).cloned().collect();

    let mut cuts: Vec<i64> = (1..chosen.len())
        .map(|_| rng.gen_range(0..=BASIS_POINTS))
        .collect();
    cuts.push(0);
    cuts.push(BASIS_POINTS);
    cuts.sort_unstable();

    chosen
        .into_iter()
        .zip(cuts.windows(2))
        .map(|(stakeholder, w)| (stakeholder, Decimal::new(w[1] - w[0], 2)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::currency::CurrencyTable;
    use crate::engine::runner::SplitPlanRunner;

    fn config() -> ScenarioConfig {
        ScenarioConfig {
            property_count: 2,
            stakeholder_count: 5,
            transaction_count: 40,
            layer_count: 4,
            seed: Some(7),
            ..Default::default()
        }
    }

    #[test]
    fn test_random_scenario_generation() {
        let scenario = generate_random_scenario(&config()).unwrap();
        assert_eq!(scenario.properties.len(), 2);
        assert_eq!(scenario.stakeholders.len(), 10);
        assert_eq!(scenario.transactions.len(), 80);
        assert_eq!(scenario.plans.len(), 2);
        for plan in &scenario.plans {
            assert!(plan.validate().is_ok());
            assert_eq!(plan.rules().len(), 4);
        }
    }

    #[test]
    fn test_seeded_generation_is_reproducible() {
        let a = generate_random_scenario(&config()).unwrap();
        let b = generate_random_scenario(&config()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_random_scenario_evaluates() {
        let scenario = generate_random_scenario(&config()).unwrap();
        let property = scenario.properties[0].id.clone();
        let store = scenario.into_store().unwrap();
        let currencies = CurrencyTable::seeded();
        let runner = SplitPlanRunner::new(&store, &currencies);

        let result = runner.evaluate(&property, &generated_period().unwrap()).unwrap();
        assert!(result.is_conserved());
        // the last layer splits what is left, so everything allocated is the fund
        assert_eq!(result.total_allocated(), result.total_fund());
    }
}
