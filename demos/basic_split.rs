//! A beach house shared by two owners and a property manager.
//!
//! Layer 1 pays the manager a flat fee plus the cleaning income, layer 2
//! splits whatever is left 60/40 between the owners.

use anyhow::Result;
use chrono::{NaiveDate, TimeZone, Utc};
use rust_decimal_macros::dec;
use split_engine::core::ids::TeamId;
use split_engine::core::stakeholder::{Contact, Property, Stakeholder};
use split_engine::prelude::*;

fn main() -> Result<()> {
    println!("╔════════════════════════════════════════╗");
    println!("║  split-engine: Basic Split Example     ║");
    println!("╚════════════════════════════════════════╝\n");

    let team = TeamId::new("team");
    let house = PropertyId::new("beach-house");
    let eur = CurrencyCode::new("EUR");

    let mut store = InMemoryStore::new();
    store.add_property(Property::new(house.clone(), team.clone(), "Beach house", eur.clone()));
    for name in ["ana", "ben", "manager"] {
        store.add_contact(Contact::new(ContactId::new(name), team.clone(), name));
        store.add_stakeholder(Stakeholder::new(
            StakeholderId::new(name),
            house.clone(),
            ContactId::new(name),
        ))?;
    }

    // --- July bookings ---
    let july = |day| Utc.with_ymd_and_hms(2026, 7, day, 12, 0, 0).unwrap();
    let booking = Transaction::unconverted(
        TransactionId::new("booking-1"),
        house.clone(),
        TransactionType::Income,
        Money::new(240_000),
        eur.clone(),
        july(4),
    )?
    .with_component(
        TransactionComponent::unconverted(ComponentId::new("booking-1-rent"), Money::new(220_000), eur.clone())?
            .with_category(CategoryId::new("rent")),
    )
    .with_component(
        TransactionComponent::unconverted(ComponentId::new("booking-1-clean"), Money::new(20_000), eur.clone())?
            .with_category(CategoryId::new("cleaning")),
    );
    store.add_transaction(booking)?;

    // An American guest paying in dollars
    store.add_transaction(
        Transaction::unconverted(
            TransactionId::new("booking-2"),
            house.clone(),
            TransactionType::Income,
            Money::new(162_000),
            CurrencyCode::new("USD"),
            july(18),
        )?
        .with_category(CategoryId::new("rent")),
    )?;

    store.add_transaction(
        Transaction::unconverted(
            TransactionId::new("platform-fee"),
            house.clone(),
            TransactionType::Expense,
            Money::new(36_000),
            eur.clone(),
            july(31),
        )?
        .with_category(CategoryId::new("platform-fee")),
    )?;

    // --- The plan ---
    let manager = SplitRule::new(
        RuleId::new("manager"),
        1,
        BaseSelector::include_categories([CategoryId::new("cleaning")])?.income_only(),
    )
    .with_allocation(Allocation::percent(
        AllocationId::new("manager-cleaning"),
        StakeholderId::new("manager"),
        dec!(100),
    ));
    let owners = SplitRule::new(RuleId::new("owners"), 2, BaseSelector::remaining())
        .with_allocation(Allocation::fixed(
            AllocationId::new("manager-fee"),
            StakeholderId::new("manager"),
            Money::new(15_000),
            eur.clone(),
        ))
        .with_allocation(Allocation::percent(AllocationId::new("ana"), StakeholderId::new("ana"), dec!(60)))
        .with_allocation(Allocation::percent(AllocationId::new("ben"), StakeholderId::new("ben"), dec!(40)));

    let plan = SplitPlan::new(PlanId::new("summer"), house.clone(), "Summer 2026", eur.clone())
        .with_rule(manager)
        .with_rule(owners);
    store.add_plan(plan)?;
    store.activate_plan(&PlanId::new("summer"))?;

    // --- Evaluate July ---
    let currencies = CurrencyTable::seeded();
    let runner = SplitPlanRunner::new(&store, &currencies);
    let period = Period::from_dates(
        NaiveDate::from_ymd_opt(2026, 7, 1).unwrap(),
        NaiveDate::from_ymd_opt(2026, 7, 31).unwrap(),
    )?;
    let result = runner.evaluate(&house, &period)?;

    println!("{}", result);

    println!("━━━ Payouts ━━━\n");
    let euro = currencies.get(&eur)?;
    for (stakeholder, amount) in result.per_stakeholder_total().positions() {
        println!("  {:<10} {:>12}", stakeholder, euro.format(*amount));
    }
    println!(
        "\n  conserved: {}  (fund {}, allocated {})",
        result.is_conserved(),
        euro.format(result.total_fund()),
        euro.format(result.total_allocated())
    );
    Ok(())
}
