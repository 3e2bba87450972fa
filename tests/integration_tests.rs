use chrono::{TimeZone, Utc};
use rust_decimal_macros::dec;
use split_engine::core::ids::TeamId;
use split_engine::core::stakeholder::{Contact, Property, Stakeholder};
use split_engine::engine::runner::EmptyReason;
use split_engine::prelude::*;
use split_engine::scenario::Scenario;

fn house() -> PropertyId {
    PropertyId::new("house")
}

fn eur() -> CurrencyCode {
    CurrencyCode::new("EUR")
}

fn january() -> Period {
    Period::new(
        Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap(),
    )
    .unwrap()
}

/// A property with stakeholders A, B and C and no transactions yet.
fn base_store() -> InMemoryStore {
    let mut store = InMemoryStore::new();
    store.add_property(Property::new(house(), TeamId::new("team"), "Beach house", eur()));
    for name in ["A", "B", "C"] {
        store.add_contact(Contact::new(ContactId::new(name), TeamId::new("team"), name));
        store
            .add_stakeholder(Stakeholder::new(StakeholderId::new(name), house(), ContactId::new(name)))
            .unwrap();
    }
    store
}

fn income(id: &str, amount: i64) -> Transaction {
    Transaction::unconverted(
        TransactionId::new(id),
        house(),
        TransactionType::Income,
        Money::new(amount),
        eur(),
        Utc.with_ymd_and_hms(2026, 1, 15, 12, 0, 0).unwrap(),
    )
    .unwrap()
}

fn percent(id: &str, stakeholder: &str, value: rust_decimal::Decimal) -> Allocation {
    Allocation::percent(AllocationId::new(id), StakeholderId::new(stakeholder), value)
}

fn activate(store: &mut InMemoryStore, plan: SplitPlan) {
    let id = plan.id().clone();
    store.add_plan(plan).unwrap();
    store.activate_plan(&id).unwrap();
}

/// One income of 10000, profit layer, 60/40.
#[test]
fn profit_split_sixty_forty() {
    let mut store = base_store();
    store.add_transaction(income("t1", 10_000)).unwrap();
    activate(
        &mut store,
        SplitPlan::new(PlanId::new("plan"), house(), "Owners", eur()).with_rule(
            SplitRule::new(RuleId::new("profit"), 1, BaseSelector::profit())
                .with_allocation(percent("a", "A", dec!(60)))
                .with_allocation(percent("b", "B", dec!(40))),
        ),
    );

    let currencies = CurrencyTable::seeded();
    let runner = SplitPlanRunner::new(&store, &currencies);
    let result = runner.evaluate(&house(), &january()).unwrap();

    assert_eq!(result.total_for(&StakeholderId::new("A")), Money::new(6_000));
    assert_eq!(result.total_for(&StakeholderId::new("B")), Money::new(4_000));
    assert_eq!(result.per_layer().len(), 1);
    assert_eq!(result.per_layer()[0].base_amount, Money::new(10_000));
    assert!(result.is_conserved());
}

/// 33.33 / 33.33 / 33.34 of a base of 100 reconciles exactly.
#[test]
fn thirds_reconcile_exactly() {
    let mut store = base_store();
    store.add_transaction(income("t1", 100)).unwrap();
    activate(
        &mut store,
        SplitPlan::new(PlanId::new("plan"), house(), "Thirds", eur()).with_rule(
            SplitRule::new(RuleId::new("profit"), 1, BaseSelector::profit())
                .with_allocation(percent("a", "A", dec!(33.33)))
                .with_allocation(percent("b", "B", dec!(33.33)))
                .with_allocation(percent("c", "C", dec!(33.34))),
        ),
    );

    let currencies = CurrencyTable::seeded();
    let runner = SplitPlanRunner::new(&store, &currencies);
    let result = runner.evaluate(&house(), &january()).unwrap();

    assert_eq!(result.total_for(&StakeholderId::new("A")), Money::new(33));
    assert_eq!(result.total_for(&StakeholderId::new("B")), Money::new(33));
    assert_eq!(result.total_for(&StakeholderId::new("C")), Money::new(34));
    assert_eq!(result.total_allocated(), Money::new(100));
}

/// Components of rent=5000 and cleaning=1000; a rent-only layer sees 5000.
#[test]
fn category_include_filters_components() {
    let mut store = base_store();
    let booking = income("booking", 6_000)
        .with_component(
            TransactionComponent::unconverted(ComponentId::new("rent"), Money::new(5_000), eur())
                .unwrap()
                .with_category(CategoryId::new("rent")),
        )
        .with_component(
            TransactionComponent::unconverted(ComponentId::new("cleaning"), Money::new(1_000), eur())
                .unwrap()
                .with_category(CategoryId::new("cleaning")),
        );
    store.add_transaction(booking).unwrap();
    activate(
        &mut store,
        SplitPlan::new(PlanId::new("plan"), house(), "Rent", eur()).with_rule(
            SplitRule::new(
                RuleId::new("rent"),
                1,
                BaseSelector::include_categories([CategoryId::new("rent")]).unwrap(),
            )
            .with_allocation(percent("a", "A", dec!(100))),
        ),
    );

    let currencies = CurrencyTable::seeded();
    let runner = SplitPlanRunner::new(&store, &currencies);
    let result = runner.evaluate(&house(), &january()).unwrap();

    let layer = &result.per_layer()[0];
    assert_eq!(layer.base_amount, Money::new(5_000));
    assert_eq!(layer.component_ids, vec![ComponentId::new("rent")]);
    assert_eq!(result.total_for(&StakeholderId::new("A")), Money::new(5_000));
}

/// Fixed 2000 to A, then 100% of what is left to B, on a base of 10000.
#[test]
fn fixed_then_percent_remainder() {
    let mut store = base_store();
    store.add_transaction(income("t1", 10_000)).unwrap();
    activate(
        &mut store,
        SplitPlan::new(PlanId::new("plan"), house(), "Fee first", eur()).with_rule(
            SplitRule::new(RuleId::new("profit"), 1, BaseSelector::profit())
                .with_allocation(Allocation::fixed(
                    AllocationId::new("fee"),
                    StakeholderId::new("A"),
                    Money::new(2_000),
                    eur(),
                ))
                .with_allocation(percent("rest", "B", dec!(100))),
        ),
    );

    let currencies = CurrencyTable::seeded();
    let runner = SplitPlanRunner::new(&store, &currencies);
    let result = runner.evaluate(&house(), &january()).unwrap();

    assert_eq!(result.total_for(&StakeholderId::new("A")), Money::new(2_000));
    assert_eq!(result.total_for(&StakeholderId::new("B")), Money::new(8_000));
}

/// The second layer's `remaining` base depends on what the first allocated.
#[test]
fn remaining_layer_depends_on_lower_orders() {
    let mut store = base_store();
    store.add_transaction(income("t1", 10_000)).unwrap();
    let manager_fee = SplitRule::new(RuleId::new("fee"), 1, BaseSelector::profit())
        .with_allocation(Allocation::fixed(
            AllocationId::new("fee"),
            StakeholderId::new("C"),
            Money::new(1_500),
            eur(),
        ))
        .with_allocation(percent("owners", "A", dec!(100)));
    let owners = SplitRule::new(RuleId::new("owners"), 2, BaseSelector::remaining())
        .with_allocation(percent("a", "A", dec!(50)))
        .with_allocation(percent("b", "B", dec!(50)));
    activate(
        &mut store,
        SplitPlan::new(PlanId::new("plan"), house(), "Layered", eur())
            .with_rule(owners)
            .with_rule(manager_fee),
    );

    let currencies = CurrencyTable::seeded();
    let runner = SplitPlanRunner::new(&store, &currencies);
    let result = runner.evaluate(&house(), &january()).unwrap();

    // layer 1 hands out all 10000, so nothing remains for layer 2
    let layers = result.per_layer();
    assert_eq!(layers[0].rule_id, RuleId::new("fee"));
    assert_eq!(layers[1].base_amount, Money::ZERO);
    assert_eq!(result.total_for(&StakeholderId::new("C")), Money::new(1_500));
    assert_eq!(result.total_for(&StakeholderId::new("A")), Money::new(8_500));
    assert!(result.is_conserved());
}

/// A category layer consumes part of the fund; the remaining layer splits the rest.
#[test]
fn category_layer_then_remaining() {
    let mut store = base_store();
    store
        .add_transaction(income("rent", 9_000).with_category(CategoryId::new("rent")))
        .unwrap();
    store
        .add_transaction(income("cleaning", 1_000).with_category(CategoryId::new("cleaning")))
        .unwrap();
    let cleaning = SplitRule::new(
        RuleId::new("cleaning"),
        1,
        BaseSelector::include_categories([CategoryId::new("cleaning")]).unwrap(),
    )
    .with_allocation(percent("cleaner", "C", dec!(100)));
    let owners = SplitRule::new(RuleId::new("owners"), 2, BaseSelector::remaining())
        .with_allocation(percent("a", "A", dec!(60)))
        .with_allocation(percent("b", "B", dec!(40)));
    activate(
        &mut store,
        SplitPlan::new(PlanId::new("plan"), house(), "Layered", eur())
            .with_rule(cleaning)
            .with_rule(owners),
    );

    let currencies = CurrencyTable::seeded();
    let runner = SplitPlanRunner::new(&store, &currencies);
    let result = runner.evaluate(&house(), &january()).unwrap();

    assert_eq!(result.per_layer()[1].base_amount, Money::new(9_000));
    assert_eq!(result.total_for(&StakeholderId::new("C")), Money::new(1_000));
    assert_eq!(result.total_for(&StakeholderId::new("A")), Money::new(5_400));
    assert_eq!(result.total_for(&StakeholderId::new("B")), Money::new(3_600));
    assert_eq!(result.total_allocated(), result.total_fund());
}

/// A loss is shared like a profit, with negative amounts.
#[test]
fn loss_is_shared() {
    let mut store = base_store();
    store.add_transaction(income("t1", 1_000)).unwrap();
    let repair = Transaction::unconverted(
        TransactionId::new("repair"),
        house(),
        TransactionType::Expense,
        Money::new(4_001),
        eur(),
        Utc.with_ymd_and_hms(2026, 1, 20, 0, 0, 0).unwrap(),
    )
    .unwrap()
    .with_category(CategoryId::new("maintenance"));
    store.add_transaction(repair).unwrap();
    activate(
        &mut store,
        SplitPlan::new(PlanId::new("plan"), house(), "Even", eur()).with_rule(
            SplitRule::new(RuleId::new("profit"), 1, BaseSelector::profit())
                .with_allocation(percent("a", "A", dec!(50)))
                .with_allocation(percent("b", "B", dec!(50))),
        ),
    );

    let currencies = CurrencyTable::seeded();
    let runner = SplitPlanRunner::new(&store, &currencies);
    let result = runner.evaluate(&house(), &january()).unwrap();

    assert_eq!(result.total_base(), Money::new(-3_001));
    assert_eq!(result.total_for(&StakeholderId::new("A")), Money::new(-1_500));
    assert_eq!(result.total_for(&StakeholderId::new("B")), Money::new(-1_501));
    assert!(result.is_conserved());
}

/// USD transactions are brought into the EUR settlement currency first.
#[test]
fn foreign_currency_components_are_converted() {
    let mut store = base_store();
    let usd_booking = Transaction::unconverted(
        TransactionId::new("usd"),
        house(),
        TransactionType::Income,
        Money::new(21_600),
        CurrencyCode::new("USD"),
        Utc.with_ymd_and_hms(2026, 1, 5, 0, 0, 0).unwrap(),
    )
    .unwrap();
    store.add_transaction(usd_booking).unwrap();
    activate(
        &mut store,
        SplitPlan::new(PlanId::new("plan"), house(), "Even", eur()).with_rule(
            SplitRule::new(RuleId::new("profit"), 1, BaseSelector::profit())
                .with_allocation(percent("a", "A", dec!(50)))
                .with_allocation(percent("b", "B", dec!(50))),
        ),
    );

    let currencies = CurrencyTable::seeded();
    let runner = SplitPlanRunner::new(&store, &currencies);
    let result = runner.evaluate(&house(), &january()).unwrap();

    assert_eq!(result.settlement_currency(), Some(&eur()));
    assert_eq!(result.total_fund(), Money::new(20_000));
    assert_eq!(result.total_for(&StakeholderId::new("A")), Money::new(10_000));
}

#[test]
fn invalid_plan_cannot_be_activated() {
    let mut store = base_store();
    let plan = SplitPlan::new(PlanId::new("plan"), house(), "Broken", eur()).with_rule(
        SplitRule::new(RuleId::new("profit"), 1, BaseSelector::profit())
            .with_allocation(percent("a", "A", dec!(60)))
            .with_allocation(percent("b", "B", dec!(30))),
    );
    store.add_plan(plan).unwrap();

    let err = store.activate_plan(&PlanId::new("plan")).unwrap_err();
    assert!(matches!(err, ValidationError::PercentSum { .. }));
    assert!(store.load_active_plan(&house()).unwrap().is_none());
}

#[test]
fn no_active_plan_yields_empty_result() {
    let mut store = base_store();
    store.add_transaction(income("t1", 10_000)).unwrap();
    let currencies = CurrencyTable::seeded();
    let runner = SplitPlanRunner::new(&store, &currencies);

    let result = runner.evaluate(&house(), &january()).unwrap();
    assert_eq!(result.empty_reason(), Some(EmptyReason::NoActivePlan));
    assert_eq!(result.total_allocated(), Money::ZERO);
}

#[test]
fn method_allocations_use_registered_strategies() {
    let mut store = base_store();
    store.add_transaction(income("t1", 9_000)).unwrap();
    activate(
        &mut store,
        SplitPlan::new(PlanId::new("plan"), house(), "Nights", eur()).with_rule(
            SplitRule::new(RuleId::new("nights"), 1, BaseSelector::profit())
                .with_allocation(Allocation::method(
                    AllocationId::new("m-a"),
                    StakeholderId::new("A"),
                    MethodDescriptor::new("one-third"),
                ))
                .with_allocation(Allocation::method(
                    AllocationId::new("m-b"),
                    StakeholderId::new("B"),
                    MethodDescriptor::new("rest"),
                )),
        ),
    );

    let mut registry = MethodRegistry::new();
    registry.register("one-third", |ctx| Ok(Money::new(ctx.base.minor_units() / 3)));
    registry.register("rest", |ctx| Ok(ctx.unresolved));

    let currencies = CurrencyTable::seeded();
    let runner = SplitPlanRunner::new(&store, &currencies).with_methods(&registry);
    let result = runner.evaluate(&house(), &january()).unwrap();

    assert_eq!(result.total_for(&StakeholderId::new("A")), Money::new(3_000));
    assert_eq!(result.total_for(&StakeholderId::new("B")), Money::new(6_000));

    // Without strategies the same plan fails instead of guessing.
    let bare = SplitPlanRunner::new(&store, &currencies);
    assert!(matches!(
        bare.evaluate(&house(), &january()),
        Err(SplitError::Allocation(AllocationError::Method { .. }))
    ));
}

#[test]
fn scenario_file_round_trip_through_runner() {
    let json = r#"{
        "properties": [
            {"id": "house", "team_id": "team", "name": "House", "settlement_currency": "EUR"}
        ],
        "contacts": [
            {"id": "alice", "team_id": "team", "name": "Alice"},
            {"id": "bob", "team_id": "team", "name": "Bob"}
        ],
        "stakeholders": [
            {"id": "s-alice", "property_id": "house", "contact_id": "alice"},
            {"id": "s-bob", "property_id": "house", "contact_id": "bob"}
        ],
        "transactions": [
            {"id": "t1", "property_id": "house", "type": "income", "category_id": "rent",
             "original_amount": 10000, "original_currency": "EUR",
             "occurred_at": "2026-01-10T00:00:00Z"},
            {"id": "t2", "property_id": "house", "type": "income", "category_id": "rent",
             "original_amount": 10000, "original_currency": "EUR",
             "occurred_at": "2026-03-10T00:00:00Z"}
        ],
        "plans": [
            {"id": "live", "property_id": "house", "name": "Live", "settlement_currency": "EUR",
             "is_active": true,
             "rules": [{"id": "r", "order": 1, "base": {"mode": "profit"},
                        "allocations": [
                            {"id": "a", "stakeholder_id": "s-alice", "type": "percent", "value": "60"},
                            {"id": "b", "stakeholder_id": "s-bob", "type": "percent", "value": "40"}
                        ]}]}
        ]
    }"#;
    let store = Scenario::from_json(json).unwrap().into_store().unwrap();
    let currencies = CurrencyTable::seeded();
    let runner = SplitPlanRunner::new(&store, &currencies);

    let result = runner.evaluate(&house(), &january()).unwrap();
    assert_eq!(result.total_for(&StakeholderId::new("s-alice")), Money::new(6_000));

    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["per_stakeholder_total"]["s-bob"], 4_000);
    assert_eq!(json["per_layer"][0]["base_amount"], 10_000);
}
