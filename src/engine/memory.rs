use crate::core::ids::{CategoryId, ContactId, PlanId, PropertyId, StakeholderId};
use crate::core::stakeholder::{Contact, Property, Stakeholder};
use crate::core::transaction::{ResolvedComponent, Transaction, TransactionCategory};
use crate::engine::source::{ComponentSource, Period, PlanSource};
use crate::error::{SourceError, ValidationError};
use crate::split::plan::SplitPlan;
use crate::split::selector::CategoryFilter;
use log::{debug, info};
use std::collections::BTreeMap;

fn unknown(kind: &'static str, id: impl ToString) -> ValidationError {
    ValidationError::UnknownReference {
        kind,
        id: id.to_string(),
    }
}

/// Process-local persistence for properties, stakeholders, transactions and
/// plans.
///
/// Referential checks happen on insert. Plans go in inactive and only become
/// active through [`activate_plan`](Self::activate_plan).
///
/// # Examples
///
/// ```
/// use split_engine::core::ids::{PropertyId, TeamId};
/// use split_engine::core::currency::CurrencyCode;
/// use split_engine::core::stakeholder::Property;
/// use split_engine::engine::memory::InMemoryStore;
/// use split_engine::engine::source::PlanSource;
///
/// let mut store = InMemoryStore::new();
/// store.add_property(Property::new(
///     PropertyId::new("house"),
///     TeamId::new("team"),
///     "Beach house",
///     CurrencyCode::new("EUR"),
/// ));
/// assert!(store.load_active_plan(&PropertyId::new("house")).unwrap().is_none());
/// ```
#[derive(Debug, Clone)]
pub struct InMemoryStore {
    properties: BTreeMap<PropertyId, Property>,
    contacts: BTreeMap<ContactId, Contact>,
    stakeholders: BTreeMap<StakeholderId, Stakeholder>,
    categories: BTreeMap<CategoryId, TransactionCategory>,
    transactions: Vec<Transaction>,
    plans: BTreeMap<PlanId, SplitPlan>,
}

impl InMemoryStore {
    /// Empty store with the stock categories registered.
    pub fn new() -> Self {
        Self {
            properties: BTreeMap::new(),
            contacts: BTreeMap::new(),
            stakeholders: BTreeMap::new(),
            categories: TransactionCategory::stock_categories()
                .into_iter()
                .map(|c| (c.id.clone(), c))
                .collect(),
            transactions: Vec::new(),
            plans: BTreeMap::new(),
        }
    }

    pub fn add_property(&mut self, property: Property) {
        self.properties.insert(property.id.clone(), property);
    }

    pub fn add_contact(&mut self, contact: Contact) {
        self.contacts.insert(contact.id.clone(), contact);
    }

    pub fn add_category(&mut self, category: TransactionCategory) {
        self.categories.insert(category.id.clone(), category);
    }

    /// Bind a contact to a property; one binding per (property, contact).
    pub fn add_stakeholder(&mut self, stakeholder: Stakeholder) -> Result<(), ValidationError> {
        if !self.properties.contains_key(&stakeholder.property_id) {
            return Err(unknown("property", &stakeholder.property_id));
        }
        if !self.contacts.contains_key(&stakeholder.contact_id) {
            return Err(unknown("contact", &stakeholder.contact_id));
        }
        let taken = self.stakeholders.values().any(|s| {
            s.id != stakeholder.id
                && s.property_id == stakeholder.property_id
                && s.contact_id == stakeholder.contact_id
        });
        if taken {
            return Err(ValidationError::DuplicateStakeholder {
                property_id: stakeholder.property_id,
                contact_id: stakeholder.contact_id,
            });
        }
        self.stakeholders.insert(stakeholder.id.clone(), stakeholder);
        Ok(())
    }

    pub fn add_transaction(&mut self, transaction: Transaction) -> Result<(), ValidationError> {
        if !self.properties.contains_key(transaction.property_id()) {
            return Err(unknown("property", transaction.property_id()));
        }
        if let Some(contact_id) = transaction.contact_id() {
            if !self.contacts.contains_key(contact_id) {
                return Err(unknown("contact", contact_id));
            }
        }
        let categories = transaction
            .category_id()
            .into_iter()
            .chain(transaction.components().iter().filter_map(|c| c.category_id()));
        for category_id in categories {
            if !self.categories.contains_key(category_id) {
                return Err(unknown("category", category_id));
            }
        }
        self.transactions.push(transaction);
        Ok(())
    }

    /// Store a plan as a draft. Re-adding an id replaces the draft and
    /// deactivates it.
    pub fn add_plan(&mut self, mut plan: SplitPlan) -> Result<(), ValidationError> {
        if !self.properties.contains_key(plan.property_id()) {
            return Err(unknown("property", plan.property_id()));
        }
        plan.set_active(false);
        self.plans.insert(plan.id().clone(), plan);
        Ok(())
    }

    /// Validate a stored plan and make it the property's only active plan.
    ///
    /// On error nothing changes: the previously active plan stays active.
    pub fn activate_plan(&mut self, plan_id: &PlanId) -> Result<(), ValidationError> {
        let plan = self.plans.get(plan_id).ok_or_else(|| unknown("plan", plan_id))?;
        plan.validate()?;
        self.check_references(plan)?;

        let property_id = plan.property_id().clone();
        for other in self.plans.values_mut() {
            if other.property_id() == &property_id {
                other.set_active(other.id() == plan_id);
            }
        }
        info!("activated plan {} for property {}", plan_id, property_id);
        Ok(())
    }

    pub fn deactivate_plan(&mut self, plan_id: &PlanId) -> Result<(), ValidationError> {
        let plan = self
            .plans
            .get_mut(plan_id)
            .ok_or_else(|| unknown("plan", plan_id))?;
        plan.set_active(false);
        debug!("deactivated plan {}", plan_id);
        Ok(())
    }

    fn check_references(&self, plan: &SplitPlan) -> Result<(), ValidationError> {
        for stakeholder_id in plan.stakeholder_ids() {
            let stakeholder = self
                .stakeholders
                .get(stakeholder_id)
                .ok_or_else(|| unknown("stakeholder", stakeholder_id))?;
            if &stakeholder.property_id != plan.property_id() {
                return Err(ValidationError::ForeignStakeholder {
                    stakeholder_id: stakeholder_id.clone(),
                    property_id: plan.property_id().clone(),
                });
            }
        }
        for rule in plan.rules() {
            let ids = match rule.base().filter() {
                Some(CategoryFilter::Include(ids)) | Some(CategoryFilter::Exclude(ids)) => ids,
                None => continue,
            };
            if let Some(missing) = ids.iter().find(|id| !self.categories.contains_key(*id)) {
                return Err(unknown("category", missing));
            }
        }
        Ok(())
    }

    pub fn property(&self, property_id: &PropertyId) -> Option<&Property> {
        self.properties.get(property_id)
    }

    pub fn properties(&self) -> impl Iterator<Item = &Property> {
        self.properties.values()
    }

    pub fn stakeholder(&self, stakeholder_id: &StakeholderId) -> Option<&Stakeholder> {
        self.stakeholders.get(stakeholder_id)
    }

    /// Stakeholders bound to a property, in id order.
    pub fn stakeholders_of(&self, property_id: &PropertyId) -> Vec<&Stakeholder> {
        self.stakeholders
            .values()
            .filter(|s| &s.property_id == property_id)
            .collect()
    }

    pub fn contact(&self, contact_id: &ContactId) -> Option<&Contact> {
        self.contacts.get(contact_id)
    }

    pub fn plan(&self, plan_id: &PlanId) -> Option<&SplitPlan> {
        self.plans.get(plan_id)
    }

    pub fn plans(&self) -> impl Iterator<Item = &SplitPlan> {
        self.plans.values()
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PlanSource for InMemoryStore {
    fn load_active_plan(&self, property_id: &PropertyId) -> Result<Option<SplitPlan>, SourceError> {
        if !self.properties.contains_key(property_id) {
            return Err(SourceError::UnknownProperty(property_id.clone()));
        }
        Ok(self
            .plans
            .values()
            .find(|p| p.property_id() == property_id && p.is_active())
            .cloned())
    }
}

impl ComponentSource for InMemoryStore {
    fn load_components(
        &self,
        property_id: &PropertyId,
        period: &Period,
    ) -> Result<Vec<ResolvedComponent>, SourceError> {
        if !self.properties.contains_key(property_id) {
            return Err(SourceError::UnknownProperty(property_id.clone()));
        }
        Ok(self
            .transactions
            .iter()
            .filter(|t| t.property_id() == property_id && period.contains(t.occurred_at()))
            .flat_map(Transaction::resolve_components)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::currency::CurrencyCode;
    use crate::core::ids::{AllocationId, RuleId, TeamId, TransactionId};
    use crate::core::money::Money;
    use crate::core::transaction::TransactionType;
    use crate::split::allocation::Allocation;
    use crate::split::rule::SplitRule;
    use crate::split::selector::BaseSelector;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn store() -> InMemoryStore {
        let mut store = InMemoryStore::new();
        for house in ["house", "flat"] {
            store.add_property(Property::new(
                PropertyId::new(house),
                TeamId::new("team"),
                house,
                CurrencyCode::new("EUR"),
            ));
        }
        for name in ["alice", "bob"] {
            store.add_contact(Contact::new(ContactId::new(name), TeamId::new("team"), name));
        }
        store
            .add_stakeholder(Stakeholder::new(
                StakeholderId::new("s-alice"),
                PropertyId::new("house"),
                ContactId::new("alice"),
            ))
            .unwrap();
        store
            .add_stakeholder(Stakeholder::new(
                StakeholderId::new("s-bob-flat"),
                PropertyId::new("flat"),
                ContactId::new("bob"),
            ))
            .unwrap();
        store
    }

    fn plan(id: &str, stakeholder: &str) -> SplitPlan {
        SplitPlan::new(
            PlanId::new(id),
            PropertyId::new("house"),
            id,
            CurrencyCode::new("EUR"),
        )
        .with_rule(
            SplitRule::new(RuleId::new(format!("{id}-r1")), 1, BaseSelector::profit()).with_allocation(
                Allocation::percent(AllocationId::new("a"), StakeholderId::new(stakeholder), dec!(100)),
            ),
        )
    }

    #[test]
    fn test_duplicate_stakeholder_binding() {
        let mut store = store();
        let result = store.add_stakeholder(Stakeholder::new(
            StakeholderId::new("s-alice-2"),
            PropertyId::new("house"),
            ContactId::new("alice"),
        ));
        assert!(matches!(result, Err(ValidationError::DuplicateStakeholder { .. })));
    }

    #[test]
    fn test_activation_switches_active_plan() {
        let mut store = store();
        store.add_plan(plan("p1", "s-alice")).unwrap();
        store.add_plan(plan("p2", "s-alice")).unwrap();
        let house = PropertyId::new("house");
        assert!(store.load_active_plan(&house).unwrap().is_none());

        store.activate_plan(&PlanId::new("p1")).unwrap();
        store.activate_plan(&PlanId::new("p2")).unwrap();

        let active = store.load_active_plan(&house).unwrap().unwrap();
        assert_eq!(active.id(), &PlanId::new("p2"));
        assert!(!store.plan(&PlanId::new("p1")).unwrap().is_active());
    }

    #[test]
    fn test_foreign_stakeholder_rejected() {
        let mut store = store();
        store.add_plan(plan("p1", "s-alice")).unwrap();
        store.activate_plan(&PlanId::new("p1")).unwrap();
        store.add_plan(plan("p2", "s-bob-flat")).unwrap();

        let result = store.activate_plan(&PlanId::new("p2"));
        assert!(matches!(result, Err(ValidationError::ForeignStakeholder { .. })));
        // the previous plan stays active
        let active = store.load_active_plan(&PropertyId::new("house")).unwrap().unwrap();
        assert_eq!(active.id(), &PlanId::new("p1"));
    }

    #[test]
    fn test_components_filtered_by_period() {
        let mut store = store();
        let house = PropertyId::new("house");
        let eur = CurrencyCode::new("EUR");
        for (id, month) in [("jan", 1), ("feb", 2)] {
            let tx = Transaction::unconverted(
                TransactionId::new(id),
                house.clone(),
                TransactionType::Income,
                Money::new(1_000),
                eur.clone(),
                Utc.with_ymd_and_hms(2026, month, 15, 0, 0, 0).unwrap(),
            )
            .unwrap();
            store.add_transaction(tx).unwrap();
        }

        let january = Period::new(
            Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap(),
        )
        .unwrap();
        let components = store.load_components(&house, &january).unwrap();
        assert_eq!(components.len(), 1);
        assert_eq!(components[0].transaction_id, TransactionId::new("jan"));
    }

    #[test]
    fn test_unknown_property() {
        let store = store();
        assert!(matches!(
            store.load_active_plan(&PropertyId::new("castle")),
            Err(SourceError::UnknownProperty(_))
        ));
    }

    #[test]
    fn test_unknown_category_rejected() {
        let mut store = store();
        let tx = Transaction::unconverted(
            TransactionId::new("t"),
            PropertyId::new("house"),
            TransactionType::Expense,
            Money::new(10),
            CurrencyCode::new("EUR"),
            Utc::now(),
        )
        .unwrap()
        .with_category(CategoryId::new("yacht-fuel"));
        assert!(matches!(
            store.add_transaction(tx),
            Err(ValidationError::UnknownReference { kind: "category", .. })
        ));
    }
}
