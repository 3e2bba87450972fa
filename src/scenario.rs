//! JSON scenario files: everything needed to evaluate plans offline.
use crate::core::currency::{Currency, CurrencyTable, FxError};
use crate::core::ids::PlanId;
use crate::core::stakeholder::{Contact, Property, Stakeholder};
use crate::core::transaction::{Transaction, TransactionCategory};
use crate::engine::memory::InMemoryStore;
use crate::error::ValidationError;
use crate::split::plan::SplitPlan;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    /// Rows merged over the configured reference currencies.
    #[serde(default)]
    pub currencies: Vec<Currency>,
    #[serde(default)]
    pub properties: Vec<Property>,
    #[serde(default)]
    pub contacts: Vec<Contact>,
    #[serde(default)]
    pub stakeholders: Vec<Stakeholder>,
    /// Custom categories; the stock set is always available.
    #[serde(default)]
    pub categories: Vec<TransactionCategory>,
    #[serde(default)]
    pub transactions: Vec<Transaction>,
    /// Plans flagged `is_active` are activated when loaded.
    #[serde(default)]
    pub plans: Vec<SplitPlan>,
}

impl Scenario {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// `base` with this scenario's currency rows inserted over it.
    pub fn currency_table(&self, base: &CurrencyTable) -> Result<CurrencyTable, FxError> {
        let mut table = base.clone();
        for currency in &self.currencies {
            table.insert(currency.clone())?;
        }
        Ok(table)
    }

    /// Load everything into a fresh store. Plans marked active go through
    /// [`InMemoryStore::activate_plan`], so an invalid active plan fails the
    /// whole load.
    pub fn into_store(self) -> Result<InMemoryStore, ValidationError> {
        let active: Vec<PlanId> = self
            .plans
            .iter()
            .filter(|p| p.is_active())
            .map(|p| p.id().clone())
            .collect();
        let mut store = self.into_draft_store()?;
        for plan_id in &active {
            store.activate_plan(plan_id)?;
        }
        Ok(store)
    }

    /// Run the activation checks on every plan, returning one outcome per
    /// plan in file order.
    pub fn validate_plans(&self) -> Result<Vec<(PlanId, Result<(), ValidationError>)>, ValidationError> {
        let mut store = self.clone().into_draft_store()?;
        Ok(self
            .plans
            .iter()
            .map(|plan| (plan.id().clone(), store.activate_plan(plan.id())))
            .collect())
    }

    fn into_draft_store(self) -> Result<InMemoryStore, ValidationError> {
        let mut store = InMemoryStore::new();
        for property in self.properties {
            store.add_property(property);
        }
        for contact in self.contacts {
            store.add_contact(contact);
        }
        for category in self.categories {
            store.add_category(category);
        }
        for stakeholder in self.stakeholders {
            store.add_stakeholder(stakeholder)?;
        }
        for transaction in self.transactions {
            store.add_transaction(transaction)?;
        }
        for plan in self.plans {
            store.add_plan(plan)?;
        }
        Ok(store)
    }
}
