use crate::core::currency::CurrencyCode;
use crate::core::ids::{ContactId, PropertyId, StakeholderId, TeamId, UserId};
use serde::{Deserialize, Serialize};

/// A property owned by a team. Its settlement currency is what split plans
/// default to when they do not name one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Property {
    pub id: PropertyId,
    pub team_id: TeamId,
    pub name: String,
    pub settlement_currency: CurrencyCode,
}

impl Property {
    pub fn new(
        id: PropertyId,
        team_id: TeamId,
        name: impl Into<String>,
        settlement_currency: CurrencyCode,
    ) -> Self {
        Self {
            id,
            team_id,
            name: name.into(),
            settlement_currency,
        }
    }
}

/// A person or company inside a team, optionally linked to a registered user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub id: ContactId,
    pub team_id: TeamId,
    pub name: String,
    #[serde(default)]
    pub user_id: Option<UserId>,
}

impl Contact {
    pub fn new(id: ContactId, team_id: TeamId, name: impl Into<String>) -> Self {
        Self {
            id,
            team_id,
            name: name.into(),
            user_id: None,
        }
    }

    pub fn linked_to(mut self, user_id: UserId) -> Self {
        self.user_id = Some(user_id);
        self
    }
}

/// Binds one contact to one property. This is what allocations pay out to.
///
/// At most one stakeholder exists per (property, contact); the store
/// enforces it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Stakeholder {
    pub id: StakeholderId,
    pub property_id: PropertyId,
    pub contact_id: ContactId,
}

impl Stakeholder {
    pub fn new(id: StakeholderId, property_id: PropertyId, contact_id: ContactId) -> Self {
        Self {
            id,
            property_id,
            contact_id,
        }
    }
}
