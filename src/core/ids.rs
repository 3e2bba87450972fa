use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Declares an opaque string identifier.
///
/// Identifiers order lexicographically, which is what the distributor uses
/// to break ties deterministically.
macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// A fresh random (UUID v4) identifier.
            pub fn random() -> Self {
                Self(Uuid::new_v4().to_string())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self::new(s)
            }
        }
    };
}

string_id!(
    /// A team owning properties, contacts and custom categories.
    TeamId
);
string_id!(
    /// A rental property (or any shared asset) whose money gets split.
    PropertyId
);
string_id!(
    /// A person or entity inside a team.
    ContactId
);
string_id!(
    /// A registered user a contact may be linked to.
    UserId
);
string_id!(
    /// A contact's participation in one property.
    ///
    /// # Examples
    ///
    /// ```
    /// use split_engine::core::ids::StakeholderId;
    ///
    /// let owner = StakeholderId::new("owner");
    /// let manager = StakeholderId::new("manager");
    /// assert!(manager < owner);
    /// ```
    StakeholderId
);
string_id!(
    /// A transaction category, stock or team-defined.
    CategoryId
);
string_id!(TransactionId);
string_id!(ComponentId);
string_id!(PlanId);
string_id!(
    /// A split rule, also called a layer.
    RuleId
);
string_id!(AllocationId);
