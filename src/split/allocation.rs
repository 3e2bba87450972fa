use crate::core::currency::CurrencyCode;
use crate::core::ids::{AllocationId, StakeholderId};
use crate::core::money::Money;
use crate::error::ValidationError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AllocationType {
    Percent,
    Fixed,
    Method,
}

impl fmt::Display for AllocationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Percent => write!(f, "percent"),
            Self::Fixed => write!(f, "fixed"),
            Self::Method => write!(f, "method"),
        }
    }
}

/// Opaque name of an externally resolved allocation strategy.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MethodDescriptor(String);

impl MethodDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How a stakeholder's part of a layer is computed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Share {
    /// Percentage of whatever the fixed allocations leave of the base.
    Percent(Decimal),
    /// A literal amount, denominated in `currency` minor units.
    Fixed { amount: Money, currency: CurrencyCode },
    /// Delegated to a [`MethodResolver`](crate::split::method::MethodResolver).
    Method(MethodDescriptor),
}

impl Share {
    pub fn allocation_type(&self) -> AllocationType {
        match self {
            Self::Percent(_) => AllocationType::Percent,
            Self::Fixed { .. } => AllocationType::Fixed,
            Self::Method(_) => AllocationType::Method,
        }
    }
}

/// One stakeholder's claim inside a split rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "AllocationRecord", into = "AllocationRecord")]
pub struct Allocation {
    id: AllocationId,
    stakeholder_id: StakeholderId,
    share: Share,
}

impl Allocation {
    pub fn new(id: AllocationId, stakeholder_id: StakeholderId, share: Share) -> Self {
        Self {
            id,
            stakeholder_id,
            share,
        }
    }

    pub fn percent(id: AllocationId, stakeholder_id: StakeholderId, value: Decimal) -> Self {
        Self::new(id, stakeholder_id, Share::Percent(value))
    }

    pub fn fixed(
        id: AllocationId,
        stakeholder_id: StakeholderId,
        amount: Money,
        currency: CurrencyCode,
    ) -> Self {
        Self::new(id, stakeholder_id, Share::Fixed { amount, currency })
    }

    pub fn method(id: AllocationId, stakeholder_id: StakeholderId, descriptor: MethodDescriptor) -> Self {
        Self::new(id, stakeholder_id, Share::Method(descriptor))
    }

    pub fn id(&self) -> &AllocationId {
        &self.id
    }

    pub fn stakeholder_id(&self) -> &StakeholderId {
        &self.stakeholder_id
    }

    pub fn share(&self) -> &Share {
        &self.share
    }

    pub fn allocation_type(&self) -> AllocationType {
        self.share.allocation_type()
    }

    /// Range checks on the value itself; rule-level checks live on the rule.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let invalid = |reason: &str| ValidationError::InvalidAllocationValue {
            allocation_id: self.id.clone(),
            reason: reason.to_string(),
        };
        match &self.share {
            Share::Percent(value) if *value < Decimal::ZERO || *value > HUNDRED => {
                Err(invalid("percent must be between 0 and 100"))
            }
            Share::Fixed { amount, .. } if amount.is_negative() => {
                Err(invalid("fixed amount must not be negative"))
            }
            Share::Method(descriptor) if descriptor.as_str().trim().is_empty() => {
                Err(invalid("method descriptor is empty"))
            }
            _ => Ok(()),
        }
    }
}

/// Stored shape: `value` is a number for percent/fixed and a string for
/// method; `currency_id` is only meaningful for fixed.
#[derive(Serialize, Deserialize)]
struct AllocationRecord {
    id: AllocationId,
    stakeholder_id: StakeholderId,
    #[serde(rename = "type", default = "default_type")]
    kind: AllocationType,
    value: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    currency_id: Option<CurrencyCode>,
}

fn default_type() -> AllocationType {
    AllocationType::Percent
}

fn decimal_from_value(value: &Value) -> Option<Decimal> {
    let text = match value {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.trim().to_string(),
        _ => return None,
    };
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .ok()
}

impl TryFrom<AllocationRecord> for Allocation {
    type Error = ValidationError;

    fn try_from(record: AllocationRecord) -> Result<Self, Self::Error> {
        let invalid = |reason: &str| ValidationError::InvalidAllocationValue {
            allocation_id: record.id.clone(),
            reason: reason.to_string(),
        };

        let share = match record.kind {
            AllocationType::Percent => {
                let value = decimal_from_value(&record.value)
                    .ok_or_else(|| invalid("percent value must be a number"))?;
                Share::Percent(value)
            }
            AllocationType::Fixed => {
                let value = decimal_from_value(&record.value)
                    .filter(|d| d.fract().is_zero())
                    .and_then(Money::floor)
                    .ok_or_else(|| invalid("fixed value must be a whole number of minor units"))?;
                let currency = record.currency_id.clone().ok_or_else(|| {
                    ValidationError::FixedWithoutCurrency {
                        allocation_id: record.id.clone(),
                    }
                })?;
                Share::Fixed {
                    amount: value,
                    currency,
                }
            }
            AllocationType::Method => match &record.value {
                Value::String(name) => Share::Method(MethodDescriptor::new(name.clone())),
                _ => return Err(invalid("method value must be a descriptor string")),
            },
        };

        let allocation = Allocation::new(record.id, record.stakeholder_id, share);
        allocation.validate()?;
        Ok(allocation)
    }
}

impl From<Allocation> for AllocationRecord {
    fn from(allocation: Allocation) -> Self {
        let kind = allocation.allocation_type();
        let (value, currency_id) = match allocation.share {
            Share::Percent(value) => (Value::String(value.to_string()), None),
            Share::Fixed { amount, currency } => (Value::from(amount.minor_units()), Some(currency)),
            Share::Method(descriptor) => (Value::String(descriptor.0), None),
        };
        Self {
            id: allocation.id,
            stakeholder_id: allocation.stakeholder_id,
            kind,
            value,
            currency_id,
        }
    }
}
