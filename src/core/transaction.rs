use crate::core::currency::CurrencyCode;
use crate::core::ids::{CategoryId, ComponentId, ContactId, PropertyId, TeamId, TransactionId};
use crate::core::money::Money;
use crate::error::ValidationError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Direction of a transaction. Amounts are stored as magnitudes; the type
/// carries the sign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Income,
    Expense,
}

impl TransactionType {
    /// Income stays positive, expense turns negative.
    pub fn signed(self, amount: Money) -> Money {
        match self {
            Self::Income => amount,
            Self::Expense => -amount,
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Income => write!(f, "income"),
            Self::Expense => write!(f, "expense"),
        }
    }
}

/// A category transactions and components can be filed under.
///
/// Stock categories ship with the system (`custom = false`, no team); custom
/// categories belong to the team that defined them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionCategory {
    pub id: CategoryId,
    pub name: String,
    pub custom: bool,
    #[serde(default)]
    pub team_id: Option<TeamId>,
}

impl TransactionCategory {
    pub fn stock(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: CategoryId::new(id),
            name: name.into(),
            custom: false,
            team_id: None,
        }
    }

    pub fn custom(id: impl Into<String>, name: impl Into<String>, team_id: TeamId) -> Self {
        Self {
            id: CategoryId::new(id),
            name: name.into(),
            custom: true,
            team_id: Some(team_id),
        }
    }

    /// The system categories every team can use.
    pub fn stock_categories() -> Vec<TransactionCategory> {
        vec![
            Self::stock("rent", "Rent"),
            Self::stock("cleaning", "Cleaning"),
            Self::stock("platform-fee", "Platform Fee"),
            Self::stock("tax", "Tax"),
            Self::stock("maintenance", "Maintenance"),
        ]
    }
}

/// An amount as entered plus its conversion into the final currency.
///
/// Invariant: `final_amount == round_half_up(original_amount * exchange_rate)`.
/// The rate is fixed at creation time so historical amounts never move.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConvertedAmount {
    original_amount: Money,
    original_currency: CurrencyCode,
    final_amount: Money,
    final_currency: CurrencyCode,
    exchange_rate: Decimal,
}

impl ConvertedAmount {
    /// Derive the final amount from the original and the rate.
    pub fn new(
        original_amount: Money,
        original_currency: CurrencyCode,
        exchange_rate: Decimal,
        final_currency: CurrencyCode,
    ) -> Result<Self, ValidationError> {
        if original_amount.is_negative() {
            return Err(ValidationError::NegativeAmount(original_amount));
        }
        if exchange_rate <= Decimal::ZERO {
            return Err(ValidationError::InvalidExchangeRate(exchange_rate));
        }
        let final_amount = original_amount
            .to_decimal()
            .checked_mul(exchange_rate)
            .and_then(Money::round_half_up)
            .ok_or(ValidationError::AmountOverflow(exchange_rate))?;
        Ok(Self {
            original_amount,
            original_currency,
            final_amount,
            final_currency,
            exchange_rate,
        })
    }

    /// No conversion: rate 1, final equals original.
    pub fn unconverted(amount: Money, currency: CurrencyCode) -> Result<Self, ValidationError> {
        Self::new(amount, currency.clone(), Decimal::ONE, currency)
    }

    /// Rebuild from stored columns, checking the rounding invariant.
    ///
    /// A missing final currency means the original currency; a missing final
    /// amount is derived.
    pub fn from_stored(
        original_amount: Money,
        original_currency: CurrencyCode,
        final_amount: Option<Money>,
        final_currency: Option<CurrencyCode>,
        exchange_rate: Decimal,
    ) -> Result<Self, ValidationError> {
        let final_currency = final_currency.unwrap_or_else(|| original_currency.clone());
        let converted = Self::new(original_amount, original_currency, exchange_rate, final_currency)?;
        match final_amount {
            Some(stored) if stored != converted.final_amount => {
                Err(ValidationError::FinalAmountMismatch {
                    stored,
                    expected: converted.final_amount,
                })
            }
            _ => Ok(converted),
        }
    }

    pub fn original_amount(&self) -> Money {
        self.original_amount
    }

    pub fn original_currency(&self) -> &CurrencyCode {
        &self.original_currency
    }

    pub fn final_amount(&self) -> Money {
        self.final_amount
    }

    pub fn final_currency(&self) -> &CurrencyCode {
        &self.final_currency
    }

    pub fn exchange_rate(&self) -> Decimal {
        self.exchange_rate
    }
}

fn unit_rate() -> Decimal {
    Decimal::ONE
}

/// A sub-line of a transaction with an optional category override.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ComponentRecord", into = "ComponentRecord")]
pub struct TransactionComponent {
    id: ComponentId,
    category_id: Option<CategoryId>,
    amount: ConvertedAmount,
}

impl TransactionComponent {
    pub fn new(id: ComponentId, amount: ConvertedAmount) -> Self {
        Self {
            id,
            category_id: None,
            amount,
        }
    }

    /// Component in a single currency with no conversion.
    pub fn unconverted(
        id: ComponentId,
        amount: Money,
        currency: CurrencyCode,
    ) -> Result<Self, ValidationError> {
        Ok(Self::new(id, ConvertedAmount::unconverted(amount, currency)?))
    }

    pub fn with_category(mut self, category_id: CategoryId) -> Self {
        self.category_id = Some(category_id);
        self
    }

    pub fn id(&self) -> &ComponentId {
        &self.id
    }

    pub fn category_id(&self) -> Option<&CategoryId> {
        self.category_id.as_ref()
    }

    pub fn amount(&self) -> &ConvertedAmount {
        &self.amount
    }
}

#[derive(Serialize, Deserialize)]
struct ComponentRecord {
    id: ComponentId,
    #[serde(default)]
    category_id: Option<CategoryId>,
    original_amount: Money,
    original_currency: CurrencyCode,
    #[serde(default)]
    final_amount: Option<Money>,
    #[serde(default)]
    final_currency: Option<CurrencyCode>,
    #[serde(default = "unit_rate")]
    exchange_rate: Decimal,
}

impl TryFrom<ComponentRecord> for TransactionComponent {
    type Error = ValidationError;

    fn try_from(record: ComponentRecord) -> Result<Self, Self::Error> {
        let amount = ConvertedAmount::from_stored(
            record.original_amount,
            record.original_currency,
            record.final_amount,
            record.final_currency,
            record.exchange_rate,
        )?;
        Ok(Self {
            id: record.id,
            category_id: record.category_id,
            amount,
        })
    }
}

impl From<TransactionComponent> for ComponentRecord {
    fn from(component: TransactionComponent) -> Self {
        let amount = component.amount;
        Self {
            id: component.id,
            category_id: component.category_id,
            original_amount: amount.original_amount,
            original_currency: amount.original_currency,
            final_amount: Some(amount.final_amount),
            final_currency: Some(amount.final_currency),
            exchange_rate: amount.exchange_rate,
        }
    }
}

/// A money movement on a property.
///
/// # Examples
///
/// ```
/// use split_engine::core::currency::CurrencyCode;
/// use split_engine::core::ids::{PropertyId, TransactionId};
/// use split_engine::core::money::Money;
/// use split_engine::core::transaction::{Transaction, TransactionType};
/// use chrono::Utc;
/// use rust_decimal_macros::dec;
///
/// let booking = Transaction::new(
///     TransactionId::new("booking-1"),
///     PropertyId::new("beach-house"),
///     TransactionType::Income,
///     Money::new(10_000),
///     CurrencyCode::new("EUR"),
///     dec!(1.08),
///     CurrencyCode::new("USD"),
///     Utc::now(),
/// )
/// .unwrap();
///
/// assert_eq!(booking.final_amount(), Money::new(10_800));
/// assert_eq!(booking.resolve_components().len(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "TransactionRecord", into = "TransactionRecord")]
pub struct Transaction {
    id: TransactionId,
    property_id: PropertyId,
    kind: TransactionType,
    category_id: Option<CategoryId>,
    contact_id: Option<ContactId>,
    amount: ConvertedAmount,
    occurred_at: DateTime<Utc>,
    components: Vec<TransactionComponent>,
}

impl Transaction {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: TransactionId,
        property_id: PropertyId,
        kind: TransactionType,
        original_amount: Money,
        original_currency: CurrencyCode,
        exchange_rate: Decimal,
        final_currency: CurrencyCode,
        occurred_at: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        let amount =
            ConvertedAmount::new(original_amount, original_currency, exchange_rate, final_currency)?;
        Ok(Self::from_amount(id, property_id, kind, amount, occurred_at))
    }

    /// Transaction recorded directly in its final currency.
    pub fn unconverted(
        id: TransactionId,
        property_id: PropertyId,
        kind: TransactionType,
        amount: Money,
        currency: CurrencyCode,
        occurred_at: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        let amount = ConvertedAmount::unconverted(amount, currency)?;
        Ok(Self::from_amount(id, property_id, kind, amount, occurred_at))
    }

    pub fn from_amount(
        id: TransactionId,
        property_id: PropertyId,
        kind: TransactionType,
        amount: ConvertedAmount,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            property_id,
            kind,
            category_id: None,
            contact_id: None,
            amount,
            occurred_at,
            components: Vec::new(),
        }
    }

    pub fn with_category(mut self, category_id: CategoryId) -> Self {
        self.category_id = Some(category_id);
        self
    }

    pub fn with_contact(mut self, contact_id: ContactId) -> Self {
        self.contact_id = Some(contact_id);
        self
    }

    pub fn with_component(mut self, component: TransactionComponent) -> Self {
        self.components.push(component);
        self
    }

    // --- Accessors ---

    pub fn id(&self) -> &TransactionId {
        &self.id
    }

    pub fn property_id(&self) -> &PropertyId {
        &self.property_id
    }

    pub fn kind(&self) -> TransactionType {
        self.kind
    }

    pub fn category_id(&self) -> Option<&CategoryId> {
        self.category_id.as_ref()
    }

    pub fn contact_id(&self) -> Option<&ContactId> {
        self.contact_id.as_ref()
    }

    pub fn amount(&self) -> &ConvertedAmount {
        &self.amount
    }

    pub fn final_amount(&self) -> Money {
        self.amount.final_amount
    }

    pub fn final_currency(&self) -> &CurrencyCode {
        &self.amount.final_currency
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }

    pub fn components(&self) -> &[TransactionComponent] {
        &self.components
    }

    /// Flatten into the lines the split engine works on.
    ///
    /// A transaction without components counts as one implicit component
    /// equal to the transaction itself. A component without its own category
    /// falls back to the transaction's.
    pub fn resolve_components(&self) -> Vec<ResolvedComponent> {
        if self.components.is_empty() {
            return vec![ResolvedComponent {
                component_id: ComponentId::new(self.id.as_str()),
                transaction_id: self.id.clone(),
                kind: self.kind,
                category_id: self.category_id.clone(),
                amount: self.amount.final_amount,
                currency: self.amount.final_currency.clone(),
            }];
        }

        self.components
            .iter()
            .map(|c| ResolvedComponent {
                component_id: c.id.clone(),
                transaction_id: self.id.clone(),
                kind: self.kind,
                category_id: c.category_id.clone().or_else(|| self.category_id.clone()),
                amount: c.amount.final_amount,
                currency: c.amount.final_currency.clone(),
            })
            .collect()
    }
}

#[derive(Serialize, Deserialize)]
struct TransactionRecord {
    id: TransactionId,
    property_id: PropertyId,
    #[serde(rename = "type")]
    kind: TransactionType,
    #[serde(default)]
    category_id: Option<CategoryId>,
    #[serde(default)]
    contact_id: Option<ContactId>,
    original_amount: Money,
    original_currency: CurrencyCode,
    #[serde(default)]
    final_amount: Option<Money>,
    #[serde(default)]
    final_currency: Option<CurrencyCode>,
    #[serde(default = "unit_rate")]
    exchange_rate: Decimal,
    occurred_at: DateTime<Utc>,
    #[serde(default)]
    components: Vec<TransactionComponent>,
}

impl TryFrom<TransactionRecord> for Transaction {
    type Error = ValidationError;

    fn try_from(record: TransactionRecord) -> Result<Self, Self::Error> {
        let amount = ConvertedAmount::from_stored(
            record.original_amount,
            record.original_currency,
            record.final_amount,
            record.final_currency,
            record.exchange_rate,
        )?;
        Ok(Self {
            id: record.id,
            property_id: record.property_id,
            kind: record.kind,
            category_id: record.category_id,
            contact_id: record.contact_id,
            amount,
            occurred_at: record.occurred_at,
            components: record.components,
        })
    }
}

impl From<Transaction> for TransactionRecord {
    fn from(tx: Transaction) -> Self {
        let amount = tx.amount;
        Self {
            id: tx.id,
            property_id: tx.property_id,
            kind: tx.kind,
            category_id: tx.category_id,
            contact_id: tx.contact_id,
            original_amount: amount.original_amount,
            original_currency: amount.original_currency,
            final_amount: Some(amount.final_amount),
            final_currency: Some(amount.final_currency),
            exchange_rate: amount.exchange_rate,
            occurred_at: tx.occurred_at,
            components: tx.components,
        }
    }
}

/// One component flattened together with what it inherits from its
/// transaction: type, effective category, final amount and currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedComponent {
    pub component_id: ComponentId,
    pub transaction_id: TransactionId,
    pub kind: TransactionType,
    pub category_id: Option<CategoryId>,
    /// Magnitude in `currency` minor units.
    pub amount: Money,
    pub currency: CurrencyCode,
}

impl ResolvedComponent {
    /// Amount with income positive and expense negative.
    pub fn signed_amount(&self) -> Money {
        self.kind.signed(self.amount)
    }

    pub fn is_income(&self) -> bool {
        self.kind == TransactionType::Income
    }
}
