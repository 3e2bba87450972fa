use crate::core::money::Money;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// ISO 4217 currency code.
///
/// # Examples
///
/// ```
/// use split_engine::core::currency::CurrencyCode;
///
/// let eur = CurrencyCode::new("EUR");
/// let usd = CurrencyCode::new("USD");
/// assert_ne!(eur, usd);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CurrencyCode(String);

impl CurrencyCode {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for CurrencyCode {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Errors arising from currency reference data and conversions.
#[derive(Debug, Error)]
pub enum FxError {
    #[error("unknown currency {0}")]
    UnknownCurrency(CurrencyCode),
    #[error("rate from base must be positive, got {rate} for {code}")]
    InvalidRate { code: CurrencyCode, rate: Decimal },
    #[error("base currency {code} must have a rate of 1, got {rate}")]
    InvalidBaseRate { code: CurrencyCode, rate: Decimal },
    #[error("converting {amount} {from} to {to} overflows")]
    Overflow {
        amount: Money,
        from: CurrencyCode,
        to: CurrencyCode,
    },
}

fn default_minor_units() -> u32 {
    2
}

/// Reference data for one currency.
///
/// `rate_from_base` is the number of units of this currency worth one unit of
/// the table's base currency. Rows are created once and only read afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Currency {
    pub code: CurrencyCode,
    pub name: String,
    pub symbol: String,
    pub rate_from_base: Decimal,
    /// Digits after the decimal point of one minor unit (2 for cents).
    #[serde(default = "default_minor_units")]
    pub minor_units: u32,
}

impl Currency {
    pub fn new(
        code: impl Into<String>,
        name: impl Into<String>,
        symbol: impl Into<String>,
        rate_from_base: Decimal,
    ) -> Self {
        Self {
            code: CurrencyCode::new(code),
            name: name.into(),
            symbol: symbol.into(),
            rate_from_base,
            minor_units: default_minor_units(),
        }
    }

    pub fn with_minor_units(mut self, minor_units: u32) -> Self {
        self.minor_units = minor_units;
        self
    }

    /// Renders a minor-unit amount in major units, e.g. `€12.34`.
    pub fn format(&self, amount: Money) -> String {
        format!(
            "{}{}",
            self.symbol,
            Decimal::new(amount.minor_units(), self.minor_units)
        )
    }

    /// The stock reference data: EUR as base, USD at 1.08.
    pub fn seed() -> Vec<Currency> {
        vec![
            Currency::new("EUR", "Euro", "€", Decimal::ONE),
            Currency::new("USD", "US Dollar", "$", dec!(1.08)),
        ]
    }
}

/// Currency reference table used to bring amounts into a settlement currency.
///
/// # Examples
///
/// ```
/// use split_engine::core::currency::{CurrencyCode, CurrencyTable};
/// use split_engine::core::money::Money;
///
/// let table = CurrencyTable::seeded();
/// let converted = table
///     .convert(Money::new(10_800), &CurrencyCode::new("USD"), &CurrencyCode::new("EUR"))
///     .unwrap();
/// assert_eq!(converted, Money::new(10_000));
/// ```
#[derive(Debug, Clone)]
pub struct CurrencyTable {
    base_currency: CurrencyCode,
    currencies: HashMap<CurrencyCode, Currency>,
}

impl CurrencyTable {
    /// An empty table; the base currency must be inserted with a rate of 1.
    pub fn new(base_currency: CurrencyCode) -> Self {
        Self {
            base_currency,
            currencies: HashMap::new(),
        }
    }

    /// Table pre-filled with [`Currency::seed`].
    pub fn seeded() -> Self {
        let currencies = Currency::seed()
            .into_iter()
            .map(|c| (c.code.clone(), c))
            .collect();
        Self {
            base_currency: CurrencyCode::new("EUR"),
            currencies,
        }
    }

    pub fn from_currencies(
        base_currency: CurrencyCode,
        currencies: impl IntoIterator<Item = Currency>,
    ) -> Result<Self, FxError> {
        let mut table = Self::new(base_currency);
        for currency in currencies {
            table.insert(currency)?;
        }
        Ok(table)
    }

    /// Add or replace a currency row.
    pub fn insert(&mut self, currency: Currency) -> Result<(), FxError> {
        if currency.rate_from_base <= Decimal::ZERO {
            return Err(FxError::InvalidRate {
                code: currency.code,
                rate: currency.rate_from_base,
            });
        }
        if currency.code == self.base_currency && currency.rate_from_base != Decimal::ONE {
            return Err(FxError::InvalidBaseRate {
                code: currency.code,
                rate: currency.rate_from_base,
            });
        }
        self.currencies.insert(currency.code.clone(), currency);
        Ok(())
    }

    pub fn base_currency(&self) -> &CurrencyCode {
        &self.base_currency
    }

    pub fn get(&self, code: &CurrencyCode) -> Result<&Currency, FxError> {
        self.currencies
            .get(code)
            .ok_or_else(|| FxError::UnknownCurrency(code.clone()))
    }

    pub fn contains(&self, code: &CurrencyCode) -> bool {
        self.currencies.contains_key(code)
    }

    pub fn len(&self) -> usize {
        self.currencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.currencies.is_empty()
    }

    /// Units of `to` worth one unit of `from`.
    pub fn rate(&self, from: &CurrencyCode, to: &CurrencyCode) -> Result<Decimal, FxError> {
        if from == to {
            return Ok(Decimal::ONE);
        }
        let from = self.get(from)?;
        let to = self.get(to)?;
        Ok(to.rate_from_base / from.rate_from_base)
    }

    /// Convert a minor-unit amount, rounding half-up once at the end.
    ///
    /// Same-currency conversion returns the amount untouched.
    pub fn convert(
        &self,
        amount: Money,
        from: &CurrencyCode,
        to: &CurrencyCode,
    ) -> Result<Money, FxError> {
        if from == to {
            return Ok(amount);
        }
        let source = self.get(from)?;
        let target = self.get(to)?;

        let overflow = || FxError::Overflow {
            amount,
            from: from.clone(),
            to: to.clone(),
        };

        let major = amount
            .to_decimal()
            .checked_mul(target.rate_from_base)
            .and_then(|v| v.checked_div(source.rate_from_base))
            .ok_or_else(overflow)?;
        let rescaled = rescale(major, source.minor_units, target.minor_units).ok_or_else(overflow)?;
        Money::round_half_up(rescaled).ok_or_else(overflow)
    }
}

/// Move a minor-unit value between currencies with different minor digits.
fn rescale(value: Decimal, from_digits: u32, to_digits: u32) -> Option<Decimal> {
    if to_digits >= from_digits {
        let factor = Decimal::from(10i64.checked_pow(to_digits - from_digits)?);
        value.checked_mul(factor)
    } else {
        let factor = Decimal::from(10i64.checked_pow(from_digits - to_digits)?);
        value.checked_div(factor)
    }
}

impl Default for CurrencyTable {
    fn default() -> Self {
        Self::seeded()
    }
}
