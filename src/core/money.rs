use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

/// Signed monetary amount in integer minor units (cents for EUR/USD).
///
/// All base and allocation math in the engine runs on this type so that
/// rounding only ever happens at explicit, named steps.
///
/// # Examples
///
/// ```
/// use split_engine::core::money::Money;
/// use rust_decimal_macros::dec;
///
/// let rent = Money::new(5_000);
/// let cleaning = Money::new(1_000);
/// assert_eq!(rent - cleaning, Money::new(4_000));
///
/// // 10.5 minor units round half-up to 11
/// assert_eq!(Money::round_half_up(dec!(10.5)), Some(Money::new(11)));
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    pub const fn new(minor_units: i64) -> Self {
        Self(minor_units)
    }

    /// Raw value in minor units.
    pub const fn minor_units(self) -> i64 {
        self.0
    }

    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    pub const fn abs(self) -> Self {
        Self(self.0.abs())
    }

    pub fn checked_add(self, rhs: Money) -> Option<Money> {
        self.0.checked_add(rhs.0).map(Money)
    }

    pub fn checked_sub(self, rhs: Money) -> Option<Money> {
        self.0.checked_sub(rhs.0).map(Money)
    }

    /// Exact decimal view of the minor-unit value.
    pub fn to_decimal(self) -> Decimal {
        Decimal::from(self.0)
    }

    /// Rounds a minor-unit decimal to the nearest unit, halves away from zero.
    ///
    /// Returns `None` if the result does not fit in `i64`.
    pub fn round_half_up(value: Decimal) -> Option<Money> {
        value
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            .to_i64()
            .map(Money)
    }

    /// Largest whole minor-unit amount not greater than `value`.
    pub fn floor(value: Decimal) -> Option<Money> {
        value.floor().to_i64().map(Money)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for Money {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money(self.0 + rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        self.0 += rhs.0;
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Money) -> Money {
        Money(self.0 - rhs.0)
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, rhs: Money) {
        self.0 -= rhs.0;
    }
}

impl Neg for Money {
    type Output = Money;

    fn neg(self) -> Money {
        Money(-self.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_arithmetic() {
        let mut m = Money::new(100);
        m += Money::new(50);
        m -= Money::new(30);
        assert_eq!(m, Money::new(120));
        assert_eq!(-m, Money::new(-120));
    }

    #[test]
    fn test_sum() {
        let amounts = vec![Money::new(1), Money::new(2), Money::new(-5)];
        assert_eq!(amounts.iter().sum::<Money>(), Money::new(-2));
        assert_eq!(amounts.into_iter().sum::<Money>(), Money::new(-2));
    }

    #[test]
    fn test_round_half_up() {
        assert_eq!(Money::round_half_up(dec!(10.5)), Some(Money::new(11)));
        assert_eq!(Money::round_half_up(dec!(10.49)), Some(Money::new(10)));
        assert_eq!(Money::round_half_up(dec!(-10.5)), Some(Money::new(-11)));
    }

    #[test]
    fn test_floor_negative() {
        assert_eq!(Money::floor(dec!(-33.33)), Some(Money::new(-34)));
        assert_eq!(Money::floor(dec!(33.99)), Some(Money::new(33)));
    }

    #[test]
    fn test_checked_overflow() {
        assert_eq!(Money::new(i64::MAX).checked_add(Money::new(1)), None);
        assert_eq!(Money::new(5).checked_sub(Money::new(7)), Some(Money::new(-2)));
    }
}
