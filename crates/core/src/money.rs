//! Monetary amounts in the smallest currency unit.

use serde::{Deserialize, Serialize};

/// An amount in the smallest currency unit (e.g. kuruş/cents).
///
/// Arithmetic saturates rather than wrapping; order totals are sums of
/// catalog prices and stay far below `u64::MAX` in practice.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(u64);

impl Money {
    pub const ZERO: Money = Money(0);

    pub fn from_cents(cents: u64) -> Self {
        Self(cents)
    }

    pub fn cents(&self) -> u64 {
        self.0
    }

    pub fn add(self, other: Money) -> Money {
        Money(self.0.saturating_add(other.0))
    }

    pub fn times(self, quantity: u32) -> Money {
        Money(self.0.saturating_mul(u64::from(quantity)))
    }

    /// Render as a decimal unit string, e.g. `1250` → `"12.50"`.
    ///
    /// Payment gateways expect unit prices in this shape.
    pub fn to_unit_string(&self) -> String {
        format!("{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

impl From<u64> for Money {
    fn from(cents: u64) -> Self {
        Self(cents)
    }
}

impl core::fmt::Display for Money {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.to_unit_string())
    }
}

impl core::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, Money::add)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_as_decimal_units() {
        assert_eq!(Money::from_cents(1250).to_unit_string(), "12.50");
        assert_eq!(Money::from_cents(5).to_unit_string(), "0.05");
        assert_eq!(Money::from_cents(100_000).to_unit_string(), "1000.00");
    }

    #[test]
    fn multiplies_by_quantity() {
        assert_eq!(Money::from_cents(199).times(3), Money::from_cents(597));
    }

    #[test]
    fn sums_line_amounts() {
        let total: Money = [100u64, 250, 5].into_iter().map(Money::from_cents).sum();
        assert_eq!(total, Money::from_cents(355));
    }
}
