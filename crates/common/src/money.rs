//! Integer-cent money amounts.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An amount of money in the smallest currency unit (cents).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cents(pub i64);

impl Cents {
    /// Zero.
    pub const ZERO: Self = Self(0);

    /// Raw cent value.
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }

    /// Multiply a unit price by a quantity, `None` on overflow.
    #[must_use]
    pub fn times(self, quantity: i64) -> Option<Self> {
        self.0.checked_mul(quantity).map(Self)
    }

    /// Tax on this amount at `bps` basis points, rounded half up.
    /// `None` on overflow.
    #[must_use]
    pub fn tax_at(self, bps: i64) -> Option<Self> {
        self.0
            .checked_mul(bps)
            .and_then(|v| v.checked_add(5_000))
            .map(|v| Self(v / 10_000))
    }

    /// Add two amounts, `None` on overflow.
    #[must_use]
    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    /// Decimal string with two fractional digits, as payment gateways expect.
    #[must_use]
    pub fn to_decimal_string(self) -> String {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        format!("{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

impl fmt::Display for Cents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_decimal_string())
    }
}
