//! Monetary amounts.

use serde::{Deserialize, Serialize};

/// Money amount held in cents so totals never drift through floating point.
///
/// Serializes as the bare integer number of cents.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    /// Creates an amount from cents (e.g. `1000` is 10.00).
    pub fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    pub fn zero() -> Self {
        Self(0)
    }

    pub fn cents(&self) -> i64 {
        self.0
    }

    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Line amount for `quantity` units at this unit price.
    ///
    /// Returns `None` on overflow.
    pub fn checked_times(&self, quantity: u32) -> Option<Money> {
        self.0.checked_mul(i64::from(quantity)).map(Money)
    }

    pub fn checked_add(&self, other: Money) -> Option<Money> {
        self.0.checked_add(other.0).map(Money)
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}
