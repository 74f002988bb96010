//! Fixed-point money.
//!
//! Amounts are integers in the smallest currency unit (e.g. cents). All
//! arithmetic is checked; entry-level totals are folded in `i128` so a batch
//! of line amounts can never overflow silently. Floats never appear in any
//! monetary computation.

use serde::{Deserialize, Serialize};

/// A monetary amount in minor units (e.g. cents).
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    pub const fn from_minor(minor: i64) -> Self {
        Self(minor)
    }

    pub const fn minor(self) -> i64 {
        self.0
    }

    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    pub fn checked_add(self, other: Money) -> Option<Money> {
        self.0.checked_add(other.0).map(Money)
    }

    /// Multiply a unit amount by a quantity (e.g. unit cost × |delta|).
    pub fn checked_mul(self, quantity: i64) -> Option<Money> {
        self.0.checked_mul(quantity).map(Money)
    }

    /// Widen to `i128` for overflow-free batch totals.
    pub const fn as_i128(self) -> i128 {
        self.0 as i128
    }
}

impl core::fmt::Display for Money {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        // Minor-unit rendering; currency formatting is a presentation concern.
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn multiplication_is_checked() {
        assert_eq!(Money::from_minor(200).checked_mul(3), Some(Money::from_minor(600)));
        assert_eq!(Money::from_minor(i64::MAX).checked_mul(2), None);
    }

    proptest! {
        /// i128 widening never loses a representable i64 amount.
        #[test]
        fn widening_preserves_value(minor in any::<i64>()) {
            prop_assert_eq!(Money::from_minor(minor).as_i128(), minor as i128);
        }
    }
}
