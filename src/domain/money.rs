//! Monetary types: settlement amounts in smallest units and basis-point rates.
//!
//! All settlement math is integer math. `Amount` is a count of the settlement
//! currency's smallest unit; `Bps` is a rate out of 10,000. Keeping both as
//! integers is what makes the JIT contribution split reconcile exactly:
//! `buyer + seller == fill` holds with no rounding residual because the seller
//! side is computed by subtraction, never by a second division.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One whole unit expressed in basis points.
pub const BPS_SCALE: u16 = 10_000;

/// An amount of settlement currency in its smallest unit.
///
/// The inner u64 is private; arithmetic goes through checked methods so an
/// overflowing ledger mutation surfaces as an error instead of wrapping.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Amount(u64);

impl Amount {
    /// The zero amount.
    pub const ZERO: Self = Self(0);

    /// Create an amount from a raw smallest-unit count.
    #[must_use]
    pub const fn new(units: u64) -> Self {
        Self(units)
    }

    /// Get the raw smallest-unit count.
    #[must_use]
    pub const fn units(&self) -> u64 {
        self.0
    }

    /// Returns true if the amount is zero.
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checked addition; `None` on overflow.
    #[must_use]
    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    /// Checked subtraction; `None` on underflow.
    #[must_use]
    pub fn checked_sub(self, other: Self) -> Option<Self> {
        self.0.checked_sub(other.0).map(Self)
    }

    /// Multiply by a basis-point rate, flooring.
    ///
    /// Widens to u128 internally; since `rate <= 10_000` the result never
    /// exceeds `self`, so the narrowing cast cannot truncate.
    #[must_use]
    pub fn mul_bps(self, rate: Bps) -> Self {
        let scaled = u128::from(self.0) * u128::from(rate.value()) / u128::from(BPS_SCALE);
        Self(scaled as u64)
    }

    /// Render at a given decimal precision for human-facing output.
    #[must_use]
    pub fn to_decimal(self, decimals: u32) -> Decimal {
        Decimal::from_i128_with_scale(i128::from(self.0), decimals)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A rate in basis points (1 bps = 0.01%), at most 10,000.
///
/// Prices and fee rates are both `Bps`; the extra business constraints
/// (prices strictly inside (0, 10000), fees capped at 1,000) are enforced at
/// the order-validation and fee-schedule boundaries respectively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Bps(u16);

// Hand-written so deserialized data cannot smuggle in a rate above 100%
// past the `Bps::new` assertion.
impl<'de> Deserialize<'de> for Bps {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = u16::deserialize(deserializer)?;
        if value > BPS_SCALE {
            return Err(serde::de::Error::custom(format!(
                "basis points value {value} exceeds {BPS_SCALE}"
            )));
        }
        Ok(Self(value))
    }
}

impl Bps {
    /// The full 100% rate.
    pub const MAX: Self = Self(BPS_SCALE);

    /// The zero rate.
    pub const ZERO: Self = Self(0);

    /// Create a basis-point rate.
    ///
    /// # Panics
    ///
    /// Panics if `value` exceeds 10,000; a rate above 100% is a programming
    /// error, not a runtime condition.
    #[must_use]
    pub const fn new(value: u16) -> Self {
        assert!(value <= BPS_SCALE, "basis points cannot exceed 10000");
        Self(value)
    }

    /// Get the raw basis-point value.
    #[must_use]
    pub const fn value(&self) -> u16 {
        self.0
    }

    /// The complementary rate (`10000 - self`).
    #[must_use]
    pub const fn complement(&self) -> Self {
        Self(BPS_SCALE - self.0)
    }

    /// Returns true if the rate is a valid order price: strictly inside
    /// (0, 10000).
    #[must_use]
    pub const fn is_valid_price(&self) -> bool {
        self.0 > 0 && self.0 < BPS_SCALE
    }

    /// Render as a fraction of one (e.g. 6000 -> 0.6000).
    #[must_use]
    pub fn to_decimal(self) -> Decimal {
        Decimal::new(i64::from(self.0), 4)
    }
}

impl fmt::Display for Bps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}bps", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn amount_checked_add_and_sub() {
        let a = Amount::new(100);
        let b = Amount::new(40);

        assert_eq!(a.checked_add(b), Some(Amount::new(140)));
        assert_eq!(a.checked_sub(b), Some(Amount::new(60)));
        assert_eq!(b.checked_sub(a), None);
        assert_eq!(Amount::new(u64::MAX).checked_add(Amount::new(1)), None);
    }

    #[test]
    fn amount_mul_bps_floors() {
        assert_eq!(Amount::new(1000).mul_bps(Bps::new(6000)), Amount::new(600));
        assert_eq!(Amount::new(1).mul_bps(Bps::new(9999)), Amount::ZERO);
        assert_eq!(Amount::new(1000).mul_bps(Bps::MAX), Amount::new(1000));
        assert_eq!(Amount::new(1000).mul_bps(Bps::ZERO), Amount::ZERO);
    }

    #[test]
    fn amount_mul_bps_never_overflows_u64() {
        let max = Amount::new(u64::MAX);
        assert_eq!(max.mul_bps(Bps::MAX), max);
    }

    #[test]
    fn amount_to_decimal_scales() {
        assert_eq!(Amount::new(1_500_000).to_decimal(6), dec!(1.500000));
    }

    #[test]
    fn bps_complement() {
        assert_eq!(Bps::new(6000).complement(), Bps::new(4000));
        assert_eq!(Bps::ZERO.complement(), Bps::MAX);
    }

    #[test]
    fn bps_price_validity() {
        assert!(Bps::new(1).is_valid_price());
        assert!(Bps::new(9999).is_valid_price());
        assert!(!Bps::ZERO.is_valid_price());
        assert!(!Bps::MAX.is_valid_price());
    }

    #[test]
    #[should_panic(expected = "basis points cannot exceed 10000")]
    fn bps_rejects_over_scale() {
        let _ = Bps::new(10_001);
    }

    #[test]
    fn bps_to_decimal() {
        assert_eq!(Bps::new(6800).to_decimal(), dec!(0.6800));
    }

    #[test]
    fn bps_deserialization_enforces_the_scale_cap() {
        let rate: Bps = serde_json::from_str("6000").unwrap();
        assert_eq!(rate, Bps::new(6000));
        assert!(serde_json::from_str::<Bps>("10001").is_err());
    }
}
