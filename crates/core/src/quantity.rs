//! Non-negative stock quantity.

use core::fmt;
use core::iter::Sum;
use core::ops::Add;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};
use crate::value_object::ValueObject;

/// An exact, non-negative amount of an ingredient, in the ingredient's unit.
///
/// Construction rejects negative values, so every `Quantity` in the system
/// satisfies `>= 0`. Subtraction is only available in checked/saturating form.
/// `+` and `Sum` panic on decimal overflow; use `checked_add` wherever the
/// operands are not already bounded by a checked total.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Quantity(Decimal);

impl ValueObject for Quantity {}

impl Quantity {
    pub const ZERO: Quantity = Quantity(Decimal::ZERO);

    pub fn new(value: Decimal) -> DomainResult<Self> {
        if value < Decimal::ZERO {
            return Err(DomainError::validation(format!(
                "quantity cannot be negative: {value}"
            )));
        }
        Ok(Self(value.normalize()))
    }

    /// Whole-unit quantity (e.g. `Quantity::units(5)` = 5 kg for a kg ingredient).
    pub fn units(value: u32) -> Self {
        Self(Decimal::from(value))
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// `self - other`, or `None` if the result would be negative.
    pub fn checked_sub(self, other: Quantity) -> Option<Quantity> {
        if other.0 > self.0 {
            None
        } else {
            Some(Quantity((self.0 - other.0).normalize()))
        }
    }

    pub fn saturating_sub(self, other: Quantity) -> Quantity {
        self.checked_sub(other).unwrap_or(Quantity::ZERO)
    }

    /// `self + other`, or `None` if the decimal range overflows.
    pub fn checked_add(self, other: Quantity) -> Option<Quantity> {
        self.0.checked_add(other.0).map(|v| Quantity(v.normalize()))
    }

    /// Scale a per-portion amount by a portion count, or `None` on overflow.
    pub fn checked_mul(self, portions: u32) -> Option<Quantity> {
        self.0
            .checked_mul(Decimal::from(portions))
            .map(|v| Quantity(v.normalize()))
    }
}

impl Add for Quantity {
    type Output = Quantity;

    fn add(self, rhs: Quantity) -> Quantity {
        Quantity((self.0 + rhs.0).normalize())
    }
}

impl Sum for Quantity {
    fn sum<I: Iterator<Item = Quantity>>(iter: I) -> Quantity {
        iter.fold(Quantity::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Quantity> for Quantity {
    fn sum<I: Iterator<Item = &'a Quantity>>(iter: I) -> Quantity {
        iter.copied().sum()
    }
}

impl TryFrom<Decimal> for Quantity {
    type Error = DomainError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Quantity::new(value)
    }
}

impl From<Quantity> for Decimal {
    fn from(value: Quantity) -> Self {
        value.0
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn rejects_negative_values() {
        let err = Quantity::new(dec!(-0.5)).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn checked_sub_never_goes_negative() {
        let five = Quantity::units(5);
        let six = Quantity::units(6);
        assert_eq!(five.checked_sub(six), None);
        assert_eq!(six.checked_sub(five), Some(Quantity::units(1)));
        assert_eq!(five.saturating_sub(six), Quantity::ZERO);
    }

    #[test]
    fn equal_values_compare_equal_regardless_of_scale() {
        let a = Quantity::new(dec!(2.50)).unwrap();
        let b = Quantity::new(dec!(2.5)).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "2.5");
    }

    #[test]
    fn sums_and_scales() {
        let per_portion = Quantity::new(dec!(0.25)).unwrap();
        assert_eq!(per_portion.checked_mul(4), Some(Quantity::units(1)));

        let total: Quantity = [Quantity::units(1), Quantity::new(dec!(0.5)).unwrap()]
            .iter()
            .sum();
        assert_eq!(total, Quantity::new(dec!(1.5)).unwrap());
    }

    #[test]
    fn checked_arithmetic_reports_overflow() {
        let max = Quantity::new(Decimal::MAX).unwrap();
        assert_eq!(max.checked_add(Quantity::units(1)), None);
        assert_eq!(max.checked_mul(2), None);
        assert_eq!(max.checked_add(Quantity::ZERO), Some(max));
        assert_eq!(max.checked_mul(1), Some(max));
    }

    #[test]
    fn deserialization_enforces_non_negative() {
        let ok: Quantity = serde_json::from_str("\"3.5\"").unwrap();
        assert_eq!(ok, Quantity::new(dec!(3.5)).unwrap());
        assert!(serde_json::from_str::<Quantity>("\"-1\"").is_err());
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        /// Non-negative decimal with up to 4 fractional digits.
        fn amount() -> impl Strategy<Value = Decimal> {
            (0i64..10_000_000, 0u32..5).prop_map(|(n, scale)| Decimal::new(n, scale))
        }

        proptest! {
            #[test]
            fn checked_sub_is_never_negative(a in amount(), b in amount()) {
                let a = Quantity::new(a).unwrap();
                let b = Quantity::new(b).unwrap();
                match a.checked_sub(b) {
                    Some(diff) => {
                        prop_assert!(diff.value() >= Decimal::ZERO);
                        prop_assert_eq!(diff + b, a);
                    }
                    None => prop_assert!(b > a),
                }
                prop_assert!(a.saturating_sub(b) <= a);
            }

            #[test]
            fn addition_ignores_scale(a in amount(), b in amount(), pad in 0u32..6) {
                let mut padded = a;
                padded.rescale(a.scale() + pad);

                let plain = Quantity::new(a).unwrap();
                let rescaled = Quantity::new(padded).unwrap();
                let other = Quantity::new(b).unwrap();

                prop_assert_eq!(plain, rescaled);
                prop_assert_eq!(plain.checked_add(other), rescaled.checked_add(other));
                let summed: Quantity = [rescaled, other].iter().sum();
                prop_assert_eq!(Some(summed), plain.checked_add(other));
            }

            #[test]
            fn checked_mul_matches_repeated_addition(a in amount(), n in 0u32..8) {
                let q = Quantity::new(a).unwrap();
                let repeated: Quantity = std::iter::repeat_n(q, n as usize).sum();
                prop_assert_eq!(q.checked_mul(n), Some(repeated));
            }
        }
    }
}
