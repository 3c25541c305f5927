//! Type-safe price representation using decimal arithmetic.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Errors that can occur when constructing a [`Price`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    /// The text is not a number.
    #[error("A valid number is required.")]
    Invalid,
    /// The amount is below zero.
    #[error("Ensure this value is greater than or equal to 0.")]
    Negative,
    /// More than two digits after the decimal point.
    #[error("Ensure that there are no more than {max} decimal places.")]
    TooManyDecimalPlaces {
        /// Maximum allowed decimal places.
        max: u32,
    },
    /// More digits in total than the column holds.
    #[error("Ensure that there are no more than {max} digits in total.")]
    TooManyDigits {
        /// Maximum allowed total digits.
        max: u32,
    },
}

/// A non-negative product price, stored as `NUMERIC(10, 2)`.
///
/// Serializes as a decimal string (`"19.99"`); deserializes from either a
/// string or a JSON number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Price(Decimal);

impl Price {
    /// Total digits the column holds.
    pub const MAX_DIGITS: u32 = 10;
    /// Digits after the decimal point.
    pub const DECIMAL_PLACES: u32 = 2;

    /// Create a validated price.
    ///
    /// # Errors
    ///
    /// Returns an error if the amount is negative or does not fit
    /// `NUMERIC(10, 2)`.
    pub fn new(amount: Decimal) -> Result<Self, PriceError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(PriceError::Negative);
        }

        let normalized = amount.normalize();
        if normalized.scale() > Self::DECIMAL_PLACES {
            return Err(PriceError::TooManyDecimalPlaces {
                max: Self::DECIMAL_PLACES,
            });
        }

        let whole = normalized.trunc().abs().to_string();
        let whole_digits = u32::try_from(whole.trim_start_matches('0').len()).unwrap_or(u32::MAX);
        if whole_digits > Self::MAX_DIGITS - Self::DECIMAL_PLACES {
            return Err(PriceError::TooManyDigits {
                max: Self::MAX_DIGITS,
            });
        }

        let mut rounded = normalized;
        rounded.rescale(Self::DECIMAL_PLACES);
        Ok(Self(rounded))
    }

    /// Parse a price from its decimal text (`"19.99"`, `"5"`, `"1.5e1"`).
    ///
    /// Decimal places are counted on the text, so input with more digits
    /// than [`Decimal`] can hold is rejected instead of rounded.
    ///
    /// # Errors
    ///
    /// Returns [`PriceError::Invalid`] for text that is not a number, and
    /// otherwise the errors of [`Price::new`].
    pub fn parse(raw: &str) -> Result<Self, PriceError> {
        let raw = raw.trim();
        let amount = raw
            .parse::<Decimal>()
            .or_else(|_| Decimal::from_scientific(raw))
            .map_err(|_| PriceError::Invalid)?;
        let price = Self::new(amount)?;

        if fractional_places(raw) > i64::from(Self::DECIMAL_PLACES) {
            return Err(PriceError::TooManyDecimalPlaces {
                max: Self::DECIMAL_PLACES,
            });
        }
        Ok(price)
    }

    /// The price amount, always with two decimal places.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }
}

/// Significant digits after the point, accounting for an exponent.
fn fractional_places(raw: &str) -> i64 {
    let (mantissa, exponent) = raw
        .split_once(['e', 'E'])
        .map_or((raw, 0), |(m, e)| (m, e.parse::<i64>().unwrap_or(0)));
    let fraction = mantissa
        .split_once('.')
        .map_or("", |(_, f)| f)
        .trim_end_matches('0');
    i64::try_from(fraction.len())
        .unwrap_or(i64::MAX)
        .saturating_sub(exponent)
}

impl TryFrom<Decimal> for Price {
    type Error = PriceError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Price> for Decimal {
    fn from(price: Price) -> Self {
        price.0
    }
}

impl core::fmt::Display for Price {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_new_rescales_to_two_places() {
        let price = Price::new(dec("19.9")).unwrap();
        assert_eq!(price.to_string(), "19.90");
        assert_eq!(Price::new(dec("5")).unwrap().to_string(), "5.00");
    }

    #[test]
    fn test_trailing_zeros_do_not_count_as_places() {
        assert!(Price::new(dec("1.2300")).is_ok());
    }

    #[test]
    fn test_rejects_negative() {
        assert_eq!(Price::new(dec("-0.01")), Err(PriceError::Negative));
        assert!(Price::new(dec("0")).is_ok());
    }

    #[test]
    fn test_rejects_extra_places() {
        assert_eq!(
            Price::new(dec("1.999")),
            Err(PriceError::TooManyDecimalPlaces { max: 2 })
        );
    }

    #[test]
    fn test_rejects_too_many_digits() {
        assert!(Price::new(dec("99999999.99")).is_ok());
        assert_eq!(
            Price::new(dec("100000000")),
            Err(PriceError::TooManyDigits { max: 10 })
        );
    }

    #[test]
    fn test_parse_counts_places_on_the_text() {
        assert_eq!(Price::parse(" 19.90 ").unwrap().to_string(), "19.90");
        assert_eq!(Price::parse("1.5e1").unwrap().to_string(), "15.00");
        assert_eq!(
            Price::parse("1.0000000000000000000000000000001"),
            Err(PriceError::TooManyDecimalPlaces { max: 2 })
        );
        assert_eq!(
            Price::parse("5e-3"),
            Err(PriceError::TooManyDecimalPlaces { max: 2 })
        );
        assert_eq!(Price::parse("cheap"), Err(PriceError::Invalid));
        assert_eq!(Price::parse("-1"), Err(PriceError::Negative));
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            PriceError::Negative.to_string(),
            "Ensure this value is greater than or equal to 0."
        );
        assert_eq!(
            PriceError::TooManyDecimalPlaces { max: 2 }.to_string(),
            "Ensure that there are no more than 2 decimal places."
        );
    }

    #[test]
    fn test_json_accepts_string_or_number() {
        let from_str: Price = serde_json::from_str("\"12.50\"").unwrap();
        let from_num: Price = serde_json::from_str("12.5").unwrap();
        assert_eq!(from_str, from_num);
        assert_eq!(serde_json::to_string(&from_num).unwrap(), "\"12.50\"");
    }
}
