//! Type-safe price representation using decimal arithmetic.

use core::fmt;
use core::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Errors that can occur when constructing a [`Price`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    /// The amount is below the minimum price.
    #[error("price must be at least {min} (got {actual})")]
    TooLow {
        /// Smallest accepted amount.
        min: Decimal,
        /// Rejected amount.
        actual: Decimal,
    },
    /// The amount doesn't fit the stored `NUMERIC(10, 2)` column.
    #[error("price must be at most {max} (got {actual})")]
    TooHigh {
        /// Largest accepted amount.
        max: Decimal,
        /// Rejected amount.
        actual: Decimal,
    },
    /// The amount carries more fractional digits than allowed.
    #[error("price must have at most {max} decimal places (got {actual})")]
    TooPrecise {
        /// Maximum number of fractional digits.
        max: u32,
        /// Fractional digits of the rejected amount.
        actual: u32,
    },
    /// The input is not a decimal number.
    #[error("price is not a valid decimal: {0}")]
    Malformed(String),
}

/// A catalog price.
///
/// ## Constraints
///
/// - At least `0.01`, at most `99999999.99`
/// - At most two fractional digits (`3.5` and `3.50` are accepted, `3.505` is not)
///
/// The stored amount is always rescaled to two decimal places so it renders
/// as `"3.50"` and compares equal to the value stored in a `NUMERIC(10, 2)`
/// column.
///
/// ```
/// use coffee_catalog_core::Price;
/// use rust_decimal::Decimal;
///
/// let price = Price::new(Decimal::new(35, 1)).unwrap();
/// assert_eq!(price.to_string(), "3.50");
///
/// assert!("0.00".parse::<Price>().is_err());
/// assert!("1.999".parse::<Price>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Price(Decimal);

impl Price {
    /// Smallest accepted price.
    pub const MIN: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

    /// Largest accepted price, the limit of a `NUMERIC(10, 2)` column.
    pub const MAX: Decimal = Decimal::from_parts(1_410_065_407, 2, 0, false, 2);

    /// Maximum number of fractional digits.
    pub const MAX_SCALE: u32 = 2;

    /// Create a price from a decimal amount.
    ///
    /// # Errors
    ///
    /// Returns an error if the amount is outside [`Price::MIN`]..=[`Price::MAX`]
    /// or has more than [`Price::MAX_SCALE`] fractional digits.
    pub fn new(amount: Decimal) -> Result<Self, PriceError> {
        if amount < Self::MIN {
            return Err(PriceError::TooLow {
                min: Self::MIN,
                actual: amount,
            });
        }
        if amount > Self::MAX {
            return Err(PriceError::TooHigh {
                max: Self::MAX,
                actual: amount,
            });
        }

        let scale = amount.normalize().scale();
        if scale > Self::MAX_SCALE {
            return Err(PriceError::TooPrecise {
                max: Self::MAX_SCALE,
                actual: scale,
            });
        }

        let mut amount = amount;
        amount.rescale(Self::MAX_SCALE);
        Ok(Self(amount))
    }

    /// The amount in the currency's standard unit.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Price {
    type Err = PriceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let amount = Decimal::from_str(s.trim()).map_err(|e| PriceError::Malformed(e.to_string()))?;
        Self::new(amount)
    }
}

impl TryFrom<Decimal> for Price {
    type Error = PriceError;

    fn try_from(amount: Decimal) -> Result<Self, Self::Error> {
        Self::new(amount)
    }
}

impl From<Price> for Decimal {
    fn from(price: Price) -> Self {
        price.0
    }
}

// SQLx support (with postgres feature)
#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for Price {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <Decimal as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <Decimal as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Price {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let amount = <Decimal as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self::new(amount)?)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for Price {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <Decimal as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_minimum_price_accepted() {
        let price = Price::new(Decimal::new(1, 2)).unwrap();
        assert_eq!(price.amount(), Price::MIN);
    }

    #[test]
    fn test_zero_and_negative_rejected() {
        assert!(matches!(
            Price::new(Decimal::ZERO),
            Err(PriceError::TooLow { .. })
        ));
        assert!(matches!(
            Price::new(Decimal::new(-350, 2)),
            Err(PriceError::TooLow { .. })
        ));
    }

    #[test]
    fn test_maximum_price_fits_numeric_column() {
        assert_eq!(Price::MAX, Decimal::new(9_999_999_999, 2));

        let price = Price::new(Price::MAX).unwrap();
        assert_eq!(price.to_string(), "99999999.99");
    }

    #[test]
    fn test_price_above_column_range_rejected() {
        assert!(matches!(
            Price::new(Decimal::new(123_456_789, 0)),
            Err(PriceError::TooHigh { .. })
        ));
        assert!(matches!(
            "100000000.00".parse::<Price>(),
            Err(PriceError::TooHigh { .. })
        ));
    }

    #[test]
    fn test_three_decimals_rejected() {
        assert!(matches!(
            Price::new(Decimal::new(3505, 3)),
            Err(PriceError::TooPrecise { max: 2, actual: 3 })
        ));
    }

    #[test]
    fn test_trailing_zeros_do_not_count_as_precision() {
        // 3.5000 has scale 4 but normalizes to 3.5
        let price = Price::new(Decimal::new(35000, 4)).unwrap();
        assert_eq!(price.to_string(), "3.50");
    }

    #[test]
    fn test_rescaled_to_two_places() {
        assert_eq!("2".parse::<Price>().unwrap().to_string(), "2.00");
        assert_eq!("3.5".parse::<Price>().unwrap().to_string(), "3.50");
    }

    #[test]
    fn test_malformed_input() {
        assert!(matches!(
            "three fifty".parse::<Price>(),
            Err(PriceError::Malformed(_))
        ));
    }

    #[test]
    fn test_serializes_as_string() {
        let price: Price = "3.5".parse().unwrap();
        assert_eq!(serde_json::to_string(&price).unwrap(), "\"3.50\"");
    }

    #[test]
    fn test_deserialize_accepts_numbers_and_strings() {
        let from_number: Price = serde_json::from_str("3.5").unwrap();
        let from_string: Price = serde_json::from_str("\"3.50\"").unwrap();
        assert_eq!(from_number, from_string);
    }

    #[test]
    fn test_deserialize_validates() {
        assert!(serde_json::from_str::<Price>("0").is_err());
        assert!(serde_json::from_str::<Price>("\"1.001\"").is_err());
    }
}
