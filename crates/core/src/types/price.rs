//! Type-safe price representation using decimal arithmetic.
//!
//! Prices are stored as `NUMERIC(10, 2)` and are never negative. All cart and
//! order arithmetic goes through [`Price::line_total`] and [`Price::try_sum`],
//! which keep every result inside the column's range.

use core::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Errors that can occur when constructing a [`Price`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    /// The amount is below zero.
    #[error("price cannot be negative")]
    Negative,
    /// The amount does not fit into `NUMERIC(10, 2)`.
    #[error("price must be below {max}")]
    TooLarge {
        /// Exclusive upper bound.
        max: Decimal,
    },
    /// The input is not a decimal number.
    #[error("invalid price: {0}")]
    Invalid(String),
}

/// A non-negative monetary amount with two decimal places.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Price(Decimal);

impl Price {
    /// Zero.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Number of decimal places kept.
    pub const SCALE: u32 = 2;

    /// Create a price from a decimal amount, rounding to two places.
    ///
    /// # Errors
    ///
    /// Returns `PriceError::Negative` for negative amounts and
    /// `PriceError::TooLarge` when the amount overflows `NUMERIC(10, 2)`.
    pub fn new(amount: Decimal) -> Result<Self, PriceError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(PriceError::Negative);
        }
        if amount >= Self::upper_bound() {
            return Err(Self::too_large());
        }
        Ok(Self(amount.round_dp(Self::SCALE)))
    }

    /// Exclusive upper bound of `NUMERIC(10, 2)`.
    #[must_use]
    pub fn upper_bound() -> Decimal {
        Decimal::new(100_000_000, 0)
    }

    fn too_large() -> PriceError {
        PriceError::TooLarge {
            max: Self::upper_bound(),
        }
    }

    /// Create a price from minor units (kopecks, cents).
    #[must_use]
    pub fn from_minor(minor: u32) -> Self {
        Self(Decimal::new(i64::from(minor), Self::SCALE))
    }

    /// The underlying decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Price multiplied by a quantity, exactly.
    ///
    /// # Errors
    ///
    /// Returns `PriceError::TooLarge` when the product leaves `NUMERIC(10, 2)`.
    pub fn line_total(&self, quantity: u32) -> Result<Self, PriceError> {
        let amount = self
            .0
            .checked_mul(Decimal::from(quantity))
            .ok_or_else(Self::too_large)?;
        Self::new(amount)
    }

    /// Sum of two prices.
    ///
    /// # Errors
    ///
    /// Returns `PriceError::TooLarge` when the sum leaves `NUMERIC(10, 2)`.
    pub fn checked_add(self, other: Self) -> Result<Self, PriceError> {
        let amount = self.0.checked_add(other.0).ok_or_else(Self::too_large)?;
        Self::new(amount)
    }

    /// Sum of any number of prices; zero for none.
    ///
    /// # Errors
    ///
    /// Returns `PriceError::TooLarge` as soon as the running total leaves
    /// `NUMERIC(10, 2)`.
    pub fn try_sum<I>(prices: I) -> Result<Self, PriceError>
    where
        I: IntoIterator<Item = Self>,
    {
        prices
            .into_iter()
            .try_fold(Self::ZERO, |total, price| total.checked_add(price))
    }
}

impl Default for Price {
    fn default() -> Self {
        Self::ZERO
    }
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

impl std::str::FromStr for Price {
    type Err = PriceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let amount = s
            .trim()
            .parse::<Decimal>()
            .map_err(|e| PriceError::Invalid(e.to_string()))?;
        Self::new(amount)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

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
