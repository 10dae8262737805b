//! A fixed-point amount of money stored as a whole number of centavos.

use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, AddAssign, Neg, Sub, SubAssign},
};

use rusqlite::{
    ToSql,
    types::{ToSqlOutput, ValueRef},
};
use serde::{Deserialize, Serialize};

use crate::Error;

/// The number of minor units (centavos) in one major unit (peso).
const MINOR_UNITS_PER_MAJOR: i64 = 100;

/// The largest amount a user may enter, one billion pesos.
///
/// Millions of entries at this amount still sum within an `i64`.
pub const MAX_ENTRY_AMOUNT: Amount = Amount::from_major_units(1_000_000_000);

/// An amount of money in the app's single currency.
///
/// Amounts are kept in minor units so that summing many entries over a month
/// never drifts the way floating point sums do.
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Amount(i64);

impl Amount {
    /// Zero pesos.
    pub const ZERO: Amount = Amount(0);

    /// Create an amount from a whole number of centavos.
    pub const fn from_minor_units(minor_units: i64) -> Self {
        Self(minor_units)
    }

    /// Create an amount from a whole number of pesos.
    pub const fn from_major_units(major_units: i64) -> Self {
        Self(major_units * MINOR_UNITS_PER_MAJOR)
    }

    /// The amount as a whole number of centavos.
    pub const fn minor_units(self) -> i64 {
        self.0
    }

    /// The amount in pesos as a float, for display only.
    pub fn as_f64(self) -> f64 {
        self.0 as f64 / MINOR_UNITS_PER_MAJOR as f64
    }

    /// Whether the amount is greater than zero.
    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// Parse an amount entered by a user, e.g. "1,250.5" or "₱99".
    ///
    /// # Errors
    /// Returns [Error::InvalidAmount] if the text is not a number with at most
    /// two decimal places, if the amount is not greater than zero, or if it is
    /// more than [MAX_ENTRY_AMOUNT].
    pub fn parse_positive(text: &str) -> Result<Self, Error> {
        let invalid = || Error::InvalidAmount(text.to_owned());
        let cleaned: String = text
            .trim()
            .trim_start_matches('₱')
            .chars()
            .filter(|c| *c != ',')
            .collect();

        let (whole, fraction) = match cleaned.split_once('.') {
            Some((whole, fraction)) => (whole, fraction),
            None => (cleaned.as_str(), ""),
        };

        if whole.is_empty() && fraction.is_empty() {
            return Err(invalid());
        }

        let is_digits = |part: &str| part.chars().all(|c| c.is_ascii_digit());
        if !is_digits(whole) || !is_digits(fraction) {
            return Err(invalid());
        }

        let whole: i64 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| invalid())?
        };
        let fraction: i64 = match fraction.len() {
            0 => 0,
            1 => fraction.parse::<i64>().map_err(|_| invalid())? * 10,
            2 => fraction.parse().map_err(|_| invalid())?,
            _ => return Err(invalid()),
        };

        let minor_units = whole
            .checked_mul(MINOR_UNITS_PER_MAJOR)
            .and_then(|minor| minor.checked_add(fraction))
            .ok_or_else(invalid)?;

        if minor_units <= 0 || minor_units > MAX_ENTRY_AMOUNT.0 {
            return Err(invalid());
        }

        Ok(Self(minor_units))
    }

    /// Read an amount column, treating anything that is not a number as zero.
    ///
    /// Returns `None` when the value is missing or not a number, so the
    /// caller can log it before falling back to [Amount::ZERO].
    pub fn coerce_from_sql(value: ValueRef<'_>) -> Option<Self> {
        match value {
            ValueRef::Integer(minor_units) => Some(Self(minor_units)),
            ValueRef::Real(minor_units) if minor_units.is_finite() => {
                Some(Self(minor_units.round() as i64))
            }
            ValueRef::Text(text) => std::str::from_utf8(text)
                .ok()
                .and_then(|text| text.trim().parse().ok())
                .map(Self),
            _ => None,
        }
    }
}

impl Display for Amount {
    /// Formats the amount as a plain decimal number, e.g. "1250.50".
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let minor_units = self.0.unsigned_abs();
        let per_major = MINOR_UNITS_PER_MAJOR as u64;

        write!(
            f,
            "{sign}{}.{:02}",
            minor_units / per_major,
            minor_units % per_major
        )
    }
}

// Amounts read from the database are not bounded, so arithmetic saturates.
impl Add for Amount {
    type Output = Amount;

    fn add(self, rhs: Self) -> Self::Output {
        Amount(self.0.saturating_add(rhs.0))
    }
}

impl AddAssign for Amount {
    fn add_assign(&mut self, rhs: Self) {
        self.0 = self.0.saturating_add(rhs.0);
    }
}

impl Sub for Amount {
    type Output = Amount;

    fn sub(self, rhs: Self) -> Self::Output {
        Amount(self.0.saturating_sub(rhs.0))
    }
}

impl SubAssign for Amount {
    fn sub_assign(&mut self, rhs: Self) {
        self.0 = self.0.saturating_sub(rhs.0);
    }
}

impl Neg for Amount {
    type Output = Amount;

    fn neg(self) -> Self::Output {
        Amount(self.0.saturating_neg())
    }
}

impl Sum for Amount {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Amount::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Amount> for Amount {
    fn sum<I: Iterator<Item = &'a Amount>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

impl ToSql for Amount {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.0))
    }
}
