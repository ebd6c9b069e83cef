use std::{fmt::Display, iter::Sum, str::FromStr};

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

use crate::op;

pub const DEFAULT_CURRENCY_CODE: &str = "RUB";
pub const MINOR_UNITS_PER_MAJOR: i64 = 100;

//--------------------------------------       Tokens        ---------------------------------------------------------
/// The in-app currency. Samples are priced in tokens, and users buy tokens with real money.
#[derive(Debug, Clone, Copy, Default, Type, PartialEq, Eq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct Tokens(i64);

op!(binary Tokens, Add, add);
op!(binary Tokens, Sub, sub);
op!(inplace Tokens, AddAssign, add_assign);
op!(inplace Tokens, SubAssign, sub_assign);
op!(unary Tokens, Neg, neg);
op!(scalar Tokens, Mul, mul);

impl Sum for Tokens {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), std::ops::Add::add)
    }
}

impl From<i64> for Tokens {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl Display for Tokens {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} tokens", self.0)
    }
}

impl Tokens {
    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }
}

//--------------------------------------     MinorUnits      ---------------------------------------------------------
/// An amount of real-world currency, expressed in the smallest unit of that currency (kopecks, cents).
///
/// `MinorUnits::from(10_050)` is 100.50 in the major unit.
#[derive(Debug, Clone, Copy, Default, Type, PartialEq, Eq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct MinorUnits(i64);

op!(binary MinorUnits, Add, add);
op!(binary MinorUnits, Sub, sub);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Cannot interpret '{0}' as a currency amount")]
pub struct AmountParseError(pub String);

impl From<i64> for MinorUnits {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl MinorUnits {
    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn from_major(major: i64) -> Self {
        Self(major * MINOR_UNITS_PER_MAJOR)
    }

    /// The whole number of major units in this amount. Any remainder is discarded, so `major()` of 199 is 1.
    pub fn major(&self) -> i64 {
        self.0.div_euclid(MINOR_UNITS_PER_MAJOR)
    }

    /// The remainder after taking out [`Self::major`], always in `0..100`.
    pub fn minor(&self) -> i64 {
        self.0.rem_euclid(MINOR_UNITS_PER_MAJOR)
    }

    /// Formats the amount the way payment gateways expect it, e.g. `"100.05"`.
    pub fn to_decimal_string(&self) -> String {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let per_major = MINOR_UNITS_PER_MAJOR.unsigned_abs();
        format!("{sign}{}.{:02}", abs / per_major, abs % per_major)
    }
}

impl Display for MinorUnits {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_decimal_string())
    }
}

impl FromStr for MinorUnits {
    type Err = AmountParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || AmountParseError(s.to_string());
        let trimmed = s.trim();
        let (negative, digits) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed),
        };
        let (major, minor) = digits.split_once('.').unwrap_or((digits, ""));
        if major.is_empty() || minor.len() > 2 || !major.chars().chain(minor.chars()).all(|c| c.is_ascii_digit()) {
            return Err(err());
        }
        let major = major.parse::<i64>().map_err(|_| err())?;
        let minor = match minor.len() {
            0 => 0,
            1 => minor.parse::<i64>().map_err(|_| err())? * 10,
            _ => minor.parse::<i64>().map_err(|_| err())?,
        };
        let value = major.checked_mul(MINOR_UNITS_PER_MAJOR).and_then(|v| v.checked_add(minor)).ok_or_else(err)?;
        Ok(Self(if negative { -value } else { value }))
    }
}

/// The number of tokens a payment of `amount` buys at `tokens_per_major_unit`.
///
/// Only whole major units earn tokens: 199 minor units at 10 tokens per unit is 10 tokens, not 19.9.
/// Returns `None` if the result does not fit in a `Tokens` value.
pub fn tokens_for_amount(amount: MinorUnits, tokens_per_major_unit: i64) -> Option<Tokens> {
    amount.major().checked_mul(tokens_per_major_unit).map(Tokens)
}
