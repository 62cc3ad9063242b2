//! Tolerant numeric input
//!
//! Quantities and prices are edited as free text, so a half-typed value
//! ("", "1.", "abc") has to survive a save. `RawNumber` keeps whatever the
//! user entered; `to_decimal` is the one place where it becomes a number.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

/// Number-or-text value captured at the edit boundary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawNumber {
    Number(serde_json::Number),
    Text(String),
}

impl RawNumber {
    pub fn empty() -> Self {
        RawNumber::Text(String::new())
    }

    /// Strict numeric value. Empty or non-numeric input is zero.
    pub fn to_decimal(&self) -> Decimal {
        match self {
            RawNumber::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Decimal::from(i)
                } else if let Some(u) = n.as_u64() {
                    Decimal::from(u)
                } else {
                    parse_decimal(&n.to_string())
                }
            }
            RawNumber::Text(s) => parse_decimal(s),
        }
    }

    pub fn is_blank(&self) -> bool {
        matches!(self, RawNumber::Text(s) if s.trim().is_empty())
    }
}

fn parse_decimal(text: &str) -> Decimal {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Decimal::ZERO;
    }
    Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .unwrap_or(Decimal::ZERO)
}

impl Default for RawNumber {
    fn default() -> Self {
        RawNumber::empty()
    }
}

impl From<i64> for RawNumber {
    fn from(value: i64) -> Self {
        RawNumber::Number(value.into())
    }
}

impl From<&str> for RawNumber {
    fn from(value: &str) -> Self {
        RawNumber::Text(value.to_string())
    }
}

impl From<Decimal> for RawNumber {
    /// Whole values become JSON numbers; fractional values stay exact as text.
    fn from(value: Decimal) -> Self {
        let value = value.normalize();
        if value.is_integer() {
            if let Ok(i) = i64::try_from(value) {
                return RawNumber::Number(i.into());
            }
        }
        RawNumber::Text(value.to_string())
    }
}

impl fmt::Display for RawNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawNumber::Number(n) => write!(f, "{n}"),
            RawNumber::Text(s) => f.write_str(s.trim()),
        }
    }
}

/// Percentage field reader: absent, null or non-numeric is 0, negative is
/// clamped to 0.
pub fn lenient_rate<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<RawNumber>::deserialize(deserializer)?;
    Ok(raw
        .map(|r| r.to_decimal())
        .unwrap_or(Decimal::ZERO)
        .max(Decimal::ZERO))
}
