//! Amount arithmetic with decimal precision.
//!
//! CRITICAL: Never use floating-point for money calculations.
//! Amounts enter the system as strings and are parsed straight into
//! `rust_decimal::Decimal`; comparisons are exact.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Most fractional digits a stored amount keeps (`NUMERIC(19, 4)`).
pub const MAX_AMOUNT_SCALE: u32 = 4;

/// Most integer digits a stored amount keeps (`NUMERIC(19, 4)`).
pub const MAX_AMOUNT_INTEGER_DIGITS: u32 = 15;

/// Errors produced while parsing amounts and currency codes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmountError {
    /// Input was empty after trimming.
    #[error("amount is empty")]
    Empty,

    /// Input is not a plain decimal number.
    #[error("amount '{0}' is not a valid decimal number")]
    Malformed(String),

    /// Amount has more fractional digits than storage keeps.
    #[error("amount '{0}' has more than 4 decimal places")]
    TooPrecise(String),

    /// Amount has more integer digits than storage keeps.
    #[error("amount '{0}' has more than 15 integer digits")]
    TooLarge(String),

    /// Amount must be strictly positive.
    #[error("amount must be greater than zero, got {0}")]
    NotPositive(Decimal),

    /// Amount must not be negative.
    #[error("amount must not be negative, got {0}")]
    Negative(Decimal),

    /// Currency code is not three ASCII letters.
    #[error("invalid currency code '{0}'")]
    InvalidCurrency(String),
}

/// Parses a plain decimal string (`"12"`, `"-3.50"`, `" 0.125 "`).
///
/// Exponents, thousands separators and underscores are rejected so the
/// stored value is always the one the caller typed. Trailing zeros after
/// the point do not count towards the scale limit.
///
/// # Errors
///
/// Returns `AmountError::Empty`, `AmountError::Malformed`, or
/// `TooPrecise` / `TooLarge` for values storage would round or overflow.
pub fn parse_amount(input: &str) -> Result<Decimal, AmountError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(AmountError::Empty);
    }

    let digits = trimmed
        .strip_prefix(['-', '+'])
        .unwrap_or(trimmed);
    let mut seen_dot = false;
    let mut seen_digit = false;
    for ch in digits.chars() {
        match ch {
            '0'..='9' => seen_digit = true,
            '.' if !seen_dot => seen_dot = true,
            _ => return Err(AmountError::Malformed(trimmed.to_string())),
        }
    }
    if !seen_digit {
        return Err(AmountError::Malformed(trimmed.to_string()));
    }

    let amount =
        Decimal::from_str(trimmed).map_err(|_| AmountError::Malformed(trimmed.to_string()))?;
    check_storable(amount, trimmed)?;
    Ok(amount)
}

fn check_storable(amount: Decimal, raw: &str) -> Result<(), AmountError> {
    if amount.normalize().scale() > MAX_AMOUNT_SCALE {
        return Err(AmountError::TooPrecise(raw.to_string()));
    }
    let limit = Decimal::from(10_i64.pow(MAX_AMOUNT_INTEGER_DIGITS));
    if amount.abs() >= limit {
        return Err(AmountError::TooLarge(raw.to_string()));
    }
    Ok(())
}

/// Parses an amount that must be strictly positive (expense and settlement totals, payments).
///
/// # Errors
///
/// Returns a parse error or `AmountError::NotPositive`.
pub fn parse_positive_amount(input: &str) -> Result<Decimal, AmountError> {
    let amount = parse_amount(input)?;
    if amount <= Decimal::ZERO {
        return Err(AmountError::NotPositive(amount));
    }
    Ok(amount)
}

/// Parses an amount that may be zero but not negative (split lines).
///
/// # Errors
///
/// Returns a parse error or `AmountError::Negative`.
pub fn parse_non_negative_amount(input: &str) -> Result<Decimal, AmountError> {
    let amount = parse_amount(input)?;
    if amount < Decimal::ZERO {
        return Err(AmountError::Negative(amount));
    }
    Ok(amount)
}

/// Renders an amount with at least two decimal places.
///
/// Extra precision is kept, never rounded away.
#[must_use]
pub fn format_amount(amount: Decimal) -> String {
    let mut value = amount;
    if value.scale() < 2 {
        value.rescale(2);
    }
    value.to_string()
}

/// ISO 4217 style currency code (three ASCII letters, upper case).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CurrencyCode(String);

impl CurrencyCode {
    /// Parses and normalizes a currency code.
    ///
    /// # Errors
    ///
    /// Returns `AmountError::InvalidCurrency` unless the trimmed input is three ASCII letters.
    pub fn parse(input: &str) -> Result<Self, AmountError> {
        let trimmed = input.trim();
        if trimmed.len() == 3 && trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
            Ok(Self(trimmed.to_ascii_uppercase()))
        } else {
            Err(AmountError::InvalidCurrency(trimmed.to_string()))
        }
    }

    /// Resolves an optional caller-supplied code, falling back when blank.
    ///
    /// # Errors
    ///
    /// Returns `AmountError::InvalidCurrency` if a non-blank input is invalid.
    pub fn resolve(input: Option<&str>, fallback: &Self) -> Result<Self, AmountError> {
        match input.map(str::trim) {
            None | Some("") => Ok(fallback.clone()),
            Some(code) => Self::parse(code),
        }
    }

    /// Returns the code as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for CurrencyCode {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for CurrencyCode {
    type Error = AmountError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<CurrencyCode> for String {
    fn from(code: CurrencyCode) -> Self {
        code.0
    }
}
