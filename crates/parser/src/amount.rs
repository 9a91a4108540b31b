use rust_decimal::Decimal;
use serde::Serialize;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AmountFormatError {
    #[error("empty amount")]
    Empty,
    #[error("'{0}' is not a non-negative decimal")]
    Invalid(String),
    #[error("'{0}' has more than two decimal places")]
    Precision(String),
}

/// Parse a captured amount such as `1,200.00` into an exact decimal.
///
/// Thousands separators are dropped; whatever remains must be plain digits with
/// an optional fraction of at most two digits.
pub fn parse_amount(captured: &str) -> Result<Decimal, AmountFormatError> {
    let clean: String = captured.trim().chars().filter(|c| *c != ',').collect();
    if clean.is_empty() {
        return Err(AmountFormatError::Empty);
    }

    let (whole, fraction) = match clean.split_once('.') {
        Some((w, f)) => (w, Some(f)),
        None => (clean.as_str(), None),
    };
    let all_digits = |s: &str| !s.is_empty() && s.chars().all(|c| c.is_ascii_digit());
    if !all_digits(whole) || !fraction.map_or(true, all_digits) {
        return Err(AmountFormatError::Invalid(captured.to_string()));
    }
    if fraction.is_some_and(|f| f.len() > 2) {
        return Err(AmountFormatError::Precision(captured.to_string()));
    }

    Decimal::from_str(&clean).map_err(|_| AmountFormatError::Invalid(captured.to_string()))
}
