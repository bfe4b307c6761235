//! Expiration Module
//!
//! Converts `maxAge` duration specifications into milliseconds and absolute
//! expiration timestamps.

use std::fmt;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::error::{CacheError, Result};

const INVALID_MAX_AGE: &str = "invalid value passed to maxAge";

// == Time Unit ==
/// Calendar unit accepted in an `[amount, unit]` duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    Second,
    Minute,
    Hour,
    Day,
    Week,
    /// ~30.44 days
    Month,
    /// ~365.25 days
    Year,
}

impl TimeUnit {
    pub const ALL: [TimeUnit; 7] = [
        TimeUnit::Second,
        TimeUnit::Minute,
        TimeUnit::Hour,
        TimeUnit::Day,
        TimeUnit::Week,
        TimeUnit::Month,
        TimeUnit::Year,
    ];

    /// Length of one unit in milliseconds.
    pub fn as_millis(self) -> f64 {
        match self {
            TimeUnit::Second => 1e3,
            TimeUnit::Minute => 6e4,
            TimeUnit::Hour => 36e5,
            TimeUnit::Day => 864e5,
            TimeUnit::Week => 6048e5,
            TimeUnit::Month => 26298e5,
            TimeUnit::Year => 315576e5,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TimeUnit::Second => "second",
            TimeUnit::Minute => "minute",
            TimeUnit::Hour => "hour",
            TimeUnit::Day => "day",
            TimeUnit::Week => "week",
            TimeUnit::Month => "month",
            TimeUnit::Year => "year",
        }
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimeUnit {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self> {
        TimeUnit::ALL
            .into_iter()
            .find(|unit| unit.as_str() == s)
            .ok_or_else(|| {
                let valid: Vec<&str> = TimeUnit::ALL.iter().map(|u| u.as_str()).collect();
                CacheError::InvalidValue(format!(
                    "invalid unit passed to maxAge. Unit should be one of: {}",
                    valid.join(",")
                ))
            })
    }
}

// == Max Age ==
/// How long a record stays fresh.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MaxAge {
    /// Plain milliseconds
    Millis(f64),
    /// `amount` of `unit`
    Span(f64, TimeUnit),
}

impl MaxAge {
    pub fn millis(ms: impl Into<f64>) -> Self {
        MaxAge::Millis(ms.into())
    }

    pub fn span(amount: impl Into<f64>, unit: TimeUnit) -> Self {
        MaxAge::Span(amount.into(), unit)
    }

    /// Builds a span from a unit name, rejecting unknown units.
    pub fn parse_span(amount: f64, unit: &str) -> Result<Self> {
        Ok(MaxAge::Span(amount, unit.parse()?))
    }
}

/// Wire form of a `maxAge`: either a number or an `[amount, "unit"]` pair.
///
/// The unit stays a string here so that an unknown unit surfaces as an
/// `InvalidValue` error naming the valid units rather than a decode failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawMaxAge {
    Millis(f64),
    Span(f64, String),
}

impl TryFrom<RawMaxAge> for MaxAge {
    type Error = CacheError;

    fn try_from(raw: RawMaxAge) -> Result<Self> {
        match raw {
            RawMaxAge::Millis(ms) => Ok(MaxAge::Millis(ms)),
            RawMaxAge::Span(amount, unit) => MaxAge::parse_span(amount, &unit),
        }
    }
}

// == Duration ==
/// Converts a `maxAge` into a positive duration in milliseconds.
///
/// Fails with `InvalidValue` for NaN, infinite, zero or negative amounts.
pub fn duration_ms(max_age: MaxAge) -> Result<u64> {
    let (amount, unit_ms) = match max_age {
        MaxAge::Millis(ms) => (ms, 1.0),
        MaxAge::Span(amount, unit) => (amount, unit.as_millis()),
    };
    if !amount.is_finite() || amount <= 0.0 {
        return Err(CacheError::InvalidValue(INVALID_MAX_AGE.to_string()));
    }
    Ok((amount * unit_ms).round() as u64)
}

/// Absolute expiration timestamp (Unix milliseconds) for a `maxAge` starting now.
pub fn expiration_from_now(max_age: MaxAge) -> Result<u64> {
    let duration = duration_ms(max_age)?;
    Ok(current_timestamp_ms().saturating_add(duration))
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration_plain_millis() {
        assert_eq!(duration_ms(MaxAge::millis(250)).unwrap(), 250);
    }

    #[test]
    fn test_duration_units() {
        assert_eq!(duration_ms(MaxAge::span(1, TimeUnit::Second)).unwrap(), 1_000);
        assert_eq!(duration_ms(MaxAge::span(2, TimeUnit::Minute)).unwrap(), 120_000);
        assert_eq!(duration_ms(MaxAge::span(1.5, TimeUnit::Hour)).unwrap(), 5_400_000);
        assert_eq!(duration_ms(MaxAge::span(1, TimeUnit::Month)).unwrap(), 2_629_800_000);
        assert_eq!(duration_ms(MaxAge::span(1, TimeUnit::Year)).unwrap(), 31_557_600_000);
    }

    #[test]
    fn test_duration_rejects_non_positive() {
        for ms in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let err = duration_ms(MaxAge::Millis(ms)).unwrap_err();
            assert!(err.is_invalid_value());
            assert_eq!(err.to_string(), "invalid value passed to maxAge");
        }
        assert!(duration_ms(MaxAge::span(-2, TimeUnit::Day)).is_err());
    }

    #[test]
    fn test_unknown_unit_names_valid_units() {
        let err = MaxAge::parse_span(1.0, "fortnight").unwrap_err();
        assert!(err.is_invalid_value());
        assert_eq!(
            err.to_string(),
            "invalid unit passed to maxAge. Unit should be one of: second,minute,hour,day,week,month,year"
        );
    }

    #[test]
    fn test_raw_max_age_from_json() {
        let raw: RawMaxAge = serde_json::from_str("[3, \"week\"]").unwrap();
        assert_eq!(MaxAge::try_from(raw).unwrap(), MaxAge::span(3, TimeUnit::Week));

        let raw: RawMaxAge = serde_json::from_str("500").unwrap();
        assert_eq!(MaxAge::try_from(raw).unwrap(), MaxAge::millis(500));
    }

    #[test]
    fn test_expiration_from_now() {
        let before = current_timestamp_ms();
        let expiration = expiration_from_now(MaxAge::span(1, TimeUnit::Minute)).unwrap();
        let after = current_timestamp_ms();

        assert!(expiration >= before + 60_000);
        assert!(expiration <= after + 60_000);
    }
}
