//! Shared helpers: the clock seam, date conversions and phone normalization

use chrono::{DateTime, Local, NaiveDate, TimeZone, Utc};
use regex::Regex;

use crate::error::{FinanceError, Result};

/// Milliseconds in one day
pub const DAY_MILLIS: i64 = 24 * 60 * 60 * 1000;

/// Source of the current time in epoch milliseconds
#[cfg_attr(test, mockall::automock)]
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> i64;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

/// A clock stuck at one instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub i64);

impl Clock for FixedClock {
    fn now_millis(&self) -> i64 {
        self.0
    }
}

/// Convert epoch milliseconds into a UTC timestamp
#[must_use]
pub fn millis_to_datetime(millis: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(millis).single()
}

/// Render epoch milliseconds as a local `YYYY-MM-DD HH:MM` string
#[must_use]
pub fn format_date(millis: i64) -> String {
    millis_to_datetime(millis)
        .map(|dt| dt.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| millis.to_string())
}

/// Parse `YYYY-MM-DD` (local midnight) or raw epoch milliseconds
pub fn parse_date(input: &str) -> Result<i64> {
    let input = input.trim();
    if let Ok(millis) = input.parse::<i64>() {
        return Ok(millis);
    }

    let date = NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .map_err(|e| FinanceError::InvalidInput(format!("Invalid date '{input}': {e}")))?;
    let midnight = date.and_hms_opt(0, 0, 0).ok_or_else(|| FinanceError::InvalidInput(input.to_string()))?;

    Local
        .from_local_datetime(&midnight)
        .earliest()
        .map(|dt| dt.timestamp_millis())
        .ok_or_else(|| FinanceError::InvalidInput(format!("Date '{input}' does not exist locally")))
}

/// Strips phone numbers down to their canonical digits
#[derive(Debug, Clone)]
pub struct PhoneNormalizer {
    formatting: Regex,
}

impl PhoneNormalizer {
    pub fn new() -> Result<Self> {
        let formatting = Regex::new(r"[\s\-\(\)\+\.]")
            .map_err(|e| FinanceError::Other(format!("Failed to compile phone regex: {e}")))?;
        Ok(Self { formatting })
    }

    /// Canonical form of a phone number: formatting characters and the `237`
    /// country code removed.
    #[must_use]
    pub fn normalize(&self, phone: &str) -> String {
        let digits = self.formatting.replace_all(phone, "");
        digits.strip_prefix("237").unwrap_or(&digits).to_string()
    }
}

/// Amount with two decimals followed by the currency code
#[must_use]
pub fn format_amount(amount: f64, currency: &str) -> String {
    format!("{amount:.2} {currency}")
}
