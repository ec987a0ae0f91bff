//! Expiry date handling and year fractions.
//!
//! Listed options are treated as expiring at 21:00 UTC on the expiry date,
//! roughly the 4:00 PM New York close (daylight saving drift ignored).
//! Year fractions use ACT/365.

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};

/// Expiry hour in UTC
pub const MARKET_CLOSE_UTC_HOUR: u32 = 21;
pub const SECONDS_PER_DAY: f64 = 86_400.0;
pub const DAYS_PER_YEAR: f64 = 365.0;
pub const SECONDS_PER_YEAR: f64 = SECONDS_PER_DAY * DAYS_PER_YEAR;
/// Year fractions are floored at one minute
const MIN_EXPIRY_SECONDS: f64 = 60.0;

/// Parse a strict `YYYY-MM-DD` expiry date
pub fn parse_expiry(value: &str) -> Result<NaiveDate> {
    let trimmed = value.trim();
    let bytes = trimmed.as_bytes();
    let shape_ok = bytes.len() == 10
        && bytes.iter().enumerate().all(|(i, b)| match i {
            4 | 7 => *b == b'-',
            _ => b.is_ascii_digit(),
        });
    if !shape_ok {
        return Err(anyhow!("expiry must be in YYYY-MM-DD format: {}", value));
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .with_context(|| format!("expiry is not a valid calendar date: {}", value))
}

/// Instant at which an expiry date stops trading
pub fn expiry_timestamp(expiry: NaiveDate) -> Option<DateTime<Utc>> {
    expiry
        .and_hms_opt(MARKET_CLOSE_UTC_HOUR, 0, 0)
        .map(|naive| Utc.from_utc_datetime(&naive))
}

fn seconds_until(expiry: NaiveDate, now: DateTime<Utc>) -> Option<f64> {
    let close = expiry_timestamp(expiry)?;
    let millis = (close - now).num_milliseconds() as f64;
    Some(millis / 1000.0)
}

/// Calendar days to expiry, rounded and floored at zero
pub fn days_to_expiry(expiry: NaiveDate, now: DateTime<Utc>) -> Option<i64> {
    let seconds = seconds_until(expiry, now)?;
    Some((seconds / SECONDS_PER_DAY).round().max(0.0) as i64)
}

/// Time to expiry in years.
///
/// `None` once the contract is more than a minute past its expiry instant;
/// otherwise the remaining time floored at one minute.
pub fn time_to_expiry_years(expiry: NaiveDate, now: DateTime<Utc>) -> Option<f64> {
    let seconds = seconds_until(expiry, now)?;
    if seconds < -MIN_EXPIRY_SECONDS {
        return None;
    }
    Some(seconds.max(MIN_EXPIRY_SECONDS) / SECONDS_PER_YEAR)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_expiry() {
        assert_eq!(parse_expiry("2025-01-17").unwrap(), date(2025, 1, 17));
        assert_eq!(parse_expiry(" 2024-02-29 ").unwrap(), date(2024, 2, 29));
        assert!(parse_expiry("2025-1-17").is_err());
        assert!(parse_expiry("2023-02-29").is_err());
        assert!(parse_expiry("17/01/2025").is_err());
        assert!(parse_expiry("").is_err());
    }

    #[test]
    fn test_days_and_years() {
        let expiry = date(2025, 1, 31);
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 21, 0, 0).unwrap();
        assert_eq!(days_to_expiry(expiry, now), Some(30));

        let t = time_to_expiry_years(expiry, now).unwrap();
        assert!((t - 30.0 / 365.0).abs() < 1e-12);
    }

    #[test]
    fn test_expired_contracts() {
        let expiry = date(2025, 1, 17);
        let just_after_close = Utc.with_ymd_and_hms(2025, 1, 17, 21, 0, 30).unwrap();
        let floored = time_to_expiry_years(expiry, just_after_close).unwrap();
        assert!((floored - 60.0 / SECONDS_PER_YEAR).abs() < 1e-15);

        let next_day = Utc.with_ymd_and_hms(2025, 1, 18, 12, 0, 0).unwrap();
        assert!(time_to_expiry_years(expiry, next_day).is_none());
        assert_eq!(days_to_expiry(expiry, next_day), Some(0));
    }
}
