//! Time-bound parsing for query windows.
//! Accepts durations relative to now ("1h", "30 minutes ago"), absolute
//! timestamps (RFC 3339, `YYYY-MM-DD[ HH:MM[:SS]]` as UTC) and `now`.

use chrono::{DateTime, Duration as ChronoDuration, NaiveDate, NaiveDateTime, NaiveTime, Utc};

use crate::error::{Result, TailError};
use crate::query::EndBound;

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

pub fn current_time_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Parse a start bound into epoch millis. `now` resolves immediately.
pub fn parse_start(input: &str, now: DateTime<Utc>) -> Result<i64> {
    match parse_bound(input, now)? {
        EndBound::Now => Ok(now.timestamp_millis()),
        EndBound::At(ms) => Ok(ms),
    }
}

/// Parse an end bound. `now` stays symbolic so watch cycles can refresh it.
pub fn parse_end(input: &str, now: DateTime<Utc>) -> Result<EndBound> {
    parse_bound(input, now)
}

fn parse_bound(input: &str, now: DateTime<Utc>) -> Result<EndBound> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(invalid(input, "empty time"));
    }
    if trimmed.eq_ignore_ascii_case("now") {
        return Ok(EndBound::Now);
    }
    if let Some(ago) = parse_relative(trimmed)? {
        let at = now
            .checked_sub_signed(ago)
            .ok_or_else(|| invalid(input, "duration out of range"))?;
        return Ok(EndBound::At(at.timestamp_millis()));
    }
    parse_absolute(trimmed)
        .map(|dt| EndBound::At(dt.timestamp_millis()))
        .ok_or_else(|| invalid(input, "expected a duration like 1h or a date like 2024-01-31 12:00"))
}

/// `Ok(None)` means the input does not look like a duration at all.
fn parse_relative(input: &str) -> Result<Option<ChronoDuration>> {
    let lower = input.to_ascii_lowercase();
    let body = lower.strip_suffix("ago").map(str::trim_end).unwrap_or(&lower);

    let digits_end = body
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(body.len());
    if digits_end == 0 {
        return Ok(None);
    }
    let unit = body[digits_end..].trim();
    // Bare numbers and dates such as 2024-01-01 are not durations.
    if unit.is_empty() || unit.starts_with('-') || unit.starts_with(':') {
        return Ok(None);
    }
    let amount: i64 = body[..digits_end]
        .parse()
        .map_err(|_| invalid(input, "duration amount out of range"))?;

    let per_unit = match unit {
        "s" | "sec" | "secs" | "second" | "seconds" => ChronoDuration::seconds(1),
        "m" | "min" | "mins" | "minute" | "minutes" => ChronoDuration::minutes(1),
        "h" | "hr" | "hrs" | "hour" | "hours" => ChronoDuration::hours(1),
        "d" | "day" | "days" => ChronoDuration::days(1),
        "w" | "week" | "weeks" => ChronoDuration::weeks(1),
        other => return Err(invalid(input, &format!("unknown duration unit {other:?}"))),
    };
    let total = i32::try_from(amount)
        .ok()
        .and_then(|n| per_unit.checked_mul(n))
        .ok_or_else(|| invalid(input, "duration out of range"))?;
    Ok(Some(total))
}

fn parse_absolute(input: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(input, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .ok()
        .map(|d| d.and_time(NaiveTime::MIN).and_utc())
}

fn invalid(input: &str, reason: &str) -> TailError {
    TailError::InvalidTime {
        input: input.to_string(),
        reason: reason.to_string(),
    }
}
