use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("'{0}': invalid duration format. Example: 1d-4h.")]
pub struct DurationError(pub String);

/// Parse a compact duration such as `1d-4h`, `2h30m` or `45s`.
///
/// Units must appear in the order d, h, m, s, each at most once. Dashes and
/// spaces are ignored. An unparseable or zero duration is an error.
pub fn parse(input: &str) -> Result<Duration, DurationError> {
    let compact: String = input.chars().filter(|c| *c != '-' && *c != ' ').collect();
    let invalid = || DurationError(input.to_string());

    let mut total = Duration::zero();
    let mut next_unit = 0usize;
    let mut digits = String::new();

    for c in compact.chars() {
        if c.is_ascii_digit() {
            digits.push(c);
            continue;
        }
        let rank = match c {
            'd' => 0,
            'h' => 1,
            'm' => 2,
            's' => 3,
            _ => return Err(invalid()),
        };
        if digits.is_empty() || rank < next_unit {
            return Err(invalid());
        }
        let amount: i64 = digits.parse().map_err(|_| invalid())?;
        let part = match rank {
            0 => Duration::try_days(amount),
            1 => Duration::try_hours(amount),
            2 => Duration::try_minutes(amount),
            _ => Duration::try_seconds(amount),
        }
        .ok_or_else(invalid)?;
        total = total.checked_add(&part).ok_or_else(invalid)?;
        next_unit = rank + 1;
        digits.clear();
    }

    if !digits.is_empty() || total.is_zero() {
        return Err(invalid());
    }
    Ok(total)
}

/// `now + duration`, the absolute date a relative expiration resolves to.
pub fn from_now(input: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>, DurationError> {
    let duration = parse(input)?;
    now.checked_add_signed(duration)
        .ok_or_else(|| DurationError(input.to_string()))
}
