//! Duration parsing for configuration values.
//!
//! Accepts either a bare integer (seconds) or a Go-style duration string —
//! a sequence of `<number><unit>` pairs with units `ns`, `us`/`µs`, `ms`,
//! `s`, `m`, `h`, plus `d` for days (not a Go duration unit, but every
//! config default in this service uses it, e.g. `REVOCATION_CACHE_TTL`).

use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid duration string: {0:?}")]
pub struct DurationParseError(pub String);

pub fn parse_duration(input: &str) -> Result<Duration, DurationParseError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(DurationParseError(input.to_string()));
    }

    if let Ok(seconds) = trimmed.parse::<u64>() {
        return Ok(Duration::from_secs(seconds));
    }

    let mut total = Duration::ZERO;
    let mut rest = trimmed;
    let mut matched_any = false;

    while !rest.is_empty() {
        let digits_end = rest
            .find(|c: char| !c.is_ascii_digit() && c != '.')
            .ok_or_else(|| DurationParseError(input.to_string()))?;
        if digits_end == 0 {
            return Err(DurationParseError(input.to_string()));
        }
        let (number_part, after_number) = rest.split_at(digits_end);
        let number: f64 = number_part
            .parse()
            .map_err(|_| DurationParseError(input.to_string()))?;

        let (unit, remainder) = split_unit(after_number).ok_or_else(|| DurationParseError(input.to_string()))?;
        let unit_nanos: f64 = match unit {
            "ns" => 1.0,
            "us" | "\u{b5}s" => 1_000.0,
            "ms" => 1_000_000.0,
            "s" => 1_000_000_000.0,
            "m" => 60_000_000_000.0,
            "h" => 3_600_000_000_000.0,
            "d" => 86_400_000_000_000.0,
            _ => return Err(DurationParseError(input.to_string())),
        };

        total += Duration::from_nanos((number * unit_nanos) as u64);
        matched_any = true;
        rest = remainder;
    }

    if matched_any {
        Ok(total)
    } else {
        Err(DurationParseError(input.to_string()))
    }
}

/// Splits the longest recognized unit prefix off `input`, longest units
/// first so `"ms"` isn't misread as `"m"` followed by a stray `"s"`.
fn split_unit(input: &str) -> Option<(&str, &str)> {
    const UNITS: &[&str] = &["ns", "us", "\u{b5}s", "ms", "s", "m", "h", "d"];
    for unit in UNITS {
        if let Some(remainder) = input.strip_prefix(unit) {
            return Some((unit, remainder));
        }
    }
    None
}
