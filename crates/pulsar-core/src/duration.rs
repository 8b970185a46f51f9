//! Go-syntax duration strings.
//!
//! Deadline and execution-time annotations carry values like `"500ms"`,
//! `"10s"` or `"1h30m"`. Results are signed (`chrono::TimeDelta`) so callers
//! can detect and reject negative deadlines.

use crate::error::{PulsarError, Result};
use chrono::TimeDelta;

const NANOS_PER_US: f64 = 1_000.0;
const NANOS_PER_MS: f64 = 1_000_000.0;
const NANOS_PER_SEC: f64 = 1_000_000_000.0;

fn unit_nanos(unit: &str) -> Option<f64> {
    match unit {
        "ns" => Some(1.0),
        "us" | "µs" | "μs" => Some(NANOS_PER_US),
        "ms" => Some(NANOS_PER_MS),
        "s" => Some(NANOS_PER_SEC),
        "m" => Some(60.0 * NANOS_PER_SEC),
        "h" => Some(3600.0 * NANOS_PER_SEC),
        _ => None,
    }
}

/// Parse a Go-syntax duration string like `"300ms"`, `"1h30m"` or `"-1.5h"`.
///
/// A duration is an optional sign followed by one or more decimal
/// number/unit pairs. Valid units are `ns`, `us` (`µs`), `ms`, `s`, `m`, `h`.
/// The bare string `"0"` is accepted as zero.
pub fn parse_duration(s: &str) -> Result<TimeDelta> {
    let original = s;
    let mut rest = s;

    let negative = match rest.as_bytes().first() {
        Some(b'-') => {
            rest = &rest[1..];
            true
        }
        Some(b'+') => {
            rest = &rest[1..];
            false
        }
        _ => false,
    };

    if rest == "0" {
        return Ok(TimeDelta::zero());
    }
    if rest.is_empty() {
        return Err(PulsarError::invalid_duration(original));
    }

    let mut total_nanos = 0.0f64;
    while !rest.is_empty() {
        let num_len = rest
            .find(|c: char| !c.is_ascii_digit() && c != '.')
            .unwrap_or(rest.len());
        let (num_str, tail) = rest.split_at(num_len);
        let value: f64 = num_str
            .parse()
            .map_err(|_| PulsarError::invalid_duration(original))?;

        let unit_len = tail
            .char_indices()
            .find(|(_, c)| c.is_ascii_digit() || *c == '.')
            .map(|(i, _)| i)
            .unwrap_or(tail.len());
        let (unit, next) = tail.split_at(unit_len);
        let nanos =
            unit_nanos(unit).ok_or_else(|| PulsarError::invalid_duration(original))?;

        total_nanos += value * nanos;
        rest = next;
    }

    if !total_nanos.is_finite() || total_nanos > i64::MAX as f64 {
        return Err(PulsarError::invalid_duration(original));
    }

    let nanos = total_nanos as i64;
    Ok(TimeDelta::nanoseconds(if negative { -nanos } else { nanos }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_single_unit() {
        assert_eq!(parse_duration("1ms").unwrap(), TimeDelta::milliseconds(1));
        assert_eq!(parse_duration("1s").unwrap(), TimeDelta::seconds(1));
        assert_eq!(parse_duration("10m").unwrap(), TimeDelta::minutes(10));
        assert_eq!(parse_duration("1h").unwrap(), TimeDelta::hours(1));
        assert_eq!(parse_duration("250ns").unwrap(), TimeDelta::nanoseconds(250));
    }

    #[test]
    fn test_parse_compound() {
        assert_eq!(
            parse_duration("1h30m").unwrap(),
            TimeDelta::minutes(90),
        );
        assert_eq!(
            parse_duration("2m30s").unwrap(),
            TimeDelta::seconds(150),
        );
    }

    #[test]
    fn test_parse_fractional() {
        assert_eq!(parse_duration("1.5h").unwrap(), TimeDelta::minutes(90));
        assert_eq!(parse_duration("0.5s").unwrap(), TimeDelta::milliseconds(500));
    }

    #[test]
    fn test_parse_signed() {
        assert_eq!(parse_duration("-10s").unwrap(), TimeDelta::seconds(-10));
        assert_eq!(parse_duration("+10s").unwrap(), TimeDelta::seconds(10));
        assert_eq!(parse_duration("0").unwrap(), TimeDelta::zero());
    }

    #[test]
    fn test_parse_invalid() {
        assert!(parse_duration("").is_err());
        assert!(parse_duration("banana").is_err());
        assert!(parse_duration("10").is_err()); // missing unit
        assert!(parse_duration("10x").is_err()); // unknown unit
        assert!(parse_duration("s10").is_err()); // unit before number
    }
}
