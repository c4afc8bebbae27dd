//! Human-readable duration grammar
//!
//! Parses and formats durations in the compact compound form used for
//! configuration values and defaults: `"10s"`, `"5m"`, `"1m30s"`, `"1.5s"`,
//! `"100ms"`. Formatting picks the largest fitting unit so parsed values
//! round-trip through their string form.

use std::time::Duration;

const NANOS_PER_US: u128 = 1_000;
const NANOS_PER_MS: u128 = 1_000_000;
const NANOS_PER_SEC: u128 = 1_000_000_000;
const NANOS_PER_MIN: u128 = 60 * NANOS_PER_SEC;
const NANOS_PER_HOUR: u128 = 3_600 * NANOS_PER_SEC;

/// Errors produced while parsing a duration string
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DurationError {
    /// Input is empty or a segment has no digits
    #[error("invalid duration: {0:?}")]
    Invalid(String),

    /// A number segment has no trailing unit
    #[error("missing unit in duration: {0:?}")]
    MissingUnit(String),

    /// A unit other than ns, us, µs, ms, s, m or h was given
    #[error("unknown unit {unit:?} in duration {input:?}")]
    UnknownUnit { unit: String, input: String },

    /// Durations are unsigned; a leading minus is rejected
    #[error("negative duration not supported: {0:?}")]
    Negative(String),

    /// The summed value does not fit the representable range
    #[error("duration out of range: {0:?}")]
    OutOfRange(String),
}

/// Parse a duration string such as `"300ms"`, `"1.5h"` or `"2h45m"`.
///
/// A duration is a sequence of decimal numbers, each with an optional
/// fraction and a mandatory unit suffix. Valid units are "ns", "us" (or
/// "µs"), "ms", "s", "m" and "h". The bare string `"0"` is accepted as zero.
pub fn parse_duration(s: &str) -> Result<Duration, DurationError> {
    let mut rest = s;
    if let Some(r) = rest.strip_prefix('+') {
        rest = r;
    } else if rest.starts_with('-') {
        return Err(DurationError::Negative(s.to_owned()));
    }
    if rest == "0" {
        return Ok(Duration::ZERO);
    }
    if rest.is_empty() {
        return Err(DurationError::Invalid(s.to_owned()));
    }

    let mut total: u128 = 0;
    while !rest.is_empty() {
        let (int_part, after_int) = split_leading_digits(rest);
        let (frac_part, after_num) = match after_int.strip_prefix('.') {
            Some(r) => {
                let (f, rem) = split_leading_digits(r);
                (f, rem)
            }
            None => ("", after_int),
        };
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(DurationError::Invalid(s.to_owned()));
        }

        // the unit runs until the next digit or decimal point
        let unit_end = after_num
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(after_num.len());
        let (unit, next) = after_num.split_at(unit_end);
        if unit.is_empty() {
            return Err(DurationError::MissingUnit(s.to_owned()));
        }
        let unit_nanos = match unit {
            "ns" => 1,
            "us" | "µs" | "μs" => NANOS_PER_US,
            "ms" => NANOS_PER_MS,
            "s" => NANOS_PER_SEC,
            "m" => NANOS_PER_MIN,
            "h" => NANOS_PER_HOUR,
            _ => {
                return Err(DurationError::UnknownUnit {
                    unit: unit.to_owned(),
                    input: s.to_owned(),
                })
            }
        };

        let whole: u128 = if int_part.is_empty() {
            0
        } else {
            int_part
                .parse()
                .map_err(|_| DurationError::OutOfRange(s.to_owned()))?
        };
        total = whole
            .checked_mul(unit_nanos)
            .and_then(|v| total.checked_add(v))
            .ok_or_else(|| DurationError::OutOfRange(s.to_owned()))?;

        if !frac_part.is_empty() {
            // accumulate the fraction digits as an integer and divide once,
            // so fractions that land on a whole nanosecond stay exact
            let mut digits: u128 = 0;
            let mut scale = 1f64;
            for c in frac_part.bytes() {
                if digits >= u128::MAX / 10 {
                    break;
                }
                digits = digits * 10 + u128::from(c - b'0');
                scale *= 10.0;
            }
            let frac_nanos = (digits as f64 * (unit_nanos as f64 / scale)) as u128;
            total = total
                .checked_add(frac_nanos)
                .ok_or_else(|| DurationError::OutOfRange(s.to_owned()))?;
        }

        rest = next;
    }

    if total > u128::from(u64::MAX) {
        return Err(DurationError::OutOfRange(s.to_owned()));
    }
    Ok(Duration::from_nanos(total as u64))
}

/// Format a duration in the same compound form `parse_duration` accepts.
///
/// Sub-second values render in the largest fitting unit (`"100ms"`,
/// `"250µs"`, `"50ns"`); larger values render as `"10s"`, `"1m30s"`,
/// `"1h0m0s"` and so on. Zero renders as `"0s"`.
pub fn format_duration(d: Duration) -> String {
    let total = d.as_nanos();
    if total == 0 {
        return "0s".to_owned();
    }
    if total < NANOS_PER_SEC {
        return if total < NANOS_PER_US {
            format!("{}ns", total)
        } else if total < NANOS_PER_MS {
            format!("{}µs", with_frac(total, NANOS_PER_US, 3))
        } else {
            format!("{}ms", with_frac(total, NANOS_PER_MS, 6))
        };
    }

    let secs = total / NANOS_PER_SEC;
    let sec_field = with_frac(
        (secs % 60) * NANOS_PER_SEC + total % NANOS_PER_SEC,
        NANOS_PER_SEC,
        9,
    );
    let mins = secs / 60;
    if mins == 0 {
        return format!("{}s", sec_field);
    }
    let hours = mins / 60;
    if hours == 0 {
        format!("{}m{}s", mins, sec_field)
    } else {
        format!("{}h{}m{}s", hours, mins % 60, sec_field)
    }
}

fn split_leading_digits(s: &str) -> (&str, &str) {
    let end = s
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(s.len());
    s.split_at(end)
}

/// Render `value / unit` with its fractional digits, trailing zeros trimmed.
fn with_frac(value: u128, unit: u128, width: usize) -> String {
    let whole = value / unit;
    let frac = value % unit;
    if frac == 0 {
        return whole.to_string();
    }
    let digits = format!("{:0width$}", frac, width = width);
    format!("{}.{}", whole, digits.trim_end_matches('0'))
}
