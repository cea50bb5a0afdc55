//! Fixed settings and `START_DELAY` parsing
//!
//! Nothing here is configurable beyond the start delay; the poll parameters
//! are constants shared by the prober binary and its tests.

use std::time::Duration;
use thiserror::Error;

/// Port the gated app listens on
pub const APP_PORT: u16 = 8080;

/// Port the prober listens on
pub const PROBE_PORT: u16 = 8081;

/// Environment variable holding the app's startup delay
pub const START_DELAY_ENV: &str = "START_DELAY";

/// Delay used when `START_DELAY` is unset, empty, zero or unparsable
pub const DEFAULT_START_DELAY: Duration = Duration::from_millis(500);

/// Where the prober sends its polls
pub const PROBE_TARGET_URL: &str = "http://127.0.0.1:8080";

/// Pause between two poll attempts
pub const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Overall budget for one probe request
pub const POLL_DEADLINE: Duration = Duration::from_secs(5);

/// Budget for a single poll attempt
pub const ATTEMPT_TIMEOUT: Duration = Duration::from_secs(1);

/// How long a server gets to drain in-flight requests after shutdown
pub const SHUTDOWN_GRACE_PERIOD: Duration = Duration::from_secs(5);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DurationParseError {
    #[error("empty duration")]
    Empty,

    #[error("invalid duration {0:?}")]
    Invalid(String),

    #[error("missing unit in duration {0:?}")]
    MissingUnit(String),

    #[error("unknown unit {unit:?} in duration {input:?}")]
    UnknownUnit { unit: String, input: String },

    #[error("negative duration {0:?}")]
    Negative(String),

    #[error("duration {0:?} out of range")]
    Overflow(String),
}

/// Parse a Go-style duration string such as `"2s"`, `"1m30s"` or `"1.5h"`
///
/// Accepts an optional leading sign, then one or more `<number><unit>` pairs
/// where the number may carry a fraction. A bare `"0"` is zero. Totals past
/// `i64::MAX` nanoseconds are out of range. Negative values come back as
/// [`DurationParseError::Negative`] since a `Duration` cannot hold them.
pub fn parse_duration(input: &str) -> Result<Duration, DurationParseError> {
    let mut rest = input;
    let mut negative = false;

    if let Some(stripped) = rest.strip_prefix('-') {
        negative = true;
        rest = stripped;
    } else if let Some(stripped) = rest.strip_prefix('+') {
        rest = stripped;
    }

    if rest == "0" {
        return Ok(Duration::ZERO);
    }
    if rest.is_empty() {
        return Err(if input.is_empty() {
            DurationParseError::Empty
        } else {
            DurationParseError::Invalid(input.to_string())
        });
    }

    let mut total: u128 = 0;
    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        let (number, tail) = rest.split_at(number_len);
        if number.is_empty() || number == "." || number.matches('.').count() > 1 {
            return Err(DurationParseError::Invalid(input.to_string()));
        }

        let unit_len = tail
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(tail.len());
        let (unit, tail) = tail.split_at(unit_len);
        if unit.is_empty() {
            return Err(DurationParseError::MissingUnit(input.to_string()));
        }
        let unit_nanos = unit_nanos(unit).ok_or_else(|| DurationParseError::UnknownUnit {
            unit: unit.to_string(),
            input: input.to_string(),
        })?;

        total = total
            .checked_add(scaled_nanos(number, unit_nanos, input)?)
            .ok_or_else(|| DurationParseError::Overflow(input.to_string()))?;
        rest = tail;
    }

    // Same range as a signed 64-bit nanosecond count
    if total > i64::MAX as u128 {
        return Err(DurationParseError::Overflow(input.to_string()));
    }
    if negative && total > 0 {
        return Err(DurationParseError::Negative(input.to_string()));
    }

    let nanos =
        u64::try_from(total).map_err(|_| DurationParseError::Overflow(input.to_string()))?;
    Ok(Duration::from_nanos(nanos))
}

fn unit_nanos(unit: &str) -> Option<u128> {
    match unit {
        "ns" => Some(1),
        "us" | "µs" | "μs" => Some(1_000),
        "ms" => Some(1_000_000),
        "s" => Some(1_000_000_000),
        "m" => Some(60 * 1_000_000_000),
        "h" => Some(60 * 60 * 1_000_000_000),
        _ => None,
    }
}

/// Multiply a decimal literal by a unit, truncating below one nanosecond
fn scaled_nanos(number: &str, unit: u128, input: &str) -> Result<u128, DurationParseError> {
    let overflow = || DurationParseError::Overflow(input.to_string());
    let (whole, fraction) = number.split_once('.').unwrap_or((number, ""));

    let whole: u128 = if whole.is_empty() {
        0
    } else {
        whole.parse().map_err(|_| overflow())?
    };
    let mut nanos = whole.checked_mul(unit).ok_or_else(overflow)?;

    let mut scale = unit;
    for digit in fraction.chars() {
        scale /= 10;
        if scale == 0 {
            break;
        }
        let digit = u128::from(digit.to_digit(10).unwrap_or(0));
        nanos = nanos.checked_add(digit * scale).ok_or_else(overflow)?;
    }

    Ok(nanos)
}

/// Resolve the startup delay from a raw `START_DELAY` value
///
/// Unset, empty, zero and unparsable values all fall back to
/// [`DEFAULT_START_DELAY`]; the parse error is dropped on purpose. A negative
/// delay has already elapsed, so the gate opens right away.
pub fn start_delay(raw: Option<&str>) -> Duration {
    match raw.map(parse_duration) {
        Some(Ok(delay)) if !delay.is_zero() => delay,
        Some(Err(DurationParseError::Negative(_))) => Duration::ZERO,
        _ => DEFAULT_START_DELAY,
    }
}

/// Read the startup delay from the `START_DELAY` environment variable
pub fn start_delay_from_env() -> Duration {
    start_delay(std::env::var(START_DELAY_ENV).ok().as_deref())
}
