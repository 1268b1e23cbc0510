use chrono::{DateTime, Duration, NaiveDateTime, TimeZone, Utc};

use crate::error::{Error, Result};

const MINUTES: i64 = 60;
const HOURS: i64 = MINUTES * 60;
const DAYS: i64 = HOURS * 24;
const WEEKS: i64 = DAYS * 7;

struct Unit {
    long_name: &'static str,
    short_name: &'static str,
    value: i64,
}
const UNITS: &[Unit] = &[
    Unit { long_name: "second", short_name: "s", value: 1 },
    Unit { long_name: "minute", short_name: "min", value: MINUTES },
    Unit { long_name: "hour", short_name: "h", value: HOURS },
    Unit { long_name: "day", short_name: "d", value: DAYS },
    Unit { long_name: "week", short_name: "w", value: WEEKS },
];

/// Largest delay accepted, about a hundred years.
const MAX_SECONDS: i64 = 100 * 365 * DAYS;

const ABSOLUTE_FORMAT: &str = "%Y-%m-%d %H:%M";

fn unit_list() -> String {
    UNITS.iter().map(|u| u.short_name).collect::<Vec<_>>().join(", ")
}

/// Parse a relative duration such as `30s`, `10min`, `2h` or `1d`.
pub fn parse_duration(input: &str) -> Result<Duration> {
    lazy_static::lazy_static!(
        static ref RE_DURATION: regex::Regex = regex::Regex::new(r"^(\d+)\s*([a-z]+)$").unwrap();
    );
    let input = input.trim().to_lowercase();
    let caps = RE_DURATION.captures(&input).ok_or_else(|| {
        Error::invalid(format!(
            "Invalid duration `{}`: put a number followed by a unit ({})",
            input,
            unit_list()
        ))
    })?;
    let amount = caps[1]
        .parse::<i64>()
        .map_err(|_| Error::invalid(format!("Duration `{}` is too large", input)))?;
    let unit = &caps[2];
    let unit = UNITS
        .iter()
        .find(|u| u.short_name == unit || u.long_name == unit || format!("{}s", u.long_name) == unit)
        .ok_or_else(|| Error::invalid(format!("Unknown unit `{}`, expected one of: {}", unit, unit_list())))?;
    amount
        .checked_mul(unit.value)
        .filter(|seconds| *seconds <= MAX_SECONDS)
        .map(Duration::seconds)
        .ok_or_else(|| Error::invalid(format!("Duration `{}` is too large", input)))
}

/// Parse either a relative duration or an absolute UTC time (`YYYY-MM-DD HH:MM`).
///
/// An absolute time in the past gives a negative delay; the caller decides what to do with it.
pub fn parse_delay(input: &str, now: DateTime<Utc>) -> Result<Duration> {
    match NaiveDateTime::parse_from_str(input.trim(), ABSOLUTE_FORMAT) {
        Ok(at) => {
            let delay = Utc.from_utc_datetime(&at) - now;
            if delay.num_seconds() > MAX_SECONDS {
                return Err(Error::invalid(format!("`{}` is too far in the future", input.trim())));
            }
            Ok(delay)
        }
        Err(_) => parse_duration(input),
    }
}

pub fn format_duration(duration: Duration) -> String {
    let mut left = duration.num_seconds().max(0);
    if left == 0 {
        return "now".to_string();
    }
    let mut result = Vec::new();
    for unit in UNITS.iter().rev() {
        if left >= unit.value {
            let value = left / unit.value;
            left %= unit.value;
            result.push(format!("{} {}{}", value, unit.long_name, if value > 1 { "s" } else { "" }));
        }
    }
    result.join(" ")
}
