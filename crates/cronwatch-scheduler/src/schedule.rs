use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use cronwatch_core::{CronwatchError, Location, Result};

/// A parsed schedule expression.
#[derive(Debug, Clone)]
pub enum Schedule {
    /// `@every <duration>`: fixed interval, whole seconds, at least one.
    Every(Duration),
    /// Cron expression (descriptors are expanded to this form) evaluated in `location`.
    Cron {
        expr: Box<cron::Schedule>,
        location: Location,
    },
}

impl Schedule {
    /// Parse `spec` using `location` unless the spec carries a `TZ=`/`CRON_TZ=` prefix.
    ///
    /// Accepted forms:
    ///
    /// | Form                   | Example                 |
    /// |------------------------|-------------------------|
    /// | interval               | `@every 1h30m`          |
    /// | descriptor             | `@daily`, `@hourly`     |
    /// | 5-field cron (minutes) | `*/5 * * * *`           |
    /// | 6-field cron (seconds) | `0 0 4 * * *`           |
    /// | any of the above, zoned| `TZ=Asia/Jakarta @daily`|
    pub fn parse(spec: &str, location: Location) -> Result<Self> {
        let trimmed = spec.trim();
        if trimmed.is_empty() {
            return Err(CronwatchError::invalid_schedule(spec, "empty spec"));
        }

        let (location, rest) = split_timezone(spec, trimmed, location)?;

        if let Some(interval) = rest.strip_prefix("@every") {
            let every = parse_interval(interval.trim())
                .map_err(|reason| CronwatchError::invalid_schedule(spec, reason))?;
            return Ok(Schedule::Every(round_interval(every)));
        }

        let expr = if rest.starts_with('@') {
            descriptor(rest)
                .ok_or_else(|| CronwatchError::invalid_schedule(spec, "unrecognized descriptor"))?
                .to_string()
        } else {
            let fields: Vec<&str> = rest.split_whitespace().collect();
            let mut fields: Vec<String> = match fields.len() {
                5 => std::iter::once("0").chain(fields).map(String::from).collect(),
                6 => fields.into_iter().map(String::from).collect(),
                n => {
                    return Err(CronwatchError::invalid_schedule(
                        spec,
                        format!("expected 5 or 6 fields, found {n}"),
                    ))
                }
            };
            fields[5] = unix_days_of_week(&fields[5])
                .map_err(|reason| CronwatchError::invalid_schedule(spec, reason))?;
            fields.join(" ")
        };

        let expr = cron::Schedule::from_str(&expr)
            .map_err(|e| CronwatchError::invalid_schedule(spec, e))?;
        Ok(Schedule::Cron {
            expr: Box::new(expr),
            location,
        })
    }

    /// Next firing strictly after `from`, or `None` when the expression has no
    /// future occurrence.
    pub fn next_after(&self, from: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Schedule::Every(every) => chrono::Duration::from_std(*every).ok().map(|d| from + d),
            Schedule::Cron { expr, location } => match location {
                Location::Local => next_in(expr, &chrono::Local, from),
                Location::Zone(tz) => next_in(expr, tz, from),
            },
        }
    }
}

fn next_in<Z: TimeZone>(expr: &cron::Schedule, tz: &Z, from: DateTime<Utc>) -> Option<DateTime<Utc>> {
    expr.after(&from.with_timezone(tz))
        .next()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Strip an optional `TZ=<zone>` / `CRON_TZ=<zone>` prefix.
fn split_timezone<'a>(
    spec: &str,
    trimmed: &'a str,
    fallback: Location,
) -> Result<(Location, &'a str)> {
    let Some(zoned) = trimmed
        .strip_prefix("TZ=")
        .or_else(|| trimmed.strip_prefix("CRON_TZ="))
    else {
        return Ok((fallback, trimmed));
    };

    let (zone, rest) = zoned
        .split_once(char::is_whitespace)
        .ok_or_else(|| CronwatchError::invalid_schedule(spec, "missing expression after timezone"))?;
    let location = Location::parse(zone).map_err(|e| CronwatchError::invalid_schedule(spec, e))?;
    Ok((location, rest.trim()))
}

fn descriptor(name: &str) -> Option<&'static str> {
    match name {
        "@yearly" | "@annually" => Some("0 0 0 1 1 *"),
        "@monthly" => Some("0 0 0 1 * *"),
        "@weekly" => Some("0 0 0 * * Sun"),
        "@daily" | "@midnight" => Some("0 0 0 * * *"),
        "@hourly" => Some("0 0 * * * *"),
        _ => None,
    }
}

/// Rewrite a day-of-week field from Unix numbering (0 and 7 are Sunday) to
/// the `cron` crate's (1 is Sunday). Named days pass through untouched.
fn unix_days_of_week(field: &str) -> std::result::Result<String, String> {
    let items = field
        .split(',')
        .map(unix_day_item)
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(items.join(","))
}

fn unix_day_item(item: &str) -> std::result::Result<String, String> {
    if item == "*" || item == "?" || item.chars().any(|c| c.is_ascii_alphabetic()) {
        return Ok(item.to_string());
    }

    let (range, step) = match item.split_once('/') {
        Some((range, step)) => {
            let step: usize = step
                .parse()
                .map_err(|_| format!("invalid day-of-week step in {item:?}"))?;
            if step == 0 {
                return Err(format!("zero day-of-week step in {item:?}"));
            }
            (range, Some(step))
        }
        None => (item, None),
    };

    let (start, end) = match range.split_once('-') {
        _ if range == "*" => (0, 6),
        Some((a, b)) => (unix_day(a, item)?, unix_day(b, item)?),
        // `N/step` runs from N to the end of the week.
        None if step.is_some() => (unix_day(range, item)?, 6),
        None => {
            let day = unix_day(range, item)?;
            (day, day)
        }
    };
    if start > end {
        return Err(format!("day-of-week range {item:?} runs backwards"));
    }

    let mut days: Vec<u8> = (start..=end)
        .step_by(step.unwrap_or(1))
        .map(|d| d % 7 + 1)
        .collect();
    days.sort_unstable();
    days.dedup();
    Ok(days.iter().map(u8::to_string).collect::<Vec<_>>().join(","))
}

fn unix_day(s: &str, item: &str) -> std::result::Result<u8, String> {
    match s.parse::<u8>() {
        Ok(day) if day <= 7 => Ok(day),
        _ => Err(format!("invalid day of week {s:?} in {item:?}")),
    }
}

/// Intervals fire on whole seconds; anything shorter than a second becomes one.
fn round_interval(every: Duration) -> Duration {
    Duration::from_secs(every.as_secs().max(1))
}

/// Parse a duration such as `300ms`, `1.5h` or `2h45m10s`.
pub fn parse_interval(input: &str) -> std::result::Result<Duration, String> {
    if input.is_empty() {
        return Err("missing duration".to_string());
    }
    if input == "0" {
        return Ok(Duration::ZERO);
    }

    let mut total_nanos = 0f64;
    let mut rest = input;
    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .ok_or_else(|| format!("missing unit in duration {input:?}"))?;
        if number_len == 0 {
            return Err(format!("invalid duration {input:?}"));
        }
        let value: f64 = rest[..number_len]
            .parse()
            .map_err(|_| format!("invalid number in duration {input:?}"))?;
        rest = &rest[number_len..];

        let unit_len = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let nanos_per_unit = match &rest[..unit_len] {
            "ns" => 1.0,
            "us" | "µs" => 1e3,
            "ms" => 1e6,
            "s" => 1e9,
            "m" => 60e9,
            "h" => 3600e9,
            unit => return Err(format!("unknown unit {unit:?} in duration {input:?}")),
        };
        total_nanos += value * nanos_per_unit;
        rest = &rest[unit_len..];
    }

    Ok(Duration::from_nanos(total_nanos as u64))
}

/// Render a whole-second duration as `1h30m`, `5m` or `20s`.
pub fn format_interval(every: Duration) -> String {
    let secs = every.as_secs();
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    let mut out = String::new();
    if h > 0 {
        out.push_str(&format!("{h}h"));
    }
    if m > 0 {
        out.push_str(&format!("{m}m"));
    }
    if s > 0 || out.is_empty() {
        out.push_str(&format!("{s}s"));
    }
    out
}
