use std::fmt;
use std::str::FromStr;

use chrono::{Duration, NaiveTime};

/// Inclusive clock-time interval during which a run may act.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl TimeWindow {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self { start, end }
    }

    pub fn all_day() -> Self {
        Self {
            start: NaiveTime::MIN,
            end: NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN),
        }
    }

    pub fn contains(&self, t: NaiveTime) -> bool {
        self.start <= t && t <= self.end
    }
}

impl FromStr for TimeWindow {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (start, end) = s
            .split_once('-')
            .ok_or_else(|| format!("time window {:?} must look like HH:MM-HH:MM", s))?;
        let start = parse_clock_time(start.trim())?;
        let end = parse_clock_time(end.trim())?;
        if end < start {
            return Err(format!(
                "time window {:?} ends before it starts; split overnight spans into two windows",
                s
            ));
        }
        Ok(TimeWindow { start, end })
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start.format("%H:%M:%S"), self.end.format("%H:%M:%S"))
    }
}

fn parse_clock_time(s: &str) -> Result<NaiveTime, String> {
    NaiveTime::parse_from_str(s, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
        .map_err(|_| format!("invalid time {:?}; expected HH:MM or HH:MM:SS", s))
}

/// Parses periods such as `7d`, `12h`, `1d12h` or `90m`.
pub fn parse_period(value: &str) -> Result<Duration, String> {
    let value = value.trim();
    if value.is_empty() {
        return Err("period is empty".to_string());
    }
    let mut total = Duration::zero();
    let mut digits = String::new();
    for c in value.chars() {
        if c.is_ascii_digit() {
            digits.push(c);
            continue;
        }
        if digits.is_empty() {
            return Err(format!("invalid period {:?}: unit {:?} without a number", value, c));
        }
        let n: i64 = digits
            .parse()
            .map_err(|_| format!("invalid period {:?}: number too large", value))?;
        digits.clear();
        let part = match c {
            'w' => Duration::try_weeks(n),
            'd' => Duration::try_days(n),
            'h' => Duration::try_hours(n),
            'm' => Duration::try_minutes(n),
            's' => Duration::try_seconds(n),
            _ => {
                return Err(format!(
                    "invalid period {:?}: unknown unit {:?}; expected w, d, h, m or s",
                    value, c
                ))
            }
        };
        let part = part.ok_or_else(|| format!("invalid period {:?}: out of range", value))?;
        total = total
            .checked_add(&part)
            .ok_or_else(|| format!("invalid period {:?}: out of range", value))?;
    }
    if !digits.is_empty() {
        return Err(format!("invalid period {:?}: missing unit after {}", value, digits));
    }
    if total <= Duration::zero() {
        return Err(format!("period {:?} must be greater than zero", value));
    }
    Ok(total)
}

/// Inverse of [`parse_period`], largest units first: `1d12h`, `90s`.
pub fn format_period(period: Duration) -> String {
    let mut secs = period.num_seconds();
    if secs <= 0 {
        return "0s".to_string();
    }
    let mut out = String::new();
    for (unit, size) in [('w', 604_800), ('d', 86_400), ('h', 3_600), ('m', 60), ('s', 1)] {
        if secs >= size {
            out.push_str(&format!("{}{}", secs / size, unit));
            secs %= size;
        }
    }
    out
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RunMode {
    pub dry_run: bool,
    pub safe_mode: bool,
    pub verbose: bool,
}
