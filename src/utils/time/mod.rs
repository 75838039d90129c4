// Time utilities
// Clock-time parsing, ordering checks and countdown formatting

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::TimeFormatError;

static CLOCK_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([01]\d|2[0-3]):([0-5]\d)(:[0-5]\d)?$").expect("clock pattern is valid")
});

/// A wall-clock time or a duration written as `HH:MM` or `HH:MM:SS`.
///
/// Equality and ordering use the number of seconds since midnight, so
/// `10:00` and `10:00:00` compare equal while still displaying the way they
/// were written.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ClockTime {
    pub hours: u8,
    pub minutes: u8,
    pub seconds: Option<u8>,
}

impl ClockTime {
    pub fn hm(hours: u8, minutes: u8) -> Self {
        Self {
            hours,
            minutes,
            seconds: None,
        }
    }

    pub fn hms(hours: u8, minutes: u8, seconds: u8) -> Self {
        Self {
            hours,
            minutes,
            seconds: Some(seconds),
        }
    }

    pub fn total_seconds(&self) -> u32 {
        u32::from(self.hours) * 3600
            + u32::from(self.minutes) * 60
            + u32::from(self.seconds.unwrap_or(0))
    }

    pub fn has_seconds(&self) -> bool {
        self.seconds.is_some()
    }

    pub fn to_naive_time(&self) -> NaiveTime {
        NaiveTime::from_num_seconds_from_midnight_opt(self.total_seconds(), 0)
            .unwrap_or(NaiveTime::MIN)
    }

    /// Places this clock time on the given calendar day.
    pub fn on(&self, date: NaiveDate) -> NaiveDateTime {
        date.and_time(self.to_naive_time())
    }
}

impl PartialEq for ClockTime {
    fn eq(&self, other: &Self) -> bool {
        self.total_seconds() == other.total_seconds()
    }
}

impl Eq for ClockTime {}

impl Hash for ClockTime {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.total_seconds().hash(state);
    }
}

impl PartialOrd for ClockTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ClockTime {
    fn cmp(&self, other: &Self) -> Ordering {
        self.total_seconds().cmp(&other.total_seconds())
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.seconds {
            Some(seconds) => write!(f, "{:02}:{:02}:{:02}", self.hours, self.minutes, seconds),
            None => write!(f, "{:02}:{:02}", self.hours, self.minutes),
        }
    }
}

impl FromStr for ClockTime {
    type Err = TimeFormatError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        parse_clock(text)
    }
}

impl TryFrom<String> for ClockTime {
    type Error = TimeFormatError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        parse_clock(&value)
    }
}

impl From<ClockTime> for String {
    fn from(value: ClockTime) -> Self {
        value.to_string()
    }
}

/// Parses `HH:MM` or `HH:MM:SS` (24-hour clock).
pub fn parse_clock(text: &str) -> Result<ClockTime, TimeFormatError> {
    let captures = CLOCK_PATTERN
        .captures(text)
        .ok_or_else(|| TimeFormatError::new(text))?;

    let number = |index: usize| -> Result<u8, TimeFormatError> {
        captures
            .get(index)
            .map(|m| m.as_str().trim_start_matches(':'))
            .ok_or_else(|| TimeFormatError::new(text))?
            .parse::<u8>()
            .map_err(|_| TimeFormatError::new(text))
    };

    let hours = number(1)?;
    let minutes = number(2)?;
    let seconds = match captures.get(3) {
        Some(_) => Some(number(3)?),
        None => None,
    };

    Ok(ClockTime {
        hours,
        minutes,
        seconds,
    })
}

/// Reads a wall-clock time from `HH:MM[:SS]` or an ISO-8601 date-time.
///
/// A date-time contributes its time of day as written; the offset is not
/// applied.
pub fn parse_wall_clock(text: &str) -> Result<ClockTime, TimeFormatError> {
    let text = text.trim();
    if let Ok(clock) = parse_clock(text) {
        return Ok(clock);
    }

    let at = parse_date_time(text).ok_or_else(|| TimeFormatError::new(text))?;
    Ok(ClockTime::hms(
        at.hour() as u8,
        at.minute() as u8,
        at.second() as u8,
    ))
}

/// Reads a calendar day from `YYYY-MM-DD` or an ISO-8601 date-time.
pub fn parse_wall_date(text: &str) -> Result<NaiveDate, TimeFormatError> {
    let text = text.trim();
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Ok(date);
    }

    parse_date_time(text)
        .map(|at| at.date())
        .ok_or_else(|| TimeFormatError::new(text))
}

fn parse_date_time(text: &str) -> Option<NaiveDateTime> {
    DateTime::parse_from_rfc3339(text)
        .map(|at| at.naive_local())
        .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f"))
        .ok()
}

/// Serde adapters for backend fields that hold either a bare value or a
/// full date-time.
pub mod wall {
    use chrono::NaiveDate;
    use serde::de::Error;
    use serde::{Deserialize, Deserializer};

    use super::{parse_wall_clock, parse_wall_date, ClockTime};

    pub fn clock<'de, D>(deserializer: D) -> Result<ClockTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        parse_wall_clock(&text).map_err(D::Error::custom)
    }

    /// Missing, `null` and blank values all read as `None`.
    pub fn optional_clock<'de, D>(deserializer: D) -> Result<Option<ClockTime>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<String>::deserialize(deserializer)? {
            Some(text) if !text.trim().is_empty() => {
                parse_wall_clock(&text).map(Some).map_err(D::Error::custom)
            }
            _ => Ok(None),
        }
    }

    pub fn optional_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<String>::deserialize(deserializer)? {
            Some(text) if !text.trim().is_empty() => {
                parse_wall_date(&text).map(Some).map_err(D::Error::custom)
            }
            _ => Ok(None),
        }
    }
}

/// Returns `1` when `end` is after `start`, `0` when they are the same
/// instant and `-1` when `end` comes first.
pub fn compare_clocks(start: &ClockTime, end: &ClockTime) -> i8 {
    match end.total_seconds().cmp(&start.total_seconds()) {
        Ordering::Greater => 1,
        Ordering::Equal => 0,
        Ordering::Less => -1,
    }
}

/// Length of an `HH:MM:SS` duration in milliseconds.
pub fn to_millis(duration: &ClockTime) -> u64 {
    u64::from(duration.total_seconds()) * 1000
}

pub fn to_duration(duration: &ClockTime) -> Duration {
    Duration::from_millis(to_millis(duration))
}

/// Whole seconds left, never negative.
pub fn remaining_seconds(remaining_ms: i64) -> u64 {
    (remaining_ms.max(0) / 1000) as u64
}

/// Formats a countdown as `MM:SS`, or `H:MM:SS` once it spans an hour.
pub fn format_remaining(remaining_ms: i64) -> String {
    let total = remaining_seconds(remaining_ms);
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{:02}:{:02}", minutes, seconds)
    }
}
