use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::TimeError;

pub const MINUTES_PER_DAY: u16 = 1440;
pub const DEFAULT_SNAP_STEP: u16 = 5;

/// A wall-clock time on a 24-hour face, `0..1440`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct MinuteOfDay(u16);

impl MinuteOfDay {
    pub const MIDNIGHT: MinuteOfDay = MinuteOfDay(0);

    pub fn new(minutes: u16) -> Result<Self, TimeError> {
        if minutes >= MINUTES_PER_DAY {
            return Err(TimeError::OutOfRange(i64::from(minutes)));
        }
        Ok(Self(minutes))
    }

    /// Wraps any integer onto the day face.
    pub fn wrapping(minutes: i64) -> Self {
        Self(minutes.rem_euclid(i64::from(MINUTES_PER_DAY)) as u16)
    }

    pub fn from_hm(hour: u16, minute: u16) -> Result<Self, TimeError> {
        if hour > 23 || minute > 59 {
            return Err(TimeError::OutOfRange(
                i64::from(hour) * 60 + i64::from(minute),
            ));
        }
        Ok(Self(hour * 60 + minute))
    }

    pub fn minutes(self) -> u16 {
        self.0
    }

    pub fn hour(self) -> u16 {
        self.0 / 60
    }

    pub fn minute(self) -> u16 {
        self.0 % 60
    }

    /// Adds a (possibly negative) number of minutes, wrapping past midnight.
    pub fn wrapping_add(self, delta: i64) -> Self {
        Self::wrapping(i64::from(self.0) + delta)
    }
}

impl fmt::Display for MinuteOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

impl FromStr for MinuteOfDay {
    type Err = TimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        time_to_minutes(s)
    }
}

impl Serialize for MinuteOfDay {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MinuteOfDay {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        time_to_minutes(&raw).map_err(serde::de::Error::custom)
    }
}

/// Parses `H:MM` or `HH:MM`. `24:00` is accepted as the end-of-day marker and
/// wraps to midnight.
pub fn time_to_minutes(input: &str) -> Result<MinuteOfDay, TimeError> {
    let trimmed = input.trim();
    let (hour, minute) = trimmed
        .split_once(':')
        .ok_or_else(|| TimeError::Malformed(input.to_string()))?;

    let well_formed = (1..=2).contains(&hour.len())
        && minute.len() == 2
        && hour.bytes().all(|b| b.is_ascii_digit())
        && minute.bytes().all(|b| b.is_ascii_digit());
    if !well_formed {
        return Err(TimeError::Malformed(input.to_string()));
    }

    let hour: u16 = hour
        .parse()
        .map_err(|_| TimeError::Malformed(input.to_string()))?;
    let minute: u16 = minute
        .parse()
        .map_err(|_| TimeError::Malformed(input.to_string()))?;

    if hour == 24 && minute == 0 {
        return Ok(MinuteOfDay::MIDNIGHT);
    }
    MinuteOfDay::from_hm(hour, minute)
}

/// Formats any minute count as `HH:MM`, wrapping onto the 24-hour face.
pub fn minutes_to_time(minutes: i64) -> String {
    MinuteOfDay::wrapping(minutes).to_string()
}

/// Rounds to the nearest multiple of `step` (halves round up).
pub fn snap_to_grid(minutes: i64, step: u16) -> i64 {
    if step == 0 {
        return minutes;
    }
    let step = i64::from(step);
    (minutes + step / 2).div_euclid(step) * step
}

/// Minutes from `start` forward to `end`, crossing midnight when `end < start`.
pub fn span_minutes(start: MinuteOfDay, end: MinuteOfDay) -> u16 {
    (i64::from(end.0) - i64::from(start.0)).rem_euclid(i64::from(MINUTES_PER_DAY)) as u16
}

/// Absolute end of a span starting at `start`, expanded by one day when the
/// span crosses midnight.
pub fn absolute_end(start: MinuteOfDay, end: MinuteOfDay) -> u32 {
    let start = u32::from(start.0);
    let end = u32::from(end.0);
    if end < start {
        end + u32::from(MINUTES_PER_DAY)
    } else {
        end
    }
}
