//! Tick granularities and period slicing.

use chrono::{Datelike, Duration, Months, NaiveDateTime};
use std::fmt;
use std::str::FromStr;

use super::error::PulsetraderError;

/// Candle granularity for either resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    Month1,
    Week1,
    Day1,
    Hour4,
    Hour1,
    Minute30,
    Minute15,
    Minute5,
    Minute3,
    Minute1,
}

impl Tick {
    pub fn interval_minutes(&self) -> i64 {
        match self {
            Tick::Month1 => 60 * 24 * 30,
            Tick::Week1 => 60 * 24 * 7,
            Tick::Day1 => 60 * 24,
            Tick::Hour4 => 60 * 4,
            Tick::Hour1 => 60,
            Tick::Minute30 => 30,
            Tick::Minute15 => 15,
            Tick::Minute5 => 5,
            Tick::Minute3 => 3,
            Tick::Minute1 => 1,
        }
    }

    /// Exclusive end of the period anchored at `start`.
    ///
    /// Every tick spans its fixed minute count except `month1`: a calendar
    /// month is added with day-of-month clamping, and when the target month
    /// is too short for the anchor day the end rolls one day past that
    /// month's end. A monthly row dated 2024-01-31 therefore spans
    /// [2024-01-31, 2024-03-01).
    pub fn period_end(&self, start: NaiveDateTime) -> NaiveDateTime {
        match self {
            Tick::Month1 => {
                let next = start + Months::new(1);
                if next.day() < start.day() {
                    next + Duration::days(1)
                } else {
                    next
                }
            }
            _ => start + Duration::minutes(self.interval_minutes()),
        }
    }

    /// True when `datetime` falls inside the half-open period at `start`.
    pub fn contains(&self, start: NaiveDateTime, datetime: NaiveDateTime) -> bool {
        datetime >= start && datetime < self.period_end(start)
    }
}

impl fmt::Display for Tick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Tick::Month1 => "month1",
            Tick::Week1 => "week1",
            Tick::Day1 => "day1",
            Tick::Hour4 => "hour4",
            Tick::Hour1 => "hour1",
            Tick::Minute30 => "minute30",
            Tick::Minute15 => "minute15",
            Tick::Minute5 => "minute5",
            Tick::Minute3 => "minute3",
            Tick::Minute1 => "minute1",
        };
        write!(f, "{name}")
    }
}

impl FromStr for Tick {
    type Err = PulsetraderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "month1" => Ok(Tick::Month1),
            "week1" => Ok(Tick::Week1),
            "day1" => Ok(Tick::Day1),
            "hour4" => Ok(Tick::Hour4),
            "hour1" => Ok(Tick::Hour1),
            "minute30" => Ok(Tick::Minute30),
            "minute15" => Ok(Tick::Minute15),
            "minute5" => Ok(Tick::Minute5),
            "minute3" => Ok(Tick::Minute3),
            "minute1" => Ok(Tick::Minute1),
            _ => Err(PulsetraderError::UnknownTick {
                value: s.to_string(),
            }),
        }
    }
}
