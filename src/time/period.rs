//! ISO-8601 Periods
//!
//! Parses period designators like `P1D`, `P2W`, `P3M`, or `P1DT12H` and
//! applies them to zoned datetimes with calendar-aware arithmetic (adding a
//! month to January 31 clamps to the end of February). Periods anchor one
//! side of an interval expression and describe the width of a time grain.

use chrono::{DateTime, Days, Duration, Months, TimeZone};
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

// Date components, then an optional T section with time components. The
// pattern alone accepts "P" and "P1DT"; parse() rejects those afterwards.
static PERIOD_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^P(?:(\d+)Y)?(?:(\d+)M)?(?:(\d+)W)?(?:(\d+)D)?(?:T(?:(\d+)H)?(?:(\d+)M)?(?:(\d+)(?:\.(\d{1,3}))?S)?)?$",
    )
    .expect("period pattern is valid")
});

/// A period expression could not be parsed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("'{text}' is not a valid ISO-8601 period")]
pub struct PeriodParseError {
    /// The rejected input
    pub text: String,
}

/// An ISO-8601 period: a calendar offset from years down to milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Period {
    years: u32,
    months: u32,
    weeks: u32,
    days: u32,
    hours: u32,
    minutes: u32,
    seconds: u32,
    millis: u32,
}

impl Period {
    /// Parse an ISO-8601 period designator, case-insensitively
    pub fn parse(text: &str) -> Result<Self, PeriodParseError> {
        let normalized = text.trim().to_ascii_uppercase();
        let reject = || PeriodParseError {
            text: text.to_string(),
        };

        let captures = PERIOD_PATTERN.captures(&normalized).ok_or_else(reject)?;

        // A component that overflows u32 is rejected, not truncated
        let component = |index: usize| -> Result<u32, PeriodParseError> {
            match captures.get(index) {
                Some(m) => m.as_str().parse().map_err(|_| reject()),
                None => Ok(0),
            }
        };

        let period = Self {
            years: component(1)?,
            months: component(2)?,
            weeks: component(3)?,
            days: component(4)?,
            hours: component(5)?,
            minutes: component(6)?,
            seconds: component(7)?,
            millis: captures
                .get(8)
                .map(|m| fraction_to_millis(m.as_str()))
                .unwrap_or(0),
        };

        let has_date_part = (1..=4).any(|i| captures.get(i).is_some());
        let has_time_part = (5..=7).any(|i| captures.get(i).is_some());

        // "P" carries no components; "P1DT" has a dangling time designator
        if !has_date_part && !has_time_part {
            return Err(reject());
        }
        if normalized.contains('T') && !has_time_part {
            return Err(reject());
        }

        Ok(period)
    }

    /// A period of whole years
    pub fn years(years: u32) -> Self {
        Self {
            years,
            ..Self::default()
        }
    }

    /// A period of whole months
    pub fn months(months: u32) -> Self {
        Self {
            months,
            ..Self::default()
        }
    }

    /// A period of whole weeks
    pub fn weeks(weeks: u32) -> Self {
        Self {
            weeks,
            ..Self::default()
        }
    }

    /// A period of whole days
    pub fn days(days: u32) -> Self {
        Self {
            days,
            ..Self::default()
        }
    }

    /// A period of whole hours
    pub fn hours(hours: u32) -> Self {
        Self {
            hours,
            ..Self::default()
        }
    }

    /// A period of whole minutes
    pub fn minutes(minutes: u32) -> Self {
        Self {
            minutes,
            ..Self::default()
        }
    }

    /// True when every component is zero
    pub fn is_zero(&self) -> bool {
        *self == Self::default()
    }

    /// Add this period to an instant, most-significant component first
    ///
    /// Month and year steps are calendar-aware in the instant's time zone.
    /// Returns `None` when the result would overflow the datetime range.
    pub fn add_to<Tz: TimeZone>(&self, instant: DateTime<Tz>) -> Option<DateTime<Tz>> {
        instant
            .checked_add_months(Months::new(self.total_months()?))?
            .checked_add_days(Days::new(self.total_days()))?
            .checked_add_signed(self.time_duration())
    }

    /// Subtract this period from an instant, most-significant component first
    pub fn subtract_from<Tz: TimeZone>(&self, instant: DateTime<Tz>) -> Option<DateTime<Tz>> {
        instant
            .checked_sub_months(Months::new(self.total_months()?))?
            .checked_sub_days(Days::new(self.total_days()))?
            .checked_sub_signed(self.time_duration())
    }

    fn total_months(&self) -> Option<u32> {
        self.years.checked_mul(12)?.checked_add(self.months)
    }

    fn total_days(&self) -> u64 {
        self.weeks as u64 * 7 + self.days as u64
    }

    fn time_duration(&self) -> Duration {
        let millis = self.hours as i64 * 3_600_000
            + self.minutes as i64 * 60_000
            + self.seconds as i64 * 1_000
            + self.millis as i64;
        Duration::milliseconds(millis)
    }
}

impl std::fmt::Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_zero() {
            return write!(f, "PT0S");
        }

        write!(f, "P")?;
        if self.years > 0 {
            write!(f, "{}Y", self.years)?;
        }
        if self.months > 0 {
            write!(f, "{}M", self.months)?;
        }
        if self.weeks > 0 {
            write!(f, "{}W", self.weeks)?;
        }
        if self.days > 0 {
            write!(f, "{}D", self.days)?;
        }

        let has_time =
            self.hours > 0 || self.minutes > 0 || self.seconds > 0 || self.millis > 0;
        if has_time {
            write!(f, "T")?;
            if self.hours > 0 {
                write!(f, "{}H", self.hours)?;
            }
            if self.minutes > 0 {
                write!(f, "{}M", self.minutes)?;
            }
            if self.millis > 0 {
                write!(f, "{}.{:03}S", self.seconds, self.millis)?;
            } else if self.seconds > 0 {
                write!(f, "{}S", self.seconds)?;
            }
        }

        Ok(())
    }
}

/// Scale a 1-3 digit fraction of a second to whole milliseconds
fn fraction_to_millis(fraction: &str) -> u32 {
    let value: u32 = fraction.parse().unwrap_or(0);
    match fraction.len() {
        1 => value * 100,
        2 => value * 10,
        _ => value,
    }
}
