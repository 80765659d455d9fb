//! Time Grains and Granularity
//!
//! A granularity is either the unbounded `all` bucket or a [`TimeGrain`]: a
//! standard calendar grain (minute through year) bound to a time zone. The
//! grain knows its own bucket boundaries, so it can floor instants, check
//! interval alignment, and report the period of one bucket.
//!
//! Granularity names arrive as raw request strings and are resolved through
//! the [`GranularityParser`] trait; [`StandardGranularityParser`] covers the
//! built-in vocabulary.

use chrono::{DateTime, Datelike, Days, Duration, LocalResult, NaiveDateTime, NaiveTime, TimeZone, Timelike, Utc};
use chrono_tz::Tz;
use thiserror::Error;

use crate::time::interval::Interval;
use crate::time::period::Period;

/// The built-in calendar grains
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StandardGrain {
    /// Whole minutes
    Minute,
    /// Whole hours
    Hour,
    /// Calendar days
    Day,
    /// ISO weeks (starting Monday)
    Week,
    /// Calendar months
    Month,
    /// Calendar quarters (January, April, July, October)
    Quarter,
    /// Calendar years
    Year,
}

impl StandardGrain {
    /// Parse from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "minute" => Some(Self::Minute),
            "hour" => Some(Self::Hour),
            "day" => Some(Self::Day),
            "week" => Some(Self::Week),
            "month" => Some(Self::Month),
            "quarter" => Some(Self::Quarter),
            "year" => Some(Self::Year),
            _ => None,
        }
    }

    /// Grain name as it appears in requests
    pub fn name(&self) -> &'static str {
        match self {
            Self::Minute => "minute",
            Self::Hour => "hour",
            Self::Day => "day",
            Self::Week => "week",
            Self::Month => "month",
            Self::Quarter => "quarter",
            Self::Year => "year",
        }
    }

    /// The period of one bucket of this grain
    pub fn period(&self) -> Period {
        match self {
            Self::Minute => Period::minutes(1),
            Self::Hour => Period::hours(1),
            Self::Day => Period::days(1),
            Self::Week => Period::weeks(1),
            Self::Month => Period::months(1),
            Self::Quarter => Period::months(3),
            Self::Year => Period::years(1),
        }
    }
}

impl std::fmt::Display for StandardGrain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A calendar grain bound to the time zone that defines its boundaries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeGrain {
    grain: StandardGrain,
    time_zone: Tz,
}

impl TimeGrain {
    /// Create a grain in the given time zone
    pub fn new(grain: StandardGrain, time_zone: Tz) -> Self {
        Self { grain, time_zone }
    }

    /// The underlying calendar grain
    pub fn grain(&self) -> StandardGrain {
        self.grain
    }

    /// The zone whose wall clock defines bucket boundaries
    pub fn time_zone(&self) -> Tz {
        self.time_zone
    }

    /// The period of one bucket
    pub fn period(&self) -> Period {
        self.grain.period()
    }

    /// Floor an instant to the start of its bucket
    ///
    /// Flooring happens on the local wall clock of the grain's zone, then
    /// converts back to UTC.
    pub fn round_floor(&self, instant: DateTime<Utc>) -> DateTime<Utc> {
        let local = instant.with_timezone(&self.time_zone);
        let naive = local.naive_local();
        let date = naive.date();

        let floored = match self.grain {
            StandardGrain::Minute => naive
                .with_second(0)
                .and_then(|d| d.with_nanosecond(0))
                .unwrap_or(naive),
            StandardGrain::Hour => naive
                .with_minute(0)
                .and_then(|d| d.with_second(0))
                .and_then(|d| d.with_nanosecond(0))
                .unwrap_or(naive),
            StandardGrain::Day => date.and_time(NaiveTime::MIN),
            StandardGrain::Week => {
                let days_since_monday = date.weekday().num_days_from_monday() as u64;
                date.checked_sub_days(Days::new(days_since_monday))
                    .unwrap_or(date)
                    .and_time(NaiveTime::MIN)
            }
            StandardGrain::Month => date.with_day(1).unwrap_or(date).and_time(NaiveTime::MIN),
            StandardGrain::Quarter => {
                let quarter_month = (date.month() - 1) / 3 * 3 + 1;
                date.with_day(1)
                    .and_then(|d| d.with_month(quarter_month))
                    .unwrap_or(date)
                    .and_time(NaiveTime::MIN)
            }
            StandardGrain::Year => date
                .with_day(1)
                .and_then(|d| d.with_month(1))
                .unwrap_or(date)
                .and_time(NaiveTime::MIN),
        };

        resolve_local(self.time_zone, floored)
            .unwrap_or(local)
            .with_timezone(&Utc)
    }

    /// True when the instant sits exactly on a bucket boundary
    pub fn aligns(&self, instant: DateTime<Utc>) -> bool {
        self.round_floor(instant) == instant
    }

    /// Human-readable boundary rule, used in alignment error messages
    pub fn alignment_description(&self) -> String {
        format!(
            "{} boundaries in the {} time zone",
            self.grain, self.time_zone
        )
    }
}

impl std::fmt::Display for TimeGrain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.grain)
    }
}

/// The bucketing requested by a query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    /// One unbounded bucket covering everything
    All,
    /// Fixed calendar buckets
    Grain(TimeGrain),
}

impl Granularity {
    /// The grain, when bucketing is bounded
    pub fn as_grain(&self) -> Option<&TimeGrain> {
        match self {
            Self::All => None,
            Self::Grain(grain) => Some(grain),
        }
    }

    /// Granularity name as it appears in requests
    pub fn name(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Grain(grain) => grain.grain().name(),
        }
    }

    /// True when every interval starts and ends on a bucket boundary
    ///
    /// The unbounded granularity accepts anything.
    pub fn accepts(&self, intervals: &[Interval]) -> bool {
        match self {
            Self::All => true,
            Self::Grain(grain) => intervals
                .iter()
                .all(|interval| grain.aligns(interval.start()) && grain.aligns(interval.end())),
        }
    }
}

impl std::fmt::Display for Granularity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A granularity name that is not in the parser's vocabulary
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("'{name}' is not a recognized granularity; supported: all, minute, hour, day, week, month, quarter, year")]
pub struct GranularityParseError {
    /// The rejected name
    pub name: String,
}

/// Resolves granularity names from requests
///
/// The trait seam lets deployments extend the vocabulary (custom fiscal
/// grains and the like) without touching the request compiler.
pub trait GranularityParser: Send + Sync {
    /// Parse a granularity name, binding grains to the given zone
    fn parse(&self, name: &str, time_zone: Tz) -> Result<Granularity, GranularityParseError>;
}

/// Parser for the built-in vocabulary: `all` plus the standard grains
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardGranularityParser;

impl StandardGranularityParser {
    /// Create the standard parser
    pub fn new() -> Self {
        Self
    }
}

impl GranularityParser for StandardGranularityParser {
    fn parse(&self, name: &str, time_zone: Tz) -> Result<Granularity, GranularityParseError> {
        if name.eq_ignore_ascii_case("all") {
            return Ok(Granularity::All);
        }
        StandardGrain::from_str(name)
            .map(|grain| Granularity::Grain(TimeGrain::new(grain, time_zone)))
            .ok_or_else(|| GranularityParseError {
                name: name.to_string(),
            })
    }
}

/// Resolve a local wall-clock time in a zone
///
/// Ambiguous times (DST fall-back) take the earlier offset; skipped times
/// (DST spring-forward) roll forward an hour.
pub(crate) fn resolve_local(time_zone: Tz, naive: NaiveDateTime) -> Option<DateTime<Tz>> {
    match time_zone.from_local_datetime(&naive) {
        LocalResult::Single(resolved) => Some(resolved),
        LocalResult::Ambiguous(earlier, _) => Some(earlier),
        LocalResult::None => naive
            .checked_add_signed(Duration::hours(1))
            .and_then(|shifted| time_zone.from_local_datetime(&shifted).earliest()),
    }
}
