//! Interval Resolution
//!
//! Request intervals arrive as a comma-separated list of `start/end` tokens.
//! Each side is a datetime, a time macro, or an ISO-8601 period; a period
//! side is resolved by sliding it off the other side's instant. Resolution
//! is deterministic: the reference instant for macros is an explicit
//! argument, never a clock read.
//!
//! ```text
//! 2020-01-01/2020-02-01      two datetimes
//! P1D/2020-01-15             the day ending at the anchor
//! 2020-01-15/P1D             the day starting at the anchor
//! current/next               one grain bucket around the reference
//! ```

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde::Serialize;

use crate::error::{RequestError, RequestResult};
use crate::time::datetime::DateTimeParser;
use crate::time::grain::Granularity;
use crate::time::macros::TimeMacro;
use crate::time::period::Period;

const END_BEFORE_START: &str = "The end instant must be greater than the start instant";

/// A half-open UTC time range `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Interval {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl Interval {
    /// Create an interval; the end must not precede the start
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> RequestResult<Self> {
        if end < start {
            return Err(RequestError::IntervalInvalid {
                interval: format!("{}/{}", format_instant(start), format_instant(end)),
                reason: END_BEFORE_START.to_string(),
            });
        }
        Ok(Self { start, end })
    }

    /// Inclusive start instant
    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    /// Exclusive end instant
    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Width of the interval
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}

impl std::fmt::Display for Interval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{}",
            format_instant(self.start),
            format_instant(self.end)
        )
    }
}

fn format_instant(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Resolve a raw interval query into concrete intervals
///
/// Order is preserved and exact duplicates are collapsed. The first bad
/// token aborts resolution. Zero-length intervals are rejected; so are
/// intervals that end before they start.
pub fn resolve_intervals(
    query: &str,
    now: DateTime<Utc>,
    granularity: &Granularity,
    parser: &DateTimeParser,
) -> RequestResult<Vec<Interval>> {
    let query = query.trim();
    if query.is_empty() {
        tracing::debug!("Interval parameter is missing from the request");
        return Err(RequestError::IntervalMissing);
    }

    let mut intervals: Vec<Interval> = Vec::new();
    for token in query.split(',') {
        let interval = resolve_token(token.trim(), now, granularity, parser)?;
        if !intervals.contains(&interval) {
            intervals.push(interval);
        }
    }

    tracing::trace!("Resolved intervals: {:?}", intervals);
    Ok(intervals)
}

fn resolve_token(
    token: &str,
    now: DateTime<Utc>,
    granularity: &Granularity,
    parser: &DateTimeParser,
) -> RequestResult<Interval> {
    let mut sides = token.splitn(3, '/');
    let (start_text, end_text) = match (sides.next(), sides.next(), sides.next()) {
        (Some(start), Some(end), None) => (start.trim(), end.trim()),
        _ => {
            tracing::debug!("Interval '{}' is not a start/end pair", token);
            return Err(RequestError::IntervalInvalid {
                interval: token.to_string(),
                reason: "Start and End dates are required.".to_string(),
            });
        }
    };

    // A leading P marks a period side
    let start_is_period = start_text.starts_with(['P', 'p']);
    let end_is_period = end_text.starts_with(['P', 'p']);

    let (start, end) = if start_is_period && end_is_period {
        tracing::debug!("Interval '{}' has no datetime anchor", token);
        return Err(RequestError::IntervalInvalid {
            interval: token.to_string(),
            reason: "an interval cannot be bounded by two periods".to_string(),
        });
    } else if start_is_period {
        let period = parse_period(start_text, token)?;
        let end = resolve_instant(end_text, token, now, granularity, parser)?;
        let start = period
            .subtract_from(end.with_timezone(&parser.time_zone()))
            .map(|instant| instant.with_timezone(&Utc))
            .ok_or_else(|| period_out_of_range(token))?;
        (start, end)
    } else if end_is_period {
        let period = parse_period(end_text, token)?;
        let start = resolve_instant(start_text, token, now, granularity, parser)?;
        let end = period
            .add_to(start.with_timezone(&parser.time_zone()))
            .map(|instant| instant.with_timezone(&Utc))
            .ok_or_else(|| period_out_of_range(token))?;
        (start, end)
    } else {
        (
            resolve_instant(start_text, token, now, granularity, parser)?,
            resolve_instant(end_text, token, now, granularity, parser)?,
        )
    };

    let interval = match Interval::new(start, end) {
        Ok(interval) => interval,
        Err(RequestError::IntervalInvalid { reason, .. }) => {
            tracing::debug!("Interval '{}' ends before it starts", token);
            return Err(RequestError::IntervalInvalid {
                interval: token.to_string(),
                reason,
            });
        }
        Err(other) => return Err(other),
    };

    if interval.duration() == Duration::zero() {
        tracing::debug!("Interval '{}' has zero length", token);
        return Err(RequestError::IntervalZeroLength {
            interval: token.to_string(),
        });
    }

    Ok(interval)
}

/// Resolve one side of an interval: a macro under the grain, else a datetime
fn resolve_instant(
    text: &str,
    token: &str,
    now: DateTime<Utc>,
    granularity: &Granularity,
    parser: &DateTimeParser,
) -> RequestResult<DateTime<Utc>> {
    if let Some(time_macro) = TimeMacro::for_name(text) {
        return match granularity.as_grain() {
            Some(grain) => Ok(time_macro.resolve(now, grain)),
            None => {
                tracing::debug!(
                    "Time macro '{}' in interval '{}' used with the unbounded granularity",
                    time_macro,
                    token
                );
                Err(RequestError::InvalidIntervalGranularity {
                    macro_name: time_macro.name().to_string(),
                    interval: token.to_string(),
                })
            }
        };
    }

    parser.parse(text).map_err(|e| {
        tracing::debug!("Interval '{}' datetime failed to parse: {}", token, e);
        RequestError::IntervalInvalid {
            interval: token.to_string(),
            reason: e.to_string(),
        }
    })
}

fn parse_period(text: &str, token: &str) -> RequestResult<Period> {
    Period::parse(text).map_err(|e| {
        tracing::debug!("Interval '{}' period failed to parse: {}", token, e);
        RequestError::IntervalInvalid {
            interval: token.to_string(),
            reason: e.to_string(),
        }
    })
}

fn period_out_of_range(token: &str) -> RequestError {
    RequestError::IntervalInvalid {
        interval: token.to_string(),
        reason: "the period extends beyond the representable datetime range".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::grain::{StandardGrain, TimeGrain};
    use chrono::TimeZone;
    use chrono_tz::Tz;

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    fn day_granularity() -> Granularity {
        Granularity::Grain(TimeGrain::new(StandardGrain::Day, Tz::UTC))
    }

    fn resolve(query: &str, granularity: &Granularity) -> RequestResult<Vec<Interval>> {
        let now = utc(2020, 1, 15, 13, 0, 0);
        let parser = DateTimeParser::new(Tz::UTC);
        resolve_intervals(query, now, granularity, &parser)
    }

    #[test]
    fn test_two_datetimes() {
        let intervals = resolve("2020-01-01/2020-02-01", &day_granularity()).unwrap();
        assert_eq!(intervals.len(), 1);
        assert_eq!(intervals[0].start(), utc(2020, 1, 1, 0, 0, 0));
        assert_eq!(intervals[0].end(), utc(2020, 2, 1, 0, 0, 0));
    }

    #[test]
    fn test_period_on_the_start_side() {
        let intervals = resolve("P1D/2020-01-15", &day_granularity()).unwrap();
        assert_eq!(intervals[0].start(), utc(2020, 1, 14, 0, 0, 0));
        assert_eq!(intervals[0].end(), utc(2020, 1, 15, 0, 0, 0));
    }

    #[test]
    fn test_period_on_the_end_side() {
        let intervals = resolve("2020-01-15/P1W", &day_granularity()).unwrap();
        assert_eq!(intervals[0].start(), utc(2020, 1, 15, 0, 0, 0));
        assert_eq!(intervals[0].end(), utc(2020, 1, 22, 0, 0, 0));
    }

    #[test]
    fn test_macro_sides() {
        // Reference instant is 2020-01-15T13:00Z at day grain
        let intervals = resolve("current/next", &day_granularity()).unwrap();
        assert_eq!(intervals[0].start(), utc(2020, 1, 15, 0, 0, 0));
        assert_eq!(intervals[0].end(), utc(2020, 1, 16, 0, 0, 0));
    }

    #[test]
    fn test_macro_with_period() {
        let intervals = resolve("current/P2D", &day_granularity()).unwrap();
        assert_eq!(intervals[0].start(), utc(2020, 1, 15, 0, 0, 0));
        assert_eq!(intervals[0].end(), utc(2020, 1, 17, 0, 0, 0));
    }

    #[test]
    fn test_macro_requires_a_grain() {
        let err = resolve("current/next", &Granularity::All).unwrap_err();
        match err {
            RequestError::InvalidIntervalGranularity {
                macro_name,
                interval,
            } => {
                assert_eq!(macro_name, "current");
                assert_eq!(interval, "current/next");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_two_periods_rejected() {
        let err = resolve("P1D/P1D", &day_granularity()).unwrap_err();
        match err {
            RequestError::IntervalInvalid { interval, .. } => {
                assert_eq!(interval, "P1D/P1D")
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_missing_intervals() {
        assert!(matches!(
            resolve("", &day_granularity()),
            Err(RequestError::IntervalMissing)
        ));
        assert!(matches!(
            resolve("   ", &day_granularity()),
            Err(RequestError::IntervalMissing)
        ));
    }

    #[test]
    fn test_token_without_separator() {
        let err = resolve("2020-01-01", &day_granularity()).unwrap_err();
        match err {
            RequestError::IntervalInvalid { reason, .. } => {
                assert_eq!(reason, "Start and End dates are required.")
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_token_with_too_many_separators() {
        let err = resolve("2020-01-01/2020-01-02/2020-01-03", &day_granularity()).unwrap_err();
        assert!(matches!(err, RequestError::IntervalInvalid { .. }));
    }

    #[test]
    fn test_unparseable_datetime_carries_the_token() {
        let err = resolve("garbage/2020-02-01", &day_granularity()).unwrap_err();
        match err {
            RequestError::IntervalInvalid { interval, reason } => {
                assert_eq!(interval, "garbage/2020-02-01");
                assert!(reason.contains("garbage"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_zero_length_rejected() {
        let err = resolve("2020-01-01/2020-01-01", &day_granularity()).unwrap_err();
        match err {
            RequestError::IntervalZeroLength { interval } => {
                assert_eq!(interval, "2020-01-01/2020-01-01")
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_reversed_interval_message() {
        let err = resolve("2020-02-01/2020-01-01", &day_granularity()).unwrap_err();
        match err {
            RequestError::IntervalInvalid { reason, .. } => {
                assert_eq!(reason, END_BEFORE_START)
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_multiple_intervals_preserve_order_and_collapse_duplicates() {
        let intervals = resolve(
            "2020-03-01/2020-04-01,2020-01-01/2020-02-01,2020-03-01/2020-04-01",
            &day_granularity(),
        )
        .unwrap();
        assert_eq!(intervals.len(), 2);
        assert_eq!(intervals[0].start(), utc(2020, 3, 1, 0, 0, 0));
        assert_eq!(intervals[1].start(), utc(2020, 1, 1, 0, 0, 0));
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let first = resolve("P1M/current", &day_granularity()).unwrap();
        let second = resolve("P1M/current", &day_granularity()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_period_arithmetic_in_the_request_zone() {
        // One month before April 1 in New York crosses the DST change
        let now = utc(2024, 4, 10, 12, 0, 0);
        let parser = DateTimeParser::new(Tz::America__New_York);
        let granularity = Granularity::Grain(TimeGrain::new(
            StandardGrain::Day,
            Tz::America__New_York,
        ));

        let intervals =
            resolve_intervals("P1M/2024-04-01", now, &granularity, &parser).unwrap();
        // 2024-04-01T00:00-04:00 back one month is 2024-03-01T00:00-05:00
        assert_eq!(intervals[0].start(), utc(2024, 3, 1, 5, 0, 0));
        assert_eq!(intervals[0].end(), utc(2024, 4, 1, 4, 0, 0));
    }

    #[test]
    fn test_interval_display() {
        let interval =
            Interval::new(utc(2020, 1, 1, 0, 0, 0), utc(2020, 1, 2, 0, 0, 0)).unwrap();
        assert_eq!(
            interval.to_string(),
            "2020-01-01T00:00:00.000Z/2020-01-02T00:00:00.000Z"
        );
    }
}
