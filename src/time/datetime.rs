//! Lenient Datetime Parsing
//!
//! Requests may truncate ISO-8601 datetimes anywhere from a bare year down
//! to milliseconds, with or without an explicit UTC offset. The parser tries
//! the explicit-offset forms first, then the naive forms from most to least
//! precise, interpreting naive times on the wall clock of the request's
//! time zone. Missing components mean the start of the period they leave
//! open (`2020-06` is June 1st at midnight).

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use chrono_tz::Tz;
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use crate::time::grain::resolve_local;

static PARTIAL_DATE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{4})(?:-(\d{2}))?$").expect("partial date pattern is valid"));

/// A datetime token could not be interpreted
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("'{text}' is not a recognizable datetime")]
pub struct DateTimeParseError {
    /// The rejected input
    pub text: String,
}

/// Zone-aware parser for truncated ISO-8601 datetimes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateTimeParser {
    time_zone: Tz,
}

impl DateTimeParser {
    /// Create a parser that interprets naive times in the given zone
    pub fn new(time_zone: Tz) -> Self {
        Self { time_zone }
    }

    /// The zone applied to naive inputs
    pub fn time_zone(&self) -> Tz {
        self.time_zone
    }

    /// Parse a datetime token into a UTC instant
    pub fn parse(&self, text: &str) -> Result<DateTime<Utc>, DateTimeParseError> {
        let text = text.trim();

        // Explicit offsets win over the parser's zone
        if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
            return Ok(parsed.with_timezone(&Utc));
        }
        for format in ["%Y-%m-%dT%H:%M:%S%.f%z", "%Y-%m-%dT%H:%M%z"] {
            if let Ok(parsed) = DateTime::parse_from_str(text, format) {
                return Ok(parsed.with_timezone(&Utc));
            }
        }

        // Naive forms, most precise first
        for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
            if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
                return self.localize(naive, text);
            }
        }

        // Hour-only times lack the minute chrono needs to build a time
        if let Some((_, hour)) = text.split_once('T') {
            if !hour.is_empty() && hour.len() <= 2 && hour.chars().all(|c| c.is_ascii_digit()) {
                let padded = format!("{}:00", text);
                if let Ok(naive) = NaiveDateTime::parse_from_str(&padded, "%Y-%m-%dT%H:%M") {
                    return self.localize(naive, text);
                }
            }
        }

        if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
            return self.localize(date.and_time(NaiveTime::MIN), text);
        }

        // Bare year or year-month
        if let Some(captures) = PARTIAL_DATE_PATTERN.captures(text) {
            let year = captures
                .get(1)
                .and_then(|m| m.as_str().parse::<i32>().ok());
            let month = captures
                .get(2)
                .map_or(Some(1), |m| m.as_str().parse::<u32>().ok());
            if let (Some(year), Some(month)) = (year, month) {
                if let Some(date) = NaiveDate::from_ymd_opt(year, month, 1) {
                    return self.localize(date.and_time(NaiveTime::MIN), text);
                }
            }
        }

        Err(DateTimeParseError {
            text: text.to_string(),
        })
    }

    fn localize(
        &self,
        naive: NaiveDateTime,
        text: &str,
    ) -> Result<DateTime<Utc>, DateTimeParseError> {
        resolve_local(self.time_zone, naive)
            .map(|resolved| resolved.with_timezone(&Utc))
            .ok_or_else(|| DateTimeParseError {
                text: text.to_string(),
            })
    }
}
