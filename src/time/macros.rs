//! Time Macros
//!
//! Symbolic datetime tokens that resolve relative to a reference instant
//! and a time grain: `current` is the start of the bucket containing the
//! reference, `next` is the start of the following bucket. Recognition is
//! separate from resolution so interval parsing can fall through to literal
//! datetime parsing when a token is not a macro.

use chrono::{DateTime, Utc};

use crate::time::grain::TimeGrain;

/// The closed macro vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeMacro {
    /// Start of the bucket containing the reference instant
    Current,
    /// Start of the bucket after the one containing the reference instant
    Next,
}

impl TimeMacro {
    /// Recognize a macro token, case-insensitively
    ///
    /// Returns `None` for anything outside the vocabulary; that is not an
    /// error, the token is then treated as a literal datetime.
    pub fn for_name(token: &str) -> Option<Self> {
        match token.to_lowercase().as_str() {
            "current" => Some(Self::Current),
            "next" => Some(Self::Next),
            _ => None,
        }
    }

    /// Macro name as it appears in requests
    pub fn name(&self) -> &'static str {
        match self {
            Self::Current => "current",
            Self::Next => "next",
        }
    }

    /// Resolve against a reference instant under a grain
    ///
    /// The grain supplies both the bucket boundaries and the time zone in
    /// which the `next` step is taken.
    pub fn resolve(&self, reference: DateTime<Utc>, grain: &TimeGrain) -> DateTime<Utc> {
        let floor = grain.round_floor(reference);
        match self {
            Self::Current => floor,
            Self::Next => grain
                .period()
                .add_to(floor.with_timezone(&grain.time_zone()))
                .map(|next| next.with_timezone(&Utc))
                .unwrap_or(floor),
        }
    }
}

impl std::fmt::Display for TimeMacro {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::grain::StandardGrain;
    use chrono::TimeZone;
    use chrono_tz::Tz;

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    #[test]
    fn test_for_name_recognition() {
        assert_eq!(TimeMacro::for_name("current"), Some(TimeMacro::Current));
        assert_eq!(TimeMacro::for_name("CURRENT"), Some(TimeMacro::Current));
        assert_eq!(TimeMacro::for_name("Next"), Some(TimeMacro::Next));
        assert_eq!(TimeMacro::for_name("2020-01-01"), None);
        assert_eq!(TimeMacro::for_name("currently"), None);
        assert_eq!(TimeMacro::for_name(""), None);
    }

    #[test]
    fn test_current_floors_to_grain() {
        let day = TimeGrain::new(StandardGrain::Day, Tz::UTC);
        let reference = utc(2020, 1, 15, 13, 0, 0);
        assert_eq!(
            TimeMacro::Current.resolve(reference, &day),
            utc(2020, 1, 15, 0, 0, 0)
        );
    }

    #[test]
    fn test_next_advances_one_bucket() {
        let reference = utc(2020, 1, 15, 13, 0, 0);

        let day = TimeGrain::new(StandardGrain::Day, Tz::UTC);
        assert_eq!(
            TimeMacro::Next.resolve(reference, &day),
            utc(2020, 1, 16, 0, 0, 0)
        );

        let month = TimeGrain::new(StandardGrain::Month, Tz::UTC);
        assert_eq!(
            TimeMacro::Next.resolve(reference, &month),
            utc(2020, 2, 1, 0, 0, 0)
        );
    }

    #[test]
    fn test_next_steps_on_the_local_calendar() {
        // March in New York is 23 hours short of 31 days in UTC terms: the
        // month starts at 05:00Z (EST) and April starts at 04:00Z (EDT).
        let month = TimeGrain::new(StandardGrain::Month, Tz::America__New_York);
        let reference = utc(2024, 3, 15, 12, 0, 0);

        assert_eq!(
            TimeMacro::Current.resolve(reference, &month),
            utc(2024, 3, 1, 5, 0, 0)
        );
        assert_eq!(
            TimeMacro::Next.resolve(reference, &month),
            utc(2024, 4, 1, 4, 0, 0)
        );
    }
}
