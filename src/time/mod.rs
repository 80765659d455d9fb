//! Time Semantics
//!
//! Everything the request compiler knows about time:
//!
//! - **grain**: Granularities, time grains, zone-aware bucket boundaries
//! - **period**: ISO-8601 periods and calendar arithmetic
//! - **macros**: Symbolic tokens (`current`, `next`) resolved against a grain
//! - **datetime**: Lenient truncated ISO-8601 datetime parsing
//! - **interval**: `start/end` interval token resolution
//!
//! All instants are UTC internally; time zones only matter at the edges,
//! when naive request text is interpreted and when grain boundaries are
//! computed on a local wall clock.

mod datetime;
mod grain;
mod interval;
mod macros;
mod period;

pub use datetime::{DateTimeParseError, DateTimeParser};
pub use grain::{
    Granularity, GranularityParseError, GranularityParser, StandardGrain,
    StandardGranularityParser, TimeGrain,
};
pub use interval::{resolve_intervals, Interval};
pub use macros::TimeMacro;
pub use period::{Period, PeriodParseError};
