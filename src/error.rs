//! Request Error Family
//!
//! Every way a raw request can be rejected, in one enum. All variants are
//! client-input problems: the request never reaches the query engine, and a
//! transport layer would map them to a 4xx response. Each variant carries a
//! stable identifier (see [`RequestError::error_code`]) so clients can
//! classify failures without parsing messages.
//!
//! Token-level parse failures keep their precise cause as a wrapped source
//! error (`FilterError`, `HavingError`, `PaginationError`); batched schema
//! failures carry every offending name, collected before the error is
//! raised.

use thiserror::Error;

use crate::request::{FilterError, HavingError, PaginationError};
use crate::time::{GranularityParseError, Interval};

/// Result type for request compilation
pub type RequestResult<T> = Result<T, RequestError>;

/// Errors produced while compiling a raw request
#[derive(Debug, Error)]
pub enum RequestError {
    /// Unknown response format name
    #[error("Format '{format}' is not a valid response format; supported: json, csv, jsonapi")]
    AcceptFormatInvalid { format: String },

    /// asyncAfter was not 'never', 'always', or non-negative milliseconds
    #[error("Invalid asyncAfter value '{value}'; expected 'never', 'always', or a non-negative number of milliseconds")]
    InvalidAsyncAfter { value: String },

    /// Pagination parameters were malformed or incomplete
    #[error(transparent)]
    InvalidPagination(#[from] PaginationError),

    /// Requested dimensions that no dictionary entry matches
    #[error("Dimension(s) {} do not exist", join_names(.names))]
    DimensionsUndefined { names: Vec<String> },

    /// Requested dimensions the table does not carry
    #[error("Dimension(s) {} are not supported by the table '{table}'", join_names(.names))]
    DimensionsNotInTable { names: Vec<String>, table: String },

    /// Requested dimension fields the dimension does not declare
    #[error("Dimension field(s) {} do not exist for dimension '{dimension}'", join_names(.fields))]
    DimensionFieldsUndefined {
        fields: Vec<String>,
        dimension: String,
    },

    /// Requested metrics that no dictionary entry matches
    #[error("Metric(s) {} do not exist", join_names(.names))]
    MetricsUndefined { names: Vec<String> },

    /// Requested metrics the table does not carry
    #[error("Metric(s) {} are not supported by the table '{table}'", join_names(.names))]
    MetricsNotInTable { names: Vec<String>, table: String },

    /// The interval parameter was absent or empty
    #[error("Required interval parameter 'dateTime' is missing")]
    IntervalMissing,

    /// An interval token could not be resolved
    #[error("Interval '{interval}' is invalid: {reason}")]
    IntervalInvalid { interval: String, reason: String },

    /// An interval token resolved to an empty range
    #[error("Interval '{interval}' has zero length; intervals must cover a non-empty range")]
    IntervalZeroLength { interval: String },

    /// A time macro was used where no grain defines its meaning
    #[error("Time macro '{macro_name}' in interval '{interval}' cannot be used with granularity 'all'")]
    InvalidIntervalGranularity {
        macro_name: String,
        interval: String,
    },

    /// Unknown time zone identifier
    #[error("Time zone '{name}' is unknown")]
    InvalidTimeZone { name: String },

    /// Intervals do not start and end on grain boundaries
    #[error("Interval(s) {} do not align with granularity '{granularity}'; intervals must start and end on {description}", join_intervals(.intervals))]
    TimeAlignment {
        intervals: Vec<Interval>,
        granularity: String,
        description: String,
    },

    /// Granularity name outside the parser's vocabulary
    #[error(transparent)]
    UnknownGranularity(#[from] GranularityParseError),

    /// A filter token failed to parse or bind
    #[error(transparent)]
    BadFilter(#[from] FilterError),

    /// A filter references a dimension the table does not carry
    #[error("Filter dimension '{dimension}' is not supported by the table '{table}'")]
    FilterDimensionNotInTable { dimension: String, table: String },

    /// A substring filter arrived while the feature flag is off
    #[error("Filter operations 'startswith' and 'contains' are not enabled for this deployment")]
    FilterSubstringOperationsDisabled,

    /// A having token failed to parse or bind
    #[error(transparent)]
    BadHaving(#[from] HavingError),

    /// Havings constrain metrics the query does not select
    #[error("Having metric(s) {} are not selected by this query", join_names(.names))]
    HavingMetricsNotInQuery { names: Vec<String> },

    /// Sort direction other than asc or desc
    #[error("Sort direction '{direction}' is invalid; use 'asc' or 'desc'")]
    SortDirectionInvalid { direction: String },

    /// Sort columns that no metric dictionary entry matches
    #[error("Sort metric(s) {} do not exist", join_names(.names))]
    SortMetricsUndefined { names: Vec<String> },

    /// Sort columns naming metrics the query does not select
    #[error("Sort metric(s) {} are not selected by this query", join_names(.names))]
    SortMetricsNotInQuery { names: Vec<String> },

    /// The dateTime sort column appeared after other sort columns
    #[error("The dateTime column must be the first sort column")]
    DateTimeSortNotFirst,

    /// topN was requested without any metric sort to rank by
    #[error("TopN requires at least one metric sort column")]
    TopNUnsorted,

    /// A numeric parameter was not a positive integer
    #[error("Parameter '{parameter}' expected a positive integer but received '{value}'")]
    InvalidInteger { parameter: String, value: String },
}

impl RequestError {
    /// Stable identifier for client-side classification
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::AcceptFormatInvalid { .. } => "ACCEPT_FORMAT_INVALID",
            Self::InvalidAsyncAfter { .. } => "INVALID_ASYNC_AFTER",
            Self::InvalidPagination(_) => "INVALID_PAGINATION",
            Self::DimensionsUndefined { .. } => "DIMENSIONS_UNDEFINED",
            Self::DimensionsNotInTable { .. } => "DIMENSIONS_NOT_IN_TABLE",
            Self::DimensionFieldsUndefined { .. } => "DIMENSION_FIELDS_UNDEFINED",
            Self::MetricsUndefined { .. } => "METRICS_UNDEFINED",
            Self::MetricsNotInTable { .. } => "METRICS_NOT_IN_TABLE",
            Self::IntervalMissing => "INTERVAL_MISSING",
            Self::IntervalInvalid { .. } => "INTERVAL_INVALID",
            Self::IntervalZeroLength { .. } => "INTERVAL_ZERO_LENGTH",
            Self::InvalidIntervalGranularity { .. } => "INVALID_INTERVAL_GRANULARITY",
            Self::InvalidTimeZone { .. } => "INVALID_TIME_ZONE",
            Self::TimeAlignment { .. } => "TIME_ALIGNMENT",
            Self::UnknownGranularity(_) => "UNKNOWN_GRANULARITY",
            Self::BadFilter(_) => "FILTER_INVALID",
            Self::FilterDimensionNotInTable { .. } => "FILTER_DIMENSION_NOT_IN_TABLE",
            Self::FilterSubstringOperationsDisabled => "FILTER_SUBSTRING_OPERATIONS_DISABLED",
            Self::BadHaving(_) => "HAVING_INVALID",
            Self::HavingMetricsNotInQuery { .. } => "HAVING_METRICS_NOT_IN_QUERY",
            Self::SortDirectionInvalid { .. } => "SORT_DIRECTION_INVALID",
            Self::SortMetricsUndefined { .. } => "SORT_METRICS_UNDEFINED",
            Self::SortMetricsNotInQuery { .. } => "SORT_METRICS_NOT_IN_QUERY",
            Self::DateTimeSortNotFirst => "DATE_TIME_SORT_NOT_FIRST",
            Self::TopNUnsorted => "TOP_N_UNSORTED",
            Self::InvalidInteger { .. } => "INTEGER_INVALID",
        }
    }
}

/// Quote and join names for batched error messages
fn join_names(names: &[String]) -> String {
    let quoted: Vec<String> = names.iter().map(|name| format!("'{}'", name)).collect();
    quoted.join(", ")
}

/// Render intervals in their wire form for alignment messages
fn join_intervals(intervals: &[Interval]) -> String {
    let rendered: Vec<String> = intervals.iter().map(|i| i.to_string()).collect();
    rendered.join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batched_messages_list_every_name() {
        let err = RequestError::DimensionsUndefined {
            names: vec!["foo".to_string(), "bar".to_string()],
        };
        assert_eq!(err.to_string(), "Dimension(s) 'foo', 'bar' do not exist");
        assert_eq!(err.error_code(), "DIMENSIONS_UNDEFINED");
    }

    #[test]
    fn test_table_membership_message_names_the_table() {
        let err = RequestError::MetricsNotInTable {
            names: vec!["clicks".to_string()],
            table: "network".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Metric(s) 'clicks' are not supported by the table 'network'"
        );
    }

    #[test]
    fn test_wrapped_errors_surface_their_own_message() {
        let err = RequestError::from(GranularityParseError {
            name: "fortnight".to_string(),
        });
        assert_eq!(err.error_code(), "UNKNOWN_GRANULARITY");
        assert!(err.to_string().contains("fortnight"));
    }

    #[test]
    fn test_error_codes_are_screaming_snake() {
        let errors = [
            RequestError::IntervalMissing,
            RequestError::DateTimeSortNotFirst,
            RequestError::TopNUnsorted,
            RequestError::FilterSubstringOperationsDisabled,
        ];
        for err in &errors {
            let code = err.error_code();
            assert!(code
                .chars()
                .all(|c| c.is_ascii_uppercase() || c == '_'));
        }
    }
}
