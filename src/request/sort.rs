//! Sort Column Parsing
//!
//! Sorts are comma-separated `name|direction` tokens, direction optional:
//!
//! ```text
//! dateTime|asc,height|desc,width
//! ```
//!
//! The reserved `dateTime` column orders result buckets by time and may
//! only appear first. Every other column must name a requested metric.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{RequestError, RequestResult};
use crate::schema::{LogicalMetric, MetricDictionary};

/// Reserved column name for sorting on the time bucket, matched exactly
pub const DATE_TIME_COLUMN: &str = "dateTime";

/// Sort order for one column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    /// Parse from string (case-insensitive)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "asc" => Some(Self::Asc),
            "desc" => Some(Self::Desc),
            _ => None,
        }
    }

    /// Direction name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

impl std::fmt::Display for SortDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// One sort column with its direction
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderByColumn {
    column: String,
    direction: SortDirection,
}

impl OrderByColumn {
    pub fn new(column: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            column: column.into(),
            direction,
        }
    }

    /// The sorted column name
    pub fn column(&self) -> &str {
        &self.column
    }

    /// The sort direction
    pub fn direction(&self) -> SortDirection {
        self.direction
    }
}

impl std::fmt::Display for OrderByColumn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}|{}", self.column, self.direction)
    }
}

/// Parse a raw sort query into the date-time sort and the metric sorts
///
/// Direction errors are fail-fast. Metric resolution is batched in two
/// passes: names missing from the dictionary first, then names defined but
/// absent from the requested metric set.
pub fn generate_sorts(
    sort_query: &str,
    requested_metrics: &[Arc<LogicalMetric>],
    dictionary: &MetricDictionary,
) -> RequestResult<(Option<OrderByColumn>, Vec<OrderByColumn>)> {
    let sort_query = sort_query.trim();
    if sort_query.is_empty() {
        return Ok((None, Vec::new()));
    }

    let tokens: Vec<&str> = sort_query
        .split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .collect();

    let mut date_time_sort = None;
    let mut metric_sorts: Vec<OrderByColumn> = Vec::new();

    for (index, token) in tokens.iter().enumerate() {
        let (column, direction) = match token.split_once('|') {
            Some((column, raw)) => {
                let raw = raw.trim();
                let direction = SortDirection::from_str(raw).ok_or_else(|| {
                    tracing::debug!("Sort token '{}' has invalid direction '{}'", token, raw);
                    RequestError::SortDirectionInvalid {
                        direction: raw.to_string(),
                    }
                })?;
                (column.trim(), direction)
            }
            None => (*token, SortDirection::Desc),
        };

        if column == DATE_TIME_COLUMN {
            if index != 0 {
                tracing::debug!("Sort column '{}' must come first", DATE_TIME_COLUMN);
                return Err(RequestError::DateTimeSortNotFirst);
            }
            date_time_sort = Some(OrderByColumn::new(column, direction));
        } else {
            metric_sorts.push(OrderByColumn::new(column, direction));
        }
    }

    let mut undefined: Vec<String> = Vec::new();
    for sort in &metric_sorts {
        if dictionary.find_by_name(sort.column()).is_none()
            && !undefined.iter().any(|name| name == sort.column())
        {
            undefined.push(sort.column().to_string());
        }
    }
    if !undefined.is_empty() {
        tracing::debug!("Sort metrics {:?} are not defined", undefined);
        return Err(RequestError::SortMetricsUndefined { names: undefined });
    }

    let mut unrequested: Vec<String> = Vec::new();
    for sort in &metric_sorts {
        let requested = requested_metrics
            .iter()
            .any(|metric| metric.name() == sort.column());
        if !requested && !unrequested.iter().any(|name| name == sort.column()) {
            unrequested.push(sort.column().to_string());
        }
    }
    if !unrequested.is_empty() {
        tracing::debug!(
            "Sort metrics {:?} are not in the requested metric set",
            unrequested
        );
        return Err(RequestError::SortMetricsNotInQuery { names: unrequested });
    }

    tracing::trace!(
        "Generated {} metric sort(s), date-time sort: {}",
        metric_sorts.len(),
        date_time_sort.is_some()
    );
    Ok((date_time_sort, metric_sorts))
}
