//! Having Expression Parsing
//!
//! Havings constrain aggregated metric values after grouping. Each token
//! names a requested metric, a comparison, and a bracketed numeric list:
//!
//! ```text
//! height-gt[10]
//! width-notGreaterThan[5,10]
//! depth-eq[1.5]
//! ```
//!
//! Token parsing is fail-fast like filters, but the requested-set check is
//! batched: every having metric missing from the requested metric set is
//! collected and reported in one error.

use std::sync::Arc;

use nom::{
    bytes::complete::take_while1, character::complete::char, combinator::all_consuming, IResult,
};
use thiserror::Error;

use crate::error::{RequestError, RequestResult};
use crate::request::filter::{parse_identifier, parse_value_list};
use crate::request::split::split_bracketed_list;
use crate::schema::{LogicalMetric, MetricDictionary};

/// Token-level having failures; the first one aborts having parsing
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HavingError {
    /// The token does not match the having grammar
    #[error("Having expression '{expression}' is malformed; expected 'metric-operation[values]'")]
    Malformed { expression: String },

    /// The query's bracket structure is not a flat list of value lists
    #[error("Having expression '{expression}' has unbalanced or nested brackets")]
    UnbalancedBrackets { expression: String },

    /// No dictionary entry for the metric name
    #[error("Having metric '{name}' does not exist")]
    MetricUndefined { name: String },

    /// Unknown operation name
    #[error("Having operation '{operation}' is not recognized")]
    OperationInvalid { operation: String },

    /// A value failed to parse as a number
    #[error("Having value '{value}' is not a number")]
    NonNumericValue { value: String },

    /// The value list was empty
    #[error("Having operation '{operation}' requires at least one value")]
    EmptyValues { operation: String },
}

/// Aggregate-value comparisons
///
/// `NotGreaterThan` and `NotLessThan` double as the inclusive bounds, so
/// `lte` and `gte` parse to them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HavingOperation {
    EqualTo,
    NotEqualTo,
    GreaterThan,
    NotGreaterThan,
    LessThan,
    NotLessThan,
}

impl HavingOperation {
    /// Parse from string, accepting spelled-out and inclusive-bound aliases
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "eq" | "equal" | "equals" | "equalto" => Some(Self::EqualTo),
            "noteq" | "notequal" | "notequals" | "notequalto" | "neq" => Some(Self::NotEqualTo),
            "gt" | "greater" | "greaterthan" => Some(Self::GreaterThan),
            "notgt" | "notgreater" | "notgreaterthan" | "lte" => Some(Self::NotGreaterThan),
            "lt" | "less" | "lessthan" => Some(Self::LessThan),
            "notlt" | "notless" | "notlessthan" | "gte" => Some(Self::NotLessThan),
            _ => None,
        }
    }

    /// Canonical operation name
    pub fn name(&self) -> &'static str {
        match self {
            Self::EqualTo => "eq",
            Self::NotEqualTo => "noteq",
            Self::GreaterThan => "gt",
            Self::NotGreaterThan => "notgt",
            Self::LessThan => "lt",
            Self::NotLessThan => "notlt",
        }
    }

    /// Whether an aggregate value satisfies this comparison against any
    /// listed value
    pub fn evaluate(&self, aggregate: f64, values: &[f64]) -> bool {
        values.iter().any(|&v| match self {
            Self::EqualTo => aggregate == v,
            Self::NotEqualTo => aggregate != v,
            Self::GreaterThan => aggregate > v,
            Self::NotGreaterThan => aggregate <= v,
            Self::LessThan => aggregate < v,
            Self::NotLessThan => aggregate >= v,
        })
    }
}

impl std::fmt::Display for HavingOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// One parsed and schema-bound having
#[derive(Debug, Clone, PartialEq)]
pub struct ApiHaving {
    metric: Arc<LogicalMetric>,
    operation: HavingOperation,
    values: Vec<f64>,
}

impl ApiHaving {
    /// Parse a single having token and bind it to the dictionary
    pub fn parse(token: &str, dictionary: &MetricDictionary) -> Result<Self, HavingError> {
        let parts = lex_having_token(token)?;

        let metric = dictionary
            .find_by_name(parts.metric)
            .ok_or_else(|| HavingError::MetricUndefined {
                name: parts.metric.to_string(),
            })?;

        let operation =
            HavingOperation::from_str(parts.operation).ok_or_else(|| {
                HavingError::OperationInvalid {
                    operation: parts.operation.to_string(),
                }
            })?;

        if parts.values.is_empty() {
            return Err(HavingError::EmptyValues {
                operation: operation.name().to_string(),
            });
        }

        let mut values = Vec::with_capacity(parts.values.len());
        for raw in &parts.values {
            let value = raw
                .trim()
                .parse::<f64>()
                .map_err(|_| HavingError::NonNumericValue { value: raw.clone() })?;
            values.push(value);
        }

        Ok(Self {
            metric,
            operation,
            values,
        })
    }

    /// The constrained metric
    pub fn metric(&self) -> &Arc<LogicalMetric> {
        &self.metric
    }

    /// The comparison operation
    pub fn operation(&self) -> HavingOperation {
        self.operation
    }

    /// The numeric comparison values, in request order
    pub fn values(&self) -> &[f64] {
        &self.values
    }
}

impl std::fmt::Display for ApiHaving {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let values: Vec<String> = self.values.iter().map(|v| v.to_string()).collect();
        write!(
            f,
            "{}-{}[{}]",
            self.metric.name(),
            self.operation,
            values.join(",")
        )
    }
}

/// Havings grouped by metric, in first-appearance order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApiHavingMap {
    groups: Vec<(Arc<LogicalMetric>, Vec<ApiHaving>)>,
}

impl ApiHavingMap {
    /// Create an empty map
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a having to its metric's group
    pub fn insert(&mut self, having: ApiHaving) {
        let position = self
            .groups
            .iter()
            .position(|(metric, _)| metric.name() == having.metric().name());
        match position {
            Some(index) => self.groups[index].1.push(having),
            None => {
                let metric = Arc::clone(having.metric());
                self.groups.push((metric, vec![having]));
            }
        }
    }

    /// Havings for a metric, by name
    pub fn get(&self, name: &str) -> Option<&[ApiHaving]> {
        self.groups
            .iter()
            .find(|(metric, _)| metric.name() == name)
            .map(|(_, havings)| havings.as_slice())
    }

    /// The constrained metrics, in first-appearance order
    pub fn metrics(&self) -> impl Iterator<Item = &Arc<LogicalMetric>> {
        self.groups.iter().map(|(metric, _)| metric)
    }

    /// Iterate groups in first-appearance order
    pub fn iter(&self) -> impl Iterator<Item = (&Arc<LogicalMetric>, &[ApiHaving])> {
        self.groups
            .iter()
            .map(|(metric, havings)| (metric, havings.as_slice()))
    }

    /// Number of constrained metrics
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// True when no havings were requested
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// Parse a raw having query into havings grouped by metric
///
/// An empty query is an empty map. Token errors are fail-fast. Metrics
/// that resolve but are not in the requested set are collected across the
/// whole query and reported together.
pub fn generate_havings(
    having_query: &str,
    requested_metrics: &[Arc<LogicalMetric>],
    dictionary: &MetricDictionary,
) -> RequestResult<ApiHavingMap> {
    let having_query = having_query.trim();
    let mut havings = ApiHavingMap::new();
    if having_query.is_empty() {
        return Ok(havings);
    }

    let tokens = split_bracketed_list(having_query).map_err(|_| {
        tracing::debug!("Having query '{}' has bad bracket structure", having_query);
        HavingError::UnbalancedBrackets {
            expression: having_query.to_string(),
        }
    })?;

    let mut missing: Vec<String> = Vec::new();
    for token in tokens {
        let token = token.trim();
        let having = ApiHaving::parse(token, dictionary).map_err(|e| {
            tracing::debug!("Having token '{}' rejected: {}", token, e);
            e
        })?;

        let requested = requested_metrics
            .iter()
            .any(|metric| metric.name() == having.metric().name());
        if requested {
            havings.insert(having);
        } else if !missing.iter().any(|name| name == having.metric().name()) {
            missing.push(having.metric().name().to_string());
        }
    }

    if !missing.is_empty() {
        tracing::debug!(
            "Having metrics {:?} are not in the requested metric set",
            missing
        );
        return Err(RequestError::HavingMetricsNotInQuery { names: missing });
    }

    tracing::trace!("Generated havings for {} metric(s)", havings.len());
    Ok(havings)
}

struct HavingTokenParts<'a> {
    metric: &'a str,
    operation: &'a str,
    values: Vec<String>,
}

fn lex_having_token(token: &str) -> Result<HavingTokenParts<'_>, HavingError> {
    match all_consuming(having_token)(token) {
        Ok((_, parts)) => Ok(parts),
        Err(_) => Err(HavingError::Malformed {
            expression: token.to_string(),
        }),
    }
}

fn having_token(input: &str) -> IResult<&str, HavingTokenParts<'_>> {
    let (input, metric) = parse_identifier(input)?;
    let (input, _) = char('-')(input)?;
    let (input, operation) = take_while1(|c| c != '[')(input)?;
    let (input, values) = parse_value_list(input)?;

    Ok((
        input,
        HavingTokenParts {
            metric,
            operation,
            values,
        },
    ))
}
