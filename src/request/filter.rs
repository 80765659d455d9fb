//! Filter Expression Parsing
//!
//! Filters constrain dimension rows before aggregation. Each token names a
//! dimension, an optional field (defaulting to the dimension's key field),
//! an operation, and a bracketed value list:
//!
//! ```text
//! age.id-in[5,6,7]
//! gender.desc-notin[unknown]
//! city-contains[york]           field omitted, key field assumed
//! user.email-isnull[]           null checks take no values
//! ```
//!
//! Token parsing is fail-fast: the first bad token rejects the request.
//! Tokens that parse are then checked against the table and the substring
//! feature flag, in order.

use std::sync::Arc;

use nom::{
    bytes::complete::{take_while, take_while1},
    character::complete::char,
    combinator::{all_consuming, map, opt, recognize},
    multi::separated_list0,
    sequence::{delimited, pair, preceded},
    IResult,
};
use thiserror::Error;

use crate::error::{RequestError, RequestResult};
use crate::request::split::split_bracketed_list;
use crate::schema::{Dimension, DimensionDictionary, DimensionField, LogicalTable};

/// Token-level filter failures; the first one aborts filter parsing
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    /// The token does not match the filter grammar
    #[error("Filter expression '{expression}' is malformed; expected 'dimension.field-operation[values]'")]
    Malformed { expression: String },

    /// The query's bracket structure is not a flat list of value lists
    #[error("Filter expression '{expression}' has unbalanced or nested brackets")]
    UnbalancedBrackets { expression: String },

    /// No dictionary entry for the dimension name
    #[error("Filter dimension '{name}' does not exist")]
    DimensionUndefined { name: String },

    /// The dimension does not declare the requested field
    #[error("Filter field '{field}' does not exist for dimension '{dimension}'")]
    FieldUndefined { field: String, dimension: String },

    /// Unknown operation name
    #[error("Filter operation '{operation}' is not recognized")]
    OperationInvalid { operation: String },

    /// The operation needs values but the list was empty
    #[error("Filter operation '{operation}' requires at least one value")]
    EmptyValues { operation: String },
}

/// Row-level filter operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOperation {
    /// Row value is one of the listed values
    In,
    /// Row value is none of the listed values
    NotIn,
    /// Row value equals the single listed value
    Eq,
    /// Row value differs from the listed values
    NotEq,
    /// Row value starts with the listed prefix
    StartsWith,
    /// Row value contains the listed substring
    Contains,
    /// Row value is absent
    IsNull,
    /// Row value is present
    NotNull,
}

impl FilterOperation {
    /// Parse from string, accepting hyphenated aliases
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "in" => Some(Self::In),
            "notin" | "not-in" => Some(Self::NotIn),
            "eq" | "equals" => Some(Self::Eq),
            "noteq" | "not-equals" | "neq" => Some(Self::NotEq),
            "startswith" | "starts-with" => Some(Self::StartsWith),
            "contains" => Some(Self::Contains),
            "isnull" | "is-null" => Some(Self::IsNull),
            "notnull" | "not-null" => Some(Self::NotNull),
            _ => None,
        }
    }

    /// Canonical operation name
    pub fn name(&self) -> &'static str {
        match self {
            Self::In => "in",
            Self::NotIn => "notin",
            Self::Eq => "eq",
            Self::NotEq => "noteq",
            Self::StartsWith => "startswith",
            Self::Contains => "contains",
            Self::IsNull => "isnull",
            Self::NotNull => "notnull",
        }
    }

    /// True for the operations behind the substring feature flag
    pub fn is_substring(&self) -> bool {
        matches!(self, Self::StartsWith | Self::Contains)
    }

    /// True when an empty value list is meaningful
    pub fn allows_empty_values(&self) -> bool {
        matches!(self, Self::IsNull | Self::NotNull)
    }
}

impl std::fmt::Display for FilterOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// One parsed and schema-bound filter
#[derive(Debug, Clone, PartialEq)]
pub struct ApiFilter {
    dimension: Arc<Dimension>,
    field: DimensionField,
    operation: FilterOperation,
    values: Vec<String>,
}

impl ApiFilter {
    /// Parse a single filter token and bind it to the dictionary
    pub fn parse(token: &str, dictionary: &DimensionDictionary) -> Result<Self, FilterError> {
        let parts = lex_filter_token(token)?;

        let dimension = dictionary
            .find_by_api_name(parts.dimension)
            .ok_or_else(|| FilterError::DimensionUndefined {
                name: parts.dimension.to_string(),
            })?;

        let field = match parts.field {
            Some(name) => dimension
                .find_field(name)
                .cloned()
                .ok_or_else(|| FilterError::FieldUndefined {
                    field: name.to_string(),
                    dimension: dimension.api_name().to_string(),
                })?,
            None => dimension.key().clone(),
        };

        let operation =
            FilterOperation::from_str(parts.operation).ok_or_else(|| {
                FilterError::OperationInvalid {
                    operation: parts.operation.to_string(),
                }
            })?;

        if parts.values.is_empty() && !operation.allows_empty_values() {
            return Err(FilterError::EmptyValues {
                operation: operation.name().to_string(),
            });
        }

        Ok(Self {
            dimension,
            field,
            operation,
            values: parts.values,
        })
    }

    /// The filtered dimension
    pub fn dimension(&self) -> &Arc<Dimension> {
        &self.dimension
    }

    /// The filtered field
    pub fn field(&self) -> &DimensionField {
        &self.field
    }

    /// The comparison operation
    pub fn operation(&self) -> FilterOperation {
        self.operation
    }

    /// The raw values, in request order
    pub fn values(&self) -> &[String] {
        &self.values
    }

    /// True when this filter pins its dimension to exactly one key value
    ///
    /// Grouping-free use of a non-aggregatable dimension is only sound when
    /// a filter narrows it to a single row: key field, one value, and an
    /// `in` or `eq` operation.
    pub fn constrains_single_row(&self) -> bool {
        self.field == *self.dimension.key()
            && self.values.len() == 1
            && matches!(self.operation, FilterOperation::In | FilterOperation::Eq)
    }
}

impl std::fmt::Display for ApiFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}.{}-{}[{}]",
            self.dimension.api_name(),
            self.field.name(),
            self.operation,
            self.values.join(",")
        )
    }
}

/// Filters grouped by dimension, in first-appearance order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApiFilterMap {
    groups: Vec<(Arc<Dimension>, Vec<ApiFilter>)>,
}

impl ApiFilterMap {
    /// Create an empty map
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a filter to its dimension's group
    pub fn insert(&mut self, filter: ApiFilter) {
        let position = self
            .groups
            .iter()
            .position(|(dimension, _)| dimension.api_name() == filter.dimension().api_name());
        match position {
            Some(index) => self.groups[index].1.push(filter),
            None => {
                let dimension = Arc::clone(filter.dimension());
                self.groups.push((dimension, vec![filter]));
            }
        }
    }

    /// Filters for a dimension, by API name
    pub fn get(&self, api_name: &str) -> Option<&[ApiFilter]> {
        self.groups
            .iter()
            .find(|(dimension, _)| dimension.api_name() == api_name)
            .map(|(_, filters)| filters.as_slice())
    }

    /// The filtered dimensions, in first-appearance order
    pub fn dimensions(&self) -> impl Iterator<Item = &Arc<Dimension>> {
        self.groups.iter().map(|(dimension, _)| dimension)
    }

    /// Iterate groups in first-appearance order
    pub fn iter(&self) -> impl Iterator<Item = (&Arc<Dimension>, &[ApiFilter])> {
        self.groups
            .iter()
            .map(|(dimension, filters)| (dimension, filters.as_slice()))
    }

    /// Number of filtered dimensions
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// True when no filters were requested
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// Parse a raw filter query into filters grouped by dimension
///
/// An empty query is an empty map. Token errors are fail-fast; table
/// membership and the substring flag are enforced per token, in order.
pub fn generate_filters(
    filter_query: &str,
    table: &LogicalTable,
    dictionary: &DimensionDictionary,
    substring_operations_enabled: bool,
) -> RequestResult<ApiFilterMap> {
    let filter_query = filter_query.trim();
    let mut filters = ApiFilterMap::new();
    if filter_query.is_empty() {
        return Ok(filters);
    }

    let tokens = split_bracketed_list(filter_query).map_err(|_| {
        tracing::debug!("Filter query '{}' has bad bracket structure", filter_query);
        FilterError::UnbalancedBrackets {
            expression: filter_query.to_string(),
        }
    })?;

    for token in tokens {
        let token = token.trim();
        let filter = ApiFilter::parse(token, dictionary).map_err(|e| {
            tracing::debug!("Filter token '{}' rejected: {}", token, e);
            e
        })?;

        if !table.has_dimension(filter.dimension().api_name()) {
            tracing::debug!(
                "Filter dimension '{}' is not in table '{}'",
                filter.dimension().api_name(),
                table.name()
            );
            return Err(RequestError::FilterDimensionNotInTable {
                dimension: filter.dimension().api_name().to_string(),
                table: table.name().to_string(),
            });
        }

        if !substring_operations_enabled && filter.operation().is_substring() {
            tracing::debug!(
                "Filter token '{}' uses a disabled substring operation",
                token
            );
            return Err(RequestError::FilterSubstringOperationsDisabled);
        }

        filters.insert(filter);
    }

    tracing::trace!("Generated filters for {} dimension(s)", filters.len());
    Ok(filters)
}

struct FilterTokenParts<'a> {
    dimension: &'a str,
    field: Option<&'a str>,
    operation: &'a str,
    values: Vec<String>,
}

fn lex_filter_token(token: &str) -> Result<FilterTokenParts<'_>, FilterError> {
    match all_consuming(filter_token)(token) {
        Ok((_, parts)) => Ok(parts),
        Err(_) => Err(FilterError::Malformed {
            expression: token.to_string(),
        }),
    }
}

fn filter_token(input: &str) -> IResult<&str, FilterTokenParts<'_>> {
    let (input, dimension) = parse_identifier(input)?;
    let (input, field) = opt(preceded(char('.'), parse_identifier))(input)?;
    let (input, _) = char('-')(input)?;
    let (input, operation) = take_while1(|c| c != '[')(input)?;
    let (input, values) = parse_value_list(input)?;

    Ok((
        input,
        FilterTokenParts {
            dimension,
            field,
            operation,
            values,
        },
    ))
}

/// Parse a bracketed comma-separated value list
pub(crate) fn parse_value_list(input: &str) -> IResult<&str, Vec<String>> {
    delimited(
        char('['),
        separated_list0(
            char(','),
            map(take_while1(|c| c != ',' && c != ']'), |v: &str| {
                v.to_string()
            }),
        ),
        char(']'),
    )(input)
}

/// Parse identifier (dimension name, field name, etc.)
pub(crate) fn parse_identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        take_while1(|c: char| c.is_alphabetic() || c == '_'),
        take_while(|c: char| c.is_alphanumeric() || c == '_'),
    ))(input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::LogicalMetric;
    use crate::schema::MetricDictionary;

    fn catalog() -> (DimensionDictionary, LogicalTable) {
        let mut dictionary = DimensionDictionary::new();
        let age = dictionary.add(
            Dimension::new("age", "id")
                .with_field("desc", "Age bucket description"),
        );
        let gender = dictionary.add(Dimension::new("gender", "id"));
        dictionary.add(Dimension::new("country", "id"));

        let table = LogicalTable::new("network")
            .with_dimension(age)
            .with_dimension(gender);
        (dictionary, table)
    }

    #[test]
    fn test_parse_filter_with_field() {
        let (dictionary, _) = catalog();
        let filter = ApiFilter::parse("age.id-in[5,6,7]", &dictionary).unwrap();

        assert_eq!(filter.dimension().api_name(), "age");
        assert_eq!(filter.field().name(), "id");
        assert_eq!(filter.operation(), FilterOperation::In);
        assert_eq!(filter.values(), &["5", "6", "7"]);
    }

    #[test]
    fn test_parse_filter_defaults_to_key_field() {
        let (dictionary, _) = catalog();
        let filter = ApiFilter::parse("age-notin[1]", &dictionary).unwrap();
        assert_eq!(filter.field().name(), "id");
        assert_eq!(filter.operation(), FilterOperation::NotIn);
    }

    #[test]
    fn test_parse_filter_hyphenated_aliases() {
        let (dictionary, _) = catalog();
        let filter = ApiFilter::parse("age.id-not-in[1,2]", &dictionary).unwrap();
        assert_eq!(filter.operation(), FilterOperation::NotIn);

        let filter = ApiFilter::parse("age.desc-starts-with[you]", &dictionary).unwrap();
        assert_eq!(filter.operation(), FilterOperation::StartsWith);
    }

    #[test]
    fn test_parse_filter_values_keep_spaces() {
        let (dictionary, _) = catalog();
        let filter = ApiFilter::parse("age.desc-in[New York,Los Angeles]", &dictionary).unwrap();
        assert_eq!(filter.values(), &["New York", "Los Angeles"]);
    }

    #[test]
    fn test_parse_filter_unknown_dimension() {
        let (dictionary, _) = catalog();
        let err = ApiFilter::parse("planet.id-in[1]", &dictionary).unwrap_err();
        assert_eq!(
            err,
            FilterError::DimensionUndefined {
                name: "planet".to_string()
            }
        );
    }

    #[test]
    fn test_parse_filter_unknown_field() {
        let (dictionary, _) = catalog();
        let err = ApiFilter::parse("age.shoe_size-in[1]", &dictionary).unwrap_err();
        assert_eq!(
            err,
            FilterError::FieldUndefined {
                field: "shoe_size".to_string(),
                dimension: "age".to_string()
            }
        );
    }

    #[test]
    fn test_parse_filter_unknown_operation() {
        let (dictionary, _) = catalog();
        let err = ApiFilter::parse("age.id-between[1,5]", &dictionary).unwrap_err();
        assert_eq!(
            err,
            FilterError::OperationInvalid {
                operation: "between".to_string()
            }
        );
    }

    #[test]
    fn test_parse_filter_empty_values() {
        let (dictionary, _) = catalog();

        // Null checks take no values
        let filter = ApiFilter::parse("age.id-isnull[]", &dictionary).unwrap();
        assert_eq!(filter.operation(), FilterOperation::IsNull);
        assert!(filter.values().is_empty());

        // Everything else requires at least one
        let err = ApiFilter::parse("age.id-in[]", &dictionary).unwrap_err();
        assert_eq!(
            err,
            FilterError::EmptyValues {
                operation: "in".to_string()
            }
        );
    }

    #[test]
    fn test_parse_filter_malformed_tokens() {
        let (dictionary, _) = catalog();
        for token in ["age.id-in", "age.id[5]", "-in[5]", "age..id-in[5]", ""] {
            let err = ApiFilter::parse(token, &dictionary).unwrap_err();
            assert!(
                matches!(err, FilterError::Malformed { .. }),
                "expected malformed for '{token}', got {err:?}"
            );
        }
    }

    #[test]
    fn test_constrains_single_row() {
        let (dictionary, _) = catalog();

        let single = ApiFilter::parse("age-eq[5]", &dictionary).unwrap();
        assert!(single.constrains_single_row());

        let multi_value = ApiFilter::parse("age-in[5,6]", &dictionary).unwrap();
        assert!(!multi_value.constrains_single_row());

        let non_key = ApiFilter::parse("age.desc-eq[adult]", &dictionary).unwrap();
        assert!(!non_key.constrains_single_row());

        let excluded = ApiFilter::parse("age-notin[5]", &dictionary).unwrap();
        assert!(!excluded.constrains_single_row());
    }

    #[test]
    fn test_generate_filters_groups_by_dimension_in_order() {
        let (dictionary, table) = catalog();
        let filters = generate_filters(
            "gender.id-eq[m],age.id-in[2,3],gender.id-notin[u]",
            &table,
            &dictionary,
            false,
        )
        .unwrap();

        assert_eq!(filters.len(), 2);
        let order: Vec<&str> = filters.dimensions().map(|d| d.api_name()).collect();
        assert_eq!(order, vec!["gender", "age"]);
        assert_eq!(filters.get("gender").unwrap().len(), 2);
        assert_eq!(filters.get("age").unwrap().len(), 1);
    }

    #[test]
    fn test_generate_filters_empty_query() {
        let (dictionary, table) = catalog();
        let filters = generate_filters("", &table, &dictionary, false).unwrap();
        assert!(filters.is_empty());
    }

    #[test]
    fn test_generate_filters_fails_fast_on_first_bad_token() {
        let (dictionary, table) = catalog();
        let err = generate_filters(
            "age.id-in[1],bogus.id-in[2],planet.id-in[3]",
            &table,
            &dictionary,
            false,
        )
        .unwrap_err();

        // Only the first unknown dimension is reported
        match err {
            RequestError::BadFilter(FilterError::DimensionUndefined { name }) => {
                assert_eq!(name, "bogus")
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_generate_filters_table_membership() {
        let (dictionary, table) = catalog();
        let err =
            generate_filters("country.id-in[US]", &table, &dictionary, false).unwrap_err();
        match err {
            RequestError::FilterDimensionNotInTable { dimension, table } => {
                assert_eq!(dimension, "country");
                assert_eq!(table, "network");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_generate_filters_substring_flag() {
        let (dictionary, table) = catalog();

        let err = generate_filters("age.desc-contains[old]", &table, &dictionary, false)
            .unwrap_err();
        assert!(matches!(
            err,
            RequestError::FilterSubstringOperationsDisabled
        ));

        let filters =
            generate_filters("age.desc-contains[old]", &table, &dictionary, true).unwrap();
        assert_eq!(filters.get("age").unwrap().len(), 1);
    }

    #[test]
    fn test_generate_filters_bad_brackets() {
        let (dictionary, table) = catalog();
        let err = generate_filters("age.id-in[1", &table, &dictionary, false).unwrap_err();
        match err {
            RequestError::BadFilter(FilterError::UnbalancedBrackets { expression }) => {
                assert_eq!(expression, "age.id-in[1")
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_metric_dictionary_is_not_consulted() {
        // Filters only bind dimensions; a same-named metric changes nothing
        let (dictionary, table) = catalog();
        let mut metrics = MetricDictionary::new();
        metrics.add(LogicalMetric::new("age"));

        let filters = generate_filters("age.id-eq[1]", &table, &dictionary, false).unwrap();
        assert_eq!(filters.len(), 1);
    }
}
