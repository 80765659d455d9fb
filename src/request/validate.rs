//! Schema Resolution and Validation
//!
//! Requested dimension and metric names are resolved against the
//! dictionaries and checked against the queried table. Every check here is
//! batched: all offending names in one pass are collected and reported in
//! a single error, so clients can fix a request in one round trip.
//!
//! Dimension path segments may carry a field projection as a matrix
//! parameter, `dimension;show=field1,field2`. Without one, the dimension's
//! default projection applies.

use std::sync::Arc;

use crate::error::{RequestError, RequestResult};
use crate::schema::{
    Dimension, DimensionDictionary, DimensionField, LogicalMetric, LogicalTable, MetricDictionary,
};

/// Resolve dimension path segments against the dictionary
///
/// Segment order is kept, duplicates collapse to their first appearance,
/// and empty segments are ignored. Unknown names are batched into one
/// `DimensionsUndefined` error.
pub fn generate_dimensions(
    segments: &[String],
    dictionary: &DimensionDictionary,
) -> RequestResult<Vec<Arc<Dimension>>> {
    let mut dimensions: Vec<Arc<Dimension>> = Vec::new();
    let mut undefined: Vec<String> = Vec::new();

    for segment in segments {
        let name = dimension_name(segment);
        if name.is_empty() {
            continue;
        }

        match dictionary.find_by_api_name(name) {
            Some(dimension) => {
                if !dimensions.iter().any(|d| d.api_name() == name) {
                    dimensions.push(dimension);
                }
            }
            None => {
                if !undefined.iter().any(|n| n == name) {
                    undefined.push(name.to_string());
                }
            }
        }
    }

    if !undefined.is_empty() {
        tracing::debug!("Dimensions {:?} are not defined", undefined);
        return Err(RequestError::DimensionsUndefined { names: undefined });
    }

    tracing::trace!("Resolved {} dimension(s)", dimensions.len());
    Ok(dimensions)
}

/// Check that every requested dimension belongs to the table
pub fn validate_request_dimensions(
    dimensions: &[Arc<Dimension>],
    table: &LogicalTable,
) -> RequestResult<()> {
    let missing: Vec<String> = dimensions
        .iter()
        .filter(|dimension| !table.has_dimension(dimension.api_name()))
        .map(|dimension| dimension.api_name().to_string())
        .collect();

    if !missing.is_empty() {
        tracing::debug!(
            "Dimensions {:?} are not in table '{}'",
            missing,
            table.name()
        );
        return Err(RequestError::DimensionsNotInTable {
            names: missing,
            table: table.name().to_string(),
        });
    }
    Ok(())
}

/// Resolve the field projection for each requested dimension
///
/// Looks for a `;show=f1,f2` matrix parameter on each segment. Unknown
/// field names for one dimension are batched into a single
/// `DimensionFieldsUndefined` error.
pub fn generate_dimension_fields(
    segments: &[String],
    dictionary: &DimensionDictionary,
) -> RequestResult<Vec<(Arc<Dimension>, Vec<DimensionField>)>> {
    let mut projections: Vec<(Arc<Dimension>, Vec<DimensionField>)> = Vec::new();

    for segment in segments {
        let name = dimension_name(segment);
        if name.is_empty() {
            continue;
        }

        // Unknown dimensions were already reported by generate_dimensions
        let dimension = match dictionary.find_by_api_name(name) {
            Some(dimension) => dimension,
            None => continue,
        };
        if projections.iter().any(|(d, _)| d.api_name() == name) {
            continue;
        }

        let fields = match show_parameter(segment) {
            Some(show) => {
                let mut fields: Vec<DimensionField> = Vec::new();
                let mut undefined: Vec<String> = Vec::new();
                for field_name in show.split(',').map(str::trim).filter(|f| !f.is_empty()) {
                    match dimension.find_field(field_name) {
                        Some(field) => {
                            if !fields.iter().any(|f| f.name() == field_name) {
                                fields.push(field.clone());
                            }
                        }
                        None => {
                            if !undefined.iter().any(|n| n == field_name) {
                                undefined.push(field_name.to_string());
                            }
                        }
                    }
                }
                if !undefined.is_empty() {
                    tracing::debug!(
                        "Fields {:?} are not defined for dimension '{}'",
                        undefined,
                        name
                    );
                    return Err(RequestError::DimensionFieldsUndefined {
                        fields: undefined,
                        dimension: name.to_string(),
                    });
                }
                fields
            }
            None => dimension.default_fields().to_vec(),
        };

        projections.push((dimension, fields));
    }

    Ok(projections)
}

/// Resolve the comma-separated metric query against the dictionary
///
/// Order is kept, duplicates collapse, empty names are ignored. Unknown
/// names are batched into one `MetricsUndefined` error.
pub fn generate_logical_metrics(
    metric_query: &str,
    dictionary: &MetricDictionary,
) -> RequestResult<Vec<Arc<LogicalMetric>>> {
    let mut metrics: Vec<Arc<LogicalMetric>> = Vec::new();
    let mut undefined: Vec<String> = Vec::new();

    for name in metric_query.split(',').map(str::trim).filter(|n| !n.is_empty()) {
        match dictionary.find_by_name(name) {
            Some(metric) => {
                if !metrics.iter().any(|m| m.name() == name) {
                    metrics.push(metric);
                }
            }
            None => {
                if !undefined.iter().any(|n| n == name) {
                    undefined.push(name.to_string());
                }
            }
        }
    }

    if !undefined.is_empty() {
        tracing::debug!("Metrics {:?} are not defined", undefined);
        return Err(RequestError::MetricsUndefined { names: undefined });
    }

    tracing::trace!("Resolved {} metric(s)", metrics.len());
    Ok(metrics)
}

/// Check that every requested metric belongs to the table
pub fn validate_metrics(
    metrics: &[Arc<LogicalMetric>],
    table: &LogicalTable,
) -> RequestResult<()> {
    let missing: Vec<String> = metrics
        .iter()
        .filter(|metric| !table.has_metric(metric.name()))
        .map(|metric| metric.name().to_string())
        .collect();

    if !missing.is_empty() {
        tracing::debug!("Metrics {:?} are not in table '{}'", missing, table.name());
        return Err(RequestError::MetricsNotInTable {
            names: missing,
            table: table.name().to_string(),
        });
    }
    Ok(())
}

/// Parse an optional positive integer parameter such as `count` or `topN`
pub fn generate_positive_integer(value: &str, parameter: &str) -> RequestResult<Option<u64>> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }

    value
        .parse::<u64>()
        .ok()
        .filter(|parsed| *parsed > 0)
        .map(Some)
        .ok_or_else(|| {
            tracing::debug!("Parameter '{}' got non-positive value '{}'", parameter, value);
            RequestError::InvalidInteger {
                parameter: parameter.to_string(),
                value: value.to_string(),
            }
        })
}

fn dimension_name(segment: &str) -> &str {
    match segment.split_once(';') {
        Some((name, _)) => name.trim(),
        None => segment.trim(),
    }
}

fn show_parameter(segment: &str) -> Option<&str> {
    segment
        .split(';')
        .skip(1)
        .map(str::trim)
        .find_map(|part| part.strip_prefix("show="))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> (DimensionDictionary, MetricDictionary, LogicalTable) {
        let mut dimensions = DimensionDictionary::new();
        let age = dimensions.add(
            Dimension::new("age", "id")
                .with_field("desc", "Age bucket description")
                .with_default_fields(&["id", "desc"]),
        );
        let gender = dimensions.add(Dimension::new("gender", "id"));
        dimensions.add(Dimension::new("country", "id"));

        let mut metrics = MetricDictionary::new();
        let height = metrics.add(LogicalMetric::new("height"));
        let width = metrics.add(LogicalMetric::new("width"));
        metrics.add(LogicalMetric::new("depth"));

        let table = LogicalTable::new("network")
            .with_dimension(age)
            .with_dimension(gender)
            .with_metric(height)
            .with_metric(width);

        (dimensions, metrics, table)
    }

    fn segments(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn test_generate_dimensions_keeps_order_and_dedupes() {
        let (dimensions, _, _) = catalog();
        let resolved =
            generate_dimensions(&segments(&["gender", "age", "gender", ""]), &dimensions).unwrap();

        let names: Vec<&str> = resolved.iter().map(|d| d.api_name()).collect();
        assert_eq!(names, vec!["gender", "age"]);
    }

    #[test]
    fn test_generate_dimensions_batches_unknown_names() {
        let (dimensions, _, _) = catalog();
        let err = generate_dimensions(
            &segments(&["age", "planet", "gender", "starship", "planet"]),
            &dimensions,
        )
        .unwrap_err();

        match err {
            RequestError::DimensionsUndefined { names } => {
                assert_eq!(names, vec!["planet", "starship"])
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_generate_dimensions_strips_matrix_parameters() {
        let (dimensions, _, _) = catalog();
        let resolved =
            generate_dimensions(&segments(&["age;show=id"]), &dimensions).unwrap();
        assert_eq!(resolved[0].api_name(), "age");
    }

    #[test]
    fn test_validate_request_dimensions() {
        let (dimensions, _, table) = catalog();
        let resolved = generate_dimensions(&segments(&["age", "gender"]), &dimensions).unwrap();
        assert!(validate_request_dimensions(&resolved, &table).is_ok());

        let with_country =
            generate_dimensions(&segments(&["age", "country"]), &dimensions).unwrap();
        let err = validate_request_dimensions(&with_country, &table).unwrap_err();
        match err {
            RequestError::DimensionsNotInTable { names, table } => {
                assert_eq!(names, vec!["country"]);
                assert_eq!(table, "network");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_generate_dimension_fields_defaults() {
        let (dimensions, _, _) = catalog();
        let projections =
            generate_dimension_fields(&segments(&["age", "gender"]), &dimensions).unwrap();

        // age declared an explicit default projection, gender falls back to
        // its key field
        let age_fields: Vec<&str> = projections[0].1.iter().map(|f| f.name()).collect();
        assert_eq!(age_fields, vec!["id", "desc"]);
        let gender_fields: Vec<&str> = projections[1].1.iter().map(|f| f.name()).collect();
        assert_eq!(gender_fields, vec!["id"]);
    }

    #[test]
    fn test_generate_dimension_fields_show_parameter() {
        let (dimensions, _, _) = catalog();
        let projections =
            generate_dimension_fields(&segments(&["age;show=desc"]), &dimensions).unwrap();
        let fields: Vec<&str> = projections[0].1.iter().map(|f| f.name()).collect();
        assert_eq!(fields, vec!["desc"]);
    }

    #[test]
    fn test_generate_dimension_fields_unknown_fields_batched() {
        let (dimensions, _, _) = catalog();
        let err = generate_dimension_fields(
            &segments(&["age;show=id,shoe_size,hat_size"]),
            &dimensions,
        )
        .unwrap_err();

        match err {
            RequestError::DimensionFieldsUndefined { fields, dimension } => {
                assert_eq!(fields, vec!["shoe_size", "hat_size"]);
                assert_eq!(dimension, "age");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_generate_logical_metrics() {
        let (_, metrics, _) = catalog();
        let resolved = generate_logical_metrics("width,height,width,", &metrics).unwrap();
        let names: Vec<&str> = resolved.iter().map(|m| m.name()).collect();
        assert_eq!(names, vec!["width", "height"]);
    }

    #[test]
    fn test_generate_logical_metrics_batches_unknown_names() {
        let (_, metrics, _) = catalog();
        let err = generate_logical_metrics("height,volume,mass", &metrics).unwrap_err();
        match err {
            RequestError::MetricsUndefined { names } => {
                assert_eq!(names, vec!["volume", "mass"])
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_validate_metrics() {
        let (_, metrics, table) = catalog();
        let resolved = generate_logical_metrics("height,depth", &metrics).unwrap();
        let err = validate_metrics(&resolved, &table).unwrap_err();
        match err {
            RequestError::MetricsNotInTable { names, .. } => assert_eq!(names, vec!["depth"]),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_generate_positive_integer() {
        assert_eq!(generate_positive_integer("", "count").unwrap(), None);
        assert_eq!(generate_positive_integer("5", "count").unwrap(), Some(5));

        for bad in ["0", "-3", "five", "2.5"] {
            let err = generate_positive_integer(bad, "topN").unwrap_err();
            match err {
                RequestError::InvalidInteger { parameter, value } => {
                    assert_eq!(parameter, "topN");
                    assert_eq!(value, bad);
                }
                other => panic!("unexpected error: {other:?}"),
            }
        }
    }
}
