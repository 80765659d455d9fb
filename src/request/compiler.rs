//! Request Compilation
//!
//! `RequestCompiler` turns the raw query values of one inbound request
//! into a single immutable `DataRequest`, binding every value in a fixed
//! order: format, pagination, async-after, time zone, granularity,
//! dimensions, dimension fields, metrics, intervals, filters, havings,
//! sorts, count, topN. The first failure aborts compilation; no partially
//! assembled request ever reaches the caller.
//!
//! The compiler owns nothing mutable. Catalogs are shared `Arc`s, so one
//! compiler serves concurrent requests.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use crate::config::RequestConfig;
use crate::error::{RequestError, RequestResult};
use crate::request::filter::{generate_filters, ApiFilterMap};
use crate::request::having::{generate_havings, ApiHavingMap};
use crate::request::pagination::{generate_pagination_parameters, PaginationParameters};
use crate::request::sort::{generate_sorts, OrderByColumn};
use crate::request::types::{AsyncAfter, ResponseFormat};
use crate::request::validate::{
    generate_dimension_fields, generate_dimensions, generate_logical_metrics,
    generate_positive_integer, validate_metrics, validate_request_dimensions,
};
use crate::schema::{
    Dimension, DimensionDictionary, DimensionField, LogicalMetric, LogicalTable, MetricDictionary,
};
use crate::time::{
    resolve_intervals, DateTimeParser, Granularity, GranularityParser, Interval,
    StandardGranularityParser,
};

/// Raw query values for one data request, as the transport layer hands
/// them over
///
/// `None` means the client omitted the value; empty strings are treated as
/// absent everywhere except `format` and `async_after`, which reject an
/// explicitly empty value. Dimension entries are path segments and may
/// carry `;show=` matrix parameters.
#[derive(Debug, Clone, Default)]
pub struct RawDataRequest {
    pub format: Option<String>,
    pub per_page: String,
    pub page: String,
    pub async_after: Option<String>,
    pub time_zone: Option<String>,
    pub granularity: String,
    pub dimensions: Vec<String>,
    pub metrics: Option<String>,
    pub date_time: Option<String>,
    pub filters: Option<String>,
    pub havings: Option<String>,
    pub sorts: Option<String>,
    pub count: Option<String>,
    pub top_n: Option<String>,
}

impl RawDataRequest {
    /// Start a request for the given granularity path token
    pub fn new(granularity: impl Into<String>) -> Self {
        Self {
            granularity: granularity.into(),
            ..Self::default()
        }
    }

    pub fn with_format(mut self, format: &str) -> Self {
        self.format = Some(format.to_string());
        self
    }

    pub fn with_pagination(mut self, per_page: &str, page: &str) -> Self {
        self.per_page = per_page.to_string();
        self.page = page.to_string();
        self
    }

    pub fn with_async_after(mut self, async_after: &str) -> Self {
        self.async_after = Some(async_after.to_string());
        self
    }

    pub fn with_time_zone(mut self, time_zone: &str) -> Self {
        self.time_zone = Some(time_zone.to_string());
        self
    }

    pub fn with_dimensions(mut self, segments: &[&str]) -> Self {
        self.dimensions = segments.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_metrics(mut self, metrics: &str) -> Self {
        self.metrics = Some(metrics.to_string());
        self
    }

    pub fn with_date_time(mut self, date_time: &str) -> Self {
        self.date_time = Some(date_time.to_string());
        self
    }

    pub fn with_filters(mut self, filters: &str) -> Self {
        self.filters = Some(filters.to_string());
        self
    }

    pub fn with_havings(mut self, havings: &str) -> Self {
        self.havings = Some(havings.to_string());
        self
    }

    pub fn with_sorts(mut self, sorts: &str) -> Self {
        self.sorts = Some(sorts.to_string());
        self
    }

    pub fn with_count(mut self, count: &str) -> Self {
        self.count = Some(count.to_string());
        self
    }

    pub fn with_top_n(mut self, top_n: &str) -> Self {
        self.top_n = Some(top_n.to_string());
        self
    }
}

/// Resolve the request time zone, falling back to the configured default
pub fn generate_time_zone(time_zone: Option<&str>, default: Tz) -> RequestResult<Tz> {
    let name = match time_zone {
        Some(name) => name.trim(),
        None => return Ok(default),
    };
    if name.is_empty() {
        return Ok(default);
    }

    name.parse::<Tz>().map_err(|_| {
        tracing::debug!("Unknown time zone '{}'", name);
        RequestError::InvalidTimeZone {
            name: name.to_string(),
        }
    })
}

/// Check that every interval starts and ends on a grain boundary
///
/// The unbounded granularity accepts any interval.
pub fn validate_time_alignment(
    granularity: &Granularity,
    intervals: &[Interval],
) -> RequestResult<()> {
    if granularity.accepts(intervals) {
        return Ok(());
    }

    // accepts can only fail for a bounded grain
    let description = granularity
        .as_grain()
        .map(|grain| grain.alignment_description())
        .unwrap_or_default();

    tracing::debug!(
        "Intervals do not align with granularity '{}'",
        granularity.name()
    );
    Err(RequestError::TimeAlignment {
        intervals: intervals.to_vec(),
        granularity: granularity.name().to_string(),
        description,
    })
}

/// Compiles raw data requests against shared schema catalogs
pub struct RequestCompiler {
    dimension_dictionary: Arc<DimensionDictionary>,
    metric_dictionary: Arc<MetricDictionary>,
    granularity_parser: Box<dyn GranularityParser>,
    config: RequestConfig,
}

impl RequestCompiler {
    /// Create a compiler with the standard granularity vocabulary
    pub fn new(
        dimension_dictionary: Arc<DimensionDictionary>,
        metric_dictionary: Arc<MetricDictionary>,
        config: RequestConfig,
    ) -> Self {
        Self {
            dimension_dictionary,
            metric_dictionary,
            granularity_parser: Box::new(StandardGranularityParser::new()),
            config,
        }
    }

    /// Replace the granularity vocabulary
    pub fn with_granularity_parser(mut self, parser: Box<dyn GranularityParser>) -> Self {
        self.granularity_parser = parser;
        self
    }

    /// The compiler's configuration
    pub fn config(&self) -> &RequestConfig {
        &self.config
    }

    /// Compile one raw request against a logical table
    ///
    /// `now` anchors time macros and is an explicit argument so resolution
    /// is deterministic; callers outside tests pass `Utc::now()`.
    pub fn compile(
        &self,
        raw: &RawDataRequest,
        table: &LogicalTable,
        now: DateTime<Utc>,
    ) -> RequestResult<DataRequest> {
        tracing::debug!("Compiling request against table '{}'", table.name());

        let format = ResponseFormat::parse(raw.format.as_deref())?;

        let pagination_parameters = generate_pagination_parameters(&raw.per_page, &raw.page)?;

        let async_after = match raw.async_after.as_deref() {
            Some(value) => AsyncAfter::parse(value)?,
            None => AsyncAfter::parse(&self.config.default_async_after)?,
        };

        let time_zone =
            generate_time_zone(raw.time_zone.as_deref(), self.config.default_time_zone)?;

        let granularity = self.granularity_parser.parse(&raw.granularity, time_zone)?;

        let dimensions = generate_dimensions(&raw.dimensions, &self.dimension_dictionary)?;
        validate_request_dimensions(&dimensions, table)?;

        let dimension_fields =
            generate_dimension_fields(&raw.dimensions, &self.dimension_dictionary)?;

        let logical_metrics = generate_logical_metrics(
            raw.metrics.as_deref().unwrap_or(""),
            &self.metric_dictionary,
        )?;
        validate_metrics(&logical_metrics, table)?;

        let datetime_parser = DateTimeParser::new(time_zone);
        let intervals = resolve_intervals(
            raw.date_time.as_deref().unwrap_or(""),
            now,
            &granularity,
            &datetime_parser,
        )?;
        validate_time_alignment(&granularity, &intervals)?;

        let filters = generate_filters(
            raw.filters.as_deref().unwrap_or(""),
            table,
            &self.dimension_dictionary,
            self.config.filter_substring_operations,
        )?;

        let havings = generate_havings(
            raw.havings.as_deref().unwrap_or(""),
            &logical_metrics,
            &self.metric_dictionary,
        )?;

        let (date_time_sort, sorts) = generate_sorts(
            raw.sorts.as_deref().unwrap_or(""),
            &logical_metrics,
            &self.metric_dictionary,
        )?;

        let count = generate_positive_integer(raw.count.as_deref().unwrap_or(""), "count")?;
        let top_n = generate_positive_integer(raw.top_n.as_deref().unwrap_or(""), "topN")?;
        if top_n.is_some() && sorts.is_empty() {
            tracing::debug!("topN requested without a metric sort");
            return Err(RequestError::TopNUnsorted);
        }

        tracing::debug!(
            "Compiled request for table '{}': {} dimension(s), {} metric(s), {} interval(s)",
            table.name(),
            dimensions.len(),
            logical_metrics.len(),
            intervals.len()
        );

        Ok(DataRequest {
            format,
            pagination_parameters,
            async_after,
            time_zone,
            granularity,
            dimensions,
            dimension_fields,
            logical_metrics,
            intervals,
            filters,
            havings,
            date_time_sort,
            sorts,
            count,
            top_n,
            table_name: table.name().to_string(),
        })
    }
}

impl std::fmt::Debug for RequestCompiler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestCompiler")
            .field("dimensions", &self.dimension_dictionary.len())
            .field("metrics", &self.metric_dictionary.len())
            .field("config", &self.config)
            .finish()
    }
}

/// One compiled, immutable data request
///
/// Everything a downstream query planner needs, already validated. Built
/// once per inbound query and never mutated.
#[derive(Debug, Clone)]
pub struct DataRequest {
    format: ResponseFormat,
    pagination_parameters: Option<PaginationParameters>,
    async_after: AsyncAfter,
    time_zone: Tz,
    granularity: Granularity,
    dimensions: Vec<Arc<Dimension>>,
    dimension_fields: Vec<(Arc<Dimension>, Vec<DimensionField>)>,
    logical_metrics: Vec<Arc<LogicalMetric>>,
    intervals: Vec<Interval>,
    filters: ApiFilterMap,
    havings: ApiHavingMap,
    date_time_sort: Option<OrderByColumn>,
    sorts: Vec<OrderByColumn>,
    count: Option<u64>,
    top_n: Option<u64>,
    table_name: String,
}

impl DataRequest {
    /// Response serialization format
    pub fn format(&self) -> ResponseFormat {
        self.format
    }

    /// Client-requested page coordinates, if any
    pub fn pagination_parameters(&self) -> Option<PaginationParameters> {
        self.pagination_parameters
    }

    /// Synchronous-wait threshold
    pub fn async_after(&self) -> AsyncAfter {
        self.async_after
    }

    /// Request time zone
    pub fn time_zone(&self) -> Tz {
        self.time_zone
    }

    /// Result bucketing
    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    /// Grouping dimensions, in request order without duplicates
    pub fn dimensions(&self) -> &[Arc<Dimension>] {
        &self.dimensions
    }

    /// Field projection per grouping dimension
    pub fn dimension_fields(&self) -> &[(Arc<Dimension>, Vec<DimensionField>)] {
        &self.dimension_fields
    }

    /// Selected metrics, in request order without duplicates
    pub fn logical_metrics(&self) -> &[Arc<LogicalMetric>] {
        &self.logical_metrics
    }

    /// Reporting intervals, resolved and deduplicated
    pub fn intervals(&self) -> &[Interval] {
        &self.intervals
    }

    /// Row filters grouped by dimension
    pub fn filters(&self) -> &ApiFilterMap {
        &self.filters
    }

    /// Dimensions referenced by filters
    pub fn filter_dimensions(&self) -> impl Iterator<Item = &Arc<Dimension>> {
        self.filters.dimensions()
    }

    /// Aggregate constraints grouped by metric
    pub fn havings(&self) -> &ApiHavingMap {
        &self.havings
    }

    /// Time-bucket sort, when requested
    pub fn date_time_sort(&self) -> Option<&OrderByColumn> {
        self.date_time_sort.as_ref()
    }

    /// Metric sort columns, in request order
    pub fn sorts(&self) -> &[OrderByColumn] {
        &self.sorts
    }

    /// Row-count limit, when requested
    pub fn count(&self) -> Option<u64> {
        self.count
    }

    /// Top-n bucket limit, when requested
    pub fn top_n(&self) -> Option<u64> {
        self.top_n
    }

    /// The queried logical table
    pub fn table_name(&self) -> &str {
        &self.table_name
    }
}
