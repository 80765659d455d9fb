//! # Portcullis
//!
//! Analytics API Request Compiler - A Rust library for parsing and
//! validating raw analytics query strings into typed, immutable request
//! models.
//!
//! ## Features
//!
//! - **Bracketed expression grammars**: `age.id-in[2,3]` filters and
//!   `height-gt[10]` havings, parsed fail-fast
//! - **Calendar-aware intervals**: ISO-8601 datetimes, periods, and the
//!   `current`/`next` macros, resolved in the request time zone
//! - **Granularity alignment**: intervals are checked against the
//!   requested grain's bucket boundaries
//! - **Batched schema errors**: every unknown dimension or metric in a
//!   request is reported in one round trip
//! - **Deterministic**: the reference instant is an explicit input, never
//!   a clock read
//!
//! ## Modules
//!
//! - [`schema`]: Dimension, metric, and logical table catalogs
//! - [`time`]: Granularities, interval resolution, and time macros
//! - [`request`]: Expression parsers and the request compiler
//! - [`config`]: TOML + environment configuration
//! - [`error`]: The request error catalog
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use chrono::Utc;
//! use portcullis::config::RequestConfig;
//! use portcullis::request::{RawDataRequest, RequestCompiler};
//! use portcullis::schema::{
//!     Dimension, DimensionDictionary, LogicalMetric, LogicalTable, MetricDictionary,
//! };
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Declare the schema catalogs
//!     let mut dimensions = DimensionDictionary::new();
//!     let age = dimensions.add(Dimension::new("age", "id").with_field("desc", "Age bucket"));
//!
//!     let mut metrics = MetricDictionary::new();
//!     let height = metrics.add(LogicalMetric::new("height"));
//!
//!     let table = LogicalTable::new("network")
//!         .with_dimension(age)
//!         .with_metric(height);
//!
//!     // Compile a raw request against the table
//!     let compiler = RequestCompiler::new(
//!         Arc::new(dimensions),
//!         Arc::new(metrics),
//!         RequestConfig::default(),
//!     );
//!     let raw = RawDataRequest::new("day")
//!         .with_dimensions(&["age"])
//!         .with_metrics("height")
//!         .with_date_time("2020-01-01/2020-02-01")
//!         .with_filters("age.id-in[2,3]");
//!
//!     let request = compiler.compile(&raw, &table, Utc::now())?;
//!     assert_eq!(request.dimensions().len(), 1);
//!     assert_eq!(request.intervals().len(), 1);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod request;
pub mod schema;
pub mod time;

// Re-export top-level types for convenience
pub use error::{RequestError, RequestResult};

pub use request::{
    ApiFilter, ApiFilterMap, ApiHaving, ApiHavingMap, AsyncAfter, DataRequest, OrderByColumn,
    Pagination, PaginationParameters, RawDataRequest, RequestCompiler, ResponseFormat,
    SortDirection,
};

pub use schema::{
    Dimension, DimensionDictionary, DimensionField, LogicalMetric, LogicalTable, MetricDictionary,
};

pub use time::{
    DateTimeParser, Granularity, GranularityParser, Interval, StandardGrain,
    StandardGranularityParser, TimeGrain, TimeMacro,
};

pub use config::{ConfigError, RequestConfig};
