//! Schema Catalogs
//!
//! Read-only catalog types the request compiler validates against:
//!
//! - **dimension**: Dimensions, their fields, and the dimension dictionary
//! - **metric**: Logical metrics and the metric dictionary
//! - **table**: Logical tables scoping which names a request may use
//!
//! The catalogs are plain data: callers populate them at startup, wrap them
//! in `Arc`, and share them across concurrent request compilations. Nothing
//! here loads, refreshes, or persists schema state.

mod dimension;
mod metric;
mod table;

pub use dimension::{Dimension, DimensionDictionary, DimensionField};
pub use metric::{LogicalMetric, MetricDictionary};
pub use table::LogicalTable;
