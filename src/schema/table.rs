//! Logical Table Catalog Type
//!
//! A logical table scopes which dimensions and metrics a request may use.
//! Requests are compiled against exactly one table; names that resolve in
//! the dictionaries but are absent from the table are schema errors.

use std::sync::Arc;

use crate::schema::dimension::Dimension;
use crate::schema::metric::LogicalMetric;

/// A queryable table: a named set of dimensions and logical metrics
#[derive(Debug, Clone)]
pub struct LogicalTable {
    name: String,
    description: String,
    dimensions: Vec<Arc<Dimension>>,
    metrics: Vec<Arc<LogicalMetric>>,
}

impl LogicalTable {
    /// Create an empty table
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            dimensions: Vec::new(),
            metrics: Vec::new(),
        }
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Add a dimension to the table
    pub fn with_dimension(mut self, dimension: Arc<Dimension>) -> Self {
        if !self.has_dimension(dimension.api_name()) {
            self.dimensions.push(dimension);
        }
        self
    }

    /// Add a logical metric to the table
    pub fn with_metric(mut self, metric: Arc<LogicalMetric>) -> Self {
        if !self.has_metric(metric.name()) {
            self.metrics.push(metric);
        }
        self
    }

    /// Table name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Human-readable description
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Dimensions queryable through this table
    pub fn dimensions(&self) -> &[Arc<Dimension>] {
        &self.dimensions
    }

    /// Metrics queryable through this table
    pub fn metrics(&self) -> &[Arc<LogicalMetric>] {
        &self.metrics
    }

    /// True when the table carries a dimension with this API name
    pub fn has_dimension(&self, api_name: &str) -> bool {
        self.dimensions.iter().any(|d| d.api_name() == api_name)
    }

    /// True when the table carries a metric with this name
    pub fn has_metric(&self, name: &str) -> bool {
        self.metrics.iter().any(|m| m.name() == name)
    }
}

impl std::fmt::Display for LogicalTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}
