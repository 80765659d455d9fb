//! Logical Metric Catalog Types
//!
//! Logical metrics are the measures a query selects, havings constrain, and
//! sorts order by. The catalog only needs their identity and description;
//! how a metric is computed belongs to the downstream query builder.

use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// A measure known to the schema catalog
///
/// Identity (equality and hashing) is by name only.
#[derive(Debug, Clone)]
pub struct LogicalMetric {
    name: String,
    description: String,
}

impl LogicalMetric {
    /// Create a metric with an empty description
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
        }
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Name used in API requests
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Human-readable description
    pub fn description(&self) -> &str {
        &self.description
    }
}

impl PartialEq for LogicalMetric {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for LogicalMetric {}

impl Hash for LogicalMetric {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl std::fmt::Display for LogicalMetric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Name-keyed lookup of all configured logical metrics
#[derive(Debug, Clone, Default)]
pub struct MetricDictionary {
    metrics: HashMap<String, Arc<LogicalMetric>>,
}

impl MetricDictionary {
    /// Create an empty dictionary
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a metric, returning the shared handle
    ///
    /// Re-registering a name replaces the previous entry.
    pub fn add(&mut self, metric: LogicalMetric) -> Arc<LogicalMetric> {
        let handle = Arc::new(metric);
        self.metrics
            .insert(handle.name().to_string(), Arc::clone(&handle));
        handle
    }

    /// Look up a metric by name
    pub fn find_by_name(&self, name: &str) -> Option<Arc<LogicalMetric>> {
        self.metrics.get(name).cloned()
    }

    /// Number of registered metrics
    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    /// True when no metrics are registered
    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }
}
