//! Dimension Catalog Types
//!
//! Dimensions are the grouping axes of an analytics query. Each dimension
//! declares a set of named fields (id, description, and so on), a key field
//! that uniquely identifies a dimension row, and a default field projection
//! used when a request does not ask for specific fields.

use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// A named field of a dimension (for example `id` or `desc`)
#[derive(Debug, Clone)]
pub struct DimensionField {
    name: String,
    description: String,
}

impl DimensionField {
    /// Create a new dimension field
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }

    /// Field name as it appears in requests
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Human-readable description
    pub fn description(&self) -> &str {
        &self.description
    }
}

// Field identity is the name; descriptions are display-only.
impl PartialEq for DimensionField {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for DimensionField {}

impl Hash for DimensionField {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl std::fmt::Display for DimensionField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// A grouping dimension known to the schema catalog
///
/// Identity (equality and hashing) is by `api_name` only, so dimensions can
/// key maps regardless of how their field lists were configured.
#[derive(Debug, Clone)]
pub struct Dimension {
    api_name: String,
    description: String,
    key: DimensionField,
    fields: Vec<DimensionField>,
    default_fields: Vec<DimensionField>,
}

impl Dimension {
    /// Create a dimension with a key field named `key_field`
    ///
    /// The key field is included in the declared field list and is the
    /// default projection until `with_default_fields` overrides it.
    pub fn new(api_name: impl Into<String>, key_field: impl Into<String>) -> Self {
        let key = DimensionField::new(key_field, "key");
        Self {
            api_name: api_name.into(),
            description: String::new(),
            fields: vec![key.clone()],
            default_fields: vec![key.clone()],
            key,
        }
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Declare an additional field
    pub fn with_field(mut self, name: impl Into<String>, description: impl Into<String>) -> Self {
        let field = DimensionField::new(name, description);
        if !self.fields.contains(&field) {
            self.fields.push(field);
        }
        self
    }

    /// Replace the default field projection
    ///
    /// Names that are not declared fields are ignored; declare fields first.
    pub fn with_default_fields(mut self, names: &[&str]) -> Self {
        let defaults: Vec<DimensionField> = names
            .iter()
            .filter_map(|name| self.find_field(name).cloned())
            .collect();
        if !defaults.is_empty() {
            self.default_fields = defaults;
        }
        self
    }

    /// Name used in API requests
    pub fn api_name(&self) -> &str {
        &self.api_name
    }

    /// Human-readable description
    pub fn description(&self) -> &str {
        &self.description
    }

    /// The field that uniquely identifies a dimension row
    pub fn key(&self) -> &DimensionField {
        &self.key
    }

    /// All declared fields
    pub fn fields(&self) -> &[DimensionField] {
        &self.fields
    }

    /// Fields returned when a request does not ask for specific ones
    pub fn default_fields(&self) -> &[DimensionField] {
        &self.default_fields
    }

    /// Look up a declared field by name
    pub fn find_field(&self, name: &str) -> Option<&DimensionField> {
        self.fields.iter().find(|f| f.name() == name)
    }
}

impl PartialEq for Dimension {
    fn eq(&self, other: &Self) -> bool {
        self.api_name == other.api_name
    }
}

impl Eq for Dimension {}

impl Hash for Dimension {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.api_name.hash(state);
    }
}

impl std::fmt::Display for Dimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.api_name)
    }
}

/// Name-keyed lookup of all configured dimensions
///
/// Shared read-only across request compilations; wrap entries in `Arc` once
/// at startup and clone handles cheaply afterwards.
#[derive(Debug, Clone, Default)]
pub struct DimensionDictionary {
    dimensions: HashMap<String, Arc<Dimension>>,
}

impl DimensionDictionary {
    /// Create an empty dictionary
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a dimension, returning the shared handle
    ///
    /// Re-registering a name replaces the previous entry.
    pub fn add(&mut self, dimension: Dimension) -> Arc<Dimension> {
        let handle = Arc::new(dimension);
        self.dimensions
            .insert(handle.api_name().to_string(), Arc::clone(&handle));
        handle
    }

    /// Look up a dimension by its API name
    pub fn find_by_api_name(&self, api_name: &str) -> Option<Arc<Dimension>> {
        self.dimensions.get(api_name).cloned()
    }

    /// Number of registered dimensions
    pub fn len(&self) -> usize {
        self.dimensions.len()
    }

    /// True when no dimensions are registered
    pub fn is_empty(&self) -> bool {
        self.dimensions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimension_identity_by_name() {
        let a = Dimension::new("age", "id").with_description("Age bucket");
        let b = Dimension::new("age", "id").with_field("desc", "Description");
        assert_eq!(a, b);

        let c = Dimension::new("gender", "id");
        assert_ne!(a, c);
    }

    #[test]
    fn test_dimension_key_is_declared() {
        let dim = Dimension::new("age", "id");
        assert_eq!(dim.key().name(), "id");
        assert!(dim.find_field("id").is_some());
        assert_eq!(dim.default_fields().len(), 1);
        assert_eq!(dim.default_fields()[0].name(), "id");
    }

    #[test]
    fn test_dimension_fields_and_defaults() {
        let dim = Dimension::new("age", "id")
            .with_field("desc", "Description")
            .with_field("label", "Short label")
            .with_default_fields(&["id", "desc"]);

        assert_eq!(dim.fields().len(), 3);
        assert!(dim.find_field("label").is_some());
        assert!(dim.find_field("missing").is_none());

        let defaults: Vec<&str> = dim.default_fields().iter().map(|f| f.name()).collect();
        assert_eq!(defaults, vec!["id", "desc"]);
    }

    #[test]
    fn test_default_fields_ignore_undeclared_names() {
        let dim = Dimension::new("age", "id").with_default_fields(&["ghost"]);
        // Falls back to the key projection
        assert_eq!(dim.default_fields().len(), 1);
        assert_eq!(dim.default_fields()[0].name(), "id");
    }

    #[test]
    fn test_duplicate_field_declaration_ignored() {
        let dim = Dimension::new("age", "id").with_field("id", "again");
        assert_eq!(dim.fields().len(), 1);
    }

    #[test]
    fn test_dictionary_lookup() {
        let mut dict = DimensionDictionary::new();
        assert!(dict.is_empty());

        dict.add(Dimension::new("age", "id"));
        dict.add(Dimension::new("gender", "id"));

        assert_eq!(dict.len(), 2);
        assert!(dict.find_by_api_name("age").is_some());
        assert!(dict.find_by_api_name("AGE").is_none());
        assert!(dict.find_by_api_name("country").is_none());
    }

    #[test]
    fn test_dictionary_shares_handles() {
        let mut dict = DimensionDictionary::new();
        let added = dict.add(Dimension::new("age", "id"));
        let found = dict.find_by_api_name("age").unwrap();
        assert!(Arc::ptr_eq(&added, &found));
    }
}
