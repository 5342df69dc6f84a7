//! Raw records as fetched from the remote source.

use serde::{Deserialize, Serialize};

/// One deserialized API response element.
///
/// Untyped mapping of field name to scalar, mapping or sequence.
pub type Record = serde_json::Map<String, serde_json::Value>;

/// Ordered records of one resource plus the resource type that keyed
/// pagination
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FetchResult {
    /// Resource type (last path segment of the endpoint)
    pub resource: String,
    /// Records in source order
    pub records: Vec<Record>,
}

impl FetchResult {
    /// Create an empty result for a resource
    #[must_use]
    pub fn new(resource: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            records: Vec::new(),
        }
    }

    /// Number of records
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no record was fetched
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
