//! Identifiers for Tributary entities.
//!
//! Graph nodes get name-derived ids so the same configuration always
//! produces the same graph. Runs get random ids.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Run identifier - identifies a single pipeline execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RunId(Uuid);

impl RunId {
    /// Create a new random RunId
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get as UUID
    #[must_use]
    pub const fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "run_{}", self.0)
    }
}

/// Node identifier - identifies a stage group in the pipeline graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(Uuid);

impl NodeId {
    /// Create from a group name.
    ///
    /// Name-based UUID (v5) under the URL namespace; equal names give
    /// equal ids.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        Self(Uuid::new_v5(&Uuid::NAMESPACE_URL, name.as_bytes()))
    }

    /// Get as UUID
    #[must_use]
    pub const fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "node_{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_id_unique() {
        assert_ne!(RunId::new(), RunId::new());
    }

    #[test]
    fn test_run_id_display() {
        let id = RunId::new();
        assert!(id.to_string().starts_with("run_"));
    }

    #[test]
    fn test_node_id_from_name_stable() {
        assert_eq!(NodeId::from_name("users_etl"), NodeId::from_name("users_etl"));
        assert_ne!(NodeId::from_name("users_etl"), NodeId::from_name("carts_etl"));
    }

    #[test]
    fn test_node_id_display() {
        let id = NodeId::from_name("user_summary");
        assert!(id.to_string().starts_with("node_"));
    }
}
