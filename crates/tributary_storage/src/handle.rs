//! Handles to intermediate artifacts.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// What an artifact holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArtifactKind {
    /// A JSON array of records
    Records,
    /// A CSV table with a header row
    Table,
}

impl ArtifactKind {
    /// File extension used on disk
    #[must_use]
    pub const fn extension(&self) -> &'static str {
        match self {
            Self::Records => "json",
            Self::Table => "csv",
        }
    }
}

/// Reference to an artifact passed between stages instead of its data
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Handle {
    name: String,
    kind: ArtifactKind,
    path: PathBuf,
}

impl Handle {
    pub(crate) fn new(name: String, kind: ArtifactKind, path: PathBuf) -> Self {
        Self { name, kind, path }
    }

    /// Artifact name, e.g. `validated_users`
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Artifact kind
    #[must_use]
    pub const fn kind(&self) -> ArtifactKind {
        self.kind
    }

    /// Location on disk
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl std::fmt::Display for Handle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

/// Artifact name of raw fetched records
#[must_use]
pub fn raw_name(resource: &str) -> String {
    format!("raw_{}", resource)
}

/// Artifact name of records that passed validation
#[must_use]
pub fn validated_name(resource: &str) -> String {
    format!("validated_{}", resource)
}

/// Artifact name of the transformed table
#[must_use]
pub fn cleaned_name(resource: &str) -> String {
    format!("cleaned_{}", resource)
}
