//! Pipeline configuration files.
//!
//! A pipeline is a JSON document with two ordered maps:
//!
//! ```json
//! {
//!   "resources": {
//!     "users": {
//!       "endpoint": "https://dummyjson.com/users",
//!       "target": "users",
//!       "destination": "users.csv",
//!       "spec": { "id": { "type": "integer" } },
//!       "schema": [ { "name": "user_id", "type": "INTEGER" } ],
//!       "transform": { "columns": [ { "name": "user_id", "from": "/id" } ] }
//!     }
//!   },
//!   "summaries": {
//!     "user": { "definition": "sql/summarize_user.sql", "table": "user_summary_table", "deps": ["users"] }
//!   }
//! }
//! ```
//!
//! Declaration order is kept; it decides node order in the built graph.

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tributary_core::{CoreError, CoreResult, TableSchema};
use tributary_spec::{SpecDef, ValidationSpec, compile};

const fn default_page_size() -> usize {
    20
}

/// A whole pipeline definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    /// Resource name to resource configuration
    pub resources: IndexMap<String, ResourceConfig>,
    /// Summary name to summary configuration
    #[serde(default)]
    pub summaries: IndexMap<String, SummaryConfig>,
    /// Directory summary definitions are resolved against
    #[serde(skip)]
    base_dir: PathBuf,
}

/// One ingested resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResourceConfig {
    /// Listing endpoint
    pub endpoint: String,
    /// Name used for artifacts and the destination table
    pub target: String,
    /// Object name the cleaned table is published under
    pub destination: String,
    /// Validation rules
    pub spec: SpecDef,
    /// Destination table schema
    pub schema: TableSchema,
    /// Record-to-row transformation
    pub transform: TransformDef,
    /// Stop fetching after this many items; 0 fetches everything
    #[serde(default)]
    pub max_items: usize,
    /// Items requested per page
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

impl ResourceConfig {
    /// Destination table name, `<target>_table`
    #[must_use]
    pub fn table(&self) -> String {
        format!("{}_table", self.target)
    }

    /// Compile the validation rules
    ///
    /// # Errors
    ///
    /// Returns a configuration error for an invalid rule definition
    pub fn compile_spec(&self, name: &str) -> CoreResult<ValidationSpec> {
        compile(&self.spec, name)
    }
}

/// One aggregation over loaded tables
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SummaryConfig {
    /// SQL file, relative to the pipeline file
    pub definition: PathBuf,
    /// Destination table name
    pub table: String,
    /// Resources that must be loaded first
    #[serde(default)]
    pub deps: IndexSet<String>,
}

/// Column mapping from records to table rows
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TransformDef {
    /// JSON pointer to a sequence; one row is produced per element
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explode: Option<String>,
    /// Output columns in order
    pub columns: Vec<ColumnDef>,
}

/// One output column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ColumnDef {
    /// Column name
    pub name: String,
    /// JSON pointer to the source value
    pub from: String,
    /// Read from the exploded element instead of the parent record
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub item: bool,
}

impl ColumnDef {
    /// Column read from the record
    #[must_use]
    pub fn new(name: impl Into<String>, from: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            from: from.into(),
            item: false,
        }
    }

    /// Column read from the exploded element
    #[must_use]
    pub fn item(name: impl Into<String>, from: impl Into<String>) -> Self {
        Self {
            item: true,
            ..Self::new(name, from)
        }
    }
}

impl PipelineConfig {
    /// Create a configuration from parts; definitions resolve against the
    /// working directory
    #[must_use]
    pub fn new(
        resources: IndexMap<String, ResourceConfig>,
        summaries: IndexMap<String, SummaryConfig>,
    ) -> Self {
        Self {
            resources,
            summaries,
            base_dir: PathBuf::from("."),
        }
    }

    /// Parse a configuration document
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the document is malformed
    pub fn from_json(text: &str, base_dir: impl Into<PathBuf>) -> CoreResult<Self> {
        let mut config: Self = serde_json::from_str(text)
            .map_err(|e| CoreError::config("pipeline", e.to_string()))?;
        config.base_dir = base_dir.into();
        Ok(config)
    }

    /// Read and parse a configuration file
    ///
    /// # Errors
    ///
    /// Returns an IO error if the file cannot be read, or a configuration
    /// error if it is malformed
    pub fn from_path(path: impl AsRef<Path>) -> CoreResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| CoreError::io(path, e))?;
        let base_dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        Self::from_json(&text, base_dir)
    }

    /// Directory summary definitions resolve against
    #[must_use]
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Location of a summary's SQL definition
    #[must_use]
    pub fn definition_path(&self, summary: &SummaryConfig) -> PathBuf {
        self.base_dir.join(&summary.definition)
    }

    /// Check every resource compiles: rule definitions, table schema and
    /// transform columns, and the page size
    ///
    /// # Errors
    ///
    /// Returns the first configuration error found
    pub fn check(&self) -> CoreResult<()> {
        for (name, resource) in &self.resources {
            resource.compile_spec(name)?;
            resource.schema.check(name)?;
            if resource.page_size == 0 {
                return Err(CoreError::config(
                    format!("{}.page_size", name),
                    "page size must be at least 1",
                ));
            }
            let columns: Vec<&str> = resource
                .transform
                .columns
                .iter()
                .map(|c| c.name.as_str())
                .collect();
            if columns != resource.schema.column_names() {
                return Err(CoreError::config(
                    format!("{}.transform", name),
                    format!(
                        "columns [{}] do not match schema [{}]",
                        columns.join(", "),
                        resource.schema.column_names().join(", ")
                    ),
                ));
            }
        }
        for (name, summary) in &self.summaries {
            if summary.table.trim().is_empty() {
                return Err(CoreError::config(
                    format!("{}.table", name),
                    "summary table is empty",
                ));
            }
        }
        Ok(())
    }
}
