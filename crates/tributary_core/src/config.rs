//! Immutable run configuration.
//!
//! Destination names (bucket, project, dataset) are resolved once when the
//! process starts and handed to every sink call. Nothing reads them from
//! ambient state afterwards.

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Process-wide settings for one run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunConfig {
    bucket: String,
    project: String,
    dataset: String,
    data_dir: PathBuf,
}

impl RunConfig {
    /// Start building a run configuration
    #[must_use]
    pub fn builder() -> RunConfigBuilder {
        RunConfigBuilder::default()
    }

    /// Target object-storage bucket
    #[must_use]
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Target warehouse project
    #[must_use]
    pub fn project(&self) -> &str {
        &self.project
    }

    /// Target warehouse dataset
    #[must_use]
    pub fn dataset(&self) -> &str {
        &self.dataset
    }

    /// Local working directory for intermediate artifacts
    #[must_use]
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Fully-qualified URI of an object in the target bucket
    #[must_use]
    pub fn object_uri(&self, name: &str) -> String {
        format!("gs://{}/{}", self.bucket, name)
    }

    /// Fully-qualified warehouse table id
    #[must_use]
    pub fn table_id(&self, table: &str) -> String {
        format!("{}.{}.{}", self.project, self.dataset, table)
    }
}

/// Builder for [`RunConfig`]
#[derive(Debug, Clone, Default)]
pub struct RunConfigBuilder {
    bucket: Option<String>,
    project: Option<String>,
    dataset: Option<String>,
    data_dir: Option<PathBuf>,
}

impl RunConfigBuilder {
    /// Set the bucket
    #[must_use]
    pub fn bucket(mut self, bucket: impl Into<String>) -> Self {
        self.bucket = Some(bucket.into());
        self
    }

    /// Set the project
    #[must_use]
    pub fn project(mut self, project: impl Into<String>) -> Self {
        self.project = Some(project.into());
        self
    }

    /// Set the dataset
    #[must_use]
    pub fn dataset(mut self, dataset: impl Into<String>) -> Self {
        self.dataset = Some(dataset.into());
        self
    }

    /// Set the local data directory (defaults to the current directory)
    #[must_use]
    pub fn data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(dir.into());
        self
    }

    /// Finish building
    ///
    /// # Errors
    ///
    /// Returns a configuration error if bucket, project or dataset is
    /// missing, empty or contains whitespace
    pub fn build(self) -> CoreResult<RunConfig> {
        Ok(RunConfig {
            bucket: required("bucket", self.bucket)?,
            project: required("project", self.project)?,
            dataset: required("dataset", self.dataset)?,
            data_dir: self.data_dir.unwrap_or_else(|| PathBuf::from(".")),
        })
    }
}

fn required(field: &str, value: Option<String>) -> CoreResult<String> {
    let value = value.ok_or_else(|| CoreError::config(field, "not set"))?;
    if value.trim().is_empty() {
        return Err(CoreError::config(field, "must not be empty"));
    }
    if value.chars().any(char::is_whitespace) {
        return Err(CoreError::config(
            field,
            format!("'{}' must not contain whitespace", value),
        ));
    }
    Ok(value)
}
