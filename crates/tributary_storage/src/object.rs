//! Object storage sink.

use crate::atomic;
use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use tracing::info;
use tributary_core::{CoreError, CoreResult, RunConfig};

/// Destination for published tables
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Upload the file at `local` as object `destination` in the configured
    /// bucket, replacing any object of that name. Returns the object's name.
    ///
    /// # Errors
    ///
    /// Returns a sink error if the upload fails; retryable
    async fn upload(&self, config: &RunConfig, local: &Path, destination: &str) -> CoreResult<String>;
}

/// Object store backed by a local directory: bucket `b` is `<root>/b/`
#[derive(Debug, Clone)]
pub struct DirObjectStore {
    root: PathBuf,
}

impl DirObjectStore {
    /// Create a store rooted at `root`
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory holding the objects of `bucket`
    #[must_use]
    pub fn bucket_dir(&self, bucket: &str) -> PathBuf {
        self.root.join(bucket)
    }

    /// Path of an object; rejects names that would leave the bucket
    ///
    /// # Errors
    ///
    /// Returns a configuration error for an absolute or parent-relative name
    pub fn object_path(&self, bucket: &str, name: &str) -> CoreResult<PathBuf> {
        let relative = Path::new(name);
        let confined = !name.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !confined {
            return Err(CoreError::config(
                "destination",
                format!("'{}' is not a plain object name", name),
            ));
        }
        Ok(self.bucket_dir(bucket).join(relative))
    }
}

#[async_trait]
impl ObjectStore for DirObjectStore {
    async fn upload(&self, config: &RunConfig, local: &Path, destination: &str) -> CoreResult<String> {
        let target = self.object_path(config.bucket(), destination)?;
        let source = local.to_path_buf();
        let write_target = target.clone();

        tokio::task::spawn_blocking(move || -> CoreResult<()> {
            let bytes = std::fs::read(&source).map_err(|e| CoreError::io(&source, e))?;
            if let Some(parent) = write_target.parent() {
                std::fs::create_dir_all(parent).map_err(|e| CoreError::io(parent, e))?;
            }
            atomic::write_file(&write_target, &bytes)
        })
        .await
        .map_err(|e| CoreError::Internal {
            message: e.to_string(),
        })?
        .map_err(|e| CoreError::sink("object_store", e.to_string()))?;

        info!(local = %local.display(), uri = %config.object_uri(destination), "Uploaded object");
        Ok(destination.to_string())
    }
}
