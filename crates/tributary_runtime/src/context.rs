//! Shared collaborators for one run.

use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tributary_core::{CoreResult, RunConfig};
use tributary_fetch::HttpGet;
use tributary_storage::{IntermediateStore, ObjectStore, Warehouse};

/// Everything a stage needs besides its own configuration.
///
/// Built once per run. Clones share the same collaborators and the same
/// cancellation token.
#[derive(Clone)]
pub struct RunContext {
    config: Arc<RunConfig>,
    store: IntermediateStore,
    http: Arc<dyn HttpGet>,
    objects: Arc<dyn ObjectStore>,
    warehouse: Arc<dyn Warehouse>,
    cancel: CancellationToken,
}

impl RunContext {
    /// Create a context; opens the intermediate store under the configured
    /// data directory
    ///
    /// # Errors
    ///
    /// Returns an IO error if the store directory cannot be created
    pub fn new(
        config: Arc<RunConfig>,
        http: Arc<dyn HttpGet>,
        objects: Arc<dyn ObjectStore>,
        warehouse: Arc<dyn Warehouse>,
    ) -> CoreResult<Self> {
        let store = IntermediateStore::open(config.data_dir())?;
        Ok(Self {
            config,
            store,
            http,
            objects,
            warehouse,
            cancel: CancellationToken::new(),
        })
    }

    /// Use an externally owned cancellation token
    #[must_use]
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Run configuration
    #[must_use]
    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Intermediate artifact store
    #[must_use]
    pub fn store(&self) -> &IntermediateStore {
        &self.store
    }

    /// HTTP capability for fetching
    #[must_use]
    pub fn http(&self) -> Arc<dyn HttpGet> {
        Arc::clone(&self.http)
    }

    /// Object storage sink
    #[must_use]
    pub fn objects(&self) -> &dyn ObjectStore {
        self.objects.as_ref()
    }

    /// Warehouse sink
    #[must_use]
    pub fn warehouse(&self) -> &dyn Warehouse {
        self.warehouse.as_ref()
    }

    /// Run cancellation token
    #[must_use]
    pub fn cancel(&self) -> &CancellationToken {
        &self.cancel
    }
}

impl std::fmt::Debug for RunContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunContext")
            .field("config", &self.config)
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}
