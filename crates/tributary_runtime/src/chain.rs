//! Per-resource stage chain: fetch, validate, transform, publish, load.
//!
//! Stages hand each other [`Handle`]s, never data. Each stage is retried
//! on its own under the run's [`RetryPolicy`]; cancellation is checked
//! before every stage, and by the fetcher between pages. A failed stage
//! fails only this chain.

use crate::context::RunContext;
use crate::retry::RetryPolicy;
use crate::transform::{ColumnTransform, Transform};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, warn};
use tributary_core::{CoreError, CoreResult, TableSchema};
use tributary_fetch::Paginator;
use tributary_plan::{ResourceConfig, StageKind};
use tributary_spec::ValidationSpec;
use tributary_storage::handle::{cleaned_name, raw_name, validated_name};
use tributary_storage::{Handle, LoadReport};

/// What one chain run did
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChainReport {
    /// Records fetched
    pub fetched: usize,
    /// Records that passed validation
    pub accepted: usize,
    /// Records dropped by validation
    pub rejected: usize,
    /// Rows written by the transform
    pub rows: usize,
    /// Published object name
    pub object: String,
    /// Load result
    pub load: LoadReport,
}

/// Compiled chain for one resource
#[derive(Clone)]
pub struct ResourceChain {
    name: String,
    endpoint: String,
    target: String,
    destination: String,
    spec: ValidationSpec,
    schema: TableSchema,
    transform: Arc<dyn Transform>,
    max_items: usize,
    page_size: usize,
}

impl ResourceChain {
    /// Compile a resource's rules, schema and transform
    ///
    /// # Errors
    ///
    /// Returns a configuration error for anything that would fail later
    pub fn compile(name: &str, config: &ResourceConfig) -> CoreResult<Self> {
        let spec = config.compile_spec(name)?;
        config.schema.check(name)?;
        let transform = ColumnTransform::compile(&config.transform, &config.schema, name)?;
        Ok(Self {
            name: name.to_string(),
            endpoint: config.endpoint.clone(),
            target: config.target.clone(),
            destination: config.destination.clone(),
            spec,
            schema: config.schema.clone(),
            transform: Arc::new(transform),
            max_items: config.max_items,
            page_size: config.page_size,
        })
    }

    /// Replace the transform
    #[must_use]
    pub fn with_transform(mut self, transform: Arc<dyn Transform>) -> Self {
        self.transform = transform;
        self
    }

    /// Override the fetch cap
    #[must_use]
    pub fn with_max_items(mut self, max_items: usize) -> Self {
        self.max_items = max_items;
        self
    }

    /// Resource name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Destination table
    #[must_use]
    pub fn table(&self) -> String {
        format!("{}_table", self.target)
    }

    /// Fetch every page and persist the raw records
    ///
    /// # Errors
    ///
    /// Returns a transport error if any page fails
    pub async fn fetch(&self, ctx: &RunContext) -> CoreResult<(Handle, usize)> {
        let result = Paginator::new(ctx.http())
            .with_page_size(self.page_size)
            .with_max_items(self.max_items)
            .fetch(&self.endpoint, ctx.cancel())
            .await?;
        let handle = ctx.store().write_records(&raw_name(&self.target), &result.records)?;
        info!(resource = %self.name, path = %handle, items = result.len(), "Wrote fetched records");
        Ok((handle, result.len()))
    }

    /// Keep records that pass the spec; log the rest
    ///
    /// # Errors
    ///
    /// Returns an error if the raw artifact cannot be read or the result
    /// written
    pub fn validate(&self, ctx: &RunContext, raw: &Handle) -> CoreResult<(Handle, usize, usize)> {
        let records = ctx.store().read_records(raw)?;
        let filtered = self.spec.filter(records);

        for (record, rejection) in &filtered.rejected {
            let body = serde_json::to_string(record)?;
            error!(
                resource = %self.name,
                field = %rejection.field,
                reason = %rejection.reason,
                record = %body,
                "Validation for item failed"
            );
        }
        if filtered.accepted.is_empty() {
            warn!(resource = %self.name, rejected = filtered.rejected.len(), "No records passed validation");
        }

        let handle = ctx
            .store()
            .write_records(&validated_name(&self.target), &filtered.accepted)?;
        info!(
            resource = %self.name,
            path = %handle,
            accepted = filtered.accepted.len(),
            rejected = filtered.rejected.len(),
            "Wrote validated records"
        );
        Ok((handle, filtered.accepted.len(), filtered.rejected.len()))
    }

    /// Flatten validated records into the cleaned table
    ///
    /// # Errors
    ///
    /// Returns an error if the transform fails or the table cannot be
    /// written
    pub fn transform(&self, ctx: &RunContext, validated: &Handle) -> CoreResult<(Handle, usize)> {
        let records = ctx.store().read_records(validated)?;
        let rows = self.transform.apply(&records)?;
        let count = rows.len();
        let handle = ctx
            .store()
            .write_table(&cleaned_name(&self.target), &self.transform.columns(), rows)?;
        info!(resource = %self.name, path = %handle, rows = count, "Wrote transformed table");
        Ok((handle, count))
    }

    /// Upload the cleaned table
    ///
    /// # Errors
    ///
    /// Returns a sink error if the upload fails
    pub async fn publish(&self, ctx: &RunContext, table: &Handle) -> CoreResult<String> {
        ctx.objects()
            .upload(ctx.config(), table.path(), &self.destination)
            .await
    }

    /// Replace the destination table with the published object
    ///
    /// # Errors
    ///
    /// Returns a sink error if the load fails
    pub async fn load(&self, ctx: &RunContext, object: &str) -> CoreResult<LoadReport> {
        ctx.warehouse()
            .load(ctx.config(), &self.schema, object, &self.table())
            .await
    }

    /// Run every stage in order
    ///
    /// # Errors
    ///
    /// Returns the error of the first stage that fails after retries, or
    /// `Cancelled`
    pub async fn run(&self, ctx: &RunContext, retry: &RetryPolicy) -> CoreResult<ChainReport> {
        let cancel = ctx.cancel();

        checkpoint(ctx, &self.name, StageKind::Fetch)?;
        let (raw, fetched) = retry.run("fetch", cancel, move || self.fetch(ctx)).await?;
        let raw = &raw;

        checkpoint(ctx, &self.name, StageKind::Validate)?;
        let (validated, accepted, rejected) = retry
            .run("validate", cancel, move || async move { self.validate(ctx, raw) })
            .await?;
        let validated = &validated;

        checkpoint(ctx, &self.name, StageKind::Transform)?;
        let (table, rows) = retry
            .run("transform", cancel, move || async move { self.transform(ctx, validated) })
            .await?;
        let table = &table;

        checkpoint(ctx, &self.name, StageKind::Publish)?;
        let object = retry
            .run("publish", cancel, move || self.publish(ctx, table))
            .await?;
        let object_ref = object.as_str();

        checkpoint(ctx, &self.name, StageKind::Load)?;
        let load = retry
            .run("load", cancel, move || self.load(ctx, object_ref))
            .await?;

        Ok(ChainReport {
            fetched,
            accepted,
            rejected,
            rows,
            object,
            load,
        })
    }
}

fn checkpoint(ctx: &RunContext, resource: &str, next: StageKind) -> CoreResult<()> {
    if ctx.cancel().is_cancelled() {
        info!(resource = %resource, stage = %next, "Run cancelled before stage");
        return Err(CoreError::Cancelled);
    }
    Ok(())
}

impl std::fmt::Debug for ResourceChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceChain")
            .field("name", &self.name)
            .field("endpoint", &self.endpoint)
            .field("table", &self.table())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Harness, user};
    use serde_json::json;

    #[tokio::test]
    async fn test_chain_drops_invalid_user() {
        let harness = Harness::new(vec![
            user(1, "Emily", 28),
            user(2, "Michael", -1),
            user(3, "Sophia", 42),
        ]);
        let chain = ResourceChain::compile("users", &harness.users_config()).unwrap();

        let report = chain.run(&harness.ctx, &RetryPolicy::none()).await.unwrap();

        assert_eq!(report.fetched, 3);
        assert_eq!(report.accepted, 2);
        assert_eq!(report.rejected, 1);
        assert_eq!(report.rows, 2);
        assert_eq!(report.object, "users.csv");
        assert_eq!(report.load.table_id, "proj.ds.users_table");
        assert_eq!(report.load.rows, 2);
        assert_eq!(
            harness.table("users_table"),
            "user_id,first_name,age\n1,Emily,28\n3,Sophia,42\n"
        );
    }

    #[tokio::test]
    async fn test_stages_pass_handles() {
        let harness = Harness::new(vec![user(1, "Emily", 28)]);
        let chain = ResourceChain::compile("users", &harness.users_config()).unwrap();
        let ctx = &harness.ctx;

        let (raw, _) = chain.fetch(ctx).await.unwrap();
        assert!(raw.path().ends_with("datasets/raw_users.json"));
        let (validated, _, _) = chain.validate(ctx, &raw).unwrap();
        assert!(validated.path().ends_with("datasets/validated_users.json"));
        let (table, _) = chain.transform(ctx, &validated).unwrap();
        assert!(table.path().ends_with("datasets/cleaned_users.csv"));
    }

    #[tokio::test]
    async fn test_empty_validated_set_loads_empty_table() {
        let harness = Harness::new(vec![user(1, "Emily", 0)]);
        let chain = ResourceChain::compile("users", &harness.users_config()).unwrap();
        let report = chain.run(&harness.ctx, &RetryPolicy::none()).await.unwrap();
        assert_eq!(report.accepted, 0);
        assert_eq!(report.load.rows, 0);
        assert_eq!(harness.table("users_table"), "user_id,first_name,age\n");
    }

    #[tokio::test]
    async fn test_cancelled_chain_stops() {
        let harness = Harness::new(vec![user(1, "Emily", 28)]);
        let chain = ResourceChain::compile("users", &harness.users_config()).unwrap();
        harness.ctx.cancel().cancel();
        let err = chain.run(&harness.ctx, &RetryPolicy::none()).await.unwrap_err();
        assert_eq!(err, CoreError::Cancelled);
    }

    #[tokio::test]
    async fn test_max_items_override() {
        let harness = Harness::new(vec![user(1, "Emily", 28), user(2, "Sophia", 42)]);
        let chain = ResourceChain::compile("users", &harness.users_config())
            .unwrap()
            .with_max_items(1);
        let report = chain.run(&harness.ctx, &RetryPolicy::none()).await.unwrap();
        assert_eq!(report.fetched, 1);
    }

    #[test]
    fn test_compile_rejects_bad_transform() {
        let harness = Harness::new(vec![]);
        let mut config = harness.users_config();
        config.transform.columns.pop();
        assert!(ResourceChain::compile("users", &config).is_err());

        let mut config = harness.users_config();
        config.spec.insert(
            "id".to_string(),
            serde_json::from_value(json!({"type": "uuid"})).unwrap(),
        );
        assert!(ResourceChain::compile("users", &config).is_err());
    }
}
