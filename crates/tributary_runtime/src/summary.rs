//! Summary stage: materialise an aggregation over loaded tables.

use crate::context::RunContext;
use crate::retry::RetryPolicy;
use std::path::{Path, PathBuf};
use tracing::info;
use tributary_core::{CoreError, CoreResult};

/// Compiled summary node
#[derive(Debug, Clone)]
pub struct SummaryTask {
    name: String,
    definition: PathBuf,
    sql: String,
    table: String,
}

impl SummaryTask {
    /// Read the SQL definition
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the definition cannot be read or
    /// is empty
    pub fn load(name: &str, definition: &Path, table: &str) -> CoreResult<Self> {
        let sql = std::fs::read_to_string(definition).map_err(|e| {
            CoreError::config(
                format!("{}.definition", name),
                format!("{}: {}", definition.display(), e),
            )
        })?;
        if sql.trim().is_empty() {
            return Err(CoreError::config(
                format!("{}.definition", name),
                format!("{} is empty", definition.display()),
            ));
        }
        Ok(Self {
            name: name.to_string(),
            definition: definition.to_path_buf(),
            sql,
            table: table.to_string(),
        })
    }

    /// Summary name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run the query into the destination table; returns its table id
    ///
    /// # Errors
    ///
    /// Returns a sink error after retries are used up, or `Cancelled`
    pub async fn run(&self, ctx: &RunContext, retry: &RetryPolicy) -> CoreResult<String> {
        if ctx.cancel().is_cancelled() {
            return Err(CoreError::Cancelled);
        }
        let table_id = retry
            .run("query", ctx.cancel(), move || {
                ctx.warehouse().query(ctx.config(), &self.sql, &self.table)
            })
            .await?;
        info!(
            summary = %self.name,
            definition = %self.definition.display(),
            table = %table_id,
            "Generated summary"
        );
        Ok(table_id)
    }
}
