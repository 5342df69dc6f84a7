//! Warehouse sink.
//!
//! A load replaces the whole table with the contents of one CSV object;
//! the object's first row is its header and is not loaded. A query
//! materialises a derived table from SQL over previously loaded tables.
//!
//! [`DirWarehouse`] keeps tables as CSV files under
//! `<root>/<project>/<dataset>/`. It checks the header against the schema
//! and every cell against its column type before swapping the table in,
//! so a rejected load leaves the previous table intact. Queries are kept
//! as `<table>.sql` beside the tables they read.

use crate::atomic;
use crate::object::DirObjectStore;
use async_trait::async_trait;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;
use tributary_core::{CoreError, CoreResult, RunConfig, TableSchema};

/// Outcome of a table load
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    /// `project.dataset.table`
    pub table_id: String,
    /// Rows written, header excluded
    pub rows: usize,
}

/// Destination warehouse
#[async_trait]
pub trait Warehouse: Send + Sync {
    /// Replace `table` with the rows of object `source` in the configured
    /// bucket, typed by `schema`.
    ///
    /// # Errors
    ///
    /// Returns a sink error if the object cannot be read or the table
    /// written, a configuration error if the header does not match the
    /// schema, and an encoding error for a cell its column type rejects
    async fn load(
        &self,
        config: &RunConfig,
        schema: &TableSchema,
        source: &str,
        table: &str,
    ) -> CoreResult<LoadReport>;

    /// Replace `table` with the result of `sql`.
    ///
    /// # Errors
    ///
    /// Returns a sink error if the warehouse rejects or fails the query
    async fn query(&self, config: &RunConfig, sql: &str, table: &str) -> CoreResult<String>;
}

/// Warehouse backed by local CSV files
#[derive(Debug, Clone)]
pub struct DirWarehouse {
    root: PathBuf,
    objects: DirObjectStore,
}

impl DirWarehouse {
    /// Create a warehouse rooted at `root` that reads load sources from
    /// `objects`
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, objects: DirObjectStore) -> Self {
        Self {
            root: root.into(),
            objects,
        }
    }

    /// Directory holding the tables of the configured dataset
    #[must_use]
    pub fn dataset_dir(&self, config: &RunConfig) -> PathBuf {
        self.root.join(config.project()).join(config.dataset())
    }

    /// Path of a loaded table
    ///
    /// # Errors
    ///
    /// Returns a configuration error for a table name that is not a plain
    /// identifier
    pub fn table_path(&self, config: &RunConfig, table: &str) -> CoreResult<PathBuf> {
        check_table_name(table)?;
        Ok(self.dataset_dir(config).join(format!("{}.csv", table)))
    }

    fn query_path(&self, config: &RunConfig, table: &str) -> CoreResult<PathBuf> {
        check_table_name(table)?;
        Ok(self.dataset_dir(config).join(format!("{}.sql", table)))
    }
}

fn check_table_name(table: &str) -> CoreResult<()> {
    let plain = !table.is_empty() && table.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if plain {
        Ok(())
    } else {
        Err(CoreError::config(
            "table",
            format!("'{}' is not a valid table name", table),
        ))
    }
}

fn sink_failure(err: CoreError) -> CoreError {
    match err {
        CoreError::Io { .. } | CoreError::NotFound { .. } => {
            CoreError::sink("warehouse", err.to_string())
        }
        other => other,
    }
}

/// Copy `source` to `target`, checking it against `schema` on the way.
fn load_csv(schema: &TableSchema, source: &Path, target: &Path) -> CoreResult<usize> {
    let mut reader = csv::Reader::from_path(source).map_err(|e| CoreError::io(source, e))?;
    let header = reader.headers().map_err(|e| CoreError::io(source, e))?.clone();
    let expected = schema.column_names();
    if header.iter().ne(expected.iter().copied()) {
        return Err(CoreError::config(
            "schema",
            format!(
                "header [{}] does not match schema [{}]",
                header.iter().collect::<Vec<_>>().join(", "),
                expected.join(", ")
            ),
        ));
    }

    let staged = atomic::staging_file(target)?;
    let mut writer = csv::Writer::from_writer(staged);
    let encoding = |e: csv::Error| CoreError::Encoding {
        reason: e.to_string(),
    };
    writer.write_record(&header).map_err(encoding)?;

    let mut rows = 0usize;
    for (index, row) in reader.records().enumerate() {
        let row = row.map_err(encoding)?;
        let line = index + 2;
        for (cell, field) in row.iter().zip(&schema.fields) {
            if !field.field_type.accepts(cell) {
                return Err(CoreError::Encoding {
                    reason: format!(
                        "line {}: '{}' is not a valid {} for column '{}'",
                        line, cell, field.field_type, field.name
                    ),
                });
            }
        }
        writer.write_record(&row).map_err(encoding)?;
        rows += 1;
    }

    let staged = writer.into_inner().map_err(|e| CoreError::io(target, e))?;
    atomic::commit(staged, target)?;
    Ok(rows)
}

#[async_trait]
impl Warehouse for DirWarehouse {
    async fn load(
        &self,
        config: &RunConfig,
        schema: &TableSchema,
        source: &str,
        table: &str,
    ) -> CoreResult<LoadReport> {
        schema.check(table)?;
        let object = self.objects.object_path(config.bucket(), source)?;
        let target = self.table_path(config, table)?;
        let schema = schema.clone();

        let rows = tokio::task::spawn_blocking(move || -> CoreResult<usize> {
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent).map_err(|e| CoreError::io(parent, e))?;
            }
            load_csv(&schema, &object, &target)
        })
        .await
        .map_err(|e| CoreError::Internal {
            message: e.to_string(),
        })?
        .map_err(sink_failure)?;

        let table_id = config.table_id(table);
        info!(
            source = %config.object_uri(source),
            table = %table_id,
            rows,
            "Loaded data into warehouse table"
        );
        Ok(LoadReport { table_id, rows })
    }

    async fn query(&self, config: &RunConfig, sql: &str, table: &str) -> CoreResult<String> {
        if sql.trim().is_empty() {
            return Err(CoreError::config("definition", "query is empty"));
        }
        let target = self.query_path(config, table)?;
        let text = sql.to_string();

        tokio::task::spawn_blocking(move || -> CoreResult<()> {
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent).map_err(|e| CoreError::io(parent, e))?;
            }
            atomic::write_file(&target, text.as_bytes())
        })
        .await
        .map_err(|e| CoreError::Internal {
            message: e.to_string(),
        })?
        .map_err(sink_failure)?;

        let table_id = config.table_id(table);
        info!(table = %table_id, "Materialised query table");
        Ok(table_id)
    }
}
