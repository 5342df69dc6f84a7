//! In-process collaborators for unit tests.

use crate::context::RunContext;
use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};
use tributary_core::{FieldType, Record, RunConfig, SchemaField, TableSchema};
use tributary_fetch::{HttpGet, TransportError};
use tributary_plan::{ColumnDef, ResourceConfig, TransformDef};
use tributary_storage::{DirObjectStore, DirWarehouse};

/// Serves fixed records per resource with `limit`/`skip` paging
#[derive(Default)]
pub(crate) struct StaticSource {
    pub(crate) records: Mutex<Vec<(String, Vec<Value>)>>,
    pub(crate) failing: Mutex<Vec<String>>,
}

impl StaticSource {
    pub(crate) fn with(resource: &str, records: Vec<Value>) -> Self {
        let source = Self::default();
        source.add(resource, records);
        source
    }

    pub(crate) fn add(&self, resource: &str, records: Vec<Value>) {
        self.records
            .lock()
            .unwrap()
            .push((resource.to_string(), records));
    }

    pub(crate) fn fail(&self, resource: &str) {
        self.failing.lock().unwrap().push(resource.to_string());
    }
}

#[async_trait]
impl HttpGet for StaticSource {
    async fn get_json(&self, url: &str, query: &[(&str, String)]) -> Result<Value, TransportError> {
        let key = url.rsplit('/').next().unwrap_or_default().to_string();
        if self.failing.lock().unwrap().contains(&key) {
            return Err(TransportError::Status {
                status: 503,
                url: url.to_string(),
            });
        }
        let param = |name: &str| -> usize {
            query
                .iter()
                .find(|(k, _)| *k == name)
                .and_then(|(_, v)| v.parse().ok())
                .unwrap_or(0)
        };
        let (limit, skip) = (param("limit"), param("skip"));
        let records = self.records.lock().unwrap();
        let all = records
            .iter()
            .find(|(name, _)| *name == key)
            .map(|(_, r)| r.clone())
            .unwrap_or_default();
        let page: Vec<Value> = all.into_iter().skip(skip).take(limit).collect();
        Ok(json!({ key: page, "skip": skip, "limit": limit }))
    }
}

pub(crate) fn user(id: i64, name: &str, age: i64) -> Value {
    json!({
        "id": id,
        "firstName": name,
        "age": age,
        "address": {"city": "Phoenix"}
    })
}

pub(crate) struct Harness {
    pub(crate) dir: tempfile::TempDir,
    pub(crate) source: Arc<StaticSource>,
    pub(crate) warehouse: DirWarehouse,
    pub(crate) ctx: RunContext,
}

impl Harness {
    pub(crate) fn new(users: Vec<Value>) -> Self {
        Self::with_source(StaticSource::with("users", users))
    }

    pub(crate) fn with_source(source: StaticSource) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let config = RunConfig::builder()
            .bucket("bucket")
            .project("proj")
            .dataset("ds")
            .data_dir(dir.path().join("data"))
            .build()
            .unwrap();
        let objects = DirObjectStore::new(dir.path().join("objects"));
        let warehouse = DirWarehouse::new(dir.path().join("warehouse"), objects.clone());
        let source = Arc::new(source);
        let ctx = RunContext::new(
            Arc::new(config),
            source.clone(),
            Arc::new(objects),
            Arc::new(warehouse.clone()),
        )
        .unwrap();
        Self {
            dir,
            source,
            warehouse,
            ctx,
        }
    }

    pub(crate) fn users_config(&self) -> ResourceConfig {
        ResourceConfig {
            endpoint: "https://dummyjson.com/users".to_string(),
            target: "users".to_string(),
            destination: "users.csv".to_string(),
            spec: serde_json::from_value(json!({
                "id": {"type": "integer"},
                "firstName": {"type": "string"},
                "age": {"type": "integer", "exclusive_minimum": 0}
            }))
            .unwrap(),
            schema: TableSchema::new(vec![
                SchemaField::new("user_id", FieldType::Integer),
                SchemaField::new("first_name", FieldType::String),
                SchemaField::new("age", FieldType::Integer),
            ]),
            transform: TransformDef {
                explode: None,
                columns: vec![
                    ColumnDef::new("user_id", "/id"),
                    ColumnDef::new("first_name", "/firstName"),
                    ColumnDef::new("age", "/age"),
                ],
            },
            max_items: 0,
            page_size: 2,
        }
    }

    pub(crate) fn table(&self, table: &str) -> String {
        let path = self.warehouse.table_path(self.ctx.config(), table).unwrap();
        std::fs::read_to_string(path).unwrap()
    }

    pub(crate) fn read_query(&self, table: &str) -> String {
        let path = self
            .warehouse
            .dataset_dir(self.ctx.config())
            .join(format!("{}.sql", table));
        std::fs::read_to_string(path).unwrap()
    }
}

/// Record literal helper
pub(crate) fn record(value: Value) -> Record {
    value.as_object().cloned().unwrap_or_default()
}
