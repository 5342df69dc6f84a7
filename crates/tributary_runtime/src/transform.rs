//! Record-to-row transformation.
//!
//! The chain treats a transform as opaque: validated records go in, rows
//! in table-schema column order come out. [`ColumnTransform`] is the
//! configurable implementation, a list of JSON-pointer column mappings
//! with an optional explode over one nested sequence.

use serde_json::Value;
use tributary_core::{CoreError, CoreResult, Record, TableSchema};
use tributary_plan::TransformDef;

/// Flattens records into table rows
pub trait Transform: Send + Sync {
    /// Output column names, in order
    fn columns(&self) -> Vec<&str>;

    /// Produce rows for `records`; every row has one cell per column
    ///
    /// # Errors
    ///
    /// Returns an encoding error if a record cannot be flattened
    fn apply(&self, records: &[Record]) -> CoreResult<Vec<Vec<String>>>;
}

#[derive(Debug, Clone)]
struct Column {
    name: String,
    pointer: String,
    item: bool,
}

/// Column mapping transform
#[derive(Debug, Clone)]
pub struct ColumnTransform {
    explode: Option<String>,
    columns: Vec<Column>,
}

fn check_pointer(pointer: &str, field: &str) -> CoreResult<()> {
    if pointer.is_empty() || pointer.starts_with('/') {
        Ok(())
    } else {
        Err(CoreError::config(
            field,
            format!("'{}' is not a JSON pointer", pointer),
        ))
    }
}

impl ColumnTransform {
    /// Compile a transform definition for the table `schema`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the columns differ from the
    /// schema, a pointer is malformed, or an item column has nothing to
    /// explode
    pub fn compile(def: &TransformDef, schema: &TableSchema, owner: &str) -> CoreResult<Self> {
        let field = format!("{}.transform", owner);
        let names: Vec<&str> = def.columns.iter().map(|c| c.name.as_str()).collect();
        if names != schema.column_names() {
            return Err(CoreError::config(
                field,
                format!(
                    "columns [{}] do not match schema [{}]",
                    names.join(", "),
                    schema.column_names().join(", ")
                ),
            ));
        }
        if let Some(explode) = &def.explode {
            check_pointer(explode, &field)?;
        }

        let mut columns = Vec::with_capacity(def.columns.len());
        for col in &def.columns {
            check_pointer(&col.from, &field)?;
            if col.item && def.explode.is_none() {
                return Err(CoreError::config(
                    field,
                    format!("column '{}' reads an item but nothing is exploded", col.name),
                ));
            }
            columns.push(Column {
                name: col.name.clone(),
                pointer: col.from.clone(),
                item: col.item,
            });
        }

        Ok(Self {
            explode: def.explode.clone(),
            columns,
        })
    }

    fn row(&self, record: &Value, item: Option<&Value>) -> Vec<String> {
        self.columns
            .iter()
            .map(|col| {
                let source = if col.item { item } else { Some(record) };
                source
                    .and_then(|v| v.pointer(&col.pointer))
                    .map(cell)
                    .unwrap_or_default()
            })
            .collect()
    }
}

/// CSV cell text of a JSON value; null is an empty cell
fn cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

impl Transform for ColumnTransform {
    fn columns(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    fn apply(&self, records: &[Record]) -> CoreResult<Vec<Vec<String>>> {
        let mut rows = Vec::with_capacity(records.len());
        for record in records {
            let record = Value::Object(record.clone());
            match &self.explode {
                None => rows.push(self.row(&record, None)),
                Some(pointer) => match record.pointer(pointer) {
                    Some(Value::Array(items)) => {
                        rows.extend(items.iter().map(|item| self.row(&record, Some(item))));
                    }
                    None | Some(Value::Null) => {}
                    Some(other) => {
                        return Err(CoreError::Encoding {
                            reason: format!("'{}' is not a sequence: {}", pointer, other),
                        });
                    }
                },
            }
        }
        Ok(rows)
    }
}
