//! Warehouse table schemas.

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};

/// Column type of a warehouse table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FieldType {
    /// 64-bit signed integer
    Integer,
    /// UTF-8 string
    String,
    /// Exact decimal
    Numeric,
    /// Floating point
    Float,
    /// true / false
    Boolean,
}

impl FieldType {
    /// Whether a CSV cell can be loaded into a column of this type.
    ///
    /// An empty cell is NULL and always accepted.
    #[must_use]
    pub fn accepts(&self, cell: &str) -> bool {
        if cell.is_empty() {
            return true;
        }
        match self {
            Self::Integer => cell.parse::<i64>().is_ok(),
            Self::String => true,
            Self::Numeric | Self::Float => cell.parse::<f64>().is_ok_and(f64::is_finite),
            Self::Boolean => {
                cell.eq_ignore_ascii_case("true") || cell.eq_ignore_ascii_case("false")
            }
        }
    }
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Integer => "INTEGER",
            Self::String => "STRING",
            Self::Numeric => "NUMERIC",
            Self::Float => "FLOAT",
            Self::Boolean => "BOOLEAN",
        };
        f.write_str(name)
    }
}

/// One column of a table schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaField {
    /// Column name
    pub name: String,
    /// Column type
    #[serde(rename = "type")]
    pub field_type: FieldType,
}

impl SchemaField {
    /// Create a new field
    #[must_use]
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
        }
    }
}

/// Ordered column list of a destination table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TableSchema {
    /// Columns in load order
    pub fields: Vec<SchemaField>,
}

impl TableSchema {
    /// Create a schema from its fields
    #[must_use]
    pub fn new(fields: Vec<SchemaField>) -> Self {
        Self { fields }
    }

    /// Column names in order
    #[must_use]
    pub fn column_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }

    /// Check the schema is loadable: non-empty with unique column names
    ///
    /// # Errors
    ///
    /// Returns a configuration error naming the first problem found
    pub fn check(&self, owner: &str) -> CoreResult<()> {
        if self.fields.is_empty() {
            return Err(CoreError::config(
                format!("{}.schema", owner),
                "schema has no columns",
            ));
        }
        let mut seen = std::collections::HashSet::new();
        for field in &self.fields {
            if field.name.is_empty() {
                return Err(CoreError::config(
                    format!("{}.schema", owner),
                    "column name is empty",
                ));
            }
            if !seen.insert(field.name.as_str()) {
                return Err(CoreError::config(
                    format!("{}.schema", owner),
                    format!("duplicate column '{}'", field.name),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_type_accepts() {
        assert!(FieldType::Integer.accepts("42"));
        assert!(!FieldType::Integer.accepts("4.2"));
        assert!(FieldType::Numeric.accepts("9.99"));
        assert!(!FieldType::Numeric.accepts("NaN"));
        assert!(FieldType::Boolean.accepts("TRUE"));
        assert!(!FieldType::Boolean.accepts("yes"));
        assert!(FieldType::String.accepts("anything"));
    }

    #[test]
    fn test_empty_cell_is_null() {
        assert!(FieldType::Integer.accepts(""));
        assert!(FieldType::Boolean.accepts(""));
    }

    #[test]
    fn test_schema_deserialize() {
        let schema: TableSchema = serde_json::from_str(
            r#"[{"name": "user_id", "type": "INTEGER"}, {"name": "city", "type": "STRING"}]"#,
        )
        .unwrap();
        assert_eq!(schema.column_names(), vec!["user_id", "city"]);
        assert_eq!(schema.fields[0].field_type, FieldType::Integer);
    }

    #[test]
    fn test_schema_check() {
        let ok = TableSchema::new(vec![SchemaField::new("id", FieldType::Integer)]);
        assert!(ok.check("users").is_ok());

        let empty = TableSchema::default();
        assert!(empty.check("users").is_err());

        let dup = TableSchema::new(vec![
            SchemaField::new("id", FieldType::Integer),
            SchemaField::new("id", FieldType::String),
        ]);
        assert!(dup.check("users").is_err());
    }

    #[test]
    fn test_field_type_display() {
        assert_eq!(FieldType::Numeric.to_string(), "NUMERIC");
    }

    proptest::proptest! {
        #[test]
        fn prop_integer_cells_load_as_numbers(n in proptest::num::i64::ANY) {
            let cell = n.to_string();
            proptest::prop_assert!(FieldType::Integer.accepts(&cell));
            proptest::prop_assert!(FieldType::Numeric.accepts(&cell));
        }

        #[test]
        fn prop_finite_floats_load_as_numeric(x in proptest::num::f64::NORMAL) {
            proptest::prop_assert!(FieldType::Numeric.accepts(&x.to_string()));
        }
    }
}
