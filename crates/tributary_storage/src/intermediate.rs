//! On-disk store for artifacts passed between chain stages.
//!
//! Artifacts live under `<data_dir>/datasets/`. Record sets are JSON
//! arrays named `raw_<resource>.json` or `validated_<resource>.json`;
//! tables are CSV files named `cleaned_<resource>.csv`. A handle is only
//! returned once its file is completely written.

use crate::atomic;
use crate::handle::{ArtifactKind, Handle};
use std::path::{Path, PathBuf};
use tracing::debug;
use tributary_core::{CoreError, CoreResult, Record};

/// Subdirectory of the data directory holding artifacts
pub const DATASETS_DIR: &str = "datasets";

/// Filesystem artifact store
#[derive(Debug, Clone)]
pub struct IntermediateStore {
    dir: PathBuf,
}

impl IntermediateStore {
    /// Open the store under `data_dir`, creating `datasets/` if needed
    ///
    /// # Errors
    ///
    /// Returns an IO error if the directory cannot be created
    pub fn open(data_dir: impl AsRef<Path>) -> CoreResult<Self> {
        let dir = data_dir.as_ref().join(DATASETS_DIR);
        std::fs::create_dir_all(&dir).map_err(|e| CoreError::io(&dir, e))?;
        Ok(Self { dir })
    }

    /// Directory artifacts are written to
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn handle(&self, name: &str, kind: ArtifactKind) -> Handle {
        let path = self.dir.join(format!("{}.{}", name, kind.extension()));
        Handle::new(name.to_string(), kind, path)
    }

    /// Persist a record set as a JSON array
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or the write fails
    pub fn write_records(&self, name: &str, records: &[Record]) -> CoreResult<Handle> {
        let handle = self.handle(name, ArtifactKind::Records);
        let bytes = serde_json::to_vec(records)?;
        atomic::write_file(handle.path(), &bytes)?;
        debug!(path = %handle, records = records.len(), "Data written");
        Ok(handle)
    }

    /// Read back a record set
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the artifact is missing, an encoding error if
    /// it is not a JSON array of objects, or an IO error
    pub fn read_records(&self, handle: &Handle) -> CoreResult<Vec<Record>> {
        if handle.kind() != ArtifactKind::Records {
            return Err(CoreError::Internal {
                message: format!("{} is not a record set", handle.name()),
            });
        }
        let bytes = std::fs::read(handle.path()).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => CoreError::NotFound {
                kind: "artifact".to_string(),
                id: handle.name().to_string(),
            },
            _ => CoreError::io(handle.path(), e),
        })?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Persist a table as CSV with `columns` as the header row
    ///
    /// # Errors
    ///
    /// Returns an encoding error if a row's width differs from the header,
    /// or an IO error
    pub fn write_table<I>(&self, name: &str, columns: &[&str], rows: I) -> CoreResult<Handle>
    where
        I: IntoIterator<Item = Vec<String>>,
    {
        let handle = self.handle(name, ArtifactKind::Table);
        let staged = atomic::staging_file(handle.path())?;
        let mut writer = csv::Writer::from_writer(staged);
        let encoding = |e: csv::Error| CoreError::Encoding {
            reason: e.to_string(),
        };

        writer.write_record(columns).map_err(encoding)?;
        let mut count = 0usize;
        for row in rows {
            writer.write_record(&row).map_err(encoding)?;
            count += 1;
        }
        let staged = writer.into_inner().map_err(|e| CoreError::io(handle.path(), e))?;
        atomic::commit(staged, handle.path())?;

        debug!(path = %handle, rows = count, "Table written");
        Ok(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::{cleaned_name, raw_name};
    use serde_json::json;

    fn record(value: serde_json::Value) -> Record {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn test_open_creates_datasets_dir() {
        let dir = tempfile::tempdir().unwrap();
        let store = IntermediateStore::open(dir.path()).unwrap();
        assert!(store.dir().is_dir());
        assert!(store.dir().ends_with(DATASETS_DIR));
    }

    #[test]
    fn test_records_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = IntermediateStore::open(dir.path()).unwrap();
        let records = vec![
            record(json!({"id": 1, "firstName": "Emily"})),
            record(json!({"id": 2, "firstName": "Michael"})),
        ];

        let handle = store.write_records(&raw_name("users"), &records).unwrap();
        assert!(handle.path().ends_with("datasets/raw_users.json"));
        assert_eq!(store.read_records(&handle).unwrap(), records);
    }

    #[test]
    fn test_rewrite_replaces() {
        let dir = tempfile::tempdir().unwrap();
        let store = IntermediateStore::open(dir.path()).unwrap();
        store
            .write_records("raw_users", &[record(json!({"id": 1}))])
            .unwrap();
        let handle = store.write_records("raw_users", &[]).unwrap();
        assert!(store.read_records(&handle).unwrap().is_empty());
    }

    #[test]
    fn test_read_missing_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = IntermediateStore::open(dir.path()).unwrap();
        let handle = store.write_records("raw_users", &[]).unwrap();
        std::fs::remove_file(handle.path()).unwrap();
        assert!(matches!(
            store.read_records(&handle),
            Err(CoreError::NotFound { .. })
        ));
    }

    #[test]
    fn test_read_table_as_records_fails() {
        let dir = tempfile::tempdir().unwrap();
        let store = IntermediateStore::open(dir.path()).unwrap();
        let handle = store
            .write_table(&cleaned_name("users"), &["id"], vec![vec!["1".to_string()]])
            .unwrap();
        assert!(store.read_records(&handle).is_err());
    }

    #[test]
    fn test_write_table() {
        let dir = tempfile::tempdir().unwrap();
        let store = IntermediateStore::open(dir.path()).unwrap();
        let rows = vec![
            vec!["1".to_string(), "Emily".to_string()],
            vec!["2".to_string(), "Smith, Jr".to_string()],
        ];
        let handle = store
            .write_table("cleaned_users", &["id", "first_name"], rows)
            .unwrap();

        assert_eq!(handle.kind(), ArtifactKind::Table);
        let text = std::fs::read_to_string(handle.path()).unwrap();
        assert_eq!(text, "id,first_name\n1,Emily\n2,\"Smith, Jr\"\n");
    }

    #[test]
    fn test_write_table_ragged_row() {
        let dir = tempfile::tempdir().unwrap();
        let store = IntermediateStore::open(dir.path()).unwrap();
        let result = store.write_table("cleaned_users", &["id", "name"], vec![vec!["1".to_string()]]);
        assert!(matches!(result, Err(CoreError::Encoding { .. })));
        assert!(!store.dir().join("cleaned_users.csv").exists());
    }
}
