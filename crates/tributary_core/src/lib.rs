//! Tributary Core Types
//!
//! Pure types shared by every Tributary crate: the error taxonomy, node and
//! run identifiers, the immutable run configuration, raw records and the
//! warehouse table schema. No I/O lives here.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod id;
pub mod record;
pub mod schema;

// Re-exports
pub use config::{RunConfig, RunConfigBuilder};
pub use error::{CoreError, CoreResult};
pub use id::{NodeId, RunId};
pub use record::{FetchResult, Record};
pub use schema::{FieldType, SchemaField, TableSchema};
