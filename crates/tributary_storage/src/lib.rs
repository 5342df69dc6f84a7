//! Tributary Storage
//!
//! Where stage outputs live between stages, and the two sinks a chain
//! writes to: object storage and the warehouse. Every write replaces its
//! target atomically, so readers see either the old artifact or the new
//! one, never a partial file.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod atomic;
pub mod handle;
pub mod intermediate;
pub mod object;
pub mod warehouse;

pub use handle::{ArtifactKind, Handle};
pub use intermediate::IntermediateStore;
pub use object::{DirObjectStore, ObjectStore};
pub use warehouse::{DirWarehouse, LoadReport, Warehouse};
