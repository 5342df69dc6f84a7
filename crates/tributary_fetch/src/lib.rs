//! Tributary Paginated Fetcher
//!
//! Walks a `limit`/`skip` listing endpoint until the source is exhausted or
//! a caller-supplied cap is reached. Transport failures abort the fetch;
//! retrying is left to whoever runs the stage.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod http;
pub mod paginate;

pub use http::{HttpClient, HttpGet, TransportError};
pub use paginate::{DEFAULT_PAGE_SIZE, Paginator, resource_type};
