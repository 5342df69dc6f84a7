//! Offset-based pagination over a listing endpoint.

use crate::http::HttpGet;
use serde_json::Value;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};
use tributary_core::{CoreError, CoreResult, FetchResult, Record};

/// Items requested per round unless configured otherwise
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Key of the response array for an endpoint: its last path segment.
///
/// # Errors
///
/// Returns a configuration error if the endpoint is not a URL or has no
/// path segment
pub fn resource_type(endpoint: &str) -> CoreResult<String> {
    let url = reqwest::Url::parse(endpoint)
        .map_err(|e| CoreError::config("endpoint", format!("'{}': {}", endpoint, e)))?;
    url.path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).next_back())
        .map(str::to_string)
        .ok_or_else(|| CoreError::config("endpoint", format!("'{}' has no path", endpoint)))
}

/// Paginated fetcher
#[derive(Clone)]
pub struct Paginator {
    client: Arc<dyn HttpGet>,
    page_size: usize,
    max_items: usize,
}

impl Paginator {
    /// Create a fetcher with the default page size and no cap
    #[must_use]
    pub fn new(client: Arc<dyn HttpGet>) -> Self {
        Self {
            client,
            page_size: DEFAULT_PAGE_SIZE,
            max_items: 0,
        }
    }

    /// Set the number of items requested per round (minimum 1)
    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Stop once this many items are accumulated; 0 fetches everything
    #[must_use]
    pub fn with_max_items(mut self, max_items: usize) -> Self {
        self.max_items = max_items;
        self
    }

    /// Fetch every item of `endpoint`, or the first `max_items` of them.
    ///
    /// The offset advances by the number of items actually returned, so a
    /// short page that is not empty does not skip or repeat anything. The
    /// token is checked before each round.
    ///
    /// # Errors
    ///
    /// Returns a transport error on the first failed round (no partial
    /// result), a configuration error for an unusable endpoint, or
    /// `Cancelled` if the token fires between rounds
    pub async fn fetch(&self, endpoint: &str, cancel: &CancellationToken) -> CoreResult<FetchResult> {
        let resource = resource_type(endpoint)?;
        let mut result = FetchResult::new(resource.clone());
        let mut offset = 0usize;

        while self.max_items == 0 || result.len() < self.max_items {
            if cancel.is_cancelled() {
                info!(resource = %resource, fetched = result.len(), "Fetch cancelled");
                return Err(CoreError::Cancelled);
            }

            let query = [
                ("limit", self.page_size.to_string()),
                ("skip", offset.to_string()),
            ];
            let body = self.client.get_json(endpoint, &query).await.map_err(|e| {
                error!(resource = %resource, offset, error = %e, "Error trying to fetch data");
                CoreError::Transport {
                    resource: resource.clone(),
                    reason: e.to_string(),
                }
            })?;

            let page = take_page(body, &resource)?;
            if page.is_empty() {
                break;
            }
            debug!(resource = %resource, offset, returned = page.len(), "Fetched page");
            offset += page.len();
            result.records.extend(page);
        }

        if self.max_items > 0 {
            result.records.truncate(self.max_items);
        }
        info!(resource = %resource, items = result.len(), "Fetch complete");
        Ok(result)
    }
}

fn take_page(body: Value, resource: &str) -> CoreResult<Vec<Record>> {
    let invalid = |reason: String| {
        error!(resource = %resource, reason = %reason, "Unexpected response payload");
        CoreError::Transport {
            resource: resource.to_string(),
            reason,
        }
    };

    let Value::Object(mut body) = body else {
        return Err(invalid("response is not a JSON object".to_string()));
    };
    let items = match body.remove(resource) {
        Some(Value::Array(items)) => items,
        Some(_) => return Err(invalid(format!("'{}' is not an array", resource))),
        None => return Err(invalid(format!("response has no '{}' key", resource))),
    };

    items
        .into_iter()
        .map(|item| match item {
            Value::Object(record) => Ok(record),
            other => Err(invalid(format!("element is not an object: {}", other))),
        })
        .collect()
}
