//! HTTP GET capability used by the fetcher.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

/// Transport errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// Request could not be sent or no response arrived
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Non-success status code
    #[error("HTTP {status} from {url}")]
    Status {
        /// Status code returned
        status: u16,
        /// Requested URL
        url: String,
    },

    /// Response body was not the expected JSON
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Something that can GET a URL with query parameters and decode JSON
#[async_trait]
pub trait HttpGet: Send + Sync {
    /// Issue one GET request
    async fn get_json(&self, url: &str, query: &[(&str, String)]) -> Result<Value, TransportError>;
}

/// `reqwest`-backed implementation
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    /// Create a client with a per-request timeout
    ///
    /// # Errors
    ///
    /// Returns error if the TLS backend cannot be initialised
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpGet for HttpClient {
    async fn get_json(&self, url: &str, query: &[(&str, String)]) -> Result<Value, TransportError> {
        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| TransportError::InvalidResponse(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_new() {
        assert!(HttpClient::new(Duration::from_secs(5)).is_ok());
    }

    #[test]
    fn test_status_display() {
        let err = TransportError::Status {
            status: 503,
            url: "https://dummyjson.com/users".to_string(),
        };
        assert_eq!(err.to_string(), "HTTP 503 from https://dummyjson.com/users");
    }
}
