//! Relay HTTP Clients
//!
//! Type-safe HTTP clients for everything the runner talks to over the network:
//! - [`RedashClient`]: query execution, job polling and result retrieval
//! - [`WebhookClient`]: chat webhook messages
//! - [`SheetClient`]: CSV export of the configuration spreadsheet
//!
//! # Example
//!
//! ```no_run
//! use relay_client::RedashClient;
//! use relay_core::domain::task::Parameters;
//!
//! # async fn example() -> relay_client::Result<()> {
//! let client = RedashClient::new("https://redash.example.com");
//! let job_id = client.execute_query("api-key", 42, Parameters::new()).await?;
//! let state = client.get_job("api-key", &job_id).await?;
//! println!("job {} is {}", job_id, state.status);
//! # Ok(())
//! # }
//! ```

pub mod error;
mod jobs;
mod queries;
mod results;
mod sheets;
mod webhook;

// Re-export commonly used types
pub use error::{ClientError, Result};
pub use sheets::SheetClient;
pub use webhook::WebhookClient;

use relay_core::dto::redash::JobEnvelope;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;

/// HTTP client for the Redash API
///
/// Cheap to clone; clones share one connection pool. Every request is
/// authenticated with the API key of the query it concerns.
#[derive(Debug, Clone)]
pub struct RedashClient {
    /// Base URL of the Redash instance (e.g., "https://redash.example.com")
    base_url: String,
    /// HTTP client instance
    client: Client,
}

impl RedashClient {
    /// Create a new Redash client
    ///
    /// # Arguments
    /// * `base_url` - The base URL of the Redash instance
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, Client::new())
    }

    /// Create a new Redash client with a custom HTTP client
    ///
    /// This allows you to configure timeouts, proxies, TLS settings, etc.
    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    /// Get the base URL of the Redash instance
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn authorized(&self, request: RequestBuilder, api_key: &str) -> RequestBuilder {
        request.header(reqwest::header::AUTHORIZATION, format!("Key {}", api_key))
    }
}

// =============================================================================
// Response Handlers
// =============================================================================

/// Check the status code and deserialize the JSON body
pub(crate) async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let response = check_status(response).await?;

    response
        .json()
        .await
        .map_err(|e| ClientError::ParseError(format!("Failed to parse JSON response: {}", e)))
}

/// Turn a non-2xx response into [`ClientError::ApiError`]
///
/// Redash reports errors either as `{"job": {"error": ...}}` or as
/// `{"message": ...}`; the most specific message wins, and the raw body is
/// used when neither is present.
pub(crate) async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();

    if status.is_success() {
        return Ok(response);
    }

    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    let message = serde_json::from_str::<JobEnvelope>(&body)
        .ok()
        .and_then(|envelope| envelope.error_message())
        .unwrap_or(body);

    Err(ClientError::api_error(status.as_u16(), message))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = RedashClient::new("https://redash.example.com");
        assert_eq!(client.base_url(), "https://redash.example.com");
    }

    #[test]
    fn test_client_trims_trailing_slash() {
        let client = RedashClient::new("https://redash.example.com/");
        assert_eq!(client.base_url(), "https://redash.example.com");
    }

    #[test]
    fn test_client_with_custom_client() {
        let client = RedashClient::with_client("https://redash.example.com", Client::new());
        assert_eq!(client.base_url(), "https://redash.example.com");
    }

    #[test]
    fn test_authorization_header() {
        let client = RedashClient::new("https://redash.example.com");
        let request = client
            .authorized(client.client.get("https://redash.example.com/api/jobs/1"), "k3y")
            .build()
            .unwrap();
        assert_eq!(request.headers()[reqwest::header::AUTHORIZATION], "Key k3y");
    }
}
