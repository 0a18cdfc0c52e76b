//! `reqwest`-backed [`Transport`].
//!
//! Relative endpoints are joined onto the configured base URL; absolute
//! endpoints (`http://` or `https://`) are used as given.

use std::time::Duration;

use crate::error::TransportError;
use crate::transport::{Method, RemoteRequest, Transport};

/// Default per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP transport for a JSON collection API.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    /// Create a transport with the default request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Request`] if the client cannot be built.
    pub fn new(base_url: impl Into<String>) -> Result<Self, TransportError> {
        Self::with_timeout(base_url, DEFAULT_REQUEST_TIMEOUT)
    }

    /// Create a transport with an explicit per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Request`] if the client cannot be built.
    pub fn with_timeout(
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Request(format!("client build failed: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    /// Full URL for a request, without query string.
    pub fn url_for(&self, request: &RemoteRequest) -> String {
        let path = request.path();
        if path.starts_with("http://") || path.starts_with("https://") {
            return path;
        }
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

impl Transport for HttpTransport {
    async fn execute(&self, request: &RemoteRequest) -> Result<serde_json::Value, TransportError> {
        let url = self.url_for(request);
        let mut builder = match request.method {
            Method::Get => self.client.get(&url),
            Method::Post => self.client.post(&url),
            Method::Put => self.client.put(&url),
            Method::Delete => self.client.delete(&url),
        };
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| TransportError::Request(format!("{} {url}: {e}", request.method)))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| TransportError::Request(format!("reading body of {url}: {e}")))?;

        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
                body: text,
            });
        }
        if text.trim().is_empty() {
            return Ok(serde_json::Value::Null);
        }
        serde_json::from_str(&text).map_err(|e| TransportError::Body(e.to_string()))
    }
}
