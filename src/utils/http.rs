//! HTTP client utilities.

use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use super::retry::{with_retry, RetryConfig};
use crate::config::NetworkConfig;

/// Transport-level failure of a single request
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connection(String),

    /// Non-success HTTP status
    #[error("HTTP {status}")]
    Status { status: u16 },

    #[error("{0}")]
    Other(String),
}

impl TransportError {
    pub fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout
        } else if err.is_connect() {
            TransportError::Connection(err.to_string())
        } else if let Some(status) = err.status() {
            TransportError::Status {
                status: status.as_u16(),
            }
        } else {
            TransportError::Other(err.to_string())
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::Status { status } => Some(*status),
            _ => None,
        }
    }
}

/// A successful (2xx) response, fully read
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: String,
}

/// Shared HTTP client: one connection pool, one User-Agent, and the service
/// base URLs every request is built from.
///
/// Cheap to clone; clones share the pool.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Arc<Client>,
    timeout: Duration,
    retry: RetryConfig,
    doi_resolver_base: Arc<str>,
    crossref_works_base: Arc<str>,
}

impl HttpClient {
    /// Build a client from network settings
    pub fn new(config: &NetworkConfig) -> Result<Self, TransportError> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.timeout())
            .connect_timeout(config.connect_timeout())
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(|e| TransportError::Other(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self::from_client(Arc::new(client), config))
    }

    /// Wrap an existing reqwest client
    pub fn from_client(client: Arc<Client>, config: &NetworkConfig) -> Self {
        Self {
            client,
            timeout: config.timeout(),
            retry: config.retry_config(),
            doi_resolver_base: Arc::from(config.doi_resolver_base.as_str()),
            crossref_works_base: Arc::from(config.crossref_works_base.as_str()),
        }
    }

    /// Replace the retry policy
    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Get the underlying client
    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn doi_resolver_base(&self) -> &str {
        &self.doi_resolver_base
    }

    pub fn crossref_works_base(&self) -> &str {
        &self.crossref_works_base
    }

    /// GET `url` with the given `Accept` header. Transient failures are
    /// retried; any non-2xx final status is an error.
    pub async fn get(&self, url: &str, accept: &str) -> Result<HttpResponse, TransportError> {
        tracing::debug!("GET {} (Accept: {})", url, accept);

        let client = self.client.as_ref();
        let timeout = self.timeout;

        with_retry(self.retry, move || async move {
            let response = client
                .get(url)
                .header(ACCEPT, accept)
                .timeout(timeout)
                .send()
                .await
                .map_err(TransportError::from_reqwest)?;

            let status = response.status();
            if !status.is_success() {
                return Err(TransportError::Status {
                    status: status.as_u16(),
                });
            }

            let content_type = response
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);

            let body = response.text().await.map_err(TransportError::from_reqwest)?;

            Ok(HttpResponse {
                status: status.as_u16(),
                content_type,
                body,
            })
        })
        .await
    }

    /// HEAD `url`, following redirects, and return the final status code
    pub async fn head(&self, url: &str) -> Result<u16, TransportError> {
        tracing::debug!("HEAD {}", url);

        let response = self
            .client
            .head(url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(TransportError::from_reqwest)?;

        Ok(response.status().as_u16())
    }
}
