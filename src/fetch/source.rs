//! List data sources.
//!
//! A source turns request params into a raw JSON payload. The payload shape
//! is the server's business; [`super::normalize`] deals with it afterwards.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ErrorCode;
use crate::query::{ListQuery, render_value};

pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

// =============================================================================
// ERROR
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// The HTTP request could not be sent or the body not read.
    #[error("list request failed: {0}")]
    Request(String),

    /// The endpoint answered with a non-success status.
    #[error("list endpoint returned status {status}")]
    Status { status: u16, body: String },

    /// The response body was not valid JSON.
    #[error("list response parse failed: {0}")]
    Parse(String),

    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),

    /// A local source reported a failure.
    #[error("list source failed: {0}")]
    Source(String),
}

impl ErrorCode for FetchError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Request(_) => "E_FETCH_REQUEST",
            Self::Status { .. } => "E_FETCH_STATUS",
            Self::Parse(_) => "E_FETCH_PARSE",
            Self::HttpClientBuild(_) => "E_HTTP_CLIENT_BUILD",
            Self::Source(_) => "E_FETCH_SOURCE",
        }
    }
}

// =============================================================================
// TRAIT
// =============================================================================

/// Anything that can produce a raw list payload for a set of params.
#[async_trait::async_trait]
pub trait ListSource: Send + Sync {
    async fn fetch(&self, params: &ListQuery) -> Result<Value, FetchError>;
}

// =============================================================================
// REMOTE
// =============================================================================

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    /// GET and DELETE carry params in the query string; POST and PUT in a JSON body.
    #[must_use]
    pub fn uses_query_string(self) -> bool {
        matches!(self, Self::Get | Self::Delete)
    }

    fn as_reqwest(self) -> reqwest::Method {
        match self {
            Self::Get => reqwest::Method::GET,
            Self::Post => reqwest::Method::POST,
            Self::Put => reqwest::Method::PUT,
            Self::Delete => reqwest::Method::DELETE,
        }
    }
}

impl std::str::FromStr for HttpMethod {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.to_ascii_lowercase().as_str() {
            "get" => Ok(Self::Get),
            "post" => Ok(Self::Post),
            "put" => Ok(Self::Put),
            "delete" => Ok(Self::Delete),
            other => Err(format!("unsupported method '{other}' (expected get, post, put, or delete)")),
        }
    }
}

/// Remote endpoint description.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteEndpoint {
    pub url: String,
    #[serde(default)]
    pub method: HttpMethod,
}

impl RemoteEndpoint {
    #[must_use]
    pub fn get(url: impl Into<String>) -> Self {
        Self { url: url.into(), method: HttpMethod::Get }
    }

    #[must_use]
    pub fn post(url: impl Into<String>) -> Self {
        Self { url: url.into(), method: HttpMethod::Post }
    }
}

/// `ListSource` backed by an HTTP endpoint.
pub struct RemoteSource {
    http: reqwest::Client,
    endpoint: RemoteEndpoint,
}

impl RemoteSource {
    /// Build a source with default timeouts.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::HttpClientBuild`] if the HTTP client fails to build.
    pub fn new(endpoint: RemoteEndpoint) -> Result<Self, FetchError> {
        Self::with_timeouts(
            endpoint,
            Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
        )
    }

    /// Build a source with explicit request and connect timeouts.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::HttpClientBuild`] if the HTTP client fails to build.
    pub fn with_timeouts(endpoint: RemoteEndpoint, request: Duration, connect: Duration) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .timeout(request)
            .connect_timeout(connect)
            .build()
            .map_err(|e| FetchError::HttpClientBuild(e.to_string()))?;
        Ok(Self { http, endpoint })
    }

    #[must_use]
    pub fn endpoint(&self) -> &RemoteEndpoint {
        &self.endpoint
    }
}

/// Flatten params into query pairs; `null` entries are skipped.
#[must_use]
pub fn query_pairs(params: &ListQuery) -> Vec<(String, String)> {
    params
        .iter()
        .filter_map(|(key, value)| render_value(value).map(|text| (key.clone(), text)))
        .collect()
}

#[async_trait::async_trait]
impl ListSource for RemoteSource {
    async fn fetch(&self, params: &ListQuery) -> Result<Value, FetchError> {
        let method = self.endpoint.method;
        let request = self.http.request(method.as_reqwest(), self.endpoint.url.as_str());
        let request = if method.uses_query_string() {
            request.query(&query_pairs(params))
        } else {
            request.json(params)
        };

        let response = request
            .send()
            .await
            .map_err(|e| FetchError::Request(e.to_string()))?;
        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| FetchError::Request(e.to_string()))?;

        if !(200..300).contains(&status) {
            return Err(FetchError::Status { status, body: text });
        }
        serde_json::from_str(&text).map_err(|e| FetchError::Parse(e.to_string()))
    }
}

// =============================================================================
// LOCAL
// =============================================================================

/// `ListSource` backed by an async closure.
pub struct FnSource<F>(F);

#[async_trait::async_trait]
impl<F, Fut> ListSource for FnSource<F>
where
    F: Fn(ListQuery) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, FetchError>> + Send + 'static,
{
    async fn fetch(&self, params: &ListQuery) -> Result<Value, FetchError> {
        (self.0)(params.clone()).await
    }
}

/// Wrap an async closure as a shared list source.
pub fn from_fn<F, Fut>(f: F) -> Arc<dyn ListSource>
where
    F: Fn(ListQuery) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, FetchError>> + Send + 'static,
{
    Arc::new(FnSource(f))
}

#[cfg(test)]
#[path = "source_test.rs"]
mod tests;
