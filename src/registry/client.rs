//! HTTP client shared foundation
//!
//! This module provides a shared HTTP client with:
//! - Configurable timeout and User-Agent
//! - Authorization resolved per request URL
//! - Classification of transport and status failures into `SourceError`
//!
//! Failed requests are not retried; the caller skips the source for the run.

use super::auth::AuthResolver;
use crate::error::SourceError;
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, Response};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Default timeout for HTTP requests (30 seconds)
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default User-Agent header
const DEFAULT_USER_AGENT: &str = concat!("chartup/", env!("CARGO_PKG_VERSION"));

/// HTTP client wrapper that attaches configured credentials
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    auth: Arc<AuthResolver>,
}

impl HttpClient {
    /// Create a new HTTP client with default settings and no credentials
    pub fn new() -> Result<Self, SourceError> {
        Self::with_config(DEFAULT_TIMEOUT, DEFAULT_USER_AGENT)
    }

    /// Create a new HTTP client with custom configuration
    pub fn with_config(timeout: Duration, user_agent: &str) -> Result<Self, SourceError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| SourceError::Client {
                message: e.to_string(),
            })?;

        Ok(Self {
            client,
            auth: Arc::new(AuthResolver::default()),
        })
    }

    /// Attach a credential resolver (builder pattern)
    pub fn with_auth(mut self, auth: AuthResolver) -> Self {
        self.auth = Arc::new(auth);
        self
    }

    /// `Authorization` header value configured for a URL
    pub fn authorization_for(&self, url: &str) -> Option<String> {
        self.auth.header_for(url)
    }

    /// Send a GET request with an explicit authorization, without checking the status
    pub async fn send(&self, url: &str, authorization: Option<&str>) -> Result<Response, SourceError> {
        let mut request = self.client.get(url);
        if let Some(value) = authorization {
            request = request.header(AUTHORIZATION, value);
        }
        debug!(url, authenticated = authorization.is_some(), "GET");
        request
            .send()
            .await
            .map_err(|e| SourceError::from_transport(url, &e))
    }

    /// Perform a GET request with configured credentials; non-success is an error
    pub async fn get(&self, url: &str) -> Result<Response, SourceError> {
        let authorization = self.authorization_for(url);
        let response = self.send(url, authorization.as_deref()).await?;
        ensure_success(url, response)
    }

    /// Perform a GET request and return the body as text
    pub async fn get_text(&self, url: &str) -> Result<String, SourceError> {
        read_text(url, self.get(url).await?).await
    }
}

/// Turn a non-success status into the matching `SourceError`
pub(crate) fn ensure_success(url: &str, response: Response) -> Result<Response, SourceError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(SourceError::from_status(url, status))
    }
}

pub(crate) async fn read_text(url: &str, response: Response) -> Result<String, SourceError> {
    response
        .text()
        .await
        .map_err(|e| SourceError::invalid_response(url, format!("failed to read body: {}", e)))
}

pub(crate) async fn read_json<T: serde::de::DeserializeOwned>(
    url: &str,
    response: Response,
) -> Result<T, SourceError> {
    response
        .json::<T>()
        .await
        .map_err(|e| SourceError::invalid_response(url, format!("failed to parse JSON: {}", e)))
}
