//! Default transport backed by `reqwest`.
//!
//! This module provides [`ReqwestTransport`], which owns a pooled
//! `reqwest::Client` configured with connect/total timeouts, gzip, and an
//! identifying User-Agent. Redirects are returned to the caller unfollowed
//! so every hop passes through the cookie jar.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, ClientBuilder, Method, redirect};
use tracing::{debug, instrument};

use super::constants::{CONNECT_TIMEOUT_SECS, RESOURCE_TIMEOUT_SECS};
use super::error::TransportError;
use super::message::{HttpResponse, PreparedRequest};
use super::Transport;
use crate::request::HttpMethod;
use crate::user_agent;

/// HTTP transport using a shared `reqwest::Client`.
///
/// Create it once and reuse it; cloning is cheap and shares the
/// connection pool.
///
/// # Example
///
/// ```no_run
/// use fetcher_core::transport::ReqwestTransport;
///
/// let transport = ReqwestTransport::new();
/// # drop(transport);
/// ```
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl ReqwestTransport {
    /// Creates a transport with default timeouts.
    ///
    /// Default configuration:
    /// - Connect timeout: 30 seconds
    /// - Total timeout: 5 minutes
    /// - Gzip decompression: enabled
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails to build with the static
    /// configuration. This should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn new() -> Self {
        Self::try_with_timeouts(
            Duration::from_secs(CONNECT_TIMEOUT_SECS),
            Duration::from_secs(RESOURCE_TIMEOUT_SECS),
        )
        .expect("failed to build HTTP client with static configuration")
    }

    /// Creates a transport with explicit connect and total timeouts.
    ///
    /// # Errors
    ///
    /// Returns the builder error when the client cannot be constructed
    /// (for example when the TLS backend fails to initialize).
    #[instrument(level = "debug")]
    pub fn try_with_timeouts(
        connect_timeout: Duration,
        total_timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = base_client_builder(connect_timeout, total_timeout).build()?;
        Ok(Self { client })
    }

    /// Returns a reference to the underlying reqwest client.
    #[must_use]
    pub fn inner(&self) -> &Client {
        &self.client
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    #[instrument(skip(self, request), fields(method = %request.method, url = %request.url))]
    async fn send(&self, request: PreparedRequest) -> Result<HttpResponse, TransportError> {
        let url = request.url.to_string();
        let mut builder = self
            .client
            .request(to_reqwest_method(request.method), request.url.clone());

        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_builder() {
                TransportError::invalid_request(url.clone(), e.to_string())
            } else {
                TransportError::from_reqwest(url.clone(), e)
            }
        })?;

        let status = response.status().as_u16();
        let final_url = response.url().clone();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect::<Vec<_>>();

        let body = response
            .bytes()
            .await
            .map_err(|e| TransportError::from_reqwest(url.clone(), e))?
            .to_vec();

        debug!(status, bytes = body.len(), "response received");

        Ok(HttpResponse {
            status,
            headers,
            body,
            url: final_url,
        })
    }
}

fn base_client_builder(connect_timeout: Duration, total_timeout: Duration) -> ClientBuilder {
    Client::builder()
        .connect_timeout(connect_timeout)
        .timeout(total_timeout)
        .gzip(true)
        .redirect(redirect::Policy::none())
        .user_agent(user_agent::default_user_agent())
}

fn to_reqwest_method(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Delete => Method::DELETE,
        HttpMethod::Patch => Method::PATCH,
    }
}
