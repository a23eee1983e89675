//! Wraps a [`Transport`] with cache-policy and timeout configuration.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, instrument};

use super::constants::{CONNECT_TIMEOUT_SECS, REQUEST_TIMEOUT_SECS, RESOURCE_TIMEOUT_SECS};
use super::error::TransportError;
use super::message::{HttpResponse, PreparedRequest};
use super::{ReqwestTransport, Transport};
use crate::request::{COOKIE_HEADER, CONTENT_TYPE_HEADER, CacheConfig, HttpMethod, RequestDescriptor};

/// Header carrying cache directives.
const CACHE_CONTROL_HEADER: &str = "cache-control";

/// Header naming a redirect target.
const LOCATION_HEADER: &str = "location";

/// Caller headers dropped when a redirect leaves the original origin.
const CROSS_ORIGIN_STRIPPED: [&str; 3] = [COOKIE_HEADER, "authorization", "proxy-authorization"];

/// Timeouts and cache defaults for a [`TransportAdapter`].
///
/// Timeouts apply per attempt, never to a whole retry sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    /// Connect timeout used when the adapter builds its own client.
    pub connect_timeout: Duration,
    /// Per-request timeout handed to the transport.
    pub request_timeout: Duration,
    /// Upper bound on one complete send, enforced by the adapter.
    pub resource_timeout: Duration,
    /// Cache configuration used when a descriptor carries none.
    pub default_cache: Option<CacheConfig>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(CONNECT_TIMEOUT_SECS),
            request_timeout: Duration::from_secs(REQUEST_TIMEOUT_SECS),
            resource_timeout: Duration::from_secs(RESOURCE_TIMEOUT_SECS),
            default_cache: None,
        }
    }
}

/// Prepares requests from descriptors and sends them with per-attempt timeouts.
///
/// The adapter is cheap to clone; clones share the underlying transport.
#[derive(Clone)]
pub struct TransportAdapter {
    transport: Arc<dyn Transport>,
    config: TransportConfig,
}

impl fmt::Debug for TransportAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportAdapter")
            .field("transport", &self.transport)
            .field("config", &self.config)
            .finish()
    }
}

impl TransportAdapter {
    /// Wraps an existing transport.
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>, config: TransportConfig) -> Self {
        Self { transport, config }
    }

    /// Builds a [`ReqwestTransport`] from the config's timeouts and wraps it.
    ///
    /// # Errors
    ///
    /// Returns the client builder error when the client cannot be built.
    pub fn reqwest(config: TransportConfig) -> Result<Self, reqwest::Error> {
        let transport =
            ReqwestTransport::try_with_timeouts(config.connect_timeout, config.resource_timeout)?;
        Ok(Self::new(Arc::new(transport), config))
    }

    /// Returns the adapter configuration.
    #[must_use]
    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    /// Builds the base request for one attempt.
    ///
    /// Cookies are attached afterwards by the cookie bridge.
    #[must_use]
    pub fn prepare(&self, descriptor: &RequestDescriptor) -> PreparedRequest {
        let mut headers = descriptor.headers().clone();
        let body = descriptor.body().map(|body| {
            headers
                .entry(CONTENT_TYPE_HEADER.to_string())
                .or_insert_with(|| body.content_type().to_string());
            body.as_bytes().to_vec()
        });

        PreparedRequest {
            method: descriptor.method(),
            url: descriptor.full_url(),
            headers,
            body,
            timeout: Some(self.config.request_timeout),
            cache: None,
        }
    }

    /// Applies the descriptor's cache configuration (or the adapter default).
    ///
    /// The policy becomes a `Cache-Control` directive unless the caller already
    /// set one; the full config travels with the request for caching transports.
    pub fn apply_cache(&self, descriptor: &RequestDescriptor, request: &mut PreparedRequest) {
        let Some(cache) = descriptor
            .cache()
            .or(self.config.default_cache.as_ref())
            .cloned()
        else {
            return;
        };

        if let Some(directive) = cache.policy.cache_control() {
            request
                .headers
                .entry(CACHE_CONTROL_HEADER.to_string())
                .or_insert_with(|| directive.to_string());
        }
        debug!(policy = cache.policy.as_str(), "applied cache configuration");
        request.cache = Some(cache);
    }

    /// Builds the next hop for a redirect `response` to `request`.
    ///
    /// Returns `None` when the response is not a redirect or its `Location`
    /// is missing or not an http(s) URL. A 303, or a 301/302 answering a
    /// POST, continues as a bodyless GET; 307 and 308 keep method and body.
    /// Credentials set by the caller are dropped when the origin changes.
    #[must_use]
    pub fn redirect(
        &self,
        request: &PreparedRequest,
        response: &HttpResponse,
    ) -> Option<PreparedRequest> {
        if !response.is_redirect() {
            return None;
        }
        let location = response.header(LOCATION_HEADER)?;
        let Ok(target) = request.url.join(location) else {
            debug!(location, "ignoring unparsable redirect location");
            return None;
        };
        if !matches!(target.scheme(), "http" | "https") {
            debug!(%target, "ignoring redirect to unsupported scheme");
            return None;
        }

        let mut next = request.clone();
        let becomes_get = response.status == 303
            || (matches!(response.status, 301 | 302) && request.method == HttpMethod::Post);
        if becomes_get && request.method != HttpMethod::Get {
            next.method = HttpMethod::Get;
            next.body = None;
            next.headers.remove(CONTENT_TYPE_HEADER);
        }
        if target.origin() != request.url.origin() {
            for name in CROSS_ORIGIN_STRIPPED {
                next.headers.remove(name);
            }
        }
        next.url = target;
        Some(next)
    }

    /// Sends a prepared request, bounded by the resource timeout.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Timeout`] when the resource timeout elapses,
    /// or whatever the wrapped transport reports.
    #[instrument(skip(self, request), fields(method = %request.method, url = %request.url))]
    pub async fn send(&self, request: PreparedRequest) -> Result<HttpResponse, TransportError> {
        let url = request.url.to_string();
        match tokio::time::timeout(self.config.resource_timeout, self.transport.send(request)).await
        {
            Ok(result) => result,
            Err(_) => {
                debug!(
                    timeout_ms = self.config.resource_timeout.as_millis(),
                    "resource timeout elapsed"
                );
                Err(TransportError::timeout(url))
            }
        }
    }
}
