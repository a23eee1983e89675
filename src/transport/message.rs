//! Request and response values exchanged with a [`Transport`](super::Transport).

use std::collections::BTreeMap;
use std::time::Duration;

use url::Url;

use crate::request::{CacheConfig, HttpMethod};

/// A fully prepared request ready to be sent.
///
/// Produced from a [`RequestDescriptor`](crate::request::RequestDescriptor)
/// once per attempt, after cookies and cache directives have been applied.
#[derive(Debug, Clone)]
pub struct PreparedRequest {
    /// HTTP method.
    pub method: HttpMethod,
    /// Final URL including query parameters.
    pub url: Url,
    /// Headers keyed by lowercase name.
    pub headers: BTreeMap<String, String>,
    /// Encoded body bytes.
    pub body: Option<Vec<u8>>,
    /// Per-request timeout the transport should apply.
    pub timeout: Option<Duration>,
    /// Cache sizing and policy for transports that maintain a cache.
    pub cache: Option<CacheConfig>,
}

impl PreparedRequest {
    /// Looks up a header by case-insensitive name.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }
}

/// A response received from a transport.
///
/// Headers keep every occurrence in arrival order so repeated headers such
/// as `Set-Cookie` survive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// Status code as reported by the transport.
    pub status: u16,
    /// Header name/value pairs in arrival order.
    pub headers: Vec<(String, String)>,
    /// Response body bytes.
    pub body: Vec<u8>,
    /// URL that produced the response.
    pub url: Url,
}

impl HttpResponse {
    /// Creates a response with no headers.
    #[must_use]
    pub fn new(status: u16, body: impl Into<Vec<u8>>, url: Url) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
            url,
        }
    }

    /// Appends a header occurrence.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Returns all values of a header, matching the name case-insensitively.
    pub fn header_values<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.headers
            .iter()
            .filter(move |(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Returns the first value of a header.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Whether the status is a redirect the executor follows.
    #[must_use]
    pub fn is_redirect(&self) -> bool {
        matches!(self.status, 301 | 302 | 303 | 307 | 308)
    }

    /// Whether the status is a valid HTTP status code (100..=599).
    #[must_use]
    pub fn is_http_status(&self) -> bool {
        (100..600).contains(&self.status)
    }

    /// Whether the status is in `[200, 300)`.
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}
