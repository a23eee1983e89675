//! Error types for the transport module.
//!
//! Transport errors describe network-level failures only. HTTP status codes
//! are never errors at this layer; the executor classifies them.

use thiserror::Error;

/// Errors produced while sending a request through a transport.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Network-level error from the HTTP client (DNS, connection refused, TLS, etc.)
    #[error("network error requesting {url}: {source}")]
    Network {
        /// The URL that failed.
        url: String,
        /// The underlying client error.
        #[source]
        source: reqwest::Error,
    },

    /// The attempt did not complete before its timeout elapsed.
    #[error("timeout requesting {url}")]
    Timeout {
        /// The URL that timed out.
        url: String,
    },

    /// The prepared request could not be handed to the client.
    #[error("invalid request for {url}: {reason}")]
    InvalidRequest {
        /// The URL of the rejected request.
        url: String,
        /// Why the request was rejected.
        reason: String,
    },

    /// A redirect chain exceeded the hop limit.
    #[error("too many redirects requesting {url} (limit {limit})")]
    TooManyRedirects {
        /// The URL whose chain was abandoned.
        url: String,
        /// Hops allowed per attempt.
        limit: usize,
    },

    /// A custom transport could not deliver the request.
    #[error("transport unavailable for {url}: {reason}")]
    Unavailable {
        /// The URL that could not be reached.
        url: String,
        /// Transport-specific description.
        reason: String,
    },
}

impl TransportError {
    /// Creates a network error from a reqwest error.
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            url: url.into(),
            source,
        }
    }

    /// Creates a timeout error.
    pub fn timeout(url: impl Into<String>) -> Self {
        Self::Timeout { url: url.into() }
    }

    /// Creates an invalid-request error.
    pub fn invalid_request(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidRequest {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Creates a redirect-limit error.
    pub fn too_many_redirects(url: impl Into<String>, limit: usize) -> Self {
        Self::TooManyRedirects {
            url: url.into(),
            limit,
        }
    }

    /// Creates an unavailable error for custom transports.
    pub fn unavailable(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Unavailable {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Maps a reqwest error, promoting timeouts to [`TransportError::Timeout`].
    pub fn from_reqwest(url: impl Into<String>, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            Self::timeout(url)
        } else {
            Self::network(url, source)
        }
    }

    /// Returns the URL the failed request targeted.
    #[must_use]
    pub fn url(&self) -> &str {
        match self {
            Self::Network { url, .. }
            | Self::Timeout { url }
            | Self::InvalidRequest { url, .. }
            | Self::TooManyRedirects { url, .. }
            | Self::Unavailable { url, .. } => url,
        }
    }

    /// Returns true for timeouts.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}
