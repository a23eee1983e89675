//! Error types for request execution.
//!
//! Per-attempt failures are classified into [`RequestError`] variants; the
//! executor wraps the last one in [`RequestError::RequestFailed`] once the
//! retry budget is spent.

use thiserror::Error;

use crate::transport::TransportError;

/// Errors that can occur while executing a request.
#[derive(Debug, Error)]
pub enum RequestError {
    /// The transport returned something that is not an HTTP response.
    #[error("invalid response from {url} (status {status})")]
    InvalidResponse {
        /// The URL that was requested.
        url: String,
        /// Raw status reported by the transport.
        status: u16,
    },

    /// The server answered with a status outside `200..300`.
    #[error("HTTP {status} from {url}")]
    ServerError {
        /// The URL that was requested.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// The response body could not be decoded into the expected type.
    #[error("failed to decode response from {url}: {source}")]
    DecodingFailed {
        /// The URL that was requested.
        url: String,
        /// The underlying decode error.
        #[source]
        source: serde_json::Error,
    },

    /// The transport failed before a response arrived.
    #[error(transparent)]
    TransportFailed(#[from] TransportError),

    /// Every attempt failed; `source` is the last attempt's error.
    #[error("request failed after {attempts} attempt(s): {source}")]
    RequestFailed {
        /// Attempts made, including the first.
        attempts: u32,
        /// Error from the final attempt.
        #[source]
        source: Box<RequestError>,
    },

    /// Placeholder for a batch slot that never received an outcome.
    #[error("request did not complete")]
    Unknown,
}

impl RequestError {
    /// Creates an invalid-response error.
    pub fn invalid_response(url: impl Into<String>, status: u16) -> Self {
        Self::InvalidResponse {
            url: url.into(),
            status,
        }
    }

    /// Creates a server error for a non-2xx status.
    pub fn server_error(url: impl Into<String>, status: u16) -> Self {
        Self::ServerError {
            url: url.into(),
            status,
        }
    }

    /// Creates a decoding error.
    pub fn decoding_failed(url: impl Into<String>, source: serde_json::Error) -> Self {
        Self::DecodingFailed {
            url: url.into(),
            source,
        }
    }

    /// Wraps the final attempt's error.
    pub fn request_failed(attempts: u32, last: RequestError) -> Self {
        Self::RequestFailed {
            attempts,
            source: Box::new(last),
        }
    }

    /// Returns the innermost per-attempt error.
    #[must_use]
    pub fn last_error(&self) -> &RequestError {
        match self {
            Self::RequestFailed { source, .. } => source.last_error(),
            other => other,
        }
    }

    /// Returns the HTTP status involved, if any.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self.last_error() {
            Self::InvalidResponse { status, .. } | Self::ServerError { status, .. } => {
                Some(*status)
            }
            _ => None,
        }
    }

    /// Number of attempts recorded on a final error.
    #[must_use]
    pub fn attempts(&self) -> Option<u32> {
        match self {
            Self::RequestFailed { attempts, .. } => Some(*attempts),
            _ => None,
        }
    }

    /// Returns true for the batch placeholder.
    #[must_use]
    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown)
    }
}
