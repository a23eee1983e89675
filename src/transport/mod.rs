//! Transport layer: the opaque send capability and its configuration.
//!
//! The [`Transport`] trait is the seam between request orchestration and
//! the network. [`ReqwestTransport`] is the default implementation; tests
//! and embedders can plug in their own. [`TransportAdapter`] wraps any
//! transport with cache-policy and per-attempt timeout handling.

mod adapter;
mod client;
pub mod constants;
mod error;
mod message;

use std::fmt;

use async_trait::async_trait;

pub use adapter::{TransportAdapter, TransportConfig};
pub use client::ReqwestTransport;
pub use error::TransportError;
pub use message::{HttpResponse, PreparedRequest};

/// Sends one prepared request and returns the raw response.
///
/// Implementations report HTTP error statuses as normal responses; only
/// network-level failures are errors.
#[async_trait]
pub trait Transport: Send + Sync + fmt::Debug {
    /// Sends `request` and waits for the full response.
    async fn send(&self, request: PreparedRequest) -> Result<HttpResponse, TransportError>;
}
