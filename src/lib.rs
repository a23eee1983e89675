//! Fetcher Core Library
//!
//! Describes HTTP requests, executes them with fixed-interval retries,
//! decodes JSON responses, and runs batches concurrently with optional
//! abort-on-first-failure. Cookies set by servers are kept in a session jar
//! and mirrored to a persisted store so they survive restarts.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`request`] - Immutable request descriptors and cache configuration
//! - [`transport`] - The pluggable send capability and per-attempt timeouts
//! - [`cookies`] - Session and persisted cookie stores and their bridge
//! - [`execute`] - Retrying single-request executor and its error type
//! - [`batch`] - Concurrent batches with ordered results
//! - [`config`] / [`fetcher`] - Settings and the facade wiring it all together

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod batch;
pub mod config;
pub mod cookies;
pub mod execute;
pub mod fetcher;
pub mod request;
pub mod transport;

#[cfg(test)]
pub(crate) mod test_support;
mod user_agent;

// Re-export commonly used types
pub use batch::{BatchError, BatchItem, BatchOptions, BatchReport, BatchScheduler, BatchStats};
pub use config::{ConfigError, FetcherConfig};
pub use cookies::{CookieBridge, CookieBridgeConfig, CookieMergePolicy, FileStore, MemoryStore};
pub use execute::{
    DEFAULT_MAX_RETRIES, Decoder, ErasedValue, RequestError, RequestExecutor, RetryDecision,
    RetryPolicy, json_decoder,
};
pub use fetcher::{Fetcher, FetcherError};
pub use request::{CacheConfig, CachePolicy, HttpMethod, RequestDescriptor};
pub use transport::{HttpResponse, Transport, TransportAdapter, TransportConfig, TransportError};
