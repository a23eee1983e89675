//! Runtime configuration for a [`Fetcher`](crate::Fetcher).

use std::time::Duration;

use crate::cookies::{CookieBridgeConfig, CookieMergePolicy, DEFAULT_SUITE, PERSISTED_COOKIES_KEY};
use crate::execute::{DEFAULT_MAX_RETRIES, DEFAULT_RETRY_INTERVAL, RetryPolicy};
use crate::request::CacheConfig;
use crate::transport::TransportConfig;
use crate::transport::constants::{
    CONNECT_TIMEOUT_SECS, MAX_TIMEOUT, REQUEST_TIMEOUT_SECS, RESOURCE_TIMEOUT_SECS,
};

/// Minimum allowed batch concurrency.
const MIN_CONCURRENCY: usize = 1;

/// Maximum allowed batch concurrency.
const MAX_CONCURRENCY: usize = 100;

/// Errors for invalid configuration values.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A timeout is zero or above the accepted maximum.
    #[error("invalid {field}: {value:?} (expected 1s..={max:?})", max = MAX_TIMEOUT)]
    InvalidTimeout {
        /// Which timeout was rejected.
        field: &'static str,
        /// The rejected value.
        value: Duration,
    },

    /// Batch concurrency outside 1..=100.
    #[error(
        "invalid concurrency value {value}: must be between {MIN_CONCURRENCY} and {MAX_CONCURRENCY}"
    )]
    InvalidConcurrency {
        /// The rejected value.
        value: usize,
    },

    /// Empty cookie suite name.
    #[error("cookie suite name must not be empty")]
    EmptySuite,
}

/// Settings shared by every request a fetcher makes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetcherConfig {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Fixed wait between attempts.
    pub retry_interval: Duration,
    /// Connect timeout for the default client.
    pub connect_timeout: Duration,
    /// Per-request timeout.
    pub request_timeout: Duration,
    /// Per-attempt bound on the complete send.
    pub resource_timeout: Duration,
    /// Cache configuration for descriptors that carry none.
    pub default_cache: Option<CacheConfig>,
    /// Mirror the session cookie store into the persisted store.
    pub cookie_sync: bool,
    /// How jar cookies merge with a caller-provided `Cookie` header.
    pub merge_policy: CookieMergePolicy,
    /// Persisted store namespace.
    pub cookie_suite: String,
    /// Batch concurrency limit; `None` starts every unit at once.
    pub max_concurrency: Option<usize>,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            retry_interval: DEFAULT_RETRY_INTERVAL,
            connect_timeout: Duration::from_secs(CONNECT_TIMEOUT_SECS),
            request_timeout: Duration::from_secs(REQUEST_TIMEOUT_SECS),
            resource_timeout: Duration::from_secs(RESOURCE_TIMEOUT_SECS),
            default_cache: None,
            cookie_sync: true,
            merge_policy: CookieMergePolicy::default(),
            cookie_suite: DEFAULT_SUITE.to_string(),
            max_concurrency: None,
        }
    }
}

impl FetcherConfig {
    /// Validates value ranges.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_timeout("connect_timeout", self.connect_timeout)?;
        validate_timeout("request_timeout", self.request_timeout)?;
        validate_timeout("resource_timeout", self.resource_timeout)?;

        if let Some(value) = self.max_concurrency
            && !(MIN_CONCURRENCY..=MAX_CONCURRENCY).contains(&value)
        {
            return Err(ConfigError::InvalidConcurrency { value });
        }

        if self.cookie_suite.trim().is_empty() {
            return Err(ConfigError::EmptySuite);
        }
        Ok(())
    }

    /// Retry policy derived from this config.
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries, self.retry_interval)
    }

    /// Transport configuration derived from this config.
    #[must_use]
    pub fn transport_config(&self) -> TransportConfig {
        TransportConfig {
            connect_timeout: self.connect_timeout,
            request_timeout: self.request_timeout,
            resource_timeout: self.resource_timeout,
            default_cache: self.default_cache.clone(),
        }
    }

    /// Cookie bridge configuration derived from this config.
    #[must_use]
    pub fn cookie_bridge_config(&self) -> CookieBridgeConfig {
        CookieBridgeConfig {
            sync_with_persisted: self.cookie_sync,
            merge_policy: self.merge_policy,
            storage_key: PERSISTED_COOKIES_KEY.to_string(),
        }
    }
}

fn validate_timeout(field: &'static str, value: Duration) -> Result<(), ConfigError> {
    if value < Duration::from_secs(1) || value > MAX_TIMEOUT {
        return Err(ConfigError::InvalidTimeout { field, value });
    }
    Ok(())
}
