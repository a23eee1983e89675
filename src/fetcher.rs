//! High-level entry point wiring transport, cookie jar, executor and scheduler.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use crate::batch::{BatchError, BatchItem, BatchOptions, BatchReport, BatchScheduler};
use crate::config::{ConfigError, FetcherConfig};
use crate::cookies::{CookieBridge, FileStore, PersistedStore, StorageError};
use crate::execute::{ErasedValue, RequestError, RequestExecutor};
use crate::request::RequestDescriptor;
use crate::transport::{HttpResponse, Transport, TransportAdapter};

/// Errors building a [`Fetcher`].
#[derive(Debug, thiserror::Error)]
pub enum FetcherError {
    /// The configuration is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The default HTTP client could not be built.
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    /// The persisted cookie store could not be opened.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Executes single requests and batches with one shared cookie jar.
#[derive(Debug, Clone)]
pub struct Fetcher {
    config: FetcherConfig,
    cookies: Arc<CookieBridge>,
    scheduler: BatchScheduler,
}

impl Fetcher {
    /// Builds a fetcher with the reqwest transport and the file cookie store
    /// for the configured suite.
    ///
    /// # Errors
    ///
    /// Returns [`FetcherError`] if the config is invalid, the client cannot be
    /// built, or no config directory is available for the cookie store.
    pub fn new(config: FetcherConfig) -> Result<Self, FetcherError> {
        config.validate()?;
        let adapter = TransportAdapter::reqwest(config.transport_config())?;
        let store = Arc::new(FileStore::for_suite(&config.cookie_suite)?);
        Ok(Self::assemble(config, adapter, store))
    }

    /// Builds a fetcher from explicit transport and persisted store.
    ///
    /// # Errors
    ///
    /// Returns [`FetcherError::Config`] if the config is invalid.
    pub fn with_parts(
        config: FetcherConfig,
        transport: Arc<dyn Transport>,
        store: Arc<dyn PersistedStore>,
    ) -> Result<Self, FetcherError> {
        config.validate()?;
        let adapter = TransportAdapter::new(transport, config.transport_config());
        Ok(Self::assemble(config, adapter, store))
    }

    #[instrument(level = "debug", skip_all, fields(suite = %config.cookie_suite))]
    fn assemble(
        config: FetcherConfig,
        adapter: TransportAdapter,
        store: Arc<dyn PersistedStore>,
    ) -> Self {
        let cookies = CookieBridge::open(store, config.cookie_bridge_config());
        let executor = RequestExecutor::new(adapter, Some(Arc::clone(&cookies)), config.retry_policy());
        debug!(
            max_retries = config.max_retries,
            retry_interval_ms = config.retry_interval.as_millis(),
            cookie_sync = config.cookie_sync,
            "fetcher ready"
        );
        Self {
            config,
            cookies,
            scheduler: BatchScheduler::new(executor),
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &FetcherConfig {
        &self.config
    }

    /// Returns the shared cookie jar.
    #[must_use]
    pub fn cookies(&self) -> &Arc<CookieBridge> {
        &self.cookies
    }

    /// Returns the executor.
    #[must_use]
    pub fn executor(&self) -> &RequestExecutor {
        self.scheduler.executor()
    }

    /// Returns the batch scheduler.
    #[must_use]
    pub fn scheduler(&self) -> &BatchScheduler {
        &self.scheduler
    }

    /// Batch options with the configured concurrency limit.
    #[must_use]
    pub fn batch_options(&self, exit_early_on_failure: bool) -> BatchOptions {
        BatchOptions {
            exit_early_on_failure,
            max_concurrency: self.config.max_concurrency,
        }
    }

    /// Executes one descriptor and decodes its JSON body.
    ///
    /// # Errors
    ///
    /// See [`RequestExecutor::execute`].
    pub async fn execute<T>(&self, descriptor: &RequestDescriptor) -> Result<T, RequestError>
    where
        T: DeserializeOwned + Send + 'static,
    {
        self.executor().execute(descriptor).await
    }

    /// Executes one descriptor and returns the raw response.
    ///
    /// # Errors
    ///
    /// See [`RequestExecutor::execute_raw`].
    pub async fn execute_raw(
        &self,
        descriptor: &RequestDescriptor,
    ) -> Result<HttpResponse, RequestError> {
        self.executor().execute_raw(descriptor).await
    }

    /// Runs a batch with the configured concurrency limit.
    ///
    /// # Errors
    ///
    /// See [`BatchScheduler::start_batch`].
    pub async fn start_batch<T>(
        &self,
        descriptors: Vec<RequestDescriptor>,
        exit_early_on_failure: bool,
    ) -> Result<Vec<Result<T, RequestError>>, BatchError>
    where
        T: DeserializeOwned + Send + 'static,
    {
        self.scheduler
            .start_batch(descriptors, self.batch_options(exit_early_on_failure))
            .await
    }

    /// Runs a batch and returns the full report.
    ///
    /// # Errors
    ///
    /// See [`BatchScheduler::start_batch_report`].
    pub async fn start_batch_report<T>(
        &self,
        descriptors: Vec<RequestDescriptor>,
        exit_early_on_failure: bool,
    ) -> Result<BatchReport<T>, BatchError>
    where
        T: DeserializeOwned + Send + 'static,
    {
        self.scheduler
            .start_batch_report(descriptors, self.batch_options(exit_early_on_failure))
            .await
    }

    /// Runs a multi-type batch with the configured concurrency limit.
    ///
    /// # Errors
    ///
    /// See [`BatchScheduler::start_batch_with_multiple_types`].
    pub async fn start_batch_with_multiple_types(
        &self,
        items: Vec<BatchItem>,
        exit_early_on_failure: bool,
    ) -> Result<Vec<Result<ErasedValue, RequestError>>, BatchError> {
        self.scheduler
            .start_batch_with_multiple_types(items, self.batch_options(exit_early_on_failure))
            .await
    }
}
