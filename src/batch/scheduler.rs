//! Concurrent batch execution with optional early abort.
//!
//! Every descriptor runs as its own Tokio task through the full retry
//! machine. Results land in slots index-aligned with the input, pre-filled
//! with [`RequestError::Unknown`]; only the collecting loop writes them.
//!
//! # Abort Mode
//!
//! With `exit_early_on_failure`, the first unit failure is recorded, the
//! shared [`CancellationToken`] is cancelled, and the batch returns
//! immediately. A unit that panics counts as that failure. Units still
//! running are detached: they stop at their next attempt boundary or retry
//! sleep, and their slots keep the placeholder.

use std::collections::HashMap;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use tokio::sync::Semaphore;
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::execute::{Decoder, ErasedValue, RequestError, RequestExecutor, UnitOutcome, json_decoder};
use crate::request::RequestDescriptor;

/// Minimum allowed concurrency value.
const MIN_CONCURRENCY: usize = 1;

/// Maximum allowed concurrency value.
const MAX_CONCURRENCY: usize = 100;

/// Error type for batch operations.
#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    /// Invalid concurrency value provided.
    #[error(
        "invalid concurrency value {value}: must be between {MIN_CONCURRENCY} and {MAX_CONCURRENCY}"
    )]
    InvalidConcurrency {
        /// The invalid value that was provided.
        value: usize,
    },

    /// Abort mode stopped the batch at the first failure.
    #[error("batch aborted: request {index} failed: {source}")]
    Aborted {
        /// Index of the failing descriptor.
        index: usize,
        /// The unit's final error.
        #[source]
        source: RequestError,
    },
}

/// Options for one batch run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchOptions {
    /// Return at the first unit failure instead of waiting for every unit.
    pub exit_early_on_failure: bool,
    /// Maximum units in flight (1-100); `None` starts every unit at once.
    pub max_concurrency: Option<usize>,
}

impl BatchOptions {
    /// Options for abort mode.
    #[must_use]
    pub fn exit_early() -> Self {
        Self {
            exit_early_on_failure: true,
            ..Self::default()
        }
    }

    /// Returns a copy limited to `limit` concurrent units.
    #[must_use]
    pub fn with_max_concurrency(mut self, limit: usize) -> Self {
        self.max_concurrency = Some(limit);
        self
    }

    fn validate(&self) -> Result<(), BatchError> {
        match self.max_concurrency {
            Some(value) if !(MIN_CONCURRENCY..=MAX_CONCURRENCY).contains(&value) => {
                Err(BatchError::InvalidConcurrency { value })
            }
            _ => Ok(()),
        }
    }
}

/// Statistics from a batch run.
///
/// `retried` counts retry attempts across all units, not units that retried.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchStats {
    completed: usize,
    failed: usize,
    retried: usize,
    cancelled: usize,
}

impl BatchStats {
    /// Returns the number of units that succeeded.
    #[must_use]
    pub fn completed(&self) -> usize {
        self.completed
    }

    /// Returns the number of units that failed.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.failed
    }

    /// Returns the number of retry attempts made.
    #[must_use]
    pub fn retried(&self) -> usize {
        self.retried
    }

    /// Returns the number of units stopped by an abort.
    #[must_use]
    pub fn cancelled(&self) -> usize {
        self.cancelled
    }

    /// Returns the number of units that reached a final outcome.
    #[must_use]
    pub fn total(&self) -> usize {
        self.completed + self.failed
    }

    fn record_retries(&mut self, attempts: u32) {
        self.retried += attempts.saturating_sub(1) as usize;
    }
}

/// Full outcome of a batch: every slot plus where an abort happened.
#[derive(Debug)]
pub struct BatchReport<T> {
    /// One outcome per descriptor, index-aligned with the input.
    pub results: Vec<Result<T, RequestError>>,
    /// Index of the failure that aborted the batch, if any.
    pub aborted_at: Option<usize>,
    /// Counters for the run.
    pub stats: BatchStats,
}

impl<T> BatchReport<T> {
    /// Converts the report into the plain batch result.
    ///
    /// # Errors
    ///
    /// Returns [`BatchError::Aborted`] carrying the first failure when the
    /// batch was aborted.
    pub fn into_result(mut self) -> Result<Vec<Result<T, RequestError>>, BatchError> {
        let Some(index) = self.aborted_at else {
            return Ok(self.results);
        };
        let source = match std::mem::replace(&mut self.results[index], Err(RequestError::Unknown)) {
            Err(error) => error,
            Ok(_) => RequestError::Unknown,
        };
        Err(BatchError::Aborted { index, source })
    }
}

/// One unit of a multi-type batch: a descriptor plus the decoder for its type.
pub struct BatchItem {
    descriptor: RequestDescriptor,
    decoder: Decoder<ErasedValue>,
}

impl BatchItem {
    /// Creates an item whose JSON body decodes into `T`.
    #[must_use]
    pub fn new<T>(descriptor: RequestDescriptor) -> Self
    where
        T: DeserializeOwned + Send + 'static,
    {
        Self::with_decoder(descriptor, json_decoder::<T>())
    }

    /// Creates an item using a custom decoder.
    #[must_use]
    pub fn with_decoder<T>(descriptor: RequestDescriptor, decoder: Decoder<T>) -> Self
    where
        T: Send + 'static,
    {
        Self {
            descriptor,
            decoder: Arc::new(move |body: &[u8]| decoder(body).map(ErasedValue::new)),
        }
    }

    /// The item's descriptor.
    #[must_use]
    pub fn descriptor(&self) -> &RequestDescriptor {
        &self.descriptor
    }
}

impl std::fmt::Debug for BatchItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchItem")
            .field("descriptor", &self.descriptor)
            .finish_non_exhaustive()
    }
}

/// Runs batches of descriptors through a shared [`RequestExecutor`].
#[derive(Debug, Clone)]
pub struct BatchScheduler {
    executor: RequestExecutor,
}

impl BatchScheduler {
    /// Creates a scheduler around `executor`.
    #[must_use]
    pub fn new(executor: RequestExecutor) -> Self {
        Self { executor }
    }

    /// Returns the executor used for every unit.
    #[must_use]
    pub fn executor(&self) -> &RequestExecutor {
        &self.executor
    }

    /// Executes every descriptor concurrently, decoding bodies into `T`.
    ///
    /// # Errors
    ///
    /// Returns [`BatchError::Aborted`] in abort mode when a unit fails, or
    /// [`BatchError::InvalidConcurrency`] for an out-of-range limit.
    /// Individual failures in non-abort mode are reported in their slots.
    pub async fn start_batch<T>(
        &self,
        descriptors: Vec<RequestDescriptor>,
        options: BatchOptions,
    ) -> Result<Vec<Result<T, RequestError>>, BatchError>
    where
        T: DeserializeOwned + Send + 'static,
    {
        self.start_batch_report(descriptors, options)
            .await?
            .into_result()
    }

    /// Like [`BatchScheduler::start_batch`] but returns the full report.
    ///
    /// # Errors
    ///
    /// Returns [`BatchError::InvalidConcurrency`] for an out-of-range limit.
    pub async fn start_batch_report<T>(
        &self,
        descriptors: Vec<RequestDescriptor>,
        options: BatchOptions,
    ) -> Result<BatchReport<T>, BatchError>
    where
        T: DeserializeOwned + Send + 'static,
    {
        self.start_batch_report_with_decoder(descriptors, json_decoder::<T>(), options)
            .await
    }

    /// Runs a batch where every body goes through `decoder`.
    ///
    /// # Errors
    ///
    /// Returns [`BatchError::InvalidConcurrency`] for an out-of-range limit.
    pub async fn start_batch_report_with_decoder<T>(
        &self,
        descriptors: Vec<RequestDescriptor>,
        decoder: Decoder<T>,
        options: BatchOptions,
    ) -> Result<BatchReport<T>, BatchError>
    where
        T: Send + 'static,
    {
        let units = descriptors
            .into_iter()
            .map(|descriptor| (descriptor, Arc::clone(&decoder)))
            .collect();
        self.run_units(units, options).await
    }

    /// Runs the batch on a spawned task and hands the result to `callback`.
    pub fn start_batch_with_callback<T, F>(
        &self,
        descriptors: Vec<RequestDescriptor>,
        options: BatchOptions,
        callback: F,
    ) -> JoinHandle<()>
    where
        T: DeserializeOwned + Send + 'static,
        F: FnOnce(Result<Vec<Result<T, RequestError>>, BatchError>) + Send + 'static,
    {
        let scheduler = self.clone();
        tokio::spawn(async move {
            let result = scheduler.start_batch::<T>(descriptors, options).await;
            callback(result);
        })
    }

    /// Executes items whose bodies decode into different types.
    ///
    /// Successful slots hold an [`ErasedValue`] to downcast by index.
    ///
    /// # Errors
    ///
    /// Same as [`BatchScheduler::start_batch`].
    pub async fn start_batch_with_multiple_types(
        &self,
        items: Vec<BatchItem>,
        options: BatchOptions,
    ) -> Result<Vec<Result<ErasedValue, RequestError>>, BatchError> {
        let units = items
            .into_iter()
            .map(|item| (item.descriptor, item.decoder))
            .collect();
        self.run_units(units, options).await?.into_result()
    }

    #[instrument(skip_all, fields(total = units.len(), exit_early = options.exit_early_on_failure))]
    async fn run_units<T>(
        &self,
        units: Vec<(RequestDescriptor, Decoder<T>)>,
        options: BatchOptions,
    ) -> Result<BatchReport<T>, BatchError>
    where
        T: Send + 'static,
    {
        options.validate()?;

        let total = units.len();
        let mut results: Vec<Result<T, RequestError>> =
            (0..total).map(|_| Err(RequestError::Unknown)).collect();
        let mut stats = BatchStats::default();
        let cancel = CancellationToken::new();
        let semaphore = options
            .max_concurrency
            .map(|limit| Arc::new(Semaphore::new(limit)));

        info!(total, max_concurrency = ?options.max_concurrency, "starting batch");

        let mut tasks = JoinSet::new();
        let mut slots = HashMap::with_capacity(total);
        for (index, (descriptor, decoder)) in units.into_iter().enumerate() {
            let executor = self.executor.clone();
            let cancel = cancel.clone();
            let semaphore = semaphore.clone();

            let handle = tasks.spawn(async move {
                // Permit is dropped when this block exits (RAII)
                let _permit = match semaphore {
                    Some(semaphore) => match semaphore.acquire_owned().await {
                        Ok(permit) => Some(permit),
                        Err(_) => return (index, UnitOutcome::Cancelled { attempts: 0 }),
                    },
                    None => None,
                };

                let outcome = executor
                    .run_decoded(&descriptor, &decoder, Some(&cancel))
                    .await;
                (index, outcome)
            });
            slots.insert(handle.id(), index);
        }

        let mut aborted_at = None;
        while let Some(joined) = tasks.join_next_with_id().await {
            let (index, outcome) = match joined {
                Ok((_, unit)) => unit,
                Err(error) => {
                    // The slot keeps its placeholder.
                    let index = slots.get(&error.id()).copied();
                    warn!(index, error = %error, "batch unit panicked");
                    stats.failed += 1;
                    if let Some(index) = index.filter(|_| options.exit_early_on_failure) {
                        aborted_at = Some(index);
                        cancel.cancel();
                        break;
                    }
                    continue;
                }
            };

            match outcome {
                UnitOutcome::Completed { result, attempts } => {
                    stats.record_retries(attempts);
                    let failed = match &result {
                        Ok(_) => {
                            stats.completed += 1;
                            false
                        }
                        Err(error) => {
                            warn!(index, attempts, error = %error, "batch unit failed");
                            stats.failed += 1;
                            true
                        }
                    };
                    results[index] = result;

                    if failed && options.exit_early_on_failure {
                        aborted_at = Some(index);
                        cancel.cancel();
                        break;
                    }
                }
                UnitOutcome::Cancelled { attempts } => {
                    stats.record_retries(attempts);
                    stats.cancelled += 1;
                }
            }
        }

        if let Some(index) = aborted_at {
            let remaining = tasks.len();
            stats.cancelled += remaining;
            tasks.detach_all();
            debug!(index, remaining, "batch aborted, detached running units");
        }

        info!(
            completed = stats.completed,
            failed = stats.failed,
            retried = stats.retried,
            cancelled = stats.cancelled,
            aborted = aborted_at.is_some(),
            "batch complete"
        );

        Ok(BatchReport {
            results,
            aborted_at,
            stats,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use serde::Deserialize;

    use super::*;
    use crate::execute::RetryPolicy;
    use crate::test_support::scripted::ScriptedTransport;
    use crate::transport::{TransportAdapter, TransportConfig};

    #[derive(Debug, Deserialize, PartialEq)]
    struct Post {
        id: u32,
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct User {
        name: String,
    }

    fn scheduler_with(policy: RetryPolicy) -> (BatchScheduler, Arc<ScriptedTransport>) {
        let transport = Arc::new(ScriptedTransport::new());
        let adapter = TransportAdapter::new(transport.clone(), TransportConfig::default());
        let executor = RequestExecutor::new(adapter, None, policy);
        (BatchScheduler::new(executor), transport)
    }

    fn get(url: &str) -> RequestDescriptor {
        RequestDescriptor::get(url).build().unwrap()
    }

    #[test]
    fn test_options_validate_concurrency_bounds() {
        assert!(BatchOptions::default().validate().is_ok());
        assert!(BatchOptions::default().with_max_concurrency(1).validate().is_ok());
        assert!(BatchOptions::default().with_max_concurrency(100).validate().is_ok());
        assert!(matches!(
            BatchOptions::default().with_max_concurrency(0).validate(),
            Err(BatchError::InvalidConcurrency { value: 0 })
        ));
        assert!(matches!(
            BatchOptions::default().with_max_concurrency(101).validate(),
            Err(BatchError::InvalidConcurrency { value: 101 })
        ));
    }

    #[test]
    fn test_batch_error_display() {
        let error = BatchError::InvalidConcurrency { value: 0 };
        let msg = error.to_string();
        assert!(msg.contains("invalid concurrency"));
        assert!(msg.contains("100"));
    }

    #[test]
    fn test_report_into_result_extracts_first_failure() {
        let report: BatchReport<u32> = BatchReport {
            results: vec![
                Ok(1),
                Err(RequestError::server_error("https://example.com/b", 500)),
                Err(RequestError::Unknown),
            ],
            aborted_at: Some(1),
            stats: BatchStats::default(),
        };
        match report.into_result() {
            Err(BatchError::Aborted { index, source }) => {
                assert_eq!(index, 1);
                assert_eq!(source.status(), Some(500));
            }
            other => panic!("expected abort, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_empty_batch_returns_empty_results() {
        let (scheduler, transport) = scheduler_with(RetryPolicy::no_retry());
        let results = scheduler
            .start_batch::<Post>(Vec::new(), BatchOptions::default())
            .await
            .unwrap();
        assert!(results.is_empty());
        assert_eq!(transport.attempts(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slots_follow_input_order_under_reversed_completion() {
        let (scheduler, transport) = scheduler_with(RetryPolicy::no_retry());
        transport.push_delayed_status_for("/posts/1", Duration::from_millis(300), 200, r#"{"id":1}"#);
        transport.push_delayed_status_for("/posts/2", Duration::from_millis(200), 200, r#"{"id":2}"#);
        transport.push_delayed_status_for("/posts/3", Duration::from_millis(100), 200, r#"{"id":3}"#);

        let results = scheduler
            .start_batch::<Post>(
                vec![
                    get("https://example.com/posts/1"),
                    get("https://example.com/posts/2"),
                    get("https://example.com/posts/3"),
                ],
                BatchOptions::default(),
            )
            .await
            .unwrap();

        let ids: Vec<u32> = results.into_iter().map(|r| r.unwrap().id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_abort_mode_returns_mixed_results() {
        let (scheduler, transport) = scheduler_with(RetryPolicy::no_retry());
        transport.push_status_for("/ok", 200, r#"{"id":1}"#);
        transport.push_status_for("/bad", 500, "");

        let report = scheduler
            .start_batch_report::<Post>(
                vec![get("https://example.com/ok"), get("https://example.com/bad")],
                BatchOptions::default(),
            )
            .await
            .unwrap();

        assert!(report.aborted_at.is_none());
        assert_eq!(report.results[0].as_ref().unwrap().id, 1);
        assert_eq!(report.results[1].as_ref().unwrap_err().status(), Some(500));
        assert_eq!(report.stats.completed(), 1);
        assert_eq!(report.stats.failed(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_abort_mode_does_not_wait_for_delayed_success() {
        let (scheduler, transport) = scheduler_with(RetryPolicy::no_retry());
        transport.push_delayed_status_for("/slow", Duration::from_secs(30), 200, r#"{"id":1}"#);
        transport.push_status_for("/bad", 500, "");

        let started = tokio::time::Instant::now();
        let report = scheduler
            .start_batch_report::<Post>(
                vec![get("https://example.com/slow"), get("https://example.com/bad")],
                BatchOptions::exit_early(),
            )
            .await
            .unwrap();

        assert!(started.elapsed() < Duration::from_secs(30));
        assert_eq!(report.aborted_at, Some(1));
        assert!(report.results[0].as_ref().unwrap_err().is_unknown());
        assert_eq!(report.stats.cancelled(), 1);

        match report.into_result() {
            Err(BatchError::Aborted { index, .. }) => assert_eq!(index, 1),
            other => panic!("expected abort, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_abort_mode_treats_panicked_unit_as_first_failure() {
        let (scheduler, transport) = scheduler_with(RetryPolicy::no_retry());
        transport.push_delayed_status_for("/slow", Duration::from_secs(30), 200, r#"{"id":1}"#);
        transport.push_status_for("/explode", 200, "boom");
        let decoder: Decoder<Post> = Arc::new(|body: &[u8]| {
            assert_ne!(body, b"boom", "decoder cannot handle this body");
            serde_json::from_slice::<Post>(body)
        });

        let started = tokio::time::Instant::now();
        let report = scheduler
            .start_batch_report_with_decoder(
                vec![get("https://example.com/slow"), get("https://example.com/explode")],
                decoder,
                BatchOptions::exit_early(),
            )
            .await
            .unwrap();

        assert!(started.elapsed() < Duration::from_secs(30));
        assert_eq!(report.aborted_at, Some(1));
        assert_eq!(report.stats.failed(), 1);
        assert_eq!(report.stats.cancelled(), 1);
        match report.into_result() {
            Err(BatchError::Aborted { index, source }) => {
                assert_eq!(index, 1);
                assert!(source.is_unknown());
            }
            other => panic!("expected abort, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_panicked_unit_without_abort_keeps_placeholder() {
        let (scheduler, transport) = scheduler_with(RetryPolicy::no_retry());
        transport.push_status_for("/ok", 200, r#"{"id":1}"#);
        transport.push_status_for("/explode", 200, "boom");
        let decoder: Decoder<Post> = Arc::new(|body: &[u8]| {
            assert_ne!(body, b"boom", "decoder cannot handle this body");
            serde_json::from_slice::<Post>(body)
        });

        let report = scheduler
            .start_batch_report_with_decoder(
                vec![get("https://example.com/ok"), get("https://example.com/explode")],
                decoder,
                BatchOptions::default(),
            )
            .await
            .unwrap();

        assert!(report.aborted_at.is_none());
        assert_eq!(report.results[0].as_ref().unwrap().id, 1);
        assert!(report.results[1].as_ref().unwrap_err().is_unknown());
        assert_eq!(report.stats.failed(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_abort_cancels_units_waiting_to_retry() {
        let (scheduler, transport) = scheduler_with(RetryPolicy::new(1, Duration::from_secs(60)));
        transport.push_delayed_status_for("/flaky", Duration::from_millis(10), 503, "");
        transport.push_status_for("/flaky", 200, r#"{"id":1}"#);
        transport.push_failure_for("/bad", "refused");
        transport.push_failure_for("/bad", "refused");

        let report = scheduler
            .start_batch_report::<Post>(
                vec![get("https://example.com/flaky"), get("https://example.com/bad")],
                BatchOptions::exit_early(),
            )
            .await
            .unwrap();
        assert_eq!(report.aborted_at, Some(1));
        assert!(report.results[0].as_ref().unwrap_err().is_unknown());

        // "/flaky" was sleeping before its retry when the abort fired.
        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(transport.attempts(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_counted_in_stats() {
        let (scheduler, transport) = scheduler_with(RetryPolicy::new(2, Duration::from_millis(50)));
        transport.push_status_for("/a", 500, "");
        transport.push_status_for("/a", 200, r#"{"id":1}"#);
        transport.push_status_for("/b", 200, r#"{"id":2}"#);

        let report = scheduler
            .start_batch_report::<Post>(
                vec![get("https://example.com/a"), get("https://example.com/b")],
                BatchOptions::default(),
            )
            .await
            .unwrap();

        assert_eq!(report.stats.completed(), 2);
        assert_eq!(report.stats.retried(), 1);
        assert_eq!(transport.attempts(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrency_limit_serializes_units() {
        let (scheduler, transport) = scheduler_with(RetryPolicy::no_retry());
        transport.push_delayed_status_for("/a", Duration::from_secs(1), 200, r#"{"id":1}"#);
        transport.push_delayed_status_for("/b", Duration::from_secs(1), 200, r#"{"id":2}"#);

        let started = tokio::time::Instant::now();
        let results = scheduler
            .start_batch::<Post>(
                vec![get("https://example.com/a"), get("https://example.com/b")],
                BatchOptions::default().with_max_concurrency(1),
            )
            .await
            .unwrap();

        assert!(results.iter().all(Result::is_ok));
        assert!(started.elapsed() >= Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_invalid_concurrency_rejected_before_sending() {
        let (scheduler, transport) = scheduler_with(RetryPolicy::no_retry());
        let result = scheduler
            .start_batch::<Post>(
                vec![get("https://example.com/a")],
                BatchOptions::default().with_max_concurrency(0),
            )
            .await;
        assert!(matches!(result, Err(BatchError::InvalidConcurrency { value: 0 })));
        assert_eq!(transport.attempts(), 0);
    }

    #[tokio::test]
    async fn test_multiple_types_downcast_by_index() {
        let (scheduler, transport) = scheduler_with(RetryPolicy::no_retry());
        transport.push_status_for("/posts/1", 200, r#"{"id":1}"#);
        transport.push_status_for("/users/1", 200, r#"{"name":"ada"}"#);

        let mut results = scheduler
            .start_batch_with_multiple_types(
                vec![
                    BatchItem::new::<Post>(get("https://example.com/posts/1")),
                    BatchItem::new::<User>(get("https://example.com/users/1")),
                ],
                BatchOptions::default(),
            )
            .await
            .unwrap()
            .into_iter();

        let post = results.next().unwrap().unwrap().downcast::<Post>().unwrap();
        let user = results.next().unwrap().unwrap().downcast::<User>().unwrap();
        assert_eq!(post, Post { id: 1 });
        assert_eq!(user.name, "ada");
    }

    #[tokio::test]
    async fn test_start_batch_with_callback() {
        let (scheduler, transport) = scheduler_with(RetryPolicy::no_retry());
        transport.push_status(200, r#"{"id":4}"#);

        let received = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&received);
        scheduler
            .start_batch_with_callback::<Post, _>(
                vec![get("https://example.com/posts/4")],
                BatchOptions::default(),
                move |result| {
                    let ids = result
                        .unwrap()
                        .into_iter()
                        .map(|r| r.unwrap().id)
                        .collect::<Vec<_>>();
                    *sink.lock().unwrap() = ids;
                },
            )
            .await
            .unwrap();

        assert_eq!(*received.lock().unwrap(), vec![4]);
    }
}
