//! Retrying executor for single requests.
//!
//! Each attempt attaches cookies, applies the cache configuration, sends
//! through the transport adapter, stores response cookies (whatever the
//! status), validates the status and decodes the body. Redirects are
//! followed inside the attempt, and every hop gets its own cookie attach
//! and persist. Any failure consumes one retry; the final error wraps the
//! last attempt's error.
//!
//! Cookie jar calls may hit the filesystem, so they run on the blocking pool.
//!
//! # Example
//!
//! ```no_run
//! use fetcher_core::execute::{RequestExecutor, RetryPolicy};
//! use fetcher_core::request::RequestDescriptor;
//! use fetcher_core::transport::{TransportAdapter, TransportConfig};
//!
//! #[derive(serde::Deserialize)]
//! struct Post { id: u64 }
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let adapter = TransportAdapter::reqwest(TransportConfig::default())?;
//! let executor = RequestExecutor::new(adapter, None, RetryPolicy::default());
//! let descriptor = RequestDescriptor::get("https://example.com/posts/1").build()?;
//! let post: Post = executor.execute(&descriptor).await?;
//! println!("post {}", post.id);
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::decode::{Decoder, json_decoder};
use super::error::RequestError;
use super::retry::{RetryDecision, RetryPolicy};
use crate::cookies::CookieBridge;
use crate::request::RequestDescriptor;
use crate::transport::constants::MAX_REDIRECTS;
use crate::transport::{HttpResponse, PreparedRequest, TransportAdapter, TransportError};

/// How one execution ended.
#[derive(Debug)]
pub(crate) enum UnitOutcome<T> {
    /// The retry machine reached a final result.
    Completed {
        result: Result<T, RequestError>,
        attempts: u32,
    },
    /// Cancellation was observed before a final result.
    Cancelled { attempts: u32 },
}

/// Executes descriptors with bounded retries.
///
/// Cheap to clone; clones share the transport and cookie jar.
#[derive(Debug, Clone)]
pub struct RequestExecutor {
    transport: TransportAdapter,
    cookies: Option<Arc<CookieBridge>>,
    policy: RetryPolicy,
}

impl RequestExecutor {
    /// Creates an executor. Without a cookie bridge no cookies are sent or stored.
    #[must_use]
    pub fn new(
        transport: TransportAdapter,
        cookies: Option<Arc<CookieBridge>>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            transport,
            cookies,
            policy,
        }
    }

    /// Returns a copy of this executor using `policy`.
    #[must_use]
    pub fn with_policy(&self, policy: RetryPolicy) -> Self {
        Self {
            policy,
            ..self.clone()
        }
    }

    /// Returns the configured retry policy.
    #[must_use]
    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Returns the transport adapter.
    #[must_use]
    pub fn transport(&self) -> &TransportAdapter {
        &self.transport
    }

    /// Returns the cookie bridge, if any.
    #[must_use]
    pub fn cookies(&self) -> Option<&Arc<CookieBridge>> {
        self.cookies.as_ref()
    }

    /// Executes `descriptor` and decodes the JSON body into `T`.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError::RequestFailed`] wrapping the last attempt's
    /// error once the retry budget is exhausted.
    pub async fn execute<T>(&self, descriptor: &RequestDescriptor) -> Result<T, RequestError>
    where
        T: DeserializeOwned + Send + 'static,
    {
        self.execute_with_decoder(descriptor, &json_decoder::<T>())
            .await
    }

    /// Executes `descriptor` and decodes the body with `decoder`.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError::RequestFailed`] wrapping the last attempt's
    /// error once the retry budget is exhausted.
    pub async fn execute_with_decoder<T>(
        &self,
        descriptor: &RequestDescriptor,
        decoder: &Decoder<T>,
    ) -> Result<T, RequestError>
    where
        T: Send + 'static,
    {
        finished(self.run_decoded(descriptor, decoder, None).await)
    }

    /// Executes `descriptor` and returns the successful response undecoded.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError::RequestFailed`] wrapping the last attempt's
    /// error once the retry budget is exhausted.
    pub async fn execute_raw(
        &self,
        descriptor: &RequestDescriptor,
    ) -> Result<HttpResponse, RequestError> {
        finished(self.run(descriptor, Ok, None).await)
    }

    /// Executes `descriptor` on a spawned task and hands the result to `callback`.
    pub fn execute_with_callback<T, F>(
        &self,
        descriptor: RequestDescriptor,
        callback: F,
    ) -> JoinHandle<()>
    where
        T: DeserializeOwned + Send + 'static,
        F: FnOnce(Result<T, RequestError>) + Send + 'static,
    {
        let executor = self.clone();
        tokio::spawn(async move {
            let result = executor.execute::<T>(&descriptor).await;
            callback(result);
        })
    }

    pub(crate) async fn run_decoded<T>(
        &self,
        descriptor: &RequestDescriptor,
        decoder: &Decoder<T>,
        cancel: Option<&CancellationToken>,
    ) -> UnitOutcome<T>
    where
        T: Send + 'static,
    {
        self.run(
            descriptor,
            |response| {
                decoder(&response.body)
                    .map_err(|source| RequestError::decoding_failed(response.url.as_str(), source))
            },
            cancel,
        )
        .await
    }

    /// Runs the retry machine until a final result or cancellation.
    #[instrument(skip_all, fields(method = %descriptor.method(), url = %descriptor.url()))]
    pub(crate) async fn run<T, F>(
        &self,
        descriptor: &RequestDescriptor,
        finish: F,
        cancel: Option<&CancellationToken>,
    ) -> UnitOutcome<T>
    where
        F: Fn(HttpResponse) -> Result<T, RequestError> + Send + Sync,
    {
        let mut attempt = 0u32;

        loop {
            if cancel.is_some_and(CancellationToken::is_cancelled) {
                debug!(attempts = attempt, "cancelled before attempt");
                return UnitOutcome::Cancelled { attempts: attempt };
            }

            attempt += 1;
            debug!(attempt, "attempting request");

            let error = match self.attempt(descriptor, &finish).await {
                Ok(value) => {
                    return UnitOutcome::Completed {
                        result: Ok(value),
                        attempts: attempt,
                    };
                }
                Err(error) => error,
            };

            match self.policy.should_retry(attempt) {
                RetryDecision::Retry {
                    delay,
                    attempt: next_attempt,
                } => {
                    info!(
                        url = %descriptor.url(),
                        attempt = next_attempt,
                        max_attempts = self.policy.max_attempts(),
                        delay_ms = delay.as_millis(),
                        error = %error,
                        "retrying request"
                    );
                    if !wait_for_retry(delay, cancel).await {
                        debug!(attempts = attempt, "cancelled during retry wait");
                        return UnitOutcome::Cancelled { attempts: attempt };
                    }
                }
                RetryDecision::DoNotRetry { reason } => {
                    debug!(url = %descriptor.url(), %reason, "not retrying request");
                    return UnitOutcome::Completed {
                        result: Err(RequestError::request_failed(attempt, error)),
                        attempts: attempt,
                    };
                }
            }
        }
    }

    async fn attempt<T, F>(&self, descriptor: &RequestDescriptor, finish: &F) -> Result<T, RequestError>
    where
        F: Fn(HttpResponse) -> Result<T, RequestError> + Send + Sync,
    {
        let mut request = self.transport.prepare(descriptor);
        self.transport.apply_cache(descriptor, &mut request);

        let url = request.url.to_string();
        let mut redirects = 0_usize;
        let response = loop {
            let mut outgoing = request.clone();
            self.attach_cookies(descriptor, &mut outgoing).await;
            let response = self.transport.send(outgoing).await?;
            self.persist_cookies(descriptor, &response).await;

            let Some(next) = self.transport.redirect(&request, &response) else {
                break response;
            };
            redirects += 1;
            if redirects > MAX_REDIRECTS {
                return Err(TransportError::too_many_redirects(url.as_str(), MAX_REDIRECTS).into());
            }
            debug!(status = response.status, to = %next.url, redirects, "following redirect");
            request = next;
        };

        if !response.is_http_status() {
            return Err(RequestError::invalid_response(url, response.status));
        }
        if !response.is_success() {
            return Err(RequestError::server_error(url, response.status));
        }

        finish(response)
    }

    async fn attach_cookies(&self, descriptor: &RequestDescriptor, request: &mut PreparedRequest) {
        let Some(cookies) = &self.cookies else {
            return;
        };
        if !descriptor.include_cookies() {
            return;
        }

        let bridge = Arc::clone(cookies);
        let url = request.url.clone();
        let mut headers = request.headers.clone();
        let attached = run_blocking(move || {
            bridge.attach_cookies_for_url(&url, &mut headers);
            headers
        })
        .await;
        if let Some(headers) = attached {
            request.headers = headers;
        }
    }

    async fn persist_cookies(&self, descriptor: &RequestDescriptor, response: &HttpResponse) {
        let Some(cookies) = &self.cookies else {
            return;
        };
        if !descriptor.save_response_cookies() {
            return;
        }

        let bridge = Arc::clone(cookies);
        let headers_only = HttpResponse {
            status: response.status,
            headers: response.headers.clone(),
            body: Vec::new(),
            url: response.url.clone(),
        };
        run_blocking(move || bridge.store_response_cookies(&headers_only)).await;
    }
}

/// Runs a cookie jar call on the blocking pool.
///
/// A panic inside `task` is resumed on the caller.
async fn run_blocking<R, F>(task: F) -> Option<R>
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    match tokio::task::spawn_blocking(task).await {
        Ok(value) => Some(value),
        Err(error) if error.is_panic() => std::panic::resume_unwind(error.into_panic()),
        Err(error) => {
            warn!(error = %error, "cookie jar task did not complete");
            None
        }
    }
}

fn finished<T>(outcome: UnitOutcome<T>) -> Result<T, RequestError> {
    match outcome {
        UnitOutcome::Completed { result, .. } => result,
        UnitOutcome::Cancelled { .. } => Err(RequestError::Unknown),
    }
}

/// Sleeps for `delay`; returns false if `cancel` fires first.
async fn wait_for_retry(delay: Duration, cancel: Option<&CancellationToken>) -> bool {
    match cancel {
        Some(token) => {
            tokio::select! {
                () = tokio::time::sleep(delay) => true,
                () = token.cancelled() => false,
            }
        }
        None => {
            tokio::time::sleep(delay).await;
            true
        }
    }
}
