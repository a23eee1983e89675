//! In-process transport that replays scripted responses.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::transport::{HttpResponse, PreparedRequest, Transport, TransportError};

/// Path key matching any request without a dedicated script.
const ANY_PATH: &str = "*";

#[derive(Debug, Clone)]
enum Step {
    Respond {
        status: u16,
        body: Vec<u8>,
        headers: Vec<(String, String)>,
        delay: Duration,
    },
    Fail {
        reason: String,
    },
}

/// Replays queued responses per URL path, recording every request.
///
/// Requests whose path has no script left fall back to the `*` queue; when
/// that is empty too the send fails with [`TransportError::Unavailable`].
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    scripts: Mutex<HashMap<String, VecDeque<Step>>>,
    requests: Mutex<Vec<PreparedRequest>>,
    attempts: AtomicUsize,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, path: &str, step: Step) {
        self.scripts
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .entry(path.to_string())
            .or_default()
            .push_back(step);
    }

    /// Queues a response for any path.
    pub fn push_status(&self, status: u16, body: &str) {
        self.push_status_for(ANY_PATH, status, body);
    }

    /// Queues a response for a specific path.
    pub fn push_status_for(&self, path: &str, status: u16, body: &str) {
        self.push_delayed_status_for(path, Duration::ZERO, status, body);
    }

    /// Queues a delayed response for any path.
    pub fn push_delayed_status(&self, delay: Duration, status: u16, body: &str) {
        self.push_delayed_status_for(ANY_PATH, delay, status, body);
    }

    /// Queues a delayed response for a specific path.
    pub fn push_delayed_status_for(&self, path: &str, delay: Duration, status: u16, body: &str) {
        self.push(
            path,
            Step::Respond {
                status,
                body: body.as_bytes().to_vec(),
                headers: Vec::new(),
                delay,
            },
        );
    }

    /// Queues a response with headers for any path.
    pub fn push_with_headers(&self, status: u16, body: &str, headers: &[(&str, &str)]) {
        self.push(
            ANY_PATH,
            Step::Respond {
                status,
                body: body.as_bytes().to_vec(),
                headers: headers
                    .iter()
                    .map(|(name, value)| ((*name).to_string(), (*value).to_string()))
                    .collect(),
                delay: Duration::ZERO,
            },
        );
    }

    /// Queues a transport failure for any path.
    pub fn push_failure(&self, reason: &str) {
        self.push_failure_for(ANY_PATH, reason);
    }

    /// Queues a transport failure for a specific path.
    pub fn push_failure_for(&self, path: &str, reason: &str) {
        self.push(
            path,
            Step::Fail {
                reason: reason.to_string(),
            },
        );
    }

    /// Number of sends observed.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Every request observed, in send order.
    pub fn requests(&self) -> Vec<PreparedRequest> {
        self.requests
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    fn next_step(&self, path: &str) -> Option<Step> {
        let mut scripts = self
            .scripts
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Some(step) = scripts.get_mut(path).and_then(VecDeque::pop_front) {
            return Some(step);
        }
        scripts.get_mut(ANY_PATH).and_then(VecDeque::pop_front)
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: PreparedRequest) -> Result<HttpResponse, TransportError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        self.requests
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(request.clone());

        let url = request.url.to_string();
        match self.next_step(request.url.path()) {
            Some(Step::Respond {
                status,
                body,
                headers,
                delay,
            }) => {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                Ok(HttpResponse {
                    status,
                    headers,
                    body,
                    url: request.url,
                })
            }
            Some(Step::Fail { reason }) => Err(TransportError::unavailable(url, reason)),
            None => Err(TransportError::unavailable(url, "no scripted response")),
        }
    }
}
