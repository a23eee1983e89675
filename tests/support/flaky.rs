//! Responders that fail a fixed number of times before succeeding.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use wiremock::{Request, Respond, ResponseTemplate};

/// Answers the first `fail_count` requests with `fail_status`, then 200 with `body`.
#[derive(Clone)]
pub struct FlakyResponder {
    request_count: Arc<AtomicUsize>,
    fail_count: usize,
    fail_status: u16,
    body: String,
}

impl FlakyResponder {
    pub fn new(fail_count: usize, fail_status: u16, body: &str) -> Self {
        Self {
            request_count: Arc::new(AtomicUsize::new(0)),
            fail_count,
            fail_status,
            body: body.to_string(),
        }
    }

    /// Requests seen so far.
    pub fn count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }
}

impl Respond for FlakyResponder {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        let n = self.request_count.fetch_add(1, Ordering::SeqCst);
        if n < self.fail_count {
            ResponseTemplate::new(self.fail_status).set_body_string("temporarily unavailable")
        } else {
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/json")
                .set_body_string(self.body.clone())
        }
    }
}
