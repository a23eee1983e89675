//! Constants for the transport module (timeouts, redirects).

use std::time::Duration;

/// Default HTTP connect timeout (30 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default per-request timeout (60 seconds).
///
/// Bounds a single attempt as seen by the underlying client.
pub const REQUEST_TIMEOUT_SECS: u64 = 60;

/// Default per-resource timeout (5 minutes).
///
/// Bounds the whole send of one attempt, including reading the body.
pub const RESOURCE_TIMEOUT_SECS: u64 = 300;

/// Redirect hops followed within one attempt before giving up.
pub const MAX_REDIRECTS: usize = 10;

/// Upper bound accepted for any configured timeout (1 hour).
pub const MAX_TIMEOUT: Duration = Duration::from_secs(3600);
