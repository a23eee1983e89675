//! Single-request execution: retry policy, decoding, and error types.

mod decode;
mod error;
mod executor;
mod retry;

pub use decode::{Decoder, ErasedValue, json_decoder};
pub use error::RequestError;
pub(crate) use executor::UnitOutcome;
pub use executor::RequestExecutor;
pub use retry::{DEFAULT_MAX_RETRIES, DEFAULT_RETRY_INTERVAL, RetryDecision, RetryPolicy};
