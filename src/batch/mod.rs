//! Concurrent batch execution through the retrying executor.
//!
//! # Example
//!
//! ```no_run
//! use fetcher_core::batch::{BatchOptions, BatchScheduler};
//! use fetcher_core::execute::{RequestExecutor, RetryPolicy};
//! use fetcher_core::request::RequestDescriptor;
//! use fetcher_core::transport::{TransportAdapter, TransportConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let adapter = TransportAdapter::reqwest(TransportConfig::default())?;
//! let scheduler = BatchScheduler::new(RequestExecutor::new(adapter, None, RetryPolicy::default()));
//! let descriptors = vec![
//!     RequestDescriptor::get("https://example.com/posts/1").build()?,
//!     RequestDescriptor::get("https://example.com/posts/2").build()?,
//! ];
//! let results = scheduler
//!     .start_batch::<serde_json::Value>(descriptors, BatchOptions::exit_early())
//!     .await?;
//! println!("{} results", results.len());
//! # Ok(())
//! # }
//! ```

mod scheduler;

pub use scheduler::{BatchError, BatchItem, BatchOptions, BatchReport, BatchScheduler, BatchStats};
