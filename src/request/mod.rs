//! Request descriptors and cache configuration.
//!
//! A [`RequestDescriptor`] is the caller's immutable description of one HTTP
//! call. It is consumed by the executor (or a batch) and never reused.
//!
//! # Example
//!
//! ```
//! use fetcher_core::request::{CacheConfig, CachePolicy, RequestDescriptor};
//!
//! let descriptor = RequestDescriptor::get("https://example.com/posts")
//!     .query("userId", 1)
//!     .header("Accept", "application/json")
//!     .cache(CacheConfig::with_policy(CachePolicy::ReloadIgnoringLocalCacheData))
//!     .build()
//!     .unwrap();
//! assert_eq!(descriptor.full_url().as_str(), "https://example.com/posts?userId=1");
//! ```

mod cache;
mod descriptor;

pub use cache::{CacheConfig, CachePolicy, DEFAULT_DISK_CAPACITY, DEFAULT_MEMORY_CAPACITY};
pub use descriptor::{
    COOKIE_HEADER, CONTENT_TYPE_HEADER, DescriptorError, HttpMethod, RequestBody,
    RequestDescriptor, RequestDescriptorBuilder,
};
