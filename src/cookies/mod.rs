//! Cookie jar: session store, persisted store, and the bridge between them.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use fetcher_core::cookies::{Cookie, CookieBridge, CookieBridgeConfig, MemoryStore};
//!
//! let bridge = CookieBridge::open(Arc::new(MemoryStore::new()), CookieBridgeConfig::default());
//! bridge.store_cookie(Cookie::new("example.com", "/", "sid", "abc"));
//! assert_eq!(bridge.all_cookies().len(), 1);
//! ```

mod bridge;
mod cookie;
mod session;
mod store;

pub use bridge::{CookieBridge, CookieBridgeConfig, CookieFilter, CookieMergePolicy, PruneStats};
pub use cookie::{Cookie, CookieError, parse_set_cookie, render_cookie_header, unix_now};
pub use session::SessionCookieStore;
pub use store::{
    DEFAULT_SUITE, FileStore, MemoryStore, PERSISTED_COOKIES_KEY, PersistedStore, StorageError,
    default_config_dir,
};
