//! Cache configuration carried by request descriptors.
//!
//! The transport owns the actual HTTP cache. A [`CacheConfig`] only tells it
//! how large the memory and disk tiers may grow, where the disk tier lives,
//! and which [`CachePolicy`] governs a request.

use std::path::PathBuf;

/// Default in-memory cache capacity (4 MiB).
pub const DEFAULT_MEMORY_CAPACITY: u64 = 4 * 1024 * 1024;

/// Default on-disk cache capacity (20 MiB).
pub const DEFAULT_DISK_CAPACITY: u64 = 20 * 1024 * 1024;

/// How a request interacts with cached responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CachePolicy {
    /// Follow the server's caching headers.
    #[default]
    UseProtocolCachePolicy,
    /// Always revalidate with the origin, ignoring local cache data.
    ReloadIgnoringLocalCacheData,
    /// Use cached data regardless of age, loading from the origin only on a miss.
    ReturnCacheDataElseLoad,
    /// Use cached data only; never load from the origin.
    ReturnCacheDataDontLoad,
}

impl CachePolicy {
    /// Returns the `Cache-Control` request directive expressing this policy.
    ///
    /// `None` means the request carries no directive and the protocol decides.
    #[must_use]
    pub fn cache_control(self) -> Option<&'static str> {
        match self {
            Self::UseProtocolCachePolicy => None,
            Self::ReloadIgnoringLocalCacheData => Some("no-cache"),
            Self::ReturnCacheDataElseLoad => Some("max-stale"),
            Self::ReturnCacheDataDontLoad => Some("max-stale, only-if-cached"),
        }
    }

    /// Returns the stable label used in configuration files.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::UseProtocolCachePolicy => "protocol",
            Self::ReloadIgnoringLocalCacheData => "reload",
            Self::ReturnCacheDataElseLoad => "cache-else-load",
            Self::ReturnCacheDataDontLoad => "cache-only",
        }
    }

    /// Parses a configuration label produced by [`as_str`](Self::as_str).
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "protocol" => Some(Self::UseProtocolCachePolicy),
            "reload" => Some(Self::ReloadIgnoringLocalCacheData),
            "cache-else-load" => Some(Self::ReturnCacheDataElseLoad),
            "cache-only" => Some(Self::ReturnCacheDataDontLoad),
            _ => None,
        }
    }
}

/// Cache sizing and policy for a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Maximum bytes held in memory.
    pub memory_capacity: u64,
    /// Maximum bytes held on disk.
    pub disk_capacity: u64,
    /// Location of the disk cache; the transport picks one when `None`.
    pub disk_path: Option<PathBuf>,
    /// Policy applied to the request.
    pub policy: CachePolicy,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            memory_capacity: DEFAULT_MEMORY_CAPACITY,
            disk_capacity: DEFAULT_DISK_CAPACITY,
            disk_path: None,
            policy: CachePolicy::default(),
        }
    }
}

impl CacheConfig {
    /// Creates a config with default capacities and the given policy.
    #[must_use]
    pub fn with_policy(policy: CachePolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }
}
