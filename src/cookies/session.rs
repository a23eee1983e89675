//! In-process session cookie store.

use url::Url;

use super::cookie::Cookie;

/// Session-scoped cookie jar keyed by (domain, path, name).
#[derive(Debug, Clone, Default)]
pub struct SessionCookieStore {
    cookies: Vec<Cookie>,
}

impl SessionCookieStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a cookie, replacing any cookie with the same identity.
    ///
    /// A cookie already expired at `now` removes the matching entry instead
    /// of being stored.
    pub fn insert(&mut self, cookie: Cookie, now: u64) {
        self.cookies.retain(|existing| !existing.same_identity(&cookie));
        if !cookie.is_expired_at(now) {
            self.cookies.push(cookie);
        }
    }

    /// Cookies applicable to `url` at `now`, longest path first.
    #[must_use]
    pub fn cookies_for_url(&self, url: &Url, now: u64) -> Vec<Cookie> {
        let mut matching: Vec<Cookie> = self
            .cookies
            .iter()
            .filter(|cookie| cookie.matches_url(url, now))
            .cloned()
            .collect();
        // Stable sort keeps insertion order among equal path lengths.
        matching.sort_by(|a, b| b.path.len().cmp(&a.path.len()));
        matching
    }

    /// Every stored cookie in insertion order.
    #[must_use]
    pub fn all(&self) -> &[Cookie] {
        &self.cookies
    }

    /// Keeps only cookies for which `keep` returns true; returns how many were removed.
    pub fn retain(&mut self, mut keep: impl FnMut(&Cookie) -> bool) -> usize {
        let before = self.cookies.len();
        self.cookies.retain(|cookie| keep(cookie));
        before - self.cookies.len()
    }

    /// Drops cookies expired at `now`; returns how many were removed.
    pub fn remove_expired(&mut self, now: u64) -> usize {
        self.retain(|cookie| !cookie.is_expired_at(now))
    }

    /// Removes every cookie.
    pub fn clear(&mut self) {
        self.cookies.clear();
    }

    /// Number of stored cookies.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    /// Whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }
}
