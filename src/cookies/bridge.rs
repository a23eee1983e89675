//! Reconciles the session cookie store with a persisted store.
//!
//! The bridge owns one [`SessionCookieStore`] and talks to one
//! [`PersistedStore`] under a configured key. Every operation takes the
//! bridge lock for its whole duration, so a sync never interleaves with an
//! attach or a persist. Storage failures are logged and swallowed: a
//! request never fails because the cookie jar could not be read or written.
//!
//! Operations are synchronous and may touch the filesystem. Async callers
//! should run them on the blocking pool, as the executor does.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, instrument, warn};
use url::Url;

use super::cookie::{Cookie, parse_set_cookie, render_cookie_header, unix_now};
use super::session::SessionCookieStore;
use super::store::{PERSISTED_COOKIES_KEY, PersistedStore, decode_cookie, encode_cookie};
use crate::request::{COOKIE_HEADER, RequestDescriptor};
use crate::transport::HttpResponse;

const SET_COOKIE_HEADER: &str = "set-cookie";

/// How rendered cookies combine with a `Cookie` header already on the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CookieMergePolicy {
    /// The jar's header replaces the existing one.
    Replace,
    /// Existing and jar values are joined with `"; "`.
    #[default]
    Append,
}

impl CookieMergePolicy {
    /// Configuration label for this policy.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Replace => "replace",
            Self::Append => "append",
        }
    }
}

impl fmt::Display for CookieMergePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CookieMergePolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "replace" => Ok(Self::Replace),
            "append" => Ok(Self::Append),
            other => Err(format!(
                "unknown cookie merge policy '{other}' (expected 'replace' or 'append')"
            )),
        }
    }
}

/// Configuration for a [`CookieBridge`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieBridgeConfig {
    /// Whether the session store is mirrored into the persisted store.
    pub sync_with_persisted: bool,
    /// How the jar's header merges with a caller-provided one.
    pub merge_policy: CookieMergePolicy,
    /// Key under which cookie entries are persisted.
    pub storage_key: String,
}

impl Default for CookieBridgeConfig {
    fn default() -> Self {
        Self {
            sync_with_persisted: true,
            merge_policy: CookieMergePolicy::default(),
            storage_key: PERSISTED_COOKIES_KEY.to_string(),
        }
    }
}

/// Selects cookies by domain and/or name for [`CookieBridge::delete_matching`].
///
/// A domain filter matches the domain itself and its subdomains. Empty
/// filters match every cookie.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CookieFilter {
    /// Domain to match, without a leading dot.
    pub domain: Option<String>,
    /// Exact cookie name to match.
    pub name: Option<String>,
}

impl CookieFilter {
    /// Whether `cookie` is selected by this filter.
    #[must_use]
    pub fn matches(&self, cookie: &Cookie) -> bool {
        let domain_ok = self.domain.as_deref().is_none_or(|domain| {
            let domain = domain.trim_start_matches('.').to_ascii_lowercase();
            cookie.domain == domain || cookie.domain.ends_with(&format!(".{domain}"))
        });
        let name_ok = self.name.as_deref().is_none_or(|name| cookie.name == name);
        domain_ok && name_ok
    }
}

/// Counts from [`CookieBridge::prune_expired`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PruneStats {
    /// Expired cookies dropped from the session store.
    pub session_removed: usize,
    /// Entries dropped from the persisted store.
    pub persisted_removed: usize,
}

/// Cookie jar shared by every request of a fetcher.
pub struct CookieBridge {
    persisted: Arc<dyn PersistedStore>,
    config: CookieBridgeConfig,
    session: Mutex<SessionCookieStore>,
}

impl fmt::Debug for CookieBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CookieBridge")
            .field("persisted", &self.persisted)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl CookieBridge {
    /// Creates a bridge with an empty session store. Nothing is loaded yet.
    #[must_use]
    pub fn new(persisted: Arc<dyn PersistedStore>, config: CookieBridgeConfig) -> Self {
        Self {
            persisted,
            config,
            session: Mutex::new(SessionCookieStore::new()),
        }
    }

    /// Creates a bridge and runs [`CookieBridge::initialize`].
    #[must_use]
    pub fn open(persisted: Arc<dyn PersistedStore>, config: CookieBridgeConfig) -> Arc<Self> {
        let bridge = Arc::new(Self::new(persisted, config));
        bridge.initialize();
        bridge
    }

    /// Prunes expired persisted entries, then runs the first sync.
    pub fn initialize(&self) {
        let mut session = self.lock_session();
        let now = unix_now();
        self.prune_locked(&mut session, now);
        self.sync_locked(&mut session, now);
    }

    /// Returns the bridge configuration.
    #[must_use]
    pub fn config(&self) -> &CookieBridgeConfig {
        &self.config
    }

    /// Adds applicable cookies to the outgoing `headers`.
    ///
    /// No-op when the descriptor opts out of cookies.
    pub fn attach_cookies(
        &self,
        descriptor: &RequestDescriptor,
        headers: &mut BTreeMap<String, String>,
    ) {
        if descriptor.include_cookies() {
            self.attach_cookies_for_url(&descriptor.full_url(), headers);
        }
    }

    /// Adds the cookies applicable to `url` to the outgoing `headers`.
    ///
    /// Used for every hop of a redirect chain, where the target differs
    /// from the descriptor's URL.
    #[instrument(skip_all, fields(url = %url))]
    pub fn attach_cookies_for_url(&self, url: &Url, headers: &mut BTreeMap<String, String>) {
        let mut session = self.lock_session();
        let now = unix_now();
        self.sync_locked(&mut session, now);

        let cookies = session.cookies_for_url(url, now);
        let Some(rendered) = render_cookie_header(&cookies) else {
            return;
        };
        debug!(count = cookies.len(), "attaching cookies");
        merge_cookie_header(headers, rendered, self.config.merge_policy);
    }

    /// Stores every `Set-Cookie` of `response` in the jar.
    ///
    /// Malformed headers are dropped. No-op when the descriptor opts out.
    pub fn persist_cookies_from_response(
        &self,
        descriptor: &RequestDescriptor,
        response: &HttpResponse,
    ) {
        if descriptor.save_response_cookies() {
            self.store_response_cookies(response);
        }
    }

    /// Stores every `Set-Cookie` of `response`, scoped to the response URL.
    ///
    /// Returns how many cookies were stored.
    #[instrument(skip_all, fields(url = %response.url, status = response.status))]
    pub fn store_response_cookies(&self, response: &HttpResponse) -> usize {
        let mut headers = response.header_values(SET_COOKIE_HEADER).peekable();
        if headers.peek().is_none() {
            return 0;
        }

        let mut session = self.lock_session();
        let now = unix_now();
        let mut stored = 0_usize;
        for header in headers {
            match parse_set_cookie(header, &response.url, now) {
                Ok(cookie) => {
                    session.insert(cookie, now);
                    stored += 1;
                }
                Err(error) => debug!(error = %error, "dropping malformed set-cookie"),
            }
        }

        if stored > 0 {
            debug!(count = stored, "stored response cookies");
            if self.config.sync_with_persisted {
                self.write_persisted(session.all());
            }
        }
        stored
    }

    /// Two-way sync: load persisted cookies, then persist the session store.
    ///
    /// No-op when persistence sync is disabled.
    pub fn sync_cookies(&self) {
        let mut session = self.lock_session();
        self.sync_locked(&mut session, unix_now());
    }

    /// Drops expired cookies from both stores.
    pub fn prune_expired(&self) -> PruneStats {
        let mut session = self.lock_session();
        self.prune_locked(&mut session, unix_now())
    }

    /// Clears the session store and, with sync enabled, the persisted key.
    #[instrument(skip(self))]
    pub fn delete_all(&self) {
        let mut session = self.lock_session();
        session.clear();
        if self.config.sync_with_persisted {
            if let Err(error) = self.persisted.remove(&self.config.storage_key) {
                warn!(error = %error, "failed to remove persisted cookies");
            }
        }
        debug!("deleted all cookies");
    }

    /// Removes every cookie selected by `predicate`; returns how many.
    ///
    /// With sync enabled the persisted store is rewritten to match.
    pub fn delete_matching(&self, predicate: impl Fn(&Cookie) -> bool) -> usize {
        let mut session = self.lock_session();
        let now = unix_now();
        self.sync_locked(&mut session, now);

        let removed = session.retain(|cookie| !predicate(cookie));
        if removed > 0 && self.config.sync_with_persisted {
            self.write_persisted(session.all());
        }
        debug!(removed, "deleted matching cookies");
        removed
    }

    /// Every cookie in the jar, after a sync.
    #[must_use]
    pub fn all_cookies(&self) -> Vec<Cookie> {
        let mut session = self.lock_session();
        self.sync_locked(&mut session, unix_now());
        session.all().to_vec()
    }

    /// Cookies that would be sent to `url`, after a sync.
    #[must_use]
    pub fn cookies_for_url(&self, url: &Url) -> Vec<Cookie> {
        let mut session = self.lock_session();
        let now = unix_now();
        self.sync_locked(&mut session, now);
        session.cookies_for_url(url, now)
    }

    /// Inserts a cookie directly, persisting it when sync is enabled.
    pub fn store_cookie(&self, cookie: Cookie) {
        let mut session = self.lock_session();
        session.insert(cookie, unix_now());
        if self.config.sync_with_persisted {
            self.write_persisted(session.all());
        }
    }

    fn lock_session(&self) -> MutexGuard<'_, SessionCookieStore> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn sync_locked(&self, session: &mut SessionCookieStore, now: u64) {
        if !self.config.sync_with_persisted {
            return;
        }

        for cookie in self.load_persisted() {
            if !cookie.is_expired_at(now) {
                session.insert(cookie, now);
            }
        }
        self.write_persisted(session.all());
    }

    fn prune_locked(&self, session: &mut SessionCookieStore, now: u64) -> PruneStats {
        let session_removed = session.remove_expired(now);

        let entries = match self.persisted.get(&self.config.storage_key) {
            Ok(Some(entries)) => entries,
            Ok(None) => Vec::new(),
            Err(error) => {
                warn!(error = %error, "failed to read persisted cookies for pruning");
                Vec::new()
            }
        };

        let total = entries.len();
        let kept: Vec<Vec<u8>> = entries
            .into_iter()
            .filter(|entry| {
                decode_cookie(entry).is_ok_and(|cookie| !cookie.is_expired_at(now))
            })
            .collect();
        let persisted_removed = total - kept.len();

        if persisted_removed > 0 {
            if let Err(error) = self.persisted.set(&self.config.storage_key, kept) {
                warn!(error = %error, "failed to rewrite pruned cookies");
            }
        }

        debug!(session_removed, persisted_removed, "pruned expired cookies");
        PruneStats {
            session_removed,
            persisted_removed,
        }
    }

    fn load_persisted(&self) -> Vec<Cookie> {
        let entries = match self.persisted.get(&self.config.storage_key) {
            Ok(Some(entries)) => entries,
            Ok(None) => return Vec::new(),
            Err(error) => {
                warn!(error = %error, "failed to read persisted cookies");
                return Vec::new();
            }
        };

        entries
            .iter()
            .filter_map(|entry| match decode_cookie(entry) {
                Ok(cookie) => Some(cookie),
                Err(error) => {
                    debug!(error = %error, "skipping undecodable persisted cookie");
                    None
                }
            })
            .collect()
    }

    fn write_persisted(&self, cookies: &[Cookie]) {
        let entries = cookies
            .iter()
            .filter_map(|cookie| match encode_cookie(cookie) {
                Ok(entry) => Some(entry),
                Err(error) => {
                    warn!(name = %cookie.name, error = %error, "skipping unencodable cookie");
                    None
                }
            })
            .collect();

        if let Err(error) = self.persisted.set(&self.config.storage_key, entries) {
            warn!(error = %error, "failed to write persisted cookies");
        }
    }
}

fn merge_cookie_header(
    headers: &mut BTreeMap<String, String>,
    rendered: String,
    policy: CookieMergePolicy,
) {
    match (policy, headers.get_mut(COOKIE_HEADER)) {
        (CookieMergePolicy::Append, Some(existing)) if !existing.trim().is_empty() => {
            existing.push_str("; ");
            existing.push_str(&rendered);
        }
        _ => {
            headers.insert(COOKIE_HEADER.to_string(), rendered);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::cookies::MemoryStore;

    fn bridge_with(config: CookieBridgeConfig) -> (CookieBridge, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (CookieBridge::new(store.clone(), config), store)
    }

    fn descriptor(url: &str) -> RequestDescriptor {
        RequestDescriptor::get(url).build().unwrap()
    }

    fn persisted_count(store: &MemoryStore) -> usize {
        store
            .get(PERSISTED_COOKIES_KEY)
            .unwrap()
            .map_or(0, |entries| entries.len())
    }

    #[test]
    fn test_attach_cookies_renders_matching_cookies() {
        let (bridge, _) = bridge_with(CookieBridgeConfig::default());
        bridge.store_cookie(Cookie::new("example.com", "/", "a", "1"));
        bridge.store_cookie(Cookie::new("example.com", "/", "b", "2"));
        bridge.store_cookie(Cookie::new("other.com", "/", "c", "3"));

        let mut headers = BTreeMap::new();
        bridge.attach_cookies(&descriptor("https://example.com/x"), &mut headers);
        assert_eq!(headers.get(COOKIE_HEADER).map(String::as_str), Some("a=1; b=2"));
    }

    #[test]
    fn test_attach_cookies_respects_opt_out() {
        let (bridge, _) = bridge_with(CookieBridgeConfig::default());
        bridge.store_cookie(Cookie::new("example.com", "/", "a", "1"));
        let descriptor = RequestDescriptor::get("https://example.com")
            .include_cookies(false)
            .build()
            .unwrap();

        let mut headers = BTreeMap::new();
        bridge.attach_cookies(&descriptor, &mut headers);
        assert!(headers.is_empty());
    }

    #[test]
    fn test_attach_cookies_append_policy_keeps_existing() {
        let (bridge, _) = bridge_with(CookieBridgeConfig::default());
        bridge.store_cookie(Cookie::new("example.com", "/", "a", "1"));

        let mut headers = BTreeMap::from([(COOKIE_HEADER.to_string(), "manual=x".to_string())]);
        bridge.attach_cookies(&descriptor("https://example.com"), &mut headers);
        assert_eq!(
            headers.get(COOKIE_HEADER).map(String::as_str),
            Some("manual=x; a=1")
        );
    }

    #[test]
    fn test_attach_cookies_replace_policy_overwrites_existing() {
        let (bridge, _) = bridge_with(CookieBridgeConfig {
            merge_policy: CookieMergePolicy::Replace,
            ..CookieBridgeConfig::default()
        });
        bridge.store_cookie(Cookie::new("example.com", "/", "a", "1"));

        let mut headers = BTreeMap::from([(COOKIE_HEADER.to_string(), "manual=x".to_string())]);
        bridge.attach_cookies(&descriptor("https://example.com"), &mut headers);
        assert_eq!(headers.get(COOKIE_HEADER).map(String::as_str), Some("a=1"));
    }

    #[test]
    fn test_attach_without_matching_cookies_leaves_headers() {
        let (bridge, _) = bridge_with(CookieBridgeConfig::default());
        let mut headers = BTreeMap::from([(COOKIE_HEADER.to_string(), "manual=x".to_string())]);
        bridge.attach_cookies(&descriptor("https://example.com"), &mut headers);
        assert_eq!(headers.get(COOKIE_HEADER).map(String::as_str), Some("manual=x"));
    }

    #[test]
    fn test_persist_cookies_from_response_stores_and_persists() {
        let (bridge, store) = bridge_with(CookieBridgeConfig::default());
        let url = Url::parse("https://example.com/login").unwrap();
        let response = HttpResponse::new(500, Vec::new(), url)
            .with_header("Set-Cookie", "sid=abc; Path=/")
            .with_header("set-cookie", "=broken")
            .with_header("Set-Cookie", "theme=dark");

        bridge.persist_cookies_from_response(&descriptor("https://example.com/login"), &response);
        assert_eq!(bridge.all_cookies().len(), 2);
        assert_eq!(persisted_count(&store), 2);
    }

    #[test]
    fn test_store_response_cookies_scopes_to_response_url() {
        let (bridge, _) = bridge_with(CookieBridgeConfig::default());
        let hop = Url::parse("https://login.example.com/start").unwrap();
        let response = HttpResponse::new(302, Vec::new(), hop).with_header("Set-Cookie", "sid=abc");
        assert_eq!(bridge.store_response_cookies(&response), 1);

        let mut headers = BTreeMap::new();
        bridge.attach_cookies_for_url(&Url::parse("https://example.com/").unwrap(), &mut headers);
        assert!(headers.is_empty());

        bridge.attach_cookies_for_url(
            &Url::parse("https://login.example.com/home").unwrap(),
            &mut headers,
        );
        assert_eq!(headers.get(COOKIE_HEADER).map(String::as_str), Some("sid=abc"));
    }

    #[test]
    fn test_persist_respects_opt_out() {
        let (bridge, store) = bridge_with(CookieBridgeConfig::default());
        let descriptor = RequestDescriptor::get("https://example.com")
            .save_response_cookies(false)
            .build()
            .unwrap();
        let response = HttpResponse::new(200, Vec::new(), descriptor.url().clone())
            .with_header("Set-Cookie", "sid=abc");

        bridge.persist_cookies_from_response(&descriptor, &response);
        assert!(bridge.all_cookies().is_empty());
        assert_eq!(persisted_count(&store), 0);
    }

    #[test]
    fn test_expired_set_cookie_deletes_existing() {
        let (bridge, _) = bridge_with(CookieBridgeConfig::default());
        bridge.store_cookie(Cookie::new("example.com", "/", "sid", "abc").with_host_only(true));
        let url = Url::parse("https://example.com/").unwrap();
        let response =
            HttpResponse::new(200, Vec::new(), url).with_header("Set-Cookie", "sid=; Max-Age=0");

        bridge.persist_cookies_from_response(&descriptor("https://example.com/"), &response);
        assert!(bridge.all_cookies().is_empty());
    }

    #[test]
    fn test_sync_loads_persisted_cookies() {
        let store = Arc::new(MemoryStore::new());
        store
            .set(
                PERSISTED_COOKIES_KEY,
                vec![
                    encode_cookie(&Cookie::new("example.com", "/", "a", "1")).unwrap(),
                    b"not a cookie".to_vec(),
                ],
            )
            .unwrap();

        let bridge = CookieBridge::new(store.clone(), CookieBridgeConfig::default());
        bridge.sync_cookies();
        let cookies = bridge.all_cookies();
        assert_eq!(cookies.len(), 1);
        assert_eq!(cookies[0].value(), "1");
        // The undecodable entry is dropped by the write-back.
        assert_eq!(persisted_count(&store), 1);
    }

    #[test]
    fn test_sync_twice_is_idempotent() {
        let (bridge, store) = bridge_with(CookieBridgeConfig::default());
        bridge.store_cookie(Cookie::new("example.com", "/", "a", "1"));

        bridge.sync_cookies();
        let first = store.get(PERSISTED_COOKIES_KEY).unwrap();
        bridge.sync_cookies();
        let second = store.get(PERSISTED_COOKIES_KEY).unwrap();
        assert_eq!(first, second);
        assert_eq!(bridge.all_cookies().len(), 1);
    }

    #[test]
    fn test_sync_disabled_never_touches_persisted_store() {
        let (bridge, store) = bridge_with(CookieBridgeConfig {
            sync_with_persisted: false,
            ..CookieBridgeConfig::default()
        });
        bridge.store_cookie(Cookie::new("example.com", "/", "a", "1"));
        bridge.sync_cookies();
        assert!(store.get(PERSISTED_COOKIES_KEY).unwrap().is_none());
        assert_eq!(bridge.all_cookies().len(), 1);
    }

    #[test]
    fn test_prune_expired_removes_past_and_keeps_future() {
        let now = unix_now();
        let store = Arc::new(MemoryStore::new());
        store
            .set(
                PERSISTED_COOKIES_KEY,
                vec![
                    encode_cookie(&Cookie::new("example.com", "/", "old", "1").with_expires(now - 60))
                        .unwrap(),
                    encode_cookie(
                        &Cookie::new("example.com", "/", "fresh", "2").with_expires(now + 3600),
                    )
                    .unwrap(),
                    encode_cookie(&Cookie::new("example.com", "/", "session", "3")).unwrap(),
                ],
            )
            .unwrap();

        let bridge = CookieBridge::new(store.clone(), CookieBridgeConfig::default());
        let stats = bridge.prune_expired();
        assert_eq!(stats.persisted_removed, 1);
        assert_eq!(persisted_count(&store), 2);

        let names: Vec<_> = bridge.all_cookies().into_iter().map(|c| c.name).collect();
        assert!(names.contains(&"fresh".to_string()));
        assert!(names.contains(&"session".to_string()));
        assert!(!names.contains(&"old".to_string()));
    }

    #[test]
    fn test_open_prunes_then_syncs() {
        let now = unix_now();
        let store = Arc::new(MemoryStore::new());
        store
            .set(
                PERSISTED_COOKIES_KEY,
                vec![
                    encode_cookie(&Cookie::new("example.com", "/", "old", "1").with_expires(now - 1))
                        .unwrap(),
                    encode_cookie(&Cookie::new("example.com", "/", "keep", "2")).unwrap(),
                ],
            )
            .unwrap();

        let bridge = CookieBridge::open(store.clone(), CookieBridgeConfig::default());
        assert_eq!(bridge.all_cookies().len(), 1);
        assert_eq!(persisted_count(&store), 1);
    }

    #[test]
    fn test_delete_all_removes_persisted_key() {
        let (bridge, store) = bridge_with(CookieBridgeConfig::default());
        bridge.store_cookie(Cookie::new("example.com", "/", "a", "1"));
        bridge.delete_all();
        assert!(store.get(PERSISTED_COOKIES_KEY).unwrap().is_none());
        assert!(bridge.all_cookies().is_empty());
    }

    #[test]
    fn test_delete_matching_with_filter() {
        let (bridge, store) = bridge_with(CookieBridgeConfig::default());
        bridge.store_cookie(Cookie::new("example.com", "/", "a", "1"));
        bridge.store_cookie(Cookie::new("api.example.com", "/", "b", "2"));
        bridge.store_cookie(Cookie::new("other.com", "/", "a", "3"));

        let filter = CookieFilter {
            domain: Some("example.com".to_string()),
            name: None,
        };
        assert_eq!(bridge.delete_matching(|cookie| filter.matches(cookie)), 2);
        assert_eq!(persisted_count(&store), 1);
        assert_eq!(bridge.all_cookies()[0].domain, "other.com");
    }

    #[test]
    fn test_cookie_filter_by_name() {
        let filter = CookieFilter {
            domain: None,
            name: Some("sid".to_string()),
        };
        assert!(filter.matches(&Cookie::new("example.com", "/", "sid", "1")));
        assert!(!filter.matches(&Cookie::new("example.com", "/", "other", "1")));
        assert!(CookieFilter::default().matches(&Cookie::new("x.com", "/", "any", "1")));
    }

    #[test]
    fn test_merge_policy_parse() {
        assert_eq!(
            "Replace".parse::<CookieMergePolicy>().unwrap(),
            CookieMergePolicy::Replace
        );
        assert_eq!(
            "append".parse::<CookieMergePolicy>().unwrap(),
            CookieMergePolicy::Append
        );
        assert!("merge".parse::<CookieMergePolicy>().is_err());
    }
}
