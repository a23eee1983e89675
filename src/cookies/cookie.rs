//! Cookie record, `Set-Cookie` parsing, and request matching.
//!
//! Matching follows RFC 6265 section 5: domain tail-matching for domain
//! cookies, exact host matching for host-only cookies, path prefix matching,
//! and the `Secure` attribute restricting cookies to HTTPS.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::instrument;
use url::Url;

/// A single cookie.
///
/// The value field is intentionally redacted in Debug output to prevent
/// accidental logging of sensitive cookie data.
#[derive(Clone, PartialEq, Eq)]
pub struct Cookie {
    /// Domain the cookie belongs to (lowercase, without a leading dot).
    pub domain: String,
    /// URL path scope for the cookie.
    pub path: String,
    /// Cookie name.
    pub name: String,
    /// Cookie value; never logged.
    value: String,
    /// Unix timestamp after which the cookie is expired; `None` never expires.
    pub expires: Option<u64>,
    /// Whether the cookie is only sent over HTTPS.
    pub secure: bool,
    /// Whether only the exact host matches (no subdomains).
    pub host_only: bool,
    /// Whether the cookie was marked `HttpOnly`.
    pub http_only: bool,
}

impl Cookie {
    /// Creates a domain cookie with no expiry that matches subdomains.
    #[must_use]
    pub fn new(
        domain: impl AsRef<str>,
        path: impl Into<String>,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            domain: normalize_domain(domain.as_ref()),
            path: path.into(),
            name: name.into(),
            value: value.into(),
            expires: None,
            secure: false,
            host_only: false,
            http_only: false,
        }
    }

    /// Sets the expiry timestamp.
    #[must_use]
    pub fn with_expires(mut self, expires: u64) -> Self {
        self.expires = Some(expires);
        self
    }

    /// Sets the `Secure` flag.
    #[must_use]
    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    /// Restricts matching to the exact host.
    #[must_use]
    pub fn with_host_only(mut self, host_only: bool) -> Self {
        self.host_only = host_only;
        self
    }

    /// Sets the `HttpOnly` flag.
    #[must_use]
    pub fn with_http_only(mut self, http_only: bool) -> Self {
        self.http_only = http_only;
        self
    }

    /// Returns the cookie value.
    ///
    /// Cookie values are sensitive; do not log the return value.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Whether two cookies occupy the same slot (domain, path, name).
    #[must_use]
    pub fn same_identity(&self, other: &Cookie) -> bool {
        self.domain == other.domain && self.path == other.path && self.name == other.name
    }

    /// Whether the cookie is expired at `now` (Unix seconds).
    #[must_use]
    pub fn is_expired_at(&self, now: u64) -> bool {
        self.expires.is_some_and(|expires| expires <= now)
    }

    /// Whether the cookie should be sent with a request to `url` at `now`.
    #[must_use]
    pub fn matches_url(&self, url: &Url, now: u64) -> bool {
        let Some(host) = url.host_str() else {
            return false;
        };
        let host = host.to_ascii_lowercase();

        !self.is_expired_at(now)
            && (!self.secure || url.scheme() == "https")
            && self.matches_host(&host)
            && path_matches(&self.path, url.path())
    }

    fn matches_host(&self, host: &str) -> bool {
        if self.host_only {
            host == self.domain
        } else {
            domain_matches(host, &self.domain)
        }
    }
}

// Custom Debug impl that redacts the cookie value.
impl fmt::Debug for Cookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cookie")
            .field("domain", &self.domain)
            .field("path", &self.path)
            .field("name", &self.name)
            .field("value", &"[REDACTED]")
            .field("expires", &self.expires)
            .field("secure", &self.secure)
            .field("host_only", &self.host_only)
            .field("http_only", &self.http_only)
            .finish()
    }
}

/// Errors that can occur while parsing a `Set-Cookie` header.
#[derive(Debug, thiserror::Error)]
pub enum CookieError {
    /// The `name=value` pair is missing or has an empty name.
    #[error("set-cookie header has no cookie name")]
    MissingName,

    /// The response URL has no host to scope the cookie to.
    #[error("response URL has no host")]
    MissingHost,

    /// The `Domain` attribute does not cover the response host.
    #[error("cookie domain '{domain}' does not match host '{host}'")]
    DomainMismatch {
        /// Domain named by the attribute.
        domain: String,
        /// Host the response came from.
        host: String,
    },
}

/// Parses one `Set-Cookie` header value received from `request_url`.
///
/// `Max-Age` takes precedence over `Expires`. A non-positive `Max-Age` or a
/// past `Expires` produces a cookie that is already expired at `now`, which
/// the session store treats as a deletion. Unparseable attribute values are
/// ignored.
///
/// # Errors
///
/// Returns [`CookieError`] when the header has no name, the URL has no host,
/// or the `Domain` attribute does not cover the host.
#[instrument(level = "trace", skip(header), fields(url = %request_url))]
pub fn parse_set_cookie(header: &str, request_url: &Url, now: u64) -> Result<Cookie, CookieError> {
    let mut parts = header.split(';');
    let pair = parts.next().unwrap_or_default();
    let (name, value) = pair.split_once('=').ok_or(CookieError::MissingName)?;
    let name = name.trim();
    if name.is_empty() {
        return Err(CookieError::MissingName);
    }
    let value = value.trim().trim_matches('"');

    let host = request_url
        .host_str()
        .map(str::to_ascii_lowercase)
        .ok_or(CookieError::MissingHost)?;

    let mut domain_attr = None;
    let mut path_attr = None;
    let mut max_age = None;
    let mut expires_attr = None;
    let mut secure = false;
    let mut http_only = false;

    for attribute in parts {
        let (key, attr_value) = match attribute.split_once('=') {
            Some((key, attr_value)) => (key.trim(), attr_value.trim()),
            None => (attribute.trim(), ""),
        };

        match key.to_ascii_lowercase().as_str() {
            "domain" => {
                let normalized = normalize_domain(attr_value);
                if !normalized.is_empty() {
                    domain_attr = Some(normalized);
                }
            }
            "path" if attr_value.starts_with('/') => path_attr = Some(attr_value.to_string()),
            "max-age" => max_age = attr_value.parse::<i64>().ok(),
            "expires" => expires_attr = parse_expires(attr_value),
            "secure" => secure = true,
            "httponly" => http_only = true,
            _ => {}
        }
    }

    let (domain, host_only) = match domain_attr {
        Some(domain) => {
            if !domain_matches(&host, &domain) {
                return Err(CookieError::DomainMismatch { domain, host });
            }
            (domain, false)
        }
        None => (host, true),
    };

    let expires = match max_age {
        Some(age) if age <= 0 => Some(0),
        Some(age) => Some(now.saturating_add(age.unsigned_abs())),
        None => expires_attr,
    };

    Ok(Cookie {
        domain,
        path: path_attr.unwrap_or_else(|| default_path(request_url.path())),
        name: name.to_string(),
        value: value.to_string(),
        expires,
        secure,
        host_only,
        http_only,
    })
}

/// Renders cookies as a single `Cookie` request header value.
///
/// Returns `None` when there is nothing to send.
#[must_use]
pub fn render_cookie_header(cookies: &[Cookie]) -> Option<String> {
    if cookies.is_empty() {
        return None;
    }
    Some(
        cookies
            .iter()
            .map(|cookie| format!("{}={}", cookie.name, cookie.value))
            .collect::<Vec<_>>()
            .join("; "),
    )
}

/// Current time as Unix seconds.
#[must_use]
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or(0)
}

fn normalize_domain(domain: &str) -> String {
    domain.trim().trim_start_matches('.').to_ascii_lowercase()
}

fn domain_matches(host: &str, domain: &str) -> bool {
    host == domain
        || (host.len() > domain.len()
            && host.ends_with(domain)
            && host.as_bytes()[host.len() - domain.len() - 1] == b'.')
}

fn path_matches(cookie_path: &str, request_path: &str) -> bool {
    if cookie_path == request_path {
        return true;
    }
    request_path.starts_with(cookie_path)
        && (cookie_path.ends_with('/')
            || request_path.as_bytes().get(cookie_path.len()) == Some(&b'/'))
}

fn default_path(request_path: &str) -> String {
    if !request_path.starts_with('/') {
        return "/".to_string();
    }
    match request_path.rfind('/') {
        Some(0) | None => "/".to_string(),
        Some(index) => request_path[..index].to_string(),
    }
}

fn parse_expires(value: &str) -> Option<u64> {
    let time = httpdate::parse_http_date(value).ok()?;
    Some(
        time.duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs())
            .unwrap_or(0),
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const NOW: u64 = 1_700_000_000;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_parse_simple_cookie_is_host_only() {
        let cookie =
            parse_set_cookie("session=abc123", &url("https://api.example.com/v1/login"), NOW)
                .unwrap();
        assert_eq!(cookie.name, "session");
        assert_eq!(cookie.value(), "abc123");
        assert_eq!(cookie.domain, "api.example.com");
        assert!(cookie.host_only);
        assert_eq!(cookie.path, "/v1");
        assert_eq!(cookie.expires, None);
    }

    #[test]
    fn test_parse_attributes() {
        let cookie = parse_set_cookie(
            "id=7; Domain=.Example.com; Path=/app; Secure; HttpOnly; Max-Age=60",
            &url("https://www.example.com/"),
            NOW,
        )
        .unwrap();
        assert_eq!(cookie.domain, "example.com");
        assert!(!cookie.host_only);
        assert_eq!(cookie.path, "/app");
        assert!(cookie.secure);
        assert!(cookie.http_only);
        assert_eq!(cookie.expires, Some(NOW + 60));
    }

    #[test]
    fn test_parse_expires_attribute() {
        let cookie = parse_set_cookie(
            "a=1; Expires=Wed, 21 Oct 2015 07:28:00 GMT",
            &url("https://example.com/"),
            NOW,
        )
        .unwrap();
        assert_eq!(cookie.expires, Some(1_445_412_480));
        assert!(cookie.is_expired_at(NOW));
    }

    #[test]
    fn test_max_age_takes_precedence_over_expires() {
        let cookie = parse_set_cookie(
            "a=1; Expires=Wed, 21 Oct 2015 07:28:00 GMT; Max-Age=100",
            &url("https://example.com/"),
            NOW,
        )
        .unwrap();
        assert_eq!(cookie.expires, Some(NOW + 100));
    }

    #[test]
    fn test_non_positive_max_age_is_expired() {
        let cookie = parse_set_cookie("a=1; Max-Age=0", &url("https://example.com/"), NOW).unwrap();
        assert!(cookie.is_expired_at(NOW));
    }

    #[test]
    fn test_parse_rejects_missing_name() {
        let result = parse_set_cookie("=value", &url("https://example.com/"), NOW);
        assert!(matches!(result, Err(CookieError::MissingName)));
        let result = parse_set_cookie("novalue", &url("https://example.com/"), NOW);
        assert!(matches!(result, Err(CookieError::MissingName)));
    }

    #[test]
    fn test_parse_rejects_foreign_domain() {
        let result = parse_set_cookie(
            "a=1; Domain=evil.com",
            &url("https://example.com/"),
            NOW,
        );
        assert!(matches!(result, Err(CookieError::DomainMismatch { .. })));
    }

    #[test]
    fn test_parse_rejects_suffix_that_is_not_a_label_boundary() {
        let result = parse_set_cookie(
            "a=1; Domain=ample.com",
            &url("https://example.com/"),
            NOW,
        );
        assert!(matches!(result, Err(CookieError::DomainMismatch { .. })));
    }

    #[test]
    fn test_domain_cookie_matches_subdomain() {
        let cookie = Cookie::new("example.com", "/", "a", "1");
        assert!(cookie.matches_url(&url("https://example.com/"), NOW));
        assert!(cookie.matches_url(&url("https://api.example.com/x"), NOW));
        assert!(!cookie.matches_url(&url("https://notexample.com/"), NOW));
    }

    #[test]
    fn test_host_only_cookie_does_not_match_subdomain() {
        let cookie = Cookie::new("example.com", "/", "a", "1").with_host_only(true);
        assert!(cookie.matches_url(&url("https://example.com/"), NOW));
        assert!(!cookie.matches_url(&url("https://api.example.com/"), NOW));
    }

    #[test]
    fn test_path_matching() {
        let cookie = Cookie::new("example.com", "/docs", "a", "1");
        assert!(cookie.matches_url(&url("https://example.com/docs"), NOW));
        assert!(cookie.matches_url(&url("https://example.com/docs/page"), NOW));
        assert!(!cookie.matches_url(&url("https://example.com/docsearch"), NOW));
        assert!(!cookie.matches_url(&url("https://example.com/"), NOW));
    }

    #[test]
    fn test_secure_cookie_requires_https() {
        let cookie = Cookie::new("example.com", "/", "a", "1").with_secure(true);
        assert!(cookie.matches_url(&url("https://example.com/"), NOW));
        assert!(!cookie.matches_url(&url("http://example.com/"), NOW));
    }

    #[test]
    fn test_expired_cookie_does_not_match() {
        let cookie = Cookie::new("example.com", "/", "a", "1").with_expires(NOW - 1);
        assert!(!cookie.matches_url(&url("https://example.com/"), NOW));
    }

    #[test]
    fn test_render_cookie_header() {
        let cookies = vec![
            Cookie::new("example.com", "/", "a", "1"),
            Cookie::new("example.com", "/", "b", "2"),
        ];
        assert_eq!(render_cookie_header(&cookies).as_deref(), Some("a=1; b=2"));
        assert_eq!(render_cookie_header(&[]), None);
    }

    #[test]
    fn test_debug_redacts_value() {
        let cookie = Cookie::new("example.com", "/", "token", "super-secret");
        let debug = format!("{cookie:?}");
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn test_default_path() {
        assert_eq!(default_path("/"), "/");
        assert_eq!(default_path("/login"), "/");
        assert_eq!(default_path("/v1/login"), "/v1");
        assert_eq!(default_path(""), "/");
    }
}
