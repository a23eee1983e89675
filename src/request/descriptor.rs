//! Immutable description of one logical HTTP call.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use thiserror::Error;
use url::Url;

use super::CacheConfig;

/// Header name used for request cookies (stored lowercase).
pub const COOKIE_HEADER: &str = "cookie";

/// Header name used for the request body media type (stored lowercase).
pub const CONTENT_TYPE_HEADER: &str = "content-type";

/// HTTP methods supported by descriptors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    /// `GET`
    Get,
    /// `POST`
    Post,
    /// `PUT`
    Put,
    /// `DELETE`
    Delete,
    /// `PATCH`
    Patch,
}

impl HttpMethod {
    /// Returns the method token as sent on the wire.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Patch => "PATCH",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = DescriptorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "DELETE" => Ok(Self::Delete),
            "PATCH" => Ok(Self::Patch),
            _ => Err(DescriptorError::UnsupportedMethod {
                method: s.to_string(),
            }),
        }
    }
}

/// Request payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestBody {
    /// Raw bytes sent as-is.
    Bytes(Vec<u8>),
    /// UTF-8 text.
    Text(String),
    /// A structured value, already JSON-encoded when the descriptor was built.
    Json(Vec<u8>),
}

impl RequestBody {
    /// Returns the encoded body bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Bytes(bytes) | Self::Json(bytes) => bytes,
            Self::Text(text) => text.as_bytes(),
        }
    }

    /// Returns the media type implied by the body kind.
    #[must_use]
    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Bytes(_) => "application/octet-stream",
            Self::Text(_) => "text/plain; charset=utf-8",
            Self::Json(_) => "application/json",
        }
    }
}

/// Errors raised while building a [`RequestDescriptor`].
#[derive(Debug, Error)]
pub enum DescriptorError {
    /// The target URL could not be parsed or is not HTTP(S).
    #[error("invalid URL: {url}")]
    InvalidUrl {
        /// The rejected URL string.
        url: String,
    },

    /// The method token is not one of GET/POST/PUT/DELETE/PATCH.
    #[error("unsupported HTTP method: {method}")]
    UnsupportedMethod {
        /// The rejected method token.
        method: String,
    },

    /// The structured body could not be JSON-encoded.
    #[error("failed to encode request body: {source}")]
    BodyEncoding {
        /// The underlying serializer error.
        #[source]
        source: serde_json::Error,
    },
}

/// Immutable description of one HTTP call.
///
/// Built once with [`RequestDescriptor::builder`] and handed to the executor.
/// The only mutation allowed after building is
/// [`add_temporary_cookie`](Self::add_temporary_cookie).
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    url: Url,
    method: HttpMethod,
    query: BTreeMap<String, String>,
    headers: BTreeMap<String, String>,
    body: Option<RequestBody>,
    cache: Option<CacheConfig>,
    include_cookies: bool,
    save_response_cookies: bool,
}

impl RequestDescriptor {
    /// Starts building a descriptor for `method` and `url`.
    #[must_use]
    pub fn builder(method: HttpMethod, url: impl Into<String>) -> RequestDescriptorBuilder {
        RequestDescriptorBuilder::new(method, url.into())
    }

    /// Starts building a `GET` descriptor.
    #[must_use]
    pub fn get(url: impl Into<String>) -> RequestDescriptorBuilder {
        Self::builder(HttpMethod::Get, url)
    }

    /// Starts building a `POST` descriptor.
    #[must_use]
    pub fn post(url: impl Into<String>) -> RequestDescriptorBuilder {
        Self::builder(HttpMethod::Post, url)
    }

    /// Starts building a `PUT` descriptor.
    #[must_use]
    pub fn put(url: impl Into<String>) -> RequestDescriptorBuilder {
        Self::builder(HttpMethod::Put, url)
    }

    /// Starts building a `DELETE` descriptor.
    #[must_use]
    pub fn delete(url: impl Into<String>) -> RequestDescriptorBuilder {
        Self::builder(HttpMethod::Delete, url)
    }

    /// Starts building a `PATCH` descriptor.
    #[must_use]
    pub fn patch(url: impl Into<String>) -> RequestDescriptorBuilder {
        Self::builder(HttpMethod::Patch, url)
    }

    /// The target URL as given, without descriptor query parameters.
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// The HTTP method.
    #[must_use]
    pub fn method(&self) -> HttpMethod {
        self.method
    }

    /// Query parameters appended to the URL at send time.
    #[must_use]
    pub fn query(&self) -> &BTreeMap<String, String> {
        &self.query
    }

    /// Request headers, keyed by lowercase name.
    #[must_use]
    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    /// Looks up a header by case-insensitive name.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// The request body, if any.
    #[must_use]
    pub fn body(&self) -> Option<&RequestBody> {
        self.body.as_ref()
    }

    /// Cache configuration for this request, if any.
    #[must_use]
    pub fn cache(&self) -> Option<&CacheConfig> {
        self.cache.as_ref()
    }

    /// Whether stored cookies are attached to the request.
    #[must_use]
    pub fn include_cookies(&self) -> bool {
        self.include_cookies
    }

    /// Whether `Set-Cookie` headers from the response are stored.
    #[must_use]
    pub fn save_response_cookies(&self) -> bool {
        self.save_response_cookies
    }

    /// Returns the URL with descriptor query parameters appended.
    ///
    /// Parameters already present in the base URL are kept.
    #[must_use]
    pub fn full_url(&self) -> Url {
        if self.query.is_empty() {
            return self.url.clone();
        }

        let appended = self
            .query
            .iter()
            .map(|(key, value)| {
                format!(
                    "{}={}",
                    urlencoding::encode(key),
                    urlencoding::encode(value)
                )
            })
            .collect::<Vec<_>>()
            .join("&");

        let mut url = self.url.clone();
        let combined = match url.query() {
            Some(existing) if !existing.is_empty() => format!("{existing}&{appended}"),
            _ => appended,
        };
        url.set_query(Some(&combined));
        url
    }

    /// Appends a one-off cookie to the `Cookie` header of this descriptor.
    ///
    /// The cookie is never written to any cookie store.
    pub fn add_temporary_cookie(&mut self, name: &str, value: &str) {
        let pair = format!("{name}={value}");
        self.headers
            .entry(COOKIE_HEADER.to_string())
            .and_modify(|existing| {
                if existing.is_empty() {
                    existing.clone_from(&pair);
                } else {
                    existing.push_str("; ");
                    existing.push_str(&pair);
                }
            })
            .or_insert(pair);
    }
}

/// Builder for [`RequestDescriptor`].
///
/// Errors from individual steps (such as body encoding) are deferred and
/// reported by [`build`](Self::build).
#[derive(Debug)]
pub struct RequestDescriptorBuilder {
    url: String,
    method: HttpMethod,
    query: BTreeMap<String, String>,
    headers: BTreeMap<String, String>,
    body: Option<RequestBody>,
    cache: Option<CacheConfig>,
    include_cookies: bool,
    save_response_cookies: bool,
    error: Option<DescriptorError>,
}

impl RequestDescriptorBuilder {
    fn new(method: HttpMethod, url: String) -> Self {
        Self {
            url,
            method,
            query: BTreeMap::new(),
            headers: BTreeMap::new(),
            body: None,
            cache: None,
            include_cookies: true,
            save_response_cookies: true,
            error: None,
        }
    }

    /// Adds a query parameter; a repeated key replaces the earlier value.
    #[must_use]
    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.insert(key.into(), value.to_string());
        self
    }

    /// Adds a header; names are case-insensitive and the last write wins.
    #[must_use]
    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    /// Sets a raw byte body.
    #[must_use]
    pub fn body_bytes(mut self, bytes: impl Into<Vec<u8>>) -> Self {
        self.body = Some(RequestBody::Bytes(bytes.into()));
        self
    }

    /// Sets a UTF-8 text body.
    #[must_use]
    pub fn body_text(mut self, text: impl Into<String>) -> Self {
        self.body = Some(RequestBody::Text(text.into()));
        self
    }

    /// Sets a JSON body encoded from `value`.
    #[must_use]
    pub fn json<T: Serialize + ?Sized>(mut self, value: &T) -> Self {
        match serde_json::to_vec(value) {
            Ok(bytes) => self.body = Some(RequestBody::Json(bytes)),
            Err(source) => self.error = Some(DescriptorError::BodyEncoding { source }),
        }
        self
    }

    /// Attaches cache configuration.
    #[must_use]
    pub fn cache(mut self, cache: CacheConfig) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Controls whether stored cookies are attached (default: `true`).
    #[must_use]
    pub fn include_cookies(mut self, include: bool) -> Self {
        self.include_cookies = include;
        self
    }

    /// Controls whether response cookies are stored (default: `true`).
    #[must_use]
    pub fn save_response_cookies(mut self, save: bool) -> Self {
        self.save_response_cookies = save;
        self
    }

    /// Validates and builds the descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`DescriptorError::InvalidUrl`] when the URL does not parse or
    /// is not `http`/`https`, and [`DescriptorError::BodyEncoding`] when a JSON
    /// body failed to encode.
    pub fn build(self) -> Result<RequestDescriptor, DescriptorError> {
        if let Some(error) = self.error {
            return Err(error);
        }

        let url = Url::parse(&self.url).map_err(|_| DescriptorError::InvalidUrl {
            url: self.url.clone(),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(DescriptorError::InvalidUrl { url: self.url });
        }

        Ok(RequestDescriptor {
            url,
            method: self.method,
            query: self.query,
            headers: self.headers,
            body: self.body,
            cache: self.cache,
            include_cookies: self.include_cookies,
            save_response_cookies: self.save_response_cookies,
        })
    }
}
