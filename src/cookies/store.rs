//! Persisted key/value stores for cookie entries.
//!
//! A [`PersistedStore`] maps a key to a list of opaque byte entries, scoped
//! to one namespace ("suite"). The cookie bridge writes one JSON record per
//! cookie under a single key. [`FileStore`] keeps each suite in
//! `~/.config/fetcher/<suite>.json` (or `$XDG_CONFIG_HOME/fetcher/<suite>.json`).

use std::collections::{BTreeMap, HashMap};
use std::env;
use std::ffi::OsString;
use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::cookie::Cookie;

/// Key under which the cookie bridge stores its entries by default.
pub const PERSISTED_COOKIES_KEY: &str = "fetcher.cookies";

/// Suite used when none is configured.
pub const DEFAULT_SUITE: &str = "cookies";

const CONFIG_DIR_NAME: &str = "fetcher";

/// Errors for persisted store operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// No suitable user config directory is available.
    #[error("unable to determine config directory (set XDG_CONFIG_HOME or HOME)")]
    ConfigDirUnavailable,
    /// Filesystem I/O failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// Serialization/deserialization failed.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    /// An entry could not be represented in the file format.
    #[error("persisted entry for '{key}' is not valid UTF-8")]
    InvalidEntry {
        /// Key being written.
        key: String,
    },
    /// The suite name would escape the config directory.
    #[error("invalid suite name '{suite}'")]
    InvalidSuite {
        /// Rejected suite name.
        suite: String,
    },
}

/// Key/value persistence for lists of opaque entries.
///
/// Implementations must be safe to share across tasks; the cookie bridge
/// serializes access on its side as well.
pub trait PersistedStore: Send + Sync + fmt::Debug {
    /// Returns the entries stored under `key`, or `None` when absent.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] when the backing storage cannot be read.
    fn get(&self, key: &str) -> Result<Option<Vec<Vec<u8>>>, StorageError>;

    /// Replaces the entries stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] when the backing storage cannot be written.
    fn set(&self, key: &str, entries: Vec<Vec<u8>>) -> Result<(), StorageError>;

    /// Removes `key` entirely.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] when the backing storage cannot be written.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// In-memory store, used for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Vec<Vec<u8>>>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl PersistedStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Vec<Vec<u8>>>, StorageError> {
        Ok(self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned())
    }

    fn set(&self, key: &str, entries: Vec<Vec<u8>>) -> Result<(), StorageError> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), entries);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
        Ok(())
    }
}

/// JSON file store: one file per suite, owner-only permissions on unix.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

type FileContents = BTreeMap<String, Vec<String>>;

impl FileStore {
    /// Opens the store for `suite` in the default config directory.
    ///
    /// The file is created lazily on first write.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::ConfigDirUnavailable`] if no usable config dir
    /// is found, or [`StorageError::InvalidSuite`] for names containing path
    /// separators.
    pub fn for_suite(suite: &str) -> Result<Self, StorageError> {
        Ok(Self::at_path(suite_path(&default_config_dir()?, suite)?))
    }

    /// Opens a store backed by an explicit file path.
    #[must_use]
    pub fn at_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Location of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_contents(&self) -> Result<FileContents, StorageError> {
        if !self.path.exists() {
            return Ok(FileContents::new());
        }
        let bytes = fs::read(&self.path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    fn read_contents_for_update(&self) -> FileContents {
        match self.read_contents() {
            Ok(contents) => contents,
            Err(error) => {
                warn!(path = %self.path.display(), error = %error, "persisted store unreadable, starting fresh");
                FileContents::new()
            }
        }
    }

    /// Writes a staging file created owner-only, then renames it over the
    /// store so readers never see partial contents or wider permissions.
    fn write_contents(&self, contents: &FileContents) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let payload = serde_json::to_vec_pretty(contents)?;

        let staging = self.staging_path();
        let mut file = create_owner_only(&staging)?;
        file.write_all(&payload)?;
        file.sync_all()?;
        drop(file);
        fs::rename(&staging, &self.path)?;
        Ok(())
    }

    fn staging_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(OsString::from)
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl PersistedStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<Vec<Vec<u8>>>, StorageError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let contents = self.read_contents()?;
        Ok(contents
            .get(key)
            .map(|entries| entries.iter().map(|entry| entry.as_bytes().to_vec()).collect()))
    }

    fn set(&self, key: &str, entries: Vec<Vec<u8>>) -> Result<(), StorageError> {
        let entries = entries
            .into_iter()
            .map(String::from_utf8)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| StorageError::InvalidEntry {
                key: key.to_string(),
            })?;

        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut contents = self.read_contents_for_update();
        contents.insert(key.to_string(), entries);
        self.write_contents(&contents)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        if !self.path.exists() {
            return Ok(());
        }
        let mut contents = self.read_contents_for_update();
        if contents.remove(key).is_some() {
            self.write_contents(&contents)?;
        }
        Ok(())
    }
}

/// Fixed-field JSON record for one persisted cookie.
#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct StoredCookie {
    domain: String,
    path: String,
    name: String,
    value: String,
    #[serde(default)]
    expires: Option<u64>,
    #[serde(default)]
    secure: bool,
    #[serde(default)]
    host_only: bool,
    #[serde(default)]
    http_only: bool,
}

/// Serializes a cookie into one persisted entry.
pub(crate) fn encode_cookie(cookie: &Cookie) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec(&StoredCookie {
        domain: cookie.domain.clone(),
        path: cookie.path.clone(),
        name: cookie.name.clone(),
        value: cookie.value().to_string(),
        expires: cookie.expires,
        secure: cookie.secure,
        host_only: cookie.host_only,
        http_only: cookie.http_only,
    })
}

/// Deserializes and validates one persisted entry.
pub(crate) fn decode_cookie(bytes: &[u8]) -> Result<Cookie, serde_json::Error> {
    let stored: StoredCookie = serde_json::from_slice(bytes)?;
    if stored.name.is_empty() || stored.domain.is_empty() || !stored.path.starts_with('/') {
        return Err(serde::de::Error::custom(
            "cookie record requires name, domain and absolute path",
        ));
    }

    let mut cookie = Cookie::new(stored.domain, stored.path, stored.name, stored.value)
        .with_secure(stored.secure)
        .with_host_only(stored.host_only)
        .with_http_only(stored.http_only);
    if let Some(expires) = stored.expires {
        cookie = cookie.with_expires(expires);
    }
    Ok(cookie)
}

fn suite_path(config_dir: &Path, suite: &str) -> Result<PathBuf, StorageError> {
    let trimmed = suite.trim();
    if trimmed.is_empty()
        || trimmed.starts_with('.')
        || trimmed.contains(['/', '\\'])
    {
        return Err(StorageError::InvalidSuite {
            suite: suite.to_string(),
        });
    }
    Ok(config_dir.join(format!("{trimmed}.json")))
}

/// Returns the default config directory (`~/.config/fetcher`).
///
/// # Errors
///
/// Returns [`StorageError::ConfigDirUnavailable`] if no usable config dir is found.
pub fn default_config_dir() -> Result<PathBuf, StorageError> {
    resolve_config_dir(
        sanitize_env_path(env::var_os("XDG_CONFIG_HOME")),
        sanitize_env_path(env::var_os("HOME")),
        sanitize_env_path(env::var_os("APPDATA")),
    )
}

fn sanitize_env_path(value: Option<OsString>) -> Option<PathBuf> {
    let value = value?;
    if value.to_string_lossy().trim().is_empty() {
        return None;
    }

    Some(PathBuf::from(value))
}

fn resolve_config_dir(
    xdg_config_home: Option<PathBuf>,
    home: Option<PathBuf>,
    app_data: Option<PathBuf>,
) -> Result<PathBuf, StorageError> {
    if let Some(xdg) = xdg_config_home {
        return Ok(xdg.join(CONFIG_DIR_NAME));
    }
    if let Some(home) = home {
        return Ok(home.join(".config").join(CONFIG_DIR_NAME));
    }
    if let Some(app_data) = app_data {
        return Ok(app_data.join(CONFIG_DIR_NAME));
    }

    Err(StorageError::ConfigDirUnavailable)
}

#[cfg(unix)]
fn create_owner_only(path: &Path) -> Result<File, StorageError> {
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    // `mode` only applies on creation; a leftover staging file keeps its own.
    file.set_permissions(fs::Permissions::from_mode(0o600))?;
    Ok(file)
}

#[cfg(not(unix))]
fn create_owner_only(path: &Path) -> Result<File, StorageError> {
    Ok(OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)?)
}
