//! Application configuration loading for CLI defaults.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use fetcher_core::cookies::default_config_dir;
use fetcher_core::{CacheConfig, CachePolicy, CookieMergePolicy, FetcherConfig};

/// Key/value file configuration for fetcher defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileConfig {
    /// Retries after the first attempt.
    pub max_retries: Option<u32>,
    /// Fixed wait between attempts in milliseconds.
    pub retry_interval_ms: Option<u64>,
    /// Connect timeout in seconds.
    pub connect_timeout_secs: Option<u64>,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: Option<u64>,
    /// Per-attempt resource timeout in seconds.
    pub resource_timeout_secs: Option<u64>,
    /// Default cache policy for every request.
    pub cache_policy: Option<CachePolicy>,
    /// Mirror session cookies into the persisted store.
    pub cookie_sync: Option<bool>,
    /// Cookie header merge policy.
    pub merge_policy: Option<CookieMergePolicy>,
    /// Persisted cookie store namespace.
    pub cookie_suite: Option<String>,
    /// Batch concurrency limit (1..=100).
    pub max_concurrency: Option<usize>,
}

impl FileConfig {
    /// Validates config values against runtime constraints.
    pub fn validate(&self) -> Result<()> {
        if let Some(max_retries) = self.max_retries
            && max_retries > 10
        {
            bail!("Invalid config value for `max_retries`: {max_retries}. Expected range: 0..=10");
        }
        if let Some(interval) = self.retry_interval_ms
            && interval > 60_000
        {
            bail!(
                "Invalid config value for `retry_interval_ms`: {interval}. Expected range: 0..=60000"
            );
        }
        validate_timeout_secs("connect_timeout_secs", self.connect_timeout_secs)?;
        validate_timeout_secs("request_timeout_secs", self.request_timeout_secs)?;
        validate_timeout_secs("resource_timeout_secs", self.resource_timeout_secs)?;

        if let Some(concurrency) = self.max_concurrency
            && !(1..=100).contains(&concurrency)
        {
            bail!(
                "Invalid config value for `max_concurrency`: {concurrency}. Expected range: 1..=100"
            );
        }
        if let Some(suite) = &self.cookie_suite
            && suite.trim().is_empty()
        {
            bail!("Invalid config value for `cookie_suite`: must not be empty");
        }
        Ok(())
    }

    /// Overlays file values onto `config`.
    pub fn apply_to(&self, config: &mut FetcherConfig) {
        if let Some(value) = self.max_retries {
            config.max_retries = value;
        }
        if let Some(value) = self.retry_interval_ms {
            config.retry_interval = Duration::from_millis(value);
        }
        if let Some(value) = self.connect_timeout_secs {
            config.connect_timeout = Duration::from_secs(value);
        }
        if let Some(value) = self.request_timeout_secs {
            config.request_timeout = Duration::from_secs(value);
        }
        if let Some(value) = self.resource_timeout_secs {
            config.resource_timeout = Duration::from_secs(value);
        }
        if let Some(policy) = self.cache_policy {
            config.default_cache = Some(CacheConfig::with_policy(policy));
        }
        if let Some(value) = self.cookie_sync {
            config.cookie_sync = value;
        }
        if let Some(value) = self.merge_policy {
            config.merge_policy = value;
        }
        if let Some(value) = &self.cookie_suite {
            config.cookie_suite.clone_from(value);
        }
        if let Some(value) = self.max_concurrency {
            config.max_concurrency = Some(value);
        }
    }
}

fn validate_timeout_secs(field: &str, value: Option<u64>) -> Result<()> {
    let Some(value) = value else {
        return Ok(());
    };
    if !(1..=3600).contains(&value) {
        bail!("Invalid config value for `{field}`: {value}. Expected range: 1..=3600");
    }
    Ok(())
}

/// Loaded config metadata.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// Resolved config path if a base directory is known.
    pub path: Option<PathBuf>,
    /// Parsed file config when a config file exists and was valid.
    pub config: Option<FileConfig>,
    /// Indicates whether configuration was loaded from disk.
    pub loaded_from_file: bool,
}

/// Resolves the default config path (`<config dir>/fetcher/config.toml`).
#[must_use]
pub fn resolve_default_config_path() -> Option<PathBuf> {
    default_config_dir()
        .ok()
        .map(|dir| dir.join("config.toml"))
}

/// Loads config from default path if present.
pub fn load_default_file_config() -> Result<LoadedConfig> {
    let path = resolve_default_config_path();
    let Some(path_ref) = path.as_deref() else {
        return Ok(LoadedConfig {
            path,
            config: None,
            loaded_from_file: false,
        });
    };

    if !path_ref.exists() {
        return Ok(LoadedConfig {
            path,
            config: None,
            loaded_from_file: false,
        });
    }

    let config = load_file_config(path_ref)?;
    Ok(LoadedConfig {
        path,
        config: Some(config),
        loaded_from_file: true,
    })
}

fn load_file_config(path: &Path) -> Result<FileConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
    parse_config_str(&raw)
        .with_context(|| format!("Failed to parse config file '{}'", path.display()))
}

fn parse_config_str(raw: &str) -> Result<FileConfig> {
    let mut cfg = FileConfig::default();
    for (line_index, raw_line) in raw.lines().enumerate() {
        let line = strip_inline_comment(raw_line).trim();
        if line.is_empty() {
            continue;
        }

        let Some((raw_key, raw_value)) = line.split_once('=') else {
            bail!(
                "Invalid config syntax on line {}: expected key = value",
                line_index + 1
            );
        };

        let key = raw_key.trim();
        let value = raw_value.trim();
        let line_no = line_index + 1;

        match key {
            "max_retries" => {
                let parsed = parse_integer_u64(value)
                    .with_context(|| format!("Invalid `max_retries` value on line {line_no}"))?;
                let n = u32::try_from(parsed)
                    .map_err(|_| anyhow::anyhow!("max_retries out of range for u32"))?;
                cfg.max_retries = Some(n);
            }
            "retry_interval_ms" => {
                cfg.retry_interval_ms = Some(parse_integer_u64(value).with_context(|| {
                    format!("Invalid `retry_interval_ms` value on line {line_no}")
                })?);
            }
            "connect_timeout_secs" => {
                cfg.connect_timeout_secs = Some(parse_integer_u64(value).with_context(|| {
                    format!("Invalid `connect_timeout_secs` value on line {line_no}")
                })?);
            }
            "request_timeout_secs" => {
                cfg.request_timeout_secs = Some(parse_integer_u64(value).with_context(|| {
                    format!("Invalid `request_timeout_secs` value on line {line_no}")
                })?);
            }
            "resource_timeout_secs" => {
                cfg.resource_timeout_secs = Some(parse_integer_u64(value).with_context(|| {
                    format!("Invalid `resource_timeout_secs` value on line {line_no}")
                })?);
            }
            "cache_policy" => {
                let parsed = parse_string_literal(value)
                    .with_context(|| format!("Invalid `cache_policy` value on line {line_no}"))?;
                let Some(policy) = CachePolicy::from_label(&parsed) else {
                    bail!(
                        "Invalid `cache_policy` value '{parsed}' on line {line_no}: expected one of protocol, reload, cache-else-load, cache-only"
                    );
                };
                cfg.cache_policy = Some(policy);
            }
            "cookie_sync" => {
                cfg.cookie_sync = Some(
                    parse_boolean(value)
                        .with_context(|| format!("Invalid `cookie_sync` value on line {line_no}"))?,
                );
            }
            "merge_policy" => {
                let parsed = parse_string_literal(value)
                    .with_context(|| format!("Invalid `merge_policy` value on line {line_no}"))?;
                let policy = parsed
                    .parse::<CookieMergePolicy>()
                    .map_err(anyhow::Error::msg)
                    .with_context(|| format!("Invalid `merge_policy` value on line {line_no}"))?;
                cfg.merge_policy = Some(policy);
            }
            "cookie_suite" => {
                cfg.cookie_suite = Some(
                    parse_string_literal(value)
                        .with_context(|| format!("Invalid `cookie_suite` value on line {line_no}"))?,
                );
            }
            "max_concurrency" => {
                let parsed = parse_integer_u64(value).with_context(|| {
                    format!("Invalid `max_concurrency` value on line {line_no}")
                })?;
                let n = usize::try_from(parsed)
                    .map_err(|_| anyhow::anyhow!("max_concurrency out of range for usize"))?;
                cfg.max_concurrency = Some(n);
            }
            unknown => {
                bail!("Unknown configuration key: '{unknown}' on line {line_no}");
            }
        }
    }
    cfg.validate()?;
    Ok(cfg)
}

fn strip_inline_comment(line: &str) -> &str {
    let mut in_string = false;
    for (index, ch) in line.char_indices() {
        match ch {
            '"' => in_string = !in_string,
            '#' if !in_string => return &line[..index],
            _ => {}
        }
    }
    line
}

fn parse_string_literal(raw_value: &str) -> Result<String> {
    if raw_value.len() < 2 || !raw_value.starts_with('"') || !raw_value.ends_with('"') {
        bail!("Expected double-quoted string");
    }
    Ok(raw_value[1..raw_value.len() - 1].to_string())
}

fn parse_integer_u64(raw_value: &str) -> Result<u64> {
    let token = raw_value.trim();
    if token.is_empty() {
        bail!("Expected integer value");
    }
    let value = token.parse::<i128>()?;
    if value < 0 {
        bail!("Expected non-negative integer");
    }
    u64::try_from(value).map_err(|_| anyhow::anyhow!("Integer value out of range for u64"))
}

fn parse_boolean(raw_value: &str) -> Result<bool> {
    match raw_value.trim() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => bail!("Expected 'true' or 'false'"),
    }
}
