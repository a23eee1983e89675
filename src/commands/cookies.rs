//! Cookie jar commands: list, prune, and clear persisted cookies.

use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use fetcher_core::cookies::{Cookie, CookieBridge, FileStore};
use fetcher_core::FetcherConfig;
use tracing::info;
use url::Url;

/// Prints stored cookies without their values.
pub fn run_cookies_list_command(config: &FetcherConfig, url: Option<&str>) -> Result<()> {
    let bridge = open_bridge(config)?;
    let cookies = match url {
        Some(raw) => {
            let url = Url::parse(raw).with_context(|| format!("Invalid URL '{raw}'"))?;
            bridge.cookies_for_url(&url)
        }
        None => bridge.all_cookies(),
    };

    if cookies.is_empty() {
        info!("No stored cookies found");
        return Ok(());
    }

    for cookie in &cookies {
        println!("{}", render_cookie_row(cookie));
    }
    info!(count = cookies.len(), "Listed stored cookies");
    Ok(())
}

/// Removes expired cookies from both stores.
pub fn run_cookies_prune_command(config: &FetcherConfig) -> Result<()> {
    let bridge = bridge_without_startup(config)?;
    let stats = bridge.prune_expired();
    info!(
        session_removed = stats.session_removed,
        persisted_removed = stats.persisted_removed,
        "Pruned expired cookies"
    );
    println!("Removed {} expired cookies", stats.persisted_removed);
    Ok(())
}

/// Deletes every cookie from both stores.
pub fn run_cookies_clear_command(config: &FetcherConfig) -> Result<()> {
    let bridge = bridge_without_startup(config)?;
    bridge.delete_all();
    info!(suite = %config.cookie_suite, "Cleared stored cookies");
    Ok(())
}

fn open_store(config: &FetcherConfig) -> Result<Arc<FileStore>> {
    let store = FileStore::for_suite(&config.cookie_suite)
        .map_err(|error| anyhow!("Failed to resolve cookie storage path: {error}"))?;
    Ok(Arc::new(store))
}

fn open_bridge(config: &FetcherConfig) -> Result<Arc<CookieBridge>> {
    Ok(CookieBridge::open(open_store(config)?, config.cookie_bridge_config()))
}

// Skips the startup prune so maintenance commands report their own counts.
fn bridge_without_startup(config: &FetcherConfig) -> Result<CookieBridge> {
    Ok(CookieBridge::new(open_store(config)?, config.cookie_bridge_config()))
}

fn render_cookie_row(cookie: &Cookie) -> String {
    let expires = cookie
        .expires
        .map_or_else(|| "session".to_string(), |secs| secs.to_string());
    let mut flags = Vec::new();
    if cookie.secure {
        flags.push("secure");
    }
    if cookie.http_only {
        flags.push("httponly");
    }
    if cookie.host_only {
        flags.push("hostonly");
    }
    format!(
        "{}\t{}\t{}\texpires={}\t{}",
        cookie.domain,
        cookie.path,
        cookie.name,
        expires,
        flags.join(",")
    )
}
