//! CLI entry point for the fetcher tool.

use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use fetcher_core::{Fetcher, FetcherConfig};
use tracing::{debug, info};

mod app_config;
mod cli;
mod commands;

use app_config::load_default_file_config;
use cli::{Args, Command, CookiesCommand, GetArgs};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    debug!(?args, "CLI arguments parsed");

    let Some(command) = args.command else {
        info!("No command given. Run `fetcher get <URL>...` or `fetcher cookies list`.");
        return Ok(());
    };

    let loaded = load_default_file_config()?;
    let mut config = FetcherConfig::default();
    if let Some(file_config) = &loaded.config {
        file_config.apply_to(&mut config);
    }
    debug!(
        path = ?loaded.path,
        loaded_from_file = loaded.loaded_from_file,
        "Resolved configuration"
    );

    match command {
        Command::Get(get) => {
            apply_get_overrides(&get, &mut config);
            let fetcher = Fetcher::new(config)?;
            info!(urls = get.urls.len(), "Fetcher starting");
            commands::run_get_command(&fetcher, &get.urls, get.exit_early, !get.no_cookies).await
        }
        Command::Cookies(CookiesCommand::List { url }) => {
            commands::run_cookies_list_command(&config, url.as_deref())
        }
        Command::Cookies(CookiesCommand::Prune) => commands::run_cookies_prune_command(&config),
        Command::Cookies(CookiesCommand::Clear) => commands::run_cookies_clear_command(&config),
    }
}

fn apply_get_overrides(get: &GetArgs, config: &mut FetcherConfig) {
    if let Some(max_retries) = get.max_retries {
        config.max_retries = max_retries;
    }
    if let Some(interval) = get.retry_interval_ms {
        config.retry_interval = Duration::from_millis(interval);
    }
    if let Some(concurrency) = get.concurrency {
        // clap bounds this to 1..=100
        config.max_concurrency = usize::try_from(concurrency).ok();
    }
}
