//! CLI argument definitions using clap derive macros.

use clap::{Parser, Subcommand};

/// Fetch URLs with retries and a persistent cookie jar.
///
/// Fetcher runs HTTP GET requests concurrently, retries failures at a fixed
/// interval, and keeps server-set cookies across runs.
#[derive(Parser, Debug)]
#[command(name = "fetcher")]
#[command(author, version, about)]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Fetch one or more URLs as a batch and print the bodies in input order
    Get(GetArgs),

    /// Inspect or maintain the persisted cookie jar
    #[command(subcommand)]
    Cookies(CookiesCommand),
}

/// Arguments for `fetcher get`.
#[derive(clap::Args, Debug)]
pub struct GetArgs {
    /// URLs to fetch
    #[arg(required = true)]
    pub urls: Vec<String>,

    /// Retries after the first attempt (0-10; overrides config file)
    #[arg(short = 'r', long, value_parser = clap::value_parser!(u32).range(0..=10))]
    pub max_retries: Option<u32>,

    /// Wait between attempts in milliseconds (0-60000; overrides config file)
    #[arg(long, value_parser = clap::value_parser!(u64).range(0..=60000))]
    pub retry_interval_ms: Option<u64>,

    /// Maximum concurrent requests (1-100; overrides config file)
    #[arg(short = 'c', long, value_parser = clap::value_parser!(u64).range(1..=100))]
    pub concurrency: Option<u64>,

    /// Stop the batch at the first failed request
    #[arg(long)]
    pub exit_early: bool,

    /// Do not send stored cookies or store cookies from responses
    #[arg(long)]
    pub no_cookies: bool,
}

/// `fetcher cookies` subcommands.
#[derive(Subcommand, Debug)]
pub enum CookiesCommand {
    /// List stored cookies (values are never printed)
    List {
        /// Only list cookies that would be sent to this URL
        #[arg(long)]
        url: Option<String>,
    },

    /// Delete expired cookies from the jar
    Prune,

    /// Delete every stored cookie
    Clear,
}
