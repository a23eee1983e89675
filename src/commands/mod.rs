//! CLI command handlers.

mod cookies;
mod get;

pub use cookies::{run_cookies_clear_command, run_cookies_list_command, run_cookies_prune_command};
pub use get::run_get_command;
