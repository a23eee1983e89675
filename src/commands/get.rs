//! `get` command: fetch URLs as one batch and print bodies in input order.

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use fetcher_core::{Decoder, Fetcher, RequestDescriptor};
use tracing::{debug, error, info};

/// Fetches `urls` through `fetcher` and writes each body to stdout.
pub async fn run_get_command(
    fetcher: &Fetcher,
    urls: &[String],
    exit_early: bool,
    use_cookies: bool,
) -> Result<()> {
    let descriptors = urls
        .iter()
        .map(|url| {
            RequestDescriptor::get(url.as_str())
                .include_cookies(use_cookies)
                .save_response_cookies(use_cookies)
                .build()
                .with_context(|| format!("Invalid request for '{url}'"))
        })
        .collect::<Result<Vec<_>>>()?;

    debug!(count = descriptors.len(), exit_early, use_cookies, "Built request descriptors");

    let report = fetcher
        .scheduler()
        .start_batch_report_with_decoder(
            descriptors,
            text_decoder(),
            fetcher.batch_options(exit_early),
        )
        .await?;

    for (index, result) in report.results.iter().enumerate() {
        match result {
            Ok(body) => println!("{body}"),
            Err(err) if report.aborted_at.is_some() && err.is_unknown() => {
                debug!(index, url = %urls[index], "Request not completed before abort");
            }
            Err(err) => error!(index, url = %urls[index], error = %err, "Request failed"),
        }
    }

    let stats = &report.stats;
    info!(
        completed = stats.completed(),
        failed = stats.failed(),
        retried = stats.retried(),
        cancelled = stats.cancelled(),
        total = stats.total(),
        "Fetch complete"
    );

    if let Some(index) = report.aborted_at {
        bail!("Batch aborted: request for '{}' failed", urls[index]);
    }
    if stats.failed() > 0 {
        bail!("{} of {} requests failed", stats.failed(), urls.len());
    }
    Ok(())
}

fn text_decoder() -> Decoder<String> {
    Arc::new(|bytes: &[u8]| Ok::<_, serde_json::Error>(String::from_utf8_lossy(bytes).into_owned()))
}
