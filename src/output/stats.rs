//! Human-readable crawl summaries
//!
//! Events go to stdout, so summaries are written to stderr by default.

use super::traits::CrawlSummary;
use std::io::{self, Write};

/// How many failing links are listed before the rest are elided
const MAX_LISTED_FAILURES: usize = 20;

/// Prints a summary to stderr in a formatted manner
///
/// # Arguments
///
/// * `summary` - The summary to display
pub fn print_summary(summary: &CrawlSummary) -> io::Result<()> {
    let stderr = io::stderr();
    let mut out = stderr.lock();
    write_summary(summary, &mut out)
}

/// Writes a formatted summary to any writer
pub fn write_summary<W: Write>(summary: &CrawlSummary, out: &mut W) -> io::Result<()> {
    writeln!(out, "=== Crawl Summary ===\n")?;

    writeln!(out, "Run:")?;
    writeln!(out, "  Status: {}", summary.status)?;
    writeln!(out, "  Started: {}", summary.started_at)?;
    if let Some(finished) = &summary.finished_at {
        writeln!(out, "  Finished: {}", finished)?;
    }
    if let Some(seconds) = summary.duration_seconds {
        writeln!(out, "  Duration: {}s", seconds)?;
    }
    writeln!(out)?;

    writeln!(out, "Overview:")?;
    writeln!(out, "  Pages visited: {}", summary.pages_visited)?;
    writeln!(out, "  Links checked: {}", summary.total_links)?;
    writeln!(out)?;

    writeln!(out, "Links by Status:")?;
    for (label, count) in [
        ("OK (2xx)", summary.links_ok),
        ("Client error (4xx)", summary.links_client_error),
        ("Server error (5xx)", summary.links_server_error),
        ("Failed", summary.links_failed),
    ] {
        let percentage = if summary.total_links > 0 {
            (count as f64 / summary.total_links as f64) * 100.0
        } else {
            0.0
        };
        writeln!(out, "  {}: {} ({:.1}%)", label, count, percentage)?;
    }
    writeln!(out, "  Redirected: {}", summary.links_redirected)?;
    writeln!(out)?;

    writeln!(out, "Links by Type:")?;
    writeln!(out, "  Internal: {}", summary.links_internal)?;
    writeln!(out, "  External: {}", summary.links_external)?;
    writeln!(out, "  Unknown: {}", summary.links_unknown)?;
    writeln!(out)?;

    if !summary.failures.is_empty() {
        writeln!(out, "Broken Links ({}):", summary.failures.len())?;
        for failure in summary.failures.iter().take(MAX_LISTED_FAILURES) {
            writeln!(
                out,
                "  - {} [{}] on {}: {}",
                failure.target_url, failure.status, failure.source_url, failure.message
            )?;
        }
        if summary.failures.len() > MAX_LISTED_FAILURES {
            writeln!(
                out,
                "  ... and {} more",
                summary.failures.len() - MAX_LISTED_FAILURES
            )?;
        }
        writeln!(out)?;
    }

    if let Some(error) = &summary.fatal_error {
        writeln!(out, "Crawl error: {}", error)?;
        writeln!(out)?;
    }

    writeln!(
        out,
        "Success Rate: {:.1}% ({} / {} links resolved)",
        summary.success_rate(),
        summary.links_ok,
        summary.total_links
    )?;
    writeln!(
        out,
        "Error Rate: {:.1}% ({} / {} links without a 2xx status)",
        summary.error_rate(),
        summary.total_errors(),
        summary.total_links
    )
}
