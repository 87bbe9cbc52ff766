//! Output handler traits and types
//!
//! This module defines the trait interface for output handlers and
//! associated data structures for crawl summaries.

use crate::crawler::CrawlEvent;
use crate::state::CrawlState;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to format output: {0}")]
    Format(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// A link that could not be resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedLink {
    pub source_url: String,
    pub target_url: String,
    pub status: u16,
    pub message: String,
}

/// Summary statistics for a crawl
#[derive(Debug, Clone, Default)]
pub struct CrawlSummary {
    // Run metadata
    pub started_at: String,
    pub finished_at: Option<String>,
    pub duration_seconds: Option<u64>,
    pub status: String,

    // Overall statistics
    pub total_links: u64,
    pub pages_visited: u64,

    // Status breakdown
    pub links_ok: u64,
    pub links_redirected: u64,
    pub links_client_error: u64,
    pub links_server_error: u64,
    pub links_failed: u64,

    // Type breakdown
    pub links_internal: u64,
    pub links_external: u64,
    pub links_unknown: u64,

    // Every result that carried an error, in emission order
    pub failures: Vec<FailedLink>,

    // Stream-level error, if the crawl failed
    pub fatal_error: Option<String>,
}

impl CrawlSummary {
    /// Creates a new empty crawl summary
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of links that did not resolve to a 2xx status
    pub fn total_errors(&self) -> u64 {
        self.total_links - self.links_ok
    }

    /// Returns the success rate as a percentage
    pub fn success_rate(&self) -> f64 {
        if self.total_links == 0 {
            return 0.0;
        }
        (self.links_ok as f64 / self.total_links as f64) * 100.0
    }

    /// Returns the error rate as a percentage
    pub fn error_rate(&self) -> f64 {
        if self.total_links == 0 {
            return 0.0;
        }
        (self.total_errors() as f64 / self.total_links as f64) * 100.0
    }
}

/// Trait for output handlers
///
/// Output handlers receive every event of a crawl in emission order, then
/// a single `finalize` call once the crawl has settled.
pub trait OutputHandler {
    /// Records one crawl event
    ///
    /// # Arguments
    ///
    /// * `event` - The event, exactly as emitted
    fn record_event(&mut self, event: &CrawlEvent) -> OutputResult<()>;

    /// Finalizes the output, performing any cleanup or final writes
    ///
    /// # Arguments
    ///
    /// * `state` - The terminal state of the crawl
    fn finalize(&mut self, state: CrawlState) -> OutputResult<()>;
}
