//! Output module for recording crawl events and summaries
//!
//! This module handles:
//! - Streaming events as newline-delimited JSON
//! - Aggregating per-link results in memory
//! - Rendering a human-readable summary

mod aggregator;
mod jsonl;
pub mod stats;
mod traits;

pub use aggregator::ResultAggregator;
pub use jsonl::JsonLinesWriter;
pub use stats::{print_summary, write_summary};
pub use traits::{CrawlSummary, FailedLink, OutputError, OutputHandler, OutputResult};
