//! State module for tracking crawl progress
//!
//! - `CrawlState`: lifecycle of one crawl invocation (idle, running, and its
//!   terminal outcomes)

mod crawl_state;

pub use crawl_state::CrawlState;
