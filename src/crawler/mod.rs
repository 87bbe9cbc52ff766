//! Crawler module for link discovery and checking
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with retry logic
//! - HTML and sitemap link extraction
//! - Redirect chain resolution
//! - Frontier scheduling, filtering and rate limiting
//! - Overall crawl coordination and the event stream

mod coordinator;
mod events;
mod fetcher;
mod filters;
mod parser;
mod redirect;
mod scheduler;

pub use coordinator::Crawler;
pub use events::{
    format_redirect_chain, Cancelled, CrawlEvent, CrawlStream, EventSink, LinkResult, LinkType,
    LogKind, RedirectStep,
};
pub use fetcher::{
    build_http_client, fetch_document, gated_redirect_policy, retry_delay, FetchError,
    FetchFailure, FetchedDocument, RequestSettings, Transport,
};
pub use filters::{parse_path_prefixes, FilterSet, UrlFilter};
pub use parser::{extract_links, is_sitemap, DiscoveredLink, MAX_ANCHOR_TEXT_CHARS};
pub use redirect::{resolve_redirects, RedirectResolution, MAX_REDIRECT_HOPS};
pub use scheduler::{Frontier, FrontierItem, RateLimiter};
