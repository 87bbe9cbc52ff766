//! Configuration module for Ripple-Links
//!
//! This module handles loading, parsing, and validating TOML configuration files
//! and the crawl requests they carry.
//!
//! # Example
//!
//! ```no_run
//! use ripple_links::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("crawl.toml")).unwrap();
//! println!("Crawler will use max depth: {}", config.crawl.max_depth);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, CrawlRequest, CrawlSettings, GateConfig, UserAgentConfig, MAX_FILTER_LENGTH,
    MAX_RETRIES, MAX_TIMEOUT_SECS, MIN_TIMEOUT_SECS,
};

// Re-export parser functions
pub use parser::{config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::{validate, validate_request};
