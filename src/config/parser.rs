//! Reading crawl configuration files
//!
//! A configuration file is read once; the same bytes are parsed, validated and
//! hashed.

use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Parses and validates configuration text
///
/// # Example
///
/// ```
/// use ripple_links::config::parse_config;
///
/// let config = parse_config(r#"
///     [user-agent]
///     crawler-name = "RippleLinks"
///     crawler-version = "1.0"
///     contact-url = "https://example.com/about"
///     contact-email = "admin@example.com"
///
///     [crawl]
///     urls = ["https://example.com/"]
/// "#).unwrap();
/// assert_eq!(config.crawl.max_urls, 100);
/// ```
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(content)?;
    validate(&config)?;
    Ok(config)
}

/// Loads, parses and validates a configuration file
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use ripple_links::config::load_config;
///
/// let config = load_config(Path::new("crawl.toml")).unwrap();
/// println!("Seeds: {}", config.crawl.urls.len());
/// ```
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    load_config_with_hash(path).map(|(config, _)| config)
}

/// Hex-encoded SHA-256 of configuration text
pub fn config_hash(content: &str) -> String {
    hex::encode(Sha256::digest(content.as_bytes()))
}

/// Loads a configuration and returns both the config and the hash of the
/// bytes it was parsed from
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config = parse_config(&content)?;
    Ok((config, config_hash(&content)))
}
