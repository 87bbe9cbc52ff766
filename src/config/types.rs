use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Hard cap on the length of a URL filter expression
pub const MAX_FILTER_LENGTH: usize = 200;

/// Bounds applied to per-request timeouts (seconds)
pub const MIN_TIMEOUT_SECS: u64 = 1;
pub const MAX_TIMEOUT_SECS: u64 = 120;

/// Upper bound on retry attempts after the first request
pub const MAX_RETRIES: u32 = 5;

/// Main configuration structure for Ripple-Links
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub crawl: CrawlRequest,
    #[serde(default)]
    pub gate: GateConfig,
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

impl UserAgentConfig {
    /// Formats the User-Agent header value: `Name/Version (+ContactURL; ContactEmail)`
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}

/// Outbound gate configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GateConfig {
    /// Allow requests to loopback, private and link-local destinations
    #[serde(rename = "allow-private", default)]
    pub allow_private: bool,
}

/// A single crawl invocation
///
/// Mirrors the wire-level crawl request: filters arrive as raw strings and are
/// compiled into a [`FilterSet`](crate::crawler::FilterSet) when the crawl starts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CrawlRequest {
    /// Seed URLs
    pub urls: Vec<String>,

    /// Follow internal links breadth-first
    #[serde(default)]
    pub recursive: bool,

    /// Maximum number of link results emitted
    #[serde(default = "default_max_urls")]
    pub max_urls: usize,

    /// Maximum depth of a fetched page (seeds are depth 0)
    #[serde(default = "default_max_depth")]
    pub max_depth: u32,

    /// Requests per second
    #[serde(default = "default_rate_limit")]
    pub rate_limit: f64,

    /// Only enqueue links whose host is one of the seed hosts
    #[serde(default = "default_true")]
    pub same_domain_only: bool,

    /// Regular expression every crawled and reported URL must match
    #[serde(default)]
    pub url_filter: String,

    /// Comma-separated path prefixes; when non-empty a URL path must start with one
    #[serde(default)]
    pub path_include: String,

    /// Comma-separated path prefixes a URL path must not start with
    #[serde(default)]
    pub path_exclude: String,

    #[serde(default)]
    pub settings: CrawlSettings,
}

/// Per-request network settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlSettings {
    /// Per-attempt timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Retries after the first attempt
    #[serde(default = "default_retries")]
    pub retries: u32,

    /// Extra request headers
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

impl Default for CrawlSettings {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            retries: default_retries(),
            headers: BTreeMap::new(),
        }
    }
}

impl CrawlSettings {
    /// Returns a copy with timeout and retries clamped into their legal ranges
    pub fn clamped(&self) -> Self {
        Self {
            timeout: self.timeout.clamp(MIN_TIMEOUT_SECS, MAX_TIMEOUT_SECS),
            retries: self.retries.min(MAX_RETRIES),
            headers: self.headers.clone(),
        }
    }
}

impl CrawlRequest {
    /// Creates a request for the given seeds with default budgets
    pub fn new<I, S>(urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            urls: urls.into_iter().map(Into::into).collect(),
            recursive: false,
            max_urls: default_max_urls(),
            max_depth: default_max_depth(),
            rate_limit: default_rate_limit(),
            same_domain_only: true,
            url_filter: String::new(),
            path_include: String::new(),
            path_exclude: String::new(),
            settings: CrawlSettings::default(),
        }
    }
}

fn default_max_urls() -> usize {
    100
}

fn default_max_depth() -> u32 {
    1
}

fn default_rate_limit() -> f64 {
    1.0
}

fn default_true() -> bool {
    true
}

fn default_timeout() -> u64 {
    10
}

fn default_retries() -> u32 {
    2
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_clamped() {
        let settings = CrawlSettings {
            timeout: 500,
            retries: 9,
            headers: BTreeMap::new(),
        };
        let clamped = settings.clamped();
        assert_eq!(clamped.timeout, 120);
        assert_eq!(clamped.retries, 5);

        let settings = CrawlSettings {
            timeout: 0,
            retries: 0,
            headers: BTreeMap::new(),
        };
        assert_eq!(settings.clamped().timeout, 1);
    }

    #[test]
    fn test_request_defaults() {
        let request: CrawlRequest = toml::from_str(r#"urls = ["https://example.com/"]"#).unwrap();
        assert!(!request.recursive);
        assert_eq!(request.max_urls, 100);
        assert_eq!(request.max_depth, 1);
        assert!(request.same_domain_only);
        assert_eq!(request.settings.timeout, 10);
        assert_eq!(request.settings.retries, 2);
    }

    #[test]
    fn test_user_agent_header_value() {
        let ua = UserAgentConfig {
            crawler_name: "RippleLinks".to_string(),
            crawler_version: "1.0".to_string(),
            contact_url: "https://example.com/about".to_string(),
            contact_email: "admin@example.com".to_string(),
        };
        assert_eq!(
            ua.header_value(),
            "RippleLinks/1.0 (+https://example.com/about; admin@example.com)"
        );
    }
}
