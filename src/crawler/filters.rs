//! URL filters applied to frontier items and discovered links
//!
//! A [`FilterSet`] is built once per crawl and never changes while the crawl
//! runs. Bad filter input degrades to "no filter" instead of failing the
//! crawl; the reason is kept so the engine can report it.

use crate::config::{CrawlRequest, MAX_FILTER_LENGTH};
use crate::url::extract_domain;
use regex::{Regex, RegexBuilder};
use std::collections::HashSet;
use tracing::warn;
use url::Url;

/// Compiled size cap for user-supplied patterns
const REGEX_SIZE_LIMIT: usize = 1 << 20;

/// A user-supplied regular expression over full URLs
#[derive(Debug, Clone)]
pub enum UrlFilter {
    /// No pattern was supplied
    None,

    /// A compiled pattern
    Pattern(Regex),

    /// A pattern was supplied but could not be used
    Rejected { reason: String },
}

impl UrlFilter {
    /// Compiles a raw pattern
    ///
    /// Patterns longer than [`MAX_FILTER_LENGTH`] characters or that fail to
    /// compile are rejected.
    pub fn parse(raw: &str) -> Self {
        if raw.is_empty() {
            return Self::None;
        }

        if raw.chars().count() > MAX_FILTER_LENGTH {
            return Self::Rejected {
                reason: format!("pattern exceeds {} characters", MAX_FILTER_LENGTH),
            };
        }

        match RegexBuilder::new(raw).size_limit(REGEX_SIZE_LIMIT).build() {
            Ok(regex) => Self::Pattern(regex),
            Err(e) => Self::Rejected {
                reason: format!("invalid pattern: {}", e),
            },
        }
    }

    /// Returns true if the URL passes; an absent or rejected pattern passes everything
    pub fn matches(&self, url: &str) -> bool {
        match self {
            Self::Pattern(regex) => regex.is_match(url),
            Self::None | Self::Rejected { .. } => true,
        }
    }
}

/// Splits a comma-separated prefix list
///
/// Entries are trimmed, empties dropped, and a leading `/` is added where it
/// is missing.
pub fn parse_path_prefixes(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            if s.starts_with('/') {
                s.to_string()
            } else {
                format!("/{}", s)
            }
        })
        .collect()
}

/// Every filter a crawl applies, fixed at crawl start
#[derive(Debug, Clone)]
pub struct FilterSet {
    url_filter: UrlFilter,
    path_include: Vec<String>,
    path_exclude: Vec<String>,
    same_domain_only: bool,
    base_domains: HashSet<String>,
}

impl FilterSet {
    /// Builds the filters for a request
    ///
    /// `base_domains` are the hosts of the accepted seeds.
    pub fn new(request: &CrawlRequest, base_domains: HashSet<String>) -> Self {
        let url_filter = UrlFilter::parse(&request.url_filter);
        if let UrlFilter::Rejected { reason } = &url_filter {
            warn!("Ignoring URL filter: {}", reason);
        }

        Self {
            url_filter,
            path_include: parse_path_prefixes(&request.path_include),
            path_exclude: parse_path_prefixes(&request.path_exclude),
            same_domain_only: request.same_domain_only,
            base_domains,
        }
    }

    /// Reason the URL filter was ignored, if it was
    pub fn rejected_filter(&self) -> Option<&str> {
        match &self.url_filter {
            UrlFilter::Rejected { reason } => Some(reason),
            _ => None,
        }
    }

    /// Checks the URL filter and path prefixes
    ///
    /// A URL passes when it matches the pattern, its path starts with at least
    /// one include prefix (if any are set), and it starts with no exclude
    /// prefix.
    pub fn allows(&self, url: &Url) -> bool {
        if !self.url_filter.matches(url.as_str()) {
            return false;
        }

        let path = url.path();
        if !self.path_include.is_empty()
            && !self.path_include.iter().any(|p| path.starts_with(p.as_str()))
        {
            return false;
        }

        !self.path_exclude.iter().any(|p| path.starts_with(p.as_str()))
    }

    /// Checks whether a URL may be enqueued under the same-domain rule
    pub fn allows_follow(&self, url: &Url) -> bool {
        if !self.same_domain_only {
            return true;
        }
        extract_domain(url).map_or(false, |domain| self.base_domains.contains(&domain))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(raw: &str) -> Url {
        Url::parse(raw).unwrap()
    }

    fn request() -> CrawlRequest {
        CrawlRequest::new(["https://example.com/"])
    }

    fn bases() -> HashSet<String> {
        ["example.com".to_string()].into_iter().collect()
    }

    #[test]
    fn test_url_filter_parse() {
        assert!(matches!(UrlFilter::parse(""), UrlFilter::None));
        assert!(matches!(UrlFilter::parse("/docs/"), UrlFilter::Pattern(_)));
        assert!(matches!(
            UrlFilter::parse("([unclosed"),
            UrlFilter::Rejected { .. }
        ));

        let long = "a".repeat(MAX_FILTER_LENGTH + 1);
        assert!(matches!(
            UrlFilter::parse(&long),
            UrlFilter::Rejected { .. }
        ));
        let at_limit = "a".repeat(MAX_FILTER_LENGTH);
        assert!(matches!(
            UrlFilter::parse(&at_limit),
            UrlFilter::Pattern(_)
        ));
    }

    #[test]
    fn test_rejected_filter_matches_everything() {
        let filter = UrlFilter::parse("(");
        assert!(filter.matches("https://example.com/anything"));
    }

    #[test]
    fn test_parse_path_prefixes() {
        assert_eq!(
            parse_path_prefixes(" /docs , blog,, ,/api/v1"),
            vec!["/docs", "/blog", "/api/v1"]
        );
        assert!(parse_path_prefixes("").is_empty());
        assert!(parse_path_prefixes(" , ").is_empty());
    }

    #[test]
    fn test_regex_filter() {
        let mut req = request();
        req.url_filter = r"/docs/".to_string();
        let filters = FilterSet::new(&req, bases());

        assert!(filters.allows(&url("https://example.com/docs/intro")));
        assert!(!filters.allows(&url("https://example.com/blog/post")));
        assert!(filters.rejected_filter().is_none());
    }

    #[test]
    fn test_invalid_regex_is_reported_and_ignored() {
        let mut req = request();
        req.url_filter = "[".to_string();
        let filters = FilterSet::new(&req, bases());

        assert!(filters.rejected_filter().is_some());
        assert!(filters.allows(&url("https://example.com/blog/post")));
    }

    #[test]
    fn test_path_include_and_exclude() {
        let mut req = request();
        req.path_include = "/docs,/guide".to_string();
        req.path_exclude = "/docs/private".to_string();
        let filters = FilterSet::new(&req, bases());

        assert!(filters.allows(&url("https://example.com/docs/a")));
        assert!(filters.allows(&url("https://example.com/guide")));
        assert!(!filters.allows(&url("https://example.com/blog")));
        assert!(!filters.allows(&url("https://example.com/docs/private/x")));
    }

    #[test]
    fn test_same_domain_follow() {
        let filters = FilterSet::new(&request(), bases());
        assert!(filters.allows_follow(&url("https://example.com/a")));
        assert!(filters.allows_follow(&url("https://EXAMPLE.com:8443/a")));
        assert!(!filters.allows_follow(&url("https://blog.example.com/a")));

        let mut req = request();
        req.same_domain_only = false;
        let open = FilterSet::new(&req, bases());
        assert!(open.allows_follow(&url("https://other.org/")));
    }
}
