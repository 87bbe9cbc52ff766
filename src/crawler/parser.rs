//! Link extraction from fetched documents
//!
//! This module handles two document kinds:
//! - HTML pages: every `<a href>` with its anchor text and `rel` tokens
//! - XML sitemaps (`<urlset>` / `<sitemapindex>`): every `<loc>` entry
//!
//! Extraction never fails; unparseable or unsupported targets are skipped.

use super::events::LinkType;
use crate::url::{normalize_url, same_host};
use quick_xml::events::Event;
use quick_xml::Reader;
use scraper::{Html, Selector};
use std::collections::HashSet;
use tracing::{debug, warn};
use url::Url;

/// Anchor text longer than this is truncated
pub const MAX_ANCHOR_TEXT_CHARS: usize = 200;

/// A link found on a page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredLink {
    /// Absolute, normalized target
    pub url: Url,

    /// Collapsed visible text of the anchor
    pub anchor_text: String,

    /// Lowercased `rel` tokens
    pub rel: Vec<String>,

    pub link_type: LinkType,
}

/// Extracts links from a document body
///
/// Sitemaps are detected from the body itself, independent of the
/// Content-Type header. Each target appears at most once per document, in
/// first-seen order.
///
/// # Example
///
/// ```no_run
/// use ripple_links::crawler::extract_links;
/// use url::Url;
///
/// let html = r#"<a href="/about">About us</a>"#;
/// let source = Url::parse("https://example.com/").unwrap();
/// let links = extract_links(html, &source);
/// assert_eq!(links[0].url.as_str(), "https://example.com/about");
/// ```
pub fn extract_links(body: &str, source: &Url) -> Vec<DiscoveredLink> {
    if is_sitemap(body) {
        extract_sitemap_links(body, source)
    } else {
        extract_html_links(body, source)
    }
}

/// Returns true if the body looks like an XML sitemap or sitemap index
pub fn is_sitemap(body: &str) -> bool {
    let head = body.trim_start_matches('\u{feff}').trim_start();
    let has_root = |s: &str| s.contains("<urlset") || s.contains("<sitemapindex");

    if head.starts_with("<?xml") {
        has_root(head)
    } else {
        head.starts_with("<urlset") || head.starts_with("<sitemapindex")
    }
}

fn extract_html_links(body: &str, source: &Url) -> Vec<DiscoveredLink> {
    let document = Html::parse_document(body);
    let Ok(selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for element in document.select(&selector) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        if is_skipped_href(href) {
            continue;
        }

        let url = match normalize_url(href, Some(source)) {
            Ok(url) => url,
            Err(e) => {
                debug!("Skipping link {:?} on {}: {}", href, source, e);
                continue;
            }
        };

        if !seen.insert(url.to_string()) {
            continue;
        }

        let text = element.text().collect::<Vec<_>>().join(" ");
        let rel = element
            .value()
            .attr("rel")
            .map(parse_rel)
            .unwrap_or_default();

        links.push(DiscoveredLink {
            link_type: classify(&url, source),
            anchor_text: collapse_text(&text),
            rel,
            url,
        });
    }

    links
}

fn extract_sitemap_links(body: &str, source: &Url) -> Vec<DiscoveredLink> {
    let mut reader = Reader::from_str(body);
    reader.trim_text(true);

    let mut seen = HashSet::new();
    let mut links = Vec::new();
    let mut current: Option<String> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"loc" => {
                current = Some(String::new());
            }
            Ok(Event::Text(t)) => {
                if let Some(buf) = current.as_mut() {
                    match t.unescape() {
                        Ok(text) => buf.push_str(&text),
                        Err(e) => debug!("Bad text in sitemap {}: {}", source, e),
                    }
                }
            }
            Ok(Event::CData(c)) => {
                if let Some(buf) = current.as_mut() {
                    buf.push_str(&String::from_utf8_lossy(&c.into_inner()));
                }
            }
            Ok(Event::End(e)) if e.local_name().as_ref() == b"loc" => {
                let Some(loc) = current.take() else {
                    continue;
                };
                match normalize_url(&loc, Some(source)) {
                    Ok(url) => {
                        if seen.insert(url.to_string()) {
                            links.push(DiscoveredLink {
                                link_type: classify(&url, source),
                                anchor_text: String::new(),
                                rel: Vec::new(),
                                url,
                            });
                        }
                    }
                    Err(e) => debug!("Skipping sitemap entry {:?}: {}", loc, e),
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                warn!(
                    "Sitemap {} is malformed at byte {}: {}",
                    source,
                    reader.buffer_position(),
                    e
                );
                break;
            }
            _ => {}
        }
    }

    links
}

/// Hrefs that never name a fetchable resource
fn is_skipped_href(href: &str) -> bool {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return true;
    }

    let lower = href.to_ascii_lowercase();
    ["javascript:", "mailto:", "tel:", "data:"]
        .iter()
        .any(|scheme| lower.starts_with(scheme))
}

fn classify(url: &Url, source: &Url) -> LinkType {
    if same_host(url, source) {
        LinkType::Internal
    } else {
        LinkType::External
    }
}

fn collapse_text(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .take(MAX_ANCHOR_TEXT_CHARS)
        .collect()
}

fn parse_rel(raw: &str) -> Vec<String> {
    let mut tokens: Vec<String> = Vec::new();
    for token in raw.split_whitespace() {
        let token = token.to_ascii_lowercase();
        if !tokens.contains(&token) {
            tokens.push(token);
        }
    }
    tokens
}
