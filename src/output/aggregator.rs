//! In-memory result aggregation
//!
//! Collects the results of one crawl and turns them into a [`CrawlSummary`].

use super::traits::{CrawlSummary, FailedLink, OutputHandler, OutputResult};
use crate::crawler::{CrawlEvent, LinkResult, LinkType};
use crate::state::CrawlState;
use chrono::{DateTime, Utc};
use std::collections::HashSet;

/// Accumulates every result of a crawl
#[derive(Debug, Clone)]
pub struct ResultAggregator {
    results: Vec<LinkResult>,
    visited: Option<usize>,
    fatal_error: Option<String>,
    started_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
    state: CrawlState,
}

impl Default for ResultAggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultAggregator {
    pub fn new() -> Self {
        Self {
            results: Vec::new(),
            visited: None,
            fatal_error: None,
            started_at: Utc::now(),
            finished_at: None,
            state: CrawlState::Running,
        }
    }

    /// Results recorded so far, in emission order
    pub fn results(&self) -> &[LinkResult] {
        &self.results
    }

    /// Builds the summary of everything recorded so far
    pub fn summary(&self) -> CrawlSummary {
        let mut summary = CrawlSummary {
            started_at: self.started_at.to_rfc3339(),
            finished_at: self.finished_at.map(|t| t.to_rfc3339()),
            duration_seconds: self
                .finished_at
                .map(|t| (t - self.started_at).num_seconds().max(0) as u64),
            status: self.state.to_string(),
            total_links: self.results.len() as u64,
            fatal_error: self.fatal_error.clone(),
            ..CrawlSummary::default()
        };

        for result in &self.results {
            match result.status {
                0 => summary.links_failed += 1,
                200..=299 => summary.links_ok += 1,
                400..=499 => summary.links_client_error += 1,
                500..=599 => summary.links_server_error += 1,
                _ => {}
            }
            if result.was_redirected() {
                summary.links_redirected += 1;
            }

            match result.link_type {
                LinkType::Internal => summary.links_internal += 1,
                LinkType::External => summary.links_external += 1,
                LinkType::Unknown => summary.links_unknown += 1,
            }

            if let Some(message) = &result.error {
                summary.failures.push(FailedLink {
                    source_url: result.source_url.clone(),
                    target_url: result.target_url.clone(),
                    status: result.status,
                    message: message.clone(),
                });
            }
        }

        // Without a `done` event, count the distinct pages results came from
        summary.pages_visited = match self.visited {
            Some(visited) => visited as u64,
            None => self
                .results
                .iter()
                .map(|r| r.source_url.as_str())
                .collect::<HashSet<_>>()
                .len() as u64,
        };

        summary
    }
}

impl OutputHandler for ResultAggregator {
    fn record_event(&mut self, event: &CrawlEvent) -> OutputResult<()> {
        match event {
            CrawlEvent::Result(result) => self.results.push(result.clone()),
            CrawlEvent::Done { visited, .. } => self.visited = Some(*visited),
            CrawlEvent::Error { message } => self.fatal_error = Some(message.clone()),
            CrawlEvent::Log { .. } | CrawlEvent::Progress { .. } => {}
        }
        Ok(())
    }

    fn finalize(&mut self, state: CrawlState) -> OutputResult<()> {
        self.state = state;
        self.finished_at = Some(Utc::now());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::RedirectStep;

    fn result(target: &str, status: u16, link_type: LinkType) -> LinkResult {
        LinkResult {
            source_url: "https://example.com/".to_string(),
            target_url: target.to_string(),
            status,
            redirect_chain: vec![RedirectStep {
                url: target.to_string(),
                status,
            }],
            link_type,
            anchor_text: String::new(),
            rel: Vec::new(),
            depth: 0,
            error: if status == 0 || status >= 400 {
                Some("broken".to_string())
            } else {
                None
            },
            retry_count: 0,
        }
    }

    #[test]
    fn test_summary_counts() {
        let mut aggregator = ResultAggregator::new();
        let mut redirected = result("https://example.com/moved", 200, LinkType::Internal);
        redirected.redirect_chain.insert(
            0,
            RedirectStep {
                url: "https://example.com/old".to_string(),
                status: 301,
            },
        );

        for event in [
            CrawlEvent::Result(result("https://example.com/a", 200, LinkType::Internal)),
            CrawlEvent::Result(redirected),
            CrawlEvent::Result(result("https://other.org/", 404, LinkType::External)),
            CrawlEvent::Result(result("https://other.org/x", 502, LinkType::External)),
            CrawlEvent::Result(result("https://example.com/", 0, LinkType::Unknown)),
            CrawlEvent::Done {
                total_links: 5,
                visited: 3,
            },
        ] {
            aggregator.record_event(&event).unwrap();
        }
        aggregator.finalize(CrawlState::Completed).unwrap();

        let summary = aggregator.summary();
        assert_eq!(summary.total_links, 5);
        assert_eq!(summary.links_ok, 2);
        assert_eq!(summary.links_redirected, 1);
        assert_eq!(summary.links_client_error, 1);
        assert_eq!(summary.links_server_error, 1);
        assert_eq!(summary.links_failed, 1);
        assert_eq!(summary.links_internal, 2);
        assert_eq!(summary.links_external, 2);
        assert_eq!(summary.links_unknown, 1);
        assert_eq!(summary.pages_visited, 3);
        assert_eq!(summary.failures.len(), 3);
        assert_eq!(summary.status, "completed");
        assert!(summary.finished_at.is_some());
    }

    #[test]
    fn test_pages_visited_without_done() {
        let mut aggregator = ResultAggregator::new();
        let mut other_page = result("https://example.com/b", 200, LinkType::Internal);
        other_page.source_url = "https://example.com/a".to_string();

        aggregator
            .record_event(&CrawlEvent::Result(result(
                "https://example.com/a",
                200,
                LinkType::Internal,
            )))
            .unwrap();
        aggregator
            .record_event(&CrawlEvent::Result(other_page))
            .unwrap();
        aggregator.finalize(CrawlState::Cancelled).unwrap();

        let summary = aggregator.summary();
        assert_eq!(summary.pages_visited, 2);
        assert_eq!(summary.status, "cancelled");
    }

    #[test]
    fn test_error_event_recorded() {
        let mut aggregator = ResultAggregator::new();
        aggregator
            .record_event(&CrawlEvent::error("at least one seed URL is required"))
            .unwrap();
        aggregator.finalize(CrawlState::Failed).unwrap();

        let summary = aggregator.summary();
        assert_eq!(
            summary.fatal_error.as_deref(),
            Some("at least one seed URL is required")
        );
        assert_eq!(summary.total_links, 0);
    }
}
