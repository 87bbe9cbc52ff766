//! Scheduler for managing the crawl frontier and request pacing
//!
//! This module handles:
//! - FIFO frontier management (breadth-first order)
//! - The visited set that makes every URL enqueue at most once
//! - Pacing between page fetches and between link probes
//!
//! Nothing here sleeps: the coordinator owns the clock so that every wait can
//! be interrupted by cancellation.

use std::collections::{HashSet, VecDeque};
use std::time::Duration;
use url::Url;

/// Longest pause between fetches, however low the configured rate
const MAX_INTERVAL: Duration = Duration::from_secs(3600);

/// A URL queued for fetching
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontierItem {
    /// Normalized URL to fetch
    pub url: Url,

    /// Distance from the nearest seed
    pub depth: u32,

    /// Page the URL was discovered on; `None` for seeds
    pub source_url: Option<String>,
}

impl FrontierItem {
    pub fn seed(url: Url) -> Self {
        Self {
            url,
            depth: 0,
            source_url: None,
        }
    }
}

/// Breadth-first queue of pages still to fetch
///
/// A URL is marked visited when it is enqueued, not when it is fetched, so a
/// page discovered from several sources is only fetched once.
#[derive(Debug, Default)]
pub struct Frontier {
    queue: VecDeque<FrontierItem>,
    visited: HashSet<String>,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an item unless its URL was already seen
    ///
    /// Returns true if the item was enqueued.
    pub fn enqueue(&mut self, item: FrontierItem) -> bool {
        if !self.visited.insert(item.url.to_string()) {
            return false;
        }
        self.queue.push_back(item);
        true
    }

    /// Pops the oldest item
    pub fn next(&mut self) -> Option<FrontierItem> {
        self.queue.pop_front()
    }

    pub fn is_visited(&self, url: &Url) -> bool {
        self.visited.contains(url.as_str())
    }

    /// Items waiting to be fetched
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// URLs ever enqueued
    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }
}

/// Pacing for page fetches
///
/// Page fetches are spaced `1 / rate` seconds apart, except that the first
/// fetch is not delayed. Link probes on a page are spaced half that.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    interval: Duration,
    started: bool,
}

impl RateLimiter {
    /// Creates a limiter for `rate` page fetches per second
    ///
    /// Non-positive or non-finite rates are rejected by request validation
    /// before a limiter is ever built; here they map to the longest interval.
    pub fn new(rate: f64) -> Self {
        let interval = if rate.is_finite() && rate > 0.0 {
            Duration::try_from_secs_f64(1.0 / rate)
                .unwrap_or(MAX_INTERVAL)
                .min(MAX_INTERVAL)
        } else {
            MAX_INTERVAL
        };

        Self {
            interval,
            started: false,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Delay owed before the next page fetch
    pub fn before_fetch(&mut self) -> Option<Duration> {
        if !self.started {
            self.started = true;
            return None;
        }
        Some(self.interval)
    }

    /// Delay between two link probes on the same page
    pub fn settle_delay(&self) -> Duration {
        self.interval / 2
    }
}
