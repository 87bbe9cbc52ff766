//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the crawl loop that coordinates:
//! - Seeding the frontier and fixing the crawl's filters
//! - Fetching pages and extracting their links
//! - Resolving every link through its redirect chain
//! - Emitting results and following internal links breadth-first
//! - Lifecycle state and cancellation

use super::events::{Cancelled, CrawlEvent, CrawlStream, EventSink, LinkResult, LinkType, LogKind};
use super::fetcher::{fetch_document, FetchError, RequestSettings, Transport};
use super::filters::FilterSet;
use super::parser::{extract_links, DiscoveredLink};
use super::redirect::resolve_redirects;
use super::scheduler::{Frontier, FrontierItem, RateLimiter};
use crate::config::{validate_request, CrawlRequest};
use crate::state::CrawlState;
use crate::url::{extract_domain, normalize_url};
use crate::{ConfigError, RippleError};
use std::collections::HashSet;
use tracing::{debug, error, info, warn};

/// Events buffered between the engine and a slow consumer
const EVENT_BUFFER: usize = 64;

/// Entry point for running crawls
///
/// A `Crawler` holds no per-crawl state; any number of crawls may run from
/// clones of the same instance. Every request it makes is screened by the
/// transport's outbound gate.
#[derive(Clone)]
pub struct Crawler {
    transport: Transport,
}

impl Crawler {
    pub fn new(transport: Transport) -> Self {
        Self { transport }
    }

    /// Starts a crawl on the current tokio runtime
    ///
    /// The returned stream yields the crawl's events in order. Closing or
    /// dropping it cancels the crawl.
    pub fn start(&self, request: CrawlRequest) -> CrawlStream {
        let (sink, rx) = EventSink::channel(EVENT_BUFFER);
        let crawler = self.clone();

        let handle = tokio::spawn(async move {
            let engine_sink = sink.clone();
            let engine = tokio::spawn(async move { crawler.run(request, engine_sink).await });

            match engine.await {
                Ok(state) => state,
                Err(e) => {
                    let err = RippleError::TaskAborted(e.to_string());
                    error!("{}", err);
                    let _ = sink.emit(CrawlEvent::error(err.to_string())).await;
                    CrawlState::Failed
                }
            }
        });

        CrawlStream::new(rx, handle)
    }

    /// Runs a crawl to its terminal state, emitting into `sink`
    pub async fn run(&self, request: CrawlRequest, sink: EventSink) -> CrawlState {
        let mut session = CrawlSession::new(self, &request, sink.clone());

        match session.execute().await {
            Ok(()) => session.state,
            Err(Interrupt::Cancelled) => {
                info!("Crawl cancelled by consumer");
                session.settle(CrawlState::Cancelled)
            }
            Err(Interrupt::Fatal(e)) => {
                error!("Crawl failed: {}", e);
                let _ = sink.emit(CrawlEvent::error(e.to_string())).await;
                session.settle(CrawlState::Failed)
            }
        }
    }
}

/// Why the crawl loop stopped early
enum Interrupt {
    Cancelled,
    Fatal(RippleError),
}

impl From<Cancelled> for Interrupt {
    fn from(_: Cancelled) -> Self {
        Self::Cancelled
    }
}

impl From<RippleError> for Interrupt {
    fn from(e: RippleError) -> Self {
        Self::Fatal(e)
    }
}

impl From<ConfigError> for Interrupt {
    fn from(e: ConfigError) -> Self {
        Self::Fatal(e.into())
    }
}

/// State of one crawl invocation
struct CrawlSession<'a> {
    crawler: &'a Crawler,
    request: &'a CrawlRequest,
    sink: EventSink,
    settings: RequestSettings,
    rejected_headers: Vec<String>,
    frontier: Frontier,
    limiter: RateLimiter,
    state: CrawlState,
    emitted: usize,
    pages_fetched: usize,
}

impl<'a> CrawlSession<'a> {
    fn new(crawler: &'a Crawler, request: &'a CrawlRequest, sink: EventSink) -> Self {
        let (settings, rejected_headers) = RequestSettings::from_settings(&request.settings);

        Self {
            crawler,
            request,
            sink,
            settings,
            rejected_headers,
            frontier: Frontier::new(),
            limiter: RateLimiter::new(request.rate_limit),
            state: CrawlState::Idle,
            emitted: 0,
            pages_fetched: 0,
        }
    }

    async fn execute(&mut self) -> Result<(), Interrupt> {
        validate_request(self.request)?;

        info!(
            "Starting crawl: {} seed(s), recursive={}, max_urls={}, max_depth={}",
            self.request.urls.len(),
            self.request.recursive,
            self.request.max_urls,
            self.request.max_depth
        );
        self.sink
            .log(
                LogKind::Info,
                format!("Starting crawl of {} seed URL(s)", self.request.urls.len()),
            )
            .await?;

        for name in &self.rejected_headers {
            self.sink
                .log(LogKind::Error, format!("Ignoring invalid header: {}", name))
                .await?;
        }

        let base_domains = self.seed().await?;
        let filters = FilterSet::new(self.request, base_domains);
        if let Some(reason) = filters.rejected_filter() {
            self.sink
                .log(LogKind::Error, format!("Ignoring URL filter: {}", reason))
                .await?;
        }

        self.transition(CrawlState::Running)?;
        self.drain(&filters).await?;

        let visited = self.frontier.visited_count();
        info!(
            "Crawl complete: {} links from {} pages ({} URLs visited)",
            self.emitted, self.pages_fetched, visited
        );
        self.sink
            .log(
                LogKind::Success,
                format!(
                    "Crawl complete: {} links checked on {} pages",
                    self.emitted, self.pages_fetched
                ),
            )
            .await?;
        self.sink
            .emit(CrawlEvent::Done {
                total_links: self.emitted,
                visited,
            })
            .await?;

        self.transition(CrawlState::Completed)?;
        Ok(())
    }

    /// Normalizes, gates and enqueues the seeds
    ///
    /// Returns the hosts of the accepted seeds.
    async fn seed(&mut self) -> Result<HashSet<String>, Interrupt> {
        let request = self.request;
        let mut base_domains = HashSet::new();

        for raw in &request.urls {
            let url = match normalize_url(raw, None) {
                Ok(url) => url,
                Err(e) => {
                    warn!("Skipping seed {:?}: {}", raw, e);
                    self.sink
                        .log(LogKind::Error, format!("Skipping invalid URL {}: {}", raw, e))
                        .await?;
                    continue;
                }
            };

            if !self.crawler.transport.gate().is_allowed(&url) {
                warn!("Seed {} rejected by outbound gate", url);
                self.sink
                    .log(
                        LogKind::Error,
                        format!("Skipping blocked URL {}: {}", url, FetchError::Blocked),
                    )
                    .await?;
                continue;
            }

            if let Some(domain) = extract_domain(&url) {
                base_domains.insert(domain);
            }
            if !self.frontier.enqueue(FrontierItem::seed(url)) {
                debug!("Duplicate seed {:?}", raw);
            }
        }

        Ok(base_domains)
    }

    /// Pops frontier items until it is empty or the budget is spent
    async fn drain(&mut self, filters: &FilterSet) -> Result<(), Interrupt> {
        while self.emitted < self.request.max_urls {
            if self.sink.is_closed() {
                return Err(Interrupt::Cancelled);
            }

            let Some(item) = self.frontier.next() else {
                break;
            };

            if !filters.allows(&item.url) {
                debug!("Filtered out page {}", item.url);
                continue;
            }

            if let Some(delay) = self.limiter.before_fetch() {
                self.sink.until_closed(tokio::time::sleep(delay)).await?;
            }

            self.sink
                .emit(CrawlEvent::Progress {
                    done: self.pages_fetched,
                    total: self.pages_fetched + self.frontier.len() + 1,
                    current_url: item.url.to_string(),
                })
                .await?;

            self.crawl_page(&item, filters).await?;
        }

        if self.emitted >= self.request.max_urls {
            info!("URL budget of {} reached", self.request.max_urls);
            self.sink
                .log(
                    LogKind::Info,
                    format!("Reached the limit of {} links", self.request.max_urls),
                )
                .await?;
        }

        Ok(())
    }

    /// Fetches one page and reports every link on it
    async fn crawl_page(&mut self, item: &FrontierItem, filters: &FilterSet) -> Result<(), Interrupt> {
        info!("Crawling {} (depth {})", item.url, item.depth);
        self.sink
            .log(
                LogKind::Progress,
                format!("Crawling {} (depth {})", item.url, item.depth),
            )
            .await?;

        let fetched = self
            .sink
            .until_closed(fetch_document(
                self.crawler.transport.documents(),
                &item.url,
                &self.settings,
            ))
            .await?;
        self.pages_fetched += 1;

        let document = match fetched {
            Ok(document) if document.status.is_client_error() => {
                let message = FetchError::Status(document.status).to_string();
                return self
                    .report_page_failure(item, document.status.as_u16(), message, document.retries)
                    .await;
            }
            Ok(document) => document,
            Err(failure) => {
                return self
                    .report_page_failure(item, 0, failure.error.to_string(), failure.retries)
                    .await;
            }
        };

        let links = extract_links(&document.body, &document.url);
        debug!("Extracted {} links from {}", links.len(), document.url);
        self.sink
            .log(
                LogKind::Info,
                format!("Found {} links on {}", links.len(), item.url),
            )
            .await?;

        for link in links {
            if self.emitted >= self.request.max_urls {
                break;
            }
            if !filters.allows(&link.url) {
                continue;
            }

            let result = self.check_link(item, &link).await?;
            self.emit_result(result).await?;
            self.follow(item, &link, filters);

            self.sink
                .until_closed(tokio::time::sleep(self.limiter.settle_delay()))
                .await?;
        }

        Ok(())
    }

    /// Resolves one discovered link into its result
    async fn check_link(
        &self,
        item: &FrontierItem,
        link: &DiscoveredLink,
    ) -> Result<LinkResult, Interrupt> {
        let transport = &self.crawler.transport;
        let resolution = self
            .sink
            .until_closed(resolve_redirects(
                transport.probes(),
                transport.gate(),
                &link.url,
                &self.settings,
            ))
            .await?;
        debug!(
            "{} resolved to {} ({})",
            link.url, resolution.final_url, resolution.final_status
        );

        Ok(LinkResult {
            source_url: item.url.to_string(),
            target_url: link.url.to_string(),
            status: resolution.final_status,
            redirect_chain: resolution.chain,
            link_type: link.link_type,
            anchor_text: link.anchor_text.clone(),
            rel: link.rel.clone(),
            depth: item.depth,
            error: resolution.error,
            retry_count: 0,
        })
    }

    /// Enqueues a link for fetching if every follow rule allows it
    fn follow(&mut self, item: &FrontierItem, link: &DiscoveredLink, filters: &FilterSet) {
        if !self.request.recursive
            || link.link_type != LinkType::Internal
            || item.depth >= self.request.max_depth
            || self.frontier.is_visited(&link.url)
            || !filters.allows_follow(&link.url)
            || !self.crawler.transport.gate().is_allowed(&link.url)
        {
            return;
        }

        let queued = self.frontier.enqueue(FrontierItem {
            url: link.url.clone(),
            depth: item.depth + 1,
            source_url: Some(item.url.to_string()),
        });
        if queued {
            debug!("Queued {} at depth {}", link.url, item.depth + 1);
        }
    }

    /// Emits the synthetic result for a page that could not be read
    ///
    /// `status` is 0 when no usable response arrived: transport failures,
    /// exhausted 5xx retries and redirects refused by the gate. A page
    /// answering 4xx is also reported here rather than parsed, but keeps the
    /// observed status so a missing seed reads as 404 instead of 0.
    async fn report_page_failure(
        &mut self,
        item: &FrontierItem,
        status: u16,
        message: String,
        retries: u32,
    ) -> Result<(), Interrupt> {
        warn!("Failed to fetch {}: {}", item.url, message);
        self.sink
            .log(
                LogKind::Error,
                format!("Failed to fetch {}: {}", item.url, message),
            )
            .await?;

        let page = item.url.to_string();
        self.emit_result(LinkResult {
            source_url: page.clone(),
            target_url: page,
            status,
            redirect_chain: Vec::new(),
            link_type: LinkType::Unknown,
            anchor_text: String::new(),
            rel: Vec::new(),
            depth: item.depth,
            error: Some(message),
            retry_count: retries,
        })
        .await
    }

    async fn emit_result(&mut self, result: LinkResult) -> Result<(), Interrupt> {
        self.sink.emit(CrawlEvent::Result(result)).await?;
        self.emitted += 1;
        Ok(())
    }

    fn transition(&mut self, next: CrawlState) -> Result<(), RippleError> {
        if !self.state.can_transition_to(next) {
            return Err(RippleError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        debug!("Crawl state {} -> {}", self.state, next);
        self.state = next;
        Ok(())
    }

    /// Moves to a terminal state if still possible and returns the final state
    fn settle(&mut self, next: CrawlState) -> CrawlState {
        if self.state.is_terminal() {
            debug!("Crawl already {}, not moving to {}", self.state, next);
        } else if let Err(e) = self.transition(next) {
            warn!("{}", e);
        }
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::fetcher::{build_http_client, gated_redirect_policy};
    use crate::url::{AllowAll, OutboundGate, PublicNetworkGate};
    use reqwest::redirect::Policy;
    use std::sync::Arc;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_crawler(gate: Arc<dyn OutboundGate>) -> Crawler {
        let transport = Transport::from_clients(
            build_http_client("Test/1.0", gated_redirect_policy(gate.clone())).unwrap(),
            build_http_client("Test/1.0", Policy::none()).unwrap(),
            gate,
        );
        Crawler::new(transport)
    }

    async fn collect(crawler: &Crawler, request: CrawlRequest) -> (Vec<CrawlEvent>, CrawlState) {
        let mut stream = crawler.start(request);
        let mut events = Vec::new();
        while let Some(event) = stream.next_event().await {
            events.push(event);
        }
        (events, stream.finish().await)
    }

    fn results(events: &[CrawlEvent]) -> Vec<&LinkResult> {
        events
            .iter()
            .filter_map(|e| match e {
                CrawlEvent::Result(r) => Some(r),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_invalid_request_fails() {
        let crawler = test_crawler(Arc::new(AllowAll));
        let (events, state) = collect(&crawler, CrawlRequest::new(Vec::<String>::new())).await;

        assert_eq!(state, CrawlState::Failed);
        assert!(matches!(events.last(), Some(CrawlEvent::Error { .. })));
        assert!(!events.iter().any(|e| matches!(e, CrawlEvent::Done { .. })));
    }

    #[tokio::test]
    async fn test_blocked_link_not_requested() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"<a href="http://169.254.169.254/latest/meta-data/">meta</a>"#,
            ))
            .mount(&server)
            .await;

        // Let the loopback seed through while keeping the public-network rule for links
        struct SeedOnly(String);
        impl OutboundGate for SeedOnly {
            fn is_allowed(&self, url: &url::Url) -> bool {
                url.as_str().starts_with(&self.0) || PublicNetworkGate.is_allowed(url)
            }
        }

        let crawler = test_crawler(Arc::new(SeedOnly(server.uri())));
        let mut request = CrawlRequest::new([format!("{}/", server.uri())]);
        request.rate_limit = 1000.0;
        let (events, state) = collect(&crawler, request).await;

        assert_eq!(state, CrawlState::Completed);
        let results = results(&events);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].status, 0);
        assert_eq!(results[0].error.as_deref(), Some("Blocked by outbound policy"));
        assert!(results[0].redirect_chain.is_empty());
    }

    #[tokio::test]
    async fn test_client_error_page_reports_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/gone"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let crawler = test_crawler(Arc::new(AllowAll));
        let mut request = CrawlRequest::new([format!("{}/gone", server.uri())]);
        request.rate_limit = 1000.0;
        let (events, state) = collect(&crawler, request).await;

        assert_eq!(state, CrawlState::Completed);
        let results = results(&events);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].status, 404);
        assert_eq!(results[0].link_type, LinkType::Unknown);
        assert_eq!(results[0].source_url, results[0].target_url);
        assert_eq!(results[0].error.as_deref(), Some("HTTP 404 Not Found"));
    }

    #[tokio::test]
    async fn test_progress_precedes_results() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"<a href="/x">x</a>"#))
            .mount(&server)
            .await;
        Mock::given(method("HEAD"))
            .and(path("/x"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let crawler = test_crawler(Arc::new(AllowAll));
        let mut request = CrawlRequest::new([format!("{}/", server.uri())]);
        request.rate_limit = 1000.0;
        let (events, _) = collect(&crawler, request).await;

        let progress = events
            .iter()
            .position(|e| matches!(e, CrawlEvent::Progress { .. }))
            .unwrap();
        let first_result = events
            .iter()
            .position(|e| matches!(e, CrawlEvent::Result(_)))
            .unwrap();
        assert!(progress < first_result);

        match &events[progress] {
            CrawlEvent::Progress { done, total, .. } => {
                assert_eq!(*done, 0);
                assert_eq!(*total, 1);
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_settle_keeps_terminal_state() {
        let crawler = test_crawler(Arc::new(AllowAll));
        let request = CrawlRequest::new(["https://example.com/"]);
        let (sink, _rx) = EventSink::channel(1);
        let mut session = CrawlSession::new(&crawler, &request, sink);

        assert_eq!(session.settle(CrawlState::Cancelled), CrawlState::Cancelled);

        let mut session = CrawlSession::new(&crawler, &request, session.sink.clone());
        assert!(session.transition(CrawlState::Running).is_ok());
        assert!(session.transition(CrawlState::Completed).is_ok());
        assert_eq!(session.settle(CrawlState::Cancelled), CrawlState::Completed);
        assert!(matches!(
            session.transition(CrawlState::Running),
            Err(RippleError::InvalidTransition { .. })
        ));
    }
}
