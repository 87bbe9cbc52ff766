//! Crawl events and the channel that carries them
//!
//! The engine pushes [`CrawlEvent`]s into an [`EventSink`]; the consumer drains
//! them from a [`CrawlStream`]. Closing or dropping the stream is how a
//! consumer cancels a crawl: every suspension point in the engine is raced
//! against the sink noticing that its receiver is gone.

use crate::state::CrawlState;
use serde::{Serialize, Serializer};
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::Stream;

/// Classification of a reported link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkType {
    /// Same host as the page it was found on
    Internal,
    /// Different host from the page it was found on
    External,
    /// Page-level failure; no link was discovered
    Unknown,
}

/// One observed hop of a redirect chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RedirectStep {
    pub url: String,
    pub status: u16,
}

/// The authoritative output unit of a crawl
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkResult {
    /// Page the link was found on
    pub source_url: String,

    /// Normalized link target
    pub target_url: String,

    /// Final HTTP status, or 0 when resolution failed
    pub status: u16,

    /// Hops observed while resolving the target, oldest first
    #[serde(serialize_with = "serialize_chain")]
    pub redirect_chain: Vec<RedirectStep>,

    #[serde(rename = "type")]
    pub link_type: LinkType,

    pub anchor_text: String,

    pub rel: Vec<String>,

    /// Depth of the page the link was found on
    pub depth: u32,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    pub retry_count: u32,
}

impl LinkResult {
    /// Returns true if the target resolved to a 2xx status
    pub fn is_ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Returns true if at least one redirect was followed
    pub fn was_redirected(&self) -> bool {
        self.redirect_chain.len() > 1
    }

    /// The redirect chain in its printable form
    pub fn formatted_chain(&self) -> String {
        format_redirect_chain(&self.redirect_chain)
    }
}

/// Renders a redirect chain as `url [status] -> url [status]`
pub fn format_redirect_chain(chain: &[RedirectStep]) -> String {
    chain
        .iter()
        .map(|step| format!("{} [{}]", step.url, step.status))
        .collect::<Vec<_>>()
        .join(" -> ")
}

fn serialize_chain<S: Serializer>(chain: &[RedirectStep], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format_redirect_chain(chain))
}

/// Narration category of a log event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogKind {
    Info,
    Success,
    Error,
    Progress,
}

/// Everything a crawl reports, in emission order
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum CrawlEvent {
    /// Human-readable narration; not authoritative
    Log {
        message: String,
        #[serde(rename = "type")]
        kind: LogKind,
    },

    /// Emitted before each page fetch
    Progress {
        done: usize,
        total: usize,
        #[serde(rename = "currentUrl")]
        current_url: String,
    },

    Result(LinkResult),

    /// Natural completion
    Done {
        #[serde(rename = "totalLinks")]
        total_links: usize,
        visited: usize,
    },

    /// Unrecoverable failure
    Error { message: String },
}

impl CrawlEvent {
    pub fn log(kind: LogKind, message: impl Into<String>) -> Self {
        Self::Log {
            message: message.into(),
            kind,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }
}

/// The consumer has gone away
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cancelled;

/// Producer half of a crawl's event channel
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: mpsc::Sender<CrawlEvent>,
}

impl EventSink {
    /// Creates a bounded event channel
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<CrawlEvent>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }

    /// Sends an event, waiting for buffer space
    pub async fn emit(&self, event: CrawlEvent) -> Result<(), Cancelled> {
        self.tx.send(event).await.map_err(|_| Cancelled)
    }

    pub async fn log(&self, kind: LogKind, message: impl Into<String>) -> Result<(), Cancelled> {
        self.emit(CrawlEvent::log(kind, message)).await
    }

    /// Returns true once the consumer closed or dropped the stream
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Runs `fut` to completion unless the consumer goes away first
    ///
    /// When the consumer wins the race, `fut` is dropped and whatever it was
    /// doing (a sleep, an in-flight request) is abandoned.
    pub async fn until_closed<F: Future>(&self, fut: F) -> Result<F::Output, Cancelled> {
        tokio::select! {
            biased;
            _ = self.tx.closed() => Err(Cancelled),
            output = fut => Ok(output),
        }
    }
}

/// Consumer half of a running crawl
///
/// Yields events in emission order and ends once the crawl task finishes.
/// Dropping it cancels the crawl.
pub struct CrawlStream {
    rx: mpsc::Receiver<CrawlEvent>,
    handle: JoinHandle<CrawlState>,
}

impl CrawlStream {
    pub(crate) fn new(rx: mpsc::Receiver<CrawlEvent>, handle: JoinHandle<CrawlState>) -> Self {
        Self { rx, handle }
    }

    /// Receives the next event, or `None` once the crawl has ended
    pub async fn next_event(&mut self) -> Option<CrawlEvent> {
        self.rx.recv().await
    }

    /// Cancels the crawl
    ///
    /// Events already buffered can still be received; nothing new is produced.
    pub fn close(&mut self) {
        self.rx.close();
    }

    /// Stops consuming and waits for the crawl task to settle
    ///
    /// A crawl that already ended reports its terminal state; one that was still
    /// running is cancelled.
    pub async fn finish(mut self) -> CrawlState {
        self.rx.close();
        match (&mut self.handle).await {
            Ok(state) => state,
            Err(e) => {
                tracing::error!("Crawl task did not finish cleanly: {}", e);
                CrawlState::Failed
            }
        }
    }
}

impl Stream for CrawlStream {
    type Item = CrawlEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;

    fn sample_result() -> LinkResult {
        LinkResult {
            source_url: "https://example.com/a".to_string(),
            target_url: "https://example.com/b".to_string(),
            status: 200,
            redirect_chain: vec![
                RedirectStep {
                    url: "https://example.com/b".to_string(),
                    status: 301,
                },
                RedirectStep {
                    url: "https://example.com/b2".to_string(),
                    status: 200,
                },
            ],
            link_type: LinkType::Internal,
            anchor_text: "Bee".to_string(),
            rel: vec!["nofollow".to_string()],
            depth: 0,
            error: None,
            retry_count: 0,
        }
    }

    #[test]
    fn test_result_wire_format() {
        let value = serde_json::to_value(CrawlEvent::Result(sample_result())).unwrap();
        assert_eq!(value["event"], "result");
        assert_eq!(value["sourceUrl"], "https://example.com/a");
        assert_eq!(value["targetUrl"], "https://example.com/b");
        assert_eq!(value["type"], "internal");
        assert_eq!(value["anchorText"], "Bee");
        assert_eq!(value["retryCount"], 0);
        assert_eq!(
            value["redirectChain"],
            "https://example.com/b [301] -> https://example.com/b2 [200]"
        );
        assert!(value.get("error").is_none());
    }

    #[test]
    fn test_log_progress_done_error_wire_format() {
        let log = serde_json::to_value(CrawlEvent::log(LogKind::Success, "ok")).unwrap();
        assert_eq!(log, json!({"event": "log", "message": "ok", "type": "success"}));

        let progress = serde_json::to_value(CrawlEvent::Progress {
            done: 1,
            total: 3,
            current_url: "https://example.com/".to_string(),
        })
        .unwrap();
        assert_eq!(
            progress,
            json!({"event": "progress", "done": 1, "total": 3, "currentUrl": "https://example.com/"})
        );

        let done = serde_json::to_value(CrawlEvent::Done {
            total_links: 4,
            visited: 2,
        })
        .unwrap();
        assert_eq!(done, json!({"event": "done", "totalLinks": 4, "visited": 2}));

        let error = serde_json::to_value(CrawlEvent::error("boom")).unwrap();
        assert_eq!(error, json!({"event": "error", "message": "boom"}));
    }

    #[test]
    fn test_result_helpers() {
        let result = sample_result();
        assert!(result.is_ok());
        assert!(result.was_redirected());
    }

    #[test]
    fn test_empty_chain_formats_empty() {
        assert_eq!(format_redirect_chain(&[]), "");
    }

    #[tokio::test]
    async fn test_emit_after_receiver_dropped_is_cancelled() {
        let (sink, rx) = EventSink::channel(4);
        drop(rx);
        assert!(sink.is_closed());
        assert_eq!(sink.log(LogKind::Info, "hello").await, Err(Cancelled));
    }

    #[tokio::test]
    async fn test_until_closed_interrupts_sleep() {
        let (sink, mut rx) = EventSink::channel(4);
        rx.close();
        let outcome = sink
            .until_closed(tokio::time::sleep(Duration::from_secs(60)))
            .await;
        assert_eq!(outcome, Err(Cancelled));
    }

    #[tokio::test]
    async fn test_until_closed_passes_output_through() {
        let (sink, _rx) = EventSink::channel(4);
        let outcome = sink.until_closed(async { 7 }).await;
        assert_eq!(outcome, Ok(7));
    }
}
