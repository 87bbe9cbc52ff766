//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building HTTP clients with proper user agent strings
//! - GET requests to fetch page content
//! - Retry logic for transient failures
//! - Error classification

use crate::config::{CrawlSettings, UserAgentConfig};
use crate::url::OutboundGate;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{redirect::Policy, Client, StatusCode};
use std::error::Error as StdError;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

/// Maximum redirects the document client follows on its own
const DOCUMENT_REDIRECT_LIMIT: usize = 10;

/// Connection establishment timeout shared by both clients
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Base delay between attempts; the n-th retry waits `n` times this
const RETRY_BACKOFF: Duration = Duration::from_millis(1000);

/// The pair of HTTP clients a crawl uses, and the gate they answer to
///
/// Pages are fetched with a client that follows redirects, but only to
/// destinations the gate allows. Discovered links are probed with one that
/// does not follow at all, so every hop can be observed and gated.
#[derive(Clone)]
pub struct Transport {
    documents: Client,
    probes: Client,
    gate: Arc<dyn OutboundGate>,
}

impl Transport {
    /// Builds both clients for the given crawler identity
    pub fn new(config: &UserAgentConfig, gate: Arc<dyn OutboundGate>) -> crate::Result<Self> {
        let user_agent = config.header_value();
        Ok(Self {
            documents: build_http_client(&user_agent, gated_redirect_policy(gate.clone()))?,
            probes: build_http_client(&user_agent, Policy::none())?,
            gate,
        })
    }

    /// Wraps pre-built clients
    pub fn from_clients(documents: Client, probes: Client, gate: Arc<dyn OutboundGate>) -> Self {
        Self {
            documents,
            probes,
            gate,
        }
    }

    /// Client used for page fetches
    pub fn documents(&self) -> &Client {
        &self.documents
    }

    /// Client used for redirect probes
    pub fn probes(&self) -> &Client {
        &self.probes
    }

    pub fn gate(&self) -> &dyn OutboundGate {
        self.gate.as_ref()
    }
}

/// Redirect target refused by the outbound gate
#[derive(Debug, Error)]
#[error("Blocked by outbound policy: {0}")]
struct BlockedRedirect(Url);

/// Redirect policy for page fetches
///
/// Follows up to [`DOCUMENT_REDIRECT_LIMIT`] hops and refuses any hop the gate
/// does not allow, before the request for it is sent.
pub fn gated_redirect_policy(gate: Arc<dyn OutboundGate>) -> Policy {
    Policy::custom(move |attempt| {
        if attempt.previous().len() > DOCUMENT_REDIRECT_LIMIT {
            return attempt.error("too many redirects");
        }
        if !gate.is_allowed(attempt.url()) {
            let target = attempt.url().clone();
            warn!("Refusing redirect to {}: rejected by outbound gate", target);
            return attempt.error(BlockedRedirect(target));
        }
        attempt.follow()
    })
}

/// Builds an HTTP client with proper configuration
///
/// Per-request timeouts are applied by the caller; the client only carries
/// the connect timeout.
///
/// # Example
///
/// ```no_run
/// use reqwest::redirect::Policy;
/// use ripple_links::crawler::build_http_client;
///
/// let client = build_http_client("RippleLinks/1.0", Policy::none()).unwrap();
/// ```
pub fn build_http_client(user_agent: &str, redirect: Policy) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent)
        .connect_timeout(CONNECT_TIMEOUT)
        .redirect(redirect)
        .gzip(true)
        .brotli(true)
        .build()
}

/// Request settings resolved for one crawl
#[derive(Debug, Clone)]
pub struct RequestSettings {
    /// Per-attempt timeout
    pub timeout: Duration,

    /// Retries after the first attempt
    pub retries: u32,

    /// Headers sent with every request
    pub headers: HeaderMap,

    /// Base delay between attempts
    pub backoff: Duration,
}

impl Default for RequestSettings {
    fn default() -> Self {
        Self::from_settings(&CrawlSettings::default()).0
    }
}

impl RequestSettings {
    /// Clamps the settings and converts the header map
    ///
    /// Headers whose name or value is not valid HTTP are dropped; their names
    /// are returned so the caller can report them.
    pub fn from_settings(settings: &CrawlSettings) -> (Self, Vec<String>) {
        let settings = settings.clamped();
        let mut headers = HeaderMap::new();
        let mut rejected = Vec::new();

        for (name, value) in &settings.headers {
            match (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                (Ok(name), Ok(value)) => {
                    headers.insert(name, value);
                }
                _ => {
                    warn!("Dropping invalid request header: {}", name);
                    rejected.push(name.clone());
                }
            }
        }

        (
            Self {
                timeout: Duration::from_secs(settings.timeout),
                retries: settings.retries,
                headers,
                backoff: RETRY_BACKOFF,
            },
            rejected,
        )
    }
}

/// A fetched page
#[derive(Debug, Clone)]
pub struct FetchedDocument {
    /// Final URL after redirects
    pub url: Url,

    pub status: StatusCode,

    pub body: String,

    /// Retries spent before this response arrived
    pub retries: u32,
}

/// Why a page could not be fetched
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("Timeout")]
    Timeout,

    /// Non-success status; only 5xx reach this through retries
    #[error("HTTP {0}")]
    Status(StatusCode),

    #[error("Connection failed: {0}")]
    Connect(String),

    /// The outbound gate refused the URL or one of its redirects
    #[error("Blocked by outbound policy")]
    Blocked,

    #[error("{0}")]
    Transport(String),
}

impl FetchError {
    /// Classifies a reqwest error
    pub fn from_reqwest(e: &reqwest::Error) -> Self {
        let blocked = e.is_redirect()
            && e
                .source()
                .is_some_and(|source| source.downcast_ref::<BlockedRedirect>().is_some());

        if blocked {
            Self::Blocked
        } else if e.is_timeout() {
            Self::Timeout
        } else if e.is_connect() {
            Self::Connect(e.to_string())
        } else {
            Self::Transport(e.to_string())
        }
    }

    /// Whether another attempt could succeed
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::Blocked)
    }
}

/// Delay before the given retry (1-based)
pub fn retry_delay(backoff: Duration, retry: u32) -> Duration {
    backoff * retry
}

/// A fetch that exhausted its attempts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchFailure {
    pub error: FetchError,

    /// Retries spent before giving up
    pub retries: u32,
}

/// Fetches a page, retrying transient failures
///
/// # Retry Logic
///
/// | Condition | Action |
/// |-----------|--------|
/// | Status < 500 | Returned immediately |
/// | HTTP 5xx | Retried |
/// | Timeout or transport error | Retried |
/// | Redirect refused by the gate | Returned immediately |
///
/// The n-th retry waits `n * backoff`. After `retries + 1` attempts the last
/// failure is returned.
pub async fn fetch_document(
    client: &Client,
    url: &Url,
    settings: &RequestSettings,
) -> Result<FetchedDocument, FetchFailure> {
    let mut attempt: u32 = 0;

    loop {
        let error = match fetch_once(client, url, settings).await {
            Ok(mut document) if !document.status.is_server_error() => {
                document.retries = attempt;
                return Ok(document);
            }
            Ok(document) => FetchError::Status(document.status),
            Err(error) => error,
        };

        if attempt >= settings.retries || !error.is_retryable() {
            debug!("Giving up on {} after {} retries: {}", url, attempt, error);
            return Err(FetchFailure {
                error,
                retries: attempt,
            });
        }

        attempt += 1;
        let delay = retry_delay(settings.backoff, attempt);
        debug!(
            "Retry {}/{} for {} in {:?}: {}",
            attempt, settings.retries, url, delay, error
        );
        tokio::time::sleep(delay).await;
    }
}

async fn fetch_once(
    client: &Client,
    url: &Url,
    settings: &RequestSettings,
) -> Result<FetchedDocument, FetchError> {
    let response = client
        .get(url.clone())
        .headers(settings.headers.clone())
        .timeout(settings.timeout)
        .send()
        .await
        .map_err(|e| FetchError::from_reqwest(&e))?;

    let status = response.status();
    let final_url = response.url().clone();

    // 5xx bodies are never parsed
    let body = if status.is_server_error() {
        String::new()
    } else {
        response
            .text()
            .await
            .map_err(|e| FetchError::from_reqwest(&e))?
    };

    Ok(FetchedDocument {
        url: final_url,
        status,
        body,
        retries: 0,
    })
}
