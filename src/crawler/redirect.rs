//! Redirect chain resolution
//!
//! Links are probed with HEAD requests on a client that never follows
//! redirects on its own, so each hop is recorded and gated as it happens.

use super::events::RedirectStep;
use super::fetcher::{FetchError, RequestSettings};
use crate::url::OutboundGate;
use reqwest::header::LOCATION;
use reqwest::Client;
use tracing::debug;
use url::Url;

/// Maximum number of requests issued while resolving one link
pub const MAX_REDIRECT_HOPS: usize = 10;

/// Outcome of following a link to its final destination
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectResolution {
    /// Every response observed, oldest first
    pub chain: Vec<RedirectStep>,

    /// Last URL requested
    pub final_url: String,

    /// Last status observed, or 0 on failure
    pub final_status: u16,

    pub error: Option<String>,
}

impl RedirectResolution {
    fn failed(chain: Vec<RedirectStep>, final_url: &Url, error: String) -> Self {
        Self {
            chain,
            final_url: final_url.to_string(),
            final_status: 0,
            error: Some(error),
        }
    }
}

/// Follows `url` through its redirects with HEAD requests
///
/// Stops at the first non-3xx response, at a 3xx without a `Location` header,
/// or after [`MAX_REDIRECT_HOPS`] requests. Never fails: transport errors,
/// hop exhaustion and hops the gate refuses are reported in the returned
/// resolution with status 0 and the chain observed so far.
pub async fn resolve_redirects(
    client: &Client,
    gate: &dyn OutboundGate,
    url: &Url,
    settings: &RequestSettings,
) -> RedirectResolution {
    let mut chain: Vec<RedirectStep> = Vec::new();
    let mut current = url.clone();

    loop {
        if chain.len() >= MAX_REDIRECT_HOPS {
            debug!("Redirect limit reached for {}", url);
            return RedirectResolution::failed(chain, &current, "Too many redirects".to_string());
        }

        if !gate.is_allowed(&current) {
            debug!("Not probing {}: rejected by outbound gate", current);
            return RedirectResolution::failed(chain, &current, FetchError::Blocked.to_string());
        }

        let response = match client
            .head(current.clone())
            .headers(settings.headers.clone())
            .timeout(settings.timeout)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                let error = FetchError::from_reqwest(&e);
                debug!("Probe of {} failed: {}", current, error);
                return RedirectResolution::failed(chain, &current, error.to_string());
            }
        };

        let status = response.status();
        chain.push(RedirectStep {
            url: current.to_string(),
            status: status.as_u16(),
        });

        let location = if status.is_redirection() {
            response.headers().get(LOCATION)
        } else {
            None
        };

        let Some(location) = location else {
            return RedirectResolution {
                chain,
                final_url: current.to_string(),
                final_status: status.as_u16(),
                error: None,
            };
        };

        let next = location
            .to_str()
            .ok()
            .and_then(|target| current.join(target.trim()).ok());

        match next {
            Some(next) => {
                debug!("{} redirects to {}", current, next);
                current = next;
            }
            None => {
                let raw = String::from_utf8_lossy(location.as_bytes()).into_owned();
                return RedirectResolution::failed(
                    chain,
                    &current,
                    format!("Invalid redirect target: {}", raw),
                );
            }
        }
    }
}
