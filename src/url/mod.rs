//! URL handling module for Ripple-Links
//!
//! This module provides URL normalization, host extraction and the outbound
//! gate consulted before any URL is enqueued.

mod domain;
mod gate;
mod normalize;

// Re-export main functions
pub use domain::{extract_domain, same_host};
pub use gate::{AllowAll, OutboundGate, PublicNetworkGate};
pub use normalize::normalize_url;
