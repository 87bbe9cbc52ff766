//! Outbound request gating
//!
//! The crawler asks an [`OutboundGate`] before it enqueues, probes or fetches
//! any URL, including every redirect hop. The gate is a pure predicate over the
//! URL itself: no DNS resolution happens here, so a
//! public hostname that resolves to a private address is not caught.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use url::{Host, Url};

/// Decides whether a URL may be fetched
///
/// Implementations are shared between concurrent crawls and must be stateless
/// or internally synchronized.
pub trait OutboundGate: Send + Sync {
    fn is_allowed(&self, url: &Url) -> bool;
}

/// Gate that allows everything
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl OutboundGate for AllowAll {
    fn is_allowed(&self, _url: &Url) -> bool {
        true
    }
}

/// Gate that only allows HTTP(S) requests to public network destinations
///
/// Rejects:
/// - non-HTTP(S) schemes
/// - `localhost` and `*.localhost`
/// - cloud metadata hostnames
/// - loopback, RFC1918 private, link-local, unspecified, broadcast and
///   carrier-grade NAT IPv4 addresses
/// - loopback, unspecified, unique-local and link-local IPv6 addresses, and
///   IPv4-mapped forms of the rejected IPv4 ranges
#[derive(Debug, Clone, Copy, Default)]
pub struct PublicNetworkGate;

const BLOCKED_HOSTNAMES: &[&str] = &["localhost", "metadata.google.internal", "metadata"];

impl OutboundGate for PublicNetworkGate {
    fn is_allowed(&self, url: &Url) -> bool {
        if url.scheme() != "http" && url.scheme() != "https" {
            return false;
        }

        match url.host() {
            Some(Host::Domain(domain)) => {
                let domain = domain.trim_end_matches('.').to_lowercase();
                !(BLOCKED_HOSTNAMES.contains(&domain.as_str()) || domain.ends_with(".localhost"))
            }
            Some(Host::Ipv4(ip)) => !is_blocked_ip(&IpAddr::V4(ip)),
            Some(Host::Ipv6(ip)) => !is_blocked_ip(&IpAddr::V6(ip)),
            None => false,
        }
    }
}

/// Checks if an IP is in a loopback, private or otherwise reserved range
fn is_blocked_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => is_blocked_ipv4(v4),
        IpAddr::V6(v6) => is_blocked_ipv6(v6),
    }
}

fn is_blocked_ipv4(v4: &Ipv4Addr) -> bool {
    let octets = v4.octets();
    v4.is_loopback()
        || v4.is_private()
        || v4.is_link_local()
        || v4.is_broadcast()
        || v4.is_unspecified()
        // 0.0.0.0/8
        || octets[0] == 0
        // 100.64.0.0/10 (carrier-grade NAT)
        || (octets[0] == 100 && (octets[1] & 0xC0) == 64)
}

fn is_blocked_ipv6(v6: &Ipv6Addr) -> bool {
    if let Some(mapped) = v6.to_ipv4_mapped() {
        return is_blocked_ipv4(&mapped);
    }

    let first = v6.segments()[0];
    v6.is_loopback()
        || v6.is_unspecified()
        // fc00::/7 (unique local)
        || (first & 0xfe00) == 0xfc00
        // fe80::/10 (link local)
        || (first & 0xffc0) == 0xfe80
}
