//! Client address extraction from proxy headers and the peer address.
//!
//! None of these sources are authenticated. The proxy in front of this
//! service is expected to overwrite them.

use axum::http::HeaderMap;

/// De-facto standard proxy chain header.
pub const X_FORWARDED_FOR: &str = "x-forwarded-for";
/// Single-address header set by nginx and friends.
pub const X_REAL_IP: &str = "x-real-ip";
/// Header set by Cloudflare.
pub const CF_CONNECTING_IP: &str = "cf-connecting-ip";
/// Original scheme as seen by the outermost proxy.
pub const X_FORWARDED_PROTO: &str = "x-forwarded-proto";

/// Where the client address candidates were taken from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CandidateOrigin {
    ForwardedFor,
    RealIp,
    ConnectingIp,
    Peer,
    None,
}

/// Ordered client address candidates for one request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Candidates {
    pub origin: CandidateOrigin,
    /// Leftmost first for a proxy chain
    pub addresses: Vec<String>,
}

/// Collects address candidates using a fixed precedence: `X-Forwarded-For`,
/// `X-Real-IP`, `CF-Connecting-IP`, then the peer address with its port
/// removed. The first non-empty source wins.
pub fn client_candidates(headers: &HeaderMap, peer: Option<&str>) -> Candidates {
    if let Some(chain) = header_value(headers, X_FORWARDED_FOR) {
        let addresses = chain
            .split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(String::from)
            .collect();
        return Candidates {
            origin: CandidateOrigin::ForwardedFor,
            addresses,
        };
    }

    for (name, origin) in [
        (X_REAL_IP, CandidateOrigin::RealIp),
        (CF_CONNECTING_IP, CandidateOrigin::ConnectingIp),
    ] {
        if let Some(value) = header_value(headers, name) {
            return Candidates {
                origin,
                addresses: vec![value.trim().to_string()],
            };
        }
    }

    match peer.and_then(strip_port) {
        Some(host) => Candidates {
            origin: CandidateOrigin::Peer,
            addresses: vec![host.to_string()],
        },
        None => Candidates {
            origin: CandidateOrigin::None,
            addresses: Vec::new(),
        },
    }
}

/// Removes the trailing port from a `host:port` peer address.
///
/// Handles `[v6]:port`, `[v6]`, `v4:port` and bare IPv6 (left as is).
pub fn strip_port(raw: &str) -> Option<&str> {
    let raw = raw.trim();

    let host = if let Some(rest) = raw.strip_prefix('[') {
        rest.split_once(']').map(|(host, _)| host)?
    } else {
        match raw.rsplit_once(':') {
            Some((host, _)) if !host.contains(':') => host,
            _ => raw,
        }
    };

    Some(host).filter(|host| !host.is_empty())
}

/// First value of `name`, if present, valid ASCII and not blank.
pub(crate) fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.trim().is_empty())
}
