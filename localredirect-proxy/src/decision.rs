//! Pass-through or redirect, per request.

use std::net::{IpAddr, SocketAddr};

use axum::http::{HeaderMap, Uri};
use tracing::debug;

use localredirect_core::types::{AddressSet, LocalTarget};

use crate::client_ip::{client_candidates, header_value, X_FORWARDED_PROTO};

/// The parts of a request the decision looks at.
#[derive(Clone, Copy, Debug)]
pub struct RequestMeta<'a> {
    pub headers: &'a HeaderMap,
    pub uri: &'a Uri,
    pub peer: Option<SocketAddr>,
}

/// Outcome for one request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Decision {
    /// Hand the request to the next handler unchanged.
    PassThrough,
    /// Send a 307 to the same path and query on the local host.
    RedirectTo { authority: String, scheme: String },
}

impl Decision {
    /// Builds the `Location` for a redirect, keeping the original path and query.
    pub fn location(&self, uri: &Uri) -> Option<String> {
        match self {
            Decision::PassThrough => None,
            Decision::RedirectTo { authority, scheme } => {
                let path_and_query = uri.path_and_query().map_or("/", |pq| pq.as_str());
                Some(format!("{scheme}://{authority}{path_and_query}"))
            }
        }
    }
}

/// Decides whether the client is inside the router's network.
///
/// With no usable snapshot every request passes through. Otherwise the
/// candidates are tried in order; literals that do not parse are skipped and
/// the first one matching the snapshot triggers a redirect.
pub fn decide(meta: &RequestMeta<'_>, snapshot: Option<&AddressSet>, target: &LocalTarget) -> Decision {
    let Some(snapshot) = snapshot.filter(|set| set.is_usable()) else {
        debug!("No router addresses known, passing through");
        return Decision::PassThrough;
    };

    let peer = meta.peer.map(|addr| addr.to_string());
    let candidates = client_candidates(meta.headers, peer.as_deref());

    let matched = candidates
        .addresses
        .iter()
        .filter_map(|raw| raw.parse::<IpAddr>().ok())
        .find(|ip| snapshot.matches(*ip));

    match matched {
        Some(ip) => {
            let scheme = target.scheme_or(original_scheme(meta)).to_string();
            debug!(client = %ip, origin = ?candidates.origin, "Local client, redirecting");
            Decision::RedirectTo {
                authority: target.authority.clone(),
                scheme,
            }
        }
        None => {
            debug!(candidates = ?candidates.addresses, "Remote client, passing through");
            Decision::PassThrough
        }
    }
}

/// Scheme of the request as the client sent it, `http` unless it was `https`.
fn original_scheme(meta: &RequestMeta<'_>) -> &'static str {
    let raw = meta.uri.scheme_str().or_else(|| {
        header_value(meta.headers, X_FORWARDED_PROTO).and_then(|value| value.split(',').next())
    });

    match raw.map(str::trim) {
        Some(scheme) if scheme.eq_ignore_ascii_case("https") => "https",
        _ => "http",
    }
}
