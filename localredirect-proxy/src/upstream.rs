//! Pass-through to the upstream service.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    extract::{ConnectInfo, Request, State},
    http::{header, HeaderMap, HeaderName, HeaderValue},
    response::{IntoResponse, Response},
};
use tracing::debug;

use crate::client_ip::X_FORWARDED_FOR;
use crate::error::ProxyError;
use crate::state::AppState;

/// Largest request body forwarded upstream.
const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

/// Connection-scoped headers that must not be forwarded (RFC 9110 §7.6.1).
static HOP_BY_HOP: [HeaderName; 8] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

/// Forwards the request to the configured upstream and relays its answer.
pub async fn forward(State(state): State<Arc<AppState>>, request: Request) -> Result<Response, ProxyError> {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());
    let (parts, body) = request.into_parts();

    let body = to_bytes(body, MAX_BODY_BYTES)
        .await
        .map_err(|_| ProxyError::payload_too_large("Request body too large"))?;

    let path_and_query = parts.uri.path_and_query().map_or("/", |pq| pq.as_str());
    let url = format!("{}{}", state.config.upstream_url.trim_end_matches('/'), path_and_query);

    let mut headers = parts.headers;
    strip_hop_by_hop(&mut headers);
    headers.remove(header::HOST);
    headers.remove(header::CONTENT_LENGTH);
    if let Some(peer) = peer {
        append_forwarded_for(&mut headers, &peer.to_string());
    }

    debug!(method = %parts.method, %url, "Forwarding upstream");
    let upstream = state
        .upstream
        .request(parts.method, &url)
        .headers(headers)
        .body(body)
        .send()
        .await?;

    let status = upstream.status();
    let mut headers = upstream.headers().clone();
    strip_hop_by_hop(&mut headers);
    headers.remove(header::CONTENT_LENGTH);
    let body = upstream.bytes().await?;

    Ok((status, headers, Body::from(body)).into_response())
}

/// Removes hop-by-hop headers, including any listed in `Connection`.
fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let listed: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();

    for name in HOP_BY_HOP.iter().chain(listed.iter()) {
        headers.remove(name);
    }
}

/// Appends `peer` to the forwarded-for chain.
fn append_forwarded_for(headers: &mut HeaderMap, peer: &str) {
    let chain = match headers.get(X_FORWARDED_FOR).and_then(|value| value.to_str().ok()) {
        Some(existing) if !existing.trim().is_empty() => format!("{existing}, {peer}"),
        _ => peer.to_string(),
    };
    if let Ok(value) = HeaderValue::from_str(&chain) {
        headers.insert(X_FORWARDED_FOR, value);
    }
}
