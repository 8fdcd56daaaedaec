//! Local-redirect middleware.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use tracing::info;

use crate::decision::{decide, RequestMeta};
use crate::state::AppState;

/// Sends clients from the router's own network to the local target with a
/// 307, and hands every other request to the next handler.
pub async fn local_redirect(State(state): State<Arc<AppState>>, request: Request, next: Next) -> Response {
    let snapshot = state.scheduler.snapshot().await;

    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let meta = RequestMeta {
        headers: request.headers(),
        uri: request.uri(),
        peer,
    };

    let decision = decide(&meta, snapshot.as_deref(), &state.config.local_target);
    match decision.location(request.uri()) {
        Some(location) => {
            info!(%location, "Redirecting local client");
            Redirect::temporary(&location).into_response()
        }
        None => next.run(request).await,
    }
}
