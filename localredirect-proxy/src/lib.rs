//! # localredirect proxy
//!
//! HTTP front for a service published through a home router. Clients that
//! reach the public name from inside the router's own network get a
//! `307 Temporary Redirect` to the internal host; everybody else is passed
//! through to the upstream.
//!
//! ## Endpoints
//!
//! - `GET /_localredirect/health` - Cache state and the last discovered addresses
//! - everything else - redirect or pass-through
//!
//! ## Example
//!
//! ```rust,ignore
//! use localredirect_proxy::{ProxyConfig, ProxyServer};
//!
//! let server = ProxyServer::new(ProxyConfig::from_env()?)?;
//! server.run(([0, 0, 0, 0], 8000)).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod client_ip;
mod decision;
mod error;
mod handlers;
mod middleware;
mod routes;
mod state;
mod upstream;

pub use client_ip::{client_candidates, strip_port, CandidateOrigin, Candidates};
pub use decision::{decide, Decision, RequestMeta};
pub use error::ProxyError;
pub use handlers::HEALTH_PATH;
pub use routes::create_router;
pub use state::{AppState, ProxyConfig};

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tower_http::trace::TraceLayer;
use tracing::info;

use localredirect_core::error::Result;

/// Local-redirect proxy server.
pub struct ProxyServer {
    state: Arc<AppState>,
}

impl ProxyServer {
    /// Creates a server that discovers addresses from the configured router.
    pub fn new(config: ProxyConfig) -> Result<Self> {
        Ok(Self::from_state(AppState::new(config)?))
    }

    /// Creates a server around prepared state.
    pub fn from_state(state: AppState) -> Self {
        Self {
            state: Arc::new(state),
        }
    }

    /// Creates the router with all routes configured.
    pub fn router(&self) -> Router {
        create_router(self.state.clone()).layer(TraceLayer::new_for_http())
    }

    /// Runs the server on the given address.
    pub async fn run(self, addr: impl Into<SocketAddr>) -> std::io::Result<()> {
        let addr = addr.into();
        let listener = tokio::net::TcpListener::bind(addr).await?;

        info!(
            %addr,
            upstream = %self.state.config.upstream_url,
            local_target = %self.state.config.local_target,
            "Local redirect proxy listening"
        );

        axum::serve(
            listener,
            self.router().into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
    }
}
