//! Handlers served by the proxy itself.

use std::sync::Arc;

use axum::{extract::State, Json};
use serde::Serialize;

use localredirect_cache::CacheState;
use localredirect_core::types::AddressSet;

use crate::state::AppState;

/// Path of the health endpoint. Chosen so it does not collide with upstream routes.
pub const HEALTH_PATH: &str = "/_localredirect/health";

/// Health response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub cache: CacheState,
    pub addresses: Option<AddressSet>,
    pub age_seconds: Option<u64>,
    pub refresh_interval_seconds: u64,
    pub installs: u64,
    pub rejected: u64,
    pub local_target: String,
}

/// GET /_localredirect/health
///
/// Reports what the cache holds. Never contacts the router.
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let cache = state.scheduler.cache();
    let stats = cache.stats();

    Json(HealthResponse {
        status: "ok".into(),
        version: env!("CARGO_PKG_VERSION").into(),
        cache: state.scheduler.state(),
        addresses: cache.read().map(|set| (*set).clone()),
        age_seconds: stats.age.map(|age| age.as_secs()),
        refresh_interval_seconds: state.scheduler.policy().refresh_interval.as_secs(),
        installs: stats.installs,
        rejected: stats.rejected,
        local_target: state.config.local_target.to_string(),
    })
}
