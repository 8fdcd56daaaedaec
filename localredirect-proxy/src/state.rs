//! App state: configuration, refresh scheduler, upstream client.

use std::sync::Arc;
use std::time::Duration;

use url::Url;

use localredirect_core::constants::{DEFAULT_LOCAL_HOST, DEFAULT_ROUTER_URL, DEFAULT_UPSTREAM_URL};
use localredirect_core::error::{RedirectError, Result};
use localredirect_core::traits::SharedSource;
use localredirect_core::types::{parse_duration, LocalTarget, RefreshPolicy};
use localredirect_discovery::RefreshScheduler;
use localredirect_router::{RouterClient, RouterConfig};

/// Upstream requests get this long before the proxy gives up.
const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(60);

/// Proxy configuration.
#[derive(Clone, Debug)]
pub struct ProxyConfig {
    /// Router management endpoint
    pub router_url: String,
    /// Refresh interval and router call timeout
    pub policy: RefreshPolicy,
    /// Where local clients are redirected to
    pub local_target: LocalTarget,
    /// Base URL remote clients are forwarded to
    pub upstream_url: String,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            router_url: DEFAULT_ROUTER_URL.into(),
            policy: RefreshPolicy::default(),
            local_target: LocalTarget {
                authority: DEFAULT_LOCAL_HOST.into(),
                scheme: None,
            },
            upstream_url: DEFAULT_UPSTREAM_URL.into(),
        }
    }
}

impl ProxyConfig {
    /// Reads `ROUTER_URL`, `ROUTER_TIMEOUT`, `REFRESH_INTERVAL`, `LOCAL_HOST`
    /// and `UPSTREAM_URL`, after loading `.env` if present.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let router_url = var("ROUTER_URL").unwrap_or(defaults.router_url);
        Url::parse(&router_url)
            .map_err(|e| RedirectError::ConfigError(format!("invalid ROUTER_URL '{router_url}': {e}")))?;

        let rpc_timeout = match var("ROUTER_TIMEOUT") {
            Some(raw) => parse_duration("ROUTER_TIMEOUT", &raw)?,
            None => defaults.policy.rpc_timeout,
        };
        let refresh_interval = match var("REFRESH_INTERVAL") {
            Some(raw) => parse_duration("REFRESH_INTERVAL", &raw)?,
            None => defaults.policy.refresh_interval,
        };

        let local_target = match var("LOCAL_HOST") {
            Some(raw) => raw.parse()?,
            None => defaults.local_target,
        };

        let upstream_url = var("UPSTREAM_URL").unwrap_or(defaults.upstream_url);
        Url::parse(&upstream_url)
            .map_err(|e| RedirectError::ConfigError(format!("invalid UPSTREAM_URL '{upstream_url}': {e}")))?;

        Ok(Self {
            router_url,
            policy: RefreshPolicy::new(refresh_interval, rpc_timeout),
            local_target,
            upstream_url,
        })
    }

    /// Router client configuration derived from this config.
    pub fn router_config(&self) -> RouterConfig {
        RouterConfig::new(&self.router_url).with_timeout(self.policy.rpc_timeout)
    }
}

/// Shared application state.
pub struct AppState {
    pub config: ProxyConfig,
    pub scheduler: RefreshScheduler,
    pub upstream: reqwest::Client,
}

impl AppState {
    /// Creates state that discovers addresses from the configured router.
    pub fn new(config: ProxyConfig) -> Result<Self> {
        let client = RouterClient::with_config(config.router_config())?;
        Self::with_source(config, Arc::new(client))
    }

    /// Creates state around any address source.
    pub fn with_source(config: ProxyConfig, source: SharedSource) -> Result<Self> {
        let upstream = reqwest::Client::builder()
            .timeout(UPSTREAM_TIMEOUT)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| RedirectError::ConfigError(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            scheduler: RefreshScheduler::new(source, config.policy),
            config,
            upstream,
        })
    }
}
