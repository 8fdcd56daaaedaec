//! HTTP transport for the router's SOAP control endpoint.

use std::net::IpAddr;
use std::time::Duration;

use async_trait::async_trait;
use ipnet::IpNet;
use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use url::Url;

use localredirect_core::constants::{
    ACTION_EXTERNAL_IPV4, ACTION_EXTERNAL_IPV6, ACTION_IPV6_PREFIX, DEFAULT_ROUTER_URL,
    DEFAULT_RPC_TIMEOUT_SECS, WAN_IP_CONNECTION_PATH,
};
use localredirect_core::error::{RedirectError, Result};
use localredirect_core::traits::AddressSource;

use crate::parser::{parse_external_ipv4, parse_external_ipv6, parse_fault, parse_ipv6_prefix};
use crate::soap::{envelope, soap_action};

/// Router client configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RouterConfig {
    /// Base URL of the management endpoint (scheme, host, port)
    pub base_url: String,
    /// Ceiling on each SOAP call
    pub timeout: Duration,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_ROUTER_URL.into(),
            timeout: Duration::from_secs(DEFAULT_RPC_TIMEOUT_SECS),
        }
    }
}

impl RouterConfig {
    /// Creates a configuration for the given base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Sets the per-call timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// SOAP client for the WAN address queries.
pub struct RouterClient {
    config: RouterConfig,
    control_url: Url,
    http_client: reqwest::Client,
}

impl RouterClient {
    /// Creates a client, validating the base URL.
    pub fn with_config(config: RouterConfig) -> Result<Self> {
        let control_url = Url::parse(&config.base_url)
            .and_then(|base| base.join(WAN_IP_CONNECTION_PATH))
            .map_err(|e| {
                RedirectError::ConfigError(format!("invalid router URL '{}': {e}", config.base_url))
            })?;

        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| RedirectError::ConfigError(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            config,
            control_url,
            http_client,
        })
    }

    /// Invokes `action` and returns the raw response body.
    #[instrument(skip(self))]
    async fn call(&self, action: &'static str) -> Result<String> {
        let response = self
            .http_client
            .post(self.control_url.clone())
            .header(CONTENT_TYPE, r#"text/xml; charset="utf-8""#)
            .header("SOAPAction", soap_action(action))
            .body(envelope(action))
            .send()
            .await
            .map_err(|e| self.transport_error(action, e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| self.transport_error(action, e))?;

        if !status.is_success() {
            let reason = parse_fault(&body).unwrap_or_else(|| "no fault description".into());
            return Err(RedirectError::Transport(format!(
                "{action} returned HTTP {status}: {reason}"
            )));
        }

        debug!(action, bytes = body.len(), "Router responded");
        Ok(body)
    }

    fn transport_error(&self, action: &str, err: reqwest::Error) -> RedirectError {
        if err.is_timeout() {
            RedirectError::Timeout {
                action: action.to_string(),
                timeout: self.config.timeout,
            }
        } else {
            RedirectError::Transport(format!("{action}: {err}"))
        }
    }
}

#[async_trait]
impl AddressSource for RouterClient {
    async fn external_ipv4(&self) -> Result<IpAddr> {
        let body = self.call(ACTION_EXTERNAL_IPV4).await?;
        parse_external_ipv4(&body)
    }

    async fn external_ipv6(&self) -> Result<Option<IpAddr>> {
        let body = self.call(ACTION_EXTERNAL_IPV6).await?;
        parse_external_ipv6(&body)
    }

    async fn ipv6_prefix(&self) -> Result<Option<IpNet>> {
        let body = self.call(ACTION_IPV6_PREFIX).await?;
        parse_ipv6_prefix(&body)
    }
}
