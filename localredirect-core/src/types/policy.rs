//! Refresh timing.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_REFRESH_INTERVAL_SECS, DEFAULT_RPC_TIMEOUT_SECS};
use crate::error::{RedirectError, Result};

/// How often the router is asked again, and how long each call may take.
///
/// Immutable after startup.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshPolicy {
    /// Minimum age before a cached address set is considered stale
    pub refresh_interval: Duration,
    /// Ceiling on each router call
    pub rpc_timeout: Duration,
}

impl Default for RefreshPolicy {
    fn default() -> Self {
        Self {
            refresh_interval: Duration::from_secs(DEFAULT_REFRESH_INTERVAL_SECS),
            rpc_timeout: Duration::from_secs(DEFAULT_RPC_TIMEOUT_SECS),
        }
    }
}

impl RefreshPolicy {
    /// Creates a policy from explicit durations.
    pub fn new(refresh_interval: Duration, rpc_timeout: Duration) -> Self {
        Self {
            refresh_interval,
            rpc_timeout,
        }
    }

    /// Parses human-readable durations such as `"30s"` or `"1m 30s"`.
    pub fn parse(refresh_interval: &str, rpc_timeout: &str) -> Result<Self> {
        Ok(Self::new(
            parse_duration("refresh interval", refresh_interval)?,
            parse_duration("rpc timeout", rpc_timeout)?,
        ))
    }
}

/// Parses a human-readable duration, rejecting zero.
pub fn parse_duration(what: &str, raw: &str) -> Result<Duration> {
    let duration = humantime::parse_duration(raw.trim())
        .map_err(|e| RedirectError::ConfigError(format!("invalid {what} '{raw}': {e}")))?;

    if duration.is_zero() {
        return Err(RedirectError::ConfigError(format!("{what} must be greater than zero")));
    }

    Ok(duration)
}
