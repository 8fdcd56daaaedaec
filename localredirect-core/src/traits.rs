//! Common traits for localredirect.
//!
//! [`AddressSource`] separates the discovery machinery from the transport that
//! talks to the router, so the scheduler can be exercised with in-memory
//! sources in tests.

use std::net::IpAddr;
use std::sync::Arc;

use async_trait::async_trait;
use ipnet::IpNet;
use tracing::{debug, warn};

use crate::error::{RedirectError, Result};
use crate::types::AddressSet;

// ═══════════════════════════════════════════════════════════════════════════════
// ADDRESS SOURCE TRAIT
// ═══════════════════════════════════════════════════════════════════════════════

/// Interface to the router's management endpoint.
///
/// Each query is independent. `Ok(None)` means the router reported that
/// nothing is currently assigned, which is not an error.
#[async_trait]
pub trait AddressSource: Send + Sync {
    /// Queries the WAN IPv4 address.
    async fn external_ipv4(&self) -> Result<IpAddr>;

    /// Queries the WAN IPv6 address.
    async fn external_ipv6(&self) -> Result<Option<IpAddr>>;

    /// Queries the delegated IPv6 prefix.
    async fn ipv6_prefix(&self) -> Result<Option<IpNet>>;

    /// Runs all three queries concurrently and joins them into one candidate.
    ///
    /// A failing query leaves only its own field empty. The result may be
    /// unusable; deciding whether to keep it is up to the caller.
    async fn fetch_all(&self) -> AddressSet {
        let (v4, v6, prefix) = futures::join!(
            self.external_ipv4(),
            self.external_ipv6(),
            self.ipv6_prefix()
        );

        let v4 = v4.map_err(|e| log_failure("WAN IPv4", &e)).ok();
        let v6 = v6.map_err(|e| log_failure("WAN IPv6", &e)).ok().flatten();
        let prefix = prefix
            .map_err(|e| log_failure("IPv6 prefix", &e))
            .ok()
            .flatten();

        debug!(?v4, ?v6, ?prefix, "Router lookup finished");
        AddressSet::new(v4, v6, prefix)
    }
}

/// Logs a failed lookup, separating unusable answers from unreachable routers.
fn log_failure(query: &str, err: &RedirectError) {
    if err.is_parse_error() {
        warn!(query, error = %err, "Router answered with an unusable response");
    } else {
        warn!(query, error = %err, recoverable = err.is_recoverable(), "Router lookup failed");
    }
}

/// Shared handle to an address source.
pub type SharedSource = Arc<dyn AddressSource>;
