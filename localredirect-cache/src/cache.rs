//! In-memory snapshot of the router's identity.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwapOption;
use serde::Serialize;
use tracing::{debug, info};

use localredirect_core::error::{RedirectError, Result};
use localredirect_core::types::AddressSet;

/// Freshness of the cached snapshot relative to a refresh interval.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheState {
    /// Nothing usable has ever been installed
    NoData,
    /// A snapshot exists and is younger than the refresh interval
    Fresh,
    /// A snapshot exists but the refresh interval has elapsed
    Stale,
}

/// Cache for the most recent usable address set.
///
/// Readers load the current `Arc` without locking and work on an immutable
/// snapshot; a replace swaps the pointer in one atomic store.
pub struct DiscoveryCache {
    current: ArcSwapOption<AddressSet>,
    installs: AtomicU64,
    rejected: AtomicU64,
}

impl DiscoveryCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self {
            current: ArcSwapOption::empty(),
            installs: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
        }
    }

    /// Returns the current snapshot, if any.
    pub fn read(&self) -> Option<Arc<AddressSet>> {
        self.current.load_full()
    }

    /// Installs `candidate` if it carries at least one address.
    ///
    /// An unusable candidate leaves the cache untouched and yields
    /// [`RedirectError::NoUsableData`].
    pub fn replace(&self, candidate: AddressSet) -> Result<()> {
        if !candidate.is_usable() {
            self.rejected.fetch_add(1, Ordering::Relaxed);
            debug!("Discarding empty address set");
            return Err(RedirectError::NoUsableData);
        }

        info!(
            v4 = ?candidate.v4,
            v6 = ?candidate.v6,
            v6_prefix = ?candidate.v6_prefix,
            "Installing router addresses"
        );

        self.current.store(Some(Arc::new(candidate)));
        self.installs.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// True if nothing was ever installed or the snapshot has aged past `refresh_interval`.
    pub fn is_stale(&self, now: Instant, refresh_interval: Duration) -> bool {
        self.state(now, refresh_interval) != CacheState::Fresh
    }

    /// Classifies the snapshot for the refresh scheduler.
    pub fn state(&self, now: Instant, refresh_interval: Duration) -> CacheState {
        let current = self.current.load();
        match &*current {
            None => CacheState::NoData,
            Some(set) if set.is_stale(now, refresh_interval) => CacheState::Stale,
            Some(_) => CacheState::Fresh,
        }
    }

    /// Returns cache statistics.
    pub fn stats(&self) -> CacheStats {
        let current = self.read();
        CacheStats {
            installs: self.installs.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            populated: current.is_some(),
            age: current.map(|set| set.fetched_at.elapsed()),
        }
    }
}

impl Default for DiscoveryCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Cache statistics.
#[derive(Clone, Debug)]
pub struct CacheStats {
    pub installs: u64,
    pub rejected: u64,
    pub populated: bool,
    pub age: Option<Duration>,
}
