//! Per-request refresh decisions.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, instrument, warn};

use localredirect_cache::{CacheState, DiscoveryCache};
use localredirect_core::error::Result;
use localredirect_core::traits::{AddressSource, SharedSource};
use localredirect_core::types::{AddressSet, RefreshPolicy};

/// Decides, per request, whether the router must be asked again.
///
/// - `NoData`: fetch inline; the request waits.
/// - `Stale`: spawn a background fetch; the request uses the stale snapshot.
/// - `Fresh`: nothing to do.
///
/// At most one background fetch runs at a time. Inline fetches are not
/// deduplicated, so overlapping first requests may each ask the router.
pub struct RefreshScheduler {
    source: SharedSource,
    cache: Arc<DiscoveryCache>,
    policy: RefreshPolicy,
    refreshing: Arc<AtomicBool>,
}

impl RefreshScheduler {
    /// Creates a scheduler with an empty cache.
    pub fn new(source: SharedSource, policy: RefreshPolicy) -> Self {
        Self {
            source,
            cache: Arc::new(DiscoveryCache::new()),
            policy,
            refreshing: Arc::new(AtomicBool::new(false)),
        }
    }

    /// The cache this scheduler feeds.
    pub fn cache(&self) -> &Arc<DiscoveryCache> {
        &self.cache
    }

    /// The refresh policy in effect.
    pub fn policy(&self) -> RefreshPolicy {
        self.policy
    }

    /// Current cache state relative to the refresh interval.
    pub fn state(&self) -> CacheState {
        self.cache.state(Instant::now(), self.policy.refresh_interval)
    }

    /// Runs the refresh decision for one request and returns the snapshot to
    /// match against.
    pub async fn snapshot(&self) -> Option<Arc<AddressSet>> {
        match self.state() {
            CacheState::NoData => {
                debug!("No router addresses yet, fetching inline");
                // Failure leaves us in NoData; the next request retries.
                let _ = self.refresh_now().await;
            }
            CacheState::Stale => {
                self.spawn_refresh();
            }
            CacheState::Fresh => {}
        }

        self.cache.read()
    }

    /// Fetches from the router and installs the result if it is usable.
    #[instrument(skip(self))]
    pub async fn refresh_now(&self) -> Result<()> {
        refresh(self.source.as_ref(), &self.cache).await
    }

    /// Starts a background refresh unless one is already running.
    ///
    /// Returns `true` if a task was spawned. Must be called from within a
    /// Tokio runtime.
    pub fn spawn_refresh(&self) -> bool {
        if self.refreshing.swap(true, Ordering::AcqRel) {
            debug!("Background refresh already in flight");
            return false;
        }

        let source = self.source.clone();
        let cache = self.cache.clone();
        let in_flight = InFlight(self.refreshing.clone());

        debug!("Router addresses stale, refreshing in background");
        tokio::spawn(async move {
            let _in_flight = in_flight;
            let _ = refresh(source.as_ref(), &cache).await;
        });
        true
    }
}

async fn refresh(source: &dyn AddressSource, cache: &DiscoveryCache) -> Result<()> {
    let candidate = source.fetch_all().await;
    match cache.replace(candidate) {
        Ok(()) => {
            info!("Router addresses refreshed");
            Ok(())
        }
        Err(e) => {
            warn!(error = %e, "Router refresh produced nothing usable, keeping previous addresses");
            Err(e)
        }
    }
}

/// Clears the in-flight flag when the background task ends, even by panic.
struct InFlight(Arc<AtomicBool>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::IpAddr;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    use async_trait::async_trait;
    use ipnet::IpNet;
    use localredirect_core::error::RedirectError;

    /// Answers the n-th IPv4 query with `answers[n]` (last entry repeats).
    struct ScriptedSource {
        calls: AtomicUsize,
        delay: Duration,
        answers: Vec<Option<&'static str>>,
    }

    impl ScriptedSource {
        fn new(answers: Vec<Option<&'static str>>) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                delay: Duration::ZERO,
                answers,
            }
        }

        fn slow(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl AddressSource for ScriptedSource {
        async fn external_ipv4(&self) -> Result<IpAddr> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            let answer = self.answers.get(n).or(self.answers.last()).copied().flatten();
            match answer {
                Some(ip) => Ok(ip.parse().unwrap()),
                None => Err(RedirectError::Transport("unreachable".into())),
            }
        }

        async fn external_ipv6(&self) -> Result<Option<IpAddr>> {
            Ok(None)
        }

        async fn ipv6_prefix(&self) -> Result<Option<IpNet>> {
            Ok(None)
        }
    }

    fn policy(refresh_ms: u64) -> RefreshPolicy {
        RefreshPolicy::new(Duration::from_millis(refresh_ms), Duration::from_secs(1))
    }

    fn scheduler(source: &Arc<ScriptedSource>, refresh_ms: u64) -> RefreshScheduler {
        RefreshScheduler::new(source.clone(), policy(refresh_ms))
    }

    async fn wait_for_v4(scheduler: &RefreshScheduler, expected: &str) {
        let expected: IpAddr = expected.parse().unwrap();
        for _ in 0..100 {
            if scheduler.cache().read().and_then(|set| set.v4) == Some(expected) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("cache never reached {expected}");
    }

    #[tokio::test]
    async fn test_first_request_fetches_inline() {
        let source = Arc::new(ScriptedSource::new(vec![Some("203.0.113.5")]));
        let scheduler = scheduler(&source, 60_000);

        let snapshot = scheduler.snapshot().await.unwrap();
        assert_eq!(snapshot.v4, Some("203.0.113.5".parse().unwrap()));
        assert_eq!(source.calls(), 1);
        assert_eq!(scheduler.state(), CacheState::Fresh);
    }

    #[tokio::test]
    async fn test_fresh_cache_does_not_fetch() {
        let source = Arc::new(ScriptedSource::new(vec![Some("203.0.113.5")]));
        let scheduler = scheduler(&source, 60_000);

        scheduler.snapshot().await;
        scheduler.snapshot().await;
        scheduler.snapshot().await;
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn test_failures_keep_retrying_inline() {
        let source = Arc::new(ScriptedSource::new(vec![None, None, Some("203.0.113.5")]));
        let scheduler = scheduler(&source, 60_000);

        assert!(scheduler.snapshot().await.is_none());
        assert_eq!(scheduler.state(), CacheState::NoData);
        assert!(scheduler.snapshot().await.is_none());
        assert!(scheduler.snapshot().await.is_some());
        assert_eq!(source.calls(), 3);
    }

    #[tokio::test]
    async fn test_refresh_now_reports_no_usable_data() {
        let source = Arc::new(ScriptedSource::new(vec![None]));
        let scheduler = scheduler(&source, 60_000);

        assert!(matches!(
            scheduler.refresh_now().await,
            Err(RedirectError::NoUsableData)
        ));
    }

    #[tokio::test]
    async fn test_stale_serves_old_and_refreshes_in_background() {
        let source = Arc::new(
            ScriptedSource::new(vec![Some("203.0.113.5"), Some("198.51.100.7")])
                .slow(Duration::from_millis(20)),
        );
        let scheduler = scheduler(&source, 10);

        scheduler.snapshot().await;
        tokio::time::sleep(Duration::from_millis(15)).await;
        assert_eq!(scheduler.state(), CacheState::Stale);

        let stale = scheduler.snapshot().await.unwrap();
        assert_eq!(stale.v4, Some("203.0.113.5".parse().unwrap()));

        wait_for_v4(&scheduler, "198.51.100.7").await;
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn test_failed_background_refresh_keeps_snapshot() {
        let source = Arc::new(ScriptedSource::new(vec![Some("203.0.113.5"), None]));
        let scheduler = scheduler(&source, 10);

        scheduler.snapshot().await;
        tokio::time::sleep(Duration::from_millis(15)).await;
        scheduler.snapshot().await;

        for _ in 0..50 {
            if source.calls() >= 2 && !scheduler.refreshing.load(Ordering::Acquire) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(source.calls(), 2);
        assert_eq!(
            scheduler.cache().read().unwrap().v4,
            Some("203.0.113.5".parse().unwrap())
        );
    }

    #[tokio::test]
    async fn test_single_background_refresh_in_flight() {
        let source = Arc::new(
            ScriptedSource::new(vec![Some("203.0.113.5")]).slow(Duration::from_millis(5)),
        );
        let scheduler = Arc::new(scheduler(&source, 10));

        scheduler.snapshot().await;
        tokio::time::sleep(Duration::from_millis(15)).await;

        assert!(scheduler.spawn_refresh());
        assert!(!scheduler.spawn_refresh());
        assert!(!scheduler.spawn_refresh());

        for _ in 0..50 {
            if !scheduler.refreshing.load(Ordering::Acquire) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(source.calls(), 2);
        assert!(!scheduler.refreshing.load(Ordering::Acquire));
    }
}
