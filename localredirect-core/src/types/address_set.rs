//! The router's public identity.

use std::net::IpAddr;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use ipnet::IpNet;
use serde::Serialize;

/// Addresses the router currently holds on its internet-facing side.
///
/// A set is replaced wholesale in the cache, never mutated field by field, so
/// the fields are only written at construction time.
#[derive(Clone, Debug, Serialize)]
pub struct AddressSet {
    /// WAN IPv4 address
    pub v4: Option<IpAddr>,
    /// WAN IPv6 address
    pub v6: Option<IpAddr>,
    /// Delegated IPv6 prefix (network address, masked)
    pub v6_prefix: Option<IpNet>,
    /// Monotonic time of the successful fetch
    #[serde(skip)]
    pub fetched_at: Instant,
    /// Wall-clock time of the successful fetch
    pub observed_at: DateTime<Utc>,
}

impl AddressSet {
    /// Creates a set stamped with the current time.
    pub fn new(v4: Option<IpAddr>, v6: Option<IpAddr>, v6_prefix: Option<IpNet>) -> Self {
        Self {
            v4,
            v6,
            v6_prefix: v6_prefix.map(|net| net.trunc()),
            fetched_at: Instant::now(),
            observed_at: Utc::now(),
        }
    }

    /// Overrides the monotonic fetch time.
    pub fn with_fetched_at(mut self, at: Instant) -> Self {
        self.fetched_at = at;
        self
    }

    /// A set is usable if the router reported at least one address.
    pub fn is_usable(&self) -> bool {
        self.v4.is_some() || self.v6.is_some() || self.v6_prefix.is_some()
    }

    /// Returns true once `refresh_interval` has fully elapsed since the fetch.
    pub fn is_stale(&self, now: Instant, refresh_interval: Duration) -> bool {
        match self.fetched_at.checked_add(refresh_interval) {
            Some(deadline) => now >= deadline,
            None => false,
        }
    }

    /// Tests whether a client address belongs to the router.
    ///
    /// Exact matches compare canonical forms, so an IPv4-mapped IPv6 client
    /// matches the plain IPv4 WAN address. The prefix matches by containment.
    pub fn matches(&self, ip: IpAddr) -> bool {
        let ip = ip.to_canonical();

        if self.v4.is_some_and(|v4| v4.to_canonical() == ip) {
            return true;
        }
        if self.v6.is_some_and(|v6| v6.to_canonical() == ip) {
            return true;
        }

        self.v6_prefix.is_some_and(|net| net.contains(&ip))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    fn net(s: &str) -> IpNet {
        s.parse().unwrap()
    }

    #[test]
    fn test_usable() {
        assert!(!AddressSet::new(None, None, None).is_usable());
        assert!(AddressSet::new(Some(ip("203.0.113.5")), None, None).is_usable());
        assert!(AddressSet::new(None, Some(ip("2001:db8::1")), None).is_usable());
        assert!(AddressSet::new(None, None, Some(net("2001:db8::/32"))).is_usable());
    }

    #[test]
    fn test_match_v4_exact() {
        let set = AddressSet::new(Some(ip("203.0.113.5")), None, None);
        assert!(set.matches(ip("203.0.113.5")));
        assert!(!set.matches(ip("203.0.113.6")));
    }

    #[test]
    fn test_match_v4_mapped() {
        let set = AddressSet::new(Some(ip("203.0.113.5")), None, None);
        assert!(set.matches(ip("::ffff:203.0.113.5")));
    }

    #[test]
    fn test_match_v6_exact() {
        let set = AddressSet::new(None, Some(ip("2001:db8::abcd")), None);
        assert!(set.matches(ip("2001:db8::abcd")));
        assert!(!set.matches(ip("2001:db8::abce")));
    }

    #[test]
    fn test_match_prefix() {
        let set = AddressSet::new(None, None, Some(net("2001:db8::/32")));
        assert!(set.matches(ip("2001:db8:1::1")));
        assert!(!set.matches(ip("2001:db9::1")));
        assert!(!set.matches(ip("203.0.113.5")));
    }

    #[test]
    fn test_prefix_is_truncated() {
        let set = AddressSet::new(None, None, Some(net("2001:db8:aa::1/48")));
        assert_eq!(set.v6_prefix, Some(net("2001:db8:aa::/48")));
    }

    #[test]
    fn test_staleness_boundary() {
        let t0 = Instant::now();
        let set = AddressSet::new(Some(ip("203.0.113.5")), None, None).with_fetched_at(t0);
        let interval = Duration::from_secs(30);

        assert!(!set.is_stale(t0, interval));
        assert!(!set.is_stale(t0 + Duration::from_millis(29_999), interval));
        assert!(set.is_stale(t0 + Duration::from_secs(30), interval));
        assert!(set.is_stale(t0 + Duration::from_secs(31), interval));
    }

    proptest! {
        #[test]
        fn prop_prefix_contains_every_host(hosts in any::<u128>(), len in 0u8..=128) {
            let base: std::net::Ipv6Addr = "2001:db8::".parse().unwrap();
            let prefix = IpNet::new(IpAddr::V6(base), len).unwrap();
            let set = AddressSet::new(None, None, Some(prefix));

            let host_mask = u128::MAX.checked_shr(u32::from(len)).unwrap_or(0);
            let network = u128::from(base) & !host_mask;
            let candidate = std::net::Ipv6Addr::from(network | (hosts & host_mask));

            prop_assert!(set.matches(IpAddr::V6(candidate)));
        }
    }
}
