//! Snapshot cache for discovered router addresses.
//!
//! Holds at most one [`AddressSet`](localredirect_core::AddressSet), replaced
//! as a whole so readers never observe a partially written set.

mod cache;

pub use cache::{CacheState, CacheStats, DiscoveryCache};
