//! # Router client
//!
//! Talks to the router's UPnP IGD control endpoint and decodes the three
//! WAN address queries used for discovery:
//!
//! - `GetExternalIPAddress` → WAN IPv4
//! - `X_AVM_DE_GetExternalIPv6Address` → WAN IPv6
//! - `X_AVM_DE_GetIPv6Prefix` → delegated IPv6 prefix
//!
//! ## Example
//!
//! ```rust,ignore
//! use localredirect_core::AddressSource;
//! use localredirect_router::{RouterClient, RouterConfig};
//!
//! let client = RouterClient::with_config(RouterConfig::new("http://192.168.178.1:49000"))?;
//! let addresses = client.fetch_all().await;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod client;
mod parser;
mod soap;

pub use client::{RouterClient, RouterConfig};
pub use parser::{parse_external_ipv4, parse_external_ipv6, parse_fault, parse_ipv6_prefix};
pub use soap::{envelope, soap_action};
