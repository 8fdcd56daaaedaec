//! Domain types for localredirect.
//!
//! - [`AddressSet`]: the router's public identity as last discovered
//! - [`RefreshPolicy`]: how often to rediscover and how long to wait for the router
//! - [`LocalTarget`]: where local clients get redirected to

mod address_set;
mod policy;
mod target;

pub use address_set::*;
pub use policy::*;
pub use target::*;
