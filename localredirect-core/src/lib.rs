//! # localredirect core
//!
//! Core types, errors, and traits shared by every localredirect crate.
//!
//! - **Types**: the discovered router identity ([`AddressSet`]), refresh timing
//!   ([`RefreshPolicy`]) and the internal redirect target ([`LocalTarget`])
//! - **Errors**: the discovery error taxonomy ([`RedirectError`])
//! - **Constants**: router protocol names and configuration defaults
//! - **Traits**: [`AddressSource`], the seam between discovery and the router
//!
//! ## Example
//!
//! ```rust
//! use localredirect_core::AddressSet;
//!
//! let set = AddressSet::new(Some("203.0.113.5".parse().unwrap()), None, None);
//! assert!(set.is_usable());
//! assert!(set.matches("203.0.113.5".parse().unwrap()));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, clippy::all)]

pub mod constants;
pub mod error;
pub mod traits;
pub mod types;

pub use constants::*;
pub use error::{RedirectError, Result};
pub use traits::*;
pub use types::*;
