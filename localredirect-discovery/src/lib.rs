//! # Discovery
//!
//! Keeps the router address cache fresh without holding up requests.
//!
//! Every request asks the [`RefreshScheduler`] for a snapshot. With no data
//! yet, the request waits for a fetch. With stale data, the request gets the
//! stale snapshot while a background task fetches a new one.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod scheduler;

pub use scheduler::RefreshScheduler;
