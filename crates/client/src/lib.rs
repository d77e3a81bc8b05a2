//! Client code for swcache.
//!
//! This crate provides the HTTP transport the caching worker fetches through
//! when it runs outside the test host.

pub mod fetch;

pub use fetch::{FetchClient, FetchConfig};
