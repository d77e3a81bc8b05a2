//! SQLite-backed store for cache generations and their entries.
//!
//! This module provides the persistent side of the worker cache using
//! SQLite with async access via tokio-rusqlite. It supports:
//!
//! - Named, versioned generations (one per deployed build)
//! - Entries keyed by SHA-256 of method + canonical URL
//! - Transactional seeding for all-or-nothing installs
//! - Automatic schema migrations
//! - WAL mode for concurrent access
//! - Opaque-entry capping and whole-generation purges

pub mod connection;
pub mod entries;
pub mod generations;
pub mod hash;
pub mod migrations;

pub use crate::Error;

pub use connection::CacheDb;
pub use entries::{CacheEntry, EntrySummary};
pub use generations::GenerationInfo;
