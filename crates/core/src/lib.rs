//! Core types and shared functionality for swcache.
//!
//! This crate provides:
//! - Versioned cache store with SQLite backend
//! - Request/response model and URL canonicalization
//! - The caching worker (install, activate, fetch routing, messages)
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod network;
pub mod request;
pub mod response;
pub mod url;
pub mod worker;

pub use cache::{CacheDb, CacheEntry, EntrySummary, GenerationInfo};
pub use config::{AppConfig, ConfigError};
pub use error::Error;
pub use network::Network;
pub use request::{CacheMode, Destination, RequestDescriptor, RequestKey, RequestMode};
pub use response::{CapturedResponse, ResponseKind};
pub use worker::{
    ControlMessage, FetchDecision, FetchEvent, FetchOutcome, MessageReply, Registration, ResponseSource,
    ServiceWorker, StaticCapabilities, Strategy, WorkerSettings, WorkerState,
};
