//! Host capability probing.
//!
//! Platform features (navigation preload, client claiming) are queried
//! through [`HostCapabilities`] so lifecycle logic stays testable without a
//! browser runtime.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::Error;

/// What the embedding environment can do for the worker.
#[async_trait]
pub trait HostCapabilities: Send + Sync {
    fn supports_navigation_preload(&self) -> bool;

    async fn enable_navigation_preload(&self) -> Result<(), Error>;

    /// Take control of already-open pages (`clients.claim()`).
    async fn claim_clients(&self) -> Result<(), Error>;
}

/// Fixed capability set.
///
/// Used by headless hosts (which support nothing optional) and by tests,
/// which also read back what the worker asked for.
#[derive(Debug, Default)]
pub struct StaticCapabilities {
    navigation_preload: bool,
    preload_enabled: AtomicBool,
    claims: AtomicUsize,
}

impl StaticCapabilities {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_navigation_preload() -> Self {
        Self { navigation_preload: true, ..Default::default() }
    }

    pub fn preload_enabled(&self) -> bool {
        self.preload_enabled.load(Ordering::SeqCst)
    }

    pub fn claims(&self) -> usize {
        self.claims.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HostCapabilities for StaticCapabilities {
    fn supports_navigation_preload(&self) -> bool {
        self.navigation_preload
    }

    async fn enable_navigation_preload(&self) -> Result<(), Error> {
        if !self.navigation_preload {
            return Err(Error::Host("navigation preload unsupported".into()));
        }
        self.preload_enabled.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn claim_clients(&self) -> Result<(), Error> {
        self.claims.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
