//! Activation-time cleanup of superseded cache generations.

use schemars::JsonSchema;
use serde::Serialize;

use crate::Error;
use crate::cache::CacheDb;

/// What activation did to the store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, JsonSchema)]
pub struct ActivationReport {
    pub current: String,
    pub deleted: Vec<String>,
    /// Generations whose deletion failed; they stay until the next activation.
    pub failed: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct GenerationManager {
    store: CacheDb,
}

impl GenerationManager {
    pub fn new(store: CacheDb) -> Self {
        Self { store }
    }

    /// Mark `current` active, then delete every other generation.
    ///
    /// # Errors
    ///
    /// Fails when `current` does not exist, before anything is deleted, or
    /// when generations cannot be listed. A failed deletion only logs.
    pub async fn activate(&self, current: &str) -> Result<ActivationReport, Error> {
        self.promote(current).await?;
        self.cleanup(current).await
    }

    /// Mark `current` as the active generation.
    ///
    /// Fails with `GENERATION_MISSING` when it is gone, leaving the store
    /// untouched.
    pub async fn promote(&self, current: &str) -> Result<(), Error> {
        self.store.mark_generation_active(current).await
    }

    /// Delete every generation except `current`.
    pub async fn cleanup(&self, current: &str) -> Result<ActivationReport, Error> {
        let generations = self.store.list_generations().await?;
        let mut report = ActivationReport { current: current.to_string(), ..Default::default() };

        for info in generations.into_iter().filter(|g| g.tag != current) {
            match self.store.delete_generation(&info.tag).await {
                Ok(_) => {
                    tracing::info!(generation = %info.tag, entries = info.entries, "deleted superseded generation");
                    report.deleted.push(info.tag);
                }
                Err(e) => {
                    tracing::warn!(generation = %info.tag, error = %e, "failed to delete superseded generation");
                    report.failed.push(info.tag);
                }
            }
        }

        Ok(report)
    }

    /// Cap opaque entries in `current` at `keep`.
    pub async fn purge_opaque(&self, current: &str, keep: usize) -> Result<u64, Error> {
        let deleted = self.store.purge_opaque(current, keep).await?;
        if deleted > 0 {
            tracing::info!(generation = current, deleted, "purged opaque entries");
        }
        Ok(deleted)
    }
}
