//! Install-time seeding of the static asset manifest.
//!
//! All-or-nothing: every manifest URL is fetched before anything is written,
//! and the writes happen in one transaction. A single failure leaves the
//! store exactly as it was.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use super::manifest::AssetManifest;
use crate::Error;
use crate::cache::CacheDb;
use crate::network::Network;
use crate::response::CapturedResponse;

/// Outcome of a successful install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedReport {
    pub generation: String,
    pub entries: usize,
    pub bytes: u64,
}

pub struct Seeder {
    store: CacheDb,
    network: Arc<dyn Network>,
    concurrency: usize,
}

impl Seeder {
    pub fn new(store: CacheDb, network: Arc<dyn Network>, concurrency: usize) -> Self {
        Self { store, network, concurrency: concurrency.max(1) }
    }

    /// Fetch every manifest entry and write them into generation `tag`.
    ///
    /// # Errors
    ///
    /// `SeedFailed` naming the first entry that hit a transport error or a
    /// non-2xx status. Outstanding fetches are aborted and nothing is
    /// written.
    pub async fn seed(&self, tag: &str, manifest: &AssetManifest) -> Result<SeedReport, Error> {
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut join_set = JoinSet::new();

        for (index, request) in manifest.requests().enumerate() {
            let network = Arc::clone(&self.network);
            let semaphore = Arc::clone(&semaphore);
            join_set.spawn(async move {
                let _permit = semaphore.acquire_owned().await;
                let result = network.fetch(&request).await;
                (index, request, result)
            });
        }

        let mut fetched: Vec<Option<CapturedResponse>> = vec![None; manifest.len()];

        while let Some(joined) = join_set.join_next().await {
            let (index, request, result) = match joined {
                Ok(item) => item,
                Err(e) => {
                    join_set.abort_all();
                    return Err(Error::SeedFailed { url: "<task>".into(), reason: e.to_string() });
                }
            };

            let failure = match result {
                Ok(response) if response.is_ok() => {
                    fetched[index] = Some(response);
                    None
                }
                Ok(response) => Some(format!("status {}", response.status)),
                Err(e) => Some(e.to_string()),
            };

            if let Some(reason) = failure {
                join_set.abort_all();
                tracing::warn!(url = %request.url, %reason, generation = tag, "install seeding failed");
                return Err(Error::SeedFailed { url: request.url.to_string(), reason });
            }
        }

        let mut entries = Vec::with_capacity(fetched.len());
        let mut bytes = 0u64;
        for (request, response) in manifest.requests().zip(fetched) {
            let response = response.ok_or_else(|| Error::SeedFailed {
                url: request.url.to_string(),
                reason: "missing response".into(),
            })?;
            bytes += response.body.len() as u64;
            entries.push((request.key(), response));
        }

        let written = self.store.seed_generation(tag, entries).await?;
        tracing::info!(generation = tag, entries = written, bytes, "seeded cache generation");

        Ok(SeedReport { generation: tag.to_string(), entries: written, bytes })
    }
}
