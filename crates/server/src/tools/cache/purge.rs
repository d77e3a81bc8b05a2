//! cache_purge tool implementation.
//!
//! Drops a single entry, caps opaque entries, clears a generation's
//! entries, or deletes a superseded generation outright.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_core::{AppConfig, Error, Registration, RequestDescriptor};

use crate::tools::{json_result, target_generation};

/// Parameters for the cache_purge tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CachePurgeParams {
    /// Generation to purge (default: the active one).
    #[serde(default)]
    pub generation: Option<String>,

    /// Remove the GET entry for this URL (absolute, or a path resolved
    /// against the application origin).
    #[serde(default)]
    pub url: Option<String>,

    /// Keep only the newest N opaque entries.
    #[serde(default)]
    pub opaque_keep: Option<usize>,

    /// Remove every entry of the generation.
    #[serde(default)]
    pub all_entries: bool,

    /// Delete the generation itself. Refused for the active and waiting
    /// generations.
    #[serde(default)]
    pub delete_generation: bool,
}

/// Output from the cache_purge tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CachePurgeOutput {
    pub generation: String,
    /// Number of entries deleted.
    pub deleted: u64,
    pub generation_deleted: bool,
}

/// Implementation of the cache_purge tool.
pub async fn purge_impl(
    registration: &Registration, config: &AppConfig, params: CachePurgeParams,
) -> Result<CallToolResult, McpError> {
    if params.url.is_none() && params.opaque_keep.is_none() && !params.all_entries && !params.delete_generation {
        return Err(Error::InvalidInput(
            "At least one of url, opaque_keep, all_entries, or delete_generation must be specified".to_string(),
        )
        .into());
    }

    let generation = target_generation(registration, params.generation)?;
    let store = registration.store();
    let mut output = CachePurgeOutput { generation: generation.clone(), deleted: 0, generation_deleted: false };

    if params.delete_generation {
        if registration.active().is_some_and(|w| w.generation() == generation) {
            return Err(Error::InvalidState(format!("{generation} is the active generation")).into());
        }
        if registration.waiting().is_some_and(|w| w.generation() == generation) {
            return Err(Error::InvalidState(format!("{generation} belongs to the waiting worker")).into());
        }
        output.deleted = store.count_entries(&generation).await?;
        output.generation_deleted = store.delete_generation(&generation).await?;
        if !output.generation_deleted {
            return Err(Error::GenerationMissing(generation).into());
        }
        return json_result(&output);
    }

    if let Some(url) = params.url {
        let origin = config.origin_url().map_err(|e| Error::InvalidInput(e.to_string()))?;
        let key = RequestDescriptor::resolve(&origin, &url)?.key();
        if store.delete_entry(&generation, &key).await? {
            output.deleted += 1;
        }
    }

    if let Some(keep) = params.opaque_keep {
        output.deleted += store.purge_opaque(&generation, keep).await?;
    }

    if params.all_entries {
        output.deleted += store.purge_generation_entries(&generation).await?;
    }

    tracing::info!(generation = %generation, deleted = output.deleted, "cache purged");
    json_result(&output)
}
