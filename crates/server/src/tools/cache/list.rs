//! cache_list tool implementation.
//!
//! Lists generations, and the entries of one of them.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_core::{EntrySummary, GenerationInfo, Registration};

use crate::tools::json_result;

/// Parameters for the cache_list tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CacheListParams {
    /// List this generation's entries (default: the active one, if any).
    #[serde(default)]
    pub generation: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheListOutput {
    pub generations: Vec<GenerationInfo>,
    /// Generation whose entries are listed.
    pub generation: Option<String>,
    pub entries: Vec<EntrySummary>,
}

/// Implementation of the cache_list tool.
pub async fn list_impl(registration: &Registration, params: CacheListParams) -> Result<CallToolResult, McpError> {
    let store = registration.store();
    let generations = store.list_generations().await?;

    let generation = params
        .generation
        .filter(|tag| !tag.is_empty())
        .or_else(|| registration.active().map(|w| w.generation().to_string()));

    let entries = match &generation {
        Some(tag) => store.list_entries(tag).await?,
        None => Vec::new(),
    };

    json_result(&CacheListOutput { generations, generation, entries })
}
