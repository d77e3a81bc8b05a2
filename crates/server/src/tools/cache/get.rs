//! cache_get tool implementation.
//!
//! Retrieves a stored entry by request URL and method.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_core::{AppConfig, Error, Registration, RequestDescriptor};

use crate::tools::{ResponseView, json_result, target_generation};

/// Parameters for the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetParams {
    /// Absolute URL, or a path resolved against the application origin.
    pub url: String,

    /// HTTP method (default: GET).
    #[serde(default = "default_method")]
    pub method: String,

    /// Generation to read (default: the active one).
    #[serde(default)]
    pub generation: Option<String>,
}

fn default_method() -> String {
    "GET".into()
}

/// Output from the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetOutput {
    pub generation: String,
    /// SHA-256 key of `METHOD\nURL`.
    pub key: String,
    pub stored_at: String,
    pub response: ResponseView,
}

/// Implementation of the cache_get tool.
pub async fn get_impl(
    registration: &Registration, config: &AppConfig, params: CacheGetParams,
) -> Result<CallToolResult, McpError> {
    let generation = target_generation(registration, params.generation)?;
    let origin = config.origin_url().map_err(|e| Error::InvalidInput(e.to_string()))?;
    let key = RequestDescriptor::resolve(&origin, &params.url)?
        .with_method(&params.method)
        .key();

    let entry = registration
        .store()
        .get_entry(&generation, &key)
        .await?
        .ok_or_else(|| Error::CacheMiss(format!("{key} in {generation}")))?;

    let output = CacheGetOutput {
        generation: entry.generation,
        key: entry.key.hash(),
        stored_at: entry.stored_at,
        response: ResponseView::from(&entry.response),
    };
    json_result(&output)
}
