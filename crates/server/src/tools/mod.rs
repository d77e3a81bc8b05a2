//! MCP tool implementations.
//!
//! `sw_*` tools drive the worker lifecycle; `cache_*` tools inspect and
//! trim the store.

pub mod cache;
pub mod worker;

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_core::cache::hash::body_digest;
use swcache_core::{CapturedResponse, Error, Registration, ResponseKind};

/// A captured response as tools report it.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ResponseView {
    pub url: String,
    pub status: u16,
    pub status_text: String,
    pub kind: ResponseKind,
    pub redirected: bool,
    pub content_type: Option<String>,
    pub headers: Vec<(String, String)>,
    pub body_len: usize,
    /// Hex SHA-256 of the body.
    pub body_sha256: String,
    /// Body as text, when it is valid UTF-8.
    pub body_text: Option<String>,
}

impl From<&CapturedResponse> for ResponseView {
    fn from(response: &CapturedResponse) -> Self {
        Self {
            url: response.url.clone(),
            status: response.status,
            status_text: response.status_text.clone(),
            kind: response.kind,
            redirected: response.redirected,
            content_type: response.content_type().map(str::to_string),
            headers: response.headers.clone(),
            body_len: response.body.len(),
            body_sha256: body_digest(&response.body),
            body_text: std::str::from_utf8(&response.body).ok().map(str::to_string),
        }
    }
}

/// Serialize tool output as pretty JSON text content.
pub(crate) fn json_result<T: Serialize>(output: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

/// Generation a cache tool should look at: the explicit one, else the
/// active worker's.
pub(crate) fn target_generation(registration: &Registration, explicit: Option<String>) -> Result<String, Error> {
    match explicit {
        Some(tag) if !tag.is_empty() => Ok(tag),
        _ => registration
            .active()
            .map(|worker| worker.generation().to_string())
            .ok_or(Error::NoActiveWorker),
    }
}
