//! sw_fetch tool implementation.
//!
//! Dispatches a fetch event through the registration, the way a page
//! request would reach the worker.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_core::{
    AppConfig, CacheMode, Destination, Error, FetchDecision, FetchEvent, Registration, RequestDescriptor,
    RequestMode, ResponseSource, Strategy,
};

use crate::tools::{ResponseView, json_result};

/// Parameters for the sw_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwFetchParams {
    /// Absolute URL, or a path resolved against the application origin.
    pub url: String,

    /// HTTP method (default: GET).
    #[serde(default = "default_method")]
    pub method: String,

    /// Request destination: document, script, style, font, image, worker,
    /// manifest or empty (default).
    #[serde(default)]
    pub destination: Option<String>,

    /// Request mode (default: cors; navigate for page loads).
    #[serde(default)]
    pub mode: RequestMode,

    /// Bypass intermediate HTTP caches.
    #[serde(default)]
    pub reload: bool,

    /// Wait for a background revalidation before returning.
    #[serde(default)]
    pub wait_for_revalidation: bool,
}

fn default_method() -> String {
    "GET".into()
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct SwFetchOutput {
    /// Matching rule name, or null when passed through.
    pub rule: Option<String>,
    pub strategy: Option<Strategy>,
    pub source: ResponseSource,
    pub revalidating: bool,
    pub response: ResponseView,
}

/// Implementation of the sw_fetch tool.
pub async fn fetch_impl(
    registration: &Registration, config: &AppConfig, params: SwFetchParams,
) -> Result<CallToolResult, McpError> {
    if params.url.trim().is_empty() {
        return Err(Error::InvalidInput("url cannot be empty".into()).into());
    }

    let origin = config.origin_url().map_err(|e| Error::InvalidInput(e.to_string()))?;
    let destination: Destination = params.destination.as_deref().unwrap_or_default().parse()?;

    let mut request = RequestDescriptor::resolve(&origin, &params.url)?
        .with_method(&params.method)
        .with_destination(destination)
        .with_mode(params.mode);
    if params.reload {
        request = request.with_cache(CacheMode::Reload);
    }
    if request.is_navigation() && params.destination.is_none() {
        request = request.with_destination(Destination::Document);
    }

    let rule = match registration.decide(&request) {
        FetchDecision::Passthrough => None,
        FetchDecision::Intercept { rule, .. } => Some(rule),
    };

    let outcome = registration.handle_fetch(FetchEvent::new(request)).await?;
    let mut revalidating = outcome.revalidation.is_some();
    if params.wait_for_revalidation
        && let Some(handle) = outcome.revalidation
    {
        if let Err(e) = handle.await {
            tracing::warn!(error = %e, "revalidation task failed");
        }
        revalidating = false;
    }

    let output = SwFetchOutput {
        rule,
        strategy: outcome.strategy,
        source: outcome.source,
        revalidating,
        response: ResponseView::from(&outcome.response),
    };
    json_result(&output)
}
