//! sw_status tool implementation.
//!
//! Reports the active and waiting workers and every stored generation.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_core::worker::RegistrationStatus;
use swcache_core::{AppConfig, GenerationInfo, Registration};

use crate::tools::json_result;

/// Parameters for the sw_status tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct SwStatusParams {}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct SwStatusOutput {
    /// Generation tag the loaded configuration would install.
    pub configured_generation: String,
    pub registration: RegistrationStatus,
    pub generations: Vec<GenerationInfo>,
}

/// Implementation of the sw_status tool.
pub async fn status_impl(
    registration: &Registration, config: &AppConfig, _params: SwStatusParams,
) -> Result<CallToolResult, McpError> {
    let generations = registration.store().list_generations().await?;
    let output = SwStatusOutput {
        configured_generation: config.generation_tag(),
        registration: registration.status(),
        generations,
    };
    json_result(&output)
}
