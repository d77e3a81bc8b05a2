//! sw_install tool implementation.
//!
//! Installs a worker version from the loaded configuration, optionally with
//! a different cache version or manifest (a simulated deploy).

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_core::{AppConfig, Registration, WorkerSettings};

use crate::tools::json_result;

/// Parameters for the sw_install tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct SwInstallParams {
    /// Cache version to install (default: the configured one).
    #[serde(default)]
    pub cache_version: Option<String>,

    /// Manifest override.
    #[serde(default)]
    pub manifest: Option<Vec<String>>,

    /// Activate without waiting for open pages to close.
    #[serde(default)]
    pub skip_waiting: Option<bool>,
}

/// Implementation of the sw_install tool.
pub async fn install_impl(
    registration: &Registration, config: &AppConfig, params: SwInstallParams,
) -> Result<CallToolResult, McpError> {
    let mut config = config.clone();
    if let Some(version) = params.cache_version {
        config.cache_version = version;
    }
    if let Some(manifest) = params.manifest {
        config.manifest = manifest;
    }
    if let Some(skip_waiting) = params.skip_waiting {
        config.skip_waiting = skip_waiting;
    }

    let settings = WorkerSettings::from_config(&config)?;
    let report = registration.register(settings).await?;
    json_result(&report)
}
