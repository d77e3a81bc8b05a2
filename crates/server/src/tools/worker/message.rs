//! sw_message tool implementation.
//!
//! Posts a control message (`SKIP_WAITING`, `GET_VERSION`, `PURGE_OPAQUE`,
//! `CLIENTS_CLOSED`) to the registration.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_core::{ControlMessage, Registration};

use crate::tools::json_result;

/// Parameters for the sw_message tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwMessageParams {
    /// The message, e.g. `{"type": "SKIP_WAITING"}`.
    pub message: ControlMessage,
}

/// Implementation of the sw_message tool.
pub async fn message_impl(registration: &Registration, params: SwMessageParams) -> Result<CallToolResult, McpError> {
    let reply = registration.post_message(params.message).await?;
    json_result(&reply)
}
