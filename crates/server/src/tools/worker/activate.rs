//! sw_activate tool implementation.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_core::Registration;

use crate::tools::json_result;

/// Parameters for the sw_activate tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct SwActivateParams {
    /// Activate even while pages are open (same as SKIP_WAITING).
    #[serde(default)]
    pub force: bool,
}

/// Implementation of the sw_activate tool.
pub async fn activate_impl(registration: &Registration, params: SwActivateParams) -> Result<CallToolResult, McpError> {
    let reply = registration.activate_waiting(params.force).await?;
    json_result(&reply)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::{config, parse, setup};
    use swcache_core::{AppConfig, MessageReply, WorkerSettings};

    #[tokio::test]
    async fn test_activate_nothing_waiting() {
        let (registration, _network) = setup().await;
        let result = activate_impl(&registration, SwActivateParams::default()).await.unwrap();
        let reply: MessageReply = parse(&result);
        assert_eq!(reply, MessageReply::NothingWaiting);
    }

    #[tokio::test]
    async fn test_activate_respects_open_clients() {
        let (registration, _network) = setup().await;
        registration.register(WorkerSettings::from_config(&config()).unwrap()).await.unwrap();
        registration.client_opened();

        let next = AppConfig { cache_version: "v10".into(), ..config() };
        registration.register(WorkerSettings::from_config(&next).unwrap()).await.unwrap();

        let result = activate_impl(&registration, SwActivateParams { force: false }).await.unwrap();
        let reply: MessageReply = parse(&result);
        assert!(matches!(reply, MessageReply::StillWaiting { clients: 1, .. }));

        let result = activate_impl(&registration, SwActivateParams { force: true }).await.unwrap();
        let reply: MessageReply = parse(&result);
        assert_eq!(reply, MessageReply::Activated { generation: "artisan-connect-cache-v10".into() });
    }
}
