//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the appropriate implementations.
use std::sync::Arc;

use crate::tools::cache::{CacheGetParams, CacheListParams, CachePurgeParams, get_impl, list_impl, purge_impl};
use crate::tools::worker::{
    SwActivateParams, SwFetchParams, SwInstallParams, SwMessageParams, SwStatusParams, activate_impl, fetch_impl,
    install_impl, message_impl, status_impl,
};

use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};
use swcache_core::{AppConfig, Registration};

/// The main MCP server handler for artisan-sw.
#[derive(Clone)]
pub struct SwCacheServer {
    registration: Arc<Registration>,
    config: Arc<AppConfig>,
    tool_router: ToolRouter<Self>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl SwCacheServer {
    /// Create a new server handler.
    pub fn new(registration: Arc<Registration>, config: Arc<AppConfig>) -> Self {
        Self { registration, config, tool_router: Self::tool_router() }
    }

    #[tool(description = "Show the active and waiting worker versions and every stored cache generation.")]
    async fn sw_status(&self, params: Parameters<SwStatusParams>) -> Result<CallToolResult, McpError> {
        status_impl(&self.registration, &self.config, params.0).await
    }

    /// Install a worker version.
    ///
    /// Seeds a new cache generation from the asset manifest (all-or-nothing) and activates it when no
    /// other worker is active or skip_waiting is set.
    #[tool(
        description = "Install a worker version: pre-cache the asset manifest into a new generation. Optional cache_version/manifest overrides simulate a deploy."
    )]
    async fn sw_install(&self, params: Parameters<SwInstallParams>) -> Result<CallToolResult, McpError> {
        install_impl(&self.registration, &self.config, params.0).await
    }

    #[tool(description = "Activate the waiting worker. Deletes every other cache generation. Set force to ignore open pages.")]
    async fn sw_activate(&self, params: Parameters<SwActivateParams>) -> Result<CallToolResult, McpError> {
        activate_impl(&self.registration, params.0).await
    }

    /// Dispatch a fetch event through the active worker.
    #[tool(
        description = "Fetch a URL through the worker's routing table (network-first for navigations, stale-while-revalidate for static assets, cache-first otherwise). Reports where the response came from."
    )]
    async fn sw_fetch(&self, params: Parameters<SwFetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(&self.registration, &self.config, params.0).await
    }

    #[tool(description = "Post a control message: SKIP_WAITING, GET_VERSION, PURGE_OPAQUE or CLIENTS_CLOSED.")]
    async fn sw_message(&self, params: Parameters<SwMessageParams>) -> Result<CallToolResult, McpError> {
        message_impl(&self.registration, params.0).await
    }

    #[tool(description = "Read a cached response by URL and method from a generation (default: active).")]
    async fn cache_get(&self, params: Parameters<CacheGetParams>) -> Result<CallToolResult, McpError> {
        get_impl(&self.registration, &self.config, params.0).await
    }

    #[tool(description = "List cache generations and the entries of one generation (default: active).")]
    async fn cache_list(&self, params: Parameters<CacheListParams>) -> Result<CallToolResult, McpError> {
        list_impl(&self.registration, params.0).await
    }

    #[tool(description = "Purge cache entries: drop one URL, cap opaque entries, clear a generation, or delete a non-active generation.")]
    async fn cache_purge(&self, params: Parameters<CachePurgeParams>) -> Result<CallToolResult, McpError> {
        purge_impl(&self.registration, &self.config, params.0).await
    }
}

impl ServerHandler for SwCacheServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "artisan-sw".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}
