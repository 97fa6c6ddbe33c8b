//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the appropriate implementations.
use std::sync::Arc;

use crate::tools::{
    CatalogSnapshotParams, ResourceFetchParams,
    cache::{CacheGetParams, get_impl},
    catalog::{dates_impl, snapshot_impl},
    resource_fetch::fetch_impl,
    shell::{status_impl, update_impl},
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
use top10_client::ShellWorker;

/// The main MCP server handler for top10-offline.
#[derive(Clone)]
pub struct OfflineShellServer {
    worker: Arc<ShellWorker>,
    tool_router: ToolRouter<Self>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl OfflineShellServer {
    /// Create a new server handler around a (possibly not yet active) worker.
    pub fn new(worker: Arc<ShellWorker>) -> Self {
        Self { worker, tool_router: Self::tool_router() }
    }

    #[tool(
        description = "Request a catalog site URL through the offline shell. Data snapshots are fetched network-first, everything else cache-first. Returns status, body and where it was served from."
    )]
    async fn resource_fetch(&self, params: Parameters<ResourceFetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(&self.worker, params.0).await
    }

    #[tool(description = "List available Top 10 snapshot dates, newest first, with the default selection.")]
    async fn catalog_dates(&self) -> Result<CallToolResult, McpError> {
        dates_impl(&self.worker).await
    }

    #[tool(
        description = "Load one dated Top 10 snapshot as JSON. Falls back to the cached copy when the origin is unreachable."
    )]
    async fn catalog_snapshot(&self, params: Parameters<CatalogSnapshotParams>) -> Result<CallToolResult, McpError> {
        snapshot_impl(&self.worker, params.0).await
    }

    #[tool(description = "Read the cached response for a URL from the active cache generation. Never hits the network.")]
    async fn cache_get(&self, params: Parameters<CacheGetParams>) -> Result<CallToolResult, McpError> {
        get_impl(&self.worker, params.0).await
    }

    #[tool(description = "Report the offline shell state: lifecycle state, active generation, stored generations.")]
    async fn shell_status(&self) -> Result<CallToolResult, McpError> {
        status_impl(&self.worker).await
    }

    #[tool(
        description = "Re-download the shell assets into the current cache generation and activate it if it is not active yet."
    )]
    async fn shell_update(&self) -> Result<CallToolResult, McpError> {
        update_impl(&self.worker).await
    }
}

impl ServerHandler for OfflineShellServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "top10-offline".into(),
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
