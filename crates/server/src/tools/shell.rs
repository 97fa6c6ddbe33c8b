//! shell_status and shell_update tool implementations.

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use serde::Serialize;
use top10_client::{ShellWorker, WorkerState, offline::ReclaimReport};
use top10_core::{CacheStore, Error};

/// Output structure for shell_status tool.
#[derive(Debug, Clone, Serialize)]
pub struct ShellStatusOutput {
    pub state: WorkerState,
    /// Generation this build installs into.
    pub cache_name: String,
    /// Generation currently answering requests.
    pub controlling_generation: Option<String>,
    pub generations: Vec<String>,
    /// Entries stored in `cache_name`.
    pub entry_count: usize,
    pub shell_assets: Vec<String>,
}

/// Output structure for shell_update tool.
#[derive(Debug, Clone, Serialize)]
pub struct ShellUpdateOutput {
    pub stored: usize,
    pub state: WorkerState,
    pub controlling_generation: Option<String>,
    pub reclaim: Option<ReclaimReport>,
}

/// Implementation of the shell_status tool.
pub async fn status_impl(worker: &ShellWorker) -> Result<CallToolResult, McpError> {
    let cache_name = worker.manifest().cache_name().to_string();
    let store = worker.store();

    let output = ShellStatusOutput {
        state: worker.state().await,
        controlling_generation: worker.controlling_generation().await,
        generations: store.generation_names().await?,
        entry_count: store.entry_keys(&cache_name).await?.len(),
        shell_assets: worker.manifest().assets().iter().map(|u| u.to_string()).collect(),
        cache_name,
    };

    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize status: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}

/// Implementation of the shell_update tool.
pub async fn update_impl(worker: &ShellWorker) -> Result<CallToolResult, McpError> {
    let (stored, reclaim) = worker.update().await?;

    let output = ShellUpdateOutput {
        stored,
        state: worker.state().await,
        controlling_generation: worker.controlling_generation().await,
        reclaim,
    };

    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize update: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}
