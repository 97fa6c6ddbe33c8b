//! catalog_dates and catalog_snapshot tool implementations.
//!
//! Both read through the router: the data manifest is a shell asset
//! (Cache-First), dated snapshots are data (Network-First).

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use top10_client::{CatalogEntry, CatalogManifest, ServedFrom, ShellWorker, catalog, snapshot_path};
use top10_core::{Error, RequestKey};

const DATA_MANIFEST: &str = "file_manifest.json";

/// Output structure for catalog_dates tool.
#[derive(Debug, Clone, Serialize)]
pub struct CatalogDatesOutput {
    /// Available snapshots, newest first.
    pub files: Vec<CatalogEntry>,
    pub default_selection: Option<String>,
    pub served_from: ServedFrom,
}

/// Input parameters for catalog_snapshot tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CatalogSnapshotParams {
    /// Snapshot file stem as listed by catalog_dates (e.g. "netflix_top10_2024-05-01").
    pub file: String,
}

/// Output structure for catalog_snapshot tool.
#[derive(Debug, Clone, Serialize)]
pub struct CatalogSnapshotOutput {
    pub file: String,
    pub label: String,
    pub url: String,
    pub served_from: ServedFrom,
    pub fetched_at: String,
    pub data: serde_json::Value,
}

/// Implementation of the catalog_dates tool.
pub async fn dates_impl(worker: &ShellWorker) -> Result<CallToolResult, McpError> {
    let url = worker.manifest().resolve_request(DATA_MANIFEST)?;
    let handled = worker.handle(&RequestKey::get(url.as_str())).await?;
    let manifest = CatalogManifest::parse(&handled.response.body)?;

    let output = CatalogDatesOutput {
        files: manifest.entries(),
        default_selection: manifest.default_selection().map(str::to_string),
        served_from: handled.served_from,
    };

    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize catalog: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}

/// Implementation of the catalog_snapshot tool.
pub async fn snapshot_impl(worker: &ShellWorker, params: CatalogSnapshotParams) -> Result<CallToolResult, McpError> {
    let file = params.file.trim();
    let url = worker.manifest().resolve_request(&snapshot_path(file)?)?;
    let handled = worker.handle(&RequestKey::get(url.as_str())).await?;

    let data: serde_json::Value = serde_json::from_slice(&handled.response.body)
        .map_err(|e| Error::InvalidInput(format!("snapshot {file} is not valid JSON: {e}")))?;

    let output = CatalogSnapshotOutput {
        file: file.to_string(),
        label: catalog::label(file).to_string(),
        url: url.to_string(),
        served_from: handled.served_from,
        fetched_at: handled.response.fetched_at,
        data,
    };

    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize snapshot: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}
