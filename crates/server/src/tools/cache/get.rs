//! cache_get tool implementation.
//!
//! Retrieves the stored snapshot for a URL without touching the network.

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use top10_client::ShellWorker;
use top10_core::{CacheStore, Error, RequestKey};

/// Parameters for the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetParams {
    /// URL of the cached resource, absolute or relative to the site root.
    pub url: String,
}

/// Output from the cache_get tool.
#[derive(Debug, Clone, Serialize)]
pub struct CacheGetOutput {
    pub generation: String,
    pub key: RequestKey,
    pub url: String,
    pub status_code: u16,
    pub content_type: Option<String>,
    pub headers: Vec<(String, String)>,
    pub fetched_at: String,
    pub body: String,
}

/// Implementation of the cache_get tool.
pub async fn get_impl(worker: &ShellWorker, params: CacheGetParams) -> Result<CallToolResult, McpError> {
    let url = worker.manifest().resolve_request(&params.url)?;
    let generation = worker.controlling_generation().await.ok_or(Error::NotControlled)?;
    let key = RequestKey::get(url.as_str());

    let snapshot = worker
        .store()
        .match_entry(&generation, &key)
        .await?
        .ok_or_else(|| Error::CacheMiss(key.url.clone()))?;

    let output = CacheGetOutput {
        generation,
        key,
        body: snapshot.text(),
        url: snapshot.url,
        status_code: snapshot.status_code,
        content_type: snapshot.content_type,
        headers: snapshot.headers,
        fetched_at: snapshot.fetched_at,
    };
    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize snapshot: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}
