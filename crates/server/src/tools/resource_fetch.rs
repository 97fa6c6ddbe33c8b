//! resource_fetch tool implementation.
//!
//! Routes one page request through the offline shell, the way the page's own
//! fetches would be routed.

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use top10_client::{ServedFrom, ShellWorker, Strategy, offline::CacheWrite};
use top10_core::{Error, RequestKey};

/// Input parameters for resource_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ResourceFetchParams {
    /// URL to request, absolute or relative to the site root
    /// (e.g. "style.css" or "HTML_Json/netflix_top10_2024-05-01.json").
    pub url: String,

    /// HTTP method (default: GET). Anything other than GET bypasses the cache.
    #[serde(default)]
    pub method: Option<String>,
}

/// Output structure for resource_fetch tool.
#[derive(Debug, Clone, Serialize)]
pub struct ResourceFetchOutput {
    pub url: String,
    pub method: String,
    pub status_code: u16,
    pub content_type: Option<String>,
    pub fetched_at: String,
    pub strategy: Strategy,
    pub served_from: ServedFrom,
    pub cache_writes: Vec<CacheWrite>,
    pub body: String,
}

/// Implementation of the resource_fetch tool.
pub async fn fetch_impl(worker: &ShellWorker, params: ResourceFetchParams) -> Result<CallToolResult, McpError> {
    if params.url.trim().is_empty() {
        return Err(Error::InvalidInput("url cannot be empty".into()).into());
    }

    let url = worker.manifest().resolve_request(&params.url)?;
    let method = params.method.as_deref().unwrap_or("GET");
    let key = RequestKey::new(method, url.as_str());

    let handled = worker.handle(&key).await?;

    let output = ResourceFetchOutput {
        url: key.url.clone(),
        method: key.method.clone(),
        status_code: handled.response.status_code,
        content_type: handled.response.content_type.clone(),
        fetched_at: handled.response.fetched_at.clone(),
        strategy: handled.strategy,
        served_from: handled.served_from,
        body: handled.response.text(),
        cache_writes: handled.cache_writes,
    };

    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize response: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::{result_json, started_worker, worker};

    fn params(url: &str) -> ResourceFetchParams {
        ResourceFetchParams { url: url.to_string(), method: None }
    }

    #[tokio::test]
    async fn test_shell_asset_served_from_cache() {
        let (worker, fetcher, _db) = started_worker().await;
        fetcher.clear();

        let result = fetch_impl(&worker, params("style.css")).await.unwrap();
        let json = result_json(&result);

        assert_eq!(json["url"], "https://example.com/app/style.css");
        assert_eq!(json["served_from"], "cache");
        assert_eq!(json["strategy"], "cache_first");
        assert_eq!(json["body"], "body{}");
    }

    #[tokio::test]
    async fn test_data_request_goes_to_network() {
        let (worker, fetcher, _db) = started_worker().await;
        let url = "https://example.com/app/HTML_Json/netflix_top10_2024-05-01.json";
        fetcher.serve(url, 200, "{}");

        let result = fetch_impl(&worker, params(url)).await.unwrap();
        let json = result_json(&result);

        assert_eq!(json["strategy"], "network_first");
        assert_eq!(json["served_from"], "network");
        assert_eq!(json["cache_writes"][0]["outcome"]["status"], "stored");
    }

    #[tokio::test]
    async fn test_empty_url_rejected() {
        let (worker, _fetcher, _db) = started_worker().await;
        let err = fetch_impl(&worker, params("  ")).await.unwrap_err();
        assert_eq!(err.code.0, -32602);
    }

    #[tokio::test]
    async fn test_not_controlled_before_start() {
        let (worker, _fetcher, _db) = worker().await;
        let err = fetch_impl(&worker, params("style.css")).await.unwrap_err();
        assert_eq!(err.code.0, -32009);
    }
}
