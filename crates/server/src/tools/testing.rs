//! Shared fixtures for tool tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use top10_client::{Fetcher, RoutePolicy, ShellManifest, ShellWorker};
use top10_core::{CacheDb, Error, RequestKey, ResponseSnapshot};

pub const ORIGIN: &str = "https://example.com";

/// Fetcher serving fixed bodies per URL; anything else is unreachable.
#[derive(Default)]
pub struct StaticFetcher {
    routes: Mutex<HashMap<String, (u16, String)>>,
}

impl StaticFetcher {
    pub fn serve(&self, url: &str, status: u16, body: &str) {
        self.routes.lock().unwrap().insert(url.to_string(), (status, body.to_string()));
    }

    pub fn clear(&self) {
        self.routes.lock().unwrap().clear();
    }
}

#[async_trait]
impl Fetcher for StaticFetcher {
    async fn fetch(&self, key: &RequestKey) -> Result<ResponseSnapshot, Error> {
        let (status_code, body) =
            self.routes.lock().unwrap().get(&key.url).cloned().ok_or_else(|| Error::Network("offline".into()))?;
        Ok(ResponseSnapshot {
            url: key.url.clone(),
            status_code,
            content_type: Some("application/json".into()),
            headers: Vec::new(),
            body: body.into_bytes(),
            fetched_at: chrono::Utc::now().to_rfc3339(),
        })
    }
}

/// A worker over an in-memory store whose origin serves a two-asset shell
/// plus the data manifest. The worker is not started.
pub async fn worker() -> (Arc<ShellWorker>, Arc<StaticFetcher>, CacheDb) {
    let db = CacheDb::open_in_memory().await.unwrap();
    let fetcher = Arc::new(StaticFetcher::default());
    fetcher.serve("https://example.com/app/", 200, "<html></html>");
    fetcher.serve("https://example.com/app/style.css", 200, "body{}");
    fetcher.serve(
        "https://example.com/app/file_manifest.json",
        200,
        r#"["netflix_top10_2024-04-24", "netflix_top10_2024-05-08", "netflix_top10_2024-05-01"]"#,
    );

    let manifest = ShellManifest::new("v1", ORIGIN, "/app", &["/", "/style.css", "/file_manifest.json"]).unwrap();
    let worker =
        ShellWorker::new(manifest, RoutePolicy::new("/HTML_Json/"), Arc::new(db.clone()), fetcher.clone());
    (Arc::new(worker), fetcher, db)
}

/// Like [`worker`], but installed and activated.
pub async fn started_worker() -> (Arc<ShellWorker>, Arc<StaticFetcher>, CacheDb) {
    let (worker, fetcher, db) = worker().await;
    worker.start().await.unwrap();
    (worker, fetcher, db)
}

/// Parse the JSON text of the first content block.
pub fn result_json(result: &rmcp::model::CallToolResult) -> serde_json::Value {
    let content_val = serde_json::to_value(&result.content[0]).unwrap();
    let text = content_val.get("text").and_then(|v| v.as_str()).expect("Expected text field in content");
    serde_json::from_str(text).unwrap()
}
