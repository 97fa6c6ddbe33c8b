//! Cache store abstraction.
//!
//! The worker and router only ever see a `CacheStore`, so tests can wrap or
//! replace the SQLite backend without touching routing code.

use async_trait::async_trait;

use super::connection::CacheDb;
use super::entry::{RequestKey, ResponseSnapshot};
use crate::Error;

/// Versioned store of request/response snapshots.
///
/// Implementations must make `put_entry` atomic per key; concurrent writers
/// to the same key resolve as last-write-wins.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Create the named generation if absent.
    async fn open_generation(&self, name: &str) -> Result<(), Error>;

    /// Names of every generation currently present.
    async fn generation_names(&self) -> Result<Vec<String>, Error>;

    /// Delete a generation and its entries. Returns false if it did not exist.
    async fn delete_generation(&self, name: &str) -> Result<bool, Error>;

    /// Find the snapshot stored for `key`.
    async fn match_entry(&self, generation: &str, key: &RequestKey) -> Result<Option<ResponseSnapshot>, Error>;

    /// Store one snapshot, replacing any previous one for the same key.
    ///
    /// Fails if the generation does not exist; a write never brings back a
    /// reclaimed generation.
    async fn put_entry(&self, generation: &str, key: &RequestKey, snapshot: &ResponseSnapshot) -> Result<(), Error>;

    /// Store a batch of snapshots all-or-nothing, creating the generation.
    async fn put_entries(&self, generation: &str, entries: &[(RequestKey, ResponseSnapshot)]) -> Result<(), Error>;

    /// Keys stored in a generation.
    async fn entry_keys(&self, generation: &str) -> Result<Vec<RequestKey>, Error>;

    /// Generation that last completed activation, if any.
    async fn active_generation(&self) -> Result<Option<String>, Error>;

    /// Record `name` as the active generation.
    async fn mark_active(&self, name: &str) -> Result<(), Error>;
}

#[async_trait]
impl CacheStore for CacheDb {
    async fn open_generation(&self, name: &str) -> Result<(), Error> {
        CacheDb::open_generation(self, name).await
    }

    async fn generation_names(&self) -> Result<Vec<String>, Error> {
        CacheDb::generation_names(self).await
    }

    async fn delete_generation(&self, name: &str) -> Result<bool, Error> {
        CacheDb::delete_generation(self, name).await
    }

    async fn match_entry(&self, generation: &str, key: &RequestKey) -> Result<Option<ResponseSnapshot>, Error> {
        CacheDb::match_entry(self, generation, key).await
    }

    async fn put_entry(&self, generation: &str, key: &RequestKey, snapshot: &ResponseSnapshot) -> Result<(), Error> {
        CacheDb::put_entry(self, generation, key, snapshot).await
    }

    async fn put_entries(&self, generation: &str, entries: &[(RequestKey, ResponseSnapshot)]) -> Result<(), Error> {
        CacheDb::put_entries(self, generation, entries).await
    }

    async fn entry_keys(&self, generation: &str) -> Result<Vec<RequestKey>, Error> {
        CacheDb::entry_keys(self, generation).await
    }

    async fn active_generation(&self) -> Result<Option<String>, Error> {
        CacheDb::active_generation(self).await
    }

    async fn mark_active(&self, name: &str) -> Result<(), Error> {
        CacheDb::mark_active(self, name).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_dyn_store_roundtrip() {
        let store: Arc<dyn CacheStore> = Arc::new(CacheDb::open_in_memory().await.unwrap());
        let key = RequestKey::get("https://example.com/script.js");
        let snapshot = ResponseSnapshot {
            url: key.url.clone(),
            status_code: 200,
            content_type: Some("text/javascript".into()),
            headers: Vec::new(),
            body: b"console.log(1)".to_vec(),
            fetched_at: chrono::Utc::now().to_rfc3339(),
        };

        store.open_generation("v1").await.unwrap();
        store.put_entry("v1", &key, &snapshot).await.unwrap();
        assert_eq!(store.match_entry("v1", &key).await.unwrap(), Some(snapshot));
        assert_eq!(store.entry_keys("v1").await.unwrap(), vec![key]);
    }

    #[tokio::test]
    async fn test_concurrent_writes_distinct_keys() {
        let db = Arc::new(CacheDb::open_in_memory().await.unwrap());
        db.open_generation("v1").await.unwrap();
        let mut handles = Vec::new();
        for i in 0..8 {
            let db = Arc::clone(&db);
            handles.push(tokio::spawn(async move {
                let key = RequestKey::get(format!("https://example.com/HTML_Json/{i}.json"));
                let snapshot = ResponseSnapshot {
                    url: key.url.clone(),
                    status_code: 200,
                    content_type: None,
                    headers: Vec::new(),
                    body: i.to_string().into_bytes(),
                    fetched_at: chrono::Utc::now().to_rfc3339(),
                };
                db.put_entry("v1", &key, &snapshot).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(db.entry_keys("v1").await.unwrap().len(), 8);
    }
}
