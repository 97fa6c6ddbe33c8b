//! Generation and entry operations on the SQLite store.
//!
//! A generation is created implicitly the first time it is opened or
//! written to. Deleting a generation cascades to its entries.

use super::connection::CacheDb;
use super::entry::{RequestKey, ResponseSnapshot};
use crate::Error;
use chrono::Utc;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

const INSERT_GENERATION: &str = "INSERT OR IGNORE INTO generations (name, created_at) VALUES (?1, ?2)";

const UPSERT_ENTRY: &str = "INSERT INTO entries (
        generation, key_hash, method, url, final_url, status_code,
        content_type, headers_json, body, fetched_at
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
    ON CONFLICT(generation, key_hash) DO UPDATE SET
        method = excluded.method,
        url = excluded.url,
        final_url = excluded.final_url,
        status_code = excluded.status_code,
        content_type = excluded.content_type,
        headers_json = excluded.headers_json,
        body = excluded.body,
        fetched_at = excluded.fetched_at";

/// Flattened entry ready for binding.
struct EntryRow {
    key_hash: String,
    method: String,
    url: String,
    final_url: String,
    status_code: u16,
    content_type: Option<String>,
    headers_json: String,
    body: Vec<u8>,
    fetched_at: String,
}

impl EntryRow {
    fn encode(key: &RequestKey, snapshot: &ResponseSnapshot) -> Result<Self, Error> {
        Ok(Self {
            key_hash: key.hash(),
            method: key.method.clone(),
            url: key.url.clone(),
            final_url: snapshot.url.clone(),
            status_code: snapshot.status_code,
            content_type: snapshot.content_type.clone(),
            headers_json: serde_json::to_string(&snapshot.headers)?,
            body: snapshot.body.clone(),
            fetched_at: snapshot.fetched_at.clone(),
        })
    }
}

impl CacheDb {
    /// Create the named generation if it does not exist yet.
    pub async fn open_generation(&self, name: &str) -> Result<(), Error> {
        let name = name.to_string();
        let created_at = Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(INSERT_GENERATION, params![name, created_at])?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// All generation names, oldest first.
    pub async fn generation_names(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM generations ORDER BY created_at ASC, name ASC")?;
                let names = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete a generation and all of its entries.
    ///
    /// Returns false if no generation had that name.
    pub async fn delete_generation(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let deleted = conn.execute("DELETE FROM generations WHERE name = ?1", params![name])?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Name of the generation that last completed activation.
    pub async fn active_generation(&self) -> Result<Option<String>, Error> {
        self.conn
            .call(|conn| -> Result<Option<String>, Error> {
                let result = conn.query_row("SELECT name FROM generations WHERE active = 1 LIMIT 1", [], |row| {
                    row.get(0)
                });

                match result {
                    Ok(name) => Ok(Some(name)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Record `name` as the only active generation.
    pub async fn mark_active(&self, name: &str) -> Result<(), Error> {
        let name = name.to_string();
        let created_at = Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                tx.execute(INSERT_GENERATION, params![name, created_at])?;
                tx.execute("UPDATE generations SET active = 0 WHERE active = 1", [])?;
                tx.execute("UPDATE generations SET active = 1 WHERE name = ?1", params![name])?;
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Look up the snapshot stored for `key` in `generation`.
    pub async fn match_entry(&self, generation: &str, key: &RequestKey) -> Result<Option<ResponseSnapshot>, Error> {
        let generation = generation.to_string();
        let key_hash = key.hash();
        self.conn
            .call(move |conn| -> Result<Option<ResponseSnapshot>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT final_url, status_code, content_type, headers_json, body, fetched_at
                    FROM entries WHERE generation = ?1 AND key_hash = ?2",
                )?;

                let result = stmt.query_row(params![generation, key_hash], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, u16>(1)?,
                        row.get::<_, Option<String>>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, Vec<u8>>(4)?,
                        row.get::<_, String>(5)?,
                    ))
                });

                let (url, status_code, content_type, headers_json, body, fetched_at) = match result {
                    Ok(row) => row,
                    Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
                    Err(e) => return Err(e.into()),
                };

                let headers = serde_json::from_str(&headers_json)?;
                Ok(Some(ResponseSnapshot { url, status_code, content_type, headers, body, fetched_at }))
            })
            .await
            .map_err(Error::from)
    }

    /// Store a single snapshot, replacing any prior entry for the key.
    ///
    /// The generation must already exist; a write to a deleted generation
    /// fails with `UnknownGeneration` instead of recreating it.
    pub async fn put_entry(&self, generation: &str, key: &RequestKey, snapshot: &ResponseSnapshot) -> Result<(), Error> {
        let rows = vec![EntryRow::encode(key, snapshot)?];
        self.write_rows(generation, rows, false).await
    }

    /// Store several snapshots in one transaction, creating the generation
    /// if needed.
    ///
    /// Either every entry is written or none is.
    pub async fn put_entries(
        &self, generation: &str, entries: &[(RequestKey, ResponseSnapshot)],
    ) -> Result<(), Error> {
        let rows = entries
            .iter()
            .map(|(key, snapshot)| EntryRow::encode(key, snapshot))
            .collect::<Result<Vec<_>, Error>>()?;
        self.write_rows(generation, rows, true).await
    }

    async fn write_rows(&self, generation: &str, rows: Vec<EntryRow>, create: bool) -> Result<(), Error> {
        let generation = generation.to_string();
        let created_at = Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                if create {
                    tx.execute(INSERT_GENERATION, params![generation, created_at])?;
                } else {
                    let exists: bool = tx.query_row(
                        "SELECT EXISTS(SELECT 1 FROM generations WHERE name = ?1)",
                        params![generation],
                        |row| row.get(0),
                    )?;
                    if !exists {
                        return Err(Error::UnknownGeneration(generation));
                    }
                }
                {
                    let mut stmt = tx.prepare(UPSERT_ENTRY)?;
                    for row in &rows {
                        stmt.execute(params![
                            &generation,
                            &row.key_hash,
                            &row.method,
                            &row.url,
                            &row.final_url,
                            row.status_code,
                            &row.content_type,
                            &row.headers_json,
                            &row.body,
                            &row.fetched_at,
                        ])?;
                    }
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Request keys stored in `generation`, ordered by URL.
    pub async fn entry_keys(&self, generation: &str) -> Result<Vec<RequestKey>, Error> {
        let generation = generation.to_string();
        self.conn
            .call(move |conn| -> Result<Vec<RequestKey>, Error> {
                let mut stmt =
                    conn.prepare("SELECT method, url FROM entries WHERE generation = ?1 ORDER BY url ASC, method ASC")?;
                let keys = stmt
                    .query_map(params![generation], |row| {
                        Ok(RequestKey { method: row.get(0)?, url: row.get(1)? })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(keys)
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_snapshot(url: &str, body: &str) -> ResponseSnapshot {
        ResponseSnapshot {
            url: url.to_string(),
            status_code: 200,
            content_type: Some("application/json".to_string()),
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            body: body.as_bytes().to_vec(),
            fetched_at: Utc::now().to_rfc3339(),
        }
    }

    #[tokio::test]
    async fn test_put_and_match() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let key = RequestKey::get("https://example.com/HTML_Json/2024-05-01.json");
        let snapshot = make_snapshot(&key.url, "[1,2,3]");
        db.open_generation("v1").await.unwrap();

        db.put_entry("v1", &key, &snapshot).await.unwrap();

        let retrieved = db.match_entry("v1", &key).await.unwrap().unwrap();
        assert_eq!(retrieved, snapshot);
    }

    #[tokio::test]
    async fn test_match_missing() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.open_generation("v1").await.unwrap();
        let result = db.match_entry("v1", &RequestKey::get("https://example.com/")).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_put_replaces_same_key() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let key = RequestKey::get("https://example.com/file_manifest.json");
        db.open_generation("v1").await.unwrap();

        db.put_entry("v1", &key, &make_snapshot(&key.url, "[\"a\"]")).await.unwrap();
        db.put_entry("v1", &key, &make_snapshot(&key.url, "[\"a\",\"b\"]")).await.unwrap();

        let retrieved = db.match_entry("v1", &key).await.unwrap().unwrap();
        assert_eq!(retrieved.text(), "[\"a\",\"b\"]");
        assert_eq!(db.entry_keys("v1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_generations_are_isolated() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let key = RequestKey::get("https://example.com/style.css");
        db.open_generation("v1").await.unwrap();
        db.put_entry("v1", &key, &make_snapshot(&key.url, "old")).await.unwrap();

        assert!(db.match_entry("v2", &key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_generation_cascades() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let key = RequestKey::get("https://example.com/style.css");
        db.open_generation("v1").await.unwrap();
        db.put_entry("v1", &key, &make_snapshot(&key.url, "body")).await.unwrap();
        db.open_generation("v2").await.unwrap();

        assert!(db.delete_generation("v1").await.unwrap());
        assert!(!db.delete_generation("v1").await.unwrap());

        assert_eq!(db.generation_names().await.unwrap(), vec!["v2".to_string()]);
        assert!(db.entry_keys("v1").await.unwrap().is_empty());
        assert!(db.match_entry("v1", &key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_put_entry_does_not_recreate_deleted_generation() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let key = RequestKey::get("https://example.com/HTML_Json/2024-05-01.json");
        db.open_generation("v1").await.unwrap();
        db.open_generation("v2").await.unwrap();
        db.delete_generation("v1").await.unwrap();

        let result = db.put_entry("v1", &key, &make_snapshot(&key.url, "late")).await;

        assert!(matches!(result, Err(Error::UnknownGeneration(ref name)) if name == "v1"));
        assert_eq!(db.generation_names().await.unwrap(), vec!["v2".to_string()]);
        assert!(db.match_entry("v1", &key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_put_entries_creates_generation() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let entries: Vec<_> = ["https://example.com/", "https://example.com/index.html"]
            .iter()
            .map(|url| (RequestKey::get(*url), make_snapshot(url, "x")))
            .collect();

        db.put_entries("v1", &entries).await.unwrap();

        assert_eq!(db.generation_names().await.unwrap(), vec!["v1".to_string()]);
        let keys = db.entry_keys("v1").await.unwrap();
        assert_eq!(keys.len(), 2);
        assert_eq!(keys[0].url, "https://example.com/");
    }

    #[tokio::test]
    async fn test_active_generation_tracking() {
        let db = CacheDb::open_in_memory().await.unwrap();
        assert!(db.active_generation().await.unwrap().is_none());

        db.mark_active("v1").await.unwrap();
        assert_eq!(db.active_generation().await.unwrap().as_deref(), Some("v1"));

        db.mark_active("v2").await.unwrap();
        assert_eq!(db.active_generation().await.unwrap().as_deref(), Some("v2"));

        db.delete_generation("v2").await.unwrap();
        assert!(db.active_generation().await.unwrap().is_none());
    }
}
