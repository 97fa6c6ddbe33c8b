//! Test doubles for the fetcher and store seams.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use top10_core::{CacheStore, Error, RequestKey, ResponseSnapshot};

use crate::fetch::Fetcher;

pub fn snapshot(url: &str, status_code: u16, body: &str) -> ResponseSnapshot {
    ResponseSnapshot {
        url: url.to_string(),
        status_code,
        content_type: Some("text/plain".to_string()),
        headers: Vec::new(),
        body: body.as_bytes().to_vec(),
        fetched_at: chrono::Utc::now().to_rfc3339(),
    }
}

type ErrorFactory = Box<dyn Fn() -> Error + Send + Sync>;

enum Script {
    Respond(ResponseSnapshot),
    Fail(ErrorFactory),
}

/// Fetcher answering from a per-URL script and counting calls.
///
/// Unscripted URLs fail with a network error.
#[derive(Default)]
pub struct ScriptedFetcher {
    scripts: Mutex<HashMap<String, Script>>,
    calls: Mutex<HashMap<String, usize>>,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, url: &str, response: ResponseSnapshot) {
        self.scripts.lock().unwrap().insert(url.to_string(), Script::Respond(response));
    }

    pub fn fail(&self, url: &str, error: impl Fn() -> Error + Send + Sync + 'static) {
        self.scripts.lock().unwrap().insert(url.to_string(), Script::Fail(Box::new(error)));
    }

    /// Fail every scripted URL from now on.
    pub fn go_offline(&self) {
        let mut scripts = self.scripts.lock().unwrap();
        for script in scripts.values_mut() {
            *script = Script::Fail(Box::new(|| Error::Network("offline".into())));
        }
    }

    pub fn calls(&self, url: &str) -> usize {
        self.calls.lock().unwrap().get(url).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch(&self, key: &RequestKey) -> Result<ResponseSnapshot, Error> {
        *self.calls.lock().unwrap().entry(key.url.clone()).or_default() += 1;
        match self.scripts.lock().unwrap().get(&key.url) {
            Some(Script::Respond(response)) => Ok(response.clone()),
            Some(Script::Fail(error)) => Err(error()),
            None => Err(Error::Network(format!("no route to {}", key.url))),
        }
    }
}

/// Store wrapper that injects failures into selected operations.
pub struct FlakyStore<S> {
    inner: S,
    fail_writes: bool,
    fail_reads: bool,
    fail_deletes: HashSet<String>,
}

impl<S: CacheStore> FlakyStore<S> {
    pub fn new(inner: S) -> Self {
        Self { inner, fail_writes: false, fail_reads: false, fail_deletes: HashSet::new() }
    }

    pub fn failing_writes(mut self) -> Self {
        self.fail_writes = true;
        self
    }

    pub fn failing_reads(mut self) -> Self {
        self.fail_reads = true;
        self
    }

    pub fn failing_delete(mut self, name: &str) -> Self {
        self.fail_deletes.insert(name.to_string());
        self
    }

    fn rejected(op: &str) -> Error {
        Error::CorruptEntry(format!("{op} rejected by test store"))
    }
}

#[async_trait]
impl<S: CacheStore> CacheStore for FlakyStore<S> {
    async fn open_generation(&self, name: &str) -> Result<(), Error> {
        self.inner.open_generation(name).await
    }

    async fn generation_names(&self) -> Result<Vec<String>, Error> {
        self.inner.generation_names().await
    }

    async fn delete_generation(&self, name: &str) -> Result<bool, Error> {
        if self.fail_deletes.contains(name) {
            return Err(Self::rejected("delete"));
        }
        self.inner.delete_generation(name).await
    }

    async fn match_entry(&self, generation: &str, key: &RequestKey) -> Result<Option<ResponseSnapshot>, Error> {
        if self.fail_reads {
            return Err(Self::rejected("read"));
        }
        self.inner.match_entry(generation, key).await
    }

    async fn put_entry(&self, generation: &str, key: &RequestKey, snapshot: &ResponseSnapshot) -> Result<(), Error> {
        if self.fail_writes {
            return Err(Self::rejected("write"));
        }
        self.inner.put_entry(generation, key, snapshot).await
    }

    async fn put_entries(&self, generation: &str, entries: &[(RequestKey, ResponseSnapshot)]) -> Result<(), Error> {
        if self.fail_writes {
            return Err(Self::rejected("write"));
        }
        self.inner.put_entries(generation, entries).await
    }

    async fn entry_keys(&self, generation: &str) -> Result<Vec<RequestKey>, Error> {
        self.inner.entry_keys(generation).await
    }

    async fn active_generation(&self) -> Result<Option<String>, Error> {
        self.inner.active_generation().await
    }

    async fn mark_active(&self, name: &str) -> Result<(), Error> {
        self.inner.mark_active(name).await
    }
}
