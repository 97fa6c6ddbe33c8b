//! Per-request strategy selection and execution.
//!
//! Every intercepted request is classified once by URL and then handled by
//! one of two strategies against a single cache generation:
//!
//! - **Network-First** for dated catalog data: live response wins and is
//!   written through to the cache; the cached copy is only used when the
//!   network fails.
//! - **Cache-First** for the shell and other static assets: a cached copy is
//!   returned without touching the network; a miss is fetched and stored.
//!
//! Cache writes never decide the outcome of a request. A failed write is
//! logged and reported in [`HandledRequest::cache_writes`].

use std::sync::Arc;

use serde::Serialize;
use top10_core::{CacheStore, Error, RequestKey, ResponseSnapshot};

use crate::fetch::{Fetcher, canonicalize};

/// Strategy chosen for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    NetworkFirst,
    CacheFirst,
    /// Non-GET requests go straight to the network and are never cached.
    Passthrough,
}

/// URL classifier. Stateless; the same URL always gets the same strategy.
#[derive(Debug, Clone)]
pub struct RoutePolicy {
    data_pattern: String,
}

impl RoutePolicy {
    pub fn new(data_pattern: impl Into<String>) -> Self {
        Self { data_pattern: data_pattern.into() }
    }

    /// Whether `url` points into the catalog data directory.
    pub fn is_data(&self, url: &str) -> bool {
        url.contains(&self.data_pattern)
    }

    pub fn strategy_for(&self, key: &RequestKey) -> Strategy {
        if !key.is_get() {
            Strategy::Passthrough
        } else if self.is_data(&key.url) {
            Strategy::NetworkFirst
        } else {
            Strategy::CacheFirst
        }
    }
}

/// Where the returned response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ServedFrom {
    Network,
    Cache,
}

/// Result of one attempted cache write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum WriteOutcome {
    Stored,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheWrite {
    pub key: RequestKey,
    pub outcome: WriteOutcome,
}

/// A response together with the cache mutations made while producing it.
#[derive(Debug, Clone, Serialize)]
pub struct HandledRequest {
    pub response: ResponseSnapshot,
    pub strategy: Strategy,
    pub served_from: ServedFrom,
    pub cache_writes: Vec<CacheWrite>,
}

/// Routes requests against one cache generation.
#[derive(Clone)]
pub struct RequestRouter {
    store: Arc<dyn CacheStore>,
    fetcher: Arc<dyn Fetcher>,
    generation: String,
    policy: RoutePolicy,
}

impl RequestRouter {
    pub fn new(
        store: Arc<dyn CacheStore>, fetcher: Arc<dyn Fetcher>, generation: impl Into<String>, policy: RoutePolicy,
    ) -> Self {
        Self { store, fetcher, generation: generation.into(), policy }
    }

    /// Produce a response for `key` using the strategy its URL selects.
    ///
    /// # Errors
    ///
    /// Returns the network error when no response could be produced: a
    /// Network-First request with no cached copy, a Cache-First miss, or a
    /// failed passthrough.
    pub async fn handle(&self, key: &RequestKey) -> Result<HandledRequest, Error> {
        let url = canonicalize(&key.url).map_err(|e| Error::InvalidUrl(format!("{}: {e}", key.url)))?;
        let key = &RequestKey::new(&key.method, url.as_str());
        let strategy = self.policy.strategy_for(key);
        tracing::debug!(request = %key, ?strategy, generation = %self.generation, "routing request");

        match strategy {
            Strategy::NetworkFirst => self.network_first(key).await,
            Strategy::CacheFirst => self.cache_first(key).await,
            Strategy::Passthrough => {
                let response = self.fetch_ok(key).await?;
                Ok(HandledRequest { response, strategy, served_from: ServedFrom::Network, cache_writes: Vec::new() })
            }
        }
    }

    async fn network_first(&self, key: &RequestKey) -> Result<HandledRequest, Error> {
        let strategy = Strategy::NetworkFirst;
        match self.fetch_ok(key).await {
            Ok(response) => {
                let write = self.write_through(key, &response).await;
                Ok(HandledRequest { response, strategy, served_from: ServedFrom::Network, cache_writes: vec![write] })
            }
            Err(err) => {
                tracing::info!(request = %key, error = %err, "network failed, trying cache");
                match self.lookup(key).await {
                    Some(response) => {
                        Ok(HandledRequest { response, strategy, served_from: ServedFrom::Cache, cache_writes: Vec::new() })
                    }
                    None => Err(err),
                }
            }
        }
    }

    async fn cache_first(&self, key: &RequestKey) -> Result<HandledRequest, Error> {
        let strategy = Strategy::CacheFirst;
        if let Some(response) = self.lookup(key).await {
            return Ok(HandledRequest { response, strategy, served_from: ServedFrom::Cache, cache_writes: Vec::new() });
        }

        let response = self.fetch_ok(key).await?;
        let write = self.write_through(key, &response).await;
        Ok(HandledRequest { response, strategy, served_from: ServedFrom::Network, cache_writes: vec![write] })
    }

    async fn fetch_ok(&self, key: &RequestKey) -> Result<ResponseSnapshot, Error> {
        let response = self.fetcher.fetch(key).await?;
        if !response.is_success() {
            return Err(Error::HttpError(format!("status {} for {}", response.status_code, key.url)));
        }
        Ok(response)
    }

    /// Cache lookup where a store failure counts as a miss.
    async fn lookup(&self, key: &RequestKey) -> Option<ResponseSnapshot> {
        match self.store.match_entry(&self.generation, key).await {
            Ok(Some(hit)) => {
                tracing::debug!(request = %key, "cache hit");
                Some(hit)
            }
            Ok(None) => {
                tracing::debug!(request = %key, "cache miss");
                None
            }
            Err(e) => {
                tracing::warn!(request = %key, error = %e, "cache lookup failed, treating as miss");
                None
            }
        }
    }

    async fn write_through(&self, key: &RequestKey, response: &ResponseSnapshot) -> CacheWrite {
        let outcome = match self.store.put_entry(&self.generation, key, response).await {
            Ok(()) => WriteOutcome::Stored,
            Err(e) => {
                tracing::warn!(request = %key, error = %e, "cache write failed, returning live response");
                WriteOutcome::Failed(e.to_string())
            }
        };
        CacheWrite { key: key.clone(), outcome }
    }
}
