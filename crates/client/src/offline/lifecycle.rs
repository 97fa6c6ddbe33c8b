//! Worker lifecycle: install the shell, reclaim old generations, take over.
//!
//! ```text
//! Parsed -> Installing -> Installed -> [Waiting] -> Activating -> Activated
//!                 \-> Redundant (install failed)
//! ```
//!
//! Install populates the current generation with every shell asset or
//! nothing at all. Activation deletes every other generation, records the
//! current one as active, and claims it for all subsequent requests. Until
//! then, a previously active generation (from an earlier run) may keep
//! serving.

use std::sync::Arc;

use futures::future::{join_all, try_join_all};
use serde::Serialize;
use tokio::sync::RwLock;
use top10_core::{CacheStore, Error, RequestKey};

use super::router::{HandledRequest, RequestRouter, RoutePolicy};
use super::shell::ShellManifest;
use crate::fetch::Fetcher;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    Parsed,
    Installing,
    Installed,
    Waiting,
    Activating,
    Activated,
    Redundant,
}

impl WorkerState {
    /// Install or activation is running.
    pub fn is_busy(self) -> bool {
        matches!(self, WorkerState::Installing | WorkerState::Activating)
    }
}

/// Outcome of deleting stale generations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReclaimReport {
    pub deleted: Vec<String>,
    pub failed: Vec<ReclaimFailure>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReclaimFailure {
    pub generation: String,
    pub reason: String,
}

/// How `start` left the worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum StartOutcome {
    /// The current generation was installed, activated and claimed.
    Activated { generation: String, reclaim: ReclaimReport },
    /// Installed, but the previous generation keeps serving until
    /// `skip_waiting` is called.
    Waiting { generation: String, serving: String },
    /// Install failed; an earlier generation keeps serving.
    ServingPrevious { generation: String, install_error: String },
}

/// Cache Store Manager plus the takeover rules around it.
pub struct ShellWorker {
    manifest: ShellManifest,
    policy: RoutePolicy,
    store: Arc<dyn CacheStore>,
    fetcher: Arc<dyn Fetcher>,
    skip_waiting: bool,
    state: RwLock<WorkerState>,
    controlling: RwLock<Option<String>>,
}

impl ShellWorker {
    pub fn new(
        manifest: ShellManifest, policy: RoutePolicy, store: Arc<dyn CacheStore>, fetcher: Arc<dyn Fetcher>,
    ) -> Self {
        Self {
            manifest,
            policy,
            store,
            fetcher,
            skip_waiting: true,
            state: RwLock::new(WorkerState::Parsed),
            controlling: RwLock::new(None),
        }
    }

    /// Whether an installed worker may activate while an older generation
    /// is still active.
    pub fn with_skip_waiting(mut self, skip_waiting: bool) -> Self {
        self.skip_waiting = skip_waiting;
        self
    }

    pub fn manifest(&self) -> &ShellManifest {
        &self.manifest
    }

    pub fn store(&self) -> &Arc<dyn CacheStore> {
        &self.store
    }

    pub async fn state(&self) -> WorkerState {
        *self.state.read().await
    }

    /// Generation currently answering requests, if any.
    pub async fn controlling_generation(&self) -> Option<String> {
        self.controlling.read().await.clone()
    }

    async fn set_state(&self, next: WorkerState) {
        let mut state = self.state.write().await;
        tracing::info!(from = ?*state, to = ?next, generation = %self.manifest.cache_name(), "worker state change");
        *state = next;
    }

    /// Check and change the state under one lock. Returns the state left.
    async fn enter(&self, next: WorkerState, allowed: impl Fn(WorkerState) -> bool) -> Result<WorkerState, Error> {
        let mut state = self.state.write().await;
        let previous = *state;
        if !allowed(previous) {
            return Err(Error::Lifecycle(format!("cannot move from {previous:?} to {next:?}")));
        }
        tracing::info!(from = ?previous, to = ?next, generation = %self.manifest.cache_name(), "worker state change");
        *state = next;
        Ok(previous)
    }

    /// Fetch every shell asset and store them in the current generation.
    ///
    /// Assets are fetched concurrently; the generation and its entries are
    /// written in a single batch only after all of them arrived, so a failed
    /// install leaves nothing behind. Re-running replaces the snapshots
    /// under the same keys. Returns the number of entries written.
    ///
    /// # Errors
    ///
    /// `SHELL_INSTALL_FAILED` naming the first asset that could not be
    /// fetched, or the store error if the batch write failed.
    pub async fn initialize(&self) -> Result<usize, Error> {
        let generation = self.manifest.cache_name();
        let keys = self.manifest.asset_keys();
        tracing::info!(generation, assets = keys.len(), "caching shell assets");

        let entries = try_join_all(keys.into_iter().map(|key| async move {
            match self.fetcher.fetch(&key).await {
                Ok(response) if response.is_success() => Ok((key, response)),
                Ok(response) => Err(Error::ShellInstallFailed {
                    url: key.url,
                    reason: format!("status {}", response.status_code),
                }),
                Err(e) => Err(Error::ShellInstallFailed { url: key.url, reason: e.to_string() }),
            }
        }))
        .await?;

        self.store.put_entries(generation, &entries).await?;
        Ok(entries.len())
    }

    /// Delete every generation whose name differs from the current one.
    ///
    /// Deletions run concurrently and independently; failures are logged
    /// and reported, never returned as an error.
    pub async fn reclaim(&self) -> ReclaimReport {
        let current = self.manifest.cache_name();
        let names = match self.store.generation_names().await {
            Ok(names) => names,
            Err(e) => {
                tracing::warn!(error = %e, "could not list cache generations, skipping cleanup");
                return ReclaimReport::default();
            }
        };

        let stale = names.into_iter().filter(|name| name != current);
        let results = join_all(stale.map(|name| async move {
            tracing::info!(generation = %name, "clearing old cache");
            let result = self.store.delete_generation(&name).await;
            (name, result)
        }))
        .await;

        let mut report = ReclaimReport::default();
        for (generation, result) in results {
            match result {
                Ok(_) => report.deleted.push(generation),
                Err(e) => {
                    tracing::warn!(generation = %generation, error = %e, "failed to delete old cache");
                    report.failed.push(ReclaimFailure { generation, reason: e.to_string() });
                }
            }
        }
        report
    }

    /// Install step: populate the shell and move to `Installed`.
    ///
    /// A failed install marks the worker `Redundant`.
    pub async fn install(&self) -> Result<usize, Error> {
        self.enter(WorkerState::Installing, |s| !s.is_busy()).await?;
        match self.initialize().await {
            Ok(count) => {
                self.set_state(WorkerState::Installed).await;
                Ok(count)
            }
            Err(e) => {
                tracing::warn!(error = %e, "shell install failed");
                self.set_state(WorkerState::Redundant).await;
                Err(e)
            }
        }
    }

    /// Activate an installed (or waiting) worker: reclaim, record, claim.
    ///
    /// # Errors
    ///
    /// `LIFECYCLE_ERROR` if the worker has not completed install.
    pub async fn activate(&self) -> Result<ReclaimReport, Error> {
        self.enter(WorkerState::Activating, |s| matches!(s, WorkerState::Installed | WorkerState::Waiting))
            .await?;
        let report = self.reclaim().await;

        if let Err(e) = self.store.mark_active(self.manifest.cache_name()).await {
            tracing::warn!(error = %e, "failed to record active generation");
        }

        self.set_state(WorkerState::Activated).await;
        self.claim().await?;
        Ok(report)
    }

    /// Start controlling requests with the current generation.
    pub async fn claim(&self) -> Result<(), Error> {
        if self.state().await != WorkerState::Activated {
            return Err(Error::Lifecycle("only an activated worker can claim".into()));
        }
        let generation = self.manifest.cache_name().to_string();
        tracing::info!(generation = %generation, "claiming control");
        *self.controlling.write().await = Some(generation);
        Ok(())
    }

    /// Release a waiting worker and activate it now.
    pub async fn skip_waiting(&self) -> Result<ReclaimReport, Error> {
        if self.state().await != WorkerState::Waiting {
            return Err(Error::Lifecycle("worker is not waiting".into()));
        }
        self.activate().await
    }

    /// Bring the worker up: install, then activate and claim unless it has
    /// to wait for a previous generation.
    ///
    /// # Errors
    ///
    /// Returns the install error only when no earlier generation is left to
    /// serve from.
    pub async fn start(&self) -> Result<StartOutcome, Error> {
        let current = self.manifest.cache_name().to_string();
        let previous = match self.store.active_generation().await {
            Ok(previous) => previous,
            Err(e) => {
                tracing::warn!(error = %e, "could not read active generation");
                None
            }
        };

        if let Err(e) = self.install().await {
            let Some(previous) = previous else {
                return Err(e);
            };
            tracing::warn!(
                generation = %previous,
                error = %e,
                "install failed, previous generation keeps serving"
            );
            *self.controlling.write().await = Some(previous.clone());
            return Ok(StartOutcome::ServingPrevious { generation: previous, install_error: e.to_string() });
        }

        if let Some(previous) = previous.filter(|p| *p != current && !self.skip_waiting) {
            self.set_state(WorkerState::Waiting).await;
            *self.controlling.write().await = Some(previous.clone());
            return Ok(StartOutcome::Waiting { generation: current, serving: previous });
        }

        let reclaim = self.activate().await?;
        Ok(StartOutcome::Activated { generation: current, reclaim })
    }

    /// Re-populate the shell and, if the worker is not active yet, activate
    /// it.
    ///
    /// An active worker returns to `Activated`; its shell entries are
    /// refreshed in place. A failed update restores the previous state.
    ///
    /// # Errors
    ///
    /// `LIFECYCLE_ERROR` while another install or activation is running.
    pub async fn update(&self) -> Result<(usize, Option<ReclaimReport>), Error> {
        let previous = self.enter(WorkerState::Installing, |s| !s.is_busy()).await?;
        let stored = match self.initialize().await {
            Ok(stored) => stored,
            Err(e) => {
                tracing::warn!(error = %e, "shell update failed");
                self.set_state(previous).await;
                return Err(e);
            }
        };
        if previous == WorkerState::Activated {
            self.set_state(WorkerState::Activated).await;
            return Ok((stored, None));
        }
        self.set_state(WorkerState::Installed).await;
        let report = self.activate().await?;
        Ok((stored, Some(report)))
    }

    /// Router bound to the controlling generation.
    pub async fn router(&self) -> Result<RequestRouter, Error> {
        let generation = self.controlling_generation().await.ok_or(Error::NotControlled)?;
        Ok(RequestRouter::new(self.store.clone(), self.fetcher.clone(), generation, self.policy.clone()))
    }

    /// Route one request through the controlling generation.
    pub async fn handle(&self, key: &RequestKey) -> Result<HandledRequest, Error> {
        self.router().await?.handle(key).await
    }
}
