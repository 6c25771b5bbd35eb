//! Sync orchestrator: sequences fetch → normalize → reconcile → checkpoint
//! and owns the per-source run lock.
//!
//! The checkpoint is only advanced after a fully successful pass, so a
//! failed run retries the same incremental window next time. Fetch and
//! reconcile are deliberately not transactionally linked: a crash between
//! them just means the next run reconciles possibly-identical data, which is
//! safe because reconciliation is idempotent.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{error, info, info_span, Instrument};
use uuid::Uuid;

use crate::application::normalizer::normalize_batch;
use crate::application::reconciler::CatalogReconciler;
use crate::domain::errors::SyncError;
use crate::domain::repositories::CheckpointRepository;
use crate::domain::sync::{FetchOutcome, SyncPhase, SyncReport};

/// Seam between the orchestrator and the vendor HTTP client, so runs can be
/// driven by a test double.
#[async_trait]
pub trait ProductFetcher: Send + Sync {
    /// Fetch the full catalog, or only items changed after `since`.
    async fn fetch(&self, since: Option<DateTime<Utc>>) -> Result<FetchOutcome, SyncError>;
}

/// In-process per-source run locks. Two overlapping reconciliations on the
/// same source could race on stale-variant pruning (one deleting a variant
/// the other just inserted), so a second run for a held source is rejected
/// outright rather than queued.
#[derive(Clone, Default)]
pub struct RunLockRegistry {
    held: Arc<Mutex<HashSet<String>>>,
}

impl RunLockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Try to take the lock for `source`. The guard releases on drop.
    pub fn try_acquire(&self, source: &str) -> Result<RunLockGuard, SyncError> {
        let mut held = self.held.lock().unwrap_or_else(|e| e.into_inner());
        if !held.insert(source.to_string()) {
            return Err(SyncError::SyncInProgress {
                source: source.to_string(),
            });
        }
        Ok(RunLockGuard {
            registry: self.clone(),
            source: source.to_string(),
        })
    }

    pub fn is_running(&self, source: &str) -> bool {
        self.held
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(source)
    }
}

pub struct RunLockGuard {
    registry: RunLockRegistry,
    source: String,
}

impl Drop for RunLockGuard {
    fn drop(&mut self) {
        self.registry
            .held
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&self.source);
    }
}

pub struct SyncOrchestrator {
    fetcher: Arc<dyn ProductFetcher>,
    reconciler: CatalogReconciler,
    checkpoints: Arc<dyn CheckpointRepository>,
    locks: RunLockRegistry,
}

impl SyncOrchestrator {
    pub fn new(
        fetcher: Arc<dyn ProductFetcher>,
        reconciler: CatalogReconciler,
        checkpoints: Arc<dyn CheckpointRepository>,
        locks: RunLockRegistry,
    ) -> Self {
        Self {
            fetcher,
            reconciler,
            checkpoints,
            locks,
        }
    }

    pub fn locks(&self) -> &RunLockRegistry {
        &self.locks
    }

    /// Run one sync pass for `source` to completion.
    pub async fn run(&self, source: &str) -> Result<SyncReport, SyncError> {
        let _guard = self.locks.try_acquire(source)?;

        let run_id = Uuid::new_v4();
        let span = info_span!("sync_run", %run_id, source);
        self.run_locked(run_id, source).instrument(span).await
    }

    async fn run_locked(&self, run_id: Uuid, source: &str) -> Result<SyncReport, SyncError> {
        let started_at = Utc::now();

        let since = self
            .checkpoints
            .last_sync(source)
            .await
            .map_err(SyncError::Store)?;
        let incremental = since.is_some();
        match since {
            Some(since) => info!(%since, "starting incremental sync"),
            None => info!("no checkpoint found, starting full sync"),
        }

        info!(phase = %SyncPhase::Fetching, "phase transition");
        let fetched = match self.fetcher.fetch(since).await {
            Ok(fetched) => fetched,
            Err(err) => {
                error!(phase = %SyncPhase::Failed, %err, "fetch failed, checkpoint not advanced");
                return Err(err);
            }
        };
        let items_fetched = fetched.items.len() as u32;

        info!(phase = %SyncPhase::Normalizing, items = items_fetched, "phase transition");
        let (records, skipped) = normalize_batch(&fetched.items);
        if skipped.total() > 0 {
            info!(
                not_an_object = skipped.not_an_object,
                missing_external_id = skipped.missing_external_id,
                "skipped malformed vendor items"
            );
        }

        info!(phase = %SyncPhase::Reconciling, records = records.len(), "phase transition");
        let summary = self.reconciler.reconcile(records).await;

        info!(phase = %SyncPhase::Checkpointing, "phase transition");
        let finished_at = Utc::now();
        if let Err(err) = self.checkpoints.record_success(source, finished_at).await {
            error!(phase = %SyncPhase::Failed, %err, "checkpoint write failed");
            return Err(SyncError::Checkpoint(err));
        }

        let report = SyncReport {
            run_id,
            source: source.to_string(),
            incremental,
            started_at,
            finished_at,
            pages_fetched: fetched.pages_fetched,
            unrecognized_pages: fetched.unrecognized_pages,
            items_fetched,
            skipped,
            summary,
        };
        info!(
            phase = %SyncPhase::Idle,
            duration_ms = report.duration_ms(),
            touched = summary.products_touched,
            failed = summary.products_failed,
            "sync run complete"
        );
        Ok(report)
    }
}
