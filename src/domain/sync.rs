//! Sync run lifecycle types: phases, fetch output, reconciliation summary,
//! and the per-run report the orchestrator produces.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Phase of a sync run. Transitions are strictly forward except for the jump
/// to `Failed`, which is allowed from any phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncPhase {
    Idle,
    Fetching,
    Normalizing,
    Reconciling,
    Checkpointing,
    Failed,
}

impl std::fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Fetching => "fetching",
            Self::Normalizing => "normalizing",
            Self::Reconciling => "reconciling",
            Self::Checkpointing => "checkpointing",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Everything the vendor client pulled in one run.
#[derive(Debug, Clone, Default)]
pub struct FetchOutcome {
    /// Raw items across all pages, in vendor order.
    pub items: Vec<Value>,
    pub pages_fetched: u32,
    /// Pages whose body shape was not recognized and counted as empty.
    pub unrecognized_pages: u32,
}

/// Per-reason skip counters accumulated while normalizing a batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkipCounts {
    pub not_an_object: u32,
    pub missing_external_id: u32,
}

impl SkipCounts {
    pub fn total(&self) -> u32 {
        self.not_an_object + self.missing_external_id
    }
}

/// Counters returned by a reconciliation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileSummary {
    pub products_touched: u32,
    pub products_failed: u32,
    pub variants_upserted: u32,
    pub variants_pruned: u32,
    pub images_added: u32,
    pub images_removed: u32,
}

impl ReconcileSummary {
    pub fn merge(&mut self, other: &ReconcileSummary) {
        self.products_touched += other.products_touched;
        self.products_failed += other.products_failed;
        self.variants_upserted += other.variants_upserted;
        self.variants_pruned += other.variants_pruned;
        self.images_added += other.images_added;
        self.images_removed += other.images_removed;
    }
}

/// Outcome of one orchestrated sync run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncReport {
    pub run_id: Uuid,
    pub source: String,
    /// True when a checkpoint existed and the fetch was scoped to it.
    pub incremental: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub pages_fetched: u32,
    pub unrecognized_pages: u32,
    pub items_fetched: u32,
    pub skipped: SkipCounts,
    pub summary: ReconcileSummary,
}

impl SyncReport {
    pub fn duration_ms(&self) -> i64 {
        (self.finished_at - self.started_at).num_milliseconds()
    }
}
