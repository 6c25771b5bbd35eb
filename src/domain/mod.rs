//! Domain layer: canonical catalog entities, identity derivation, sync run
//! types, error taxonomy, and the repository traits the application layer is
//! wired against.

pub mod catalog;
pub mod errors;
pub mod repositories;
pub mod slug;
pub mod sync;

pub use catalog::{
    CategoryFields, CategoryUpsert, ProductRow, ProductUpsert, VariantRecord, VariantRow,
    VariantUpsert,
};
pub use errors::{SkipReason, StoreError, SyncError};
pub use repositories::{CatalogRepository, CheckpointRepository};
pub use sync::{FetchOutcome, ReconcileSummary, SkipCounts, SyncPhase, SyncReport};
