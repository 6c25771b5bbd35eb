//! Application layer: the sync pipeline services.
//!
//! `normalizer` turns raw vendor JSON into canonical variant records,
//! `category_resolver` and `reconciler` persist them through the repository
//! traits, and `orchestrator` sequences a full run.

pub mod category_resolver;
pub mod normalizer;
pub mod orchestrator;
pub mod reconciler;

pub use category_resolver::CategoryResolver;
pub use normalizer::{normalize, normalize_batch, NormalizedItem};
pub use orchestrator::{ProductFetcher, RunLockRegistry, SyncOrchestrator};
pub use reconciler::CatalogReconciler;
