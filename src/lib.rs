//! catalog-sync: vendor catalog synchronization and reconciliation engine.
//!
//! Ingests a vendor's paginated product feed, normalizes heterogeneous item
//! records into canonical products/variants/categories, and reconciles them
//! into the storefront database with idempotent upserts and deletion of
//! stale children. A small HTTP surface triggers runs; outcomes surface via
//! logs and the per-source sync checkpoint.

pub mod api;
pub mod application;
pub mod domain;
pub mod infrastructure;
