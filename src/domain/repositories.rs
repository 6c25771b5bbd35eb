//! Repository traits for catalog persistence.
//!
//! The reconciler, category resolver, and orchestrator are written against
//! these traits; the sqlx implementation lives in the infrastructure layer
//! and tests exercise the same traits over an in-memory database.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::catalog::{CategoryUpsert, ProductRow, ProductUpsert, VariantRow, VariantUpsert};
use crate::domain::errors::StoreError;

/// Write/read access to the catalog graph (categories, products, variants,
/// gallery images). Every upsert is a single conflict-resolution statement,
/// never read-then-write, so concurrent writers cannot lose updates.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    /// Insert-or-update a category by slug, returning its id. The display
    /// name and parent pointer refresh on conflict; the slug is durable.
    async fn upsert_category(&self, upsert: &CategoryUpsert) -> Result<i64, StoreError>;

    /// Insert-or-update a product by slug, returning its id. Conflict rules:
    /// name refreshes, thumbnail only fills NULL, description only fills
    /// empty, `full_description` is never written.
    async fn upsert_product(&self, upsert: &ProductUpsert) -> Result<i64, StoreError>;

    /// Idempotent product↔category link; a duplicate link is a no-op.
    async fn link_category(&self, product_id: i64, category_id: i64) -> Result<(), StoreError>;

    /// Remove every link of `product_id` except the one to `category_id`.
    /// Used to re-link a product whose vendor category changed.
    async fn unlink_other_categories(
        &self,
        product_id: i64,
        category_id: i64,
    ) -> Result<u64, StoreError>;

    /// Insert-or-update a variant by vendor item id, returning its internal
    /// id. On conflict only price, stock, and the timestamp refresh.
    async fn upsert_variant(&self, upsert: &VariantUpsert) -> Result<i64, StoreError>;

    /// Delete a variant and its gallery images.
    async fn delete_variant(&self, variant_id: i64) -> Result<(), StoreError>;

    /// Persisted gallery URLs for a variant, in sort order.
    async fn gallery_urls(&self, variant_id: i64) -> Result<Vec<String>, StoreError>;

    async fn insert_gallery_image(
        &self,
        product_id: i64,
        variant_id: i64,
        image_url: &str,
        sort_order: i64,
    ) -> Result<(), StoreError>;

    async fn delete_gallery_image(
        &self,
        variant_id: i64,
        image_url: &str,
    ) -> Result<(), StoreError>;

    async fn product_by_slug(&self, slug: &str) -> Result<Option<ProductRow>, StoreError>;

    async fn variants_for_product(&self, product_id: i64) -> Result<Vec<VariantRow>, StoreError>;
}

/// Last-successful-sync bookkeeping, one row per vendor source.
#[async_trait]
pub trait CheckpointRepository: Send + Sync {
    /// `None` means no successful run yet, i.e. the next fetch is full.
    async fn last_sync(&self, source: &str) -> Result<Option<DateTime<Utc>>, StoreError>;

    /// Overwrite the checkpoint for `source`. Called only after a fully
    /// successful reconciliation pass.
    async fn record_success(&self, source: &str, at: DateTime<Utc>) -> Result<(), StoreError>;
}
