//! Sqlx implementation of the catalog and checkpoint repositories.
//!
//! Every upsert is a single `INSERT ... ON CONFLICT ... DO UPDATE` statement
//! with the guard semantics (thumbnail fills NULL, description fills empty,
//! variant ownership never migrates) expressed in SQL so the write stays
//! atomic under concurrent readers and overlapping runs.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use std::sync::Arc;

use crate::domain::catalog::{
    CategoryUpsert, ProductRow, ProductUpsert, VariantRow, VariantUpsert,
};
use crate::domain::errors::StoreError;
use crate::domain::repositories::{CatalogRepository, CheckpointRepository};

#[derive(Clone)]
pub struct SqliteCatalogRepository {
    pool: Arc<SqlitePool>,
}

impl SqliteCatalogRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// Surface unique/foreign-key violations as `Conflict` so the reconciler can
/// apply its retry-once policy; everything else stays a database error.
fn map_sqlx(entity: &str, err: sqlx::Error) -> StoreError {
    if let Some(db_err) = err.as_database_error() {
        let kind = db_err.kind();
        if matches!(
            kind,
            sqlx::error::ErrorKind::UniqueViolation | sqlx::error::ErrorKind::ForeignKeyViolation
        ) {
            return StoreError::Conflict {
                entity: entity.to_string(),
                detail: db_err.message().to_string(),
            };
        }
    }
    StoreError::Database(err)
}

#[async_trait]
impl CatalogRepository for SqliteCatalogRepository {
    async fn upsert_category(&self, upsert: &CategoryUpsert) -> Result<i64, StoreError> {
        let row = sqlx::query(
            r#"
            INSERT INTO categories (vendor_category_id, name, slug, parent_id, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT (slug) DO UPDATE SET
                name = excluded.name,
                parent_id = excluded.parent_id,
                updated_at = excluded.updated_at
            RETURNING id
            "#,
        )
        .bind(upsert.vendor_category_id)
        .bind(&upsert.name)
        .bind(&upsert.slug)
        .bind(upsert.parent_id)
        .bind(Utc::now())
        .bind(Utc::now())
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx("categories", e))?;

        Ok(row.get("id"))
    }

    async fn upsert_product(&self, upsert: &ProductUpsert) -> Result<i64, StoreError> {
        // thumbnail_url only fills a NULL; description only fills an empty
        // value (CMS edits survive every sync); full_description is
        // insert-only NULL and never part of the update set.
        let row = sqlx::query(
            r#"
            INSERT INTO products (name, slug, description, full_description, thumbnail_url, created_at, updated_at)
            VALUES (?, ?, ?, NULL, ?, ?, ?)
            ON CONFLICT (slug) DO UPDATE SET
                name = excluded.name,
                thumbnail_url = COALESCE(products.thumbnail_url, excluded.thumbnail_url),
                description = CASE
                    WHEN products.description IS NULL OR products.description = ''
                    THEN excluded.description
                    ELSE products.description
                END,
                updated_at = excluded.updated_at
            RETURNING id
            "#,
        )
        .bind(&upsert.name)
        .bind(&upsert.slug)
        .bind(&upsert.description)
        .bind(&upsert.thumbnail_url)
        .bind(Utc::now())
        .bind(Utc::now())
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx("products", e))?;

        Ok(row.get("id"))
    }

    async fn link_category(&self, product_id: i64, category_id: i64) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO product_categories (product_id, category_id)
            VALUES (?, ?)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(product_id)
        .bind(category_id)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx("product_categories", e))?;
        Ok(())
    }

    async fn unlink_other_categories(
        &self,
        product_id: i64,
        category_id: i64,
    ) -> Result<u64, StoreError> {
        let result = sqlx::query(
            r#"
            DELETE FROM product_categories
            WHERE product_id = ? AND category_id <> ?
            "#,
        )
        .bind(product_id)
        .bind(category_id)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx("product_categories", e))?;
        Ok(result.rows_affected())
    }

    async fn upsert_variant(&self, upsert: &VariantUpsert) -> Result<i64, StoreError> {
        // Ownership never migrates: product_id is not in the update set. If
        // the vendor reassigns an item id, the existing row keeps its
        // product and only price/stock refresh.
        let row = sqlx::query(
            r#"
            INSERT INTO product_variants
                (product_id, vendor_item_id, sku, name, attributes, price, stock, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (vendor_item_id) DO UPDATE SET
                price = excluded.price,
                stock = excluded.stock,
                updated_at = excluded.updated_at
            RETURNING id
            "#,
        )
        .bind(upsert.product_id)
        .bind(upsert.vendor_item_id)
        .bind(&upsert.sku)
        .bind(&upsert.name)
        .bind(&upsert.attributes)
        .bind(upsert.price)
        .bind(upsert.stock)
        .bind(Utc::now())
        .bind(Utc::now())
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx("product_variants", e))?;

        Ok(row.get("id"))
    }

    async fn delete_variant(&self, variant_id: i64) -> Result<(), StoreError> {
        // Images first: not every deployment runs with foreign_keys=ON, so
        // the cascade is done explicitly.
        sqlx::query("DELETE FROM product_images WHERE variant_id = ?")
            .bind(variant_id)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx("product_images", e))?;

        sqlx::query("DELETE FROM product_variants WHERE id = ?")
            .bind(variant_id)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx("product_variants", e))?;
        Ok(())
    }

    async fn gallery_urls(&self, variant_id: i64) -> Result<Vec<String>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT image_url
            FROM product_images
            WHERE variant_id = ? AND image_type = 'gallery'
            ORDER BY sort_order, id
            "#,
        )
        .bind(variant_id)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx("product_images", e))?;

        Ok(rows.into_iter().map(|row| row.get("image_url")).collect())
    }

    async fn insert_gallery_image(
        &self,
        product_id: i64,
        variant_id: i64,
        image_url: &str,
        sort_order: i64,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO product_images (product_id, variant_id, image_url, image_type, sort_order, created_at)
            VALUES (?, ?, ?, 'gallery', ?, ?)
            "#,
        )
        .bind(product_id)
        .bind(variant_id)
        .bind(image_url)
        .bind(sort_order)
        .bind(Utc::now())
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx("product_images", e))?;
        Ok(())
    }

    async fn delete_gallery_image(
        &self,
        variant_id: i64,
        image_url: &str,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            DELETE FROM product_images
            WHERE variant_id = ? AND image_url = ? AND image_type = 'gallery'
            "#,
        )
        .bind(variant_id)
        .bind(image_url)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx("product_images", e))?;
        Ok(())
    }

    async fn product_by_slug(&self, slug: &str) -> Result<Option<ProductRow>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, slug, name, description, full_description, thumbnail_url, updated_at
            FROM products
            WHERE slug = ?
            "#,
        )
        .bind(slug)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx("products", e))?;

        Ok(row.map(|row| ProductRow {
            id: row.get("id"),
            slug: row.get("slug"),
            name: row.get("name"),
            description: row.get("description"),
            full_description: row.get("full_description"),
            thumbnail_url: row.get("thumbnail_url"),
            updated_at: row.get("updated_at"),
        }))
    }

    async fn variants_for_product(&self, product_id: i64) -> Result<Vec<VariantRow>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, product_id, vendor_item_id, sku, name, price, stock
            FROM product_variants
            WHERE product_id = ?
            ORDER BY vendor_item_id
            "#,
        )
        .bind(product_id)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx("product_variants", e))?;

        Ok(rows
            .into_iter()
            .map(|row| VariantRow {
                id: row.get("id"),
                product_id: row.get("product_id"),
                vendor_item_id: row.get("vendor_item_id"),
                sku: row.get("sku"),
                name: row.get("name"),
                price: row.get("price"),
                stock: row.get("stock"),
            })
            .collect())
    }
}

#[async_trait]
impl CheckpointRepository for SqliteCatalogRepository {
    async fn last_sync(&self, source: &str) -> Result<Option<DateTime<Utc>>, StoreError> {
        let row = sqlx::query("SELECT last_sync_at FROM sync_checkpoints WHERE source = ?")
            .bind(source)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx("sync_checkpoints", e))?;

        Ok(row.map(|row| row.get("last_sync_at")))
    }

    async fn record_success(&self, source: &str, at: DateTime<Utc>) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO sync_checkpoints (source, last_sync_at)
            VALUES (?, ?)
            ON CONFLICT (source) DO UPDATE SET last_sync_at = excluded.last_sync_at
            "#,
        )
        .bind(source)
        .bind(at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx("sync_checkpoints", e))?;
        Ok(())
    }
}
