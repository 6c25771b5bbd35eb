// Database connection and pool management.
// Handles the SQLite pool and the code-level schema migration for the
// catalog tables.

use anyhow::Result;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::path::Path;

pub struct DatabaseConnection {
    pool: SqlitePool,
}

impl DatabaseConnection {
    pub async fn new(database_url: &str) -> Result<Self> {
        Self::with_max_connections(database_url, 10).await
    }

    pub async fn with_max_connections(database_url: &str, max_connections: u32) -> Result<Self> {
        let db_path = if database_url.starts_with("sqlite://") {
            database_url.trim_start_matches("sqlite://")
        } else if database_url.starts_with("sqlite:") {
            database_url.trim_start_matches("sqlite:")
        } else {
            database_url
        };

        // An in-memory database has no file to create. It also must stay on
        // a single connection: every new connection would see a fresh,
        // empty database.
        let in_memory = db_path == ":memory:";
        if !in_memory {
            if let Some(parent) = Path::new(db_path).parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            if !Path::new(db_path).exists() {
                std::fs::File::create(db_path)?;
            }
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(if in_memory { 1 } else { max_connections })
            .connect(database_url)
            .await?;

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn migrate(&self) -> Result<()> {
        run_migrations(&self.pool).await
    }
}

/// Create the catalog schema. Idempotent; every statement is
/// `IF NOT EXISTS`.
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    let create_categories_sql = r#"
        CREATE TABLE IF NOT EXISTS categories (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            vendor_category_id INTEGER,
            name TEXT,
            slug TEXT NOT NULL UNIQUE,
            parent_id INTEGER REFERENCES categories (id),
            created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
    "#;

    let create_products_sql = r#"
        CREATE TABLE IF NOT EXISTS products (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            slug TEXT NOT NULL UNIQUE,
            description TEXT,
            full_description TEXT,
            thumbnail_url TEXT,
            cover_image_url TEXT,
            is_active BOOLEAN NOT NULL DEFAULT 1,
            created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
    "#;

    let create_variants_sql = r#"
        CREATE TABLE IF NOT EXISTS product_variants (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            product_id INTEGER NOT NULL REFERENCES products (id) ON DELETE CASCADE,
            vendor_item_id INTEGER NOT NULL UNIQUE,
            sku TEXT,
            name TEXT NOT NULL,
            attributes TEXT,
            price REAL NOT NULL DEFAULT 0,
            stock INTEGER NOT NULL DEFAULT 0,
            created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
    "#;

    let create_images_sql = r#"
        CREATE TABLE IF NOT EXISTS product_images (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            product_id INTEGER NOT NULL REFERENCES products (id) ON DELETE CASCADE,
            variant_id INTEGER REFERENCES product_variants (id) ON DELETE CASCADE,
            image_url TEXT NOT NULL,
            image_type TEXT NOT NULL DEFAULT 'gallery',
            sort_order INTEGER NOT NULL DEFAULT 0,
            created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
    "#;

    let create_links_sql = r#"
        CREATE TABLE IF NOT EXISTS product_categories (
            product_id INTEGER NOT NULL REFERENCES products (id) ON DELETE CASCADE,
            category_id INTEGER NOT NULL REFERENCES categories (id) ON DELETE CASCADE,
            PRIMARY KEY (product_id, category_id)
        )
    "#;

    let create_checkpoints_sql = r#"
        CREATE TABLE IF NOT EXISTS sync_checkpoints (
            source TEXT PRIMARY KEY,
            last_sync_at DATETIME NOT NULL
        )
    "#;

    let create_indexes_sql = r#"
        CREATE INDEX IF NOT EXISTS idx_categories_parent_id ON categories (parent_id);
        CREATE INDEX IF NOT EXISTS idx_variants_product_id ON product_variants (product_id);
        CREATE INDEX IF NOT EXISTS idx_images_variant_id ON product_images (variant_id);
        CREATE INDEX IF NOT EXISTS idx_images_product_id ON product_images (product_id);
    "#;

    sqlx::query(create_categories_sql).execute(pool).await?;
    sqlx::query(create_products_sql).execute(pool).await?;
    sqlx::query(create_variants_sql).execute(pool).await?;
    sqlx::query(create_images_sql).execute(pool).await?;
    sqlx::query(create_links_sql).execute(pool).await?;
    sqlx::query(create_checkpoints_sql).execute(pool).await?;
    sqlx::query(create_indexes_sql).execute(pool).await?;

    Ok(())
}
