//! End-to-end reconciliation tests against an in-memory SQLite store.

use std::sync::Arc;

use serde_json::{json, Value};
use sqlx::Row;

use catalog_sync::application::{normalize_batch, CatalogReconciler};
use catalog_sync::domain::repositories::{CatalogRepository, CheckpointRepository};
use catalog_sync::domain::sync::ReconcileSummary;
use catalog_sync::infrastructure::{DatabaseConnection, SqliteCatalogRepository};

async fn setup() -> (Arc<SqliteCatalogRepository>, CatalogReconciler) {
    let db = DatabaseConnection::new("sqlite::memory:")
        .await
        .expect("in-memory database");
    db.migrate().await.expect("migrations");
    let repo = Arc::new(SqliteCatalogRepository::new(db.pool().clone()));
    let reconciler = CatalogReconciler::new(repo.clone() as Arc<dyn CatalogRepository>);
    (repo, reconciler)
}

async fn reconcile_items(reconciler: &CatalogReconciler, items: &[Value]) -> ReconcileSummary {
    let (records, _) = normalize_batch(items);
    reconciler.reconcile(records).await
}

fn two_shirts() -> Vec<Value> {
    vec![
        json!({"id": 1, "name": "Shirt (Blue)", "sku": "S1", "sellprice": "100", "stock": "5"}),
        json!({"id": 2, "name": "Shirt (Red)", "sku": "S2", "sellprice": "110", "stock": "0"}),
    ]
}

#[tokio::test]
async fn two_raw_items_become_one_product_with_two_variants() {
    let (repo, reconciler) = setup().await;

    let summary = reconcile_items(&reconciler, &two_shirts()).await;
    assert_eq!(summary.products_touched, 1);
    assert_eq!(summary.products_failed, 0);
    assert_eq!(summary.variants_upserted, 2);

    let product = repo.product_by_slug("shirt").await.unwrap().expect("product");
    assert_eq!(product.name, "Shirt");

    let variants = repo.variants_for_product(product.id).await.unwrap();
    assert_eq!(variants.len(), 2);

    let blue = variants.iter().find(|v| v.vendor_item_id == 1).unwrap();
    assert_eq!(blue.name, "Blue");
    assert_eq!(blue.price, 100.0);
    assert_eq!(blue.stock, 5);

    let red = variants.iter().find(|v| v.vendor_item_id == 2).unwrap();
    assert_eq!(red.name, "Red");
    assert_eq!(red.price, 110.0);
    assert_eq!(red.stock, 0);

    // The attributes column carries the variant label.
    let row = sqlx::query("SELECT attributes FROM product_variants WHERE vendor_item_id = 1")
        .fetch_one(repo.pool())
        .await
        .unwrap();
    let attributes: String = row.get("attributes");
    assert_eq!(attributes, r#"{"variant":"Blue"}"#);
}

#[tokio::test]
async fn reconcile_is_idempotent() {
    let (repo, reconciler) = setup().await;

    let items = vec![
        json!({
            "id": 1, "name": "Shirt (Blue)", "sku": "S1",
            "imageList": ["a.jpg", "b.jpg"], "imagepath": "thumb.jpg"
        }),
        json!({"id": 2, "name": "Shirt (Red)", "sku": "S2"}),
    ];

    let first = reconcile_items(&reconciler, &items).await;
    assert_eq!(first.images_added, 2);

    let second = reconcile_items(&reconciler, &items).await;
    assert_eq!(second.products_touched, 1);
    assert_eq!(second.variants_upserted, 2);
    assert_eq!(second.variants_pruned, 0);
    // Zero image churn on the second identical run.
    assert_eq!(second.images_added, 0);
    assert_eq!(second.images_removed, 0);

    let product = repo.product_by_slug("shirt").await.unwrap().unwrap();
    assert_eq!(repo.variants_for_product(product.id).await.unwrap().len(), 2);
}

#[tokio::test]
async fn stale_variant_is_pruned_on_next_run() {
    let (repo, reconciler) = setup().await;

    reconcile_items(&reconciler, &two_shirts()).await;

    // Run N+1: item 2 disappeared from the vendor payload.
    let summary = reconcile_items(
        &reconciler,
        &[json!({"id": 1, "name": "Shirt (Blue)", "sku": "S1", "sellprice": "100", "stock": "5"})],
    )
    .await;
    assert_eq!(summary.variants_pruned, 1);

    let product = repo.product_by_slug("shirt").await.unwrap().unwrap();
    let variants = repo.variants_for_product(product.id).await.unwrap();
    assert_eq!(variants.len(), 1);
    assert_eq!(variants[0].vendor_item_id, 1);
}

#[tokio::test]
async fn image_set_converges_on_incoming_payload() {
    let (repo, reconciler) = setup().await;

    reconcile_items(
        &reconciler,
        &[json!({"id": 1, "name": "Mug", "imageList": ["a.jpg", "b.jpg", "c.jpg"]})],
    )
    .await;

    let product = repo.product_by_slug("mug").await.unwrap().unwrap();
    let variant_id = repo.variants_for_product(product.id).await.unwrap()[0].id;
    assert_eq!(
        repo.gallery_urls(variant_id).await.unwrap(),
        vec!["a.jpg", "b.jpg", "c.jpg"]
    );

    // b dropped, d added; a and c keep their rows.
    let summary = reconcile_items(
        &reconciler,
        &[json!({"id": 1, "name": "Mug", "imageList": ["a.jpg", "c.jpg", "d.jpg"]})],
    )
    .await;
    assert_eq!(summary.images_added, 1);
    assert_eq!(summary.images_removed, 1);

    let urls = repo.gallery_urls(variant_id).await.unwrap();
    assert_eq!(urls.len(), 3);
    assert!(urls.contains(&"a.jpg".to_string()));
    assert!(urls.contains(&"c.jpg".to_string()));
    assert!(urls.contains(&"d.jpg".to_string()));

    // Empty incoming removes everything.
    let summary = reconcile_items(&reconciler, &[json!({"id": 1, "name": "Mug"})]).await;
    assert_eq!(summary.images_removed, 3);
    assert!(repo.gallery_urls(variant_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn description_is_write_once_from_vendor() {
    let (repo, reconciler) = setup().await;

    reconcile_items(
        &reconciler,
        &[json!({"id": 1, "name": "Mug", "description": "first description"})],
    )
    .await;

    let summary = reconcile_items(
        &reconciler,
        &[json!({"id": 1, "name": "Mug", "description": "vendor rewrote this"})],
    )
    .await;
    assert_eq!(summary.products_failed, 0);

    let product = repo.product_by_slug("mug").await.unwrap().unwrap();
    assert_eq!(product.description.as_deref(), Some("first description"));
    // full_description is never populated by sync.
    assert!(product.full_description.is_none());
}

#[tokio::test]
async fn cms_edited_description_survives_sync() {
    let (repo, reconciler) = setup().await;

    reconcile_items(&reconciler, &[json!({"id": 1, "name": "Mug"})]).await;

    // Back-office edit between runs.
    sqlx::query("UPDATE products SET description = 'hand-written copy' WHERE slug = 'mug'")
        .execute(repo.pool())
        .await
        .unwrap();

    reconcile_items(
        &reconciler,
        &[json!({"id": 1, "name": "Mug", "description": "vendor copy"})],
    )
    .await;

    let product = repo.product_by_slug("mug").await.unwrap().unwrap();
    assert_eq!(product.description.as_deref(), Some("hand-written copy"));
}

#[tokio::test]
async fn thumbnail_only_fills_when_unset() {
    let (repo, reconciler) = setup().await;

    reconcile_items(&reconciler, &[json!({"id": 1, "name": "Mug", "imagepath": "v1.jpg"})]).await;
    reconcile_items(&reconciler, &[json!({"id": 1, "name": "Mug", "imagepath": "v2.jpg"})]).await;

    let product = repo.product_by_slug("mug").await.unwrap().unwrap();
    assert_eq!(product.thumbnail_url.as_deref(), Some("v1.jpg"));
}

#[tokio::test]
async fn category_hierarchy_is_upserted_and_product_linked() {
    let (repo, reconciler) = setup().await;

    reconcile_items(
        &reconciler,
        &[json!({
            "id": 1, "name": "Shirt",
            "categoryid": 5, "category": "Apparel",
            "subCategoryId": 7, "subCategory": "Tops"
        })],
    )
    .await;

    let root = sqlx::query("SELECT id, parent_id FROM categories WHERE slug = 'apparel-5'")
        .fetch_one(repo.pool())
        .await
        .unwrap();
    assert!(root.get::<Option<i64>, _>("parent_id").is_none());

    let sub = sqlx::query("SELECT parent_id FROM categories WHERE slug = 'tops-7'")
        .fetch_one(repo.pool())
        .await
        .unwrap();
    assert_eq!(sub.get::<Option<i64>, _>("parent_id"), Some(root.get::<i64, _>("id")));

    // Product is linked to the leaf (subcategory).
    let product = repo.product_by_slug("shirt").await.unwrap().unwrap();
    let link = sqlx::query("SELECT category_id FROM product_categories WHERE product_id = ?")
        .bind(product.id)
        .fetch_one(repo.pool())
        .await
        .unwrap();
    let sub_id: i64 =
        sqlx::query("SELECT id FROM categories WHERE slug = 'tops-7'")
            .fetch_one(repo.pool())
            .await
            .unwrap()
            .get("id");
    assert_eq!(link.get::<i64, _>("category_id"), sub_id);
}

#[tokio::test]
async fn product_is_relinked_when_vendor_category_changes() {
    let (repo, reconciler) = setup().await;

    reconcile_items(
        &reconciler,
        &[json!({"id": 1, "name": "Shirt", "categoryid": 5, "category": "Apparel"})],
    )
    .await;
    reconcile_items(
        &reconciler,
        &[json!({"id": 1, "name": "Shirt", "categoryid": 9, "category": "Clearance"})],
    )
    .await;

    let product = repo.product_by_slug("shirt").await.unwrap().unwrap();
    let links = sqlx::query("SELECT category_id FROM product_categories WHERE product_id = ?")
        .bind(product.id)
        .fetch_all(repo.pool())
        .await
        .unwrap();
    assert_eq!(links.len(), 1, "stale category link must be removed");

    let current: i64 = sqlx::query("SELECT id FROM categories WHERE slug = 'clearance-9'")
        .fetch_one(repo.pool())
        .await
        .unwrap()
        .get("id");
    assert_eq!(links[0].get::<i64, _>("category_id"), current);
}

#[tokio::test]
async fn uncategorized_item_leaves_product_unlinked() {
    let (repo, reconciler) = setup().await;

    let summary = reconcile_items(&reconciler, &[json!({"id": 1, "name": "Mug"})]).await;
    assert_eq!(summary.products_failed, 0);

    let product = repo.product_by_slug("mug").await.unwrap().unwrap();
    let links = sqlx::query("SELECT category_id FROM product_categories WHERE product_id = ?")
        .bind(product.id)
        .fetch_all(repo.pool())
        .await
        .unwrap();
    assert!(links.is_empty());
}

#[tokio::test]
async fn malformed_items_are_skipped_without_aborting_the_batch() {
    let (repo, reconciler) = setup().await;

    let items = vec![json!({}), json!({"id": 1, "name": "Mug"}), json!(null)];
    let (records, skips) = normalize_batch(&items);
    assert_eq!(skips.total(), 2);

    let summary = reconciler.reconcile(records).await;
    assert_eq!(summary.products_touched, 1);
    assert!(repo.product_by_slug("mug").await.unwrap().is_some());
}

#[tokio::test]
async fn checkpoint_round_trip() {
    let (repo, _) = setup().await;

    assert!(repo.last_sync("vendor").await.unwrap().is_none());

    let first = chrono::Utc::now();
    repo.record_success("vendor", first).await.unwrap();
    let read = repo.last_sync("vendor").await.unwrap().unwrap();
    assert_eq!(read.timestamp_millis(), first.timestamp_millis());

    // Overwrites, one row per source.
    let later = first + chrono::Duration::minutes(5);
    repo.record_success("vendor", later).await.unwrap();
    let read = repo.last_sync("vendor").await.unwrap().unwrap();
    assert_eq!(read.timestamp_millis(), later.timestamp_millis());

    assert!(repo.last_sync("other").await.unwrap().is_none());
}
