//! Catalog reconciler: makes the persisted catalog graph converge on the
//! latest vendor payload.
//!
//! Records are grouped by product slug, then each product is written as one
//! fault-isolation unit: category resolution, product upsert, category
//! re-link, variant upserts, per-variant image set-diff, and stale-variant
//! pruning. A failed product is counted and logged; the run continues with
//! the next one. Re-running with identical input is a no-op beyond timestamp
//! refreshes, which is what makes crash-and-retry safe.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::application::category_resolver::CategoryResolver;
use crate::domain::catalog::{CategoryFields, ProductUpsert, VariantRecord, VariantUpsert};
use crate::domain::errors::StoreError;
use crate::domain::repositories::CatalogRepository;
use crate::domain::sync::ReconcileSummary;

/// One product's worth of normalized records. The first-seen record seeds the
/// product-level fields; every record contributes a variant.
#[derive(Debug)]
struct ProductGroup {
    slug: String,
    name: String,
    description: Option<String>,
    category: CategoryFields,
    variants: Vec<VariantRecord>,
}

/// Per-product write counters folded into the run summary.
#[derive(Debug, Default)]
struct ProductStats {
    variants_upserted: u32,
    variants_pruned: u32,
    images_added: u32,
    images_removed: u32,
}

pub struct CatalogReconciler {
    repo: Arc<dyn CatalogRepository>,
    categories: CategoryResolver,
}

impl CatalogReconciler {
    pub fn new(repo: Arc<dyn CatalogRepository>) -> Self {
        let categories = CategoryResolver::new(Arc::clone(&repo));
        Self { repo, categories }
    }

    /// Reconcile a batch of normalized records against the store.
    ///
    /// Store failures are absorbed at product granularity: a constraint
    /// conflict gets one fresh retry, anything that still fails marks the
    /// product failed and the pass moves on.
    pub async fn reconcile(&self, records: Vec<VariantRecord>) -> ReconcileSummary {
        let groups = group_by_product(records);
        let mut summary = ReconcileSummary::default();

        info!(products = groups.len(), "reconciling catalog batch");

        for group in groups.values() {
            match self.sync_product_with_retry(group).await {
                Ok(stats) => {
                    summary.products_touched += 1;
                    summary.variants_upserted += stats.variants_upserted;
                    summary.variants_pruned += stats.variants_pruned;
                    summary.images_added += stats.images_added;
                    summary.images_removed += stats.images_removed;
                }
                Err(err) => {
                    summary.products_failed += 1;
                    error!(slug = %group.slug, %err, "product reconciliation failed, continuing");
                }
            }
        }

        info!(
            touched = summary.products_touched,
            failed = summary.products_failed,
            variants = summary.variants_upserted,
            pruned = summary.variants_pruned,
            images_added = summary.images_added,
            images_removed = summary.images_removed,
            "reconciliation pass complete"
        );
        summary
    }

    /// Constraint conflicts (two runs racing on the same natural key) usually
    /// resolve on a fresh upsert pass, so retry once before giving up.
    async fn sync_product_with_retry(&self, group: &ProductGroup) -> Result<ProductStats, StoreError> {
        match self.sync_product(group).await {
            Err(err) if err.is_conflict() => {
                warn!(slug = %group.slug, %err, "constraint conflict, retrying product once");
                self.sync_product(group).await
            }
            other => other,
        }
    }

    async fn sync_product(&self, group: &ProductGroup) -> Result<ProductStats, StoreError> {
        let mut stats = ProductStats::default();

        let category_id = self.categories.resolve(&group.category).await?;

        let product_id = self
            .repo
            .upsert_product(&ProductUpsert {
                slug: group.slug.clone(),
                name: group.name.clone(),
                description: group.description.clone(),
                // First variant's thumbnail is the fallback; the SQL guard
                // keeps an already-set thumbnail as is.
                thumbnail_url: group.variants.first().and_then(|v| v.thumbnail.clone()),
            })
            .await?;

        if let Some(category_id) = category_id {
            self.repo.link_category(product_id, category_id).await?;
            let unlinked = self
                .repo
                .unlink_other_categories(product_id, category_id)
                .await?;
            if unlinked > 0 {
                debug!(product_id, unlinked, "re-linked product to latest vendor category");
            }
        }

        let mut seen_vendor_ids = HashSet::with_capacity(group.variants.len());
        for variant in &group.variants {
            let variant_id = self
                .repo
                .upsert_variant(&VariantUpsert {
                    product_id,
                    vendor_item_id: variant.vendor_item_id,
                    sku: variant.sku.clone(),
                    name: variant.variant_label.clone(),
                    attributes: serde_json::to_string(&variant.attributes)
                        .unwrap_or_else(|_| "{}".to_string()),
                    price: variant.price,
                    stock: variant.stock,
                })
                .await?;
            stats.variants_upserted += 1;
            seen_vendor_ids.insert(variant.vendor_item_id);

            let (added, removed) = self
                .reconcile_images(product_id, variant_id, &variant.images)
                .await?;
            stats.images_added += added;
            stats.images_removed += removed;
        }

        stats.variants_pruned += self.prune_stale_variants(product_id, &seen_vendor_ids).await?;

        Ok(stats)
    }

    /// Set-diff the persisted gallery against the incoming URL list: delete
    /// leftovers, insert newcomers at their incoming position, leave URLs
    /// present on both sides untouched so their sort position survives.
    async fn reconcile_images(
        &self,
        product_id: i64,
        variant_id: i64,
        incoming: &[String],
    ) -> Result<(u32, u32), StoreError> {
        let existing = self.repo.gallery_urls(variant_id).await?;
        let existing_set: HashSet<&str> = existing.iter().map(String::as_str).collect();
        let incoming_set: HashSet<&str> = incoming.iter().map(String::as_str).collect();

        let mut removed = 0;
        for url in &existing {
            if !incoming_set.contains(url.as_str()) {
                self.repo.delete_gallery_image(variant_id, url).await?;
                removed += 1;
            }
        }

        let mut added = 0;
        let mut inserted: HashSet<&str> = HashSet::new();
        for (position, url) in incoming.iter().enumerate() {
            // A vendor payload can repeat a URL; persist it once.
            if existing_set.contains(url.as_str()) || !inserted.insert(url.as_str()) {
                continue;
            }
            self.repo
                .insert_gallery_image(product_id, variant_id, url, position as i64)
                .await?;
            added += 1;
        }

        Ok((added, removed))
    }

    /// A variant that disappeared from the vendor feed for this product is
    /// deleted, not left orphaned.
    async fn prune_stale_variants(
        &self,
        product_id: i64,
        seen_vendor_ids: &HashSet<i64>,
    ) -> Result<u32, StoreError> {
        let persisted = self.repo.variants_for_product(product_id).await?;
        let mut pruned = 0;
        for row in persisted {
            if !seen_vendor_ids.contains(&row.vendor_item_id) {
                debug!(
                    product_id,
                    vendor_item_id = row.vendor_item_id,
                    "pruning variant absent from vendor payload"
                );
                self.repo.delete_variant(row.id).await?;
                pruned += 1;
            }
        }
        Ok(pruned)
    }
}

/// Group records by product slug. A `BTreeMap` keeps product order
/// deterministic across runs regardless of vendor payload order.
fn group_by_product(records: Vec<VariantRecord>) -> BTreeMap<String, ProductGroup> {
    let mut groups: BTreeMap<String, ProductGroup> = BTreeMap::new();

    for record in records {
        let group = groups
            .entry(record.product_slug.clone())
            .or_insert_with(|| ProductGroup {
                slug: record.product_slug.clone(),
                name: record.base_name.clone(),
                description: record.description.clone(),
                category: record.category.clone(),
                variants: Vec::new(),
            });
        group.variants.push(record);
    }

    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::normalizer::normalize_batch;
    use serde_json::json;

    #[test]
    fn grouping_merges_by_slug_and_seeds_from_first_record() {
        let (records, _) = normalize_batch(&[
            json!({"id": 1, "name": "Shirt (Blue)", "description": "first"}),
            json!({"id": 2, "name": "Shirt (Red)", "description": "second"}),
            json!({"id": 3, "name": "Mug"}),
        ]);

        let groups = group_by_product(records);
        assert_eq!(groups.len(), 2);

        let shirt = &groups["shirt"];
        assert_eq!(shirt.name, "Shirt");
        assert_eq!(shirt.description.as_deref(), Some("first"));
        assert_eq!(shirt.variants.len(), 2);
        assert_eq!(groups["mug"].variants.len(), 1);
    }

    #[test]
    fn grouping_order_is_deterministic() {
        let (forward, _) = normalize_batch(&[
            json!({"id": 1, "name": "Zebra"}),
            json!({"id": 2, "name": "Apple"}),
        ]);
        let (reverse, _) = normalize_batch(&[
            json!({"id": 2, "name": "Apple"}),
            json!({"id": 1, "name": "Zebra"}),
        ]);

        let a: Vec<_> = group_by_product(forward).into_keys().collect();
        let b: Vec<_> = group_by_product(reverse).into_keys().collect();
        assert_eq!(a, b);
        assert_eq!(a, vec!["apple".to_string(), "zebra".to_string()]);
    }
}
