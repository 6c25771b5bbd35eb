//! Canonical catalog entities and the upsert/read row types exchanged with
//! the repository layer.
//!
//! A `VariantRecord` is the normalizer's output: one vendor item reduced to a
//! canonical variant plus the product identity it belongs to. The reconciler
//! groups these by product slug and turns them into `ProductUpsert` /
//! `VariantUpsert` writes.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Category fields carried on a raw vendor item. All optional: an item with
/// no vendor category id simply leaves its product uncategorized.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryFields {
    pub category_id: Option<i64>,
    pub category_name: Option<String>,
    pub subcategory_id: Option<i64>,
    pub subcategory_name: Option<String>,
}

/// One vendor item normalized into a canonical variant with its derived
/// product identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantRecord {
    /// The vendor's stable item id. Unique per vendor; the variant's durable
    /// natural key.
    pub vendor_item_id: i64,
    /// Derived product identity (see `domain::slug`).
    pub product_slug: String,
    /// Display name with the variant qualifier stripped.
    pub base_name: String,
    /// Never empty: embedded variant name, parenthetical qualifier, sku, or
    /// the literal `Default`.
    pub variant_label: String,
    pub sku: Option<String>,
    /// Non-negative; malformed vendor input degrades to zero.
    pub price: f64,
    /// Non-negative; malformed vendor input degrades to zero.
    pub stock: i64,
    /// Free-form key/value attributes, e.g. `{"variant": "Red"}`.
    pub attributes: BTreeMap<String, String>,
    /// Ordered gallery image URLs.
    pub images: Vec<String>,
    pub thumbnail: Option<String>,
    pub description: Option<String>,
    pub category: CategoryFields,
}

/// Category upsert keyed by slug. `parent_id = None` upserts a root node;
/// `Some(root)` upserts the child of a two-level hierarchy.
#[derive(Debug, Clone)]
pub struct CategoryUpsert {
    pub vendor_category_id: i64,
    pub name: Option<String>,
    pub slug: String,
    pub parent_id: Option<i64>,
}

/// Product upsert keyed by slug. Conflict semantics (enforced in SQL so the
/// write stays atomic): name always refreshes, `thumbnail_url` only fills a
/// NULL, `description` only fills an empty value, `full_description` is never
/// touched after insert.
#[derive(Debug, Clone)]
pub struct ProductUpsert {
    pub slug: String,
    pub name: String,
    pub description: Option<String>,
    pub thumbnail_url: Option<String>,
}

/// Variant upsert keyed by the vendor item id. On conflict only price, stock,
/// and the timestamp refresh; ownership (`product_id`) and creation-time
/// fields (sku, label, attributes) stay as first written.
#[derive(Debug, Clone)]
pub struct VariantUpsert {
    pub product_id: i64,
    pub vendor_item_id: i64,
    pub sku: Option<String>,
    pub name: String,
    /// Attributes serialized as JSON text for the `attributes` column.
    pub attributes: String,
    pub price: f64,
    pub stock: i64,
}

/// Product row as read back from the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductRow {
    pub id: i64,
    pub slug: String,
    pub name: String,
    pub description: Option<String>,
    pub full_description: Option<String>,
    pub thumbnail_url: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// Variant row as read back from the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariantRow {
    pub id: i64,
    pub product_id: i64,
    pub vendor_item_id: i64,
    pub sku: Option<String>,
    pub name: String,
    pub price: f64,
    pub stock: i64,
}
