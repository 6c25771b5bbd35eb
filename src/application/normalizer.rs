//! Item normalizer: one raw vendor record in, one canonical variant record
//! (or a counted skip) out.
//!
//! The vendor feed is heterogeneous: field names vary, numbers arrive as
//! strings, and whole fields go missing. Everything here degrades instead of
//! failing; the only unrecoverable defects are a non-object entry and a
//! missing external id, both of which become `Skip` markers rather than
//! errors so one bad item never aborts a batch.

use std::collections::BTreeMap;

use serde_json::Value;
use tracing::debug;

use crate::domain::catalog::{CategoryFields, VariantRecord};
use crate::domain::errors::SkipReason;
use crate::domain::slug::{product_slug, split_base_name, synthetic_product_name};
use crate::domain::sync::SkipCounts;

/// Result of normalizing a single raw item.
#[derive(Debug, Clone, PartialEq)]
pub enum NormalizedItem {
    Record(Box<VariantRecord>),
    Skip(SkipReason),
}

/// Display-name candidates, in priority order. The vendor has shipped all
/// three spellings at different times.
const NAME_FIELDS: [&str; 3] = ["name", "productname", "title"];

/// Normalize one raw vendor item into a `VariantRecord`.
pub fn normalize(item: &Value) -> NormalizedItem {
    let Some(obj) = item.as_object() else {
        return NormalizedItem::Skip(SkipReason::NotAnObject);
    };

    let Some(vendor_item_id) = coerce_i64(obj.get("id")) else {
        debug!(item = %item, "raw item has no parsable external id, skipping");
        return NormalizedItem::Skip(SkipReason::MissingExternalId);
    };

    let raw_name = NAME_FIELDS
        .into_iter()
        .find_map(|field| non_empty_str(obj.get(field)));

    let (base_name, qualifier) = match raw_name {
        Some(raw) => split_base_name(raw),
        None => (synthetic_product_name(vendor_item_id), None),
    };
    let base_name = if base_name.is_empty() {
        synthetic_product_name(vendor_item_id)
    } else {
        base_name
    };
    let slug = product_slug(&base_name, vendor_item_id);

    let sku = non_empty_str(obj.get("sku")).map(str::to_string);

    // Label priority: embedded variant list, parenthetical qualifier, sku,
    // literal fallback. Must never be empty.
    let variant_label = embedded_variant_name(obj.get("variant"))
        .or(qualifier)
        .or_else(|| sku.clone())
        .unwrap_or_else(|| "Default".to_string());

    let mut attributes = BTreeMap::new();
    attributes.insert("variant".to_string(), variant_label.clone());

    let thumbnail = non_empty_str(obj.get("imagepath")).map(str::to_string);
    let images = collect_images(obj.get("imageList"), thumbnail.as_deref());

    NormalizedItem::Record(Box::new(VariantRecord {
        vendor_item_id,
        product_slug: slug,
        base_name,
        variant_label,
        sku,
        price: coerce_price(obj.get("sellprice")),
        stock: coerce_stock(obj.get("stock")),
        attributes,
        images,
        thumbnail,
        description: non_empty_str(obj.get("description")).map(str::to_string),
        category: CategoryFields {
            category_id: coerce_i64(obj.get("categoryid")),
            category_name: non_empty_str(obj.get("category")).map(str::to_string),
            subcategory_id: coerce_i64(obj.get("subCategoryId")),
            subcategory_name: non_empty_str(obj.get("subCategory")).map(str::to_string),
        },
    }))
}

/// Normalize a whole fetch batch, splitting records from skip counts.
pub fn normalize_batch(items: &[Value]) -> (Vec<VariantRecord>, SkipCounts) {
    let mut records = Vec::with_capacity(items.len());
    let mut skips = SkipCounts::default();

    for item in items {
        match normalize(item) {
            NormalizedItem::Record(record) => records.push(*record),
            NormalizedItem::Skip(SkipReason::NotAnObject) => skips.not_an_object += 1,
            NormalizedItem::Skip(SkipReason::MissingExternalId) => skips.missing_external_id += 1,
        }
    }

    (records, skips)
}

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Accept a JSON number or a numeric string; anything else is `None`.
fn coerce_i64(value: Option<&Value>) -> Option<i64> {
    match value? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

fn coerce_f64(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// Price: non-negative, defaulting malformed/absent input to zero.
fn coerce_price(value: Option<&Value>) -> f64 {
    coerce_f64(value).filter(|p| *p >= 0.0).unwrap_or(0.0)
}

/// Stock: non-negative integer, same degradation rules. Fractional counts
/// are truncated.
fn coerce_stock(value: Option<&Value>) -> i64 {
    coerce_f64(value)
        .filter(|s| *s >= 0.0)
        .map(|s| s as i64)
        .unwrap_or(0)
}

/// First entry of an embedded `variant` sub-list, when it carries a name.
fn embedded_variant_name(value: Option<&Value>) -> Option<String> {
    value?
        .as_array()?
        .first()?
        .get("name")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Explicit image list wins; otherwise the single thumbnail path becomes a
/// one-element gallery; otherwise empty.
fn collect_images(image_list: Option<&Value>, thumbnail: Option<&str>) -> Vec<String> {
    let from_list: Vec<String> = image_list
        .and_then(Value::as_array)
        .map(|urls| {
            urls.iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    if !from_list.is_empty() {
        return from_list;
    }
    thumbnail.map(|t| vec![t.to_string()]).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> VariantRecord {
        match normalize(&value) {
            NormalizedItem::Record(r) => *r,
            other => panic!("expected record, got {other:?}"),
        }
    }

    #[test]
    fn parenthetical_qualifier_becomes_label_and_attribute() {
        let r = record(json!({"id": 1, "name": "Shirt (Blue)", "sku": "S1"}));
        assert_eq!(r.product_slug, "shirt");
        assert_eq!(r.base_name, "Shirt");
        assert_eq!(r.variant_label, "Blue");
        assert_eq!(r.attributes.get("variant").unwrap(), "Blue");
    }

    #[test]
    fn embedded_variant_list_outranks_parenthetical() {
        let r = record(json!({
            "id": 2,
            "name": "Shirt (Blue)",
            "variant": [{"name": "Navy"}]
        }));
        assert_eq!(r.variant_label, "Navy");
    }

    #[test]
    fn label_falls_back_to_sku_then_default() {
        let r = record(json!({"id": 3, "name": "Shirt", "sku": "S3"}));
        assert_eq!(r.variant_label, "S3");

        let r = record(json!({"id": 4, "name": "Shirt"}));
        assert_eq!(r.variant_label, "Default");
    }

    #[test]
    fn name_candidates_are_tried_in_order() {
        let r = record(json!({"id": 5, "productname": "Mug"}));
        assert_eq!(r.base_name, "Mug");

        let r = record(json!({"id": 6, "title": "Cap"}));
        assert_eq!(r.base_name, "Cap");

        let r = record(json!({"id": 7, "name": "", "title": "Cap"}));
        assert_eq!(r.base_name, "Cap");
    }

    #[test]
    fn missing_name_synthesizes_identity() {
        let r = record(json!({"id": 99}));
        assert_eq!(r.base_name, "Product-99");
        assert_eq!(r.product_slug, "product-99");
    }

    #[test]
    fn numeric_coercion_accepts_strings_and_degrades() {
        let r = record(json!({"id": 8, "name": "Mug", "sellprice": "100.5", "stock": "5"}));
        assert_eq!(r.price, 100.5);
        assert_eq!(r.stock, 5);

        let r = record(json!({"id": 9, "name": "Mug", "sellprice": "oops", "stock": -3}));
        assert_eq!(r.price, 0.0);
        assert_eq!(r.stock, 0);

        let r = record(json!({"id": 10, "name": "Mug"}));
        assert_eq!(r.price, 0.0);
        assert_eq!(r.stock, 0);
    }

    #[test]
    fn image_list_wins_over_thumbnail() {
        let r = record(json!({
            "id": 11,
            "name": "Mug",
            "imageList": ["a.jpg", "b.jpg"],
            "imagepath": "thumb.jpg"
        }));
        assert_eq!(r.images, vec!["a.jpg", "b.jpg"]);
        assert_eq!(r.thumbnail.as_deref(), Some("thumb.jpg"));

        let r = record(json!({"id": 12, "name": "Mug", "imagepath": "thumb.jpg"}));
        assert_eq!(r.images, vec!["thumb.jpg"]);

        let r = record(json!({"id": 13, "name": "Mug"}));
        assert!(r.images.is_empty());
    }

    #[test]
    fn string_external_id_is_accepted() {
        let r = record(json!({"id": "42", "name": "Mug"}));
        assert_eq!(r.vendor_item_id, 42);
    }

    #[test]
    fn structurally_unusable_items_are_skipped_not_raised() {
        assert_eq!(
            normalize(&json!("just a string")),
            NormalizedItem::Skip(SkipReason::NotAnObject)
        );
        assert_eq!(
            normalize(&json!({})),
            NormalizedItem::Skip(SkipReason::MissingExternalId)
        );
        assert_eq!(
            normalize(&json!({"name": "No Id"})),
            NormalizedItem::Skip(SkipReason::MissingExternalId)
        );
    }

    #[test]
    fn batch_counts_skips_per_reason() {
        let items = vec![
            json!({"id": 1, "name": "Shirt (Blue)"}),
            json!({}),
            json!(42),
            json!({"id": 2, "name": "Shirt (Red)"}),
        ];
        let (records, skips) = normalize_batch(&items);
        assert_eq!(records.len(), 2);
        assert_eq!(skips.not_an_object, 1);
        assert_eq!(skips.missing_external_id, 1);
        assert_eq!(skips.total(), 2);
    }

    #[test]
    fn category_fields_pass_through() {
        let r = record(json!({
            "id": 20,
            "name": "Shirt",
            "categoryid": 5,
            "category": "Apparel",
            "subCategoryId": "7",
            "subCategory": "Tops"
        }));
        assert_eq!(r.category.category_id, Some(5));
        assert_eq!(r.category.category_name.as_deref(), Some("Apparel"));
        assert_eq!(r.category.subcategory_id, Some(7));
        assert_eq!(r.category.subcategory_name.as_deref(), Some("Tops"));
    }
}
