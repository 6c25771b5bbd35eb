//! Deterministic identity derivation for catalog entities.
//!
//! Slugs are the durable natural keys the reconciler upserts against, so the
//! rules here must stay stable across runs: same input, same slug, regardless
//! of casing or run order.

use once_cell::sync::Lazy;
use regex::Regex;

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static NON_SLUG: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9_-]+").unwrap());
static HYPHEN_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"-+").unwrap());
static PARENTHETICAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"\(([^)]*)\)").unwrap());

/// Lowercase, whitespace to hyphens, strip everything that is not
/// `[a-z0-9_-]`, collapse hyphen runs, trim hyphens at both ends.
///
/// Returns an empty string when nothing slug-safe survives (e.g. a name
/// written entirely in a non-Latin script); callers fall back to a synthetic
/// slug in that case.
pub fn slugify(text: &str) -> String {
    let lowered = text.to_lowercase();
    let hyphenated = WHITESPACE.replace_all(lowered.trim(), "-");
    let stripped = NON_SLUG.replace_all(&hyphenated, "");
    let collapsed = HYPHEN_RUNS.replace_all(&stripped, "-");
    collapsed.trim_matches('-').to_string()
}

/// Split a raw display name into the base product name and the variant
/// qualifier carried in the first parenthetical group.
///
/// `"Widget (Red)"` → `("Widget", Some("Red"))`; later groups stay part of
/// the base name. An empty parenthetical yields no qualifier.
pub fn split_base_name(raw: &str) -> (String, Option<String>) {
    match PARENTHETICAL.captures(raw) {
        Some(caps) => {
            let whole = caps.get(0).expect("capture 0 always present");
            let mut base = String::with_capacity(raw.len());
            base.push_str(&raw[..whole.start()]);
            base.push(' ');
            base.push_str(&raw[whole.end()..]);
            let base = WHITESPACE.replace_all(base.trim(), " ").to_string();

            let qualifier = caps
                .get(1)
                .map(|m| m.as_str().trim())
                .filter(|s| !s.is_empty())
                .map(str::to_string);
            (base, qualifier)
        }
        None => (WHITESPACE.replace_all(raw.trim(), " ").to_string(), None),
    }
}

/// Slug for a product, falling back to a synthetic identity when the base
/// name does not survive slugification.
pub fn product_slug(base_name: &str, external_id: i64) -> String {
    let slug = slugify(base_name);
    if slug.is_empty() {
        format!("product-{external_id}")
    } else {
        slug
    }
}

/// Synthetic display name for items whose payload carries no usable name.
pub fn synthetic_product_name(external_id: i64) -> String {
    format!("Product-{external_id}")
}

/// Category slug: `slug(name)-{vendorCategoryId}`. The vendor id keeps the
/// key unique when two categories slugify to the same text; a blank or
/// unusable name degrades to the literal `category`.
pub fn category_slug(name: Option<&str>, vendor_category_id: i64) -> String {
    let base = name
        .map(slugify)
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "category".to_string());
    format!("{base}-{vendor_category_id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_basic_cases() {
        assert_eq!(slugify("Widget"), "widget");
        assert_eq!(slugify("  Cotton T-Shirt  "), "cotton-t-shirt");
        assert_eq!(slugify("A  B   C"), "a-b-c");
        assert_eq!(slugify("Café & Crème!"), "caf-crme");
        assert_eq!(slugify("--already--slugged--"), "already-slugged");
    }

    #[test]
    fn slugify_is_case_insensitive() {
        assert_eq!(slugify("WIDGET Pro"), slugify("widget pro"));
    }

    #[test]
    fn slugify_non_latin_collapses_to_empty() {
        assert_eq!(slugify("เสื้อยืด"), "");
    }

    #[test]
    fn split_base_name_strips_first_parenthetical_only() {
        assert_eq!(
            split_base_name("Widget (Red)"),
            ("Widget".to_string(), Some("Red".to_string()))
        );
        assert_eq!(
            split_base_name("Widget (Red) Pro (2024)"),
            ("Widget Pro (2024)".to_string(), Some("Red".to_string()))
        );
    }

    #[test]
    fn split_base_name_handles_empty_and_missing_groups() {
        assert_eq!(split_base_name("Widget ()"), ("Widget".to_string(), None));
        assert_eq!(split_base_name("Plain Name"), ("Plain Name".to_string(), None));
        assert_eq!(
            split_base_name("(Blue) Shirt"),
            ("Shirt".to_string(), Some("Blue".to_string()))
        );
    }

    #[test]
    fn product_slug_falls_back_to_synthetic() {
        assert_eq!(product_slug("Widget", 9), "widget");
        assert_eq!(product_slug("เสื้อยืด", 9), "product-9");
        assert_eq!(product_slug("", 42), "product-42");
    }

    #[test]
    fn determinism_from_raw_display_name() {
        let (base_a, _) = split_base_name("Widget (Red)");
        let (base_b, _) = split_base_name("WIDGET (blue)");
        assert_eq!(product_slug(&base_a, 1), product_slug(&base_b, 2));
        assert_eq!(product_slug(&base_a, 1), "widget");
    }

    #[test]
    fn category_slug_composition() {
        assert_eq!(category_slug(Some("Apparel"), 12), "apparel-12");
        assert_eq!(category_slug(Some("  "), 12), "category-12");
        assert_eq!(category_slug(None, 7), "category-7");
        assert_eq!(category_slug(Some("เสื้อ"), 3), "category-3");
    }
}
