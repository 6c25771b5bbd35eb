//! Category resolver: maps a vendor (category, subcategory) name pair onto
//! the two-level category hierarchy, upserting nodes by deterministic slug.

use std::sync::Arc;

use tracing::debug;

use crate::domain::catalog::{CategoryFields, CategoryUpsert};
use crate::domain::errors::StoreError;
use crate::domain::repositories::CatalogRepository;
use crate::domain::slug::category_slug;

pub struct CategoryResolver {
    repo: Arc<dyn CatalogRepository>,
}

impl CategoryResolver {
    pub fn new(repo: Arc<dyn CatalogRepository>) -> Self {
        Self { repo }
    }

    /// Upsert the hierarchy for an item's category fields and return the leaf
    /// category id: the subcategory when the vendor reported one, else the
    /// root. `None` when the item carries no vendor category id at all — an
    /// uncategorized product is a valid state.
    pub async fn resolve(&self, fields: &CategoryFields) -> Result<Option<i64>, StoreError> {
        let Some(category_id) = fields.category_id else {
            return Ok(None);
        };

        let root = self
            .repo
            .upsert_category(&CategoryUpsert {
                vendor_category_id: category_id,
                name: fields.category_name.clone(),
                slug: category_slug(fields.category_name.as_deref(), category_id),
                parent_id: None,
            })
            .await?;

        let leaf = match fields.subcategory_id {
            Some(sub_id) => {
                self.repo
                    .upsert_category(&CategoryUpsert {
                        vendor_category_id: sub_id,
                        name: fields.subcategory_name.clone(),
                        slug: category_slug(fields.subcategory_name.as_deref(), sub_id),
                        parent_id: Some(root),
                    })
                    .await?
            }
            None => root,
        };

        debug!(root, leaf, "resolved vendor category");
        Ok(Some(leaf))
    }
}
