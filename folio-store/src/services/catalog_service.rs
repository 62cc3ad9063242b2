//! Catalog Service - reusable priced line items

use std::collections::BTreeSet;

use rust_decimal::Decimal;
use shared::models::catalog::{DEFAULT_CATEGORY, DEFAULT_UNIT};
use shared::models::{CatalogItem, CatalogItemCreate, CatalogItemUpdate};
use shared::util::generate_id;
use tracing::info;

use crate::common::{AppError, AppResult};
use crate::live::queries;
use crate::store::{Storage, TableName};
use crate::utils::validation::{MAX_DESCRIPTION_LEN, MAX_NAME_LEN, MAX_SHORT_TEXT_LEN, validate_len, validate_required_text};

#[derive(Clone)]
pub struct CatalogService {
    storage: Storage,
}

impl CatalogService {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    /// Ordered by category, then description
    pub fn list(&self) -> AppResult<Vec<CatalogItem>> {
        Ok(self.storage.read(queries::catalog_items)?.value)
    }

    pub fn get(&self, id: &str) -> AppResult<CatalogItem> {
        self.storage
            .get::<CatalogItem>(id)?
            .ok_or_else(|| AppError::not_found(format!("Catalog item {id}")))
    }

    /// Distinct categories, sorted
    pub fn categories(&self) -> AppResult<Vec<String>> {
        let categories: BTreeSet<String> = self
            .storage
            .scan_all::<CatalogItem>()?
            .into_iter()
            .map(|item| item.category)
            .collect();
        Ok(categories.into_iter().collect())
    }

    pub fn create(&self, data: CatalogItemCreate) -> AppResult<CatalogItem> {
        let item = CatalogItem {
            id: generate_id(),
            category: or_default(data.category, DEFAULT_CATEGORY),
            description: data.description.trim().to_string(),
            unit: or_default(data.unit, DEFAULT_UNIT),
            price: data.price,
        };
        validate_item(&item)?;

        self.storage.put(&item)?;
        info!(item_id = %item.id, category = %item.category, "Catalog item created");
        Ok(item)
    }

    /// Partial update; absent fields keep their value
    pub fn update(&self, id: &str, data: CatalogItemUpdate) -> AppResult<CatalogItem> {
        self.storage.transaction(&[TableName::Catalog], |scope| {
            let mut item = scope
                .get::<CatalogItem>(id)?
                .ok_or_else(|| AppError::not_found(format!("Catalog item {id}")))?;

            if let Some(category) = data.category {
                item.category = or_default(Some(category), DEFAULT_CATEGORY);
            }
            if let Some(description) = data.description {
                item.description = description.trim().to_string();
            }
            if let Some(unit) = data.unit {
                item.unit = or_default(Some(unit), DEFAULT_UNIT);
            }
            if let Some(price) = data.price {
                item.price = price;
            }
            validate_item(&item)?;

            scope.put(&item)?;
            info!(item_id = %id, "Catalog item updated");
            Ok(item)
        })
    }

    /// Returns whether the item existed
    pub fn delete(&self, id: &str) -> AppResult<bool> {
        let existed = self.storage.delete::<CatalogItem>(id)?;
        if existed {
            info!(item_id = %id, "Catalog item deleted");
        }
        Ok(existed)
    }
}

fn or_default(value: Option<String>, default: &str) -> String {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => default.to_string(),
    }
}

fn validate_item(item: &CatalogItem) -> AppResult<()> {
    validate_required_text(&item.description, "desc", MAX_DESCRIPTION_LEN)?;
    validate_len(&item.category, "category", MAX_NAME_LEN)?;
    validate_len(&item.unit, "unit", MAX_SHORT_TEXT_LEN)?;
    if item.price < Decimal::ZERO {
        return Err(AppError::validation("price", "must be non-negative"));
    }
    Ok(())
}
