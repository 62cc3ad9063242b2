//! Catalog Model

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub const DEFAULT_CATEGORY: &str = "General";
pub const DEFAULT_UNIT: &str = "pza";

/// Reusable priced line item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogItem {
    pub id: String,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(rename = "desc")]
    pub description: String,
    #[serde(default = "default_unit")]
    pub unit: String,
    #[serde(default)]
    pub price: Decimal,
}

pub fn default_category() -> String {
    DEFAULT_CATEGORY.to_string()
}

pub fn default_unit() -> String {
    DEFAULT_UNIT.to_string()
}

/// Create catalog item payload
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CatalogItemCreate {
    pub category: Option<String>,
    pub description: String,
    pub unit: Option<String>,
    pub price: Decimal,
}

/// Update catalog item payload
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CatalogItemUpdate {
    pub category: Option<String>,
    pub description: Option<String>,
    pub unit: Option<String>,
    pub price: Option<Decimal>,
}

impl CatalogItem {
    /// Entries seeded on first start
    pub fn defaults() -> Vec<CatalogItem> {
        vec![
            CatalogItem {
                id: "cat_labor_hour".to_string(),
                category: default_category(),
                description: "Labor (hour)".to_string(),
                unit: "hr".to_string(),
                price: Decimal::from(200),
            },
            CatalogItem {
                id: "cat_diagnostic_visit".to_string(),
                category: default_category(),
                description: "Diagnostic visit".to_string(),
                unit: "srv".to_string(),
                price: Decimal::from(350),
            },
        ]
    }
}
