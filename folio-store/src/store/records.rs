use serde::Serialize;
use serde::de::DeserializeOwned;
use shared::models::{CatalogItem, PROFILE_KEY, Profile, Quote};

use super::TableName;

/// A record type bound to its table and key
pub trait Record: Serialize + DeserializeOwned {
    const TABLE: TableName;

    fn key(&self) -> &str;
}

impl Record for Profile {
    const TABLE: TableName = TableName::Profile;

    /// The profile is a singleton regardless of the id it carries
    fn key(&self) -> &str {
        PROFILE_KEY
    }
}

impl Record for CatalogItem {
    const TABLE: TableName = TableName::Catalog;

    fn key(&self) -> &str {
        &self.id
    }
}

impl Record for Quote {
    const TABLE: TableName = TableName::Quotes;

    fn key(&self) -> &str {
        &self.id
    }
}
