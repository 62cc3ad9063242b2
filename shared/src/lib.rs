//! Shared types for the Folio workspace
//!
//! Domain records persisted by `folio-store` and consumed by the document
//! renderer: business profile, catalog entries, quotes with their line
//! items, the backup file format and the built-in service templates.

pub mod models;
pub mod util;

// Re-exports
pub use serde::{Deserialize, Serialize};

pub use models::{
    BackupFile, CatalogItem, CatalogItemCreate, CatalogItemUpdate, Profile, ProfileUpdate, Quote,
    QuoteItem, QuoteStatus, RawNumber, Template, TemplateItem,
};
