//! Services over the store
//!
//! - [`CatalogService`] - reusable priced line items
//! - [`ProfileService`] - business profile and first-start seeding
//! - [`BackupService`] - JSON export and destructive-replace import

pub mod backup_service;
pub mod catalog_service;
pub mod profile_service;

pub use backup_service::{BackupService, ImportSummary, backup_file_name};
pub use catalog_service::CatalogService;
pub use profile_service::ProfileService;
