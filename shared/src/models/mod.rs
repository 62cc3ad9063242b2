//! Data models
//!
//! JSON field names follow the compact keys used by backup files
//! (`client`, `desc`, `qty`, `nextFolio`, ...), so a backup written by any
//! version of the app loads without a migration step.

pub mod backup;
pub mod catalog;
pub mod number;
pub mod profile;
pub mod quote;
pub mod template;

pub use backup::{BACKUP_VERSION, BackupFile};
pub use catalog::{CatalogItem, CatalogItemCreate, CatalogItemUpdate};
pub use number::{RawNumber, lenient_rate};
pub use profile::{PROFILE_KEY, Profile, ProfileUpdate};
pub use quote::{Quote, QuoteItem, QuoteStatus};
pub use template::{Template, TemplateItem, builtin_templates};
