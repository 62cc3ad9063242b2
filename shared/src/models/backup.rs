//! Backup File Format

use serde::{Deserialize, Serialize};

use super::{CatalogItem, Profile, Quote};

/// Current backup format version
pub const BACKUP_VERSION: u32 = 1;

/// Full-dataset snapshot written by export and consumed by import
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupFile {
    pub profile: Vec<Profile>,
    #[serde(default)]
    pub catalog: Vec<CatalogItem>,
    pub quotes: Vec<Quote>,
    /// ISO-8601 export time
    #[serde(default)]
    pub timestamp: String,
    #[serde(default = "default_version")]
    pub version: u32,
}

fn default_version() -> u32 {
    BACKUP_VERSION
}
