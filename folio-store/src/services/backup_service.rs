//! Backup Service - JSON export and destructive-replace import
//!
//! Import validates the whole file before the store is touched. Once it
//! passes, all three tables are cleared and reloaded in one transaction.

use std::collections::HashSet;

use chrono::{NaiveDate, SecondsFormat, Utc};
use serde_json::Value;
use shared::models::{BACKUP_VERSION, BackupFile, PROFILE_KEY, Profile};
use tracing::{info, warn};

use crate::audit_log;
use crate::common::{AppError, AppResult};
use crate::live::queries;
use crate::quotes::service::recompute_total;
use crate::store::{Storage, TableName};

/// Keys a backup file must carry; `catalog` is optional
const REQUIRED_KEYS: [&str; 2] = ["profile", "quotes"];

/// `folio-backup-2025-03-05.json`
pub fn backup_file_name(date: NaiveDate) -> String {
    format!("folio-backup-{}.json", date.format("%Y-%m-%d"))
}

/// Record counts loaded by an import
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportSummary {
    pub profiles: usize,
    pub catalog: usize,
    pub quotes: usize,
}

#[derive(Clone)]
pub struct BackupService {
    storage: Storage,
}

impl BackupService {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    /// Snapshot of all three tables
    pub fn export(&self) -> AppResult<BackupFile> {
        let snapshot = self.storage.read(|scope| {
            Ok((
                queries::profile_or_default(scope)?,
                queries::catalog_items(scope)?,
                queries::all_quotes_newest_first(scope)?,
            ))
        })?;
        let (profile, catalog, quotes) = snapshot.value;

        info!(
            version = snapshot.version,
            catalog = catalog.len(),
            quotes = quotes.len(),
            "Backup exported"
        );
        Ok(BackupFile {
            profile: vec![profile],
            catalog,
            quotes,
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            version: BACKUP_VERSION,
        })
    }

    pub fn export_json(&self) -> AppResult<String> {
        let backup = self.export()?;
        Ok(serde_json::to_string_pretty(&backup)?)
    }

    /// Parse, validate and load a backup file's text
    pub fn import_json(&self, text: &str) -> AppResult<ImportSummary> {
        let backup = parse_backup(text).inspect_err(|e| warn!(error = %e, "Backup rejected"))?;
        self.import(backup)
    }

    /// Replace the store's contents with `backup`
    pub fn import(&self, backup: BackupFile) -> AppResult<ImportSummary> {
        let backup = prepare_backup(backup)?;
        let summary = ImportSummary {
            profiles: backup.profile.len(),
            catalog: backup.catalog.len(),
            quotes: backup.quotes.len(),
        };

        self.storage
            .transaction(&[TableName::Profile, TableName::Catalog, TableName::Quotes], |scope| {
                for table in [TableName::Profile, TableName::Catalog, TableName::Quotes] {
                    scope.clear(table)?;
                }
                for profile in &backup.profile {
                    scope.put(profile)?;
                }
                for item in &backup.catalog {
                    scope.put(item)?;
                }
                for quote in &backup.quotes {
                    scope.put(quote)?;
                }
                Ok::<_, AppError>(())
            })
            .map_err(AppError::logged)?;

        info!(catalog = summary.catalog, quotes = summary.quotes, "Backup imported");
        audit_log!(
            action = "backup.import",
            catalog = summary.catalog,
            quotes = summary.quotes,
            timestamp = %backup.timestamp
        );
        Ok(summary)
    }
}

/// Structural checks and typed decoding; never touches the store
pub fn parse_backup(text: &str) -> AppResult<BackupFile> {
    let value: Value =
        serde_json::from_str(text).map_err(|e| AppError::import_rejected(format!("not valid JSON: {e}")))?;
    let Some(object) = value.as_object() else {
        return Err(AppError::import_rejected("backup must be a JSON object"));
    };
    for key in REQUIRED_KEYS {
        match object.get(key) {
            None | Some(Value::Null) => {
                return Err(AppError::import_rejected(format!("missing `{key}`")));
            }
            Some(Value::Array(_)) => {}
            Some(_) => return Err(AppError::import_rejected(format!("`{key}` must be an array"))),
        }
    }

    serde_json::from_value(value).map_err(|e| AppError::import_rejected(format!("malformed record: {e}")))
}

/// Version check, duplicate ids, profile normalization and recomputed totals
fn prepare_backup(mut backup: BackupFile) -> AppResult<BackupFile> {
    if backup.version > BACKUP_VERSION {
        return Err(AppError::import_rejected(format!(
            "backup version {} is newer than supported version {BACKUP_VERSION}",
            backup.version
        )));
    }
    ensure_unique("catalog", backup.catalog.iter().map(|c| c.id.as_str()))?;
    ensure_unique("quotes", backup.quotes.iter().map(|q| q.id.as_str()))?;

    // The profile table holds a single record under a fixed key
    if backup.profile.len() > 1 {
        warn!(count = backup.profile.len(), "Backup carries several profiles, keeping one");
    }
    let chosen = match backup.profile.iter().position(|p| p.id == PROFILE_KEY) {
        Some(index) => backup.profile.swap_remove(index),
        None => backup.profile.into_iter().next().unwrap_or_default(),
    };
    backup.profile = vec![Profile {
        id: PROFILE_KEY.to_string(),
        next_folio: chosen.next_folio.max(1),
        ..chosen
    }];

    for quote in &mut backup.quotes {
        quote.total = recompute_total(quote);
    }
    Ok(backup)
}

fn ensure_unique<'a>(table: &str, ids: impl Iterator<Item = &'a str>) -> AppResult<()> {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            return Err(AppError::import_rejected(format!("duplicate id `{id}` in {table}")));
        }
    }
    Ok(())
}
