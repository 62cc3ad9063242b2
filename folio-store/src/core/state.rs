//! Application state - every service wired over one store

use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;

use crate::common::AppResult;
use crate::core::Config;
use crate::live::LiveQueries;
use crate::printing::{ExportService, FileSink, LocalImageLoader};
use crate::quotes::QuoteService;
use crate::services::{BackupService, CatalogService, ProfileService};
use crate::store::Storage;

/// Shared handles, cheap to clone
///
/// Holds the single [`Storage`] handle; every service reads and writes
/// through it, and live queries observe its commits.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub storage: Storage,
    pub live: LiveQueries,
    pub quotes: Arc<QuoteService>,
    pub catalog: CatalogService,
    pub profile: ProfileService,
    pub backup: BackupService,
    pub export: ExportService,
    pub sink: FileSink,
}

impl AppState {
    /// Open the store under the work directory, seed a fresh install and
    /// start the live query dispatcher. Must run inside a Tokio runtime.
    pub fn initialize(config: &Config) -> AppResult<Self> {
        let work_dir = PathBuf::from(&config.work_dir);
        std::fs::create_dir_all(&work_dir).map_err(|e| {
            crate::common::AppError::internal(format!("cannot create {}: {e}", work_dir.display()))
        })?;

        let storage = Storage::open(config.db_path())?;
        Self::with_storage(config, storage)
    }

    /// Same as [`AppState::initialize`] over an existing store
    pub fn with_storage(config: &Config, storage: Storage) -> AppResult<Self> {
        let profile = ProfileService::new(storage.clone());
        if !profile.seed_if_empty()? {
            // Catalog present but the profile was removed
            profile.ensure()?;
        }

        let export = ExportService::new(
            storage.clone(),
            Arc::new(LocalImageLoader::with_base_dir(&config.work_dir)),
            config.image_load_timeout(),
        )
        .with_page_mode(config.page_mode());

        Ok(Self {
            live: LiveQueries::spawn(storage.clone(), config.live_query_debounce()),
            quotes: Arc::new(QuoteService::new(storage.clone())),
            catalog: CatalogService::new(storage.clone()),
            backup: BackupService::new(storage.clone()),
            sink: FileSink::new(config.export_dir()),
            config: config.clone(),
            profile,
            export,
            storage,
        })
    }

    /// Stop background work
    pub fn shutdown(&self) {
        info!(subscriptions = self.live.len(), "Shutting down");
        self.live.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::{CatalogItem, PROFILE_KEY, Profile};

    #[tokio::test]
    async fn test_initialize_seeds_once() {
        let tmp = tempfile::tempdir().unwrap();
        let config = Config::with_work_dir(tmp.path().to_string_lossy());

        let state = AppState::initialize(&config).unwrap();
        let seeded = state.catalog.list().unwrap().len();
        assert_eq!(seeded, CatalogItem::defaults().len());
        assert_eq!(state.quotes.sequencer().reserve_next_folio().unwrap(), "0001");
        assert!(config.db_path().exists());

        // Wiring again over the same store keeps the data and does not reseed
        let first = state.catalog.list().unwrap()[0].id.clone();
        state.catalog.delete(&first).unwrap();
        let again = AppState::with_storage(&config, state.storage.clone()).unwrap();
        assert_eq!(again.catalog.list().unwrap().len(), seeded - 1);
        state.shutdown();
        again.shutdown();
    }

    #[tokio::test]
    async fn test_missing_profile_is_restored_on_startup() {
        let storage = Storage::open_in_memory().unwrap();
        storage.put(&CatalogItem::defaults()[0]).unwrap();
        assert!(storage.get::<Profile>(PROFILE_KEY).unwrap().is_none());

        let state = AppState::with_storage(&Config::default(), storage.clone()).unwrap();
        let stored = storage.get::<Profile>(PROFILE_KEY).unwrap().unwrap();
        assert_eq!(stored.next_folio, Profile::default().next_folio);
        // The catalog is not reseeded
        assert_eq!(state.catalog.list().unwrap().len(), 1);
        state.shutdown();
    }
}
