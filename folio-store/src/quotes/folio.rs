//! Folio sequencer
//!
//! `Profile::next_folio` is the counter. Reserving only reads it; the
//! increment is written inside the same transaction that inserts the new
//! quote, so either both land or neither does.

use shared::models::{PROFILE_KEY, Profile};
use tokio::sync::{Mutex, MutexGuard};
use tracing::debug;

use crate::common::{AppError, AppResult};
use crate::store::{Storage, WriteScope};

/// Minimum folio width; wider numbers print in full
const FOLIO_WIDTH: usize = 4;

/// `7` → `"0007"`
pub fn format_folio(value: u64) -> String {
    format!("{:0width$}", value, width = FOLIO_WIDTH)
}

/// Issues folios exactly once per newly saved quote
pub struct FolioSequencer {
    storage: Storage,
    /// Serializes reserve-to-commit for "save new quote"
    lock: Mutex<()>,
}

impl FolioSequencer {
    pub fn new(storage: Storage) -> Self {
        Self {
            storage,
            lock: Mutex::new(()),
        }
    }

    /// Preview of the folio the next new quote will get. Does not advance
    /// the counter.
    pub fn reserve_next_folio(&self) -> AppResult<String> {
        let profile = self.storage.get::<Profile>(PROFILE_KEY)?.unwrap_or_default();
        Ok(format_folio(profile.next_folio))
    }

    /// Hold this while reserving and committing a new quote
    pub async fn lock(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().await
    }

    /// Advance the counter inside the caller's transaction.
    ///
    /// Fails with [`AppError::SequencingConflict`] when `reserved` no longer
    /// matches the counter. The transaction must declare the profile table.
    pub fn commit_in(scope: &mut WriteScope<'_>, reserved: &str) -> AppResult<String> {
        let mut profile = scope.get::<Profile>(PROFILE_KEY)?.unwrap_or_default();
        let current = format_folio(profile.next_folio);
        if current != reserved {
            return Err(AppError::SequencingConflict {
                reserved: reserved.to_string(),
                current,
            });
        }

        profile.next_folio = profile.next_folio.saturating_add(1);
        scope.put(&profile)?;
        debug!(folio = %current, next = profile.next_folio, "Folio committed");
        Ok(current)
    }
}
