//! redb-based persistent store
//!
//! # Tables
//!
//! | Table | Key | Value | Purpose |
//! |-------|-----|-------|---------|
//! | `profile` | `"main"` | `Profile` | Business profile singleton |
//! | `catalog` | item id | `CatalogItem` | Reusable priced items |
//! | `quotes` | quote id | `Quote` | Quotes with their items inline |
//! | `meta` | `"version"` | `u64` | Commit counter |
//!
//! Values are JSON-serialized records.
//!
//! # Durability
//!
//! redb commits are copy-on-write with an atomic root swap, so a crash
//! leaves the file at the last committed state. A failed transaction is
//! aborted and nothing it wrote becomes visible.
//!
//! # Change notification
//!
//! Every committed write transaction bumps `meta.version` inside the same
//! transaction and then publishes a [`ChangeSet`] naming the tables it
//! touched. Writers pass through a single gate, so change sets go out in
//! version order.

mod records;
mod scope;

pub use records::Record;
pub use scope::{ReadScope, WriteScope};

use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{debug, error, warn};

/// Record tables: key = record id, value = JSON bytes
const PROFILE_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("profile");
const CATALOG_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("catalog");
const QUOTES_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("quotes");

/// Internal counters: key = "version", value = u64
const META_TABLE: TableDefinition<&str, u64> = TableDefinition::new("meta");

const VERSION_KEY: &str = "version";

/// Change-set broadcast capacity
const CHANGE_CHANNEL_CAPACITY: usize = 256;

/// Logical tables exposed to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TableName {
    Profile,
    Catalog,
    Quotes,
}

impl TableName {
    pub const ALL: [TableName; 3] = [TableName::Profile, TableName::Catalog, TableName::Quotes];

    pub fn as_str(self) -> &'static str {
        match self {
            TableName::Profile => "profile",
            TableName::Catalog => "catalog",
            TableName::Quotes => "quotes",
        }
    }

    fn definition(self) -> TableDefinition<'static, &'static str, &'static [u8]> {
        match self {
            TableName::Profile => PROFILE_TABLE,
            TableName::Catalog => CATALOG_TABLE,
            TableName::Quotes => QUOTES_TABLE,
        }
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Table not declared for this transaction: {0}")]
    UndeclaredTable(TableName),
}

/// Why a storage operation failed, as far as the caller needs to know
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Full,
    Corrupted,
    Unavailable,
}

impl StorageError {
    /// Classify by variant first, then by the underlying message
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            StorageError::Serialization(_) => return FailureKind::Corrupted,
            StorageError::UndeclaredTable(_) => return FailureKind::Unavailable,
            _ => {}
        }

        let err_str = self.to_string().to_lowercase();

        if err_str.contains("no space") || err_str.contains("disk full") || err_str.contains("enospc") {
            return FailureKind::Full;
        }

        if err_str.contains("corrupt") || err_str.contains("invalid database") {
            return FailureKind::Corrupted;
        }

        FailureKind::Unavailable
    }
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Tables touched by one committed write transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeSet {
    pub version: u64,
    pub tables: BTreeSet<TableName>,
}

/// Result of a snapshot read, tagged with the commit it observed
#[derive(Debug, Clone, PartialEq)]
pub struct Versioned<T> {
    pub version: u64,
    /// Tables the read actually looked at
    pub tables: BTreeSet<TableName>,
    pub value: T,
}

struct Inner {
    db: Database,
    write_gate: Mutex<()>,
    changes: broadcast::Sender<ChangeSet>,
}

/// Persistent store backed by redb
///
/// Cheap to clone; all clones share one database handle.
#[derive(Clone)]
pub struct Storage {
    inner: Arc<Inner>,
}

impl fmt::Debug for Storage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Storage").finish_non_exhaustive()
    }
}

impl Storage {
    /// Open or create the database at the given path
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(path)?;
        Self::init(db)
    }

    /// Open an in-memory database (tests, previews)
    pub fn open_in_memory() -> StorageResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        Self::init(db)
    }

    fn init(db: Database) -> StorageResult<Self> {
        // Create all tables if they don't exist
        let write_txn = db.begin_write()?;
        {
            for table in TableName::ALL {
                let _ = write_txn.open_table(table.definition())?;
            }
            let mut meta = write_txn.open_table(META_TABLE)?;
            if meta.get(VERSION_KEY)?.is_none() {
                meta.insert(VERSION_KEY, 0u64)?;
            }
        }
        write_txn.commit()?;

        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Ok(Self {
            inner: Arc::new(Inner {
                db,
                write_gate: Mutex::new(()),
                changes,
            }),
        })
    }

    /// Subscribe to committed change sets
    pub fn subscribe_changes(&self) -> broadcast::Receiver<ChangeSet> {
        self.inner.changes.subscribe()
    }

    /// Version of the latest committed write (0 for a fresh database)
    pub fn version(&self) -> StorageResult<u64> {
        Ok(self.read(|scope| Ok(scope.version()))?.value)
    }

    // ========== Snapshot Reads ==========

    /// Run `f` against one consistent snapshot
    pub fn read<T>(&self, f: impl FnOnce(&ReadScope) -> StorageResult<T>) -> StorageResult<Versioned<T>> {
        let txn = self.inner.db.begin_read()?;
        let version = {
            let meta = txn.open_table(META_TABLE)?;
            meta.get(VERSION_KEY)?.map(|g| g.value()).unwrap_or(0)
        };
        let scope = ReadScope::new(txn, version);
        let value = f(&scope)?;
        Ok(Versioned {
            version,
            tables: scope.into_touched(),
            value,
        })
    }

    pub fn get<R: Record>(&self, key: &str) -> StorageResult<Option<R>> {
        Ok(self.read(|scope| scope.get::<R>(key))?.value)
    }

    /// Unordered bulk read of one table
    pub fn scan_all<R: Record>(&self) -> StorageResult<Vec<R>> {
        Ok(self.read(|scope| scope.scan_all::<R>())?.value)
    }

    // ========== Writes ==========

    /// Upsert one record
    pub fn put<R: Record>(&self, record: &R) -> StorageResult<()> {
        self.transaction(&[R::TABLE], |scope| scope.put(record))
    }

    /// Delete one record; returns whether it existed
    pub fn delete<R: Record>(&self, key: &str) -> StorageResult<bool> {
        self.transaction(&[R::TABLE], |scope| scope.delete::<R>(key))
    }

    /// Run `f` in one write transaction over the declared `tables`.
    ///
    /// Either everything `f` wrote is committed or nothing is: an `Err` from
    /// `f` (or a failed commit) aborts the transaction. Touching a table
    /// outside `tables` fails with [`StorageError::UndeclaredTable`].
    pub fn transaction<T, E>(
        &self,
        tables: &[TableName],
        f: impl FnOnce(&mut WriteScope<'_>) -> Result<T, E>,
    ) -> Result<T, E>
    where
        E: From<StorageError>,
    {
        let _gate = self.inner.write_gate.lock();
        let txn = self.inner.db.begin_write().map_err(StorageError::from)?;

        let mut scope = WriteScope::new(&txn, tables);
        let outcome = f(&mut scope);
        let touched = scope.into_touched();

        let value = match outcome {
            Ok(value) => value,
            Err(e) => {
                if let Err(abort_err) = txn.abort() {
                    warn!(error = %abort_err, "Abort after failed transaction reported an error");
                }
                return Err(e);
            }
        };

        let version = if touched.is_empty() {
            None
        } else {
            Some(bump_version(&txn).map_err(E::from)?)
        };

        if let Err(e) = txn.commit() {
            let e = StorageError::from(e);
            error!(error = %e, kind = ?e.failure_kind(), "Commit failed");
            return Err(e.into());
        }

        if let Some(version) = version {
            debug!(version, tables = ?touched, "Committed write transaction");
            // No receivers is fine: nothing is listening yet
            let _ = self.inner.changes.send(ChangeSet {
                version,
                tables: touched,
            });
        }
        Ok(value)
    }
}

fn bump_version(txn: &redb::WriteTransaction) -> StorageResult<u64> {
    let mut meta = txn.open_table(META_TABLE)?;
    let current = meta.get(VERSION_KEY)?.map(|g| g.value()).unwrap_or(0);
    let next = current + 1;
    meta.insert(VERSION_KEY, next)?;
    Ok(next)
}
