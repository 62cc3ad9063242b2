//! Live queries - reactive re-evaluation of store reads
//!
//! ```text
//! Storage::transaction ── commit ──► broadcast<ChangeSet>
//!                                         │
//!                                    Dispatcher (debounce + coalesce)
//!                                         │ re-run queries reading touched tables
//!                     ┌───────────────────┼───────────────────┐
//!                  Entry A             Entry B             Entry C
//!                  watch::Sender       watch::Sender       watch::Sender
//!                     │                   │                   │
//!               Subscription<T>    Subscription<T>    Subscription<T>
//! ```
//!
//! ## Delivery rules
//!
//! - Each re-run reads one snapshot, so a result always corresponds to a
//!   fully committed state.
//! - A result is delivered only if its snapshot version is newer than the
//!   last one seen for that query AND its value differs from the last
//!   delivered value. Subscribers therefore never go backwards.
//! - Change sets arriving within the debounce window are merged, and each
//!   affected query runs once for the whole batch.
//! - Unsubscribing is idempotent. A re-run already in flight for a removed
//!   entry is computed and then dropped.

pub mod queries;

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::sync::{broadcast, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::common::AppResult;
use crate::store::{ChangeSet, ReadScope, Storage, StorageResult, TableName};

type QueryFn<T> = dyn Fn(&ReadScope) -> StorageResult<T> + Send + Sync;

/// Type-erased registry entry
trait LiveEntry: Send + Sync {
    fn depends_on(&self, tables: &BTreeSet<TableName>) -> bool;

    /// Re-run the query; returns whether a new result was delivered
    fn refresh(&self, storage: &Storage) -> StorageResult<bool>;

    fn close(&self);
}

struct EntryState<T> {
    version: u64,
    tables: BTreeSet<TableName>,
    last: T,
}

struct Entry<T> {
    id: u64,
    query: Box<QueryFn<T>>,
    state: Mutex<EntryState<T>>,
    tx: watch::Sender<T>,
    closed: AtomicBool,
}

impl<T> LiveEntry for Entry<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    fn depends_on(&self, tables: &BTreeSet<TableName>) -> bool {
        let state = self.state.lock();
        // A query that read nothing yet is re-run on any change
        state.tables.is_empty() || !state.tables.is_disjoint(tables)
    }

    fn refresh(&self, storage: &Storage) -> StorageResult<bool> {
        if self.closed.load(Ordering::Acquire) {
            return Ok(false);
        }
        let snapshot = storage.read(|scope| (self.query)(scope))?;

        let mut state = self.state.lock();
        if snapshot.version <= state.version {
            return Ok(false);
        }
        state.version = snapshot.version;
        state.tables = snapshot.tables;
        if snapshot.value == state.last {
            return Ok(false);
        }
        state.last = snapshot.value.clone();

        if self.closed.load(Ordering::Acquire) {
            debug!(entry = self.id, "Dropping delivery for closed subscription");
            return Ok(false);
        }
        self.tx.send_replace(snapshot.value);
        Ok(true)
    }

    fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }
}

type Registry = Mutex<BTreeMap<u64, Arc<dyn LiveEntry>>>;

struct LiveInner {
    storage: Storage,
    registry: Arc<Registry>,
    next_id: AtomicU64,
    shutdown: CancellationToken,
}

impl Drop for LiveInner {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// Live query registry plus its dispatcher task
#[derive(Clone)]
pub struct LiveQueries {
    inner: Arc<LiveInner>,
}

impl LiveQueries {
    /// Start the dispatcher on the current tokio runtime
    pub fn spawn(storage: Storage, debounce: Duration) -> Self {
        let registry: Arc<Registry> = Arc::new(Mutex::new(BTreeMap::new()));
        let shutdown = CancellationToken::new();

        let dispatcher = Dispatcher {
            storage: storage.clone(),
            registry: Arc::clone(&registry),
            debounce,
        };
        tokio::spawn(dispatcher.run(storage.subscribe_changes(), shutdown.clone()));

        Self {
            inner: Arc::new(LiveInner {
                storage,
                registry,
                next_id: AtomicU64::new(1),
                shutdown,
            }),
        }
    }

    /// Number of active subscriptions
    pub fn len(&self) -> usize {
        self.inner.registry.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run `query` now and keep re-running it whenever a table it read
    /// changes. Returns the current result and the subscription handle.
    pub fn subscribe<T, F>(&self, query: F) -> AppResult<(T, Subscription<T>)>
    where
        T: Clone + PartialEq + Send + Sync + 'static,
        F: Fn(&ReadScope) -> StorageResult<T> + Send + Sync + 'static,
    {
        let initial = self.inner.storage.read(|scope| query(scope))?;
        let (tx, rx) = watch::channel(initial.value.clone());
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);

        let entry = Arc::new(Entry {
            id,
            query: Box::new(query),
            state: Mutex::new(EntryState {
                version: initial.version,
                tables: initial.tables,
                last: initial.value.clone(),
            }),
            tx,
            closed: AtomicBool::new(false),
        });
        self.inner
            .registry
            .lock()
            .insert(id, Arc::clone(&entry) as Arc<dyn LiveEntry>);

        // A commit between the initial read and registration may already
        // have been dispatched; catch up once.
        if self.inner.storage.version()? > initial.version {
            entry.refresh(&self.inner.storage)?;
        }

        debug!(subscription = id, version = initial.version, "Live query subscribed");
        let subscription = Subscription {
            id,
            rx,
            registry: Arc::downgrade(&self.inner.registry),
            closed: false,
        };
        Ok((initial.value, subscription))
    }

    /// Stop the dispatcher; existing subscriptions stop receiving updates
    pub fn shutdown(&self) {
        self.inner.shutdown.cancel();
    }
}

/// Handle to one live query
pub struct Subscription<T> {
    id: u64,
    rx: watch::Receiver<T>,
    registry: Weak<Registry>,
    closed: bool,
}

impl<T: Clone> Subscription<T> {
    /// Wait for the next delivered result. `None` once unsubscribed or the
    /// dispatcher is gone.
    pub async fn changed(&mut self) -> Option<T> {
        if self.closed {
            return None;
        }
        self.rx.changed().await.ok()?;
        if self.closed {
            return None;
        }
        Some(self.rx.borrow_and_update().clone())
    }

    /// Last delivered result
    pub fn current(&self) -> T {
        self.rx.borrow().clone()
    }

    pub fn is_active(&self) -> bool {
        !self.closed
    }

    /// Stop receiving results. Safe to call more than once.
    pub fn unsubscribe(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Some(registry) = self.registry.upgrade()
            && let Some(entry) = registry.lock().remove(&self.id)
        {
            entry.close();
            debug!(subscription = self.id, "Live query unsubscribed");
        }
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Some(registry) = self.registry.upgrade()
            && let Some(entry) = registry.lock().remove(&self.id)
        {
            entry.close();
        }
    }
}

struct Dispatcher {
    storage: Storage,
    registry: Arc<Registry>,
    debounce: Duration,
}

impl Dispatcher {
    /// Run until shutdown or until the change channel closes
    async fn run(self, mut source: broadcast::Receiver<ChangeSet>, shutdown: CancellationToken) {
        info!("Live query dispatcher started");

        loop {
            let first = tokio::select! {
                _ = shutdown.cancelled() => break,
                received = source.recv() => received,
            };

            let mut tables = BTreeSet::new();
            let mut refresh_all = false;
            let mut latest = 0;
            match first {
                Ok(change) => {
                    latest = change.version;
                    tables.extend(change.tables);
                }
                Err(RecvError::Lagged(n)) => {
                    warn!(skipped = n, "Live query dispatcher lagged, refreshing all queries");
                    refresh_all = true;
                }
                Err(RecvError::Closed) => break,
            }

            if !self.debounce.is_zero() {
                tokio::time::sleep(self.debounce).await;
            }

            // Coalesce everything that queued up during the window
            let mut closed = false;
            loop {
                match source.try_recv() {
                    Ok(change) => {
                        latest = latest.max(change.version);
                        tables.extend(change.tables);
                    }
                    Err(TryRecvError::Lagged(_)) => refresh_all = true,
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Closed) => {
                        closed = true;
                        break;
                    }
                }
            }

            self.dispatch(&tables, refresh_all, latest);
            if closed {
                break;
            }
        }

        info!("Live query dispatcher stopped");
    }

    fn dispatch(&self, tables: &BTreeSet<TableName>, refresh_all: bool, version: u64) {
        let entries: Vec<Arc<dyn LiveEntry>> = self.registry.lock().values().cloned().collect();
        let mut delivered = 0;
        for entry in entries {
            if !refresh_all && !entry.depends_on(tables) {
                continue;
            }
            match entry.refresh(&self.storage) {
                Ok(true) => delivered += 1,
                Ok(false) => {}
                Err(e) => error!(error = %e, "Live query re-run failed"),
            }
        }
        debug!(version, tables = ?tables, delivered, "Change batch dispatched");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use shared::models::{CatalogItem, Profile};

    const WAIT: Duration = Duration::from_millis(500);
    const QUIET: Duration = Duration::from_millis(100);

    fn item(id: &str, price: i64) -> CatalogItem {
        CatalogItem {
            id: id.to_string(),
            category: "General".to_string(),
            description: format!("Item {id}"),
            unit: "pza".to_string(),
            price: Decimal::from(price),
        }
    }

    fn catalog_ids(scope: &ReadScope) -> StorageResult<Vec<String>> {
        let mut ids: Vec<String> = scope.scan_all::<CatalogItem>()?.into_iter().map(|c| c.id).collect();
        ids.sort();
        Ok(ids)
    }

    #[tokio::test]
    async fn test_subscribe_returns_current_and_updates() {
        let storage = Storage::open_in_memory().unwrap();
        storage.put(&item("a", 1)).unwrap();
        let live = LiveQueries::spawn(storage.clone(), Duration::from_millis(5));

        let (current, mut sub) = live.subscribe(catalog_ids).unwrap();
        assert_eq!(current, vec!["a"]);

        storage.put(&item("b", 1)).unwrap();
        let next = tokio::time::timeout(WAIT, sub.changed()).await.unwrap();
        assert_eq!(next, Some(vec!["a".to_string(), "b".to_string()]));
    }

    #[tokio::test]
    async fn test_unchanged_value_not_redelivered() {
        let storage = Storage::open_in_memory().unwrap();
        storage.put(&item("a", 1)).unwrap();
        let live = LiveQueries::spawn(storage.clone(), Duration::from_millis(5));
        let (_, mut sub) = live.subscribe(catalog_ids).unwrap();

        // Price change does not change the list of ids
        storage.put(&item("a", 2)).unwrap();
        assert!(tokio::time::timeout(QUIET, sub.changed()).await.is_err());
    }

    #[tokio::test]
    async fn test_unrelated_table_does_not_trigger() {
        let storage = Storage::open_in_memory().unwrap();
        let live = LiveQueries::spawn(storage.clone(), Duration::from_millis(5));
        let (_, mut sub) = live
            .subscribe(|scope| scope.scan_all::<CatalogItem>().map(|v| v.len()))
            .unwrap();

        storage.put(&Profile::default()).unwrap();
        assert!(tokio::time::timeout(QUIET, sub.changed()).await.is_err());
    }

    #[tokio::test]
    async fn test_burst_is_coalesced() {
        let storage = Storage::open_in_memory().unwrap();
        let live = LiveQueries::spawn(storage.clone(), Duration::from_millis(50));
        let (_, mut sub) = live.subscribe(catalog_ids).unwrap();

        for i in 0..5 {
            storage.put(&item(&format!("i{i}"), 1)).unwrap();
        }
        let delivered = tokio::time::timeout(WAIT, sub.changed()).await.unwrap().unwrap();
        assert_eq!(delivered.len(), 5);
        // No intermediate states follow the final one
        assert!(tokio::time::timeout(QUIET, sub.changed()).await.is_err());
    }

    #[tokio::test]
    async fn test_unsubscribe_is_idempotent_and_final() {
        let storage = Storage::open_in_memory().unwrap();
        let live = LiveQueries::spawn(storage.clone(), Duration::from_millis(5));
        let (_, mut sub) = live.subscribe(catalog_ids).unwrap();
        assert_eq!(live.len(), 1);

        sub.unsubscribe();
        sub.unsubscribe();
        assert_eq!(live.len(), 0);
        assert!(!sub.is_active());

        storage.put(&item("a", 1)).unwrap();
        assert_eq!(sub.changed().await, None);
    }

    #[tokio::test]
    async fn test_drop_unregisters() {
        let storage = Storage::open_in_memory().unwrap();
        let live = LiveQueries::spawn(storage.clone(), Duration::from_millis(5));
        {
            let (_v, _sub) = live.subscribe(catalog_ids).unwrap();
            assert_eq!(live.len(), 1);
        }
        assert!(live.is_empty());
    }

    #[tokio::test]
    async fn test_versions_are_monotonic() {
        let storage = Storage::open_in_memory().unwrap();
        let live = LiveQueries::spawn(storage.clone(), Duration::ZERO);
        let (_, mut sub) = live
            .subscribe(|scope| Ok((scope.version(), scope.scan_all::<CatalogItem>()?.len())))
            .unwrap();

        let writer = {
            let storage = storage.clone();
            tokio::spawn(async move {
                for i in 0..20 {
                    storage.put(&item(&format!("i{i}"), 1)).unwrap();
                    tokio::task::yield_now().await;
                }
            })
        };

        let mut last = 0;
        loop {
            match tokio::time::timeout(WAIT, sub.changed()).await {
                Ok(Some((version, count))) => {
                    assert!(version > last);
                    last = version;
                    if count == 20 {
                        break;
                    }
                }
                other => panic!("unexpected: {other:?}"),
            }
        }
        writer.await.unwrap();
    }

    #[tokio::test]
    async fn test_refresh_skips_stale_snapshot() {
        let storage = Storage::open_in_memory().unwrap();
        let (tx, _rx) = watch::channel(0usize);
        let entry = Entry {
            id: 1,
            query: Box::new(|scope: &ReadScope| scope.scan_all::<CatalogItem>().map(|v| v.len())),
            state: Mutex::new(EntryState {
                version: 10,
                tables: BTreeSet::new(),
                last: 0usize,
            }),
            tx,
            closed: AtomicBool::new(false),
        };
        storage.put(&item("a", 1)).unwrap();
        // Store is at version 1, entry already saw version 10
        assert!(!entry.refresh(&storage).unwrap());
    }
}
