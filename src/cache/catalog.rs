//! TTL-bounded catalog snapshot.
//!
//! The cache owns the single in-memory snapshot of the movie collection.
//! Concurrent callers that find it missing or expired share one fetch; a
//! failed fetch degrades `get()` to the fallback dataset while `refresh()`
//! reports it. Snapshots are replaced wholesale, and rating corrections are
//! copy-on-write, so a reader never sees a partially updated collection.

use super::bus::{RatingChangeEvent, RatingUpdateBus, Subscription};
use super::store::{SnapshotStore, StoredSnapshot};
use crate::config::CatalogConfig;
use crate::core::movie::{records_from_raw, MovieId, MovieRecord};
use crate::error::{Error, Result};
use crate::rating::DisplayRating;
use crate::source::{fallback_dataset, CatalogSource};
use chrono::Utc;
use futures::future::{BoxFuture, FutureExt, Shared};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// A complete, internally consistent movie collection
pub type Snapshot = Arc<Vec<MovieRecord>>;

type PendingFetch = Shared<BoxFuture<'static, Result<Snapshot>>>;

/// Where the current snapshot came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotOrigin {
    /// Fetched from the remote source
    Remote,
    /// Fallback dataset served after a failed fetch
    Fallback,
    /// Loaded from the snapshot store at startup
    Restored,
}

/// The cached snapshot and its validity window
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub snapshot: Snapshot,
    pub fetched_at: Instant,
    pub ttl: Duration,
    pub origin: SnapshotOrigin,
}

impl CacheEntry {
    fn new(snapshot: Snapshot, ttl: Duration, origin: SnapshotOrigin) -> Self {
        Self {
            snapshot,
            fetched_at: Instant::now(),
            ttl,
            origin,
        }
    }

    pub fn age(&self) -> Duration {
        self.fetched_at.elapsed()
    }

    pub fn is_valid(&self) -> bool {
        self.age() < self.ttl
    }

    fn to_stored(&self) -> StoredSnapshot {
        let age = chrono::Duration::from_std(self.age()).unwrap_or_else(|_| chrono::Duration::zero());
        StoredSnapshot {
            fetched_at: Utc::now() - age,
            movies: self.snapshot.as_ref().clone(),
        }
    }
}

/// Read-only diagnostics
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheStats {
    pub has_cache: bool,
    #[serde(rename = "cache_size")]
    pub size: usize,
    #[serde(rename = "cache_age")]
    pub age: Option<Duration>,
    #[serde(rename = "expires_in")]
    pub ttl_remaining: Option<Duration>,
    pub is_valid: bool,
    pub origin: Option<SnapshotOrigin>,
}

impl CacheStats {
    fn empty() -> Self {
        Self {
            has_cache: false,
            size: 0,
            age: None,
            ttl_remaining: None,
            is_valid: false,
            origin: None,
        }
    }
}

fn minutes_seconds(d: Option<Duration>) -> String {
    match d {
        Some(d) => format!("{}m {}s", d.as_secs() / 60, d.as_secs() % 60),
        None => "N/A".to_string(),
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.has_cache {
            return write!(f, "empty");
        }
        write!(
            f,
            "{} movies, {}, age {}, expires in {}",
            self.size,
            if self.is_valid { "fresh" } else { "expired" },
            minutes_seconds(self.age),
            minutes_seconds(self.ttl_remaining),
        )
    }
}

/// Construction parameters for [`CatalogCache`]
#[derive(Debug, Clone)]
pub struct CacheOptions {
    /// How long a snapshot stays valid
    pub ttl: Duration,
    /// Upper bound on one remote fetch; exceeding it counts as a failure
    pub request_timeout: Duration,
    /// Served when the remote source cannot be reached
    pub fallback: Vec<MovieRecord>,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(300),
            request_timeout: Duration::from_secs(10),
            fallback: fallback_dataset(),
        }
    }
}

impl CacheOptions {
    pub fn from_config(config: &CatalogConfig) -> Self {
        Self {
            ttl: config.ttl(),
            request_timeout: config.request_timeout(),
            ..Self::default()
        }
    }
}

// State the in-flight fetch commits into; shared with the fetch future.
struct CacheState {
    entry: RwLock<Option<CacheEntry>>,
    store: Option<Arc<dyn SnapshotStore>>,
    // Bumped under the entry write lock on every change the store must follow.
    revision: AtomicU64,
    // Newest revision handed to the store; older saves are dropped.
    saved: Mutex<u64>,
}

impl CacheState {
    fn read(&self) -> RwLockReadGuard<'_, Option<CacheEntry>> {
        self.entry.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Option<CacheEntry>> {
        self.entry.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn new(store: Option<Arc<dyn SnapshotStore>>) -> Self {
        Self {
            entry: RwLock::new(None),
            store,
            revision: AtomicU64::new(0),
            saved: Mutex::new(0),
        }
    }

    // Caller must hold the entry write lock.
    fn next_revision(&self) -> u64 {
        self.revision.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn commit(&self, entry: CacheEntry) {
        let persist = {
            let mut guard = self.write();
            let persist = (entry.origin == SnapshotOrigin::Remote)
                .then(|| (self.next_revision(), entry.to_stored()));
            *guard = Some(entry);
            persist
        };
        if let Some((revision, stored)) = persist {
            self.persist(revision, &stored);
        }
    }

    /// Save `stored` unless a newer revision already reached the store.
    fn persist(&self, revision: u64, stored: &StoredSnapshot) {
        let Some(store) = &self.store else {
            return;
        };
        let mut saved = self.saved.lock().unwrap_or_else(PoisonError::into_inner);
        if *saved >= revision {
            debug!(revision, newest = *saved, "skipping stale catalog snapshot save");
            return;
        }
        *saved = revision;
        if let Err(err) = store.save(stored) {
            warn!(error = %err, "failed to save catalog snapshot");
        }
    }

    fn clear(&self) {
        let revision = {
            let mut guard = self.write();
            *guard = None;
            self.next_revision()
        };
        let Some(store) = &self.store else {
            return;
        };
        let mut saved = self.saved.lock().unwrap_or_else(PoisonError::into_inner);
        *saved = (*saved).max(revision);
        if let Err(err) = store.clear() {
            warn!(error = %err, "failed to clear saved catalog snapshot");
        }
    }
}

/// Single-writer cache of the movie catalog
pub struct CatalogCache {
    source: Arc<dyn CatalogSource>,
    state: Arc<CacheState>,
    pending: Mutex<Option<PendingFetch>>,
    bus: RatingUpdateBus,
    ttl: Duration,
    request_timeout: Duration,
    fallback: Snapshot,
}

impl CatalogCache {
    /// Create an empty cache over `source`
    pub fn new(source: Arc<dyn CatalogSource>, options: CacheOptions) -> Self {
        Self::build(source, options, None)
    }

    /// Create a cache that saves every snapshot to `store` and starts from the
    /// saved one when it is still within the TTL.
    pub fn with_store(
        source: Arc<dyn CatalogSource>,
        options: CacheOptions,
        store: Arc<dyn SnapshotStore>,
    ) -> Self {
        let cache = Self::build(source, options, Some(Arc::clone(&store)));
        match store.load() {
            Ok(Some(saved)) => cache.restore(saved),
            Ok(None) => {}
            Err(err) => warn!(error = %err, "ignoring unreadable catalog snapshot"),
        }
        cache
    }

    fn build(
        source: Arc<dyn CatalogSource>,
        options: CacheOptions,
        store: Option<Arc<dyn SnapshotStore>>,
    ) -> Self {
        Self {
            source,
            state: Arc::new(CacheState::new(store)),
            pending: Mutex::new(None),
            bus: RatingUpdateBus::new(),
            ttl: options.ttl,
            request_timeout: options.request_timeout,
            fallback: Arc::new(options.fallback),
        }
    }

    fn restore(&self, saved: StoredSnapshot) {
        let Ok(age) = (Utc::now() - saved.fetched_at).to_std() else {
            debug!("saved catalog snapshot is dated in the future, ignoring");
            return;
        };
        if age >= self.ttl {
            debug!(age_secs = age.as_secs(), "saved catalog snapshot expired");
            return;
        }
        let Some(fetched_at) = Instant::now().checked_sub(age) else {
            return;
        };

        info!(size = saved.movies.len(), "restored catalog snapshot");
        *self.state.write() = Some(CacheEntry {
            snapshot: Arc::new(saved.movies),
            fetched_at,
            ttl: self.ttl,
            origin: SnapshotOrigin::Restored,
        });
    }

    /// The current snapshot, fetching first if it is missing or expired.
    ///
    /// Never fails: when the fetch does, the fallback dataset is cached under
    /// the same TTL and returned.
    pub async fn get(&self) -> Snapshot {
        if let Some(snapshot) = self.valid_snapshot() {
            debug!("catalog cache hit");
            return snapshot;
        }

        match self.fetch().await {
            Ok(snapshot) => snapshot,
            Err(err) => {
                warn!(error = %err, "catalog fetch failed, serving fallback dataset");
                self.install_fallback()
            }
        }
    }

    /// Fetch now and replace the snapshot.
    ///
    /// On failure the existing entry is left untouched and the error returned.
    /// Joins a fetch already in flight rather than starting a second one.
    pub async fn refresh(&self) -> Result<Snapshot> {
        self.fetch().await.map_err(|err| {
            warn!(error = %err, "catalog refresh failed, keeping existing snapshot");
            err
        })
    }

    /// Discard the snapshot so the next `get()` fetches.
    ///
    /// A fetch already in flight still commits when it completes.
    pub fn invalidate(&self) {
        self.state.clear();
        debug!("catalog cache invalidated");
    }

    /// Replace the displayed rating of one movie and broadcast the change.
    ///
    /// Leaves the fetch time and TTL alone. Returns `false`, without
    /// publishing, when no snapshot holds `movie_id`.
    pub fn update_rating(&self, movie_id: MovieId, rating: DisplayRating) -> bool {
        let (snapshot, stored) = {
            let mut guard = self.state.write();
            let Some(entry) = guard.as_mut() else {
                debug!(%movie_id, "rating update with no cached catalog");
                return false;
            };
            let Some(index) = entry.snapshot.iter().position(|m| m.id == movie_id) else {
                debug!(%movie_id, "rating update for unknown movie");
                return false;
            };
            Arc::make_mut(&mut entry.snapshot)[index].rating = rating;
            let stored = (entry.origin != SnapshotOrigin::Fallback)
                .then(|| (self.state.next_revision(), entry.to_stored()));
            (Arc::clone(&entry.snapshot), stored)
        };

        if let Some((revision, stored)) = stored {
            self.state.persist(revision, &stored);
        }
        let delivered = self
            .bus
            .publish(&RatingChangeEvent::new(movie_id, rating), &snapshot);
        debug!(%movie_id, %rating, delivered, "rating updated");
        true
    }

    /// Side-effect free view of the cache state
    pub fn introspect(&self) -> CacheStats {
        let guard = self.state.read();
        let Some(entry) = guard.as_ref() else {
            return CacheStats::empty();
        };
        let age = entry.age();
        CacheStats {
            has_cache: true,
            size: entry.snapshot.len(),
            age: Some(age),
            ttl_remaining: Some(entry.ttl.saturating_sub(age)),
            is_valid: age < entry.ttl,
            origin: Some(entry.origin),
        }
    }

    /// The present snapshot regardless of validity, without fetching
    pub fn current(&self) -> Option<Snapshot> {
        self.state.read().as_ref().map(|e| Arc::clone(&e.snapshot))
    }

    /// Look up one record in the present snapshot, without fetching
    pub fn find(&self, movie_id: MovieId) -> Option<MovieRecord> {
        self.state
            .read()
            .as_ref()
            .and_then(|e| e.snapshot.iter().find(|m| m.id == movie_id).cloned())
    }

    pub fn bus(&self) -> &RatingUpdateBus {
        &self.bus
    }

    /// Shorthand for `bus().subscribe(listener)`
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&RatingChangeEvent, &Snapshot) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.bus.subscribe(listener)
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn valid_snapshot(&self) -> Option<Snapshot> {
        self.state
            .read()
            .as_ref()
            .filter(|e| e.is_valid())
            .map(|e| Arc::clone(&e.snapshot))
    }

    fn pending_slot(&self) -> MutexGuard<'_, Option<PendingFetch>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // Await the in-flight fetch, starting one if there is none.
    async fn fetch(&self) -> Result<Snapshot> {
        let pending = {
            let mut slot = self.pending_slot();
            match slot.as_ref() {
                Some(inflight) => {
                    debug!("joining in-flight catalog fetch");
                    inflight.clone()
                }
                None => {
                    let fetch = self.start_fetch();
                    *slot = Some(fetch.clone());
                    fetch
                }
            }
        };

        // Await a clone so `pending` stays comparable with the slot.
        let outcome = pending.clone().await;

        let mut slot = self.pending_slot();
        if slot.as_ref().is_some_and(|current| current.ptr_eq(&pending)) {
            *slot = None;
        }
        outcome
    }

    fn start_fetch(&self) -> PendingFetch {
        let source = Arc::clone(&self.source);
        let state = Arc::clone(&self.state);
        let ttl = self.ttl;
        let timeout = self.request_timeout;

        async move {
            debug!("fetching catalog");
            let raw = tokio::time::timeout(timeout, source.fetch_all()).await??;
            let snapshot: Snapshot = Arc::new(records_from_raw(raw)?);
            state.commit(CacheEntry::new(Arc::clone(&snapshot), ttl, SnapshotOrigin::Remote));
            info!(size = snapshot.len(), "catalog snapshot fetched");
            Ok::<_, Error>(snapshot)
        }
        .boxed()
        .shared()
    }

    fn install_fallback(&self) -> Snapshot {
        let mut guard = self.state.write();
        // Another waiter of the same failed fetch may have installed it already.
        if let Some(entry) = guard.as_ref().filter(|e| e.is_valid()) {
            return Arc::clone(&entry.snapshot);
        }
        let entry = CacheEntry::new(Arc::clone(&self.fallback), self.ttl, SnapshotOrigin::Fallback);
        *guard = Some(entry);
        Arc::clone(&self.fallback)
    }
}
