//! Schedule cache.
//!
//! Holds the current [`LookupTables`] in memory, persists them through a
//! [`BundleStore`], and rebuilds them from the feed once they are older than
//! the TTL. At most one rebuild runs at a time; concurrent callers wait on
//! the same one. A failed rebuild leaves the previous bundle in place.

mod error;
mod store;

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::feed::{DEFAULT_MAX_DECOMPRESSED_BYTES, FeedError, FeedSource, parse_archive};
use crate::index::{self, LookupTables};

pub use error::CacheError;
pub use store::{BundleStore, DiskStore, MemoryStore, StoreKey};

/// Default bundle lifetime: 24 hours.
const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Configuration for the schedule cache.
#[derive(Debug, Clone)]
pub struct ScheduleCacheConfig {
    /// How long a built bundle stays fresh
    pub ttl: Duration,
    /// Largest decompressed archive accepted
    pub max_decompressed_bytes: u64,
}

impl Default for ScheduleCacheConfig {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_TTL,
            max_decompressed_bytes: DEFAULT_MAX_DECOMPRESSED_BYTES,
        }
    }
}

impl ScheduleCacheConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a custom TTL.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_max_decompressed_bytes(mut self, bytes: u64) -> Self {
        self.max_decompressed_bytes = bytes;
        self
    }
}

/// A built bundle and when it was built.
#[derive(Debug, Clone)]
struct Snapshot {
    tables: Arc<LookupTables>,
    built_at: DateTime<Utc>,
}

impl Snapshot {
    fn is_fresh(&self, ttl: Duration) -> bool {
        // A timestamp in the future counts as fresh.
        match (Utc::now() - self.built_at).to_std() {
            Ok(age) => age < ttl,
            Err(_) => true,
        }
    }
}

type SharedRebuild = Shared<BoxFuture<'static, Result<Snapshot, CacheError>>>;

struct Inner<S, F> {
    store: S,
    source: F,
    config: ScheduleCacheConfig,
    current: RwLock<Option<Snapshot>>,
    rebuild: Mutex<Option<SharedRebuild>>,
}

/// Summary of the cache's state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStatus {
    pub built_at: Option<DateTime<Utc>>,
    pub fresh: bool,
    pub rebuilding: bool,
    pub stations: usize,
    pub trips: usize,
    pub stop_times: usize,
}

/// Lookup tables with a persisted, TTL-bounded lifetime.
///
/// Cloning is cheap and clones share state.
pub struct ScheduleCache<S, F> {
    inner: Arc<Inner<S, F>>,
}

impl<S, F> Clone for ScheduleCache<S, F> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: BundleStore, F: FeedSource> ScheduleCache<S, F> {
    /// Open the cache, loading any persisted bundle regardless of age.
    ///
    /// A missing, unreadable or corrupt bundle leaves the cache empty; the
    /// first [`get`](Self::get) then rebuilds.
    pub async fn open(store: S, source: F, config: ScheduleCacheConfig) -> Self {
        let loaded = match load_persisted(&store).await {
            Ok(Some(snapshot)) => {
                info!(
                    built_at = %snapshot.built_at,
                    stations = snapshot.tables.station_count(),
                    "Loaded persisted lookup tables"
                );
                Some(snapshot)
            }
            Ok(None) => {
                info!("No persisted lookup tables");
                None
            }
            Err(e) => {
                warn!(error = %e, "Ignoring persisted lookup tables");
                None
            }
        };

        Self {
            inner: Arc::new(Inner {
                store,
                source,
                config,
                current: RwLock::new(loaded),
                rebuild: Mutex::new(None),
            }),
        }
    }

    /// Current lookup tables, rebuilding first if they are missing or stale.
    ///
    /// If a rebuild is already running, waits for it instead of starting
    /// another. On failure the previous tables stay available through
    /// [`current`](Self::current).
    pub async fn get(&self) -> Result<Arc<LookupTables>, CacheError> {
        if let Some(tables) = self.fresh().await {
            return Ok(tables);
        }

        let rebuild = {
            let mut slot = self.inner.rebuild.lock().await;

            // A rebuild may have finished while we waited for the lock.
            if let Some(tables) = self.fresh().await {
                return Ok(tables);
            }

            match slot.as_ref() {
                Some(running) => {
                    debug!("Joining in-flight schedule rebuild");
                    running.clone()
                }
                None => {
                    let started = self.start_rebuild();
                    *slot = Some(started.clone());
                    started
                }
            }
        };

        rebuild.await.map(|snapshot| snapshot.tables)
    }

    /// Discard the cached tables, in memory and persisted.
    ///
    /// The next [`get`](Self::get) rebuilds.
    pub async fn invalidate(&self) -> Result<(), CacheError> {
        *self.inner.current.write().await = None;
        self.inner.store.clear().await?;
        info!("Schedule cache invalidated");
        Ok(())
    }

    /// Tables currently held, whatever their age.
    pub async fn current(&self) -> Option<Arc<LookupTables>> {
        let guard = self.inner.current.read().await;
        guard.as_ref().map(|s| Arc::clone(&s.tables))
    }

    /// When the held tables were built.
    pub async fn freshness(&self) -> Option<DateTime<Utc>> {
        let guard = self.inner.current.read().await;
        guard.as_ref().map(|s| s.built_at)
    }

    pub async fn status(&self) -> CacheStatus {
        let rebuilding = self.inner.rebuild.lock().await.is_some();
        let guard = self.inner.current.read().await;
        match guard.as_ref() {
            Some(s) => CacheStatus {
                built_at: Some(s.built_at),
                fresh: s.is_fresh(self.inner.config.ttl),
                rebuilding,
                stations: s.tables.station_count(),
                trips: s.tables.trip_count(),
                stop_times: s.tables.stop_time_count(),
            },
            None => CacheStatus {
                built_at: None,
                fresh: false,
                rebuilding,
                stations: 0,
                trips: 0,
                stop_times: 0,
            },
        }
    }

    /// Wait for any running rebuild to finish.
    pub async fn close(self) {
        let running = self.inner.rebuild.lock().await.clone();
        if let Some(rebuild) = running {
            info!("Waiting for schedule rebuild before closing");
            if let Err(e) = rebuild.await {
                warn!(error = %e, "Schedule rebuild failed during close");
            }
        }
        info!("Schedule cache closed");
    }

    async fn fresh(&self) -> Option<Arc<LookupTables>> {
        let guard = self.inner.current.read().await;
        guard
            .as_ref()
            .filter(|s| s.is_fresh(self.inner.config.ttl))
            .map(|s| Arc::clone(&s.tables))
    }

    /// Spawn a rebuild task and wrap it so several callers can await it.
    ///
    /// The task runs to completion even if every caller goes away, and
    /// clears the rebuild slot when done.
    fn start_rebuild(&self) -> SharedRebuild {
        let inner = Arc::clone(&self.inner);
        let handle = tokio::spawn(async move {
            let result = rebuild(&inner).await;
            inner.rebuild.lock().await.take();
            result
        });

        async move {
            match handle.await {
                Ok(result) => result,
                Err(e) => Err(CacheError::Worker {
                    message: e.to_string(),
                }),
            }
        }
        .boxed()
        .shared()
    }
}

async fn rebuild<S: BundleStore, F: FeedSource>(
    inner: &Inner<S, F>,
) -> Result<Snapshot, CacheError> {
    let started = Instant::now();
    info!("Rebuilding schedule lookup tables");

    let bytes = inner.source.fetch().await.inspect_err(|e| {
        warn!(error = %e, "Schedule feed download failed");
    })?;

    let max = inner.config.max_decompressed_bytes;
    let tables = tokio::task::spawn_blocking(move || {
        let feed = parse_archive(&bytes, max)?;
        Ok::<_, FeedError>(index::build(&feed))
    })
    .await
    .map_err(|e| CacheError::Worker {
        message: e.to_string(),
    })?
    .inspect_err(|e| warn!(error = %e, "Schedule feed parse failed"))?;

    let snapshot = Snapshot {
        tables: Arc::new(tables),
        built_at: Utc::now(),
    };

    if let Err(e) = persist(&inner.store, &snapshot).await {
        warn!(error = %e, "Failed to persist lookup tables");
    }

    *inner.current.write().await = Some(snapshot.clone());

    info!(
        elapsed_ms = started.elapsed().as_millis() as u64,
        stations = snapshot.tables.station_count(),
        "Schedule lookup tables rebuilt"
    );
    Ok(snapshot)
}

/// Write the bundle, then its timestamp.
async fn persist<S: BundleStore>(store: &S, snapshot: &Snapshot) -> Result<(), CacheError> {
    let tables = Arc::clone(&snapshot.tables);
    let bytes = tokio::task::spawn_blocking(move || serde_json::to_vec(tables.as_ref()))
        .await
        .map_err(|e| CacheError::Worker {
            message: e.to_string(),
        })?
        .map_err(|e| CacheError::store(format!("failed to serialize lookup tables: {e}")))?;

    store.write(StoreKey::Bundle, bytes).await?;
    store
        .write(
            StoreKey::Timestamp,
            snapshot.built_at.timestamp_millis().to_string().into_bytes(),
        )
        .await
}

/// Load a persisted bundle. A bundle without a valid timestamp is absent.
async fn load_persisted<S: BundleStore>(store: &S) -> Result<Option<Snapshot>, CacheError> {
    let Some(raw_timestamp) = store.read(StoreKey::Timestamp).await? else {
        return Ok(None);
    };
    let Some(built_at) = parse_timestamp(&raw_timestamp) else {
        return Err(CacheError::store("corrupt last_updated timestamp"));
    };
    let Some(bytes) = store.read(StoreKey::Bundle).await? else {
        return Ok(None);
    };

    let tables = tokio::task::spawn_blocking(move || {
        serde_json::from_slice::<LookupTables>(&bytes)
    })
    .await
    .map_err(|e| CacheError::Worker {
        message: e.to_string(),
    })?
    .map_err(|e| CacheError::store(format!("corrupt lookup tables: {e}")))?;

    Ok(Some(Snapshot {
        tables: Arc::new(tables),
        built_at,
    }))
}

fn parse_timestamp(raw: &[u8]) -> Option<DateTime<Utc>> {
    let millis: i64 = std::str::from_utf8(raw).ok()?.trim().parse().ok()?;
    DateTime::from_timestamp_millis(millis)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::test_support;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use tempfile::tempdir;

    /// Serves the sample archive, counting downloads.
    struct TestSource {
        calls: AtomicUsize,
        fail: AtomicBool,
        malformed: AtomicBool,
        delay: Duration,
    }

    impl TestSource {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                fail: AtomicBool::new(false),
                malformed: AtomicBool::new(false),
                delay: Duration::from_millis(50),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl FeedSource for TestSource {
        async fn fetch(&self) -> Result<Vec<u8>, FeedError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            if self.fail.load(Ordering::SeqCst) {
                return Err(FeedError::Api {
                    status: 503,
                    message: "Service Unavailable".into(),
                });
            }
            if self.malformed.load(Ordering::SeqCst) {
                return Ok(test_support::archive(&[("stops.txt", test_support::STOPS)]));
            }
            Ok(test_support::sample_archive())
        }
    }

    async fn open_memory(
        source: &Arc<TestSource>,
        config: ScheduleCacheConfig,
    ) -> ScheduleCache<MemoryStore, Arc<TestSource>> {
        ScheduleCache::open(MemoryStore::new(), Arc::clone(source), config).await
    }

    #[tokio::test]
    async fn first_get_builds_and_later_gets_reuse() {
        let source = TestSource::new();
        let cache = open_memory(&source, ScheduleCacheConfig::default()).await;

        assert!(cache.current().await.is_none());
        assert!(cache.freshness().await.is_none());

        let first = cache.get().await.unwrap();
        let second = cache.get().await.unwrap();

        assert_eq!(source.calls(), 1);
        assert!(Arc::ptr_eq(&first, &second));
        assert!(cache.freshness().await.is_some());
    }

    #[tokio::test]
    async fn concurrent_gets_share_one_download() {
        let source = TestSource::new();
        let cache = open_memory(&source, ScheduleCacheConfig::default()).await;

        let (a, b, c) = tokio::join!(cache.get(), cache.get(), cache.get());

        assert_eq!(source.calls(), 1);
        let (a, b, c) = (a.unwrap(), b.unwrap(), c.unwrap());
        assert!(Arc::ptr_eq(&a, &b));
        assert!(Arc::ptr_eq(&b, &c));
    }

    #[tokio::test]
    async fn concurrent_waiters_share_failure() {
        let source = TestSource::new();
        source.fail.store(true, Ordering::SeqCst);
        let cache = open_memory(&source, ScheduleCacheConfig::default()).await;

        let (a, b) = tokio::join!(cache.get(), cache.get());

        assert_eq!(source.calls(), 1);
        assert!(matches!(a, Err(CacheError::Rebuild(_))));
        assert!(matches!(b, Err(CacheError::Rebuild(_))));
        assert!(a.unwrap_err().is_transient());
    }

    #[tokio::test]
    async fn failed_rebuild_keeps_previous_tables() {
        let source = TestSource::new();
        let config = ScheduleCacheConfig::new().with_ttl(Duration::ZERO);
        let cache = open_memory(&source, config).await;

        let good = cache.get().await.unwrap();
        let built_at = cache.freshness().await;

        source.fail.store(true, Ordering::SeqCst);
        let err = cache.get().await.unwrap_err();
        assert!(matches!(err, CacheError::Rebuild(_)));

        let kept = cache.current().await.unwrap();
        assert!(Arc::ptr_eq(&good, &kept));
        assert_eq!(cache.freshness().await, built_at);
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn malformed_feed_keeps_previous_tables() {
        let source = TestSource::new();
        let config = ScheduleCacheConfig::new().with_ttl(Duration::ZERO);
        let cache = open_memory(&source, config).await;
        let good = cache.get().await.unwrap();

        source.malformed.store(true, Ordering::SeqCst);
        match cache.get().await.unwrap_err() {
            CacheError::Rebuild(e) => {
                assert!(matches!(*e, FeedError::MissingFeedData { .. }))
            }
            other => panic!("unexpected error: {other}"),
        }

        let kept = cache.current().await.unwrap();
        assert!(Arc::ptr_eq(&good, &kept));
    }

    #[tokio::test]
    async fn invalidate_forces_rebuild() {
        let source = TestSource::new();
        let cache = open_memory(&source, ScheduleCacheConfig::default()).await;

        cache.get().await.unwrap();
        cache.invalidate().await.unwrap();

        assert!(cache.current().await.is_none());
        assert!(cache.freshness().await.is_none());

        cache.get().await.unwrap();
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn persisted_tables_survive_reopen() {
        let dir = tempdir().unwrap();
        let source = TestSource::new();

        let cache = ScheduleCache::open(
            DiskStore::new(dir.path()),
            Arc::clone(&source),
            ScheduleCacheConfig::default(),
        )
        .await;
        let built = cache.get().await.unwrap();
        let built_at = cache.freshness().await.unwrap();
        cache.close().await;

        let offline = TestSource::new();
        offline.fail.store(true, Ordering::SeqCst);
        let reopened = ScheduleCache::open(
            DiskStore::new(dir.path()),
            Arc::clone(&offline),
            ScheduleCacheConfig::default(),
        )
        .await;

        let loaded = reopened.get().await.unwrap();
        assert_eq!(*loaded, *built);
        assert_eq!(offline.calls(), 0);
        assert_eq!(
            reopened.freshness().await.unwrap().timestamp_millis(),
            built_at.timestamp_millis()
        );
    }

    #[tokio::test]
    async fn stale_persisted_tables_are_served_by_current() {
        let dir = tempdir().unwrap();
        let source = TestSource::new();
        let cache = ScheduleCache::open(
            DiskStore::new(dir.path()),
            Arc::clone(&source),
            ScheduleCacheConfig::default(),
        )
        .await;
        cache.get().await.unwrap();

        let offline = TestSource::new();
        offline.fail.store(true, Ordering::SeqCst);
        let reopened = ScheduleCache::open(
            DiskStore::new(dir.path()),
            Arc::clone(&offline),
            ScheduleCacheConfig::new().with_ttl(Duration::ZERO),
        )
        .await;

        assert!(reopened.get().await.is_err());
        assert!(reopened.current().await.is_some());
        assert!(!reopened.status().await.fresh);
    }

    #[tokio::test]
    async fn corrupt_persisted_bundle_is_ignored() {
        let dir = tempdir().unwrap();
        let store = DiskStore::new(dir.path());
        store
            .write(StoreKey::Bundle, b"{not json".to_vec())
            .await
            .unwrap();
        store
            .write(StoreKey::Timestamp, b"1772445600000".to_vec())
            .await
            .unwrap();

        let source = TestSource::new();
        let cache = ScheduleCache::open(store, Arc::clone(&source), ScheduleCacheConfig::default())
            .await;

        assert!(cache.current().await.is_none());
        cache.get().await.unwrap();
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn status_reports_counts() {
        let source = TestSource::new();
        let cache = open_memory(&source, ScheduleCacheConfig::default()).await;

        let empty = cache.status().await;
        assert_eq!(empty.built_at, None);
        assert!(!empty.fresh);

        cache.get().await.unwrap();
        let status = cache.status().await;
        assert!(status.fresh);
        assert!(!status.rebuilding);
        assert_eq!(status.trips, 4);
        assert_eq!(status.stop_times, 5);
    }

    #[test]
    fn future_timestamp_counts_as_fresh() {
        let snapshot = Snapshot {
            tables: Arc::new(LookupTables::default()),
            built_at: Utc::now() + chrono::Duration::hours(1),
        };
        assert!(snapshot.is_fresh(Duration::ZERO));

        let old = Snapshot {
            tables: Arc::new(LookupTables::default()),
            built_at: Utc::now() - chrono::Duration::hours(25),
        };
        assert!(!old.is_fresh(DEFAULT_TTL));
    }

    #[test]
    fn timestamp_parsing() {
        assert_eq!(
            parse_timestamp(b"1772445600000").map(|t| t.timestamp_millis()),
            Some(1772445600000)
        );
        assert!(parse_timestamp(b"yesterday").is_none());
    }
}
