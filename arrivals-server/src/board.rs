//! The arrival board: schedule cache, live predictions and merging behind
//! one handle.
//!
//! Scheduled results are memoized per station, window and minute so that
//! several clients watching the same station share one query.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, Utc};
use moka::future::Cache as MokaCache;
use tracing::{debug, warn};

use crate::cache::{BundleStore, CacheError, CacheStatus, ScheduleCache};
use crate::domain::{Arrival, LiveArrival, ScheduledArrival, StationId, minutes_of_day};
use crate::feed::FeedSource;
use crate::index::LookupTables;
use crate::live::{LiveError, LiveSource};
use crate::merge::{self, ArrivalFilter};
use crate::poll::Poller;
use crate::query::{self, QueryConfig};

/// Station, window, service date and minute of day.
type MemoKey = (String, u32, NaiveDate, i64);

/// Configuration for an [`ArrivalBoard`].
#[derive(Debug, Clone)]
pub struct BoardConfig {
    pub query: QueryConfig,
    /// How often a watched station's live predictions are refreshed
    pub live_poll: Duration,
    /// How often a watched station's scheduled arrivals are recomputed
    pub schedule_poll: Duration,
    /// How long a scheduled result is reused
    pub memo_ttl: Duration,
    pub memo_capacity: u64,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            query: QueryConfig::default(),
            live_poll: Duration::from_secs(30),
            schedule_poll: Duration::from_secs(60),
            memo_ttl: Duration::from_secs(60),
            memo_capacity: 1000,
        }
    }
}

impl BoardConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_query(mut self, query: QueryConfig) -> Self {
        self.query = query;
        self
    }
}

/// A merged board and what went wrong assembling it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedArrivals {
    pub arrivals: Vec<Arrival>,
    pub live_count: usize,
    pub scheduled_count: usize,
    /// Set when live predictions couldn't be fetched
    pub live_error: Option<String>,
    /// Set when no schedule was available at all
    pub schedule_error: Option<String>,
}

/// Arrival board over a schedule cache and a live source.
pub struct ArrivalBoard<S, F, L> {
    schedule: ScheduleCache<S, F>,
    live: L,
    config: BoardConfig,
    memo: MokaCache<MemoKey, Arc<Vec<ScheduledArrival>>>,
}

impl<S: BundleStore, F: FeedSource, L: LiveSource> ArrivalBoard<S, F, L> {
    pub fn new(schedule: ScheduleCache<S, F>, live: L, config: BoardConfig) -> Self {
        let memo = MokaCache::builder()
            .time_to_live(config.memo_ttl)
            .max_capacity(config.memo_capacity)
            .build();

        Self {
            schedule,
            live,
            config,
            memo,
        }
    }

    pub fn config(&self) -> &BoardConfig {
        &self.config
    }

    pub fn schedule(&self) -> &ScheduleCache<S, F> {
        &self.schedule
    }

    pub fn live(&self) -> &L {
        &self.live
    }

    /// Lookup tables to query, falling back to stale ones when a rebuild
    /// fails.
    async fn tables(&self) -> Result<Arc<LookupTables>, CacheError> {
        match self.schedule.get().await {
            Ok(tables) => Ok(tables),
            Err(e) => match self.schedule.current().await {
                Some(stale) => {
                    warn!(error = %e, "Schedule rebuild failed, serving stale tables");
                    Ok(stale)
                }
                None => Err(e),
            },
        }
    }

    /// Scheduled arrivals at `station` over the next `window_mins`, as of
    /// local time now.
    pub async fn scheduled_arrivals(
        &self,
        station: &StationId,
        window_mins: u32,
    ) -> Result<Arc<Vec<ScheduledArrival>>, CacheError> {
        self.scheduled_arrivals_at(station, window_mins, Local::now().naive_local())
            .await
    }

    /// Scheduled arrivals as of an explicit local time.
    pub async fn scheduled_arrivals_at(
        &self,
        station: &StationId,
        window_mins: u32,
        now: NaiveDateTime,
    ) -> Result<Arc<Vec<ScheduledArrival>>, CacheError> {
        let key: MemoKey = (
            station.as_str().to_string(),
            window_mins,
            now.date(),
            minutes_of_day(now.time()),
        );

        if let Some(cached) = self.memo.get(&key).await {
            debug!(station = %station, window_mins, "Scheduled arrivals memo hit");
            return Ok(cached);
        }

        let tables = self.tables().await?;
        let arrivals = Arc::new(query::scheduled_arrivals(
            &tables,
            station,
            window_mins,
            now,
            &self.config.query,
        ));
        self.memo.insert(key, Arc::clone(&arrivals)).await;

        Ok(arrivals)
    }

    /// Live predictions at `station`.
    pub async fn live_arrivals(&self, station: &StationId) -> Result<Vec<LiveArrival>, LiveError> {
        self.live.predictions(station).await
    }

    /// Live and scheduled arrivals merged, filtered, as of local time now.
    pub async fn arrivals(
        &self,
        station: &StationId,
        window_mins: u32,
        filter: &ArrivalFilter,
    ) -> MergedArrivals {
        self.arrivals_at(station, window_mins, filter, Local::now().naive_local())
            .await
    }

    /// Merged arrivals as of an explicit local time.
    ///
    /// Either half may fail independently; the board is built from what is
    /// left and the failure recorded alongside it.
    pub async fn arrivals_at(
        &self,
        station: &StationId,
        window_mins: u32,
        filter: &ArrivalFilter,
        now: NaiveDateTime,
    ) -> MergedArrivals {
        let (live, scheduled) = tokio::join!(
            self.live_arrivals(station),
            self.scheduled_arrivals_at(station, window_mins, now),
        );

        let (live, live_error) = match live {
            Ok(live) => (live, None),
            Err(e) => {
                warn!(station = %station, error = %e, transient = e.is_transient(), "Live predictions unavailable");
                (Vec::new(), Some(e.to_string()))
            }
        };

        let (scheduled, schedule_error) = match scheduled {
            Ok(scheduled) => (scheduled.as_ref().clone(), None),
            Err(e) => {
                warn!(station = %station, error = %e, "Schedule unavailable");
                (Vec::new(), Some(e.to_string()))
            }
        };

        let arrivals = filter.apply(Self::merge_arrivals(live, scheduled));
        let live_count = arrivals.iter().filter(|a| a.is_live()).count();

        MergedArrivals {
            scheduled_count: arrivals.len() - live_count,
            live_count,
            arrivals,
            live_error,
            schedule_error,
        }
    }

    /// Merge live and scheduled arrivals.
    pub fn merge_arrivals(live: Vec<LiveArrival>, scheduled: Vec<ScheduledArrival>) -> Vec<Arrival> {
        merge::merge_arrivals(live, scheduled)
    }

    /// Drop the schedule, persisted copy included, and forget memoized
    /// results.
    pub async fn invalidate_cache(&self) -> Result<(), CacheError> {
        self.memo.invalidate_all();
        self.schedule.invalidate().await
    }

    /// When the held schedule was built.
    pub async fn cache_freshness(&self) -> Option<DateTime<Utc>> {
        self.schedule.freshness().await
    }

    pub async fn cache_status(&self) -> CacheStatus {
        self.schedule.status().await
    }

    /// Rebuild the schedule if it is missing or stale.
    pub async fn refresh_schedule(&self) -> Result<(), CacheError> {
        self.schedule.get().await.map(|_| ())
    }

    /// Wait for any running schedule rebuild.
    pub async fn close(&self) {
        self.schedule.clone().close().await;
    }

    /// Start polling both halves of the board for a selectable station.
    pub fn watch(self: &Arc<Self>, window_mins: u32) -> BoardWatch {
        let board = Arc::clone(self);
        let live = Poller::spawn("live", self.config.live_poll, move |station: StationId| {
            let board = Arc::clone(&board);
            async move { board.live_arrivals(&station).await }
        });

        let board = Arc::clone(self);
        let scheduled = Poller::spawn(
            "scheduled",
            self.config.schedule_poll,
            move |station: StationId| {
                let board = Arc::clone(&board);
                async move {
                    board
                        .scheduled_arrivals(&station, window_mins)
                        .await
                        .map(|arrivals| arrivals.as_ref().clone())
                }
            },
        );

        BoardWatch { live, scheduled }
    }
}

/// Live and scheduled pollers following one station.
pub struct BoardWatch {
    pub live: Poller<Vec<LiveArrival>>,
    pub scheduled: Poller<Vec<ScheduledArrival>>,
}

impl BoardWatch {
    pub fn select(&self, station: Option<StationId>) {
        self.live.select(station.clone());
        self.scheduled.select(station);
    }

    /// Latest results merged, once the schedule has been polled.
    ///
    /// Live results for a previously selected station are ignored.
    pub fn merged(&self) -> Option<(StationId, Vec<Arrival>)> {
        let scheduled = self.scheduled.latest()?;
        let live = self
            .live
            .latest()
            .filter(|live| live.station == scheduled.station)
            .map(|live| live.value.clone())
            .unwrap_or_default();

        Some((
            scheduled.station.clone(),
            merge::merge_arrivals(live, scheduled.value.clone()),
        ))
    }

    pub fn stop(self) {
        self.live.stop();
        self.scheduled.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{MemoryStore, ScheduleCacheConfig};
    use crate::domain::{LineCode, TrackGroup};
    use crate::feed::{FeedError, test_support};
    use crate::live::MockPredictions;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    #[derive(Default)]
    struct TestFeed {
        calls: AtomicUsize,
        fail: AtomicBool,
    }

    impl FeedSource for TestFeed {
        async fn fetch(&self) -> Result<Vec<u8>, FeedError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail.load(Ordering::SeqCst) {
                return Err(FeedError::Api {
                    status: 500,
                    message: "down".into(),
                });
            }
            Ok(test_support::sample_archive())
        }
    }

    type TestBoard = ArrivalBoard<MemoryStore, Arc<TestFeed>, Arc<MockPredictions>>;

    async fn board(
        feed: &Arc<TestFeed>,
        live: &Arc<MockPredictions>,
        ttl: Duration,
    ) -> TestBoard {
        let cache = ScheduleCache::open(
            MemoryStore::new(),
            Arc::clone(feed),
            ScheduleCacheConfig::new().with_ttl(ttl),
        )
        .await;
        ArrivalBoard::new(cache, Arc::clone(live), BoardConfig::default())
    }

    fn station(s: &str) -> StationId {
        StationId::parse(s).unwrap()
    }

    /// Monday 2 March 2026, when the sample service runs.
    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 2)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    const DAY: Duration = Duration::from_secs(86_400);

    #[tokio::test]
    async fn scheduled_arrivals_come_from_the_schedule() {
        let feed = Arc::new(TestFeed::default());
        let live = Arc::new(MockPredictions::new());
        let board = board(&feed, &live, DAY).await;

        let arrivals = board
            .scheduled_arrivals_at(&station("C05"), 90, at(10, 15))
            .await
            .unwrap();

        let trips: Vec<&str> = arrivals.iter().map(|a| a.trip_id.as_str()).collect();
        assert_eq!(trips, ["T1", "T4"]);
        assert_eq!(arrivals[0].destination, "Franconia");
        assert_eq!(arrivals[0].minutes_away, 15);
    }

    #[tokio::test]
    async fn memo_reuses_results_within_a_minute() {
        let feed = Arc::new(TestFeed::default());
        let live = Arc::new(MockPredictions::new());
        // Zero TTL: every uncached query rebuilds.
        let board = board(&feed, &live, Duration::ZERO).await;
        let c05 = station("C05");

        let first = board.scheduled_arrivals_at(&c05, 90, at(10, 15)).await.unwrap();
        let second = board.scheduled_arrivals_at(&c05, 90, at(10, 15)).await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(feed.calls.load(Ordering::SeqCst), 1);

        board.scheduled_arrivals_at(&c05, 30, at(10, 15)).await.unwrap();
        board.scheduled_arrivals_at(&c05, 90, at(10, 16)).await.unwrap();
        assert_eq!(feed.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn failed_rebuild_serves_stale_tables() {
        let feed = Arc::new(TestFeed::default());
        let live = Arc::new(MockPredictions::new());
        let board = board(&feed, &live, Duration::ZERO).await;
        let c05 = station("C05");

        board.scheduled_arrivals_at(&c05, 90, at(10, 15)).await.unwrap();
        feed.fail.store(true, Ordering::SeqCst);

        let stale = board.scheduled_arrivals_at(&c05, 90, at(10, 20)).await.unwrap();
        assert_eq!(stale.len(), 2);
        assert_eq!(stale[0].minutes_away, 10);
    }

    #[tokio::test]
    async fn no_schedule_at_all_is_an_error() {
        let feed = Arc::new(TestFeed::default());
        feed.fail.store(true, Ordering::SeqCst);
        let live = Arc::new(MockPredictions::new());
        let board = board(&feed, &live, DAY).await;

        let result = board.scheduled_arrivals_at(&station("C05"), 90, at(10, 15)).await;
        assert!(matches!(result, Err(CacheError::Rebuild(_))));
    }

    #[tokio::test]
    async fn live_trains_replace_nearby_schedule() {
        let feed = Arc::new(TestFeed::default());
        let live = Arc::new(MockPredictions::new());
        live.set(
            &station("C05"),
            vec![LiveArrival::new(LineCode::Blue, "Largo", "3", TrackGroup::Two)],
        )
        .await;
        let board = board(&feed, &live, DAY).await;

        let merged = board
            .arrivals_at(&station("C05"), 90, &ArrivalFilter::new(), at(10, 15))
            .await;

        assert_eq!(merged.live_count, 1);
        assert_eq!(merged.scheduled_count, 1);
        assert!(merged.live_error.is_none());
        assert!(merged.arrivals[0].is_live());
        assert_eq!(merged.arrivals[1].destination(), "Bethesda");
    }

    #[tokio::test]
    async fn live_failure_falls_back_to_schedule() {
        let feed = Arc::new(TestFeed::default());
        let live = Arc::new(MockPredictions::new());
        live.set_failing(true);
        let board = board(&feed, &live, DAY).await;

        let merged = board
            .arrivals_at(&station("C05"), 90, &ArrivalFilter::new(), at(10, 15))
            .await;

        assert!(merged.live_error.is_some());
        assert!(merged.schedule_error.is_none());
        assert_eq!(merged.scheduled_count, 2);
        assert_eq!(merged.live_count, 0);
    }

    #[tokio::test]
    async fn missing_schedule_still_shows_live() {
        let feed = Arc::new(TestFeed::default());
        feed.fail.store(true, Ordering::SeqCst);
        let live = Arc::new(MockPredictions::new());
        live.set(
            &station("C05"),
            vec![LiveArrival::new(LineCode::Silver, "Ashburn", "BRD", TrackGroup::Two)],
        )
        .await;
        let board = board(&feed, &live, DAY).await;

        let merged = board
            .arrivals_at(&station("C05"), 90, &ArrivalFilter::new(), at(10, 15))
            .await;

        assert!(merged.schedule_error.is_some());
        assert_eq!(merged.arrivals.len(), 1);
        assert_eq!(merged.arrivals[0].minutes_away(), 0);
    }

    #[tokio::test]
    async fn filter_applies_after_merge() {
        let feed = Arc::new(TestFeed::default());
        let live = Arc::new(MockPredictions::new());
        let board = board(&feed, &live, DAY).await;

        let filter = ArrivalFilter::new().with_lines([LineCode::Blue]);
        let merged = board
            .arrivals_at(&station("C05"), 90, &filter, at(10, 15))
            .await;

        assert_eq!(merged.arrivals.len(), 1);
        assert_eq!(merged.arrivals[0].line(), LineCode::Blue);
        assert_eq!(merged.arrivals[0].destination(), "Franconia");
    }

    #[tokio::test]
    async fn invalidate_forces_rebuild() {
        let feed = Arc::new(TestFeed::default());
        let live = Arc::new(MockPredictions::new());
        let board = board(&feed, &live, DAY).await;
        let c05 = station("C05");

        board.scheduled_arrivals_at(&c05, 90, at(10, 15)).await.unwrap();
        assert!(board.cache_freshness().await.is_some());

        board.invalidate_cache().await.unwrap();
        assert!(board.cache_freshness().await.is_none());

        board.scheduled_arrivals_at(&c05, 90, at(10, 15)).await.unwrap();
        assert_eq!(feed.calls.load(Ordering::SeqCst), 2);

        let status = board.cache_status().await;
        assert!(status.fresh);
        assert_eq!(status.trips, 4);
    }

    #[tokio::test]
    async fn watch_merges_latest_polls() {
        let feed = Arc::new(TestFeed::default());
        let live = Arc::new(MockPredictions::new());
        live.set(
            &station("C05"),
            vec![LiveArrival::new(LineCode::Blue, "Largo", "3", TrackGroup::Two)],
        )
        .await;
        let board = Arc::new(board(&feed, &live, DAY).await);
        board.refresh_schedule().await.unwrap();

        let watch = board.watch(90);
        assert!(watch.merged().is_none());
        watch.select(Some(station("C05")));

        let mut updates = watch.scheduled.subscribe();
        let mut live_updates = watch.live.subscribe();
        updates.wait_for(Option::is_some).await.unwrap();
        live_updates.wait_for(Option::is_some).await.unwrap();

        let (selected, arrivals) = watch.merged().unwrap();
        assert_eq!(selected, station("C05"));
        assert!(arrivals.iter().any(Arrival::is_live));
        watch.stop();
    }
}
