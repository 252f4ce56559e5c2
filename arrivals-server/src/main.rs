use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use arrivals_server::board::{ArrivalBoard, BoardConfig, BoardWatch};
use arrivals_server::cache::{DiskStore, ScheduleCache, ScheduleCacheConfig};
use arrivals_server::domain::StationId;
use arrivals_server::feed::{FeedClient, FeedClientConfig};
use arrivals_server::live::{
    CachedPredictions, LiveSource, MockPredictions, PredictionCacheConfig, PredictionClient,
    PredictionClientConfig,
};
use arrivals_server::query::QueryConfig;
use arrivals_server::stations::{StationClient, StationClientConfig, StationDirectory};
use arrivals_server::web::{AppState, create_router};

/// How often to check whether the schedule needs rebuilding.
const SCHEDULE_CHECK_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// How often to refresh the station list (24 hours).
const STATION_REFRESH_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

/// Largest default window accepted from the environment, in minutes.
const MAX_DEFAULT_WINDOW_MINS: u32 = 240;

const DEFAULT_BIND: ([u8; 4], u16) = ([127, 0, 0, 1], 3000);

type Schedule = ScheduleCache<DiskStore, FeedClient>;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let api_key = std::env::var("WMATA_API_KEY").unwrap_or_else(|_| {
        warn!("WMATA_API_KEY not set. API calls will fail.");
        String::new()
    });
    let cache_dir = std::env::var("ARRIVALS_CACHE_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("cache"));

    let feed = FeedClient::new(FeedClientConfig::new(&api_key))
        .expect("Failed to create schedule feed client");
    let store = DiskStore::new(cache_dir);
    info!(dir = %store.dir().display(), "Using schedule cache directory");
    let schedule = ScheduleCache::open(store, feed, ScheduleCacheConfig::default()).await;

    let station_client = StationClient::new(StationClientConfig::new(&api_key))
        .expect("Failed to create station client");
    let stations = load_stations(station_client).await;

    match std::env::var("ARRIVALS_MOCK_DIR") {
        Ok(dir) => {
            let mock = MockPredictions::from_dir(&dir).expect("Failed to load mock predictions");
            info!(dir = %dir, stations = ?mock.available_stations().await, "Using mock live predictions");
            serve(schedule, stations, mock).await;
        }
        Err(_) => {
            let client = PredictionClient::new(PredictionClientConfig::new(&api_key))
                .expect("Failed to create prediction client");
            serve(
                schedule,
                stations,
                CachedPredictions::new(client, &PredictionCacheConfig::default()),
            )
            .await;
        }
    }
}

/// Fetch the station list and keep it fresh daily.
///
/// Starts empty when the first fetch fails; the daily refresh retries.
async fn load_stations(client: StationClient) -> StationDirectory {
    let stations = match StationDirectory::fetch(&client).await {
        Ok(stations) => {
            info!(count = stations.len().await, "Loaded station list");
            stations
        }
        Err(e) => {
            warn!(error = %e, "Failed to fetch station list. Starting with none.");
            StationDirectory::empty()
        }
    };

    let refresh = stations.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(STATION_REFRESH_INTERVAL);
        interval.tick().await;
        loop {
            interval.tick().await;
            match refresh.refresh(&client).await {
                Ok(count) => info!(count, "Refreshed station list"),
                Err(e) => warn!(error = %e, "Failed to refresh station list"),
            }
        }
    });

    stations
}

/// Board settings, with the default window taken from `ARRIVALS_DEFAULT_WINDOW`.
fn board_config() -> BoardConfig {
    let query = QueryConfig::new();
    let query = match std::env::var("ARRIVALS_DEFAULT_WINDOW") {
        Err(_) => query,
        Ok(raw) => match raw.trim().parse::<u32>() {
            Ok(mins) if (1..=MAX_DEFAULT_WINDOW_MINS).contains(&mins) => {
                query.with_default_window(mins)
            }
            _ => {
                warn!(value = %raw, "Ignoring invalid ARRIVALS_DEFAULT_WINDOW");
                query
            }
        },
    };
    BoardConfig::new().with_query(query)
}

async fn serve<L: LiveSource>(schedule: Schedule, stations: StationDirectory, live: L) {
    let board = Arc::new(ArrivalBoard::new(schedule, live, board_config()));

    // Build or refresh the schedule in the background; requests arriving
    // before the first build wait on the same rebuild.
    let refresh = Arc::clone(&board);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SCHEDULE_CHECK_INTERVAL);
        loop {
            interval.tick().await;
            match refresh.refresh_schedule().await {
                Ok(()) => debug!("Schedule is current"),
                Err(e) => warn!(error = %e, "Failed to refresh schedule"),
            }
        }
    });

    let watch = std::env::var("ARRIVALS_WATCH_STATION")
        .ok()
        .and_then(|s| StationId::parse(&s))
        .map(|station| watch_station(&board, station));

    let addr = std::env::var("ARRIVALS_BIND")
        .ok()
        .and_then(|s| s.parse::<SocketAddr>().ok())
        .unwrap_or_else(|| SocketAddr::from(DEFAULT_BIND));

    let app = create_router(AppState::new(Arc::clone(&board), stations));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind listener");

    info!(%addr, "Arrivals server listening");
    info!("  GET  /health                - Health check");
    info!("  GET  /api/arrivals          - Merged board (station, window, lines, track)");
    info!("  GET  /api/scheduled         - Scheduled arrivals (station, window)");
    info!("  GET  /api/stations          - Stations grouped by name");
    info!("  GET  /api/cache             - Schedule cache status");
    info!("  POST /api/cache/invalidate  - Drop the schedule cache");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    if let Some(watch) = watch {
        watch.stop();
    }
    board.close().await;
}

/// Poll one station and log each board update.
fn watch_station<L: LiveSource>(
    board: &Arc<ArrivalBoard<DiskStore, FeedClient, L>>,
    station: StationId,
) -> BoardWatch {
    info!(station = %station, "Watching station");
    let watch = board.watch(board.config().query.default_window_mins);
    watch.select(Some(station));

    let mut live = watch.live.subscribe();
    tokio::spawn(async move {
        while live.changed().await.is_ok() {
            let latest = live.borrow_and_update().clone();
            if let Some(update) = latest {
                info!(
                    station = %update.station,
                    trains = update.value.len(),
                    at = %update.at,
                    "Live predictions updated"
                );
            }
        }
    });

    let mut scheduled = watch.scheduled.subscribe();
    tokio::spawn(async move {
        while scheduled.changed().await.is_ok() {
            let latest = scheduled.borrow_and_update().clone();
            if let Some(update) = latest {
                info!(
                    station = %update.station,
                    trains = update.value.len(),
                    at = %update.at,
                    "Scheduled arrivals updated"
                );
            }
        }
    });

    watch
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}
