//! HTTP route handlers.

use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use tracing::warn;

use crate::cache::{BundleStore, CacheError};
use crate::domain::StationId;
use crate::feed::FeedSource;
use crate::live::LiveSource;

use super::dto::*;
use super::state::AppState;

/// Largest window a client may ask for, in minutes.
const MAX_WINDOW_MINS: u32 = 240;

/// Create the application router.
pub fn create_router<S, F, L>(state: AppState<S, F, L>) -> Router
where
    S: BundleStore,
    F: FeedSource,
    L: LiveSource,
{
    Router::new()
        .route("/health", get(health))
        .route("/api/arrivals", get(arrivals::<S, F, L>))
        .route("/api/scheduled", get(scheduled::<S, F, L>))
        .route("/api/stations", get(stations::<S, F, L>))
        .route("/api/cache", get(cache_status::<S, F, L>))
        .route("/api/cache/invalidate", post(invalidate_cache::<S, F, L>))
        .with_state(state)
}

/// Health check endpoint.
async fn health() -> &'static str {
    "ok"
}

/// Validate a requested window, falling back to the configured default.
fn window(requested: Option<u32>, default: u32) -> Result<u32, AppError> {
    match requested {
        None => Ok(default),
        Some(w) if (1..=MAX_WINDOW_MINS).contains(&w) => Ok(w),
        Some(w) => Err(AppError::BadRequest {
            message: format!("Window must be between 1 and {MAX_WINDOW_MINS} minutes, got {w}"),
        }),
    }
}

/// Parse the station parameter. `None` means no station was given.
fn station(requested: Option<&str>) -> Result<Option<StationId>, AppError> {
    let Some(raw) = requested.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    StationId::parse(raw)
        .map(Some)
        .ok_or_else(|| AppError::BadRequest {
            message: format!("Invalid station: {raw}"),
        })
}

/// Merged live and scheduled board for a station.
async fn arrivals<S, F, L>(
    State(state): State<AppState<S, F, L>>,
    Query(req): Query<ArrivalsRequest>,
) -> Result<Json<ArrivalsResponse>, AppError>
where
    S: BundleStore,
    F: FeedSource,
    L: LiveSource,
{
    let window = window(req.window, state.board.config().query.default_window_mins)?;
    let filter = req
        .filter()
        .map_err(|message| AppError::BadRequest { message })?;

    let Some(station) = station(req.station.as_deref())? else {
        return Ok(Json(ArrivalsResponse::empty(window)));
    };

    let merged = state.board.arrivals(&station, window, &filter).await;
    let built_at = state.board.cache_freshness().await;

    Ok(Json(ArrivalsResponse::from_merged(
        &station, window, merged, built_at,
    )))
}

/// Scheduled arrivals only.
async fn scheduled<S, F, L>(
    State(state): State<AppState<S, F, L>>,
    Query(req): Query<ScheduledRequest>,
) -> Result<Json<ScheduledResponse>, AppError>
where
    S: BundleStore,
    F: FeedSource,
    L: LiveSource,
{
    let window = window(req.window, state.board.config().query.default_window_mins)?;

    let Some(station) = station(req.station.as_deref())? else {
        return Ok(Json(ScheduledResponse {
            station: String::new(),
            window,
            arrivals: Vec::new(),
        }));
    };

    let arrivals = state.board.scheduled_arrivals(&station, window).await?;

    Ok(Json(ScheduledResponse {
        station: station.as_str().to_string(),
        window,
        arrivals: arrivals.as_ref().clone(),
    }))
}

/// Every station, grouped by name.
async fn stations<S, F, L>(State(state): State<AppState<S, F, L>>) -> Json<StationListResponse>
where
    S: BundleStore,
    F: FeedSource,
    L: LiveSource,
{
    let stations = state
        .stations
        .all()
        .await
        .into_iter()
        .map(StationSummary::from)
        .collect();
    Json(StationListResponse { stations })
}

async fn cache_status<S, F, L>(State(state): State<AppState<S, F, L>>) -> Json<CacheStatusResponse>
where
    S: BundleStore,
    F: FeedSource,
    L: LiveSource,
{
    Json(state.board.cache_status().await.into())
}

/// Drop the schedule so the next request rebuilds it.
async fn invalidate_cache<S, F, L>(
    State(state): State<AppState<S, F, L>>,
) -> Result<Json<CacheStatusResponse>, AppError>
where
    S: BundleStore,
    F: FeedSource,
    L: LiveSource,
{
    state.board.invalidate_cache().await?;
    Ok(Json(state.board.cache_status().await.into()))
}

/// Application error type.
#[derive(Debug)]
pub enum AppError {
    BadRequest { message: String },
    Unavailable { message: String },
    Internal { message: String },
}

impl From<CacheError> for AppError {
    fn from(e: CacheError) -> Self {
        if e.is_transient() {
            AppError::Unavailable {
                message: e.to_string(),
            }
        } else {
            AppError::Internal {
                message: e.to_string(),
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            AppError::BadRequest { message } => (StatusCode::BAD_REQUEST, message),
            AppError::Unavailable { message } => (StatusCode::SERVICE_UNAVAILABLE, message),
            AppError::Internal { message } => (StatusCode::INTERNAL_SERVER_ERROR, message),
        };

        warn!(%status, error = %message, "Request failed");

        let body = Json(ErrorResponse { error: message });
        (status, body).into_response()
    }
}
