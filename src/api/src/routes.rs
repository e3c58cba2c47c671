//! API route handlers.

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Query, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{NaiveDate, Utc};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth;
use crate::config::{AppConfig, QueryConfig};
use crate::ingest::{ingest_batch, BatchError, ParsedBatch};
use crate::storage::{MatchFilter, MatchRepository, StorageError};
use crate::types::{
    BookmakersResponse, DatesResponse, ErrorResponse, HealthResponse, ListParams,
    MatchesResponse, SportsResponse, StatsResponse, WebhookResponse,
};

/// Application state shared across handlers.
pub struct AppState {
    pub repo: MatchRepository,
    pub config: AppConfig,
}

/// Error type for API handlers.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: msg.into(),
        }
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            message: msg.into(),
        }
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::FORBIDDEN,
            message: msg.into(),
        }
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: msg.into(),
        }
    }

    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::SERVICE_UNAVAILABLE,
            message: msg.into(),
        }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: msg.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse {
            success: false,
            error: self.message,
        });
        (self.status, body).into_response()
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        tracing::error!("{}", err);
        match err {
            StorageError::Unavailable { .. } => Self::unavailable("Database unavailable"),
            _ => Self::internal("Database error"),
        }
    }
}

impl From<BatchError> for ApiError {
    fn from(err: BatchError) -> Self {
        Self::bad_request(err.to_string())
    }
}

/// Build the application router.
///
/// Every endpoint is served both at the root and under `/api`.
pub fn create_router(state: Arc<AppState>) -> Router {
    let webhook = Router::new()
        .route("/webhook/matches", post(receive_matches))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_bearer,
        ));

    let endpoints = Router::new()
        .route("/health", get(health))
        .route("/matches", get(list_matches))
        .route("/stats", get(stats))
        .route("/sports", get(sports))
        .route("/dates", get(dates))
        .route("/bookmakers", get(bookmakers))
        .merge(webhook);

    Router::new()
        .merge(endpoints.clone())
        .nest("/api", endpoints)
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(state.config.server.max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Run a storage operation on the blocking pool.
async fn with_repo<T, F>(state: &AppState, op: F) -> Result<T, ApiError>
where
    F: FnOnce(&MatchRepository) -> Result<T, StorageError> + Send + 'static,
    T: Send + 'static,
{
    let repo = state.repo.clone();
    tokio::task::spawn_blocking(move || op(&repo))
        .await
        .map_err(|e| ApiError::internal(format!("Database task failed: {}", e)))?
        .map_err(ApiError::from)
}

/// Health check endpoint.
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let repo = state.repo.clone();
    let connected = tokio::task::spawn_blocking(move || repo.ping())
        .await
        .unwrap_or(false);

    Json(HealthResponse {
        success: true,
        database: if connected { "connected" } else { "disconnected" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now().to_rfc3339(),
    })
}

/// Webhook receiving a scraped batch.
pub async fn receive_matches(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<WebhookResponse>, ApiError> {
    let batch = ParsedBatch::from_slice(&body, &state.config.webhook.default_source)?;
    tracing::debug!("Received batch of {} matches", batch.received());

    let summary = with_repo(&state, move |repo| ingest_batch(repo, &batch)).await?;

    Ok(Json(WebhookResponse {
        success: true,
        summary,
    }))
}

/// Filtered match listing.
pub async fn list_matches(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> Result<Json<MatchesResponse>, ApiError> {
    let filter = parse_filter(&params, &state.config.query)?;
    let matches = with_repo(&state, move |repo| repo.list_matches(&filter)).await?;

    Ok(Json(MatchesResponse {
        success: true,
        count: matches.len(),
        matches,
    }))
}

pub async fn stats(State(state): State<Arc<AppState>>) -> Result<Json<StatsResponse>, ApiError> {
    let stats = with_repo(&state, |repo| repo.stats()).await?;
    Ok(Json(StatsResponse {
        success: true,
        stats,
    }))
}

pub async fn sports(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SportsResponse>, ApiError> {
    let sports = with_repo(&state, |repo| repo.sport_breakdown()).await?;
    Ok(Json(SportsResponse {
        success: true,
        sports,
    }))
}

pub async fn dates(State(state): State<Arc<AppState>>) -> Result<Json<DatesResponse>, ApiError> {
    let limit = state.config.query.dates_limit;
    let dates = with_repo(&state, move |repo| repo.date_breakdown(limit)).await?;
    Ok(Json(DatesResponse {
        success: true,
        dates,
    }))
}

pub async fn bookmakers(
    State(state): State<Arc<AppState>>,
) -> Result<Json<BookmakersResponse>, ApiError> {
    let bookmakers = with_repo(&state, |repo| repo.bookmaker_breakdown()).await?;
    Ok(Json(BookmakersResponse {
        success: true,
        bookmakers,
    }))
}

async fn not_found() -> ApiError {
    ApiError::not_found("API endpoint not found")
}

/// Turn raw query parameters into a filter. Empty values count as absent.
fn parse_filter(params: &ListParams, limits: &QueryConfig) -> Result<MatchFilter, ApiError> {
    let present = |value: &Option<String>| {
        value
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };

    let match_date = present(&params.date)
        .map(|date| {
            NaiveDate::parse_from_str(&date, "%Y-%m-%d").map_err(|_| {
                ApiError::bad_request(format!("Invalid date `{}`, expected YYYY-MM-DD", date))
            })
        })
        .transpose()?;

    let qualifies = present(&params.qualifies)
        .map(|value| match value.as_str() {
            "true" | "1" => Ok(true),
            "false" | "0" => Ok(false),
            other => Err(ApiError::bad_request(format!(
                "Invalid qualifies `{}`, expected true, false, 1 or 0",
                other
            ))),
        })
        .transpose()?;

    let limit = match present(&params.limit) {
        None => limits.default_limit,
        Some(value) => match value.parse::<i64>() {
            Ok(n) if n > 0 => u32::try_from(n).unwrap_or(u32::MAX),
            _ => {
                return Err(ApiError::bad_request(format!(
                    "Invalid limit `{}`, expected a positive integer",
                    value
                )))
            }
        },
    };

    Ok(MatchFilter {
        sport: present(&params.sport),
        match_date,
        qualifies,
        limit: limit.min(limits.max_limit),
    })
}
