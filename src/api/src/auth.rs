//! Bearer token check for the webhook.

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use crate::routes::{ApiError, AppState};

/// Reject requests that don't carry the configured webhook key.
///
/// Runs before the body is read, so refused requests never reach storage.
/// With no key configured every request is let through.
pub async fn require_bearer(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(expected) = state.config.webhook.api_key() else {
        return Ok(next.run(request).await);
    };

    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(bearer_token)
        .ok_or_else(|| ApiError::unauthorized("Missing or invalid authorization header"))?;

    if token != expected {
        tracing::warn!("Rejected webhook request with invalid API key");
        return Err(ApiError::forbidden("Invalid API key"));
    }

    Ok(next.run(request).await)
}

fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}
