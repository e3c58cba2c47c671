//! Request and response types for the Matchboard API.

use serde::{Deserialize, Serialize};

use crate::ingest::IngestSummary;
use crate::storage::{BookmakerCount, DateCount, MatchRecord, MatchStats, SportCount};

/// Query parameters for `GET /matches`.
///
/// Kept as raw text so bad values can be reported as 400 with our own message.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListParams {
    pub sport: Option<String>,
    pub date: Option<String>,
    pub qualifies: Option<String>,
    pub limit: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    pub success: bool,
    #[serde(flatten)]
    pub summary: IngestSummary,
}

#[derive(Debug, Serialize)]
pub struct MatchesResponse {
    pub success: bool,
    pub count: usize,
    pub matches: Vec<MatchRecord>,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub success: bool,
    pub stats: MatchStats,
}

#[derive(Debug, Serialize)]
pub struct SportsResponse {
    pub success: bool,
    pub sports: Vec<SportCount>,
}

#[derive(Debug, Serialize)]
pub struct DatesResponse {
    pub success: bool,
    pub dates: Vec<DateCount>,
}

#[derive(Debug, Serialize)]
pub struct BookmakersResponse {
    pub success: bool,
    pub bookmakers: Vec<BookmakerCount>,
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub success: bool,
    /// "connected" or "disconnected"
    pub database: String,
    pub version: String,
    pub timestamp: String,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}
