//! Webhook batch validation and ingestion.
//!
//! A request body is checked once, up front, into a [`ParsedBatch`]: the
//! container shape must be right or the whole request is refused, while each
//! element independently becomes either a [`NewMatch`] or a
//! [`ValidationError`]. Ingestion then writes the valid elements and counts
//! the rest.
//!
//! The `qualifies` and `form_advantage` flags are computed by the scraper and
//! stored exactly as received.

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{info, warn};

use crate::codec::{self, FieldKind, ShapeError};
use crate::storage::{MatchRepository, NewMatch, StorageError};

/// Longest head-to-head sequence kept; the first entries are the most recent.
const H2H_WINDOW: usize = 5;

/// The request body as a whole is unusable.
#[derive(Debug, Error)]
pub enum BatchError {
    #[error("invalid JSON body: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("invalid data format - request body must be a JSON object")]
    NotAnObject,
    #[error("invalid data format - matches must be an array")]
    MatchesNotArray,
}

/// A single element of `matches` was rejected.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("match must be a JSON object")]
    NotAnObject,
    #[error("missing required field `{0}`")]
    MissingField(&'static str),
    #[error("invalid match date `{0}`, expected YYYY-MM-DD")]
    InvalidDate(String),
    #[error("invalid `{field}`: {source}")]
    InvalidStructure {
        field: &'static str,
        #[source]
        source: ShapeError,
    },
}

/// A webhook body that passed shape validation.
#[derive(Debug)]
pub struct ParsedBatch {
    pub date: Option<String>,
    pub sport: Option<String>,
    pub declared_total: Option<u64>,
    pub declared_qualified: Option<u64>,
    pub entries: Vec<Result<NewMatch, ValidationError>>,
}

/// Outcome of ingesting one batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestSummary {
    /// Elements present in the `matches` array
    pub received: usize,
    pub saved: usize,
    pub errors: usize,
    /// Declared `total_count`, or `received` when the scraper didn't send one
    pub total: u64,
}

/// Batch-level values an element falls back to.
struct Defaults<'a> {
    date: Option<&'a str>,
    sport: Option<&'a str>,
    scraped_at: &'a str,
    source: &'a str,
}

impl ParsedBatch {
    /// Parse a raw request body.
    pub fn from_slice(body: &[u8], default_source: &str) -> Result<Self, BatchError> {
        let value: Value = serde_json::from_slice(body)?;
        Self::from_value(&value, default_source)
    }

    pub fn from_value(body: &Value, default_source: &str) -> Result<Self, BatchError> {
        let obj = body.as_object().ok_or(BatchError::NotAnObject)?;
        let matches = obj
            .get("matches")
            .and_then(Value::as_array)
            .ok_or(BatchError::MatchesNotArray)?;

        let date = text(obj, "date");
        let sport = text(obj, "sport");
        let scraped_at = text(obj, "timestamp").unwrap_or_else(|| Utc::now().to_rfc3339());

        let defaults = Defaults {
            date: date.as_deref(),
            sport: sport.as_deref(),
            scraped_at: &scraped_at,
            source: default_source,
        };
        let entries = matches
            .iter()
            .map(|element| parse_match(element, &defaults))
            .collect();

        Ok(Self {
            declared_total: obj.get("total_count").and_then(Value::as_u64),
            declared_qualified: obj.get("qualified_count").and_then(Value::as_u64),
            date,
            sport,
            entries,
        })
    }

    pub fn received(&self) -> usize {
        self.entries.len()
    }
}

/// Write every valid element of `batch`, one autocommitted upsert each.
///
/// Only an unreachable database fails the whole batch; rejected elements and
/// individual write failures are logged and counted.
pub fn ingest_batch(
    repo: &MatchRepository,
    batch: &ParsedBatch,
) -> Result<IngestSummary, StorageError> {
    let writer = repo.writer()?;
    let mut saved = 0;
    let mut errors = 0;

    for (index, entry) in batch.entries.iter().enumerate() {
        match entry {
            Ok(new_match) => match writer.upsert(new_match) {
                Ok(_) => saved += 1,
                Err(e) => {
                    warn!(
                        "Failed to save match #{} {} vs {}: {}",
                        index, new_match.home_team, new_match.away_team, e
                    );
                    errors += 1;
                }
            },
            Err(e) => {
                warn!("Rejected match #{}: {}", index, e);
                errors += 1;
            }
        }
    }

    let received = batch.received();
    let summary = IngestSummary {
        received,
        saved,
        errors,
        total: batch.declared_total.unwrap_or(received as u64),
    };

    info!(
        "Ingested batch (date: {}, sport: {}, declared qualifying: {}): saved {}/{} with {} errors",
        batch.date.as_deref().unwrap_or("-"),
        batch.sport.as_deref().unwrap_or("-"),
        batch
            .declared_qualified
            .map(|n| n.to_string())
            .unwrap_or_else(|| "-".to_string()),
        summary.saved,
        summary.received,
        summary.errors
    );

    Ok(summary)
}

fn parse_match(element: &Value, defaults: &Defaults<'_>) -> Result<NewMatch, ValidationError> {
    let obj = element.as_object().ok_or(ValidationError::NotAnObject)?;

    let home_team = text(obj, "home_team").ok_or(ValidationError::MissingField("home_team"))?;
    let away_team = text(obj, "away_team").ok_or(ValidationError::MissingField("away_team"))?;

    let date_text = text(obj, "match_date")
        .or_else(|| text(obj, "date"))
        .or_else(|| defaults.date.map(str::to_string))
        .ok_or(ValidationError::MissingField("match_date"))?;
    let match_date = NaiveDate::parse_from_str(&date_text, "%Y-%m-%d")
        .map_err(|_| ValidationError::InvalidDate(date_text.clone()))?;

    let sport = text(obj, "sport")
        .or_else(|| defaults.sport.map(str::to_string))
        .ok_or(ValidationError::MissingField("sport"))?;

    // Results within the head-to-head sample can't outnumber the sample
    let h2h_count = count(obj, "h2h_count");
    let h2h_result = |key: &str| count(obj, key).min(h2h_count);

    Ok(NewMatch {
        match_date,
        match_time: text(obj, "match_time").or_else(|| text(obj, "time")),
        sport,
        league: text(obj, "league"),
        home_team,
        away_team,
        home_odds: price(obj, "home_odds"),
        draw_odds: price(obj, "draw_odds"),
        away_odds: price(obj, "away_odds"),
        best_home_bookmaker: text(obj, "best_home_bookmaker"),
        best_away_bookmaker: text(obj, "best_away_bookmaker"),
        bookmakers_found: structured(obj, "bookmakers_found", FieldKind::Bookmakers)?,
        all_odds: structured(obj, "all_odds", FieldKind::Odds)?,
        h2h_count,
        home_wins_in_h2h_last5: h2h_result("home_wins_in_h2h_last5"),
        draws_last_5: h2h_result("draws_last_5"),
        away_wins_in_h2h: h2h_result("away_wins_in_h2h"),
        win_rate: number(obj, "win_rate").filter(|rate| (0.0..=1.0).contains(rate)),
        h2h_last5: recent_h2h(obj)?,
        home_form_overall: structured(obj, "home_form_overall", FieldKind::Outcomes)?,
        away_form_overall: structured(obj, "away_form_overall", FieldKind::Outcomes)?,
        form_advantage: flag(obj, "form_advantage"),
        qualifies: flag(obj, "qualifies"),
        match_url: text(obj, "match_url"),
        h2h_url: text(obj, "h2h_url"),
        scraped_at: text(obj, "scraped_at").unwrap_or_else(|| defaults.scraped_at.to_string()),
        source: text(obj, "source").unwrap_or_else(|| defaults.source.to_string()),
    })
}

/// Non-blank text. Numbers are accepted and rendered as text.
fn text(obj: &Map<String, Value>, key: &str) -> Option<String> {
    match obj.get(key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// A finite number, given either as a JSON number or numeric text.
fn number(obj: &Map<String, Value>, key: &str) -> Option<f64> {
    let n = match obj.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    n.is_finite().then_some(n)
}

/// Odds are positive; 0 or below means the price is missing.
fn price(obj: &Map<String, Value>, key: &str) -> Option<f64> {
    number(obj, key).filter(|odds| *odds > 0.0)
}

/// A non-negative count; anything missing or unreadable is 0.
fn count(obj: &Map<String, Value>, key: &str) -> u32 {
    number(obj, key)
        .map(|n| n.clamp(0.0, f64::from(u32::MAX)) as u32)
        .unwrap_or(0)
}

fn flag(obj: &Map<String, Value>, key: &str) -> bool {
    match obj.get(key) {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|n| n != 0.0),
        Some(Value::String(s)) => matches!(s.trim(), "true" | "1"),
        _ => false,
    }
}

fn structured(
    obj: &Map<String, Value>,
    field: &'static str,
    kind: FieldKind,
) -> Result<Option<String>, ValidationError> {
    match obj.get(field) {
        None => Ok(None),
        Some(value) => codec::encode_value(value, kind)
            .map_err(|source| ValidationError::InvalidStructure { field, source }),
    }
}

/// `h2h_last5`, cut to the first [`H2H_WINDOW`] results when longer.
fn recent_h2h(obj: &Map<String, Value>) -> Result<Option<String>, ValidationError> {
    let encoded = structured(obj, "h2h_last5", FieldKind::Outcomes)?;
    let results = codec::decode_outcomes(encoded.as_deref());
    if results.len() > H2H_WINDOW {
        return Ok(Some(codec::encode_outcomes(&results[..H2H_WINDOW])));
    }
    Ok(encoded)
}
