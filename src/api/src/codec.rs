//! Text encoding for the structured match columns.
//!
//! Bookmaker lists, outcome sequences and the per-bookmaker odds table are
//! stored as compact JSON text. Older scraper builds wrote delimiter-joined
//! text instead (`"STS, Fortuna"`, `"W-D-L"`), which is still understood on
//! read. Anything unreadable decodes to an empty container.
//!
//! The odds table is keyed by bookmaker in a sorted map, so decoding returns
//! bookmakers in alphabetical order rather than the order they were sent.
//! Only `home`, `draw` and `away` survive a round trip; other keys in a
//! bookmaker's entry are dropped, as are prices that aren't positive.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

/// Home/draw/away prices quoted by a single bookmaker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct OddsTriple {
    #[serde(default)]
    pub home: Option<f64>,
    #[serde(default)]
    pub draw: Option<f64>,
    #[serde(default)]
    pub away: Option<f64>,
}

impl OddsTriple {
    /// Drop prices that aren't positive.
    pub fn positive(self) -> Self {
        let keep = |price: Option<f64>| price.filter(|p| *p > 0.0);
        Self {
            home: keep(self.home),
            draw: keep(self.draw),
            away: keep(self.away),
        }
    }
}

/// Bookmaker name -> quoted prices.
pub type OddsTable = BTreeMap<String, OddsTriple>;

/// The structured columns and their shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Ordered set of bookmaker names.
    Bookmakers,
    /// Ordered sequence of outcome tokens (W/D/L).
    Outcomes,
    /// Bookmaker -> odds triple.
    Odds,
}

impl FieldKind {
    fn expected(&self) -> &'static str {
        match self {
            FieldKind::Bookmakers => "an array of bookmaker names",
            FieldKind::Outcomes => "an array of outcome tokens",
            FieldKind::Odds => "an object of bookmaker odds",
        }
    }
}

/// A structured value whose shape does not match its column.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("expected {expected}")]
pub struct ShapeError {
    expected: &'static str,
}

/// Encode an incoming JSON value for storage.
///
/// `null` stores nothing, a string is taken as already serialized and kept
/// verbatim, and arrays/objects are checked against `kind` and re-encoded.
pub fn encode_value(value: &Value, kind: FieldKind) -> Result<Option<String>, ShapeError> {
    let shape_error = || ShapeError {
        expected: kind.expected(),
    };

    match value {
        Value::Null => Ok(None),
        Value::String(text) => Ok(Some(text.clone())),
        _ => match kind {
            FieldKind::Bookmakers => {
                let names: Vec<String> = typed(value).ok_or_else(shape_error)?;
                Ok(Some(encode_bookmakers(&names)))
            }
            FieldKind::Outcomes => {
                let tokens: Vec<String> = typed(value).ok_or_else(shape_error)?;
                Ok(Some(encode_outcomes(&tokens)))
            }
            FieldKind::Odds => {
                let table: OddsTable = typed(value).ok_or_else(shape_error)?;
                Ok(Some(encode_odds(&positive_prices(table))))
            }
        },
    }
}

pub fn encode_bookmakers(names: &[String]) -> String {
    to_json(&dedup(names.iter().cloned()))
}

pub fn encode_outcomes(tokens: &[String]) -> String {
    to_json(tokens)
}

pub fn encode_odds(table: &OddsTable) -> String {
    to_json(table)
}

/// Decode a stored bookmaker list. Duplicates are dropped, first one wins.
pub fn decode_bookmakers(text: Option<&str>) -> Vec<String> {
    let names = decode_list(text, |legacy| {
        legacy
            .split(", ")
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect()
    });
    dedup(names)
}

pub fn decode_outcomes(text: Option<&str>) -> Vec<String> {
    decode_list(text, |legacy| {
        legacy
            .split('-')
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(str::to_string)
            .collect()
    })
}

pub fn decode_odds(text: Option<&str>) -> OddsTable {
    match text.map(str::trim) {
        Some(raw) if looks_like_json(raw) => {
            positive_prices(serde_json::from_str(raw).unwrap_or_default())
        }
        _ => OddsTable::new(),
    }
}

fn positive_prices(table: OddsTable) -> OddsTable {
    table
        .into_iter()
        .map(|(bookmaker, prices)| (bookmaker, prices.positive()))
        .collect()
}

fn decode_list(text: Option<&str>, legacy: impl FnOnce(&str) -> Vec<String>) -> Vec<String> {
    match text.map(str::trim) {
        None | Some("") => Vec::new(),
        Some(raw) if looks_like_json(raw) => serde_json::from_str(raw).unwrap_or_default(),
        Some(raw) => legacy(raw),
    }
}

fn looks_like_json(raw: &str) -> bool {
    raw.starts_with('[') || raw.starts_with('{')
}

fn typed<T: DeserializeOwned>(value: &Value) -> Option<T> {
    T::deserialize(value).ok()
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> String {
    // Strings, options, floats and string-keyed maps always serialize.
    serde_json::to_string(value).unwrap_or_default()
}

fn dedup(items: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_null_stores_nothing() {
        assert_eq!(encode_value(&Value::Null, FieldKind::Outcomes), Ok(None));
        assert_eq!(encode_value(&Value::Null, FieldKind::Odds), Ok(None));
    }

    #[test]
    fn test_pre_serialized_text_kept_verbatim() {
        let raw = json!("STS, Fortuna");
        assert_eq!(
            encode_value(&raw, FieldKind::Bookmakers),
            Ok(Some("STS, Fortuna".to_string()))
        );

        let raw = json!("[\"W\", \"L\"]");
        assert_eq!(
            encode_value(&raw, FieldKind::Outcomes),
            Ok(Some("[\"W\", \"L\"]".to_string()))
        );
    }

    #[test]
    fn test_outcomes_round_trip() {
        let value = json!(["W", "D", "L", "W", "W"]);
        let stored = encode_value(&value, FieldKind::Outcomes).unwrap().unwrap();
        assert_eq!(stored, r#"["W","D","L","W","W"]"#);
        assert_eq!(
            decode_outcomes(Some(&stored)),
            strings(&["W", "D", "L", "W", "W"])
        );
    }

    #[test]
    fn test_odds_round_trip() {
        let value = json!({
            "STS": {"home": 1.85, "draw": 3.4, "away": 4.1},
            "Fortuna": {"home": 1.9, "draw": null, "away": 4.0}
        });
        let stored = encode_value(&value, FieldKind::Odds).unwrap().unwrap();
        let table = decode_odds(Some(&stored));

        assert_eq!(table.len(), 2);
        assert_eq!(
            table["STS"],
            OddsTriple {
                home: Some(1.85),
                draw: Some(3.4),
                away: Some(4.1)
            }
        );
        assert_eq!(table["Fortuna"].draw, None);
        assert_eq!(serde_json::to_value(&table).unwrap(), value);
    }

    #[test]
    fn test_non_positive_prices_dropped() {
        let value = json!({"STS": {"home": 0, "draw": -2.5, "away": 4.1}});
        let stored = encode_value(&value, FieldKind::Odds).unwrap().unwrap();
        assert_eq!(stored, r#"{"STS":{"home":null,"draw":null,"away":4.1}}"#);

        // Pre-serialized text is stored as sent and cleaned on read
        let table = decode_odds(Some(r#"{"STS": {"home": 0.0, "draw": 3.2, "away": -1}}"#));
        assert_eq!(
            table["STS"],
            OddsTriple {
                home: None,
                draw: Some(3.2),
                away: None
            }
        );
    }

    #[test]
    fn test_wrong_shape_rejected() {
        let err = encode_value(&json!([1, 2, 3]), FieldKind::Outcomes).unwrap_err();
        assert_eq!(err.to_string(), "expected an array of outcome tokens");

        assert!(encode_value(&json!(["STS"]), FieldKind::Odds).is_err());
        assert!(encode_value(&json!(42), FieldKind::Bookmakers).is_err());
    }

    #[test]
    fn test_bookmakers_deduplicated_in_order() {
        let names = strings(&["STS", "Fortuna", "STS", "Betclic"]);
        let stored = encode_bookmakers(&names);
        assert_eq!(
            decode_bookmakers(Some(&stored)),
            strings(&["STS", "Fortuna", "Betclic"])
        );
    }

    #[test]
    fn test_legacy_delimited_text() {
        assert_eq!(
            decode_bookmakers(Some("STS, Fortuna, Superbet")),
            strings(&["STS", "Fortuna", "Superbet"])
        );
        assert_eq!(
            decode_outcomes(Some("W-W-L-D")),
            strings(&["W", "W", "L", "D"])
        );
        assert!(decode_odds(Some("STS: 1.85")).is_empty());
    }

    #[test]
    fn test_malformed_json_degrades_to_empty() {
        assert!(decode_outcomes(Some("[\"W\", \"D\"")).is_empty());
        assert!(decode_bookmakers(Some("{not json")).is_empty());
        assert!(decode_odds(Some("{\"STS\": ")).is_empty());
        assert!(decode_outcomes(Some("[1, 2]")).is_empty());
    }

    #[test]
    fn test_missing_text_is_empty() {
        assert!(decode_outcomes(None).is_empty());
        assert!(decode_bookmakers(Some("  ")).is_empty());
        assert!(decode_odds(None).is_empty());
    }
}
