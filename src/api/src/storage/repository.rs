//! SQLite repository for scraped matches

use chrono::NaiveDate;
use rusqlite::{params, Connection, OpenFlags, Row, ToSql};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use super::schema::create_tables;
use crate::codec::{self, OddsTable};

/// How long a connection waits on a locked database before giving up.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Storage failures, split by whether the database could be reached at all.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database unavailable at {path}: {source}")]
    Unavailable {
        path: String,
        #[source]
        source: rusqlite::Error,
    },
    #[error("database query failed: {0}")]
    Query(#[from] rusqlite::Error),
    #[error("failed to create database directory: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, StorageError>;

/// A validated match ready to be written.
///
/// Structured columns are already in their stored text form (see [`codec`]).
#[derive(Debug, Clone, PartialEq)]
pub struct NewMatch {
    pub match_date: NaiveDate,
    pub match_time: Option<String>,
    pub sport: String,
    pub league: Option<String>,
    pub home_team: String,
    pub away_team: String,
    pub home_odds: Option<f64>,
    pub draw_odds: Option<f64>,
    pub away_odds: Option<f64>,
    pub best_home_bookmaker: Option<String>,
    pub best_away_bookmaker: Option<String>,
    pub bookmakers_found: Option<String>,
    pub all_odds: Option<String>,
    pub h2h_count: u32,
    pub home_wins_in_h2h_last5: u32,
    pub draws_last_5: u32,
    pub away_wins_in_h2h: u32,
    pub win_rate: Option<f64>,
    pub h2h_last5: Option<String>,
    pub home_form_overall: Option<String>,
    pub away_form_overall: Option<String>,
    pub form_advantage: bool,
    pub qualifies: bool,
    pub match_url: Option<String>,
    pub h2h_url: Option<String>,
    pub scraped_at: String,
    pub source: String,
}

/// A stored match with its structured columns decoded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchRecord {
    pub id: i64,
    pub sport: String,
    pub league: Option<String>,
    pub home_team: String,
    pub away_team: String,
    pub match_date: NaiveDate,
    pub match_time: Option<String>,
    pub home_odds: Option<f64>,
    pub draw_odds: Option<f64>,
    pub away_odds: Option<f64>,
    pub best_home_bookmaker: Option<String>,
    pub best_away_bookmaker: Option<String>,
    pub bookmakers_found: Vec<String>,
    pub all_odds: OddsTable,
    pub h2h_count: u32,
    pub home_wins_in_h2h_last5: u32,
    pub draws_last_5: u32,
    pub away_wins_in_h2h: u32,
    pub win_rate: Option<f64>,
    pub h2h_last5: Vec<String>,
    pub home_form_overall: Vec<String>,
    pub away_form_overall: Vec<String>,
    pub form_advantage: bool,
    pub qualifies: bool,
    pub match_url: Option<String>,
    pub h2h_url: Option<String>,
    pub scraped_at: String,
    pub source: String,
}

/// Filters for listing matches. `None` means "any".
#[derive(Debug, Clone, PartialEq)]
pub struct MatchFilter {
    pub sport: Option<String>,
    pub match_date: Option<NaiveDate>,
    pub qualifies: Option<bool>,
    pub limit: u32,
}

/// Aggregates over every stored match.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MatchStats {
    pub total_matches: u64,
    pub qualifying_matches: u64,
    pub unique_sports: u64,
    pub unique_dates: u64,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
    pub last_update: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SportCount {
    pub sport: String,
    pub total_count: u64,
    pub qualifying_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DateCount {
    pub match_date: NaiveDate,
    pub total_count: u64,
    pub qualifying_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BookmakerCount {
    pub bookmaker: String,
    pub total_count: u64,
    pub qualifying_count: u64,
}

const SELECT_MATCH: &str = r#"
    SELECT id, match_date, match_time, sport, league, home_team, away_team,
           home_odds, draw_odds, away_odds, best_home_bookmaker, best_away_bookmaker,
           bookmakers_found, all_odds, h2h_count, home_wins_in_h2h_last5, draws_last_5,
           away_wins_in_h2h, win_rate, h2h_last5, home_form_overall, away_form_overall,
           form_advantage, qualifies, match_url, h2h_url, scraped_at, source
    FROM matches
"#;

/// Repository for scraped matches.
///
/// Holds only the database path; every operation opens its own connection
/// and drops it when done.
#[derive(Debug, Clone)]
pub struct MatchRepository {
    db_path: PathBuf,
}

impl MatchRepository {
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    /// Create the database file and tables if they don't exist yet.
    pub fn init(&self) -> Result<()> {
        if let Some(parent) = self.db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(&self.db_path).map_err(|e| self.unavailable(e))?;

        // Readers keep going while a batch is being written
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| {
            row.get::<_, String>(0)
        })?;

        create_tables(&conn)?;
        Ok(())
    }

    /// Open a connection to an existing database.
    ///
    /// Never creates the file: a missing database, or one without the
    /// `matches` table, is reported as [`StorageError::Unavailable`].
    pub fn connect(&self) -> Result<Connection> {
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn =
            Connection::open_with_flags(&self.db_path, flags).map_err(|e| self.unavailable(e))?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.query_row(
            "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'matches'",
            [],
            |_| Ok(()),
        )
        .map_err(|e| self.unavailable(e))?;
        Ok(conn)
    }

    /// Whether the database can be opened and queried.
    pub fn ping(&self) -> bool {
        self.connect()
            .and_then(|conn| Ok(conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?))
            .is_ok()
    }

    /// Open a connection for writing a batch of matches.
    pub fn writer(&self) -> Result<MatchWriter> {
        Ok(MatchWriter {
            conn: self.connect()?,
        })
    }

    // ==================== Query Operations ====================

    /// List matches newest date first, then by kick-off time and home team
    pub fn list_matches(&self, filter: &MatchFilter) -> Result<Vec<MatchRecord>> {
        let conn = self.connect()?;

        let mut conditions: Vec<&str> = Vec::new();
        let mut params_vec: Vec<Box<dyn ToSql>> = Vec::new();

        if let Some(sport) = &filter.sport {
            conditions.push("sport = ?");
            params_vec.push(Box::new(sport.clone()));
        }
        if let Some(date) = filter.match_date {
            conditions.push("match_date = ?");
            params_vec.push(Box::new(date));
        }
        if let Some(qualifies) = filter.qualifies {
            conditions.push("qualifies = ?");
            params_vec.push(Box::new(qualifies));
        }
        params_vec.push(Box::new(filter.limit));

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };
        let sql = format!(
            "{SELECT_MATCH} {where_clause}
             ORDER BY match_date DESC, match_time ASC, home_team ASC
             LIMIT ?"
        );

        let mut stmt = conn.prepare(&sql)?;
        let params_refs: Vec<&dyn ToSql> = params_vec.iter().map(|p| p.as_ref()).collect();
        let matches = stmt
            .query_map(params_refs.as_slice(), row_to_record)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(matches)
    }

    /// Total match count
    pub fn count(&self) -> Result<u64> {
        let conn = self.connect()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM matches", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    /// Aggregate statistics; all zeros on an empty table
    pub fn stats(&self) -> Result<MatchStats> {
        let conn = self.connect()?;
        let stats = conn.query_row(
            r#"
            SELECT COUNT(*),
                   COALESCE(SUM(CASE WHEN qualifies = 1 THEN 1 ELSE 0 END), 0),
                   COUNT(DISTINCT sport),
                   COUNT(DISTINCT match_date),
                   MIN(match_date),
                   MAX(match_date),
                   MAX(scraped_at)
            FROM matches
            "#,
            [],
            |row| {
                Ok(MatchStats {
                    total_matches: row.get::<_, i64>(0)? as u64,
                    qualifying_matches: row.get::<_, i64>(1)? as u64,
                    unique_sports: row.get::<_, i64>(2)? as u64,
                    unique_dates: row.get::<_, i64>(3)? as u64,
                    first_date: row.get(4)?,
                    last_date: row.get(5)?,
                    last_update: row.get(6)?,
                })
            },
        )?;
        Ok(stats)
    }

    /// Per-sport totals, busiest sport first
    pub fn sport_breakdown(&self) -> Result<Vec<SportCount>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT sport,
                   COUNT(*) AS total_count,
                   SUM(CASE WHEN qualifies = 1 THEN 1 ELSE 0 END) AS qualifying_count
            FROM matches
            GROUP BY sport
            ORDER BY total_count DESC, sport ASC
            "#,
        )?;

        let sports = stmt
            .query_map([], |row| {
                Ok(SportCount {
                    sport: row.get(0)?,
                    total_count: row.get::<_, i64>(1)? as u64,
                    qualifying_count: row.get::<_, i64>(2)? as u64,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(sports)
    }

    /// Per-date totals, busiest date first, at most `limit` dates
    pub fn date_breakdown(&self, limit: u32) -> Result<Vec<DateCount>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT match_date,
                   COUNT(*) AS total_count,
                   SUM(CASE WHEN qualifies = 1 THEN 1 ELSE 0 END) AS qualifying_count
            FROM matches
            GROUP BY match_date
            ORDER BY total_count DESC, match_date DESC
            LIMIT ?1
            "#,
        )?;

        let dates = stmt
            .query_map(params![limit], |row| {
                Ok(DateCount {
                    match_date: row.get(0)?,
                    total_count: row.get::<_, i64>(1)? as u64,
                    qualifying_count: row.get::<_, i64>(2)? as u64,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(dates)
    }

    /// Per-bookmaker totals in alphabetical order.
    ///
    /// A bookmaker listed twice on one match still counts that match once.
    pub fn bookmaker_breakdown(&self) -> Result<Vec<BookmakerCount>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT bookmakers_found, qualifies
            FROM matches
            WHERE bookmakers_found IS NOT NULL AND bookmakers_found != ''
            "#,
        )?;

        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, bool>(1)?))
        })?;

        let mut counts: BTreeMap<String, (u64, u64)> = BTreeMap::new();
        for row in rows {
            let (found, qualifies) = row?;
            for bookmaker in codec::decode_bookmakers(Some(&found)) {
                let entry = counts.entry(bookmaker).or_default();
                entry.0 += 1;
                if qualifies {
                    entry.1 += 1;
                }
            }
        }

        Ok(counts
            .into_iter()
            .map(|(bookmaker, (total_count, qualifying_count))| BookmakerCount {
                bookmaker,
                total_count,
                qualifying_count,
            })
            .collect())
    }

    fn unavailable(&self, source: rusqlite::Error) -> StorageError {
        StorageError::Unavailable {
            path: self.db_path.display().to_string(),
            source,
        }
    }

    /// Create an initialized repository in a temporary directory (for testing)
    #[cfg(test)]
    pub fn temporary() -> (Self, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let repo = Self::new(dir.path().join("matches.db"));
        repo.init().unwrap();
        (repo, dir)
    }
}

/// A connection held open for the duration of one ingestion batch.
///
/// Each upsert commits on its own, so a failure part-way through a batch
/// keeps everything written before it.
pub struct MatchWriter {
    conn: Connection,
}

impl MatchWriter {
    /// Insert a match, or overwrite every non-key column of the existing row
    pub fn upsert(&self, m: &NewMatch) -> Result<i64> {
        let id = self.conn.query_row(
            r#"
            INSERT INTO matches
            (match_date, match_time, sport, league, home_team, away_team,
             home_odds, draw_odds, away_odds, best_home_bookmaker, best_away_bookmaker,
             bookmakers_found, all_odds, h2h_count, home_wins_in_h2h_last5, draws_last_5,
             away_wins_in_h2h, win_rate, h2h_last5, home_form_overall, away_form_overall,
             form_advantage, qualifies, match_url, h2h_url, scraped_at, source)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16,
                    ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24, ?25, ?26, ?27)
            ON CONFLICT(match_date, home_team, away_team, sport) DO UPDATE SET
                match_time = excluded.match_time,
                league = excluded.league,
                home_odds = excluded.home_odds,
                draw_odds = excluded.draw_odds,
                away_odds = excluded.away_odds,
                best_home_bookmaker = excluded.best_home_bookmaker,
                best_away_bookmaker = excluded.best_away_bookmaker,
                bookmakers_found = excluded.bookmakers_found,
                all_odds = excluded.all_odds,
                h2h_count = excluded.h2h_count,
                home_wins_in_h2h_last5 = excluded.home_wins_in_h2h_last5,
                draws_last_5 = excluded.draws_last_5,
                away_wins_in_h2h = excluded.away_wins_in_h2h,
                win_rate = excluded.win_rate,
                h2h_last5 = excluded.h2h_last5,
                home_form_overall = excluded.home_form_overall,
                away_form_overall = excluded.away_form_overall,
                form_advantage = excluded.form_advantage,
                qualifies = excluded.qualifies,
                match_url = excluded.match_url,
                h2h_url = excluded.h2h_url,
                scraped_at = excluded.scraped_at,
                source = excluded.source
            RETURNING id
            "#,
            params![
                m.match_date,
                m.match_time,
                m.sport,
                m.league,
                m.home_team,
                m.away_team,
                m.home_odds,
                m.draw_odds,
                m.away_odds,
                m.best_home_bookmaker,
                m.best_away_bookmaker,
                m.bookmakers_found,
                m.all_odds,
                m.h2h_count,
                m.home_wins_in_h2h_last5,
                m.draws_last_5,
                m.away_wins_in_h2h,
                m.win_rate,
                m.h2h_last5,
                m.home_form_overall,
                m.away_form_overall,
                m.form_advantage,
                m.qualifies,
                m.match_url,
                m.h2h_url,
                m.scraped_at,
                m.source,
            ],
            |row| row.get(0),
        )?;
        Ok(id)
    }
}

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<MatchRecord> {
    let bookmakers_found: Option<String> = row.get("bookmakers_found")?;
    let all_odds: Option<String> = row.get("all_odds")?;
    let h2h_last5: Option<String> = row.get("h2h_last5")?;
    let home_form: Option<String> = row.get("home_form_overall")?;
    let away_form: Option<String> = row.get("away_form_overall")?;

    Ok(MatchRecord {
        id: row.get("id")?,
        sport: row.get("sport")?,
        league: row.get("league")?,
        home_team: row.get("home_team")?,
        away_team: row.get("away_team")?,
        match_date: row.get("match_date")?,
        match_time: row.get("match_time")?,
        home_odds: row.get("home_odds")?,
        draw_odds: row.get("draw_odds")?,
        away_odds: row.get("away_odds")?,
        best_home_bookmaker: row.get("best_home_bookmaker")?,
        best_away_bookmaker: row.get("best_away_bookmaker")?,
        bookmakers_found: codec::decode_bookmakers(bookmakers_found.as_deref()),
        all_odds: codec::decode_odds(all_odds.as_deref()),
        h2h_count: row.get("h2h_count")?,
        home_wins_in_h2h_last5: row.get("home_wins_in_h2h_last5")?,
        draws_last_5: row.get("draws_last_5")?,
        away_wins_in_h2h: row.get("away_wins_in_h2h")?,
        win_rate: row.get("win_rate")?,
        h2h_last5: codec::decode_outcomes(h2h_last5.as_deref()),
        home_form_overall: codec::decode_outcomes(home_form.as_deref()),
        away_form_overall: codec::decode_outcomes(away_form.as_deref()),
        form_advantage: row.get("form_advantage")?,
        qualifies: row.get("qualifies")?,
        match_url: row.get("match_url")?,
        h2h_url: row.get("h2h_url")?,
        scraped_at: row.get("scraped_at")?,
        source: row.get("source")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn create_test_match(match_date: &str, home: &str, away: &str, sport: &str) -> NewMatch {
        NewMatch {
            match_date: date(match_date),
            match_time: Some("18:00".to_string()),
            sport: sport.to_string(),
            league: Some("Ekstraklasa".to_string()),
            home_team: home.to_string(),
            away_team: away.to_string(),
            home_odds: Some(1.85),
            draw_odds: Some(3.5),
            away_odds: Some(4.2),
            best_home_bookmaker: Some("STS".to_string()),
            best_away_bookmaker: Some("Fortuna".to_string()),
            bookmakers_found: Some(r#"["STS","Fortuna"]"#.to_string()),
            all_odds: Some(r#"{"STS":{"home":1.85,"draw":3.4,"away":4.1}}"#.to_string()),
            h2h_count: 5,
            home_wins_in_h2h_last5: 3,
            draws_last_5: 1,
            away_wins_in_h2h: 1,
            win_rate: Some(0.6),
            h2h_last5: Some(r#"["W","W","D","L","W"]"#.to_string()),
            home_form_overall: Some(r#"["W","W","L","W","D"]"#.to_string()),
            away_form_overall: Some("L-L-W-L-L".to_string()),
            form_advantage: true,
            qualifies: false,
            match_url: None,
            h2h_url: None,
            scraped_at: "2025-10-26T08:00:00Z".to_string(),
            source: "github_actions".to_string(),
        }
    }

    fn upsert(repo: &MatchRepository, m: &NewMatch) -> Result<i64> {
        repo.writer()?.upsert(m)
    }

    fn filter_all() -> MatchFilter {
        MatchFilter {
            sport: None,
            match_date: None,
            qualifies: None,
            limit: 100,
        }
    }

    #[test]
    fn test_upsert_and_list() {
        let (repo, _dir) = MatchRepository::temporary();
        upsert(&repo, &create_test_match("2025-10-26", "Legia", "Górnik", "football"))
            .unwrap();

        let matches = repo.list_matches(&filter_all()).unwrap();
        assert_eq!(matches.len(), 1);

        let m = &matches[0];
        assert_eq!(m.home_team, "Legia");
        assert_eq!(m.match_date, date("2025-10-26"));
        assert_eq!(m.bookmakers_found, vec!["STS", "Fortuna"]);
        assert_eq!(m.all_odds["STS"].draw, Some(3.4));
        assert_eq!(m.h2h_last5, vec!["W", "W", "D", "L", "W"]);
        assert_eq!(m.away_form_overall, vec!["L", "L", "W", "L", "L"]);
        assert!(m.form_advantage);
        assert!(!m.qualifies);
    }

    #[test]
    fn test_upsert_replaces_existing_row() {
        let (repo, _dir) = MatchRepository::temporary();
        let mut m = create_test_match("2025-10-26", "A", "B", "football");
        let first_id = upsert(&repo, &m).unwrap();

        m.qualifies = true;
        m.league = None;
        m.home_odds = None;
        m.h2h_last5 = None;
        m.source = "rescrape".to_string();
        let second_id = upsert(&repo, &m).unwrap();

        assert_eq!(first_id, second_id);
        assert_eq!(repo.count().unwrap(), 1);

        let stored = &repo.list_matches(&filter_all()).unwrap()[0];
        assert!(stored.qualifies);
        assert_eq!(stored.league, None);
        assert_eq!(stored.home_odds, None);
        assert!(stored.h2h_last5.is_empty());
        assert_eq!(stored.source, "rescrape");
    }

    #[test]
    fn test_list_order_is_deterministic() {
        let (repo, _dir) = MatchRepository::temporary();

        let mut late = create_test_match("2025-10-26", "Zagłębie", "Lech", "football");
        late.match_time = Some("20:30".to_string());
        let mut early_b = create_test_match("2025-10-26", "Wisła", "Raków", "football");
        early_b.match_time = Some("15:00".to_string());
        let mut early_a = create_test_match("2025-10-26", "Cracovia", "Piast", "football");
        early_a.match_time = Some("15:00".to_string());
        let older = create_test_match("2025-10-25", "Arka", "Pogoń", "football");

        for m in [&older, &late, &early_b, &early_a] {
            upsert(&repo, m).unwrap();
        }

        let homes: Vec<String> = repo
            .list_matches(&filter_all())
            .unwrap()
            .into_iter()
            .map(|m| m.home_team)
            .collect();
        assert_eq!(homes, vec!["Cracovia", "Wisła", "Zagłębie", "Arka"]);
    }

    #[test]
    fn test_list_filters() {
        let (repo, _dir) = MatchRepository::temporary();

        let mut qualifying = create_test_match("2025-10-26", "A", "B", "football");
        qualifying.qualifies = true;
        upsert(&repo, &qualifying).unwrap();
        upsert(&repo, &create_test_match("2025-10-26", "C", "D", "football"))
            .unwrap();
        upsert(&repo, &create_test_match("2025-10-27", "E", "F", "volleyball"))
            .unwrap();

        let only_qualifying = repo
            .list_matches(&MatchFilter {
                qualifies: Some(true),
                ..filter_all()
            })
            .unwrap();
        assert_eq!(only_qualifying.len(), 1);
        assert_eq!(only_qualifying[0].home_team, "A");

        let not_qualifying = repo
            .list_matches(&MatchFilter {
                qualifies: Some(false),
                ..filter_all()
            })
            .unwrap();
        assert_eq!(not_qualifying.len(), 2);

        let volleyball = repo
            .list_matches(&MatchFilter {
                sport: Some("volleyball".to_string()),
                ..filter_all()
            })
            .unwrap();
        assert_eq!(volleyball.len(), 1);
        assert_eq!(volleyball[0].home_team, "E");

        let on_date = repo
            .list_matches(&MatchFilter {
                match_date: Some(date("2025-10-26")),
                ..filter_all()
            })
            .unwrap();
        assert_eq!(on_date.len(), 2);

        let limited = repo
            .list_matches(&MatchFilter {
                limit: 1,
                ..filter_all()
            })
            .unwrap();
        assert_eq!(limited.len(), 1);
    }

    #[test]
    fn test_corrupt_structured_text_degrades_to_empty() {
        let (repo, _dir) = MatchRepository::temporary();
        let mut m = create_test_match("2025-10-26", "A", "B", "football");
        m.all_odds = Some("{broken".to_string());
        m.h2h_last5 = Some("[\"W\"".to_string());
        upsert(&repo, &m).unwrap();

        let stored = &repo.list_matches(&filter_all()).unwrap()[0];
        assert!(stored.all_odds.is_empty());
        assert!(stored.h2h_last5.is_empty());
        assert_eq!(stored.bookmakers_found, vec!["STS", "Fortuna"]);
    }

    #[test]
    fn test_stats_empty() {
        let (repo, _dir) = MatchRepository::temporary();
        assert_eq!(repo.stats().unwrap(), MatchStats::default());
    }

    #[test]
    fn test_stats() {
        let (repo, _dir) = MatchRepository::temporary();

        let mut a = create_test_match("2025-10-25", "A", "B", "football");
        a.qualifies = true;
        a.scraped_at = "2025-10-25T08:00:00Z".to_string();
        let b = create_test_match("2025-10-26", "C", "D", "football");
        let c = create_test_match("2025-10-26", "E", "F", "tennis");
        for m in [&a, &b, &c] {
            upsert(&repo, m).unwrap();
        }

        let stats = repo.stats().unwrap();
        assert_eq!(stats.total_matches, 3);
        assert_eq!(stats.qualifying_matches, 1);
        assert_eq!(stats.unique_sports, 2);
        assert_eq!(stats.unique_dates, 2);
        assert_eq!(stats.first_date, Some(date("2025-10-25")));
        assert_eq!(stats.last_date, Some(date("2025-10-26")));
        assert_eq!(stats.last_update.as_deref(), Some("2025-10-26T08:00:00Z"));
    }

    #[test]
    fn test_sport_and_date_breakdown() {
        let (repo, _dir) = MatchRepository::temporary();

        let mut a = create_test_match("2025-10-25", "A", "B", "tennis");
        a.qualifies = true;
        upsert(&repo, &a).unwrap();
        upsert(&repo, &create_test_match("2025-10-26", "C", "D", "football"))
            .unwrap();
        upsert(&repo, &create_test_match("2025-10-26", "E", "F", "football"))
            .unwrap();

        let sports = repo.sport_breakdown().unwrap();
        assert_eq!(
            sports,
            vec![
                SportCount {
                    sport: "football".to_string(),
                    total_count: 2,
                    qualifying_count: 0,
                },
                SportCount {
                    sport: "tennis".to_string(),
                    total_count: 1,
                    qualifying_count: 1,
                },
            ]
        );

        let dates = repo.date_breakdown(30).unwrap();
        assert_eq!(dates.len(), 2);
        assert_eq!(dates[0].match_date, date("2025-10-26"));
        assert_eq!(dates[0].total_count, 2);
        assert_eq!(dates[1].qualifying_count, 1);

        assert_eq!(repo.date_breakdown(1).unwrap().len(), 1);
    }

    #[test]
    fn test_bookmaker_breakdown() {
        let (repo, _dir) = MatchRepository::temporary();

        let mut a = create_test_match("2025-10-26", "A", "B", "football");
        a.bookmakers_found = Some(r#"["STS","Fortuna","STS"]"#.to_string());
        a.qualifies = true;
        let mut b = create_test_match("2025-10-26", "C", "D", "football");
        b.bookmakers_found = Some("Superbet, STS".to_string());
        let mut c = create_test_match("2025-10-26", "E", "F", "football");
        c.bookmakers_found = None;
        for m in [&a, &b, &c] {
            upsert(&repo, m).unwrap();
        }

        let bookmakers = repo.bookmaker_breakdown().unwrap();
        let names: Vec<&str> = bookmakers.iter().map(|b| b.bookmaker.as_str()).collect();
        assert_eq!(names, vec!["Fortuna", "STS", "Superbet"]);

        let sts = &bookmakers[1];
        assert_eq!(sts.total_count, 2);
        assert_eq!(sts.qualifying_count, 1);
    }

    #[test]
    fn test_missing_database_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let repo = MatchRepository::new(dir.path().join("missing").join("matches.db"));

        assert!(!repo.ping());
        assert!(matches!(
            repo.stats(),
            Err(StorageError::Unavailable { .. })
        ));
    }

    #[test]
    fn test_database_without_schema_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("matches.db");
        Connection::open(&path)
            .unwrap()
            .execute("CREATE TABLE unrelated (x INTEGER)", [])
            .unwrap();

        let repo = MatchRepository::new(&path);
        assert!(!repo.ping());
        assert!(matches!(
            repo.stats(),
            Err(StorageError::Unavailable { .. })
        ));

        repo.init().unwrap();
        assert!(repo.ping());
        assert_eq!(repo.stats().unwrap(), MatchStats::default());
    }

    #[test]
    fn test_init_is_idempotent() {
        let (repo, _dir) = MatchRepository::temporary();
        repo.init().unwrap();
        assert!(repo.ping());
    }
}
