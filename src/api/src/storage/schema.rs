//! SQLite schema for scraped matches
//!
//! Tables:
//! - matches: one row per (match_date, home_team, away_team, sport)

use rusqlite::{Connection, Result};

/// Create all tables in the database
pub fn create_tables(conn: &Connection) -> Result<()> {
    conn.execute(
        r#"
        CREATE TABLE IF NOT EXISTS matches (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            match_date TEXT NOT NULL,
            match_time TEXT,
            sport TEXT NOT NULL,
            league TEXT,
            home_team TEXT NOT NULL,
            away_team TEXT NOT NULL,

            home_odds REAL,
            draw_odds REAL,
            away_odds REAL,
            best_home_bookmaker TEXT,
            best_away_bookmaker TEXT,
            bookmakers_found TEXT,
            all_odds TEXT,

            h2h_count INTEGER NOT NULL DEFAULT 0,
            home_wins_in_h2h_last5 INTEGER NOT NULL DEFAULT 0,
            draws_last_5 INTEGER NOT NULL DEFAULT 0,
            away_wins_in_h2h INTEGER NOT NULL DEFAULT 0,
            win_rate REAL,
            h2h_last5 TEXT,

            home_form_overall TEXT,
            away_form_overall TEXT,
            form_advantage INTEGER NOT NULL DEFAULT 0,
            qualifies INTEGER NOT NULL DEFAULT 0,

            match_url TEXT,
            h2h_url TEXT,

            scraped_at TEXT NOT NULL,
            source TEXT NOT NULL,

            UNIQUE(match_date, home_team, away_team, sport)
        )
        "#,
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_matches_date ON matches(match_date)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_matches_sport ON matches(sport)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_matches_qualifies ON matches(qualifies)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_matches_scraped_at ON matches(scraped_at)",
        [],
    )?;

    Ok(())
}
