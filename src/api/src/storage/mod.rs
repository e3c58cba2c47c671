//! SQLite storage module for scraped matches
//!
//! Provides persistent storage for matches received through the webhook,
//! keyed by (match_date, home_team, away_team, sport).

pub mod repository;
pub mod schema;

pub use repository::{
    BookmakerCount, DateCount, MatchFilter, MatchRecord, MatchRepository, MatchStats, NewMatch,
    SportCount, StorageError,
};
