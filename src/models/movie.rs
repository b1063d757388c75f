use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A chat user, keyed by their Telegram identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub telegram_id: i64,
}

/// A catalog entry known to the system, independent of any watchlist
///
/// `(title, year)` identifies the entry for deduplication.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Movie {
    pub id: i64,
    pub title: String,
    /// Display year, `"N/A"` when the source had no date
    pub year: String,
    pub rating: Option<f64>,
    pub poster_url: Option<String>,
}

/// Fields needed to persist a new catalog entry
#[derive(Debug, Clone, PartialEq)]
pub struct NewMovie {
    pub title: String,
    pub year: String,
    pub rating: Option<f64>,
    pub poster_url: Option<String>,
}

impl From<&SearchResult> for NewMovie {
    fn from(result: &SearchResult) -> Self {
        Self {
            title: result.title.clone(),
            year: result.year.clone(),
            rating: Some(result.rating).filter(|r| *r > 0.0),
            poster_url: result.poster_url.clone(),
        }
    }
}

/// Association of one user with one catalog entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct WatchlistEntry {
    pub id: i64,
    pub user_id: i64,
    pub movie_id: i64,
    pub added_at: DateTime<Utc>,
}

/// One ranked hit from the aggregated search, not persisted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub year: String,
    pub rating: f64,
    pub poster_url: Option<String>,
}
