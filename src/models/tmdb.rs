use serde::Deserialize;
use std::fmt::Display;

use super::SearchResult;

/// Year shown when a result carries no usable date
pub const UNKNOWN_YEAR: &str = "N/A";

/// The two TMDB search partitions merged into one ranking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Movie,
    Series,
}

impl Category {
    /// Path segment under `/search/`
    pub fn path(&self) -> &'static str {
        match self {
            Category::Movie => "movie",
            Category::Series => "tv",
        }
    }

    /// Query parameter that filters this category by year
    pub fn year_param(&self) -> &'static str {
        match self {
            Category::Movie => "year",
            Category::Series => "first_air_date_year",
        }
    }
}

impl Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Category::Movie => write!(f, "movie"),
            Category::Series => write!(f, "series"),
        }
    }
}

// ============================================================================
// TMDB API Types
// ============================================================================

/// Envelope of both `/search/movie` and `/search/tv`
#[derive(Debug, Deserialize)]
pub struct TmdbSearchResponse<T> {
    #[serde(default = "Vec::new")]
    pub results: Vec<T>,
}

/// Item from `/search/movie`
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct TmdbMovie {
    pub title: String,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub vote_average: f64,
    #[serde(default)]
    pub poster_path: Option<String>,
}

/// Item from `/search/tv`
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct TmdbSeries {
    pub name: String,
    #[serde(default)]
    pub first_air_date: Option<String>,
    #[serde(default)]
    pub vote_average: f64,
    #[serde(default)]
    pub poster_path: Option<String>,
}

/// A raw search hit tagged by the category it came from
#[derive(Debug, Clone, PartialEq)]
pub enum TmdbResult {
    Movie(TmdbMovie),
    Series(TmdbSeries),
}

impl TmdbResult {
    pub fn rating(&self) -> f64 {
        match self {
            TmdbResult::Movie(m) => m.vote_average,
            TmdbResult::Series(s) => s.vote_average,
        }
    }

    /// Release date for movies, first air date for series
    pub fn date(&self) -> Option<&str> {
        match self {
            TmdbResult::Movie(m) => m.release_date.as_deref(),
            TmdbResult::Series(s) => s.first_air_date.as_deref(),
        }
    }

    pub fn released_in(&self, year: u16) -> bool {
        self.date()
            .is_some_and(|date| date.starts_with(&format!("{:04}", year)))
    }

    /// Converts to the common result shape, resolving the poster against `image_base`
    pub fn normalize(self, image_base: &str) -> SearchResult {
        let year = display_year(self.date());
        let (title, rating, poster_path) = match self {
            TmdbResult::Movie(m) => (m.title, m.vote_average, m.poster_path),
            TmdbResult::Series(s) => (s.name, s.vote_average, s.poster_path),
        };

        SearchResult {
            title,
            year,
            rating,
            poster_url: poster_path
                .filter(|p| !p.is_empty())
                .map(|p| poster_url(image_base, &p)),
        }
    }
}

fn display_year(date: Option<&str>) -> String {
    match date {
        Some(d) if d.len() >= 4 && d.as_bytes()[..4].iter().all(u8::is_ascii_digit) => {
            d[..4].to_string()
        }
        _ => UNKNOWN_YEAR.to_string(),
    }
}

fn poster_url(image_base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        image_base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
