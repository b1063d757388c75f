use std::sync::Arc;
use tracing::instrument;

use crate::{
    db::{Cache, CacheKey},
    error::AppResult,
    models::{Category, SearchResult, TmdbResult},
    services::search::SearchSource,
};

const SEARCH_CACHE_TTL: u64 = 3600; // 1 hour
const MAX_PER_CATEGORY: usize = 5;
pub const MAX_RESULTS: usize = 8;

/// Result of one aggregated search
///
/// `failed` lists the categories whose upstream call broke, so an empty
/// `results` can be told apart from a legitimately empty search.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchOutcome {
    pub results: Vec<SearchResult>,
    pub failed: Vec<Category>,
    pub from_cache: bool,
}

impl SearchOutcome {
    pub fn is_degraded(&self) -> bool {
        !self.failed.is_empty()
    }
}

/// Merges movie and series search into one rating-ordered list
#[derive(Clone)]
pub struct SearchAggregator {
    source: Arc<dyn SearchSource>,
    cache: Cache,
    image_base: String,
}

impl SearchAggregator {
    pub fn new(source: Arc<dyn SearchSource>, cache: Cache, image_base: String) -> Self {
        Self {
            source,
            cache,
            image_base,
        }
    }

    /// Search both categories for `title`, optionally restricted to `year`
    ///
    /// Never fails: an upstream failure in one category leaves the other's
    /// results intact, and is reported through [`SearchOutcome::failed`].
    #[instrument(skip(self), fields(source = self.source.name()))]
    pub async fn search(&self, title: &str, year: Option<u16>) -> SearchOutcome {
        let key = CacheKey::TmdbSearch {
            title: title.to_string(),
            year,
        };

        if let Some(results) = self.cache.get_from_cache::<Vec<SearchResult>>(&key).await {
            return SearchOutcome {
                results,
                failed: Vec::new(),
                from_cache: true,
            };
        }

        let (movies, series) = tokio::join!(
            self.source.search(Category::Movie, title, year),
            self.source.search(Category::Series, title, year),
        );

        let mut failed = Vec::new();
        let mut collect = |category: Category, outcome: AppResult<Vec<TmdbResult>>| match outcome {
            Ok(results) => results,
            Err(e) => {
                tracing::warn!(error = %e, category = %category, "Category search failed");
                failed.push(category);
                Vec::new()
            }
        };
        let movies = collect(Category::Movie, movies);
        let series = collect(Category::Series, series);

        let results = rank(movies, series, year, &self.image_base);

        if failed.is_empty() {
            self.cache
                .set_in_cache(&key, &results, SEARCH_CACHE_TTL)
                .await;
        } else {
            tracing::warn!(
                failed = failed.len(),
                results = results.len(),
                "Partial search result left uncached"
            );
        }

        tracing::info!(results = results.len(), "Title search completed");

        SearchOutcome {
            results,
            failed,
            from_cache: false,
        }
    }
}

/// Filters, ranks and merges raw hits from both categories
///
/// Each category keeps its top five rated hits (unrated and wrong-year hits
/// dropped); the union is ordered by rating and cut to [`MAX_RESULTS`].
/// Equal ratings keep encounter order: movies before series, then upstream
/// order.
pub fn rank(
    movies: Vec<TmdbResult>,
    series: Vec<TmdbResult>,
    year: Option<u16>,
    image_base: &str,
) -> Vec<SearchResult> {
    let mut combined: Vec<SearchResult> = top_rated(movies, year)
        .into_iter()
        .chain(top_rated(series, year))
        .map(|hit| hit.normalize(image_base))
        .collect();

    combined.sort_by(|a, b| b.rating.total_cmp(&a.rating));
    combined.truncate(MAX_RESULTS);
    combined
}

fn top_rated(hits: Vec<TmdbResult>, year: Option<u16>) -> Vec<TmdbResult> {
    let mut kept: Vec<TmdbResult> = hits
        .into_iter()
        .filter(|hit| hit.rating() > 0.0)
        .filter(|hit| year.map_or(true, |y| hit.released_in(y)))
        .collect();

    // sort_by is stable, so ties stay in upstream order
    kept.sort_by(|a, b| b.rating().total_cmp(&a.rating()));
    kept.truncate(MAX_PER_CATEGORY);
    kept
}
