//! Title search across TMDB's movie and TV partitions
//!
//! A [`SearchSource`] fetches raw hits for one category; the
//! [`SearchAggregator`] merges both categories into a single ranked,
//! cached list.
use crate::{
    error::AppResult,
    models::{Category, TmdbResult},
};

pub mod aggregator;
pub mod tmdb;

pub use aggregator::{rank, SearchAggregator, SearchOutcome};
pub use tmdb::TmdbClient;

/// Upstream search endpoint for one category at a time
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait SearchSource: Send + Sync {
    /// Search `category` by title, optionally narrowed to a release year
    ///
    /// Results come back in upstream order, each tagged with `category`.
    async fn search(
        &self,
        category: Category,
        title: &str,
        year: Option<u16>,
    ) -> AppResult<Vec<TmdbResult>>;

    /// Source name for logging and debugging
    fn name(&self) -> &'static str;
}
