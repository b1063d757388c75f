use crate::{
    error::AppResult,
    models::{Movie, NewMovie, User, WatchlistEntry},
};

/// Persistent storage for users, catalog entries and watchlist entries
///
/// Implementations only perform single-step reads and writes; uniqueness of
/// watchlist entries is enforced by callers looking up before inserting.
#[async_trait::async_trait]
pub trait WatchlistStore: Send + Sync {
    async fn find_user(&self, telegram_id: i64) -> AppResult<Option<User>>;

    /// Returns the existing user for `telegram_id` or creates one
    async fn upsert_user(&self, telegram_id: i64) -> AppResult<User>;

    async fn find_movie(&self, movie_id: i64) -> AppResult<Option<Movie>>;

    /// Looks up a catalog entry by its `(title, year)` identity
    async fn find_movie_by_identity(&self, title: &str, year: &str) -> AppResult<Option<Movie>>;

    async fn create_movie(&self, movie: &NewMovie) -> AppResult<Movie>;

    async fn list_movies(&self) -> AppResult<Vec<Movie>>;

    async fn find_entry(&self, user_id: i64, movie_id: i64) -> AppResult<Option<WatchlistEntry>>;

    async fn create_entry(&self, user_id: i64, movie_id: i64) -> AppResult<WatchlistEntry>;

    async fn delete_entry(&self, entry_id: i64) -> AppResult<()>;

    /// Movies on a user's watchlist, in the order they were added
    async fn list_watchlist(&self, user_id: i64) -> AppResult<Vec<Movie>>;
}
