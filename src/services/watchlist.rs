use std::sync::Arc;
use std::time::Duration;

use crate::{
    cached,
    db::{Cache, CacheKey, WatchlistStore},
    error::{with_timeout, AppError, AppResult},
    models::{Movie, NewMovie, SearchResult},
};

const WATCHLIST_CACHE_TTL: u64 = 300; // 5 minutes
const MOVIE_CACHE_TTL: u64 = 600; // 10 minutes

/// Result of a lookup that may legitimately find nothing
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<T> {
    Found(T),
    NotFound,
    /// Storage was unreachable or returned an error; already logged
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    Added,
    AlreadyPresent,
    Failed,
}

impl AddOutcome {
    /// Whether a new watchlist entry was written
    pub fn added(&self) -> bool {
        matches!(self, AddOutcome::Added)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    Removed,
    NotFound,
    Failed,
}

impl RemoveOutcome {
    pub fn removed(&self) -> bool {
        matches!(self, RemoveOutcome::Removed)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum WatchlistView {
    Items(Vec<Movie>),
    Empty,
    Unavailable,
}

impl WatchlistView {
    /// Movies on the list; empty when the list is empty or unavailable
    pub fn movies(&self) -> &[Movie] {
        match self {
            WatchlistView::Items(movies) => movies,
            WatchlistView::Empty | WatchlistView::Unavailable => &[],
        }
    }
}

/// Catalog and watchlist mutations with cache upkeep
///
/// Storage failures are logged and surface as the negative outcome of each
/// operation. Every mutation deletes the affected cache key after the store
/// write completes.
#[derive(Clone)]
pub struct WatchlistManager {
    store: Arc<dyn WatchlistStore>,
    cache: Cache,
    storage_timeout: Duration,
}

impl WatchlistManager {
    pub fn new(store: Arc<dyn WatchlistStore>, cache: Cache, storage_timeout: Duration) -> Self {
        Self {
            store,
            cache,
            storage_timeout,
        }
    }

    /// Returns the catalog entry matching the candidate's `(title, year)`, creating it if needed
    pub async fn create_or_find_entry(&self, candidate: &SearchResult) -> Lookup<Movie> {
        match self.try_create_or_find_entry(candidate).await {
            Ok(movie) => Lookup::Found(movie),
            Err(e) => {
                tracing::error!(error = %e, title = %candidate.title, year = %candidate.year, "Failed to create or find catalog entry");
                Lookup::Failed
            }
        }
    }

    async fn try_create_or_find_entry(&self, candidate: &SearchResult) -> AppResult<Movie> {
        let existing = with_timeout(
            self.storage_timeout,
            "find movie by identity",
            self.store
                .find_movie_by_identity(&candidate.title, &candidate.year),
        )
        .await?;

        if let Some(movie) = existing {
            return Ok(movie);
        }

        let movie = with_timeout(
            self.storage_timeout,
            "create movie",
            self.store.create_movie(&NewMovie::from(candidate)),
        )
        .await?;

        tracing::info!(movie_id = movie.id, title = %movie.title, "Catalog entry created");
        Ok(movie)
    }

    /// Adds `movie` to the user's watchlist unless it is already there
    pub async fn add_to_watchlist(&self, telegram_id: i64, movie: &Movie) -> AddOutcome {
        match self.try_add_to_watchlist(telegram_id, movie).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(error = %e, telegram_id, movie_id = movie.id, "Failed to add to watchlist");
                AddOutcome::Failed
            }
        }
    }

    async fn try_add_to_watchlist(&self, telegram_id: i64, movie: &Movie) -> AppResult<AddOutcome> {
        let user = with_timeout(
            self.storage_timeout,
            "upsert user",
            self.store.upsert_user(telegram_id),
        )
        .await?;

        let existing = with_timeout(
            self.storage_timeout,
            "find watchlist entry",
            self.store.find_entry(user.id, movie.id),
        )
        .await?;

        if existing.is_some() {
            return Ok(AddOutcome::AlreadyPresent);
        }

        with_timeout(
            self.storage_timeout,
            "create watchlist entry",
            self.store.create_entry(user.id, movie.id),
        )
        .await?;

        self.cache
            .invalidate(&CacheKey::UserWatchlist(telegram_id))
            .await;

        tracing::info!(telegram_id, movie_id = movie.id, "Added to watchlist");
        Ok(AddOutcome::Added)
    }

    /// The user's watchlist in the order entries were added
    pub async fn get_watchlist(&self, telegram_id: i64) -> WatchlistView {
        let loaded: AppResult<Vec<Movie>> = cached!(
            self.cache,
            CacheKey::UserWatchlist(telegram_id),
            WATCHLIST_CACHE_TTL,
            self.load_watchlist(telegram_id)
        );

        match loaded {
            Ok(movies) if movies.is_empty() => WatchlistView::Empty,
            Ok(movies) => WatchlistView::Items(movies),
            Err(e) => {
                tracing::error!(error = %e, telegram_id, "Failed to load watchlist");
                WatchlistView::Unavailable
            }
        }
    }

    async fn load_watchlist(&self, telegram_id: i64) -> AppResult<Vec<Movie>> {
        let user = with_timeout(
            self.storage_timeout,
            "find user",
            self.store.find_user(telegram_id),
        )
        .await?;

        let Some(user) = user else {
            return Ok(Vec::new());
        };

        with_timeout(
            self.storage_timeout,
            "list watchlist",
            self.store.list_watchlist(user.id),
        )
        .await
    }

    /// Removes a catalog entry from the user's watchlist
    pub async fn remove_from_watchlist(&self, telegram_id: i64, movie_id: i64) -> RemoveOutcome {
        match self.try_remove_from_watchlist(telegram_id, movie_id).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(error = %e, telegram_id, movie_id, "Failed to remove from watchlist");
                RemoveOutcome::Failed
            }
        }
    }

    async fn try_remove_from_watchlist(
        &self,
        telegram_id: i64,
        movie_id: i64,
    ) -> AppResult<RemoveOutcome> {
        let user = with_timeout(
            self.storage_timeout,
            "find user",
            self.store.find_user(telegram_id),
        )
        .await?;
        let Some(user) = user else {
            return Ok(RemoveOutcome::NotFound);
        };

        let movie = with_timeout(
            self.storage_timeout,
            "find movie",
            self.store.find_movie(movie_id),
        )
        .await?;
        let Some(movie) = movie else {
            return Ok(RemoveOutcome::NotFound);
        };

        let entry = with_timeout(
            self.storage_timeout,
            "find watchlist entry",
            self.store.find_entry(user.id, movie.id),
        )
        .await?;
        let Some(entry) = entry else {
            return Ok(RemoveOutcome::NotFound);
        };

        with_timeout(
            self.storage_timeout,
            "delete watchlist entry",
            self.store.delete_entry(entry.id),
        )
        .await?;

        self.cache
            .invalidate(&CacheKey::UserWatchlist(telegram_id))
            .await;

        tracing::info!(telegram_id, movie_id, "Removed from watchlist");
        Ok(RemoveOutcome::Removed)
    }

    /// Single catalog entry by id, served from cache when possible
    pub async fn find_movie(&self, movie_id: i64) -> Lookup<Movie> {
        let loaded: AppResult<Movie> = cached!(
            self.cache,
            CacheKey::MovieDetails(movie_id),
            MOVIE_CACHE_TTL,
            async {
                with_timeout(
                    self.storage_timeout,
                    "find movie",
                    self.store.find_movie(movie_id),
                )
                .await?
                .ok_or_else(|| AppError::NotFound(format!("movie {}", movie_id)))
            }
        );

        match loaded {
            Ok(movie) => Lookup::Found(movie),
            Err(AppError::NotFound(_)) => Lookup::NotFound,
            Err(e) => {
                tracing::error!(error = %e, movie_id, "Failed to load catalog entry");
                Lookup::Failed
            }
        }
    }

    /// Every catalog entry, oldest first
    pub async fn list_movies(&self) -> AppResult<Vec<Movie>> {
        with_timeout(
            self.storage_timeout,
            "list movies",
            self.store.list_movies(),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::models::{User, WatchlistEntry};

    fn candidate(title: &str, year: &str) -> SearchResult {
        SearchResult {
            title: title.to_string(),
            year: year.to_string(),
            rating: 7.5,
            poster_url: None,
        }
    }

    fn manager_with(store: Arc<dyn WatchlistStore>) -> WatchlistManager {
        WatchlistManager::new(store, Cache::in_memory(1_000), Duration::from_secs(1))
    }

    fn manager() -> WatchlistManager {
        manager_with(Arc::new(MemoryStore::new()))
    }

    fn found(lookup: Lookup<Movie>) -> Movie {
        match lookup {
            Lookup::Found(movie) => movie,
            other => panic!("expected a movie, got {:?}", other),
        }
    }

    /// Store whose every call fails, as if the database were down
    struct BrokenStore;

    #[async_trait::async_trait]
    impl WatchlistStore for BrokenStore {
        async fn find_user(&self, _telegram_id: i64) -> AppResult<Option<User>> {
            Err(AppError::Internal("db down".to_string()))
        }
        async fn upsert_user(&self, _telegram_id: i64) -> AppResult<User> {
            Err(AppError::Internal("db down".to_string()))
        }
        async fn find_movie(&self, _movie_id: i64) -> AppResult<Option<Movie>> {
            Err(AppError::Internal("db down".to_string()))
        }
        async fn find_movie_by_identity(&self, _title: &str, _year: &str) -> AppResult<Option<Movie>> {
            Err(AppError::Internal("db down".to_string()))
        }
        async fn create_movie(&self, _movie: &NewMovie) -> AppResult<Movie> {
            Err(AppError::Internal("db down".to_string()))
        }
        async fn list_movies(&self) -> AppResult<Vec<Movie>> {
            Err(AppError::Internal("db down".to_string()))
        }
        async fn find_entry(&self, _user_id: i64, _movie_id: i64) -> AppResult<Option<WatchlistEntry>> {
            Err(AppError::Internal("db down".to_string()))
        }
        async fn create_entry(&self, _user_id: i64, _movie_id: i64) -> AppResult<WatchlistEntry> {
            Err(AppError::Internal("db down".to_string()))
        }
        async fn delete_entry(&self, _entry_id: i64) -> AppResult<()> {
            Err(AppError::Internal("db down".to_string()))
        }
        async fn list_watchlist(&self, _user_id: i64) -> AppResult<Vec<Movie>> {
            Err(AppError::Internal("db down".to_string()))
        }
    }

    /// Store that never answers within any reasonable timeout
    struct StalledStore;

    impl StalledStore {
        async fn stall<T>() -> AppResult<T> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Err(AppError::Internal("stalled".to_string()))
        }
    }

    #[async_trait::async_trait]
    impl WatchlistStore for StalledStore {
        async fn find_user(&self, _telegram_id: i64) -> AppResult<Option<User>> {
            Self::stall().await
        }
        async fn upsert_user(&self, _telegram_id: i64) -> AppResult<User> {
            Self::stall().await
        }
        async fn find_movie(&self, _movie_id: i64) -> AppResult<Option<Movie>> {
            Self::stall().await
        }
        async fn find_movie_by_identity(&self, _title: &str, _year: &str) -> AppResult<Option<Movie>> {
            Self::stall().await
        }
        async fn create_movie(&self, _movie: &NewMovie) -> AppResult<Movie> {
            Self::stall().await
        }
        async fn list_movies(&self) -> AppResult<Vec<Movie>> {
            Self::stall().await
        }
        async fn find_entry(&self, _user_id: i64, _movie_id: i64) -> AppResult<Option<WatchlistEntry>> {
            Self::stall().await
        }
        async fn create_entry(&self, _user_id: i64, _movie_id: i64) -> AppResult<WatchlistEntry> {
            Self::stall().await
        }
        async fn delete_entry(&self, _entry_id: i64) -> AppResult<()> {
            Self::stall().await
        }
        async fn list_watchlist(&self, _user_id: i64) -> AppResult<Vec<Movie>> {
            Self::stall().await
        }
    }

    #[tokio::test]
    async fn test_create_or_find_entry_dedups_by_title_and_year() {
        let store = Arc::new(MemoryStore::new());
        let manager = manager_with(store.clone());

        let first = found(manager.create_or_find_entry(&candidate("Dune", "2021")).await);
        let second = found(manager.create_or_find_entry(&candidate("Dune", "2021")).await);
        let remake = found(manager.create_or_find_entry(&candidate("Dune", "1984")).await);

        assert_eq!(first.id, second.id);
        assert_ne!(first.id, remake.id);
        assert_eq!(store.list_movies().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_add_to_watchlist_is_idempotent() {
        let manager = manager();
        let movie = found(manager.create_or_find_entry(&candidate("Alien", "1979")).await);

        let first = manager.add_to_watchlist(7, &movie).await;
        let second = manager.add_to_watchlist(7, &movie).await;

        assert_eq!(first, AddOutcome::Added);
        assert!(first.added());
        assert_eq!(second, AddOutcome::AlreadyPresent);
        assert!(!second.added());
        assert_eq!(manager.get_watchlist(7).await.movies().len(), 1);
    }

    #[tokio::test]
    async fn test_get_watchlist_unknown_user_is_empty() {
        let manager = manager();
        assert_eq!(manager.get_watchlist(404).await, WatchlistView::Empty);
    }

    #[tokio::test]
    async fn test_add_invalidates_cached_snapshot() {
        let manager = manager();
        let alien = found(manager.create_or_find_entry(&candidate("Alien", "1979")).await);
        let heat = found(manager.create_or_find_entry(&candidate("Heat", "1995")).await);

        manager.add_to_watchlist(1, &alien).await;
        // Populates the snapshot cache
        assert_eq!(manager.get_watchlist(1).await.movies().len(), 1);

        manager.add_to_watchlist(1, &heat).await;

        let titles: Vec<String> = manager
            .get_watchlist(1)
            .await
            .movies()
            .iter()
            .map(|m| m.title.clone())
            .collect();
        assert_eq!(titles, vec!["Alien", "Heat"]);
    }

    #[tokio::test]
    async fn test_remove_present_entry_then_absent() {
        let manager = manager();
        let alien = found(manager.create_or_find_entry(&candidate("Alien", "1979")).await);
        manager.add_to_watchlist(1, &alien).await;
        assert_eq!(manager.get_watchlist(1).await.movies().len(), 1);

        let removed = manager.remove_from_watchlist(1, alien.id).await;
        assert_eq!(removed, RemoveOutcome::Removed);
        assert!(removed.removed());
        assert_eq!(manager.get_watchlist(1).await, WatchlistView::Empty);

        let again = manager.remove_from_watchlist(1, alien.id).await;
        assert_eq!(again, RemoveOutcome::NotFound);
    }

    #[tokio::test]
    async fn test_remove_entry_not_on_watchlist_leaves_list_unchanged() {
        let manager = manager();
        let alien = found(manager.create_or_find_entry(&candidate("Alien", "1979")).await);
        let heat = found(manager.create_or_find_entry(&candidate("Heat", "1995")).await);
        manager.add_to_watchlist(1, &alien).await;

        assert_eq!(
            manager.remove_from_watchlist(1, heat.id).await,
            RemoveOutcome::NotFound
        );
        assert_eq!(
            manager.remove_from_watchlist(1, 9_999).await,
            RemoveOutcome::NotFound
        );
        assert_eq!(
            manager.remove_from_watchlist(2, alien.id).await,
            RemoveOutcome::NotFound
        );
        assert_eq!(manager.get_watchlist(1).await.movies(), &[alien]);
    }

    #[tokio::test]
    async fn test_find_movie_found_and_missing() {
        let manager = manager();
        let alien = found(manager.create_or_find_entry(&candidate("Alien", "1979")).await);

        assert_eq!(manager.find_movie(alien.id).await, Lookup::Found(alien));
        assert_eq!(manager.find_movie(12345).await, Lookup::NotFound);
    }

    #[tokio::test]
    async fn test_storage_failure_surfaces_as_negative_outcomes() {
        let manager = manager_with(Arc::new(BrokenStore));
        let movie = Movie {
            id: 1,
            title: "Alien".to_string(),
            year: "1979".to_string(),
            rating: None,
            poster_url: None,
        };

        assert_eq!(
            manager.create_or_find_entry(&candidate("Alien", "1979")).await,
            Lookup::Failed
        );
        assert_eq!(manager.add_to_watchlist(1, &movie).await, AddOutcome::Failed);
        assert_eq!(manager.get_watchlist(1).await, WatchlistView::Unavailable);
        assert_eq!(
            manager.remove_from_watchlist(1, 1).await,
            RemoveOutcome::Failed
        );
        assert_eq!(manager.find_movie(1).await, Lookup::Failed);
        assert!(manager.list_movies().await.is_err());
    }

    #[tokio::test]
    async fn test_slow_storage_times_out_as_failure() {
        let manager = WatchlistManager::new(
            Arc::new(StalledStore),
            Cache::in_memory(1_000),
            Duration::from_millis(50),
        );
        let movie = Movie {
            id: 1,
            title: "Alien".to_string(),
            year: "1979".to_string(),
            rating: None,
            poster_url: None,
        };

        let outcomes = tokio::time::timeout(Duration::from_secs(5), async {
            (
                manager.add_to_watchlist(1, &movie).await,
                manager.get_watchlist(1).await,
                manager.remove_from_watchlist(1, 1).await,
                manager.create_or_find_entry(&candidate("Alien", "1979")).await,
            )
        })
        .await
        .expect("storage calls must be bounded by the storage timeout");

        assert_eq!(outcomes.0, AddOutcome::Failed);
        assert_eq!(outcomes.1, WatchlistView::Unavailable);
        assert_eq!(outcomes.2, RemoveOutcome::Failed);
        assert_eq!(outcomes.3, Lookup::Failed);
    }
}
