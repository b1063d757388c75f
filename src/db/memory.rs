use chrono::Utc;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::{
    db::WatchlistStore,
    error::AppResult,
    models::{Movie, NewMovie, User, WatchlistEntry},
};

/// [`WatchlistStore`] held in process memory
///
/// Ids are assigned sequentially per table, mirroring serial keys.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<MemoryStoreInner>>,
}

#[derive(Default)]
struct MemoryStoreInner {
    users: Vec<User>,
    movies: Vec<Movie>,
    entries: Vec<WatchlistEntry>,
    next_id: i64,
}

impl MemoryStoreInner {
    fn allocate_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl WatchlistStore for MemoryStore {
    async fn find_user(&self, telegram_id: i64) -> AppResult<Option<User>> {
        let inner = self.inner.read().await;
        Ok(inner
            .users
            .iter()
            .find(|u| u.telegram_id == telegram_id)
            .cloned())
    }

    async fn upsert_user(&self, telegram_id: i64) -> AppResult<User> {
        let mut inner = self.inner.write().await;
        if let Some(user) = inner.users.iter().find(|u| u.telegram_id == telegram_id) {
            return Ok(user.clone());
        }

        let user = User {
            id: inner.allocate_id(),
            telegram_id,
        };
        inner.users.push(user.clone());
        Ok(user)
    }

    async fn find_movie(&self, movie_id: i64) -> AppResult<Option<Movie>> {
        let inner = self.inner.read().await;
        Ok(inner.movies.iter().find(|m| m.id == movie_id).cloned())
    }

    async fn find_movie_by_identity(&self, title: &str, year: &str) -> AppResult<Option<Movie>> {
        let inner = self.inner.read().await;
        Ok(inner
            .movies
            .iter()
            .find(|m| m.title == title && m.year == year)
            .cloned())
    }

    async fn create_movie(&self, movie: &NewMovie) -> AppResult<Movie> {
        let mut inner = self.inner.write().await;
        let created = Movie {
            id: inner.allocate_id(),
            title: movie.title.clone(),
            year: movie.year.clone(),
            rating: movie.rating,
            poster_url: movie.poster_url.clone(),
        };
        inner.movies.push(created.clone());
        Ok(created)
    }

    async fn list_movies(&self) -> AppResult<Vec<Movie>> {
        let inner = self.inner.read().await;
        Ok(inner.movies.clone())
    }

    async fn find_entry(&self, user_id: i64, movie_id: i64) -> AppResult<Option<WatchlistEntry>> {
        let inner = self.inner.read().await;
        Ok(inner
            .entries
            .iter()
            .find(|e| e.user_id == user_id && e.movie_id == movie_id)
            .cloned())
    }

    async fn create_entry(&self, user_id: i64, movie_id: i64) -> AppResult<WatchlistEntry> {
        let mut inner = self.inner.write().await;
        let entry = WatchlistEntry {
            id: inner.allocate_id(),
            user_id,
            movie_id,
            added_at: Utc::now(),
        };
        inner.entries.push(entry.clone());
        Ok(entry)
    }

    async fn delete_entry(&self, entry_id: i64) -> AppResult<()> {
        let mut inner = self.inner.write().await;
        inner.entries.retain(|e| e.id != entry_id);
        Ok(())
    }

    async fn list_watchlist(&self, user_id: i64) -> AppResult<Vec<Movie>> {
        let inner = self.inner.read().await;
        Ok(inner
            .entries
            .iter()
            .filter(|e| e.user_id == user_id)
            .filter_map(|e| inner.movies.iter().find(|m| m.id == e.movie_id))
            .cloned()
            .collect())
    }
}
