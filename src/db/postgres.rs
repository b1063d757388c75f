use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;

use crate::{
    db::WatchlistStore,
    error::AppResult,
    models::{Movie, NewMovie, User, WatchlistEntry},
};

/// Creates a PostgreSQL connection pool
///
/// Establishes a pool of database connections for efficient reuse.
/// Acquiring a connection is bounded so a saturated pool fails fast.
pub async fn create_pool(database_url: &str, acquire_timeout: Duration) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(acquire_timeout)
        .connect(database_url)
        .await?;

    Ok(pool)
}

/// Applies the embedded schema migrations
pub async fn run_migrations(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// [`WatchlistStore`] backed by Postgres
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl WatchlistStore for PgStore {
    async fn find_user(&self, telegram_id: i64) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, telegram_id FROM users WHERE telegram_id = $1",
        )
        .bind(telegram_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn upsert_user(&self, telegram_id: i64) -> AppResult<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (telegram_id)
            VALUES ($1)
            ON CONFLICT (telegram_id) DO UPDATE SET telegram_id = EXCLUDED.telegram_id
            RETURNING id, telegram_id
            "#,
        )
        .bind(telegram_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(user)
    }

    async fn find_movie(&self, movie_id: i64) -> AppResult<Option<Movie>> {
        let movie = sqlx::query_as::<_, Movie>(
            "SELECT id, title, year, rating, poster_url FROM movies WHERE id = $1",
        )
        .bind(movie_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(movie)
    }

    async fn find_movie_by_identity(&self, title: &str, year: &str) -> AppResult<Option<Movie>> {
        let movie = sqlx::query_as::<_, Movie>(
            r#"
            SELECT id, title, year, rating, poster_url
            FROM movies
            WHERE title = $1 AND year = $2
            ORDER BY id
            LIMIT 1
            "#,
        )
        .bind(title)
        .bind(year)
        .fetch_optional(&self.pool)
        .await?;

        Ok(movie)
    }

    async fn create_movie(&self, movie: &NewMovie) -> AppResult<Movie> {
        let created = sqlx::query_as::<_, Movie>(
            r#"
            INSERT INTO movies (title, year, rating, poster_url)
            VALUES ($1, $2, $3, $4)
            RETURNING id, title, year, rating, poster_url
            "#,
        )
        .bind(&movie.title)
        .bind(&movie.year)
        .bind(movie.rating)
        .bind(&movie.poster_url)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    async fn list_movies(&self) -> AppResult<Vec<Movie>> {
        let movies = sqlx::query_as::<_, Movie>(
            "SELECT id, title, year, rating, poster_url FROM movies ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(movies)
    }

    async fn find_entry(&self, user_id: i64, movie_id: i64) -> AppResult<Option<WatchlistEntry>> {
        let entry = sqlx::query_as::<_, WatchlistEntry>(
            r#"
            SELECT id, user_id, movie_id, added_at
            FROM user_movies
            WHERE user_id = $1 AND movie_id = $2
            "#,
        )
        .bind(user_id)
        .bind(movie_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(entry)
    }

    async fn create_entry(&self, user_id: i64, movie_id: i64) -> AppResult<WatchlistEntry> {
        let entry = sqlx::query_as::<_, WatchlistEntry>(
            r#"
            INSERT INTO user_movies (user_id, movie_id)
            VALUES ($1, $2)
            RETURNING id, user_id, movie_id, added_at
            "#,
        )
        .bind(user_id)
        .bind(movie_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(entry)
    }

    async fn delete_entry(&self, entry_id: i64) -> AppResult<()> {
        sqlx::query("DELETE FROM user_movies WHERE id = $1")
            .bind(entry_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn list_watchlist(&self, user_id: i64) -> AppResult<Vec<Movie>> {
        let movies = sqlx::query_as::<_, Movie>(
            r#"
            SELECT m.id, m.title, m.year, m.rating, m.poster_url
            FROM user_movies um
            JOIN movies m ON m.id = um.movie_id
            WHERE um.user_id = $1
            ORDER BY um.id
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(movies)
    }
}
