/// TMDB search client
///
/// API Flow:
/// 1. Movies: /search/movie?query=..&year=..
/// 2. Series: /search/tv?query=..&first_air_date_year=..
///
/// Both endpoints return `{ "results": [...] }` with category-specific field
/// names, which are kept apart by [`TmdbResult`].
use crate::{
    error::{AppError, AppResult},
    models::{Category, TmdbMovie, TmdbResult, TmdbSearchResponse, TmdbSeries},
    services::search::SearchSource,
};
use reqwest::Client as HttpClient;
use serde::de::DeserializeOwned;
use std::time::Duration;

#[derive(Clone)]
pub struct TmdbClient {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
}

impl TmdbClient {
    /// Creates a client whose every request is bounded by `timeout`
    pub fn new(api_key: String, api_url: String, timeout: Duration) -> AppResult<Self> {
        if api_key.trim().is_empty() {
            return Err(AppError::InvalidInput(
                "TMDB API key cannot be empty".to_string(),
            ));
        }

        let http_client = HttpClient::builder().timeout(timeout).build()?;

        Ok(Self {
            http_client,
            api_key,
            api_url,
        })
    }

    fn search_url(&self, category: Category) -> String {
        format!(
            "{}/search/{}",
            self.api_url.trim_end_matches('/'),
            category.path()
        )
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        category: Category,
        title: &str,
        year: Option<u16>,
    ) -> AppResult<Vec<T>> {
        let mut query = vec![
            ("api_key", self.api_key.clone()),
            ("query", title.to_string()),
        ];
        if let Some(year) = year {
            query.push((category.year_param(), format!("{:04}", year)));
        }

        let response = self
            .http_client
            .get(self.search_url(category))
            .query(&query)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalApi(format!(
                "TMDB {} search returned status {}: {}",
                category, status, body
            )));
        }

        let response_text = response.text().await?;
        let parsed: TmdbSearchResponse<T> = serde_json::from_str(&response_text).map_err(|e| {
            tracing::error!(
                error = %e,
                category = %category,
                "Failed to deserialize TMDB response"
            );
            AppError::ExternalApi(format!("Failed to parse TMDB response: {}", e))
        })?;

        Ok(parsed.results)
    }
}

#[async_trait::async_trait]
impl SearchSource for TmdbClient {
    async fn search(
        &self,
        category: Category,
        title: &str,
        year: Option<u16>,
    ) -> AppResult<Vec<TmdbResult>> {
        let results: Vec<TmdbResult> = match category {
            Category::Movie => self
                .fetch::<TmdbMovie>(category, title, year)
                .await?
                .into_iter()
                .map(TmdbResult::Movie)
                .collect(),
            Category::Series => self
                .fetch::<TmdbSeries>(category, title, year)
                .await?
                .into_iter()
                .map(TmdbResult::Series)
                .collect(),
        };

        tracing::debug!(
            category = %category,
            title = %title,
            results = results.len(),
            source = "tmdb",
            "Category search completed"
        );

        Ok(results)
    }

    fn name(&self) -> &'static str {
        "tmdb"
    }
}
