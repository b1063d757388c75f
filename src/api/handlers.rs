use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    Extension, Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{
    error::{AppError, AppResult},
    middleware::request_id::RequestId,
    models::Movie,
    services::{
        conversation::{Action, Event, Reply},
        watchlist::Lookup,
    },
};

use super::AppState;

/// Header the transport adapter authenticates with
pub const BOT_TOKEN_HEADER: &str = "x-bot-token";

// Request types

/// One inbound chat update, as forwarded by the transport adapter
#[derive(Debug, Deserialize)]
pub struct BotUpdate {
    pub user_id: i64,
    #[serde(flatten)]
    pub kind: UpdateKind,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UpdateKind {
    Start,
    Text { text: String },
    /// Inline button press carrying an action token
    Callback { data: String },
}

impl From<UpdateKind> for Event {
    fn from(kind: UpdateKind) -> Self {
        match kind {
            UpdateKind::Start => Event::Start,
            UpdateKind::Text { text } => Event::Text(text),
            UpdateKind::Callback { data } => match data.parse::<Action>() {
                Ok(action) => Event::Action(action),
                Err(_) => Event::Unrecognized(data),
            },
        }
    }
}

// Handlers

/// Health check endpoint
pub async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}

/// All catalog entries
pub async fn list_movies(State(state): State<AppState>) -> AppResult<Json<Vec<Movie>>> {
    let movies = state.watchlist.list_movies().await?;
    Ok(Json(movies))
}

/// One catalog entry by id
pub async fn get_movie(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<Movie>> {
    match state.watchlist.find_movie(id).await {
        Lookup::Found(movie) => Ok(Json(movie)),
        Lookup::NotFound => Err(AppError::NotFound(format!("Movie {} not found", id))),
        Lookup::Failed => Err(AppError::Internal("Failed to load movie".to_string())),
    }
}

/// Runs one chat update through the conversation engine
pub async fn bot_update(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    headers: HeaderMap,
    Json(update): Json<BotUpdate>,
) -> AppResult<Json<Reply>> {
    let authorized = headers
        .get(BOT_TOKEN_HEADER)
        .and_then(|h| h.to_str().ok())
        .is_some_and(|presented| constant_time_eq(presented, &state.bot_token));
    if !authorized {
        tracing::warn!(request_id = %request_id, "Rejected update with bad bot token");
        return Err(AppError::Unauthorized);
    }

    tracing::info!(
        request_id = %request_id,
        user_id = update.user_id,
        "Processing chat update"
    );

    let reply = state.engine.handle(update.user_id, update.kind.into()).await;
    Ok(Json(reply))
}

/// Compares without short-circuiting on the first differing byte
fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut diff: u8 = 0;
    for (x, y) in a.as_bytes().iter().zip(b.as_bytes()) {
        diff |= x ^ y;
    }
    diff == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_comparison() {
        assert!(constant_time_eq("secret-token", "secret-token"));
        assert!(!constant_time_eq("secret-token", "secret-tokeN"));
        assert!(!constant_time_eq("secret", "secret-token"));
        assert!(!constant_time_eq("", "secret-token"));
    }

    #[test]
    fn test_callback_decodes_to_action() {
        let update: BotUpdate =
            serde_json::from_str(r#"{"user_id": 5, "kind": "callback", "data": "show:3"}"#).unwrap();

        assert_eq!(update.user_id, 5);
        assert_eq!(Event::from(update.kind), Event::Action(Action::ShowById(3)));
    }

    #[test]
    fn test_bad_callback_is_unrecognized() {
        let kind = UpdateKind::Callback {
            data: "add_Dune".to_string(),
        };
        assert_eq!(Event::from(kind), Event::Unrecognized("add_Dune".to_string()));
    }

    #[test]
    fn test_text_and_start_updates() {
        let update: BotUpdate =
            serde_json::from_str(r#"{"user_id": 5, "kind": "text", "text": "Dune"}"#).unwrap();
        assert_eq!(Event::from(update.kind), Event::Text("Dune".to_string()));

        let update: BotUpdate = serde_json::from_str(r#"{"user_id": 5, "kind": "start"}"#).unwrap();
        assert_eq!(Event::from(update.kind), Event::Start);
    }
}
