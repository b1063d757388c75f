use std::sync::Arc;
use std::time::Duration;

use crate::models::SearchResult;

/// Where a user is in the conversation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConversationState {
    #[default]
    Idle,
    /// The next free-text message is a search query
    AwaitingSearch,
}

/// Bounded per-user conversation memory
///
/// Holds each user's [`ConversationState`] and the results of their latest
/// search. Both maps evict by capacity and by time, so inactive users do not
/// accumulate. A missing state reads as [`ConversationState::Idle`].
#[derive(Clone)]
pub struct SessionStore {
    states: moka::future::Cache<i64, ConversationState>,
    pending: moka::future::Cache<i64, Arc<Vec<SearchResult>>>,
}

impl SessionStore {
    pub fn new(max_users: u64, state_idle_timeout: Duration, pending_ttl: Duration) -> Self {
        Self {
            states: moka::future::Cache::builder()
                .max_capacity(max_users)
                .time_to_idle(state_idle_timeout)
                .build(),
            pending: moka::future::Cache::builder()
                .max_capacity(max_users)
                .time_to_live(pending_ttl)
                .build(),
        }
    }

    pub async fn set_state(&self, user_id: i64, state: ConversationState) {
        match state {
            ConversationState::Idle => self.states.invalidate(&user_id).await,
            other => self.states.insert(user_id, other).await,
        }
    }

    /// Returns the current state and resets it to idle
    pub async fn take_state(&self, user_id: i64) -> ConversationState {
        self.states.remove(&user_id).await.unwrap_or_default()
    }

    /// Stores a new result set, superseding any previous one
    pub async fn replace_pending(&self, user_id: i64, results: Vec<SearchResult>) {
        self.pending.insert(user_id, Arc::new(results)).await;
    }

    /// The result at `index` of the user's current set, if still held
    pub async fn pending_choice(&self, user_id: i64, index: usize) -> Option<SearchResult> {
        self.pending
            .get(&user_id)
            .await
            .and_then(|results| results.get(index).cloned())
    }

    /// The pending result matching a catalog identity, if any
    pub async fn pending_match(&self, user_id: i64, title: &str, year: &str) -> Option<SearchResult> {
        self.pending.get(&user_id).await.and_then(|results| {
            results
                .iter()
                .find(|r| r.title == title && r.year == year)
                .cloned()
        })
    }

    pub async fn clear_pending(&self, user_id: i64) {
        self.pending.invalidate(&user_id).await;
    }
}
