use std::sync::Arc;

use crate::services::{ConversationEngine, WatchlistManager};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub engine: ConversationEngine,
    pub watchlist: WatchlistManager,
    /// Secret the transport adapter must present in `x-bot-token`
    pub bot_token: Arc<str>,
}

impl AppState {
    pub fn new(engine: ConversationEngine, watchlist: WatchlistManager, bot_token: &str) -> Self {
        Self {
            engine,
            watchlist,
            bot_token: Arc::from(bot_token),
        }
    }
}
