pub mod conversation;
pub mod search;
pub mod watchlist;

pub use conversation::ConversationEngine;
pub use search::{SearchAggregator, SearchSource, TmdbClient};
pub use watchlist::WatchlistManager;
