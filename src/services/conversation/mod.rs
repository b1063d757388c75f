//! Chat conversation flow
//!
//! The [`ConversationEngine`] turns decoded user events into search and
//! watchlist operations and answers with transport-neutral [`Reply`]
//! descriptors. Per-user state lives in a bounded [`SessionStore`].

mod action;
mod engine;
mod query;
mod reply;
mod session;

pub use action::{Action, ActionParseError};
pub use engine::{ConversationEngine, Event};
pub use query::SearchQuery;
pub use reply::{Button, Reply, MENU_SEARCH, MENU_WATCHLIST};
pub use session::{ConversationState, SessionStore};
