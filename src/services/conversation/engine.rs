use tracing::instrument;

use super::{
    reply::{format_rating, MENU_SEARCH, MENU_WATCHLIST},
    Action, Button, ConversationState, Reply, SearchQuery, SessionStore,
};
use crate::{
    models::{Movie, SearchResult},
    services::{
        search::SearchAggregator,
        watchlist::{AddOutcome, Lookup, RemoveOutcome, WatchlistManager, WatchlistView},
    },
};

/// An inbound user event, already decoded by the transport adapter
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// The user (re)started the bot
    Start,
    /// A plain message, including taps on the persistent menu
    Text(String),
    Action(Action),
    /// A callback payload that did not decode to an [`Action`]
    Unrecognized(String),
}

/// Per-user conversation state machine
///
/// Decides what each event means for the user's current state, runs the
/// search or watchlist operation it implies, and describes the reply.
#[derive(Clone)]
pub struct ConversationEngine {
    sessions: SessionStore,
    search: SearchAggregator,
    watchlist: WatchlistManager,
}

impl ConversationEngine {
    pub fn new(sessions: SessionStore, search: SearchAggregator, watchlist: WatchlistManager) -> Self {
        Self {
            sessions,
            search,
            watchlist,
        }
    }

    /// Handles one event for `user_id` and returns the reply to render
    #[instrument(skip(self))]
    pub async fn handle(&self, user_id: i64, event: Event) -> Reply {
        match event {
            Event::Start => self.start(user_id).await,
            Event::Text(text) => self.on_text(user_id, text.trim()).await,
            Event::Action(action) => self.on_action(user_id, action).await,
            Event::Unrecognized(raw) => {
                tracing::warn!(token = %raw, "Unrecognized action token");
                Reply::text("Sorry, I didn't understand that. Please use the menu.").with_menu()
            }
        }
    }

    async fn start(&self, user_id: i64) -> Reply {
        self.sessions.set_state(user_id, ConversationState::Idle).await;
        self.sessions.clear_pending(user_id).await;

        Reply::text("Hello! Search for a movie or TV show and keep a watchlist of what to watch next.")
            .with_menu()
    }

    async fn on_text(&self, user_id: i64, text: &str) -> Reply {
        if text == MENU_SEARCH {
            return self.begin_search(user_id).await;
        }
        if text == MENU_WATCHLIST {
            self.sessions.set_state(user_id, ConversationState::Idle).await;
            return self.show_watchlist(user_id).await;
        }

        match self.sessions.take_state(user_id).await {
            ConversationState::AwaitingSearch => self.run_search(user_id, text).await,
            ConversationState::Idle => {
                Reply::text(format!("Use the menu: tap \"{}\" to look up a title.", MENU_SEARCH))
                    .with_menu()
            }
        }
    }

    async fn on_action(&self, user_id: i64, action: Action) -> Reply {
        match action {
            Action::ReenterSearch => self.begin_search(user_id).await,
            Action::ChooseIndex(index) => self.choose(user_id, index).await,
            Action::AddByCatalogId(movie_id) => match self.watchlist.find_movie(movie_id).await {
                Lookup::Found(movie) => self.add(user_id, &movie).await,
                Lookup::NotFound => Reply::text("Movie not found.").with_menu(),
                Lookup::Failed => Reply::something_went_wrong(),
            },
            Action::AddEphemeral { title, year } => {
                let candidate = self
                    .sessions
                    .pending_match(user_id, &title, &year)
                    .await
                    .unwrap_or(SearchResult {
                        title,
                        year,
                        rating: 0.0,
                        poster_url: None,
                    });

                match self.watchlist.create_or_find_entry(&candidate).await {
                    Lookup::Found(movie) => self.add(user_id, &movie).await,
                    Lookup::NotFound | Lookup::Failed => Reply::something_went_wrong(),
                }
            }
            Action::ShowById(movie_id) => match self.watchlist.find_movie(movie_id).await {
                Lookup::Found(movie) => Reply::movie_card(&movie).with_button(Button::new(
                    "Remove from watchlist",
                    Action::RemoveById(movie.id),
                )),
                Lookup::NotFound => Reply::text("Movie not found.").with_menu(),
                Lookup::Failed => Reply::something_went_wrong(),
            },
            Action::RemoveById(movie_id) => {
                match self.watchlist.remove_from_watchlist(user_id, movie_id).await {
                    RemoveOutcome::Removed => {
                        Reply::text("🗑 Removed from your watchlist.").with_menu()
                    }
                    RemoveOutcome::NotFound => {
                        Reply::text("That title is not in your watchlist.").with_menu()
                    }
                    RemoveOutcome::Failed => Reply::something_went_wrong(),
                }
            }
        }
    }

    async fn begin_search(&self, user_id: i64) -> Reply {
        self.sessions
            .set_state(user_id, ConversationState::AwaitingSearch)
            .await;

        Reply::text("Send me a title, optionally followed by a year (e.g. \"Dune 2021\").")
    }

    async fn run_search(&self, user_id: i64, text: &str) -> Reply {
        let Some(query) = SearchQuery::parse(text) else {
            self.sessions
                .set_state(user_id, ConversationState::AwaitingSearch)
                .await;
            return Reply::text("Please send a movie or show title.");
        };

        let outcome = self.search.search(&query.title, query.year).await;
        if outcome.is_degraded() {
            tracing::warn!(failed = ?outcome.failed, "Search answered with partial results");
        }

        if outcome.results.is_empty() {
            self.sessions.clear_pending(user_id).await;
            return Reply::text("Nothing found. Try another title.")
                .with_button(Button::new("Search again", Action::ReenterSearch))
                .with_menu();
        }

        let mut text = String::from("Here is what I found:");
        for (i, result) in outcome.results.iter().enumerate() {
            text.push_str(&format!(
                "\n{}. {} ({}) ⭐ {}",
                i + 1,
                result.title,
                result.year,
                format_rating(Some(result.rating))
            ));
        }
        let buttons: Vec<Button> = (0..outcome.results.len())
            .map(|i| Button::new((i + 1).to_string(), Action::ChooseIndex(i)))
            .collect();

        self.sessions.replace_pending(user_id, outcome.results).await;

        Reply::text(text).with_buttons(buttons)
    }

    async fn choose(&self, user_id: i64, index: usize) -> Reply {
        let Some(candidate) = self.sessions.pending_choice(user_id, index).await else {
            tracing::debug!(index, "Choice not in pending results");
            return Reply::text("That result is no longer available. Please search again.")
                .with_button(Button::new("Search again", Action::ReenterSearch))
                .with_menu();
        };

        match self.watchlist.create_or_find_entry(&candidate).await {
            Lookup::Found(movie) => {
                self.sessions.clear_pending(user_id).await;
                Reply::movie_card(&movie)
                    .with_button(Button::new("Add to watchlist", Action::AddByCatalogId(movie.id)))
            }
            Lookup::NotFound | Lookup::Failed => Reply::something_went_wrong(),
        }
    }

    async fn add(&self, user_id: i64, movie: &Movie) -> Reply {
        let text = match self.watchlist.add_to_watchlist(user_id, movie).await {
            AddOutcome::Added => format!("✅ {} ({}) added to your watchlist.", movie.title, movie.year),
            AddOutcome::AlreadyPresent => {
                format!("{} ({}) is already in your watchlist.", movie.title, movie.year)
            }
            AddOutcome::Failed => return Reply::something_went_wrong(),
        };

        Reply::text(text).with_button(Button::new("Search another", Action::ReenterSearch))
    }

    async fn show_watchlist(&self, user_id: i64) -> Reply {
        match self.watchlist.get_watchlist(user_id).await {
            WatchlistView::Items(movies) => {
                let buttons = movies.iter().map(|movie| {
                    Button::new(
                        format!("{} ({})", movie.title, movie.year),
                        Action::ShowById(movie.id),
                    )
                });
                Reply::text(format!("Your watchlist ({}):", movies.len())).with_buttons(buttons)
            }
            WatchlistView::Empty => Reply::text("Your watchlist is empty.").with_menu(),
            WatchlistView::Unavailable => Reply::something_went_wrong(),
        }
    }
}
