use serde::{Deserialize, Serialize};

use super::Action;
use crate::models::Movie;

/// Persistent menu entries; tapping one sends its label as text
pub const MENU_SEARCH: &str = "Search movie";
pub const MENU_WATCHLIST: &str = "View watchlist";

/// An inline button bound to an [`Action`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Button {
    pub label: String,
    pub action: Action,
}

impl Button {
    pub fn new(label: impl Into<String>, action: Action) -> Self {
        Self {
            label: label.into(),
            action,
        }
    }
}

/// What the transport should render in response to one event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reply {
    pub text: String,
    /// Send as a photo with `text` as caption when set
    pub photo_url: Option<String>,
    pub buttons: Vec<Button>,
    /// Re-show the persistent menu ([`MENU_SEARCH`], [`MENU_WATCHLIST`])
    pub show_menu: bool,
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            photo_url: None,
            buttons: Vec::new(),
            show_menu: false,
        }
    }

    pub fn with_photo(mut self, photo_url: Option<String>) -> Self {
        self.photo_url = photo_url;
        self
    }

    pub fn with_button(mut self, button: Button) -> Self {
        self.buttons.push(button);
        self
    }

    pub fn with_buttons(mut self, buttons: impl IntoIterator<Item = Button>) -> Self {
        self.buttons.extend(buttons);
        self
    }

    pub fn with_menu(mut self) -> Self {
        self.show_menu = true;
        self
    }

    pub fn something_went_wrong() -> Self {
        Self::text("Something went wrong, please try again.").with_menu()
    }

    /// Photo card for a catalog entry
    pub fn movie_card(movie: &Movie) -> Self {
        Self::text(format!(
            "🎬 {} ({})\n⭐ Rating: {}",
            movie.title,
            movie.year,
            format_rating(movie.rating)
        ))
        .with_photo(movie.poster_url.clone())
    }
}

pub fn format_rating(rating: Option<f64>) -> String {
    match rating {
        Some(r) if r > 0.0 => format!("{:.1}", r),
        _ => "N/A".to_string(),
    }
}
