use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

/// Something the user can tap
///
/// Encoded as a compact token (see [`Display`] and [`FromStr`]) so it fits in
/// a chat transport's callback payload:
///
/// | action | token |
/// |---|---|
/// | `AddByCatalogId(12)` | `add:12` |
/// | `AddEphemeral { title: "Dune", year: "2021" }` | `add_new:2021:Dune` |
/// | `ShowById(12)` | `show:12` |
/// | `RemoveById(12)` | `remove:12` |
/// | `ChooseIndex(3)` | `choose:3` |
/// | `ReenterSearch` | `next` |
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Action {
    AddByCatalogId(i64),
    /// Add a title that may not be in the catalog yet
    AddEphemeral { title: String, year: String },
    ShowById(i64),
    RemoveById(i64),
    /// Zero-based position in the user's pending search results
    ChooseIndex(usize),
    ReenterSearch,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("Unrecognized action token: {0}")]
pub struct ActionParseError(pub String);

impl Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Action::AddByCatalogId(id) => write!(f, "add:{}", id),
            Action::AddEphemeral { title, year } => write!(f, "add_new:{}:{}", year, title),
            Action::ShowById(id) => write!(f, "show:{}", id),
            Action::RemoveById(id) => write!(f, "remove:{}", id),
            Action::ChooseIndex(index) => write!(f, "choose:{}", index),
            Action::ReenterSearch => write!(f, "next"),
        }
    }
}

impl FromStr for Action {
    type Err = ActionParseError;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        let invalid = || ActionParseError(token.to_string());

        if token == "next" {
            return Ok(Action::ReenterSearch);
        }

        let (kind, payload) = token.split_once(':').ok_or_else(invalid)?;
        match kind {
            "add" => payload.parse().map(Action::AddByCatalogId).map_err(|_| invalid()),
            "show" => payload.parse().map(Action::ShowById).map_err(|_| invalid()),
            "remove" => payload.parse().map(Action::RemoveById).map_err(|_| invalid()),
            "choose" => payload.parse().map(Action::ChooseIndex).map_err(|_| invalid()),
            "add_new" => {
                // year first: titles may contain ':'
                let (year, title) = payload.split_once(':').ok_or_else(invalid)?;
                if year.is_empty() || title.trim().is_empty() {
                    return Err(invalid());
                }
                Ok(Action::AddEphemeral {
                    title: title.to_string(),
                    year: year.to_string(),
                })
            }
            _ => Err(invalid()),
        }
    }
}

impl From<Action> for String {
    fn from(action: Action) -> Self {
        action.to_string()
    }
}

impl TryFrom<String> for Action {
    type Error = ActionParseError;

    fn try_from(token: String) -> Result<Self, Self::Error> {
        token.parse()
    }
}
