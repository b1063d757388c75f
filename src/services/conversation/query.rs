/// A free-text search request: `<title> [<4-digit year>]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub title: String,
    pub year: Option<u16>,
}

impl SearchQuery {
    /// Splits a trailing four-digit year off the title
    ///
    /// Anything that is not exactly four ASCII digits stays part of the
    /// title, and a lone year is read as a title ("1917"). Returns `None`
    /// for blank input.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        if let Some((head, tail)) = text.rsplit_once(char::is_whitespace) {
            let head = head.trim_end();
            if !head.is_empty() && tail.len() == 4 && tail.bytes().all(|b| b.is_ascii_digit()) {
                if let Ok(year) = tail.parse() {
                    return Some(Self {
                        title: head.to_string(),
                        year: Some(year),
                    });
                }
            }
        }

        Some(Self {
            title: text.to_string(),
            year: None,
        })
    }
}
