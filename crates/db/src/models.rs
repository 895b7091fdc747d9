use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Ranking given to books entered by hand, i.e. below the feed's top 50.
pub const UNRANKED: i32 = 51;

/// Store-assigned identifier. Opaque to the service; numeric ids coming from
/// the backend are carried as text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct BookId(String);

impl BookId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BookId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for BookId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Integer(i64),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Text(text) => BookId(text),
            Raw::Integer(n) => BookId(n.to_string()),
        })
    }
}

/// A catalog record as held by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    pub id: BookId,
    pub title: String,
    pub author: String,
    #[serde(default)]
    pub cover_image_url: Option<String>,
    #[serde(default)]
    pub synopsis: Option<String>,
    #[serde(default)]
    pub purchase_link: Option<String>,
    pub ranking: i32,
}

impl Book {
    /// Strip the identifier, e.g. to re-insert the record elsewhere.
    pub fn into_new(self) -> NewBook {
        NewBook {
            title: self.title,
            author: self.author,
            cover_image_url: self.cover_image_url,
            synopsis: self.synopsis,
            purchase_link: self.purchase_link,
            ranking: self.ranking,
        }
    }
}

/// Insert/update payload: a book without its store identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewBook {
    pub title: String,
    pub author: String,
    #[serde(default)]
    pub cover_image_url: Option<String>,
    #[serde(default)]
    pub synopsis: Option<String>,
    #[serde(default)]
    pub purchase_link: Option<String>,
    #[serde(default = "default_ranking")]
    pub ranking: i32,
}

fn default_ranking() -> i32 {
    UNRANKED
}

impl NewBook {
    pub fn new(title: impl Into<String>, author: impl Into<String>, ranking: i32) -> Self {
        Self {
            title: title.into(),
            author: author.into(),
            cover_image_url: None,
            synopsis: None,
            purchase_link: None,
            ranking,
        }
    }

    pub fn with_id(self, id: BookId) -> Book {
        Book {
            id,
            title: self.title,
            author: self.author,
            cover_image_url: self.cover_image_url,
            synopsis: self.synopsis,
            purchase_link: self.purchase_link,
            ranking: self.ranking,
        }
    }

    /// Fields that break the record invariants, with the reason. Empty when
    /// the record is valid.
    pub fn invalid_fields(&self) -> Vec<(&'static str, &'static str)> {
        let mut invalid = Vec::new();
        if self.title.trim().is_empty() {
            invalid.push(("title", "required"));
        }
        if self.author.trim().is_empty() {
            invalid.push(("author", "required"));
        }
        // Purges match `ranking >= 0`; a negative row would outlive every sync.
        if self.ranking < 0 {
            invalid.push(("ranking", "must not be negative"));
        }
        invalid
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn numeric_and_text_ids_both_decode() {
        let numeric: Book = serde_json::from_value(json!({
            "id": 42, "title": "A", "author": "X", "ranking": 1
        }))
        .unwrap();
        assert_eq!(numeric.id.as_str(), "42");

        let text: Book = serde_json::from_value(json!({
            "id": "0b6c", "title": "A", "author": "X", "ranking": 1,
            "cover_image_url": null
        }))
        .unwrap();
        assert_eq!(text.id, BookId::new("0b6c"));
        assert!(text.cover_image_url.is_none());
    }

    #[test]
    fn new_book_ranking_defaults_to_unranked() {
        let book: NewBook = serde_json::from_value(json!({
            "title": "Hand entered", "author": "Someone"
        }))
        .unwrap();
        assert_eq!(book.ranking, UNRANKED);
        assert_eq!(book.ranking, 51);
    }

    #[test]
    fn blank_title_and_author_are_reported() {
        let book = NewBook::new("  ", "", 3);
        assert_eq!(
            book.invalid_fields(),
            vec![("title", "required"), ("author", "required")]
        );
        assert!(NewBook::new("T", "A", 3).invalid_fields().is_empty());
    }

    #[test]
    fn negative_ranking_is_invalid() {
        assert_eq!(
            NewBook::new("T", "A", -1).invalid_fields(),
            vec![("ranking", "must not be negative")]
        );
        assert!(NewBook::new("T", "A", 0).invalid_fields().is_empty());
    }
}
