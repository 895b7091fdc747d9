use serde::Serialize;
use shelf_db::{Book, BookId};

/// Cover shown for books that have none.
pub const PLACEHOLDER_COVER: &str = "https://placehold.jp/200x300.png?text=NoImage";

/// A book as presented on the public page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookCard {
    pub id: BookId,
    pub title: String,
    pub author: String,
    /// Falls back to [`PLACEHOLDER_COVER`].
    pub cover_image_url: String,
    pub synopsis: Option<String>,
    /// Omitted when the book has nowhere to buy it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub purchase_link: Option<String>,
    pub ranking: i32,
}

impl From<Book> for BookCard {
    fn from(book: Book) -> Self {
        Self {
            id: book.id,
            title: book.title,
            author: book.author,
            cover_image_url: book
                .cover_image_url
                .filter(|url| !url.trim().is_empty())
                .unwrap_or_else(|| PLACEHOLDER_COVER.to_string()),
            synopsis: book.synopsis,
            purchase_link: book.purchase_link.filter(|link| !link.trim().is_empty()),
            ranking: book.ranking,
        }
    }
}
