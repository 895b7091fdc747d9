//! Book catalog model and the stores that hold it.
//!
//! [`CatalogStore`] is the whole contract the service relies on: select,
//! bulk insert, update by id and delete by filter. Each call is atomic on its
//! own; nothing is transactional across calls.

pub mod memory;
pub mod models;
pub mod postgrest;

use async_trait::async_trait;
use thiserror::Error;

pub use memory::MemoryStore;
pub use models::{Book, BookId, NewBook, UNRANKED};
pub use postgrest::PostgrestStore;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("store rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("failed to decode store response: {0}")]
    Decode(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Row predicate understood by every store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    Id(BookId),
    /// `ranking >= n`. With `n = 0` this matches every row.
    RankingAtLeast(i32),
}

impl Filter {
    pub fn matches(&self, book: &Book) -> bool {
        match self {
            Filter::Id(id) => &book.id == id,
            Filter::RankingAtLeast(min) => book.ranking >= *min,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    /// Whatever order the store returns.
    #[default]
    Unordered,
    /// Best ranked first.
    RankingAscending,
}

/// Parameters of a `select` call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Select {
    pub filter: Option<Filter>,
    pub order: SortOrder,
}

impl Select {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn filtered(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn by_ranking(mut self) -> Self {
        self.order = SortOrder::RankingAscending;
        self
    }
}

#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Short backend name for logs.
    fn backend(&self) -> &'static str;

    async fn select(&self, query: &Select) -> Result<Vec<Book>, StoreError>;

    /// Insert every record in one call and return them as stored.
    async fn insert(&self, books: Vec<NewBook>) -> Result<Vec<Book>, StoreError>;

    /// Replace the fields of the record with `id`. `None` when nothing matched.
    async fn update(&self, id: &BookId, book: NewBook) -> Result<Option<Book>, StoreError>;

    /// Delete all matching rows and return how many matched. Matching nothing is not an error.
    async fn delete(&self, filter: &Filter) -> Result<usize, StoreError>;
}
