//! Process-local catalog store for tests and local runs.

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{Book, BookId, CatalogStore, Filter, NewBook, Select, SortOrder, StoreError};

#[derive(Default)]
struct Rows {
    next_id: u64,
    books: Vec<Book>,
}

impl Rows {
    fn assign_id(&mut self) -> BookId {
        self.next_id += 1;
        BookId::new(self.next_id.to_string())
    }
}

/// Keeps rows in insertion order. Identifiers are never reused, so ids
/// handed out before a purge do not resolve afterwards.
#[derive(Default)]
pub struct MemoryStore {
    rows: RwLock<Rows>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store already holding `books`.
    pub fn seeded(books: impl IntoIterator<Item = NewBook>) -> Self {
        let mut rows = Rows::default();
        for book in books {
            let id = rows.assign_id();
            rows.books.push(book.with_id(id));
        }
        Self {
            rows: RwLock::new(rows),
        }
    }

    /// Current contents, in insertion order.
    pub async fn snapshot(&self) -> Vec<Book> {
        self.rows.read().await.books.clone()
    }

    pub async fn len(&self) -> usize {
        self.rows.read().await.books.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn select(&self, query: &Select) -> Result<Vec<Book>, StoreError> {
        let rows = self.rows.read().await;
        let mut books: Vec<Book> = rows
            .books
            .iter()
            .filter(|book| query.filter.as_ref().map_or(true, |f| f.matches(book)))
            .cloned()
            .collect();

        if query.order == SortOrder::RankingAscending {
            books.sort_by_key(|book| book.ranking);
        }

        Ok(books)
    }

    async fn insert(&self, books: Vec<NewBook>) -> Result<Vec<Book>, StoreError> {
        let mut rows = self.rows.write().await;
        let mut stored = Vec::with_capacity(books.len());

        for book in books {
            let id = rows.assign_id();
            let book = book.with_id(id);
            rows.books.push(book.clone());
            stored.push(book);
        }

        Ok(stored)
    }

    async fn update(&self, id: &BookId, book: NewBook) -> Result<Option<Book>, StoreError> {
        let mut rows = self.rows.write().await;

        Ok(rows
            .books
            .iter_mut()
            .find(|existing| &existing.id == id)
            .map(|existing| {
                *existing = book.with_id(id.clone());
                existing.clone()
            }))
    }

    async fn delete(&self, filter: &Filter) -> Result<usize, StoreError> {
        let mut rows = self.rows.write().await;
        let before = rows.books.len();
        rows.books.retain(|book| !filter.matches(book));
        Ok(before - rows.books.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> MemoryStore {
        MemoryStore::seeded([
            NewBook::new("Third", "C", 3),
            NewBook::new("First", "A", 1),
            NewBook::new("Second", "B", 2),
        ])
    }

    #[tokio::test]
    async fn select_orders_by_ranking_when_asked() {
        let store = catalog();

        let unordered = store.select(&Select::all()).await.unwrap();
        assert_eq!(unordered[0].title, "Third");

        let ordered = store.select(&Select::all().by_ranking()).await.unwrap();
        let titles: Vec<_> = ordered.iter().map(|b| b.title.as_str()).collect();
        assert_eq!(titles, vec!["First", "Second", "Third"]);
    }

    #[tokio::test]
    async fn select_applies_filter() {
        let store = catalog();
        let books = store
            .select(&Select::all().filtered(Filter::RankingAtLeast(2)))
            .await
            .unwrap();
        assert_eq!(books.len(), 2);
    }

    #[tokio::test]
    async fn insert_assigns_fresh_ids() {
        let store = catalog();
        let stored = store
            .insert(vec![NewBook::new("Fourth", "D", 4)])
            .await
            .unwrap();

        assert_eq!(stored[0].id.as_str(), "4");
        assert_eq!(store.len().await, 4);
    }

    #[tokio::test]
    async fn ids_are_not_reused_after_purge() {
        let store = catalog();
        store.delete(&Filter::RankingAtLeast(0)).await.unwrap();
        let stored = store.insert(vec![NewBook::new("New", "N", 1)]).await.unwrap();

        assert_eq!(stored[0].id.as_str(), "4");
        assert!(store
            .update(&BookId::new("1"), NewBook::new("Old", "O", 1))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn update_replaces_fields_and_keeps_id() {
        let store = catalog();
        let mut edit = NewBook::new("Third, revised", "C", 9);
        edit.synopsis = Some("now with a synopsis".to_string());

        let updated = store
            .update(&BookId::new("1"), edit)
            .await
            .unwrap()
            .expect("row 1 exists");

        assert_eq!(updated.id.as_str(), "1");
        assert_eq!(updated.ranking, 9);
        assert_eq!(store.snapshot().await[0], updated);
    }

    #[tokio::test]
    async fn delete_of_unknown_id_matches_nothing() {
        let store = catalog();
        let deleted = store
            .delete(&Filter::Id(BookId::new("does-not-exist")))
            .await
            .unwrap();

        assert_eq!(deleted, 0);
        assert_eq!(store.len().await, 3);
    }

    #[tokio::test]
    async fn purge_predicate_empties_the_store() {
        let store = catalog();
        let deleted = store.delete(&Filter::RankingAtLeast(0)).await.unwrap();

        assert_eq!(deleted, 3);
        assert!(store.is_empty().await);
    }
}
