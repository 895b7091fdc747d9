//! Replace-all catalog refresh: fetch the feed, purge the store, load the snapshot.
//!
//! The purge and the load are two separate store calls. A failed purge leaves
//! the catalog untouched; a failed load after a successful purge leaves it
//! empty. Nothing here compensates for the second case and nothing guards
//! against two runs overlapping; callers schedule one run at a time and
//! re-trigger on failure.

use std::sync::Arc;

use shelf_db::{CatalogStore, Filter, NewBook, StoreError};
use thiserror::Error;

use super::feed::{FeedError, FeedSource};

/// Matches every row: rankings are never negative.
const PURGE_ALL: Filter = Filter::RankingAtLeast(0);

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("{0}")]
    Configuration(String),

    #[error("{0}")]
    UpstreamFetch(FeedError),

    #[error("failed to clear catalog: {0}")]
    StorePurge(StoreError),

    #[error("failed to load catalog (catalog is now empty): {0}")]
    StoreLoad(StoreError),

    #[error("sync run aborted: {0}")]
    Aborted(String),
}

impl From<FeedError> for SyncError {
    fn from(err: FeedError) -> Self {
        match err {
            FeedError::MissingCredential => SyncError::Configuration(err.to_string()),
            other => SyncError::UpstreamFetch(other),
        }
    }
}

impl SyncError {
    /// Whether the catalog may have changed before the run failed.
    pub fn catalog_touched(&self) -> bool {
        matches!(self, SyncError::StoreLoad(_) | SyncError::Aborted(_))
    }
}

/// Outcome of a successful sync run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncReport {
    pub purged: usize,
    pub inserted: usize,
}

impl SyncReport {
    pub fn message(&self) -> String {
        format!("Successfully inserted {} books.", self.inserted)
    }
}

#[derive(Clone)]
pub struct CatalogSync {
    store: Arc<dyn CatalogStore>,
    feed: Arc<dyn FeedSource>,
}

impl CatalogSync {
    pub fn new(store: Arc<dyn CatalogStore>, feed: Arc<dyn FeedSource>) -> Self {
        Self { store, feed }
    }

    /// Like [`run`](Self::run), on a task of its own. Dropping the returned
    /// future does not cancel the run; purge and load still complete.
    pub async fn run_detached(&self) -> Result<SyncReport, SyncError> {
        let job = self.clone();
        tokio::spawn(async move { job.run().await })
            .await
            .map_err(|err| SyncError::Aborted(err.to_string()))?
    }

    pub async fn run(&self) -> Result<SyncReport, SyncError> {
        let items = self.feed.fetch().await?;
        let books: Vec<_> = items
            .into_iter()
            .map(|item| item.into_new_book())
            .collect();
        check_snapshot(&books)?;
        let fetched = books.len();

        let purged = self
            .store
            .delete(&PURGE_ALL)
            .await
            .map_err(SyncError::StorePurge)?;
        tracing::info!(
            target: "shelf::sync",
            backend = self.store.backend(),
            purged,
            fetched,
            "catalog purged"
        );

        let inserted = self
            .store
            .insert(books)
            .await
            .map_err(SyncError::StoreLoad)?
            .len();

        tracing::info!(target: "shelf::sync", purged, inserted, "catalog sync complete");
        Ok(SyncReport { purged, inserted })
    }
}

/// Every record must be storable before the purge runs.
fn check_snapshot(books: &[NewBook]) -> Result<(), SyncError> {
    for book in books {
        let invalid = book.invalid_fields();
        if !invalid.is_empty() {
            let reason = invalid
                .iter()
                .map(|(field, error)| format!("{} {}", field, error))
                .collect::<Vec<_>>()
                .join(", ");
            return Err(SyncError::UpstreamFetch(FeedError::InvalidItem {
                rank: book.ranking,
                reason,
            }));
        }
    }
    Ok(())
}
