use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use shelf_authz::AdminAuth;
use shelf_db::{CatalogStore, MemoryStore, PostgrestStore};
use shelf_kernel::settings::{Settings, StoreBackend, StoreSettings};

use crate::modules::sync::{CatalogSync, FeedSource, RakutenFeed};

/// Long-lived dependencies shared by the modules. Built once at startup and
/// passed into each module's constructor.
#[derive(Clone)]
pub struct AppContext {
    pub store: Arc<dyn CatalogStore>,
    pub feed: Arc<dyn FeedSource>,
    pub auth: Arc<AdminAuth>,
}

impl AppContext {
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let store = build_store(&settings.store)?;
        let feed: Arc<dyn FeedSource> = Arc::new(
            RakutenFeed::new(&settings.feed).context("failed to build feed client")?,
        );
        let auth = Arc::new(AdminAuth::new(
            settings.admin.password.clone(),
            Duration::from_secs(settings.admin.session_ttl_secs),
        ));

        Ok(Self { store, feed, auth })
    }

    pub fn catalog_sync(&self) -> CatalogSync {
        CatalogSync::new(self.store.clone(), self.feed.clone())
    }
}

/// Store backend named by the settings. The PostgREST backend needs both store credentials.
pub fn build_store(settings: &StoreSettings) -> anyhow::Result<Arc<dyn CatalogStore>> {
    match settings.backend {
        StoreBackend::Memory => {
            tracing::warn!("using in-memory catalog store; contents are lost on exit");
            Ok(Arc::new(MemoryStore::new()))
        }
        StoreBackend::Postgrest => {
            let url = settings
                .url
                .as_deref()
                .filter(|url| !url.trim().is_empty())
                .context("store.url is required for the postgrest backend")?;
            let api_key = settings
                .api_key
                .as_deref()
                .filter(|key| !key.trim().is_empty())
                .context("store.api_key is required for the postgrest backend")?;

            let store = PostgrestStore::new(
                url,
                api_key,
                &settings.table,
                Duration::from_millis(settings.timeout_ms),
            )?;
            tracing::info!(
                table_url = store.table_url(),
                "using postgrest catalog store"
            );
            Ok(Arc::new(store))
        }
    }
}
