use async_trait::async_trait;
use axum::Router;

/// Context provided to modules during initialization and start.
///
/// Long-lived dependencies (store, feed client, sessions) are handed to each
/// module's constructor instead; the context only carries what every module
/// may read.
pub struct InitCtx<'a> {
    pub settings: &'a crate::settings::Settings,
}

/// SQL migration contributed by a module.
#[derive(Debug, Clone)]
pub struct Migration {
    pub id: &'static str,
    pub up: &'static str,
}

/// Lifecycle contract for a domain area of the service.
#[async_trait]
pub trait Module: Sync + Send {
    /// Unique name for this module, also its route prefix.
    fn name(&self) -> &'static str;

    /// Called during application startup, before any module is started.
    async fn init(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    /// Routes are mounted under `/api/{module_name}`.
    fn routes(&self) -> Router {
        Router::new()
    }

    /// Whether the server request timeout wraps this module's routes. A module
    /// that opts out bounds its own work.
    fn request_timeout(&self) -> bool {
        true
    }

    /// OpenAPI fragment (`paths` and `components`) merged into the service document.
    fn openapi(&self) -> Option<serde_json::Value> {
        None
    }

    /// Migrations are applied in the order returned.
    fn migrations(&self) -> Vec<Migration> {
        vec![]
    }

    /// Start background tasks for this module.
    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    /// Stop background tasks; called during shutdown.
    async fn stop(&self) -> anyhow::Result<()> {
        Ok(())
    }
}
