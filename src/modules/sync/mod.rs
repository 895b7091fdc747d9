pub mod feed;
pub mod job;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    extract::State,
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Json, Router,
};
use serde_json::json;
use shelf_kernel::{InitCtx, Module};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

pub use feed::{FeedItem, FeedSource, RakutenFeed};
pub use job::{CatalogSync, SyncError, SyncReport};

const ALLOW_HEADERS: &str = "authorization, x-client-info, apikey, content-type";

/// Catalog refresh from the ranking feed, over HTTP and on a schedule.
pub struct SyncModule {
    job: CatalogSync,
    scheduler: Mutex<Option<JoinHandle<()>>>,
}

impl SyncModule {
    pub fn new(job: CatalogSync) -> Self {
        Self {
            job,
            scheduler: Mutex::new(None),
        }
    }

    fn scheduler(&self) -> std::sync::MutexGuard<'_, Option<JoinHandle<()>>> {
        self.scheduler
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl Module for SyncModule {
    fn name(&self) -> &'static str {
        "sync"
    }

    /// A run is bounded by the feed and store client timeouts; cutting the
    /// request short would drop the error contract.
    fn request_timeout(&self) -> bool {
        false
    }

    fn routes(&self) -> Router {
        Router::new()
            .route("/", any(trigger_sync))
            .with_state(self.job.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        Some(json!({
            "paths": {
                "/": {
                    "post": {
                        "summary": "Replace the catalog with the current ranking feed",
                        "description": concat!(
                            "Any method except OPTIONS runs one sync. The catalog is purged ",
                            "before it is reloaded; a load failure leaves it empty."
                        ),
                        "tags": ["Sync"],
                        "responses": {
                            "200": {
                                "description": "Catalog replaced",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/SyncSuccess" }
                                    }
                                }
                            },
                            "500": {
                                "description": "Sync failed",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/SyncFailure" }
                                    }
                                }
                            }
                        }
                    }
                }
            },
            "components": {
                "schemas": {
                    "SyncSuccess": {
                        "type": "object",
                        "properties": { "message": { "type": "string" } },
                        "required": ["message"]
                    },
                    "SyncFailure": {
                        "type": "object",
                        "properties": { "error": { "type": "string" } },
                        "required": ["error"]
                    }
                }
            }
        }))
    }

    async fn start(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        let Some(secs) = ctx.settings.sync.interval_secs else {
            tracing::info!(module = self.name(), "scheduled sync disabled");
            return Ok(());
        };
        anyhow::ensure!(secs > 0, "sync.interval_secs must be positive");

        let period = Duration::from_secs(secs);
        let handle = tokio::spawn(run_schedule(self.job.clone(), period));
        if let Some(previous) = self.scheduler().replace(handle) {
            previous.abort();
        }

        tracing::info!(
            module = self.name(),
            interval_secs = secs,
            "scheduled sync started"
        );
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        if let Some(handle) = self.scheduler().take() {
            handle.abort();
            tracing::info!(module = self.name(), "scheduled sync stopped");
        }
        Ok(())
    }
}

/// Runs the job once per `period`, first after one full period. Each run is
/// awaited before the next tick, so scheduled runs never overlap each other.
/// Aborting this task leaves an in-flight run to finish.
async fn run_schedule(job: CatalogSync, period: Duration) {
    let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        match job.run_detached().await {
            Ok(report) => {
                tracing::info!(
                    target: "shelf::sync",
                    inserted = report.inserted,
                    "scheduled sync succeeded"
                )
            }
            Err(err) => {
                tracing::error!(target: "shelf::sync", error = %err, "scheduled sync failed")
            }
        }
    }
}

/// Response of the sync trigger.
pub enum SyncResponse {
    Preflight,
    Done(SyncReport),
    Failed(SyncError),
}

impl IntoResponse for SyncResponse {
    fn into_response(self) -> Response {
        let mut response = match self {
            SyncResponse::Preflight => (StatusCode::OK, "ok").into_response(),
            SyncResponse::Done(report) => {
                (StatusCode::OK, Json(json!({ "message": report.message() }))).into_response()
            }
            SyncResponse::Failed(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": err.to_string() })),
            )
                .into_response(),
        };

        let headers = response.headers_mut();
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        );
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static(ALLOW_HEADERS),
        );
        response
    }
}

async fn trigger_sync(State(job): State<CatalogSync>, method: Method) -> SyncResponse {
    if method == Method::OPTIONS {
        return SyncResponse::Preflight;
    }

    match job.run_detached().await {
        Ok(report) => SyncResponse::Done(report),
        Err(err) => {
            tracing::error!(
                target: "shelf::sync",
                error = %err,
                catalog_touched = err.catalog_touched(),
                "sync failed"
            );
            SyncResponse::Failed(err)
        }
    }
}

/// Create the sync module around an already wired job.
pub fn create_module(job: CatalogSync) -> Arc<dyn Module> {
    Arc::new(SyncModule::new(job))
}
