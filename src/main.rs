use anyhow::Context;
use shelf_app::AppContext;
use shelf_kernel::{settings::Settings, InitCtx, ModuleRegistry};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().with_context(|| "failed to load shelf settings")?;
    shelf_telemetry::init(&settings.telemetry)?;

    tracing::info!(
        env = ?settings.environment,
        store = ?settings.store.backend,
        "shelf-app bootstrap starting"
    );

    let app = AppContext::from_settings(&settings)?;
    let mut registry = ModuleRegistry::new();
    shelf_app::modules::register_all(&mut registry, &app)?;

    let ctx = InitCtx {
        settings: &settings,
    };
    registry.init_all(&ctx).await?;
    registry.start_all(&ctx).await?;

    tracing::info!("shelf-app bootstrap complete");
    let served = shelf_http::start_server(&registry, &settings, shutdown_signal()).await;

    registry.stop_all().await?;
    served
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
