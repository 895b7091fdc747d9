pub mod admin;
pub mod books;
pub mod sync;

use shelf_kernel::ModuleRegistry;

use crate::context::AppContext;

/// Register all project modules with the registry, wired from `ctx`.
pub fn register_all(registry: &mut ModuleRegistry, ctx: &AppContext) -> anyhow::Result<()> {
    registry.register(books::create_module(ctx.store.clone()))?;
    registry.register(admin::create_module(ctx.store.clone(), ctx.auth.clone()))?;
    registry.register(sync::create_module(ctx.catalog_sync()))?;
    Ok(())
}
