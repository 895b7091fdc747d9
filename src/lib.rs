//! Shelf application library
//!
//! Domain modules (public book picks, catalog administration, ranking feed
//! sync) and the wiring that builds them from settings.

pub mod context;
pub mod modules;

pub use context::AppContext;
pub use modules::*;
