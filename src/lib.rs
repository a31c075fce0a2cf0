//! Library catalog application
//!
//! Wires the libris crates together: settings, storage, the books module and
//! the HTTP server.

use anyhow::Context;
use libris_db::Database;
use libris_kernel::{settings::Settings, InitCtx, ModuleRegistry};

pub mod modules;

/// Re-export commonly used types
pub use modules::*;

/// Open storage and register every module against it.
pub fn bootstrap(settings: &Settings) -> anyhow::Result<(Database, ModuleRegistry)> {
    let db = Database::connect(&settings.database).context("failed to open storage")?;

    let mut registry = ModuleRegistry::new();
    modules::register_all(&mut registry, &db).context("failed to register modules")?;

    Ok((db, registry))
}

/// Run the application until Ctrl-C.
pub async fn run(settings: Settings) -> anyhow::Result<()> {
    tracing::info!(
        env = ?settings.environment,
        backend = ?settings.database.backend,
        "libris bootstrap starting"
    );

    let (db, registry) = bootstrap(&settings)?;
    tracing::info!(
        backend = ?db.backend(),
        modules = registry.len(),
        "storage opened and modules registered"
    );
    let ctx = InitCtx {
        settings: &settings,
    };

    registry.init_all(&ctx).await?;
    registry.start_all(&ctx).await?;
    tracing::info!("libris bootstrap complete");

    let served =
        libris_http::start_server(&registry, &settings, libris_http::shutdown_signal()).await;

    registry.stop_all().await?;
    db.flush().await?;
    served
}
