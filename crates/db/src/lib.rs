//! Storage engine factory for libris.
//!
//! Opens whichever engine `DatabaseSettings` selects. Modules receive the
//! resulting [`Database`] and lay out their own trees on top of it.

use anyhow::Context;
use libris_kernel::settings::{DatabaseSettings, StorageBackend};

/// Handle to the configured storage engine.
#[derive(Clone)]
pub enum Database {
    /// No engine; modules keep their state in process memory.
    Memory,
    /// Embedded sled database.
    Sled(sled::Db),
}

impl Database {
    /// Open the engine described by `settings`.
    pub fn connect(settings: &DatabaseSettings) -> anyhow::Result<Self> {
        match settings.backend {
            StorageBackend::Memory => {
                tracing::info!(target: "libris-db", "using in-memory storage");
                Ok(Database::Memory)
            }
            StorageBackend::Sled => {
                let config = if settings.temporary {
                    sled::Config::new().temporary(true)
                } else {
                    sled::Config::new().path(&settings.path)
                };

                let db = config
                    .open()
                    .with_context(|| format!("failed to open sled database at '{}'", settings.path))?;

                tracing::info!(
                    target: "libris-db",
                    path = %settings.path,
                    temporary = settings.temporary,
                    recovered = db.was_recovered(),
                    "sled database opened"
                );
                Ok(Database::Sled(db))
            }
        }
    }

    /// Open a throwaway sled database, removed when the last handle drops.
    pub fn temporary() -> anyhow::Result<Self> {
        let db = sled::Config::new()
            .temporary(true)
            .open()
            .context("failed to open temporary sled database")?;
        Ok(Database::Sled(db))
    }

    pub fn backend(&self) -> StorageBackend {
        match self {
            Database::Memory => StorageBackend::Memory,
            Database::Sled(_) => StorageBackend::Sled,
        }
    }

    /// Flush pending writes to disk. A no-op for the in-memory engine.
    pub async fn flush(&self) -> anyhow::Result<()> {
        if let Database::Sled(db) = self {
            let bytes = db
                .flush_async()
                .await
                .context("failed to flush sled database")?;
            tracing::debug!(target: "libris-db", bytes, "sled database flushed");
        }
        Ok(())
    }
}
