pub mod channel;
pub mod config;
pub mod models;
pub mod runtime;
pub mod storage;

pub use indexbot_storage::paths;
pub use models::*;

use std::path::Path;
use std::sync::Arc;
use storage::Storage;
use tracing::info;

use config::BotConfig;

/// Application state shared by the bot daemon and the admin commands.
pub struct AppCore {
    pub storage: Arc<Storage>,
    pub config: BotConfig,
}

impl AppCore {
    pub fn new(db_path: &Path, index_dir: &Path, config: BotConfig) -> anyhow::Result<Self> {
        let storage = Arc::new(Storage::new(db_path, index_dir)?);

        let indexed = storage.entries.indexed_count()?;
        let stored = storage.entries.list()?.len() as u64;
        if indexed != stored {
            info!(
                "Keyword index out of sync ({} indexed, {} stored), rebuilding",
                indexed, stored
            );
            storage.entries.reindex()?;
        }

        info!("Initializing IndexBot ({} entries)", stored);

        Ok(Self { storage, config })
    }

    /// Open the database and index under the resolved data directory.
    pub fn open_default(config: BotConfig) -> anyhow::Result<Self> {
        Self::new(
            &paths::database_path()?,
            &paths::search_index_dir()?,
            config,
        )
    }
}
