use std::path::PathBuf;
use std::sync::Arc;

use clap::ValueEnum;
use gh_core::{Result, StoryStorage};
use serde::{Deserialize, Serialize};

pub mod backends;

pub use backends::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    #[default]
    Memory,
    Sqlite,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StorageConfig {
    pub kind: StorageKind,
    /// Only read by the sqlite backend.
    pub database_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            kind: StorageKind::Memory,
            database_path: PathBuf::from("glasshouse.db"),
        }
    }
}

#[cfg(feature = "sqlite")]
pub async fn create_storage(config: &StorageConfig) -> Result<Arc<dyn StoryStorage>> {
    match config.kind {
        StorageKind::Memory => Ok(Arc::new(MemoryStorage::new())),
        StorageKind::Sqlite => Ok(Arc::new(SqliteStorage::new_with_path(&config.database_path).await?)),
    }
}

#[cfg(not(feature = "sqlite"))]
pub async fn create_storage(config: &StorageConfig) -> Result<Arc<dyn StoryStorage>> {
    match config.kind {
        StorageKind::Memory => Ok(Arc::new(MemoryStorage::new())),
        StorageKind::Sqlite => Err(gh_core::Error::Storage(
            "this build does not include the sqlite backend (enable the `sqlite` feature)".to_string(),
        )),
    }
}

pub mod prelude {
    pub use super::backends::*;
    pub use super::{create_storage, StorageConfig, StorageKind};
}
