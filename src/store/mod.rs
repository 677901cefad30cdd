use std::sync::Arc;

use chrono::{DateTime, Utc};
use serenity::async_trait;
use thiserror::Error;

use crate::config::{Backend, StorageConfig};

pub(crate) mod file;
pub(crate) mod sheets;
pub(crate) mod sqlite;

pub const SCHEMA_VERSION: &str = "1.0";

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("character \"{0}\" already exists")]
    AlreadyExists(String),
    #[error("character \"{0}\" was not found")]
    NotFound(String),
    #[error("the character limit ({0}) has been reached")]
    LimitReached(usize),
    #[error("character store unavailable: {0}")]
    Unavailable(String),
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        StoreError::Unavailable(e.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Unavailable(format!("malformed character data: {e}"))
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Unavailable(e.to_string())
    }
}

impl From<r2d2::Error> for StoreError {
    fn from(e: r2d2::Error) -> Self {
        StoreError::Unavailable(e.to_string())
    }
}

impl From<reqwest::Error> for StoreError {
    fn from(e: reqwest::Error) -> Self {
        StoreError::Unavailable(e.to_string())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct StoreMetadata {
    pub version: String,
    pub max_characters: usize,
    pub last_updated: DateTime<Utc>,
}

/// Ordered, admin-curated list of character names.
///
/// Implementations own uniqueness and the size limit; callers never retry.
#[async_trait]
pub trait CharacterStore: Send + Sync {
    fn backend_name(&self) -> &'static str;

    async fn list(&self) -> StoreResult<Vec<String>>;

    async fn add(&self, name: &str) -> StoreResult<()>;

    async fn remove(&self, name: &str) -> StoreResult<()>;

    async fn metadata(&self) -> StoreResult<StoreMetadata>;

    async fn health_check(&self) -> bool;
}

/// Opens the one backend selected in the config.
pub async fn open_store(config: &StorageConfig) -> StoreResult<Arc<dyn CharacterStore>> {
    let store: Arc<dyn CharacterStore> = match config.backend {
        Backend::File => {
            let file_config = config.file.as_ref().ok_or_else(|| StoreError::Unavailable("missing file store config".to_string()))?;
            Arc::new(file::JsonFileStore::open(file_config, config.max_characters).await?)
        }
        Backend::Sqlite => {
            let sqlite_config = config.sqlite.as_ref().ok_or_else(|| StoreError::Unavailable("missing sqlite store config".to_string()))?;
            Arc::new(sqlite::SqliteStore::open(&sqlite_config.path, config.max_characters)?)
        }
        Backend::Sheets => {
            let sheets_config = config.sheets.as_ref().ok_or_else(|| StoreError::Unavailable("missing sheets store config".to_string()))?;
            Arc::new(sheets::SheetsStore::open(sheets_config, config.max_characters).await?)
        }
    };

    tracing::info!("Opened {} character store", store.backend_name());
    Ok(store)
}
