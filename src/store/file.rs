use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serenity::async_trait;
use tokio::sync::Mutex;

use crate::config::FileStoreConfig;
use crate::store::{CharacterStore, StoreError, StoreMetadata, StoreResult, SCHEMA_VERSION};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
struct CharacterData {
    characters: Vec<String>,
    metadata: FileMetadata,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
struct FileMetadata {
    last_updated: DateTime<Utc>,
    version: String,
    max_characters: usize,
}

impl CharacterData {
    fn empty(max_characters: usize) -> Self {
        CharacterData {
            characters: vec![],
            metadata: FileMetadata {
                last_updated: Utc::now(),
                version: SCHEMA_VERSION.to_string(),
                max_characters,
            },
        }
    }
}

/// Characters kept in a pretty-printed JSON document.
pub struct JsonFileStore {
    path: PathBuf,
    // Serializes read-modify-write cycles on the file.
    lock: Mutex<()>,
}

impl JsonFileStore {
    pub async fn open(config: &FileStoreConfig, max_characters: usize) -> StoreResult<Self> {
        let store = JsonFileStore { path: config.path.clone(), lock: Mutex::new(()) };

        if tokio::fs::try_exists(&store.path).await? {
            let data = store.read().await?;
            tracing::info!("Loaded {} characters from {}", data.characters.len(), store.path.display());
            store.apply_limit(data, max_characters).await?;
            return Ok(store);
        }

        if let Some(parent) = store.path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        match config.seed_path.as_deref().filter(|seed_path| seed_path.exists()) {
            Some(seed_path) => {
                let seed = tokio::fs::read_to_string(seed_path).await?;
                let data: CharacterData = serde_json::from_str(&seed)?;
                store.write(&data).await?;
                tracing::info!("Seeded {} from {}", store.path.display(), seed_path.display());
                store.apply_limit(data, max_characters).await?;
            }
            None => {
                store.write(&CharacterData::empty(max_characters)).await?;
                tracing::info!("Created empty character file at {}", store.path.display());
            }
        }

        Ok(store)
    }

    /// The configured limit replaces whatever the file carries.
    async fn apply_limit(&self, mut data: CharacterData, max_characters: usize) -> StoreResult<()> {
        if data.metadata.max_characters == max_characters {
            return Ok(());
        }
        tracing::info!("Character limit changed from {} to {}", data.metadata.max_characters, max_characters);
        data.metadata.max_characters = max_characters;
        self.save(data).await
    }

    async fn read(&self) -> StoreResult<CharacterData> {
        let contents = tokio::fs::read_to_string(&self.path).await?;
        Ok(serde_json::from_str(&contents)?)
    }

    async fn write(&self, data: &CharacterData) -> StoreResult<()> {
        let contents = serde_json::to_string_pretty(data)?;
        let tmp_path = tmp_path_for(&self.path);
        tokio::fs::write(&tmp_path, contents).await?;
        tokio::fs::rename(&tmp_path, &self.path).await?;
        Ok(())
    }

    async fn save(&self, mut data: CharacterData) -> StoreResult<()> {
        data.metadata.last_updated = Utc::now();
        self.write(&data).await
    }
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut file_name = path.file_name().map(|name| name.to_os_string()).unwrap_or_default();
    file_name.push(".tmp");
    path.with_file_name(file_name)
}

#[async_trait]
impl CharacterStore for JsonFileStore {
    fn backend_name(&self) -> &'static str {
        "file"
    }

    async fn list(&self) -> StoreResult<Vec<String>> {
        let _guard = self.lock.lock().await;
        Ok(self.read().await?.characters)
    }

    async fn add(&self, name: &str) -> StoreResult<()> {
        let _guard = self.lock.lock().await;
        let mut data = self.read().await?;

        if data.characters.iter().any(|existing| existing == name) {
            return Err(StoreError::AlreadyExists(name.to_string()));
        }
        if data.characters.len() >= data.metadata.max_characters {
            return Err(StoreError::LimitReached(data.metadata.max_characters));
        }

        data.characters.push(name.to_string());
        self.save(data).await?;
        tracing::info!("Character added: {}", name);
        Ok(())
    }

    async fn remove(&self, name: &str) -> StoreResult<()> {
        let _guard = self.lock.lock().await;
        let mut data = self.read().await?;

        let index = data.characters.iter().position(|existing| existing == name).ok_or_else(|| StoreError::NotFound(name.to_string()))?;

        data.characters.remove(index);
        self.save(data).await?;
        tracing::info!("Character removed: {}", name);
        Ok(())
    }

    async fn metadata(&self) -> StoreResult<StoreMetadata> {
        let _guard = self.lock.lock().await;
        let metadata = self.read().await?.metadata;
        Ok(StoreMetadata {
            version: metadata.version,
            max_characters: metadata.max_characters,
            last_updated: metadata.last_updated,
        })
    }

    async fn health_check(&self) -> bool {
        let _guard = self.lock.lock().await;
        match self.read().await {
            Ok(_) => true,
            Err(e) => {
                tracing::error!("File store health check failed: {}", e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    static NEXT_DIR: AtomicUsize = AtomicUsize::new(0);

    fn scratch_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("character-store-{}-{}", std::process::id(), NEXT_DIR.fetch_add(1, Ordering::SeqCst)));
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }

    fn config_in(dir: &Path) -> FileStoreConfig {
        FileStoreConfig { path: dir.join("data").join("characters.json"), seed_path: None }
    }

    #[tokio::test]
    async fn creates_an_empty_file_on_first_open() {
        let dir = scratch_dir();
        let config = config_in(&dir);
        let store = JsonFileStore::open(&config, 25).await.unwrap();

        assert!(config.path.exists());
        assert!(store.list().await.unwrap().is_empty());
        let metadata = store.metadata().await.unwrap();
        assert_eq!(metadata.max_characters, 25);
        assert_eq!(metadata.version, SCHEMA_VERSION);
        assert!(store.health_check().await);
    }

    #[tokio::test]
    async fn keeps_insertion_order_and_persists() {
        let dir = scratch_dir();
        let config = config_in(&dir);
        let store = JsonFileStore::open(&config, 25).await.unwrap();
        for name in ["Ryu", "Ken", "Chun-Li"] {
            store.add(name).await.unwrap();
        }
        store.remove("Ken").await.unwrap();

        let reopened = JsonFileStore::open(&config, 25).await.unwrap();
        assert_eq!(reopened.list().await.unwrap(), vec!["Ryu", "Chun-Li"]);
    }

    #[tokio::test]
    async fn rejects_duplicates_missing_names_and_overflow() {
        let dir = scratch_dir();
        let store = JsonFileStore::open(&config_in(&dir), 2).await.unwrap();
        store.add("Ryu").await.unwrap();

        assert!(matches!(store.add("Ryu").await, Err(StoreError::AlreadyExists(name)) if name == "Ryu"));
        // Case-sensitive
        store.add("ryu").await.unwrap();
        assert!(matches!(store.add("Ken").await, Err(StoreError::LimitReached(2))));
        assert!(matches!(store.remove("Zangief").await, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn seeds_from_the_seed_file() {
        let dir = scratch_dir();
        std::fs::create_dir_all(&dir).unwrap();
        let seed_path = dir.join("seed.json");
        std::fs::write(
            &seed_path,
            r#"{"characters":["春麗","リュウ"],"metadata":{"lastUpdated":"2024-01-01T00:00:00Z","version":"1.0","maxCharacters":30}}"#,
        )
        .unwrap();

        let config = FileStoreConfig { path: dir.join("characters.json"), seed_path: Some(seed_path) };
        let store = JsonFileStore::open(&config, 25).await.unwrap();

        assert_eq!(store.list().await.unwrap(), vec!["春麗", "リュウ"]);
        assert_eq!(store.metadata().await.unwrap().max_characters, 25);
    }

    #[tokio::test]
    async fn reopening_applies_the_configured_limit() {
        let dir = scratch_dir();
        let config = config_in(&dir);
        let store = JsonFileStore::open(&config, 2).await.unwrap();
        store.add("Ryu").await.unwrap();
        store.add("Ken").await.unwrap();
        assert!(matches!(store.add("Chun-Li").await, Err(StoreError::LimitReached(2))));

        let reopened = JsonFileStore::open(&config, 40).await.unwrap();
        assert_eq!(reopened.metadata().await.unwrap().max_characters, 40);
        reopened.add("Chun-Li").await.unwrap();
        assert_eq!(reopened.list().await.unwrap(), vec!["Ryu", "Ken", "Chun-Li"]);
    }

    #[tokio::test]
    async fn malformed_file_is_unavailable() {
        let dir = scratch_dir();
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("characters.json");
        std::fs::write(&path, "not json").unwrap();

        let result = JsonFileStore::open(&FileStoreConfig { path, seed_path: None }, 25).await;
        assert!(matches!(result, Err(StoreError::Unavailable(_))));
    }
}
