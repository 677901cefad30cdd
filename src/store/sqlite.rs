use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, OptionalExtension};
use serenity::async_trait;
use tokio::sync::Mutex;

use crate::store::{CharacterStore, StoreError, StoreMetadata, StoreResult, SCHEMA_VERSION};

const VERSION_KEY: &str = "version";
const MAX_CHARACTERS_KEY: &str = "max_characters";

/// Characters in a relational table; `UNIQUE(name)` backs the duplicate check when
/// two admins add at once.
pub struct SqliteStore {
    pool: Arc<Mutex<Pool<SqliteConnectionManager>>>,
}

impl SqliteStore {
    pub fn open(path: &Path, max_characters: usize) -> StoreResult<Self> {
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let pool = Pool::new(SqliteConnectionManager::file(path))?;
        Self::with_pool(pool, max_characters)
    }

    #[cfg(test)]
    pub fn in_memory(max_characters: usize) -> StoreResult<Self> {
        // Every in-memory connection is its own database, so keep exactly one.
        let pool = Pool::builder().max_size(1).build(SqliteConnectionManager::memory())?;
        Self::with_pool(pool, max_characters)
    }

    fn with_pool(pool: Pool<SqliteConnectionManager>, max_characters: usize) -> StoreResult<Self> {
        let conn = pool.get()?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS characters (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            created_at TEXT NOT NULL
        )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS metadata (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
            [],
        )?;

        let now = Utc::now().to_rfc3339();
        conn.execute("INSERT OR IGNORE INTO metadata (key, value, updated_at) VALUES (?1, ?2, ?3)", params![VERSION_KEY, SCHEMA_VERSION, now])?;
        // The configured limit always wins over the stored one.
        conn.execute(
            "INSERT INTO metadata (key, value, updated_at) VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            WHERE metadata.value != excluded.value",
            params![MAX_CHARACTERS_KEY, max_characters.to_string(), now],
        )?;

        let count: i64 = conn.query_row("SELECT COUNT(*) FROM characters", [], |row| row.get(0))?;
        tracing::info!("Database contains {} characters", count);

        drop(conn);
        Ok(SqliteStore { pool: Arc::new(Mutex::new(pool)) })
    }

    async fn connection(&self) -> StoreResult<PooledConnection<SqliteConnectionManager>> {
        let pool_guard = self.pool.lock().await;
        Ok(pool_guard.get()?)
    }
}

fn read_max_characters(conn: &rusqlite::Connection) -> StoreResult<usize> {
    let value: Option<String> = conn.query_row("SELECT value FROM metadata WHERE key = ?1", params![MAX_CHARACTERS_KEY], |row| row.get(0)).optional()?;
    let value = value.ok_or_else(|| StoreError::Unavailable("metadata is missing max_characters".to_string()))?;
    usize::from_str(&value).map_err(|e| StoreError::Unavailable(format!("bad max_characters {value:?}: {e}")))
}

fn is_unique_violation(e: &rusqlite::Error) -> bool {
    matches!(e, rusqlite::Error::SqliteFailure(err, _) if err.code == rusqlite::ErrorCode::ConstraintViolation)
}

#[async_trait]
impl CharacterStore for SqliteStore {
    fn backend_name(&self) -> &'static str {
        "sqlite"
    }

    async fn list(&self) -> StoreResult<Vec<String>> {
        let conn = self.connection().await?;
        let mut stmt = conn.prepare("SELECT name FROM characters ORDER BY id ASC")?;
        let names = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut characters = Vec::new();
        for name in names {
            characters.push(name?);
        }
        Ok(characters)
    }

    async fn add(&self, name: &str) -> StoreResult<()> {
        let mut conn = self.connection().await?;
        let tx = conn.transaction()?;

        let exists: bool = tx.query_row("SELECT EXISTS(SELECT 1 FROM characters WHERE name = ?1)", params![name], |row| row.get(0))?;
        if exists {
            return Err(StoreError::AlreadyExists(name.to_string()));
        }

        let count: i64 = tx.query_row("SELECT COUNT(*) FROM characters", [], |row| row.get(0))?;
        let max_characters = read_max_characters(&tx)?;
        if count as usize >= max_characters {
            return Err(StoreError::LimitReached(max_characters));
        }

        match tx.execute("INSERT INTO characters (name, created_at) VALUES (?1, ?2)", params![name, Utc::now().to_rfc3339()]) {
            Ok(_) => {}
            Err(e) if is_unique_violation(&e) => return Err(StoreError::AlreadyExists(name.to_string())),
            Err(e) => return Err(e.into()),
        }
        tx.commit()?;

        tracing::info!("Character added to database: {}", name);
        Ok(())
    }

    async fn remove(&self, name: &str) -> StoreResult<()> {
        let conn = self.connection().await?;
        let removed = conn.execute("DELETE FROM characters WHERE name = ?1", params![name])?;
        if removed == 0 {
            return Err(StoreError::NotFound(name.to_string()));
        }

        tracing::info!("Character removed from database: {}", name);
        Ok(())
    }

    async fn metadata(&self) -> StoreResult<StoreMetadata> {
        let conn = self.connection().await?;
        let mut stmt = conn.prepare("SELECT key, value, updated_at FROM metadata WHERE key IN (?1, ?2)")?;
        let rows = stmt.query_map(params![VERSION_KEY, MAX_CHARACTERS_KEY], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?, row.get::<_, String>(2)?)))?;

        let mut version = SCHEMA_VERSION.to_string();
        let mut max_characters = None;
        let mut last_updated: Option<DateTime<Utc>> = None;
        for row in rows {
            let (key, value, updated_at) = row?;
            match key.as_str() {
                VERSION_KEY => version = value,
                MAX_CHARACTERS_KEY => max_characters = value.parse().ok(),
                _ => {}
            }
            if let Ok(updated_at) = DateTime::parse_from_rfc3339(&updated_at) {
                let updated_at = updated_at.with_timezone(&Utc);
                last_updated = Some(last_updated.map_or(updated_at, |current| current.max(updated_at)));
            }
        }

        // Character edits count as updates too.
        let last_change: Option<String> = conn.query_row("SELECT MAX(created_at) FROM characters", [], |row| row.get(0))?;
        if let Some(Ok(changed_at)) = last_change.as_deref().map(DateTime::parse_from_rfc3339) {
            let changed_at = changed_at.with_timezone(&Utc);
            last_updated = Some(last_updated.map_or(changed_at, |current| current.max(changed_at)));
        }

        Ok(StoreMetadata {
            version,
            max_characters: max_characters.ok_or_else(|| StoreError::Unavailable("metadata is missing max_characters".to_string()))?,
            last_updated: last_updated.unwrap_or_else(Utc::now),
        })
    }

    async fn health_check(&self) -> bool {
        let conn = match self.connection().await {
            Ok(conn) => conn,
            Err(e) => {
                tracing::error!("Database health check failed: {}", e);
                return false;
            }
        };
        match conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0)) {
            Ok(_) => true,
            Err(e) => {
                tracing::error!("Database health check failed: {}", e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn lists_in_insertion_order() {
        let store = SqliteStore::in_memory(25).unwrap();
        for name in ["Zangief", "Ryu", "Ken"] {
            store.add(name).await.unwrap();
        }
        assert_eq!(store.list().await.unwrap(), vec!["Zangief", "Ryu", "Ken"]);
    }

    #[tokio::test]
    async fn duplicate_and_limit_errors() {
        let store = SqliteStore::in_memory(2).unwrap();
        store.add("Ryu").await.unwrap();

        assert!(matches!(store.add("Ryu").await, Err(StoreError::AlreadyExists(name)) if name == "Ryu"));
        store.add("Ken").await.unwrap();
        assert!(matches!(store.add("Chun-Li").await, Err(StoreError::LimitReached(2))));
        assert_eq!(store.list().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn remove_missing_is_not_found() {
        let store = SqliteStore::in_memory(25).unwrap();
        store.add("Ryu").await.unwrap();
        store.remove("Ryu").await.unwrap();

        assert!(matches!(store.remove("Ryu").await, Err(StoreError::NotFound(_))));
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn metadata_is_seeded() {
        let store = SqliteStore::in_memory(12).unwrap();
        let metadata = store.metadata().await.unwrap();
        assert_eq!(metadata.version, SCHEMA_VERSION);
        assert_eq!(metadata.max_characters, 12);
        assert!(store.health_check().await);
    }

    #[tokio::test]
    async fn reopening_applies_the_configured_limit() {
        let path = std::env::temp_dir().join(format!("character-store-{}-limit.db", std::process::id()));
        let _ = std::fs::remove_file(&path);

        let store = SqliteStore::open(&path, 2).unwrap();
        store.add("Ryu").await.unwrap();
        store.add("Ken").await.unwrap();
        assert!(matches!(store.add("Chun-Li").await, Err(StoreError::LimitReached(2))));
        drop(store);

        let reopened = SqliteStore::open(&path, 40).unwrap();
        assert_eq!(reopened.metadata().await.unwrap().max_characters, 40);
        reopened.add("Chun-Li").await.unwrap();
        assert_eq!(reopened.list().await.unwrap(), vec!["Ryu", "Ken", "Chun-Li"]);

        drop(reopened);
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn order_follows_insertion_not_timestamps() {
        let store = SqliteStore::in_memory(25).unwrap();
        store.add("Ryu").await.unwrap();
        store.add("Ken").await.unwrap();
        {
            let conn = store.connection().await.unwrap();
            // A clock that stepped backwards between the two inserts
            conn.execute("UPDATE characters SET created_at = '2000-01-01T00:00:00+00:00' WHERE name = 'Ken'", []).unwrap();
        }
        assert_eq!(store.list().await.unwrap(), vec!["Ryu", "Ken"]);
    }

    #[test]
    fn unique_violation_is_recognized() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        conn.execute("CREATE TABLE t (name TEXT UNIQUE)", []).unwrap();
        conn.execute("INSERT INTO t (name) VALUES ('Ryu')", []).unwrap();
        let e = conn.execute("INSERT INTO t (name) VALUES ('Ryu')", []).unwrap_err();
        assert!(is_unique_violation(&e));
    }
}
