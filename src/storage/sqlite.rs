use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, Connection, OptionalExtension};

use super::{KeyValueStore, StorageError};

const DATA_DIR_ENV: &str = "A11Y_STIAC_DATA_DIR";
const DATABASE_FILE: &str = "settings.sqlite3";

/// Durable store: one `kv` table in a WAL-mode SQLite file.
pub struct SqliteStore {
    pool: Pool<SqliteConnectionManager>,
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore").finish_non_exhaustive()
    }
}

#[derive(Debug)]
struct SqliteCustomizer;

impl r2d2::CustomizeConnection<Connection, rusqlite::Error> for SqliteCustomizer {
    fn on_acquire(&self, conn: &mut Connection) -> Result<(), rusqlite::Error> {
        conn.busy_timeout(Duration::from_secs(1))
    }
}

impl SqliteStore {
    /// Opens the store under `A11Y_STIAC_DATA_DIR`, else the platform data
    /// directory.
    pub fn new() -> Result<Self, StorageError> {
        Self::open(&database_path()?)
    }

    /// Store inside `dir` (primarily for testing)
    pub fn new_with_path(dir: &Path) -> Result<Self, StorageError> {
        Self::open(&dir.join(DATABASE_FILE))
    }

    fn open(path: &Path) -> Result<Self, StorageError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|_| StorageError::DataDir)?;
        }

        let manager = SqliteConnectionManager::file(path);
        let pool = Pool::builder()
            .max_size(2)
            .connection_customizer(Box::new(SqliteCustomizer))
            .build(manager)?;

        let conn = pool.get()?;
        initialise_schema(&conn)?;

        Ok(Self { pool })
    }
}

impl KeyValueStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let conn = self.pool.get()?;
        conn.query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| row.get(0))
            .optional()
            .map_err(Into::into)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let conn = self.pool.get()?;
        conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let conn = self.pool.get()?;
        conn.execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(())
    }
}

fn database_path() -> Result<PathBuf, StorageError> {
    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        let mut path = PathBuf::from(dir);
        path.push(DATABASE_FILE);
        return Ok(path);
    }

    if let Some(dirs) = ProjectDirs::from("org", "Stiac", "A11yStiac") {
        let mut data_dir = dirs.data_dir().to_path_buf();
        data_dir.push(DATABASE_FILE);
        Ok(data_dir)
    } else {
        Err(StorageError::DataDir)
    }
}

fn initialise_schema(conn: &Connection) -> Result<(), StorageError> {
    conn.execute_batch(
        r#"
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        CREATE TABLE IF NOT EXISTS kv (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );
        "#,
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn round_trip_value() {
        let dir = TempDir::new().unwrap();
        let store = SqliteStore::new_with_path(dir.path()).unwrap();
        assert_eq!(store.get("a11y-stiac-settings").unwrap(), None);
        store.set("a11y-stiac-settings", "{\"version\":5}").unwrap();
        store.set("a11y-stiac-settings", "{\"version\":5,\"hideImages\":true}").unwrap();
        assert_eq!(
            store.get("a11y-stiac-settings").unwrap().as_deref(),
            Some("{\"version\":5,\"hideImages\":true}")
        );
        store.remove("a11y-stiac-settings").unwrap();
        assert_eq!(store.get("a11y-stiac-settings").unwrap(), None);
    }

    #[test]
    fn values_survive_reopen() {
        let dir = TempDir::new().unwrap();
        {
            let store = SqliteStore::new_with_path(dir.path()).unwrap();
            store.set("stiacAccessibilityLanguage", "fr").unwrap();
        }
        let reopened = SqliteStore::new_with_path(dir.path()).unwrap();
        assert_eq!(
            reopened.get("stiacAccessibilityLanguage").unwrap().as_deref(),
            Some("fr")
        );
    }
}
