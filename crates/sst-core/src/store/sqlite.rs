//! SQLite-backed document store.
//!
//! Runtime defaults:
//! - `journal_mode = WAL` so a watcher can read while an editor commits
//! - `busy_timeout = 5s` to absorb short write contention between processes
//!
//! Every document lives in one row of `documents`; a `put` is a single
//! upsert statement, which SQLite applies atomically. Write transactions use
//! `BEGIN IMMEDIATE`, taking the write lock before the first read so no other
//! process can commit between a read and the write that depends on it.

use rusqlite::{Connection, OptionalExtension, TransactionBehavior, params, types::Type};
use std::path::Path;
use std::time::Duration;

use super::{DocumentStore, StoreError};

/// Busy timeout used for store connections.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Latest schema version understood by this binary.
pub const LATEST_SCHEMA_VERSION: u32 = 2;

const MIGRATION_V1_SQL: &str = r"
CREATE TABLE IF NOT EXISTS store_meta (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    schema_version INTEGER NOT NULL
);
INSERT OR IGNORE INTO store_meta (id, schema_version) VALUES (1, 0);

CREATE TABLE IF NOT EXISTS documents (
    key TEXT PRIMARY KEY NOT NULL,
    body TEXT NOT NULL
);
";

const MIGRATION_V2_SQL: &str = r"
ALTER TABLE documents ADD COLUMN updated_at TEXT;
UPDATE documents SET updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now') WHERE updated_at IS NULL;
";

const MIGRATIONS: &[(u32, &str)] = &[(1, MIGRATION_V1_SQL), (2, MIGRATION_V2_SQL)];

/// Read `PRAGMA user_version` and convert it to a Rust `u32`.
///
/// # Errors
///
/// Returns an error if querying SQLite fails or the version value cannot be
/// represented as `u32`.
pub fn current_schema_version(conn: &Connection) -> rusqlite::Result<u32> {
    let version: i64 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
    u32::try_from(version).map_err(|error| {
        rusqlite::Error::FromSqlConversionFailure(0, Type::Integer, Box::new(error))
    })
}

/// Apply all pending migrations in ascending order.
///
/// Each migration runs only when its version is above `user_version`, inside
/// its own `IMMEDIATE` transaction.
///
/// # Errors
///
/// Returns an error if any migration fails.
pub fn migrate(conn: &mut Connection) -> rusqlite::Result<u32> {
    let mut current = current_schema_version(conn)?;

    for (version, sql) in MIGRATIONS {
        if *version <= current {
            continue;
        }

        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        // Another process may have migrated while this one waited for the lock.
        let locked = current_schema_version(&tx)?;
        if locked >= *version {
            current = locked;
            continue;
        }
        tx.execute_batch(sql)?;
        tx.pragma_update(None, "user_version", i64::from(*version))?;
        tx.execute(
            "UPDATE store_meta SET schema_version = ?1 WHERE id = 1",
            [i64::from(*version)],
        )?;
        tx.commit()?;
        current = *version;
    }

    Ok(current)
}

fn configure_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    let _journal_mode: String =
        conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
    conn.busy_timeout(DEFAULT_BUSY_TIMEOUT)?;
    Ok(())
}

/// Document store persisted in a single SQLite file.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (or create) the store database, apply pragmas, and migrate.
    ///
    /// # Errors
    ///
    /// Returns an error if the parent directory cannot be created or SQLite
    /// fails to open, configure, or migrate the file.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let mut conn = Connection::open(path)?;
        configure_connection(&conn)?;
        let version = migrate(&mut conn)?;
        tracing::debug!(path = %path.display(), schema_version = version, "opened document store");
        Ok(Self { conn })
    }

    /// In-memory database with the full schema. Each call is a separate store.
    ///
    /// # Errors
    ///
    /// Returns an error if SQLite cannot create or migrate the database.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let mut conn = Connection::open_in_memory()?;
        migrate(&mut conn)?;
        Ok(Self { conn })
    }

    /// Underlying connection, for diagnostics.
    #[must_use]
    pub const fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl DocumentStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self
            .conn
            .query_row("SELECT body FROM documents WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()?)
    }

    fn put(&mut self, key: &str, body: &str) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO documents (key, body, updated_at)
             VALUES (?1, ?2, strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
             ON CONFLICT(key) DO UPDATE SET body = excluded.body, updated_at = excluded.updated_at",
            params![key, body],
        )?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.conn
            .execute("DELETE FROM documents WHERE key = ?1", [key])?;
        Ok(())
    }

    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT key FROM documents WHERE substr(key, 1, length(?1)) = ?1 ORDER BY key",
        )?;
        let keys = stmt
            .query_map([prefix], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(keys)
    }

    fn clear(&mut self) -> Result<(), StoreError> {
        self.conn.execute("DELETE FROM documents", [])?;
        Ok(())
    }

    fn begin_write(&mut self) -> Result<(), StoreError> {
        self.conn.execute_batch("BEGIN IMMEDIATE")?;
        Ok(())
    }

    fn commit(&mut self) -> Result<(), StoreError> {
        self.conn.execute_batch("COMMIT")?;
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), StoreError> {
        self.conn.execute_batch("ROLLBACK")?;
        Ok(())
    }

    fn change_counter(&self) -> Result<u64, StoreError> {
        let version: i64 = self
            .conn
            .pragma_query_value(None, "data_version", |row| row.get(0))?;
        Ok(version.unsigned_abs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn temp_store_path() -> (TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("sst.sqlite3");
        (dir, path)
    }

    #[test]
    fn open_sets_wal_and_busy_timeout() {
        let (_dir, path) = temp_store_path();
        let store = SqliteStore::open(&path).expect("open store");
        let conn = store.connection();

        let journal_mode: String = conn
            .pragma_query_value(None, "journal_mode", |row| row.get(0))
            .expect("query journal_mode");
        assert_eq!(journal_mode.to_ascii_lowercase(), "wal");

        let busy_timeout_ms: u64 = conn
            .pragma_query_value(None, "busy_timeout", |row| row.get(0))
            .expect("query busy_timeout");
        assert_eq!(
            u128::from(busy_timeout_ms),
            DEFAULT_BUSY_TIMEOUT.as_millis()
        );
    }

    #[test]
    fn migrate_is_idempotent() -> rusqlite::Result<()> {
        let mut conn = Connection::open_in_memory()?;

        assert_eq!(migrate(&mut conn)?, LATEST_SCHEMA_VERSION);
        assert_eq!(migrate(&mut conn)?, LATEST_SCHEMA_VERSION);
        assert_eq!(current_schema_version(&conn)?, LATEST_SCHEMA_VERSION);

        let schema_version: i64 = conn.query_row(
            "SELECT schema_version FROM store_meta WHERE id = 1",
            [],
            |row| row.get(0),
        )?;
        assert_eq!(schema_version, i64::from(LATEST_SCHEMA_VERSION));
        Ok(())
    }

    #[test]
    fn documents_survive_reopen() -> Result<(), StoreError> {
        let (_dir, path) = temp_store_path();
        {
            let mut store = SqliteStore::open(&path)?;
            store.put("sst_ranges_v1", r#"[{"start":1,"end":5}]"#)?;
            store.put("sst_date_2024-01-10", "{}")?;
        }
        let store = SqliteStore::open(&path)?;
        assert_eq!(
            store.get("sst_ranges_v1")?.as_deref(),
            Some(r#"[{"start":1,"end":5}]"#)
        );
        assert_eq!(store.keys_with_prefix("sst_date_")?, vec!["sst_date_2024-01-10"]);
        assert_eq!(store.get("missing")?, None);
        Ok(())
    }

    #[test]
    fn prefix_scan_does_not_treat_underscore_as_wildcard() -> Result<(), StoreError> {
        let mut store = SqliteStore::open_in_memory()?;
        store.put("sst_date_2024-01-10", "{}")?;
        store.put("sstXdateX2024", "{}")?;
        assert_eq!(store.keys_with_prefix("sst_date_")?, vec!["sst_date_2024-01-10"]);
        Ok(())
    }

    #[test]
    fn foreign_commit_moves_change_counter() -> Result<(), StoreError> {
        let (_dir, path) = temp_store_path();
        let watcher = SqliteStore::open(&path)?;
        let mut editor = SqliteStore::open(&path)?;

        let before = watcher.change_counter()?;
        editor.put("sst_date_2024-01-10", "{}")?;
        let after = watcher.change_counter()?;
        assert_ne!(before, after);
        Ok(())
    }

    #[test]
    fn rollback_discards_writes() -> Result<(), StoreError> {
        let mut store = SqliteStore::open_in_memory()?;
        store.put("kept", "1")?;
        store.begin_write()?;
        store.put("kept", "2")?;
        store.put("dropped", "3")?;
        store.rollback()?;
        assert_eq!(store.get("kept")?.as_deref(), Some("1"));
        assert_eq!(store.get("dropped")?, None);
        Ok(())
    }

    #[test]
    fn open_write_transaction_blocks_other_writers() -> Result<(), StoreError> {
        let (_dir, path) = temp_store_path();
        let mut holder = SqliteStore::open(&path)?;
        let mut other = SqliteStore::open(&path)?;
        other.conn.busy_timeout(std::time::Duration::from_millis(50))?;

        holder.begin_write()?;
        holder.put("doc", "held")?;
        assert!(other.begin_write().is_err());
        holder.commit()?;

        other.begin_write()?;
        other.put("doc", "after")?;
        other.commit()?;
        assert_eq!(holder.get("doc")?.as_deref(), Some("after"));
        Ok(())
    }

    #[test]
    fn clear_and_remove() -> Result<(), StoreError> {
        let mut store = SqliteStore::open_in_memory()?;
        store.put("a", "1")?;
        store.put("b", "2")?;
        store.remove("a")?;
        store.remove("a")?;
        assert_eq!(store.get("a")?, None);
        store.clear()?;
        assert_eq!(store.get("b")?, None);
        Ok(())
    }
}
