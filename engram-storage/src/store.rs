//! Store — owns the SQLite connection, applies pragmas, runs
//! migrations, and enforces the embedding-model pin.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use rusqlite::Connection;

use engram_core::errors::{EngramError, EngramResult};

use crate::migrations;
use crate::queries::meta_ops;
use crate::to_storage_err;

/// Prepared statements kept hot per connection.
const STATEMENT_CACHE_CAPACITY: usize = 64;

/// The storage handle. One writer connection per process; WAL plus the
/// 5-second busy timeout absorb cross-process contention.
pub struct Store {
    conn: Mutex<Connection>,
    db_path: Option<PathBuf>,
}

impl Store {
    /// Open a store backed by a file on disk, creating it if needed.
    pub fn open(path: &Path) -> EngramResult<Self> {
        let conn = Connection::open(path).map_err(to_storage_err)?;
        let store = Self {
            conn: Mutex::new(conn),
            db_path: Some(path.to_path_buf()),
        };
        store.initialize()?;
        Ok(store)
    }

    /// Open an in-memory store (for testing).
    pub fn open_in_memory() -> EngramResult<Self> {
        let conn = Connection::open_in_memory().map_err(to_storage_err)?;
        let store = Self {
            conn: Mutex::new(conn),
            db_path: None,
        };
        store.initialize()?;
        Ok(store)
    }

    /// Open an existing database file; fails if it does not exist.
    /// Used by the inspection CLI, which must not create databases.
    pub fn open_existing(path: &Path) -> EngramResult<Self> {
        if !path.exists() {
            return Err(EngramError::storage(format!(
                "database not found: {}",
                path.display()
            )));
        }
        Self::open(path)
    }

    fn initialize(&self) -> EngramResult<()> {
        self.with_conn(|conn| {
            apply_pragmas(conn)?;
            conn.set_prepared_statement_cache_capacity(STATEMENT_CACHE_CAPACITY);
            migrations::run_migrations(conn)
        })
    }

    /// Path of the backing database file, if file-backed.
    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    /// Run a closure against the connection. All SQLite work is
    /// synchronous; callers must not hold the connection across an
    /// await point.
    pub fn with_conn<F, T>(&self, f: F) -> EngramResult<T>
    where
        F: FnOnce(&Connection) -> EngramResult<T>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|_| EngramError::storage("connection mutex poisoned"))?;
        f(&conn)
    }

    /// Record the embedding model on first use and fail with
    /// `ModelMismatch` when a later open presents a different model.
    pub fn verify_embedding_model(&self, model: &str) -> EngramResult<()> {
        self.with_conn(|conn| match meta_ops::get_meta(conn, "embedding_model")? {
            None => meta_ops::set_meta(conn, "embedding_model", model),
            Some(pinned) if pinned == model => Ok(()),
            Some(pinned) => Err(EngramError::ModelMismatch {
                pinned,
                requested: model.to_string(),
            }),
        })
    }
}

/// Apply performance and safety pragmas to a connection.
/// WAL mode, NORMAL sync, 5s busy_timeout, foreign_keys ON.
fn apply_pragmas(conn: &Connection) -> EngramResult<()> {
    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA busy_timeout = 5000;
        PRAGMA foreign_keys = ON;
        ",
    )
    .map_err(to_storage_err)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_pin_round_trip() {
        let store = Store::open_in_memory().unwrap();
        store.verify_embedding_model("text-embedding-3-small").unwrap();
        // Same model: fine.
        store.verify_embedding_model("text-embedding-3-small").unwrap();
        // Different model: fatal.
        let err = store.verify_embedding_model("nomic-embed-text").unwrap_err();
        assert!(matches!(err, EngramError::ModelMismatch { .. }));
    }

    #[test]
    fn open_existing_requires_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.db");
        assert!(Store::open_existing(&missing).is_err());

        let path = dir.path().join("present.db");
        Store::open(&path).unwrap();
        assert!(Store::open_existing(&path).is_ok());
    }
}
