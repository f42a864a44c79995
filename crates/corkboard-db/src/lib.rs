pub mod error;
pub mod migrations;
pub mod models;
pub mod queries;

pub use error::{Result, StoreError};

use rusqlite::{Connection, DatabaseName};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, info};

/// Owned handle to the message store.
///
/// A single connection sits behind a mutex, so every statement and every
/// online backup is serialized against the others.
pub struct Database {
    conn: Mutex<Connection>,
    path: PathBuf,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;

        // WAL mode keeps readers of the file (downloads, backups) off the writer's back
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.busy_timeout(Duration::from_secs(5))?;

        migrations::run(&conn)?;

        info!("Database opened at {}", path.display());
        Ok(Self {
            conn: Mutex::new(conn),
            path: path.to_path_buf(),
        })
    }

    /// Location of the primary store file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.conn.lock().map_err(|_| StoreError::LockPoisoned)?;
        f(&conn)
    }

    /// Copy the whole database to `dest` with SQLite's online backup API.
    ///
    /// The connection lock is held for the duration of the copy, so the
    /// result never contains a partially applied statement.
    pub fn backup_to(&self, dest: &Path) -> Result<()> {
        self.with_conn(|conn| {
            conn.backup(DatabaseName::Main, dest, None)?;
            Ok(())
        })?;
        debug!("Online backup written to {}", dest.display());
        Ok(())
    }

    /// Close the connection, surfacing any error SQLite reports on close.
    pub fn close(self) -> Result<()> {
        let conn = self.conn.into_inner().map_err(|_| StoreError::LockPoisoned)?;
        conn.close().map_err(|(_, e)| StoreError::Storage(e))?;
        info!("Database at {} closed", self.path.display());
        Ok(())
    }
}
