//! Persistence layer for skyguard.
//!
//! The register is mirrored to a single named slot in a key-value store. The
//! [`Persistence`] trait is the port the [`RiskStore`](crate::store::RiskStore)
//! writes through; [`SqliteSlot`] is the on-disk backend and [`MemorySlot`] an
//! in-process one.

mod memory;
pub mod schema;

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use crate::error::{Error, Result};

pub use memory::MemorySlot;

/// Default slot name for the register.
pub const DEFAULT_SLOT_NAME: &str = "skyguard_risks";

/// A single persistent slot holding the serialized register.
pub trait Persistence {
    /// Read the slot. Returns `None` if nothing has been written yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn load(&self) -> Result<Option<String>>;

    /// Replace the slot contents as a unit.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be written.
    fn save(&mut self, payload: &str) -> Result<()>;
}

/// `SQLite`-backed slot.
///
/// Each slot is one row of the `slots` table; a save replaces the row in a
/// single statement.
#[derive(Debug)]
pub struct SqliteSlot {
    /// Path to the database file.
    path: PathBuf,
    /// Database connection.
    conn: Connection,
    /// Key of the slot this instance reads and writes.
    key: String,
}

impl SqliteSlot {
    /// Open or create a database at the given path and bind to slot `key`.
    ///
    /// Creates the parent directories and database file if they don't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or schema initialization fails.
    pub fn open(path: impl AsRef<Path>, key: impl Into<String>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        debug!("Opening database at {}", path.display());
        let conn = Connection::open(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        schema::initialize_schema(&conn)?;

        debug!("Database opened successfully at {}", path.display());
        Ok(Self {
            path,
            conn,
            key: key.into(),
        })
    }

    /// Create an in-memory slot for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory(key: impl Into<String>) -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;

        schema::initialize_schema(&conn)?;

        Ok(Self {
            path: PathBuf::from(":memory:"),
            conn,
            key: key.into(),
        })
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get the slot key.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Delete the slot contents.
    ///
    /// Returns `true` if there was anything to delete.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn clear(&self) -> Result<bool> {
        let affected = self
            .conn
            .execute("DELETE FROM slots WHERE key = ?1", [&self.key])?;
        Ok(affected > 0)
    }

    /// Get slot statistics.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn stats(&self) -> Result<SlotStats> {
        let row: Option<(i64, String)> = self
            .conn
            .query_row(
                "SELECT length(value), updated_at FROM slots WHERE key = ?1",
                [&self.key],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let (payload_bytes, updated_at) = match row {
            Some((len, updated)) => (
                u64::try_from(len).unwrap_or(0),
                DateTime::parse_from_rfc3339(&updated)
                    .ok()
                    .map(|dt| dt.with_timezone(&Utc)),
            ),
            None => (0, None),
        };

        let db_size_bytes = if self.path.to_string_lossy() == ":memory:" {
            0
        } else {
            std::fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0)
        };

        Ok(SlotStats {
            slot_name: self.key.clone(),
            payload_bytes,
            updated_at,
            db_size_bytes,
        })
    }
}

impl Persistence for SqliteSlot {
    fn load(&self) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM slots WHERE key = ?1",
                [&self.key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn save(&mut self, payload: &str) -> Result<()> {
        let updated_at = Utc::now().to_rfc3339();
        self.conn.execute(
            r"
            INSERT INTO slots (key, value, updated_at) VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            ",
            params![self.key, payload, updated_at],
        )?;
        debug!("Wrote {} bytes to slot {}", payload.len(), self.key);
        Ok(())
    }
}

/// Statistics about a slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotStats {
    /// Name of the slot.
    pub slot_name: String,
    /// Size of the stored payload in bytes.
    pub payload_bytes: u64,
    /// When the slot was last written.
    pub updated_at: Option<DateTime<Utc>>,
    /// Size of the database file in bytes.
    pub db_size_bytes: u64,
}
