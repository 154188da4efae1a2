//! `SQLite` schema definitions for skyguard.
//!
//! The register is kept as a single serialized value in a key-value table, so
//! the schema never has to follow changes to the record shape.

use rusqlite::Connection;

use crate::error::Result;

/// SQL statement to create the key-value slot table.
pub const CREATE_SLOTS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS slots (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL
)
";

/// All schema creation statements in order.
pub const SCHEMA_STATEMENTS: &[&str] = &[CREATE_SLOTS_TABLE];

/// Create all tables if they don't exist.
///
/// # Errors
///
/// Returns an error if a statement fails.
pub fn initialize_schema(conn: &Connection) -> Result<()> {
    for statement in SCHEMA_STATEMENTS {
        conn.execute(statement, [])?;
    }
    Ok(())
}
