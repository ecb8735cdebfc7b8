use rusqlite::Connection;

use crate::error::Result;

pub const SCHEMA_VERSION: i64 = 1;

/// Metadata key holding the schema version the database was written with.
pub const SCHEMA_VERSION_KEY: &str = "schema_version";

pub fn initialize(conn: &Connection) -> Result<()> {
    conn.execute_batch("PRAGMA journal_mode = WAL;")?;
    conn.pragma_update(None, "busy_timeout", 5000)?;
    conn.pragma_update(None, "wal_autocheckpoint", 100)?;

    // In-memory databases reject this; that is fine.
    if conn
        .execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")
        .is_ok()
    {
        tracing::debug!("startup WAL checkpoint complete");
    }

    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS metadata (
            key   TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS readings (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            conversation_id TEXT NOT NULL,
            sequence        INTEGER NOT NULL,
            mood            TEXT NOT NULL,
            confidence      REAL NOT NULL,
            timestamp       INTEGER NOT NULL,
            source_text     TEXT NOT NULL DEFAULT ''
        );

        CREATE TABLE IF NOT EXISTS patterns (
            word  TEXT NOT NULL,
            mood  TEXT NOT NULL,
            count INTEGER NOT NULL DEFAULT 0,
            PRIMARY KEY (word, mood)
        );

        CREATE INDEX IF NOT EXISTS idx_readings_conversation ON readings(conversation_id);
        CREATE INDEX IF NOT EXISTS idx_readings_mood ON readings(mood);
        ",
    )?;

    Ok(())
}
