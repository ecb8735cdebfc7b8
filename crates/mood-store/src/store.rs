use std::path::Path;

use rusqlite::{Connection, OptionalExtension, params};
use serde::Serialize;
use uuid::Uuid;

use mood_core::{MoodLabel, PatternTable, ReadingSink, SentimentReading, SinkError};

use crate::error::{Result, StoreError};
use crate::schema::{self, SCHEMA_VERSION, SCHEMA_VERSION_KEY};

/// A reading as persisted, with the conversation it belongs to.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StoredReading {
    pub conversation_id: String,
    /// `YYYY-MM-DD HH:MM:SS`, UTC.
    pub recorded_at: String,
    #[serde(flatten)]
    pub reading: SentimentReading,
}

pub struct Store {
    conn: Connection,
    conversation_id: String,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        schema::initialize(&conn)?;
        let store = Self::with_connection(conn);
        store.check_schema_version()?;
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        schema::initialize(&conn)?;
        let store = Self::with_connection(conn);
        store.check_schema_version()?;
        Ok(store)
    }

    fn with_connection(conn: Connection) -> Self {
        Self {
            conn,
            conversation_id: Uuid::new_v4().to_string(),
        }
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    pub fn conversation_id(&self) -> &str {
        &self.conversation_id
    }

    /// Start a new conversation; later readings are grouped under a fresh id.
    pub fn begin_conversation(&mut self) -> &str {
        self.conversation_id = Uuid::new_v4().to_string();
        tracing::debug!(conversation = %self.conversation_id, "new conversation");
        &self.conversation_id
    }

    /// Fold the WAL back into the main database file.
    pub fn checkpoint_truncate(&self) -> Result<()> {
        self.conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
        Ok(())
    }

    /// Refuse databases written by a newer schema; stamp older or fresh
    /// ones with the current version.
    fn check_schema_version(&self) -> Result<()> {
        let stored = match self.get_metadata(SCHEMA_VERSION_KEY)? {
            Some(raw) => raw.trim().parse::<i64>().map_err(|_| {
                StoreError::InvalidData(format!("unreadable schema version: {raw}"))
            })?,
            None => 0,
        };
        if stored > SCHEMA_VERSION {
            return Err(StoreError::InvalidData(format!(
                "database schema version {stored} is newer than supported version {SCHEMA_VERSION}"
            )));
        }
        if stored < SCHEMA_VERSION {
            self.set_metadata(SCHEMA_VERSION_KEY, &SCHEMA_VERSION.to_string())?;
            tracing::debug!(from = stored, to = SCHEMA_VERSION, "schema version stamped");
        }
        Ok(())
    }

    // --- Metadata ---

    pub fn get_metadata(&self, key: &str) -> Result<Option<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT value FROM metadata WHERE key = ?1")?;
        let result = stmt.query_row([key], |row| row.get(0)).optional()?;
        Ok(result)
    }

    pub fn set_metadata(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO metadata (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    // --- Readings ---

    pub fn save_reading(&self, reading: &SentimentReading) -> Result<()> {
        self.conn.execute(
            "INSERT INTO readings (conversation_id, sequence, mood, confidence, timestamp, source_text)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                self.conversation_id,
                reading.sequence as i64,
                reading.mood.as_str(),
                reading.confidence,
                reading.timestamp as i64,
                reading.source_text,
            ],
        )?;
        Ok(())
    }

    /// Most recent readings first.
    pub fn recent_readings(&self, limit: usize) -> Result<Vec<StoredReading>> {
        let mut stmt = self.conn.prepare(
            "SELECT conversation_id, sequence, mood, confidence, timestamp,
                    datetime(timestamp, 'unixepoch'), source_text
             FROM readings ORDER BY id DESC LIMIT ?1",
        )?;
        let rows: Vec<(String, i64, String, f64, i64, String, String)> = stmt
            .query_map([limit as i64], |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                    row.get(5)?,
                    row.get(6)?,
                ))
            })?
            .collect::<std::result::Result<_, _>>()?;

        rows.into_iter()
            .map(
                |(conversation_id, sequence, mood, confidence, timestamp, recorded_at, text)| {
                    Ok(StoredReading {
                        conversation_id,
                        recorded_at,
                        reading: SentimentReading {
                            mood: parse_mood(&mood)?,
                            confidence,
                            timestamp: timestamp.max(0) as u64,
                            source_text: text,
                            sequence: sequence.max(0) as u64,
                        },
                    })
                },
            )
            .collect()
    }

    pub fn reading_count(&self) -> Result<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM readings", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    pub fn conversation_count(&self) -> Result<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(DISTINCT conversation_id) FROM readings",
            [],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    /// Reading count per mood, most frequent first. Moods never seen are omitted.
    pub fn mood_distribution(&self) -> Result<Vec<(MoodLabel, u64)>> {
        let mut stmt = self.conn.prepare(
            "SELECT mood, COUNT(*) AS n FROM readings GROUP BY mood ORDER BY n DESC, mood ASC",
        )?;
        let rows: Vec<(String, i64)> = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<std::result::Result<_, _>>()?;
        rows.into_iter()
            .map(|(mood, n)| Ok((parse_mood(&mood)?, n as u64)))
            .collect()
    }

    // --- Patterns ---

    pub fn increment_pattern(&self, word: &str, mood: MoodLabel) -> Result<()> {
        self.conn.execute(
            "INSERT INTO patterns (word, mood, count) VALUES (?1, ?2, 1)
             ON CONFLICT(word, mood) DO UPDATE SET count = count + 1",
            params![word, mood.as_str()],
        )?;
        Ok(())
    }

    pub fn load_patterns(&self) -> Result<PatternTable> {
        let mut stmt = self
            .conn
            .prepare("SELECT word, mood, count FROM patterns")?;
        let rows: Vec<(String, String, i64)> = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
            .collect::<std::result::Result<_, _>>()?;

        let mut table = PatternTable::new();
        for (word, mood, count) in rows {
            let count = u32::try_from(count.max(0)).unwrap_or(u32::MAX);
            table.insert(&word, parse_mood(&mood)?, count);
        }
        Ok(table)
    }

    /// Forget every learned pattern. Returns the number of rows removed.
    pub fn clear_patterns(&self) -> Result<usize> {
        let removed = self.conn.execute("DELETE FROM patterns", [])?;
        Ok(removed)
    }
}

fn parse_mood(s: &str) -> Result<MoodLabel> {
    MoodLabel::parse_token(s).ok_or_else(|| StoreError::InvalidData(format!("unknown mood: {s}")))
}

impl ReadingSink for Store {
    fn record_reading(&mut self, reading: &SentimentReading) -> std::result::Result<(), SinkError> {
        self.save_reading(reading)?;
        Ok(())
    }

    fn record_pattern(&mut self, word: &str, mood: MoodLabel) -> std::result::Result<(), SinkError> {
        self.increment_pattern(word, mood)?;
        Ok(())
    }

    fn begin_conversation(&mut self) -> std::result::Result<(), SinkError> {
        Store::begin_conversation(self);
        Ok(())
    }
}
