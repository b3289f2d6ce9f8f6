// Record store backed by SQLite

use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension};
use tally_recon::stats::HIGH_CONFIDENCE;
use tally_recon::store::{DateRange, RecordStore};
use tally_recon::{RecordStats, RecordValidation};
use thiserror::Error;
use tracing::debug;

// validated_at is microseconds since the Unix epoch so range filters are
// plain integer comparisons.
const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS validations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    entity_id TEXT NOT NULL,
    domain TEXT NOT NULL,
    validated_at INTEGER NOT NULL,
    overall_confidence REAL NOT NULL,
    critical_errors INTEGER NOT NULL,   -- count of critical error entries
    payload TEXT NOT NULL               -- full RecordValidation as JSON
);

CREATE INDEX IF NOT EXISTS idx_validations_domain_time
    ON validations (domain, validated_at);

CREATE INDEX IF NOT EXISTS idx_validations_entity
    ON validations (domain, entity_id, validated_at);
"#;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("payload error: {0}")]
    Payload(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (creating if needed) a store at `path`.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        debug!(path = %path.display(), "opened record store");
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    /// Newest validation stored for an entity.
    pub fn load_latest(&self, entity_id: &str, domain: &str) -> Result<Option<RecordValidation>, StoreError> {
        let payload: Option<String> = self
            .conn
            .query_row(
                "SELECT payload FROM validations
                 WHERE entity_id = ?1 AND domain = ?2
                 ORDER BY validated_at DESC, id DESC
                 LIMIT 1",
                params![entity_id, domain],
                |row| row.get(0),
            )
            .optional()?;

        match payload {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    /// Every validation in `domain` within `range`, oldest first.
    pub fn load_range(&self, domain: &str, range: &DateRange) -> Result<Vec<RecordValidation>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT payload FROM validations
             WHERE domain = ?1 AND validated_at BETWEEN ?2 AND ?3
             ORDER BY validated_at, id",
        )?;

        let payloads = stmt
            .query_map(
                params![domain, range.from.timestamp_micros(), range.to.timestamp_micros()],
                |row| row.get::<_, String>(0),
            )?
            .collect::<Result<Vec<_>, _>>()?;

        payloads
            .iter()
            .map(|json| serde_json::from_str(json).map_err(StoreError::from))
            .collect()
    }

    pub fn count(&self) -> Result<usize, StoreError> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM validations", [], |row| row.get(0))?;
        Ok(n as usize)
    }
}

impl RecordStore for SqliteStore {
    type Error = StoreError;

    fn save(&mut self, record: &RecordValidation) -> Result<(), StoreError> {
        let payload = serde_json::to_string(record)?;
        self.conn.execute(
            "INSERT INTO validations
                (entity_id, domain, validated_at, overall_confidence, critical_errors, payload)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                record.entity_id,
                record.domain,
                record.timestamp.timestamp_micros(),
                record.overall_confidence,
                record.critical_errors.len() as i64,
                payload,
            ],
        )?;
        debug!(entity_id = %record.entity_id, domain = %record.domain, "saved validation");
        Ok(())
    }

    fn load_recent(&self, domain: &str, range: &DateRange) -> Result<RecordStats, StoreError> {
        let (count, avg, high, critical): (i64, Option<f64>, Option<i64>, Option<i64>) = self.conn.query_row(
            "SELECT COUNT(*),
                    AVG(overall_confidence),
                    SUM(CASE WHEN overall_confidence >= ?4 THEN 1 ELSE 0 END),
                    SUM(CASE WHEN critical_errors > 0 THEN 1 ELSE 0 END)
             FROM validations
             WHERE domain = ?1 AND validated_at BETWEEN ?2 AND ?3",
            params![
                domain,
                range.from.timestamp_micros(),
                range.to.timestamp_micros(),
                HIGH_CONFIDENCE,
            ],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
        )?;

        if count == 0 {
            return Ok(RecordStats::default());
        }

        Ok(RecordStats {
            count: count as usize,
            avg_confidence: avg.unwrap_or(0.0),
            high_confidence_rate: high.unwrap_or(0) as f64 / count as f64,
            critical_error_count: critical.unwrap_or(0) as usize,
        })
    }
}
