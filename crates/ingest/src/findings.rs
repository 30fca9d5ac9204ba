//! Security findings submitted through the ingest endpoint.

use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use chrono::{SecondsFormat, Utc};
use rusqlite::{Connection, params};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FindingError {
    #[error("invalid finding payload: {0}")]
    Payload(#[from] serde_json::Error),
    #[error("findings store: {0}")]
    Store(#[from] rusqlite::Error),
    #[error("findings store lock poisoned")]
    Poisoned,
}

/// A single finding. Missing fields decode as empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Finding {
    pub title: String,
    pub cve: String,
    pub cwe: String,
    pub evidence: String,
    pub found: String,
    pub description: String,
}

impl Finding {
    pub fn from_json(body: &[u8]) -> Result<Self, FindingError> {
        Ok(serde_json::from_slice(body)?)
    }
}

pub struct FindingStore {
    conn: Mutex<Connection>,
}

impl FindingStore {
    pub fn open<P: AsRef<Path>>(db_path: P) -> Result<Self, rusqlite::Error> {
        let conn = Connection::open(db_path.as_ref())?;
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS vulnerabilities (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT,
                cve TEXT,
                cwe TEXT,
                evidence TEXT,
                found TEXT,
                description TEXT,
                created_at TEXT
            );
            "#,
        )?;

        log::info!("Opened findings store at {:?}", db_path.as_ref());

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Insert one finding stamped with the current UTC time. Returns the row id.
    pub fn insert(&self, finding: &Finding) -> Result<i64, FindingError> {
        let created_at = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        let conn = self.conn.lock().map_err(|_| FindingError::Poisoned)?;
        conn.execute(
            "INSERT INTO vulnerabilities (title, cve, cwe, evidence, found, description, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                finding.title,
                finding.cve,
                finding.cwe,
                finding.evidence,
                finding.found,
                finding.description,
                created_at,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn count(&self) -> Result<i64, FindingError> {
        let conn = self.conn.lock().map_err(|_| FindingError::Poisoned)?;
        Ok(conn.query_row("SELECT COUNT(*) FROM vulnerabilities", [], |row| {
            row.get(0)
        })?)
    }

    /// Fetch a stored finding by row id.
    pub fn get(&self, id: i64) -> Result<Option<Finding>, FindingError> {
        let conn = self.conn.lock().map_err(|_| FindingError::Poisoned)?;
        let mut stmt = conn.prepare(
            "SELECT title, cve, cwe, evidence, found, description FROM vulnerabilities WHERE id = ?1",
        )?;
        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            Ok(Some(Finding {
                title: row.get(0)?,
                cve: row.get(1)?,
                cwe: row.get(2)?,
                evidence: row.get(3)?,
                found: row.get(4)?,
                description: row.get(5)?,
            }))
        } else {
            Ok(None)
        }
    }
}
