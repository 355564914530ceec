//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the AuditStore trait.

use crate::findings::Report;
use crate::state::AuditStatus;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{AuditStore, StorageError, StorageResult};
use crate::storage::{AuditRecord, NewAudit};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction};
use std::path::Path;

const AUDIT_COLUMNS: &str = "id, url, status, report_json, created_at, completed_at, \
     user_id, request_id, error_message, technical_error";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

/// Column values as stored, before decoding
struct RawAuditRow {
    id: i64,
    url: String,
    status: String,
    report_json: Option<String>,
    created_at: String,
    completed_at: Option<String>,
    user_id: Option<String>,
    request_id: Option<String>,
    error_message: Option<String>,
    technical_error: Option<String>,
}

impl RawAuditRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            url: row.get(1)?,
            status: row.get(2)?,
            report_json: row.get(3)?,
            created_at: row.get(4)?,
            completed_at: row.get(5)?,
            user_id: row.get(6)?,
            request_id: row.get(7)?,
            error_message: row.get(8)?,
            technical_error: row.get(9)?,
        })
    }

    fn decode(self) -> StorageResult<AuditRecord> {
        let status = AuditStatus::from_db_string(&self.status).ok_or_else(|| {
            StorageError::Serialization(format!("Unknown audit status '{}'", self.status))
        })?;
        let report = self
            .report_json
            .as_deref()
            .map(serde_json::from_str::<Report>)
            .transpose()
            .map_err(|e| StorageError::Serialization(e.to_string()))?;

        Ok(AuditRecord {
            id: self.id,
            url: self.url,
            status,
            report,
            created_at: parse_timestamp(&self.created_at)?,
            completed_at: self.completed_at.as_deref().map(parse_timestamp).transpose()?,
            user_id: self.user_id,
            request_id: self.request_id,
            error_message: self.error_message,
            technical_error: self.technical_error,
        })
    }
}

fn parse_timestamp(raw: &str) -> StorageResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StorageError::Serialization(format!("Bad timestamp '{}': {}", raw, e)))
}

fn encode_report(report: &Report) -> StorageResult<String> {
    serde_json::to_string(report).map_err(|e| StorageError::Serialization(e.to_string()))
}

/// Reads the current status inside a transaction
fn current_status(tx: &Transaction<'_>, id: i64) -> StorageResult<AuditStatus> {
    let raw: Option<String> = tx
        .query_row(
            "SELECT status FROM audits WHERE id = ?1",
            params![id],
            |row| row.get(0),
        )
        .optional()?;
    let raw = raw.ok_or(StorageError::NotFound(id))?;
    AuditStatus::from_db_string(&raw)
        .ok_or_else(|| StorageError::Serialization(format!("Unknown audit status '{}'", raw)))
}

/// Checks that `id` may move to `next`
///
/// Terminal audits are reported as `TerminalAudit` so callers can tell a
/// late write apart from a lifecycle bug.
fn guard_transition(tx: &Transaction<'_>, id: i64, next: AuditStatus) -> StorageResult<()> {
    let from = current_status(tx, id)?;
    if from.is_terminal() {
        return Err(StorageError::TerminalAudit { id, status: from });
    }
    if from != next && !from.can_transition_to(next) {
        return Err(StorageError::InvalidTransition { id, from, to: next });
    }
    Ok(())
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    pub fn new(path: &Path) -> crate::Result<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> crate::Result<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    fn insert(&mut self, id: Option<i64>, audit: &NewAudit) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO audits (id, url, status, created_at, user_id, request_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                id,
                audit.url,
                AuditStatus::Pending.to_db_string(),
                now,
                audit.user_id,
                audit.request_id
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }
}

impl AuditStore for SqliteStorage {
    fn create_audit(&mut self, audit: &NewAudit) -> StorageResult<i64> {
        self.insert(None, audit)
    }

    fn insert_audit_with_id(&mut self, id: i64, audit: &NewAudit) -> StorageResult<()> {
        self.insert(Some(id), audit)?;
        Ok(())
    }

    fn get_audit(&self, id: i64) -> StorageResult<AuditRecord> {
        self.find_audit(id)?.ok_or(StorageError::NotFound(id))
    }

    fn find_audit(&self, id: i64) -> StorageResult<Option<AuditRecord>> {
        let raw = self
            .conn
            .query_row(
                &format!("SELECT {} FROM audits WHERE id = ?1", AUDIT_COLUMNS),
                params![id],
                RawAuditRow::from_row,
            )
            .optional()?;
        raw.map(RawAuditRow::decode).transpose()
    }

    fn update_status(&mut self, id: i64, status: AuditStatus) -> StorageResult<()> {
        if status.is_terminal() {
            let from = self.get_audit(id)?.status;
            return Err(StorageError::InvalidTransition {
                id,
                from,
                to: status,
            });
        }
        let tx = self.conn.transaction()?;
        guard_transition(&tx, id, status)?;
        tx.execute(
            "UPDATE audits SET status = ?1 WHERE id = ?2",
            params![status.to_db_string(), id],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn save_report(
        &mut self,
        id: i64,
        report: &Report,
        status: AuditStatus,
    ) -> StorageResult<()> {
        let json = encode_report(report)?;
        let tx = self.conn.transaction()?;
        guard_transition(&tx, id, status)?;
        tx.execute(
            "UPDATE audits SET status = ?1, report_json = ?2 WHERE id = ?3",
            params![status.to_db_string(), json, id],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn complete_audit(&mut self, id: i64, report: &Report) -> StorageResult<()> {
        let json = encode_report(report)?;
        let now = Utc::now().to_rfc3339();
        let tx = self.conn.transaction()?;
        guard_transition(&tx, id, AuditStatus::Complete)?;
        tx.execute(
            "UPDATE audits SET status = ?1, report_json = ?2, completed_at = ?3 WHERE id = ?4",
            params![AuditStatus::Complete.to_db_string(), json, now, id],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn fail_audit(
        &mut self,
        id: i64,
        status: AuditStatus,
        error_message: &str,
        technical_error: &str,
    ) -> StorageResult<()> {
        let tx = self.conn.transaction()?;
        let from = current_status(&tx, id)?;
        if from.is_terminal() {
            return Err(StorageError::TerminalAudit { id, status: from });
        }
        if !status.is_failure() {
            return Err(StorageError::InvalidTransition { id, from, to: status });
        }
        let now = Utc::now().to_rfc3339();
        tx.execute(
            "UPDATE audits SET status = ?1, error_message = ?2, technical_error = ?3,
             completed_at = ?4 WHERE id = ?5",
            params![status.to_db_string(), error_message, technical_error, now, id],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn list_audits_by_status(&self, status: AuditStatus) -> StorageResult<Vec<AuditRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM audits WHERE status = ?1 ORDER BY id",
            AUDIT_COLUMNS
        ))?;
        let rows = stmt.query_map(params![status.to_db_string()], RawAuditRow::from_row)?;

        let mut audits = Vec::new();
        for row in rows {
            audits.push(row?.decode()?);
        }
        Ok(audits)
    }
}
