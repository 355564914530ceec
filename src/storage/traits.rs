//! Storage traits and error types
//!
//! This module defines the trait interface for audit persistence and the
//! associated error types.

use crate::findings::Report;
use crate::state::AuditStatus;
use crate::storage::{AuditRecord, NewAudit};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Audit not found: {0}")]
    NotFound(i64),

    #[error("Invalid status transition for audit {id}: {from} -> {to}")]
    InvalidTransition {
        id: i64,
        from: AuditStatus,
        to: AuditStatus,
    },

    #[error("Audit {id} is already terminal ({status})")]
    TerminalAudit { id: i64, status: AuditStatus },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for audit persistence backends
///
/// Every write that changes `status` is checked against the audit lifecycle.
/// Once an audit is terminal, no write touches it again.
pub trait AuditStore {
    /// Creates a new `PENDING` audit and returns its id
    fn create_audit(&mut self, audit: &NewAudit) -> StorageResult<i64>;

    /// Creates a new `PENDING` audit under a caller-chosen id
    fn insert_audit_with_id(&mut self, id: i64, audit: &NewAudit) -> StorageResult<()>;

    /// Gets an audit by id
    fn get_audit(&self, id: i64) -> StorageResult<AuditRecord>;

    /// Gets an audit by id, or None
    fn find_audit(&self, id: i64) -> StorageResult<Option<AuditRecord>>;

    /// Moves an audit to a new non-terminal status
    fn update_status(&mut self, id: i64, status: AuditStatus) -> StorageResult<()>;

    /// Persists a stage checkpoint: the report so far and the status it leaves
    /// the audit in
    fn save_report(&mut self, id: i64, report: &Report, status: AuditStatus)
        -> StorageResult<()>;

    /// Stores the final report, marks the audit `COMPLETE`, stamps `completed_at`
    fn complete_audit(&mut self, id: i64, report: &Report) -> StorageResult<()>;

    /// Marks an audit as failed with user-facing and technical messages
    ///
    /// # Returns
    ///
    /// * `Err(StorageError::TerminalAudit)` - The audit was already terminal;
    ///   nothing was written
    fn fail_audit(
        &mut self,
        id: i64,
        status: AuditStatus,
        error_message: &str,
        technical_error: &str,
    ) -> StorageResult<()>;

    /// Lists audits currently in `status`, oldest first
    fn list_audits_by_status(&self, status: AuditStatus) -> StorageResult<Vec<AuditRecord>>;
}
