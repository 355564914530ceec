//! Storage module for persisting audits
//!
//! This module handles all database operations, including:
//! - SQLite database initialization and schema management
//! - Audit creation and lookup
//! - Guarded status transitions and stage checkpoints

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{AuditStore, StorageError, StorageResult};

use crate::findings::Report;
use crate::state::AuditStatus;
use crate::AuditError;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

/// Storage handle shared between the pipeline workers
pub type SharedStore = Arc<Mutex<SqliteStorage>>;

/// Initializes or opens a storage database
pub fn open_storage(path: &Path) -> Result<SqliteStorage, AuditError> {
    SqliteStorage::new(path)
}

/// Wraps a storage backend for sharing between tasks
pub fn shared(storage: SqliteStorage) -> SharedStore {
    Arc::new(Mutex::new(storage))
}

/// Locks a shared store, mapping poisoning to an error
pub fn lock_store(store: &SharedStore) -> Result<MutexGuard<'_, SqliteStorage>, AuditError> {
    store.lock().map_err(|_| AuditError::LockPoisoned)
}

/// Fields supplied when an audit is requested
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewAudit {
    pub url: String,
    pub user_id: Option<String>,
    pub request_id: Option<String>,
}

/// A stored audit
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditRecord {
    pub id: i64,
    pub url: String,
    pub status: AuditStatus,
    pub report: Option<Report>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub user_id: Option<String>,
    pub request_id: Option<String>,

    /// User-facing failure message
    pub error_message: Option<String>,

    /// Diagnostic failure message
    pub technical_error: Option<String>,
}
