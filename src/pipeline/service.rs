//! Inbound audit API
//!
//! `start_audit` records a `PENDING` audit and queues it on the pipeline
//! worker pool; `get_audit` returns the stored snapshot at any point.

use super::orchestrator::{Orchestrator, INTERNAL_ERROR_MESSAGE};
use super::pool::{JobHandler, JobOutcome, WorkerPool};
use crate::config::Config;
use crate::output::Notifier;
use crate::storage::{lock_store, AuditRecord, AuditStore, NewAudit, SharedStore};
use crate::AuditError;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// One queued audit run
#[derive(Debug, Clone)]
pub struct AuditJob {
    pub audit_id: i64,
    pub url: String,
    pub max_pages: u32,
}

struct PipelineHandler {
    orchestrator: Arc<Orchestrator>,
}

#[async_trait]
impl JobHandler<AuditJob> for PipelineHandler {
    async fn handle(&self, job: AuditJob) -> JobOutcome<AuditJob> {
        self.orchestrator
            .run_audit(job.audit_id, &job.url, job.max_pages)
            .await;
        JobOutcome::Done
    }
}

/// Accepts audit requests and runs them in the background
pub struct AuditService {
    config: Arc<Config>,
    store: SharedStore,
    pool: WorkerPool<AuditJob>,
    notifier: Option<Arc<Notifier>>,
}

impl AuditService {
    /// Creates a service with the default collaborators
    pub fn new(config: Config, store: SharedStore) -> Result<Self, AuditError> {
        let config = Arc::new(config);
        let orchestrator = Orchestrator::new(Arc::clone(&config), store.clone())?;
        Ok(Self::with_orchestrator(config, orchestrator))
    }

    /// Creates a service around a prepared orchestrator
    pub fn with_orchestrator(config: Arc<Config>, orchestrator: Orchestrator) -> Self {
        let store = orchestrator.store().clone();
        let notifier = orchestrator.notifier();
        let handler = PipelineHandler {
            orchestrator: Arc::new(orchestrator),
        };
        let pool = WorkerPool::new(
            "pipeline",
            config.pipeline.workers,
            config.pipeline.queue_capacity,
            Arc::new(handler),
        );

        Self {
            config,
            store,
            pool,
            notifier,
        }
    }

    /// Requests an audit
    ///
    /// # Arguments
    ///
    /// * `url` - Site to audit, validated when the audit runs
    /// * `max_pages` - Page budget; the configured default when None
    /// * `user_id` / `request_id` - Requester metadata stored with the audit
    ///
    /// # Returns
    ///
    /// * `Ok(id)` - The new audit's id; the audit is `PENDING` and queued
    /// * `Err(AuditError)` - The audit could not be stored or queued
    pub async fn start_audit(
        &self,
        url: &str,
        max_pages: Option<u32>,
        user_id: Option<String>,
        request_id: Option<String>,
    ) -> Result<i64, AuditError> {
        let audit_id = lock_store(&self.store)?.create_audit(&NewAudit {
            url: url.to_string(),
            user_id,
            request_id,
        })?;

        let job = AuditJob {
            audit_id,
            url: url.to_string(),
            max_pages: max_pages.unwrap_or(self.config.crawler.max_pages),
        };
        tracing::info!(audit_id, url, "Audit queued");

        if let Err(e) = self.pool.submit(job).await {
            lock_store(&self.store)?.fail_audit(
                audit_id,
                crate::AuditStatus::Error,
                INTERNAL_ERROR_MESSAGE,
                &e.to_string(),
            )?;
            return Err(e);
        }

        Ok(audit_id)
    }

    /// Gets the current snapshot of an audit
    pub fn get_audit(&self, audit_id: i64) -> Result<AuditRecord, AuditError> {
        Ok(lock_store(&self.store)?.get_audit(audit_id)?)
    }

    /// Polls until an audit is terminal or `timeout` passes
    ///
    /// Returns the last snapshot either way.
    pub async fn wait_for_audit(
        &self,
        audit_id: i64,
        timeout: Duration,
    ) -> Result<AuditRecord, AuditError> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let audit = self.get_audit(audit_id)?;
            if audit.status.is_terminal() || tokio::time::Instant::now() >= deadline {
                return Ok(audit);
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }

    /// Finishes queued audits, then queued webhook deliveries
    pub async fn shutdown(&self) -> Result<(), AuditError> {
        self.pool.shutdown().await?;
        if let Some(notifier) = &self.notifier {
            notifier.shutdown().await?;
        }
        Ok(())
    }
}
