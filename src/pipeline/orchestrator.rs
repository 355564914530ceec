//! Audit pipeline orchestration
//!
//! Runs the stages of one audit in order:
//! 1. Pre-flight URL and DNS validation
//! 2. Crawl, persisted as a JSON Lines artifact
//! 3. Interpretation of the artifact, checkpointed as `ANALYZING_EXTERNAL`
//! 4. External link verification
//! 5. Report assembly, persisted as `COMPLETE`
//! 6. Webhook notification
//!
//! Any stage error ends the audit in a terminal failure status exactly once.

use super::context::{AuditContext, StageTimer};
use crate::classifier::classify;
use crate::config::Config;
use crate::crawler::{read_records, write_records, CrawlArtifact, Crawler, HttpCrawler};
use crate::findings::{interpret, FalsePositiveFilter};
use crate::output::{assemble_report, Notifier};
use crate::state::AuditStatus;
use crate::storage::{lock_store, AuditStore, NewAudit, SharedStore, StorageError};
use crate::url::{validate_audit_url, DnsCheck};
use crate::verifier::LinkVerifier;
use crate::{AuditError, UrlError};
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::Instrument;

/// Failure raised when a crawl yields nothing to interpret
pub const NO_USABLE_RESULTS: &str = "crawl produced no usable results";

/// User-facing message for failures inside the audit machinery
pub const INTERNAL_ERROR_MESSAGE: &str =
    "An internal error occurred while processing the audit. Please try again later.";

async fn timed<T, F>(stage: &'static str, work: F) -> Result<T, AuditError>
where
    F: Future<Output = Result<T, AuditError>>,
{
    let timer = StageTimer::start(stage);
    match work.await {
        Ok(value) => {
            timer.finish();
            Ok(value)
        }
        Err(e) => {
            timer.fail(&e);
            Err(e)
        }
    }
}

/// Sequences the stages of an audit and owns its status transitions
pub struct Orchestrator {
    config: Arc<Config>,
    store: SharedStore,
    crawler: Arc<dyn Crawler>,
    dns: DnsCheck,
    verifier: LinkVerifier,
    filter: FalsePositiveFilter,
    notifier: Option<Arc<Notifier>>,
}

impl Orchestrator {
    /// Creates an orchestrator with the built-in crawler, system DNS, and the
    /// configured notifier
    ///
    /// Must be called inside a Tokio runtime when a notifier is configured.
    pub fn new(config: Arc<Config>, store: SharedStore) -> Result<Self, AuditError> {
        let notifier = match &config.notifier {
            Some(notifier_config) => Some(Arc::new(Notifier::new(
                notifier_config,
                &config.user_agent_string(),
            )?)),
            None => None,
        };

        Ok(Self {
            crawler: Arc::new(HttpCrawler::new(&config)?),
            dns: DnsCheck::new(Duration::from_secs(config.validation.dns_timeout_secs)),
            verifier: LinkVerifier::new(&config)?,
            filter: FalsePositiveFilter::new(config.verifier.ignore_domains.clone()),
            notifier,
            config,
            store,
        })
    }

    /// Replaces the crawl collaborator
    pub fn with_crawler(mut self, crawler: Arc<dyn Crawler>) -> Self {
        self.crawler = crawler;
        self
    }

    /// Replaces the DNS pre-flight check
    pub fn with_dns(mut self, dns: DnsCheck) -> Self {
        self.dns = dns;
        self
    }

    pub fn notifier(&self) -> Option<Arc<Notifier>> {
        self.notifier.clone()
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    /// Runs an audit to a terminal status
    ///
    /// Creates the audit if `audit_id` is unknown. An audit that is already
    /// terminal is left alone.
    ///
    /// # Returns
    ///
    /// The status the audit ended in. Failures are recorded on the audit, not
    /// returned.
    pub async fn run_audit(&self, audit_id: i64, url: &str, max_pages: u32) -> AuditStatus {
        let ctx = AuditContext::new(audit_id, url);
        let span = ctx.span().clone();

        async {
            match self.ensure_audit(&ctx) {
                Ok(Some(status)) => {
                    tracing::warn!(%status, "Audit already finished, not running again");
                    return status;
                }
                Ok(None) => {}
                Err(e) => return self.report_failure(&ctx, &e),
            }

            tracing::info!(max_pages, "Audit started");
            match self.run_stages(&ctx, max_pages).await {
                Ok(()) => {
                    tracing::info!("Audit complete");
                    AuditStatus::Complete
                }
                Err(e) => self.report_failure(&ctx, &e),
            }
        }
        .instrument(span)
        .await
    }

    /// Returns the terminal status of an existing finished audit, or None if
    /// the audit may run
    fn ensure_audit(&self, ctx: &AuditContext) -> Result<Option<AuditStatus>, AuditError> {
        let mut store = lock_store(&self.store)?;
        match store.find_audit(ctx.audit_id())? {
            Some(audit) if audit.status.is_terminal() => Ok(Some(audit.status)),
            Some(_) => Ok(None),
            None => {
                store.insert_audit_with_id(
                    ctx.audit_id(),
                    &NewAudit {
                        url: ctx.url().to_string(),
                        ..Default::default()
                    },
                )?;
                Ok(None)
            }
        }
    }

    fn artifact_path(&self, audit_id: i64) -> PathBuf {
        PathBuf::from(&self.config.storage.work_dir).join(format!("crawl-{}.jsonl", audit_id))
    }

    async fn run_stages(&self, ctx: &AuditContext, max_pages: u32) -> Result<(), AuditError> {
        let audit_id = ctx.audit_id();

        let site = timed("preflight", async {
            let site = validate_audit_url(ctx.url())?;
            let host = site.host_str().ok_or(UrlError::MissingDomain)?;
            self.dns
                .check(host)
                .await
                .map_err(AuditError::DomainValidation)?;
            Ok::<_, AuditError>(site)
        })
        .await?;

        let artifact = timed("crawl", async {
            let records = self.crawler.crawl(&site, max_pages).await?;
            tracing::info!(records = records.len(), "Crawl returned records");

            std::fs::create_dir_all(&self.config.storage.work_dir)?;
            let artifact = CrawlArtifact::new(self.artifact_path(audit_id));
            write_records(artifact.path(), &records)?;
            Ok::<_, AuditError>(artifact)
        })
        .await?;

        let interpretation = timed("interpret", async move {
            let records = match read_records(artifact.path()) {
                Ok(records) => records,
                Err(e) => {
                    tracing::warn!(error = %e, "Crawl artifact missing or unreadable");
                    return Err(AuditError::Crawl(NO_USABLE_RESULTS.to_string()));
                }
            };
            drop(artifact);

            if !records.iter().any(|r| !r.url.trim().is_empty()) {
                return Err(AuditError::Crawl(NO_USABLE_RESULTS.to_string()));
            }

            let interpretation = interpret(&records, &site, &self.filter);
            lock_store(&self.store)?.save_report(
                audit_id,
                &interpretation.report,
                AuditStatus::AnalyzingExternal,
            )?;
            tracing::info!(
                pages = interpretation.report.summary.pages_analyzed,
                internal_errors = interpretation.report.summary.internal_links.total,
                external_targets = interpretation.external_targets.len(),
                suppressed = interpretation.suppressed,
                "Crawl interpreted"
            );
            Ok::<_, AuditError>(interpretation)
        })
        .await?;

        let outcome = timed("verify", self.verifier.verify(interpretation.external_targets)).await?;

        timed("assemble", async {
            let mut store = lock_store(&self.store)?;
            let persisted = store.get_audit(audit_id)?.report.unwrap_or_default();
            let report = assemble_report(persisted, outcome);
            store.complete_audit(audit_id, &report)?;
            Ok::<_, AuditError>(())
        })
        .await?;

        if let Some(notifier) = &self.notifier {
            let snapshot = lock_store(&self.store)?.get_audit(audit_id)?;
            if let Err(e) = notifier.notify(&snapshot).await {
                tracing::error!(error = %e, "Could not queue webhook delivery");
            }
        }

        Ok(())
    }

    /// Records a stage failure on the audit
    ///
    /// Internal errors become `ERROR`; everything else is classified. A
    /// failure reported for an audit that is already terminal is logged and
    /// discarded.
    fn report_failure(&self, ctx: &AuditContext, error: &AuditError) -> AuditStatus {
        let technical = error.to_string();
        let (status, user_message) = if error.is_internal() {
            (AuditStatus::Error, INTERNAL_ERROR_MESSAGE.to_string())
        } else {
            let classified = classify(&technical, Some(ctx.url()));
            (classified.status, classified.user_message)
        };

        let mut store = match lock_store(&self.store) {
            Ok(store) => store,
            Err(e) => {
                tracing::error!(error = %e, "Cannot record audit failure");
                return AuditStatus::Error;
            }
        };

        match store.fail_audit(ctx.audit_id(), status, &user_message, &technical) {
            Ok(()) => {
                tracing::warn!(%status, error = %technical, "Audit failed");
                status
            }
            Err(StorageError::TerminalAudit { status: current, .. }) => {
                tracing::warn!(%current, error = %technical, "Audit already terminal, discarding failure");
                current
            }
            Err(e) => {
                tracing::error!(error = %e, original = %technical, "Could not record audit failure");
                AuditStatus::Error
            }
        }
    }
}
