//! Per-audit logging context

use std::time::Instant;
use tracing::Span;

/// Logging context for one audit
///
/// Passed explicitly through every stage; all stage work runs inside
/// [`AuditContext::span`] so each log line carries the audit id and URL.
#[derive(Debug, Clone)]
pub struct AuditContext {
    audit_id: i64,
    url: String,
    span: Span,
}

impl AuditContext {
    pub fn new(audit_id: i64, url: &str) -> Self {
        Self {
            audit_id,
            url: url.to_string(),
            span: tracing::info_span!("audit", audit_id, url = %url),
        }
    }

    pub fn audit_id(&self) -> i64 {
        self.audit_id
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn span(&self) -> &Span {
        &self.span
    }
}

/// Logs the start and end of a pipeline stage with its duration
#[derive(Debug)]
pub struct StageTimer {
    stage: &'static str,
    started: Instant,
}

impl StageTimer {
    pub fn start(stage: &'static str) -> Self {
        tracing::info!(stage, "Stage started");
        Self {
            stage,
            started: Instant::now(),
        }
    }

    pub fn duration_ms(&self) -> u128 {
        self.started.elapsed().as_millis()
    }

    pub fn finish(self) {
        tracing::info!(stage = self.stage, duration_ms = self.duration_ms() as u64, "Stage finished");
    }

    pub fn fail(self, error: &dyn std::fmt::Display) {
        tracing::warn!(
            stage = self.stage,
            duration_ms = self.duration_ms() as u64,
            error = %error,
            "Stage failed"
        );
    }
}
