//! Audit pipeline module
//!
//! This module drives audits end to end:
//! - The bounded worker pool that runs audits and webhook deliveries
//! - Per-audit logging context and stage timing
//! - The stage orchestrator and its status transitions
//! - The inbound service API

mod context;
mod orchestrator;
mod pool;
mod service;

pub use context::{AuditContext, StageTimer};
pub use orchestrator::{Orchestrator, INTERNAL_ERROR_MESSAGE, NO_USABLE_RESULTS};
pub use pool::{JobHandler, JobOutcome, WorkerPool};
pub use service::{AuditJob, AuditService};
