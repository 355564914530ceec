//! State module for tracking audit progress
//!
//! # Components
//!
//! - `AuditStatus`: The audit lifecycle (pending, analyzing external links, terminal outcomes)
//! - `DomainState`: Per-domain request pacing used while verifying links

mod audit_status;
mod domain_state;

// Re-export main types
pub use audit_status::AuditStatus;
pub use domain_state::DomainState;
