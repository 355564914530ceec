//! Findings module
//!
//! Holds the report data model, the false-positive rules applied to link
//! errors, provenance tracking for link targets, and the interpreter that
//! turns crawl records into findings.

mod false_positive;
mod interpreter;
mod model;
mod provenance;

pub use false_positive::{is_auth_sensitive, FalsePositiveFilter, FalsePositiveReason};
pub use interpreter::{
    check_headings, check_meta_description, check_title, interpret, Interpretation,
};
pub use model::{
    CheckKind, CheckResult, CheckStatus, CheckValue, HeadingDistribution, KeywordCount,
    LinkBuckets, LinkCategory, LinkCounts, LinkFinding, LinkStatus, Report, ReportSummary,
    VerificationStats,
};
pub use provenance::{LinkTarget, ProvenanceMap};
