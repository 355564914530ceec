//! Output module for assembling and delivering audit reports
//!
//! This module handles:
//! - Merging crawl findings and verification results into the final report
//! - Rendering reports as markdown
//! - Delivering finished audits to a webhook

mod markdown;
mod notifier;
mod report;

pub use markdown::{format_markdown_report, write_markdown_report};
pub use notifier::{backoff, DeliveryJob, Notifier, API_KEY_HEADER};
pub use report::{assemble_report, top_keywords, TOP_KEYWORDS};
