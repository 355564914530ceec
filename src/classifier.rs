//! Failure classification
//!
//! Maps a raw failure message to the terminal status an audit should take and
//! a sentence that can be shown to the person who requested the audit.

use crate::state::AuditStatus;
use serde::Serialize;

/// Message used when no pattern matches
pub const GENERIC_USER_MESSAGE: &str =
    "Something went wrong while analyzing this website. Please try again.";

const NOT_FOUND: &str = "Website not found. Please check the URL and try again.";
const STRUCTURE: &str = "Website structure prevented proper analysis.";
const TOO_LARGE: &str = "Website is too large to analyze completely.";
const CERTIFICATE: &str = "Website security certificate issues detected.";

/// Ordered substring table
///
/// Matched against the lower-cased message; the first hit wins, so more
/// specific patterns sit above the general ones they contain.
const ERROR_PATTERNS: &[(&str, &str, AuditStatus)] = &[
    // DNS and network
    ("nxdomain", NOT_FOUND, AuditStatus::Failed),
    ("dns resolution failed", NOT_FOUND, AuditStatus::Failed),
    ("name or service not known", NOT_FOUND, AuditStatus::Failed),
    (
        "nodename nor servname provided",
        "Invalid website address. Please check the URL format.",
        AuditStatus::Failed,
    ),
    ("domain validation failed", NOT_FOUND, AuditStatus::Failed),
    ("does not exist", NOT_FOUND, AuditStatus::Failed),
    // Connection
    (
        "connection timeout",
        "Website is taking too long to respond. Please try again later.",
        AuditStatus::Failed,
    ),
    (
        "connection timed out",
        "Website is taking too long to respond. Please try again later.",
        AuditStatus::Failed,
    ),
    (
        "connection refused",
        "Website is currently unavailable. Please try again later.",
        AuditStatus::Failed,
    ),
    (
        "connection reset",
        "Connection to website was interrupted. Please try again.",
        AuditStatus::Failed,
    ),
    (
        "network is unreachable",
        "Network connection issue. Please check your internet connection.",
        AuditStatus::Failed,
    ),
    (
        "no route to host",
        "Website server is unreachable. Please try again later.",
        AuditStatus::Failed,
    ),
    // HTTP status literals
    (
        "http 400",
        "Invalid request to website. Please check the URL.",
        AuditStatus::Failed,
    ),
    (
        "http 401",
        "Website requires authentication to access.",
        AuditStatus::Failed,
    ),
    (
        "http 403",
        "Access to this website is forbidden.",
        AuditStatus::Failed,
    ),
    (
        "http 404",
        "The webpage was not found. Please check the URL.",
        AuditStatus::Failed,
    ),
    (
        "http 429",
        "Website is limiting requests. Please try again later.",
        AuditStatus::Failed,
    ),
    (
        "http 500",
        "Website is experiencing technical difficulties.",
        AuditStatus::Partial,
    ),
    (
        "http 502",
        "Website gateway error. Please try again later.",
        AuditStatus::Failed,
    ),
    (
        "http 503",
        "Website is temporarily unavailable. Please try again later.",
        AuditStatus::Failed,
    ),
    (
        "http 504",
        "Website gateway timeout. Please try again later.",
        AuditStatus::Failed,
    ),
    // TLS
    ("ssl", CERTIFICATE, AuditStatus::Failed),
    ("certificate", CERTIFICATE, AuditStatus::Failed),
    (
        "handshake",
        "Secure connection to website failed.",
        AuditStatus::Failed,
    ),
    // Redirects
    (
        "too many redirects",
        "Website has too many redirects. Please check the URL.",
        AuditStatus::Failed,
    ),
    (
        "redirect",
        "Website has configuration issues preventing analysis.",
        AuditStatus::Failed,
    ),
    // Content and parsing
    (
        "empty response",
        "Website returned no content to analyze.",
        AuditStatus::Failed,
    ),
    (
        "no content",
        "No content could be analyzed on this website.",
        AuditStatus::Failed,
    ),
    ("missing field `url`", STRUCTURE, AuditStatus::Failed),
    (
        "empty record set",
        "No analyzable content found on this website.",
        AuditStatus::Failed,
    ),
    (
        "crawl validation failed",
        "Website could not be properly analyzed.",
        AuditStatus::Failed,
    ),
    // Crawl
    (
        "crawl produced no usable results",
        "No content could be analyzed on this website.",
        AuditStatus::Failed,
    ),
    (
        "spider closed",
        "Website analysis was interrupted.",
        AuditStatus::Partial,
    ),
    (
        "closespider",
        "Website analysis reached configured limits.",
        AuditStatus::Partial,
    ),
    // URL format
    (
        "invalid url",
        "Please enter a valid website URL (e.g., https://example.com).",
        AuditStatus::Failed,
    ),
    (
        "malformed url",
        "Please enter a valid website URL format.",
        AuditStatus::Failed,
    ),
    (
        "missing scheme",
        "Please include http:// or https:// in the URL.",
        AuditStatus::Failed,
    ),
    // File and system
    (
        "permission denied",
        "System permission error occurred during analysis.",
        AuditStatus::Failed,
    ),
    (
        "disk space",
        "System storage issue during analysis.",
        AuditStatus::Failed,
    ),
    (
        "file not found",
        "Analysis results could not be processed.",
        AuditStatus::Failed,
    ),
    // Timeouts
    (
        "timeout",
        "Analysis took too long to complete. Please try again.",
        AuditStatus::Failed,
    ),
    (
        "timed out",
        "Website analysis timed out. Please try again later.",
        AuditStatus::Failed,
    ),
    // Resources
    ("out of memory", TOO_LARGE, AuditStatus::Partial),
    ("memory", TOO_LARGE, AuditStatus::Partial),
];

/// A classified failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassifiedError {
    /// Sentence suitable for the audit requester
    pub user_message: String,

    /// The raw message, kept for diagnostics
    pub technical_message: String,

    /// Terminal status the audit should take
    pub status: AuditStatus,
}

/// Classifies a raw failure message
///
/// # Arguments
///
/// * `raw` - The technical failure message
/// * `url` - The audited URL, used only for logging
///
/// # Returns
///
/// The user-facing message, the original message, and `Failed` or `Partial`.
/// Unknown messages fall back to a generic sentence with `Failed`.
pub fn classify(raw: &str, url: Option<&str>) -> ClassifiedError {
    let raw = if raw.trim().is_empty() {
        "Unknown error occurred"
    } else {
        raw
    };
    let lower = raw.to_lowercase();

    for (pattern, user_message, status) in ERROR_PATTERNS {
        if lower.contains(pattern) {
            tracing::info!(pattern, url = url.unwrap_or("-"), "Classified failure");
            return ClassifiedError {
                user_message: (*user_message).to_string(),
                technical_message: raw.to_string(),
                status: *status,
            };
        }
    }

    tracing::warn!(url = url.unwrap_or("-"), error = raw, "Unknown failure pattern");
    ClassifiedError {
        user_message: GENERIC_USER_MESSAGE.to_string(),
        technical_message: raw.to_string(),
        status: AuditStatus::Failed,
    }
}
