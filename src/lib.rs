//! Site-Audit: a website structural audit pipeline
//!
//! This crate audits a website by crawling its pages, checking on-page SEO
//! signals (title, meta description, headings), and verifying every discovered
//! link for reachability. Results are persisted per audit and optionally
//! delivered to a webhook.

pub mod classifier;
pub mod config;
pub mod crawler;
pub mod findings;
pub mod output;
pub mod pipeline;
pub mod robots;
pub mod state;
pub mod storage;
pub mod url;
pub mod verifier;

use thiserror::Error;

/// Main error type for Site-Audit operations
#[derive(Debug, Error)]
pub enum AuditError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("{0}")]
    Url(#[from] UrlError),

    #[error("Invalid URL format: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Domain validation failed: {0}")]
    DomainValidation(String),

    #[error("Crawl failed: {0}")]
    Crawl(String),

    #[error("Invalid status transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: state::AuditStatus,
        to: state::AuditStatus,
    },

    #[error("Worker pool '{0}' is shut down")]
    PoolClosed(&'static str),

    #[error("Audit store lock poisoned")]
    LockPoisoned,

    #[error("Pipeline task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl AuditError {
    /// Returns true if the error comes from the audit machinery itself rather
    /// than from the audited website
    ///
    /// Internal errors put an audit into `ERROR`; everything else is routed
    /// through the classifier.
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            Self::Database(_)
                | Self::Storage(_)
                | Self::LockPoisoned
                | Self::PoolClosed(_)
                | Self::Task(_)
                | Self::InvalidTransition { .. }
                | Self::Config(_)
        )
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
///
/// Messages are phrased so the classifier recognises them as URL format
/// problems.
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Invalid URL format: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Invalid URL: missing domain name")]
    MissingDomain,

    #[error("Invalid URL: invalid domain name format '{0}'")]
    InvalidHost(String),

    #[error("Malformed URL: {0}")]
    Malformed(String),
}

/// Result type alias for Site-Audit operations
pub type Result<T> = std::result::Result<T, AuditError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use classifier::{classify, ClassifiedError};
pub use config::Config;
pub use pipeline::{AuditService, Orchestrator};
pub use state::AuditStatus;
pub use storage::{AuditRecord, SqliteStorage};
