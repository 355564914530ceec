//! Crawler module for page fetching and record production
//!
//! This module contains the crawling side of an audit, including:
//! - HTTP fetching and error classification
//! - HTML parsing of on-page signals and link extraction
//! - The breadth-first site crawler
//! - The JSON Lines record format handed to the interpreter

mod fetcher;
mod http_crawler;
mod parser;
mod records;

pub use fetcher::{build_http_client, error_chain, fetch_url, FetchResult, MAX_REDIRECTS};
pub use http_crawler::HttpCrawler;
pub use parser::{parse_html, resolve_link, ParsedPage};
pub use records::{
    read_records, write_records, CrawlArtifact, MultiValue, PageRecord, MULTI_VALUE_SEPARATOR,
};

use crate::AuditError;
use async_trait::async_trait;
use url::Url;

/// Produces page records for a site
///
/// The pipeline only depends on this trait, so tests can substitute canned
/// records for a live crawl.
#[async_trait]
pub trait Crawler: Send + Sync {
    /// Crawls the site rooted at `start`
    ///
    /// # Arguments
    ///
    /// * `start` - The validated start URL
    /// * `max_pages` - Page budget for this crawl
    ///
    /// # Returns
    ///
    /// * `Ok(records)` - One record per visited URL, possibly empty
    /// * `Err(AuditError)` - The crawl could not run at all
    async fn crawl(&self, start: &Url, max_pages: u32) -> Result<Vec<PageRecord>, AuditError>;
}
