//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building HTTP clients with proper user agent strings
//! - GET requests to fetch page content
//! - Error classification

use crate::config::Config;
use reqwest::{redirect::Policy, Client};
use std::time::Duration;

/// Maximum redirect hops followed for one request
pub const MAX_REDIRECTS: usize = 10;

/// Result of a fetch operation
#[derive(Debug)]
pub enum FetchResult {
    /// An HTML page with a success status
    Page {
        /// Final URL after redirects
        final_url: String,
        /// HTTP status code
        status_code: u16,
        /// Page body content
        body: String,
    },

    /// A success response that is not HTML
    NotHtml {
        status_code: u16,
        content_type: String,
    },

    /// The server answered with a 4xx/5xx status
    HttpError { status_code: u16 },

    /// No usable response (connection refused, timeout, TLS, redirect loop)
    NetworkError {
        /// Error description, including the underlying cause
        error: String,
        /// True when the request timed out
        timeout: bool,
    },
}

/// Builds an HTTP client with proper configuration
///
/// The user agent follows `CrawlerName/Version (+ContactURL)`.
pub fn build_http_client(config: &Config) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent_string())
        .timeout(Duration::from_secs(config.crawler.request_timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .redirect(Policy::limited(MAX_REDIRECTS))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches a URL and classifies the outcome
pub async fn fetch_url(client: &Client, url: &str) -> FetchResult {
    let response = match client.get(url).send().await {
        Ok(response) => response,
        Err(e) => {
            return FetchResult::NetworkError {
                error: error_chain(&e),
                timeout: e.is_timeout(),
            }
        }
    };

    let status = response.status();
    if status.is_client_error() || status.is_server_error() {
        return FetchResult::HttpError {
            status_code: status.as_u16(),
        };
    }

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();

    // A missing content type is treated as HTML
    if !content_type.is_empty() && !content_type.contains("html") {
        return FetchResult::NotHtml {
            status_code: status.as_u16(),
            content_type,
        };
    }

    let final_url = response.url().to_string();
    match response.text().await {
        Ok(body) => FetchResult::Page {
            final_url,
            status_code: status.as_u16(),
            body,
        },
        Err(e) => FetchResult::NetworkError {
            error: error_chain(&e),
            timeout: e.is_timeout(),
        },
    }
}

/// Formats an error together with all of its sources
///
/// The innermost causes ("Connection refused", "dns error") are what make a
/// failure recognizable, so they are always included.
pub fn error_chain(error: &(dyn std::error::Error + 'static)) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}
