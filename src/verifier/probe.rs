//! Single-link probing with HEAD-then-GET fallback

use super::profile::ProbeSettings;
use crate::crawler::error_chain;
use crate::findings::LinkStatus;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, USER_AGENT};
use reqwest::{Client, Method};
use serde::{Deserialize, Serialize};

const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36";

/// Result of probing one URL, as written to a chunk artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeOutcome {
    pub url: String,
    pub status: LinkStatus,

    /// Method whose answer was kept
    pub method: String,

    /// Transport error behind an unreachable status
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Issues verification requests
#[derive(Debug, Clone)]
pub struct LinkProber {
    client: Client,
}

impl LinkProber {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn browser_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
        headers
    }

    async fn send(&self, method: Method, url: &str, settings: &ProbeSettings) -> (LinkStatus, Option<String>) {
        let mut request = self
            .client
            .request(method, url)
            .timeout(settings.request_timeout);
        if settings.browser_headers {
            request = request.headers(Self::browser_headers());
        }

        match request.send().await {
            Ok(response) => (LinkStatus::Http(response.status().as_u16()), None),
            Err(e) => (LinkStatus::Unreachable, Some(error_chain(&e))),
        }
    }

    /// Sends one method, retrying transient failures as the settings allow
    async fn send_with_retries(
        &self,
        method: Method,
        url: &str,
        settings: &ProbeSettings,
    ) -> (LinkStatus, Option<String>) {
        let mut attempt = 0;
        loop {
            let (status, error) = self.send(method.clone(), url, settings).await;
            if attempt >= settings.retries || !is_transient(status) {
                return (status, error);
            }
            attempt += 1;
            tracing::debug!(url, attempt, status = status.code(), "Retrying probe");
            tokio::time::sleep(settings.delay).await;
        }
    }

    /// Probes a URL
    ///
    /// HEAD goes first. A 4xx or unreachable answer escalates to GET, whose
    /// answer replaces the HEAD result.
    pub async fn probe(&self, url: &str, settings: &ProbeSettings) -> ProbeOutcome {
        let (status, error) = self.send_with_retries(Method::HEAD, url, settings).await;
        if !status.needs_fallback() {
            return ProbeOutcome {
                url: url.to_string(),
                status,
                method: Method::HEAD.to_string(),
                error,
            };
        }

        tracing::debug!(url, head_status = status.code(), "HEAD inconclusive, falling back to GET");
        let (status, error) = self.send_with_retries(Method::GET, url, settings).await;
        ProbeOutcome {
            url: url.to_string(),
            status,
            method: Method::GET.to_string(),
            error,
        }
    }
}

fn is_transient(status: LinkStatus) -> bool {
    match status {
        LinkStatus::Unreachable => true,
        LinkStatus::Http(code) => code == 429 || (500..600).contains(&code),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_statuses() {
        assert!(is_transient(LinkStatus::Unreachable));
        assert!(is_transient(LinkStatus::Http(429)));
        assert!(is_transient(LinkStatus::Http(503)));
        assert!(!is_transient(LinkStatus::Http(404)));
        assert!(!is_transient(LinkStatus::Http(200)));
    }

    #[test]
    fn test_outcome_line_format() {
        let outcome = ProbeOutcome {
            url: "https://a.com/".to_string(),
            status: LinkStatus::Unreachable,
            method: "GET".to_string(),
            error: Some("dns error".to_string()),
        };
        let line = serde_json::to_string(&outcome).unwrap();
        assert!(line.contains("\"status\":-1"));

        let back: ProbeOutcome = serde_json::from_str(&line).unwrap();
        assert_eq!(back, outcome);
    }
}
