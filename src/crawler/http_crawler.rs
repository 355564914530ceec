//! Built-in breadth-first site crawler
//!
//! Walks internal links from the start URL, honouring robots.txt, the page
//! budget, and the depth limit, and emits one [`PageRecord`] per visited URL.

use crate::config::Config;
use crate::crawler::fetcher::{build_http_client, fetch_url, FetchResult};
use crate::crawler::parser::parse_html;
use crate::crawler::records::{MultiValue, PageRecord};
use crate::crawler::Crawler;
use crate::robots::{fetch_robots, ParsedRobots};
use crate::state::DomainState;
use crate::url::is_internal_url;
use crate::AuditError;
use async_trait::async_trait;
use reqwest::Client;
use std::collections::{HashSet, VecDeque};
use std::time::{Duration, Instant};
use url::Url;

/// Upper bound on a robots.txt `Crawl-delay` the crawler will honour
const MAX_CRAWL_DELAY: Duration = Duration::from_secs(5);

/// A URL waiting to be fetched
#[derive(Debug, Clone)]
struct QueuedPage {
    url: Url,
    depth: u32,
    referer: Option<String>,
}

/// HTTP crawler restricted to the audited site
pub struct HttpCrawler {
    client: Client,
    max_depth: u32,
    agent_token: String,
}

impl HttpCrawler {
    /// Creates a crawler from the configuration
    ///
    /// # Arguments
    ///
    /// * `config` - Provides the user agent, request timeout, and depth limit
    pub fn new(config: &Config) -> Result<Self, AuditError> {
        Ok(Self {
            client: build_http_client(config)?,
            max_depth: config.crawler.max_depth,
            agent_token: config.user_agent.crawler_name.clone(),
        })
    }

    fn crawl_delay(&self, robots: &ParsedRobots) -> Duration {
        robots
            .crawl_delay(&self.agent_token)
            .filter(|delay| delay.is_finite() && *delay > 0.0)
            .map(|delay| Duration::from_secs_f64(delay).min(MAX_CRAWL_DELAY))
            .unwrap_or(Duration::ZERO)
    }

    async fn wait_for_slot(pacing: &mut DomainState, delay: Duration) {
        if let Some(wait) = pacing.time_until_next_request(delay, Instant::now()) {
            tokio::time::sleep(wait).await;
        }
        pacing.record_request(Instant::now());
    }
}

#[async_trait]
impl Crawler for HttpCrawler {
    async fn crawl(&self, start: &Url, max_pages: u32) -> Result<Vec<PageRecord>, AuditError> {
        let robots = fetch_robots(&self.client, start).await;
        let delay = self.crawl_delay(&robots);
        let mut pacing = DomainState::new();

        let mut queue = VecDeque::from([QueuedPage {
            url: start.clone(),
            depth: 0,
            referer: None,
        }]);
        let mut seen: HashSet<String> = HashSet::from([start.to_string()]);
        let mut records: Vec<PageRecord> = Vec::new();
        let started = Instant::now();

        while let Some(queued) = queue.pop_front() {
            if records.len() >= max_pages as usize {
                tracing::debug!(pending = queue.len() + 1, "Page budget reached");
                break;
            }

            let url_str = queued.url.as_str();
            if !robots.is_allowed(url_str, &self.agent_token) {
                tracing::info!("URL {} disallowed by robots.txt", url_str);
                continue;
            }

            Self::wait_for_slot(&mut pacing, delay).await;
            tracing::debug!(depth = queued.depth, "Fetching {}", url_str);

            let mut record = PageRecord {
                url: url_str.to_string(),
                referer_header: queued.referer.clone(),
                ..Default::default()
            };

            match fetch_url(&self.client, url_str).await {
                FetchResult::Page {
                    final_url,
                    status_code,
                    body,
                } => {
                    let base = Url::parse(&final_url).unwrap_or_else(|_| queued.url.clone());
                    let parsed = parse_html(&body, &base);

                    if queued.depth < self.max_depth {
                        for link in &parsed.links {
                            let Ok(link_url) = Url::parse(link) else {
                                continue;
                            };
                            if is_internal_url(&link_url, start) && seen.insert(link_url.to_string()) {
                                queue.push_back(QueuedPage {
                                    url: link_url,
                                    depth: queued.depth + 1,
                                    referer: Some(url_str.to_string()),
                                });
                            }
                        }
                    }

                    record.status = Some(status_code);
                    record.title = parsed.title;
                    record.meta_description = parsed.meta_description;
                    record.headings = Some(MultiValue::from(parsed.headings));
                    record.links = Some(MultiValue::from(parsed.links));
                }
                FetchResult::NotHtml { content_type, .. } => {
                    tracing::debug!("Skipping non-HTML {} ({})", url_str, content_type);
                    continue;
                }
                FetchResult::HttpError { status_code } => {
                    tracing::debug!("HTTP {} for {}", status_code, url_str);
                    record.status = Some(status_code);
                }
                FetchResult::NetworkError { error, timeout } => {
                    if queued.depth == 0 {
                        return Err(AuditError::Crawl(error));
                    }
                    tracing::debug!(timeout, "Network error for {}: {}", url_str, error);
                }
            }

            records.push(record);
        }

        tracing::info!(
            "Crawl finished: {} records in {:?}",
            records.len(),
            started.elapsed()
        );

        Ok(records)
    }
}
