//! Robots.txt handling module
//!
//! Fetches and parses the audited site's robots.txt so the built-in crawler
//! stays out of disallowed paths.

mod parser;

pub use parser::ParsedRobots;

use reqwest::Client;
use url::Url;

/// Fetches robots.txt for the origin of `site`
///
/// Anything other than a 200 response, including network failures, is treated
/// as "allow everything".
pub async fn fetch_robots(client: &Client, site: &Url) -> ParsedRobots {
    let Ok(robots_url) = site.join("/robots.txt") else {
        return ParsedRobots::allow_all();
    };

    match client.get(robots_url.clone()).send().await {
        Ok(response) if response.status().is_success() => match response.text().await {
            Ok(body) => ParsedRobots::from_content(&body),
            Err(e) => {
                tracing::debug!(url = %robots_url, error = %e, "Unreadable robots.txt, allowing all");
                ParsedRobots::allow_all()
            }
        },
        Ok(response) => {
            tracing::debug!(url = %robots_url, status = response.status().as_u16(), "No robots.txt");
            ParsedRobots::allow_all()
        }
        Err(e) => {
            tracing::debug!(url = %robots_url, error = %e, "Could not fetch robots.txt, allowing all");
            ParsedRobots::allow_all()
        }
    }
}
