//! HTML parser for extracting on-page signals and links
//!
//! This module handles parsing HTML content to extract:
//! - The page title and meta description
//! - Every `<h1>` heading
//! - Outbound links (from `<a href>` tags)

use scraper::{Html, Selector};
use url::Url;

/// Extracted information from an HTML page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedPage {
    /// The page title (from <title> tag)
    pub title: Option<String>,

    /// Content of `<meta name="description">`
    pub meta_description: Option<String>,

    /// Text of every `<h1>`, in document order
    pub headings: Vec<String>,

    /// All links found on the page (absolute URLs, no fragments, deduplicated)
    pub links: Vec<String>,
}

/// Parses HTML content and extracts on-page signals and links
///
/// # Link Extraction Rules
///
/// **Exclude:**
/// - `<a href="..." download>`
/// - `javascript:`, `mailto:`, `tel:` links and data URIs
/// - Fragment-only links (same page anchors)
/// - Non-HTTP(S) URLs after resolution
///
/// # Example
///
/// ```
/// use site_audit::crawler::parse_html;
/// use url::Url;
///
/// let html = r#"<html><head><title>Test</title></head><body><h1>Hi</h1><a href="/page">Link</a></body></html>"#;
/// let base_url = Url::parse("https://example.com/").unwrap();
/// let parsed = parse_html(html, &base_url);
/// assert_eq!(parsed.title, Some("Test".to_string()));
/// assert_eq!(parsed.headings, vec!["Hi".to_string()]);
/// assert_eq!(parsed.links, vec!["https://example.com/page".to_string()]);
/// ```
pub fn parse_html(html: &str, base_url: &Url) -> ParsedPage {
    let document = Html::parse_document(html);

    ParsedPage {
        title: extract_title(&document),
        meta_description: extract_meta_description(&document),
        headings: extract_headings(&document),
        links: extract_links(&document, base_url),
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Extracts the page title from the HTML document
fn extract_title(document: &Html) -> Option<String> {
    let title_selector = Selector::parse("title").ok()?;

    document
        .select(&title_selector)
        .next()
        .map(|element| collapse_whitespace(&element.text().collect::<String>()))
        .filter(|s| !s.is_empty())
}

fn extract_meta_description(document: &Html) -> Option<String> {
    let selector = Selector::parse("meta[name]").ok()?;

    document
        .select(&selector)
        .find(|element| {
            element
                .value()
                .attr("name")
                .is_some_and(|name| name.eq_ignore_ascii_case("description"))
        })
        .and_then(|element| element.value().attr("content"))
        .map(collapse_whitespace)
        .filter(|s| !s.is_empty())
}

fn extract_headings(document: &Html) -> Vec<String> {
    let Ok(selector) = Selector::parse("h1") else {
        return Vec::new();
    };

    document
        .select(&selector)
        .map(|element| collapse_whitespace(&element.text().collect::<String>()))
        .filter(|s| !s.is_empty())
        .collect()
}

/// Extracts all valid links from the HTML document
fn extract_links(document: &Html, base_url: &Url) -> Vec<String> {
    let mut links: Vec<String> = Vec::new();

    let Ok(a_selector) = Selector::parse("a[href]") else {
        return links;
    };

    for element in document.select(&a_selector) {
        if element.value().attr("download").is_some() {
            continue;
        }

        if let Some(absolute_url) = element
            .value()
            .attr("href")
            .and_then(|href| resolve_link(href, base_url))
        {
            if !links.contains(&absolute_url) {
                links.push(absolute_url);
            }
        }
    }

    links
}

/// Resolves a link href to an absolute URL and validates it
///
/// Returns None if the link should be excluded.
pub fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lower = href.to_ascii_lowercase();
    if ["javascript:", "mailto:", "tel:", "data:"]
        .iter()
        .any(|scheme| lower.starts_with(scheme))
    {
        return None;
    }

    let mut absolute_url = base_url.join(href).ok()?;
    if absolute_url.scheme() != "http" && absolute_url.scheme() != "https" {
        return None;
    }
    absolute_url.set_fragment(None);
    Some(absolute_url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_url() -> Url {
        Url::parse("https://example.com/page").unwrap()
    }

    #[test]
    fn test_extract_title_with_whitespace() {
        let html = r#"<html><head><title>  Test
            Page  </title></head><body></body></html>"#;
        assert_eq!(parse_html(html, &base_url()).title, Some("Test Page".to_string()));
    }

    #[test]
    fn test_no_title() {
        let html = r#"<html><head></head><body></body></html>"#;
        assert_eq!(parse_html(html, &base_url()).title, None);
    }

    #[test]
    fn test_meta_description() {
        let html = r#"<html><head><meta name="Description" content=" About us "></head></html>"#;
        assert_eq!(
            parse_html(html, &base_url()).meta_description,
            Some("About us".to_string())
        );

        let html = r#"<html><head><meta name="keywords" content="a, b"></head></html>"#;
        assert_eq!(parse_html(html, &base_url()).meta_description, None);
    }

    #[test]
    fn test_multiple_headings() {
        let html = r#"<body><h1>First</h1><h2>Sub</h2><h1> Second <em>part</em></h1><h1> </h1></body>"#;
        assert_eq!(
            parse_html(html, &base_url()).headings,
            vec!["First".to_string(), "Second part".to_string()]
        );
    }

    #[test]
    fn test_extract_relative_and_absolute_links() {
        let html = r#"<body><a href="/other">A</a><a href="https://other.com/page#x">B</a></body>"#;
        let parsed = parse_html(html, &base_url());
        assert_eq!(
            parsed.links,
            vec![
                "https://example.com/other".to_string(),
                "https://other.com/page".to_string()
            ]
        );
    }

    #[test]
    fn test_skipped_links() {
        let html = r##"<body>
            <a href="javascript:void(0)">js</a>
            <a href="MAILTO:test@example.com">mail</a>
            <a href="tel:+1234567890">tel</a>
            <a href="data:text/html,hi">data</a>
            <a href="#section">anchor</a>
            <a href="/file.pdf" download>dl</a>
            <a href="ftp://files.example.com/">ftp</a>
        </body>"##;
        assert!(parse_html(html, &base_url()).links.is_empty());
    }

    #[test]
    fn test_duplicate_links_collapsed() {
        let html = r#"<body><a href="/a">1</a><a href="/a#top">2</a><a href="/a">3</a></body>"#;
        assert_eq!(parse_html(html, &base_url()).links.len(), 1);
    }
}
