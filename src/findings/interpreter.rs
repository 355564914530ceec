//! Turns raw crawl records into page findings and internal link errors

use super::false_positive::FalsePositiveFilter;
use super::model::{
    CheckKind, CheckResult, CheckStatus, CheckValue, HeadingDistribution, LinkBuckets,
    LinkFinding, LinkStatus, Report, ReportSummary,
};
use super::provenance::{LinkTarget, ProvenanceMap};
use crate::crawler::PageRecord;
use crate::url::is_internal_url;
use std::collections::HashSet;
use url::Url;

/// Output of interpreting a crawl
#[derive(Debug, Clone)]
pub struct Interpretation {
    /// Report with page findings and internal links filled in
    pub report: Report,

    /// External link targets in discovery order, with every referring page
    pub external_targets: Vec<LinkTarget>,

    /// Internal link errors dropped as false positives
    pub suppressed: usize,
}

fn text_check(kind: CheckKind, value: Option<&str>, label: &str) -> CheckResult {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(text) => CheckResult {
            check: kind,
            status: CheckStatus::Success,
            value: Some(CheckValue::Text(text.to_string())),
            message: format!("{} found", label),
            count: None,
        },
        None => CheckResult {
            check: kind,
            status: CheckStatus::Failure,
            value: None,
            message: format!("Missing {}", label.to_lowercase()),
            count: None,
        },
    }
}

/// Runs the title check
pub fn check_title(title: Option<&str>) -> CheckResult {
    text_check(CheckKind::Title, title, "Title")
}

/// Runs the meta description check
pub fn check_meta_description(meta: Option<&str>) -> CheckResult {
    text_check(CheckKind::MetaDescription, meta, "Meta description")
}

/// Runs the heading check
///
/// Exactly one non-empty H1 passes. None, or more than one, fails.
pub fn check_headings(headings: &[String]) -> CheckResult {
    let count = headings.len();
    let (status, value, message) = match count {
        0 => (CheckStatus::Failure, None, "No H1 heading found".to_string()),
        1 => (
            CheckStatus::Success,
            Some(CheckValue::Text(headings[0].clone())),
            "Single H1 heading found".to_string(),
        ),
        n => (
            CheckStatus::Failure,
            Some(CheckValue::List(headings.to_vec())),
            format!("Multiple H1 headings found ({})", n),
        ),
    };
    CheckResult {
        check: CheckKind::H1Heading,
        status,
        value,
        message,
        count: Some(count),
    }
}

/// Normalizes a discovered link target
///
/// Drops fragments and anything that is not http(s).
fn normalize_target(raw: &str, base: Option<&Url>) -> Option<Url> {
    let mut url = match base {
        Some(base) => base.join(raw.trim()).ok()?,
        None => Url::parse(raw.trim()).ok()?,
    };
    if url.scheme() != "http" && url.scheme() != "https" {
        return None;
    }
    url.set_fragment(None);
    Some(url)
}

/// Key under which a page's referring pages are recorded
fn page_key(url: &str) -> String {
    normalize_target(url, None)
        .map(String::from)
        .unwrap_or_else(|| url.to_string())
}

/// Interprets crawl records for the site at `site`
///
/// # Rules
///
/// - A record with no status and no title, meta description or heading is
///   filed as an unreachable internal link
/// - A record with status >= 400 is filed under its link category unless it
///   is a false positive
/// - Every other record gets the title, meta description and heading checks
/// - Outbound links on other hosts become external targets; their sources
///   are every page that links to them
pub fn interpret(records: &[PageRecord], site: &Url, filter: &FalsePositiveFilter) -> Interpretation {
    let mut internal_sources = ProvenanceMap::new();
    let mut external = ProvenanceMap::new();

    for record in records {
        if record.url.is_empty() {
            continue;
        }
        if let Some(referer) = record.referer_header.as_deref().filter(|r| !r.is_empty()) {
            internal_sources.add(&page_key(&record.url), referer);
        }

        let page = Url::parse(&record.url).ok();
        for link in record.link_values() {
            let Some(target) = normalize_target(&link, page.as_ref()) else {
                continue;
            };
            if is_internal_url(&target, site) {
                internal_sources.add(target.as_str(), &record.url);
            } else {
                external.add(target.as_str(), &record.url);
            }
        }
    }

    let mut report = Report::default();
    let mut internal_links = LinkBuckets::new();
    let mut summary = ReportSummary::default();
    let mut headings = HeadingDistribution::default();
    let mut suppressed = 0;
    let mut seen = HashSet::new();

    for record in records {
        if record.url.is_empty() || !seen.insert(record.url.as_str()) {
            continue;
        }
        let key = page_key(&record.url);
        let sources = || internal_sources.sources(&key).to_vec();

        match record.status {
            None if !record.has_content() => {
                internal_links.insert(LinkFinding::new(
                    &record.url,
                    LinkStatus::Unreachable,
                    sources(),
                ));
                continue;
            }
            Some(code) if code >= 400 => {
                let status = LinkStatus::Http(code);
                if filter.is_suppressed(&record.url, status) {
                    tracing::debug!(url = %record.url, code, "Suppressed internal link error");
                    suppressed += 1;
                } else {
                    internal_links.insert(LinkFinding::new(&record.url, status, sources()));
                }
                continue;
            }
            _ => {}
        }

        let title = check_title(record.title.as_deref());
        let meta = check_meta_description(record.meta_description.as_deref());
        let heading = check_headings(&record.heading_values());

        summary.pages_analyzed += 1;
        if title.is_success() {
            summary.pages_with_title += 1;
        } else {
            summary.pages_missing_title += 1;
        }
        if meta.is_success() {
            summary.pages_with_meta_description += 1;
        } else {
            summary.pages_missing_meta_description += 1;
        }
        match heading.count {
            Some(0) | None => headings.missing += 1,
            Some(1) => headings.single += 1,
            Some(_) => headings.multiple += 1,
        }

        report
            .pages
            .insert(record.url.clone(), vec![title, meta, heading]);
    }

    summary.headings = headings;
    summary.internal_links = internal_links.counts();
    if external.is_empty() {
        tracing::debug!("No external links discovered");
    }
    summary.external_links_discovered = external.len();
    report.summary = summary;
    report.internal_links = internal_links;

    Interpretation {
        report,
        external_targets: external.into_targets(),
        suppressed,
    }
}
