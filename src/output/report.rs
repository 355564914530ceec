//! Final report assembly
//!
//! Merges the persisted crawl findings with the external verification outcome
//! and fills in the summary numbers that depend on both.

use crate::findings::{CheckKind, CheckValue, KeywordCount, Report};
use crate::verifier::VerificationOutcome;
use std::collections::HashMap;

/// Number of keywords kept in the summary
pub const TOP_KEYWORDS: usize = 10;

/// Shortest token counted as a keyword
const MIN_KEYWORD_LEN: usize = 3;

const STOPWORDS: &[&str] = &[
    "a", "about", "after", "all", "also", "an", "and", "any", "are", "as", "at", "be", "been",
    "but", "by", "can", "for", "from", "has", "have", "her", "his", "how", "if", "in", "into",
    "is", "it", "its", "more", "most", "my", "new", "no", "not", "of", "on", "or", "our", "out",
    "so", "than", "that", "the", "their", "them", "then", "there", "these", "they", "this", "to",
    "up", "us", "was", "we", "were", "what", "when", "where", "which", "who", "why", "will",
    "with", "you", "your", "home", "page", "welcome",
];

/// Builds the final report
///
/// # Arguments
///
/// * `persisted` - The report checkpointed after crawl interpretation
/// * `outcome` - External link verification results
pub fn assemble_report(persisted: Report, outcome: VerificationOutcome) -> Report {
    let mut report = persisted;

    report.summary.external_links = outcome.external_links.counts();
    report.summary.external_links_checked = outcome.stats.urls_checked;
    report.summary.internal_links = report.internal_links.counts();
    report.summary.top_keywords = top_keywords(&report, TOP_KEYWORDS);
    report.external_links = outcome.external_links;
    report.verification = Some(outcome.stats);

    report
}

/// Counts the most frequent non-stopword tokens across titles and headings
///
/// Ties are broken alphabetically so the result is stable.
pub fn top_keywords(report: &Report, limit: usize) -> Vec<KeywordCount> {
    let mut counts: HashMap<String, usize> = HashMap::new();

    let texts = report
        .pages
        .values()
        .flatten()
        .filter(|check| matches!(check.check, CheckKind::Title | CheckKind::H1Heading))
        .filter_map(|check| check.value.as_ref())
        .flat_map(|value| match value {
            CheckValue::Text(text) => vec![text.as_str()],
            CheckValue::List(items) => items.iter().map(String::as_str).collect(),
        });

    for text in texts {
        for token in tokenize(text) {
            *counts.entry(token).or_default() += 1;
        }
    }

    let mut ranked: Vec<KeywordCount> = counts
        .into_iter()
        .map(|(keyword, count)| KeywordCount { keyword, count })
        .collect();
    ranked.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.keyword.cmp(&b.keyword)));
    ranked.truncate(limit);
    ranked
}

fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .map(str::to_lowercase)
        .filter(|token| token.chars().count() >= MIN_KEYWORD_LEN)
        .filter(|token| !token.chars().all(|c| c.is_ascii_digit()))
        .filter(|token| !STOPWORDS.contains(&token.as_str()))
}
