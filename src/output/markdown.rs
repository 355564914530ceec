//! Markdown report generation
//!
//! This module renders a stored audit as a human-readable markdown document,
//! including summary numbers, page findings, and categorized link errors.

use crate::findings::{CheckValue, LinkBuckets, LinkCategory};
use crate::storage::AuditRecord;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Maximum number of links listed per category
const MAX_LISTED_LINKS: usize = 50;

/// Writes a markdown rendering of an audit
///
/// # Arguments
///
/// * `audit` - The stored audit
/// * `output_path` - Path where the markdown file should be written
pub fn write_markdown_report(audit: &AuditRecord, output_path: &Path) -> std::io::Result<()> {
    let markdown = format_markdown_report(audit);

    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    Ok(())
}

fn category_title(category: LinkCategory) -> &'static str {
    match category {
        LinkCategory::Broken => "Broken",
        LinkCategory::Permission => "Permission Denied",
        LinkCategory::Method => "Method Not Allowed",
        LinkCategory::OtherClientError => "Other Client Errors",
        LinkCategory::Unreachable => "Unreachable",
    }
}

fn push_link_section(md: &mut String, heading: &str, links: &LinkBuckets) {
    md.push_str(&format!("## {}\n\n", heading));

    if links.is_empty() {
        md.push_str("No problems found.\n\n");
        return;
    }

    for category in LinkCategory::all() {
        let findings = links.bucket(category);
        if findings.is_empty() {
            continue;
        }

        md.push_str(&format!("### {} ({})\n\n", category_title(category), findings.len()));
        md.push_str("| URL | Status | Linked From |\n");
        md.push_str("|-----|--------|-------------|\n");
        for finding in findings.iter().take(MAX_LISTED_LINKS) {
            let status = match finding.status.code() {
                -1 => "unreachable".to_string(),
                code => code.to_string(),
            };
            md.push_str(&format!(
                "| {} | {} | {} |\n",
                finding.url,
                status,
                finding.source_urls.join("<br>")
            ));
        }
        if findings.len() > MAX_LISTED_LINKS {
            md.push_str(&format!("\n... and {} more\n", findings.len() - MAX_LISTED_LINKS));
        }
        md.push('\n');
    }
}

/// Formats an audit as markdown
pub fn format_markdown_report(audit: &AuditRecord) -> String {
    let mut md = String::new();

    md.push_str(&format!("# Site Audit: {}\n\n", audit.url));

    md.push_str("## Audit Information\n\n");
    md.push_str(&format!("- **Audit ID**: {}\n", audit.id));
    md.push_str(&format!("- **Status**: {}\n", audit.status));
    md.push_str(&format!("- **Started**: {}\n", audit.created_at.to_rfc3339()));
    if let Some(completed) = audit.completed_at {
        md.push_str(&format!("- **Completed**: {}\n", completed.to_rfc3339()));
        md.push_str(&format!(
            "- **Duration**: {} seconds\n",
            (completed - audit.created_at).num_seconds()
        ));
    }
    if let Some(message) = &audit.error_message {
        md.push_str(&format!("- **Error**: {}\n", message));
    }
    md.push('\n');

    let Some(report) = &audit.report else {
        md.push_str("No report available.\n");
        return md;
    };
    let summary = &report.summary;

    md.push_str("## Summary\n\n");
    md.push_str("| Metric | Count |\n");
    md.push_str("|--------|-------|\n");
    md.push_str(&format!("| Pages Analyzed | {} |\n", summary.pages_analyzed));
    md.push_str(&format!("| Missing Title | {} |\n", summary.pages_missing_title));
    md.push_str(&format!(
        "| Missing Meta Description | {} |\n",
        summary.pages_missing_meta_description
    ));
    md.push_str(&format!("| Missing H1 | {} |\n", summary.headings.missing));
    md.push_str(&format!("| Multiple H1 | {} |\n", summary.headings.multiple));
    md.push_str(&format!("| Internal Link Errors | {} |\n", summary.internal_links.total));
    md.push_str(&format!(
        "| External Links Checked | {} of {} |\n",
        summary.external_links_checked, summary.external_links_discovered
    ));
    md.push_str(&format!(
        "| External Link Errors | {} |\n\n",
        summary.external_links.total
    ));

    if !summary.top_keywords.is_empty() {
        md.push_str("## Top Keywords\n\n");
        for keyword in &summary.top_keywords {
            md.push_str(&format!("- {} ({})\n", keyword.keyword, keyword.count));
        }
        md.push('\n');
    }

    // Only pages with at least one failing check are listed
    let failing: Vec<_> = report
        .pages
        .iter()
        .filter(|(_, checks)| checks.iter().any(|c| !c.is_success()))
        .collect();
    if !failing.is_empty() {
        md.push_str("## Page Issues\n\n");
        for (url, checks) in failing {
            md.push_str(&format!("### {}\n\n", url));
            for check in checks.iter().filter(|c| !c.is_success()) {
                match &check.value {
                    Some(CheckValue::List(values)) => {
                        md.push_str(&format!("- {}: {}\n", check.message, values.join(", ")))
                    }
                    _ => md.push_str(&format!("- {}\n", check.message)),
                }
            }
            md.push('\n');
        }
    }

    push_link_section(&mut md, "Internal Links", &report.internal_links);
    push_link_section(&mut md, "External Links", &report.external_links);

    if let Some(verification) = &report.verification {
        md.push_str("## Verification\n\n");
        md.push_str(&format!("- **Profile**: {}\n", verification.profile));
        md.push_str(&format!(
            "- **Chunks**: {} total, {} succeeded, {} failed, {} timed out\n",
            verification.chunks_total,
            verification.chunks_succeeded,
            verification.chunks_failed,
            verification.chunks_timed_out
        ));
        md.push_str(&format!(
            "- **Suppressed False Positives**: {}\n",
            verification.suppressed
        ));
    }

    md
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::findings::{check_headings, check_meta_description, check_title, LinkFinding, LinkStatus, Report};
    use crate::state::AuditStatus;
    use chrono::Utc;

    fn audit(report: Option<Report>) -> AuditRecord {
        AuditRecord {
            id: 7,
            url: "https://example.com/".to_string(),
            status: AuditStatus::Complete,
            report,
            created_at: Utc::now(),
            completed_at: Some(Utc::now()),
            user_id: None,
            request_id: None,
            error_message: None,
            technical_error: None,
        }
    }

    #[test]
    fn test_format_without_report() {
        let md = format_markdown_report(&audit(None));
        assert!(md.contains("# Site Audit: https://example.com/"));
        assert!(md.contains("- **Audit ID**: 7"));
        assert!(md.contains("No report available."));
    }

    #[test]
    fn test_format_lists_failures() {
        let mut report = Report::default();
        report.pages.insert(
            "https://example.com/".to_string(),
            vec![
                check_title(Some("Home")),
                check_meta_description(None),
                check_headings(&["A".to_string(), "B".to_string()]),
            ],
        );
        report.external_links.insert(LinkFinding::new(
            "https://gone.example.org/",
            LinkStatus::Unreachable,
            vec!["https://example.com/".to_string()],
        ));

        let md = format_markdown_report(&audit(Some(report)));
        assert!(md.contains("- Missing meta description"));
        assert!(md.contains("Multiple H1 headings found (2): A, B"));
        assert!(md.contains("### Unreachable (1)"));
        assert!(md.contains("| https://gone.example.org/ | unreachable | https://example.com/ |"));
        assert!(md.contains("## Internal Links\n\nNo problems found."));
    }

    #[test]
    fn test_write_markdown_report() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.md");
        write_markdown_report(&audit(None), &path).unwrap();
        assert!(std::fs::read_to_string(&path).unwrap().starts_with("# Site Audit"));
    }
}
