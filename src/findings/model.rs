//! Report data model
//!
//! Everything here is serialized into the persisted report JSON. The report
//! never carries the audit id or status; those live on the audit record.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;

/// On-page checks run for every analyzed page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckKind {
    Title,
    MetaDescription,
    H1Heading,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CheckStatus {
    Success,
    Failure,
}

/// The value a check observed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CheckValue {
    Text(String),
    List(Vec<String>),
}

/// Outcome of one check on one page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResult {
    pub check: CheckKind,
    pub status: CheckStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<CheckValue>,
    pub message: String,

    /// Number of headings seen; only set for the heading check
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
}

impl CheckResult {
    pub fn is_success(&self) -> bool {
        self.status == CheckStatus::Success
    }
}

/// Result of probing a link
///
/// Serialized as the HTTP status code, or `-1` when no response was received.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkStatus {
    Http(u16),
    Unreachable,
}

impl LinkStatus {
    /// Integer form used in reports
    pub fn code(&self) -> i32 {
        match self {
            Self::Http(code) => i32::from(*code),
            Self::Unreachable => -1,
        }
    }

    /// True for 4xx/5xx responses and unreachable links
    pub fn is_error(&self) -> bool {
        match self {
            Self::Http(code) => *code >= 400,
            Self::Unreachable => true,
        }
    }

    /// True when the HEAD result should be retried with GET
    pub fn needs_fallback(&self) -> bool {
        match self {
            Self::Http(code) => (400..500).contains(code),
            Self::Unreachable => true,
        }
    }
}

impl Serialize for LinkStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i32(self.code())
    }
}

impl<'de> Deserialize<'de> for LinkStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let code = i64::deserialize(deserializer)?;
        match u16::try_from(code) {
            Ok(code) => Ok(Self::Http(code)),
            Err(_) if code < 0 => Ok(Self::Unreachable),
            Err(_) => Err(serde::de::Error::custom(format!(
                "status code out of range: {}",
                code
            ))),
        }
    }
}

/// Link error categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkCategory {
    Broken,
    Permission,
    Method,
    OtherClientError,
    Unreachable,
}

impl LinkCategory {
    /// Categorizes a final link status
    ///
    /// Returns None for statuses that are not link errors (2xx, 3xx, 1xx and
    /// anything outside the HTTP range).
    pub fn from_status(status: LinkStatus) -> Option<Self> {
        match status {
            LinkStatus::Unreachable => Some(Self::Unreachable),
            LinkStatus::Http(404) | LinkStatus::Http(410) => Some(Self::Broken),
            LinkStatus::Http(403) => Some(Self::Permission),
            LinkStatus::Http(405) => Some(Self::Method),
            LinkStatus::Http(code) if (400..500).contains(&code) => Some(Self::OtherClientError),
            LinkStatus::Http(code) if (500..600).contains(&code) => Some(Self::Broken),
            LinkStatus::Http(_) => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Broken => "broken",
            Self::Permission => "permission",
            Self::Method => "method",
            Self::OtherClientError => "other_client_error",
            Self::Unreachable => "unreachable",
        }
    }

    pub fn all() -> [Self; 5] {
        [
            Self::Broken,
            Self::Permission,
            Self::Method,
            Self::OtherClientError,
            Self::Unreachable,
        ]
    }
}

/// A link that failed verification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkFinding {
    pub url: String,
    pub status: LinkStatus,

    /// Every distinct page that links here, in discovery order
    #[serde(
        default,
        alias = "source_url",
        deserialize_with = "deserialize_one_or_many"
    )]
    pub source_urls: Vec<String>,
}

impl LinkFinding {
    pub fn new(url: impl Into<String>, status: LinkStatus, source_urls: Vec<String>) -> Self {
        Self {
            url: url.into(),
            status,
            source_urls,
        }
    }

    pub fn category(&self) -> Option<LinkCategory> {
        LinkCategory::from_status(self.status)
    }
}

/// Accepts either a single string or a list of strings
///
/// Older reports stored one referring page under `source_url`.
fn deserialize_one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
        Null(()),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(url) if url.is_empty() => Vec::new(),
        OneOrMany::One(url) => vec![url],
        OneOrMany::Many(urls) => urls,
        OneOrMany::Null(()) => Vec::new(),
    })
}

/// Per-category link counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkCounts {
    pub broken: usize,
    pub permission: usize,
    pub method: usize,
    pub other_client_error: usize,
    pub unreachable: usize,
    pub total: usize,
}

/// The five categorized link buckets
///
/// All five are always serialized, even when empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkBuckets {
    pub broken: Vec<LinkFinding>,
    pub permission: Vec<LinkFinding>,
    pub method: Vec<LinkFinding>,
    pub other_client_error: Vec<LinkFinding>,
    pub unreachable: Vec<LinkFinding>,
}

impl LinkBuckets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bucket(&self, category: LinkCategory) -> &[LinkFinding] {
        match category {
            LinkCategory::Broken => &self.broken,
            LinkCategory::Permission => &self.permission,
            LinkCategory::Method => &self.method,
            LinkCategory::OtherClientError => &self.other_client_error,
            LinkCategory::Unreachable => &self.unreachable,
        }
    }

    fn bucket_mut(&mut self, category: LinkCategory) -> &mut Vec<LinkFinding> {
        match category {
            LinkCategory::Broken => &mut self.broken,
            LinkCategory::Permission => &mut self.permission,
            LinkCategory::Method => &mut self.method,
            LinkCategory::OtherClientError => &mut self.other_client_error,
            LinkCategory::Unreachable => &mut self.unreachable,
        }
    }

    /// Files a finding under its category
    ///
    /// Returns false (and drops the finding) if its status is not an error.
    pub fn insert(&mut self, finding: LinkFinding) -> bool {
        match finding.category() {
            Some(category) => {
                self.bucket_mut(category).push(finding);
                true
            }
            None => false,
        }
    }

    pub fn counts(&self) -> LinkCounts {
        let mut counts = LinkCounts {
            broken: self.broken.len(),
            permission: self.permission.len(),
            method: self.method.len(),
            other_client_error: self.other_client_error.len(),
            unreachable: self.unreachable.len(),
            total: 0,
        };
        counts.total = counts.broken
            + counts.permission
            + counts.method
            + counts.other_client_error
            + counts.unreachable;
        counts
    }

    pub fn is_empty(&self) -> bool {
        self.counts().total == 0
    }

    /// Iterates over every finding with its category
    pub fn iter(&self) -> impl Iterator<Item = (LinkCategory, &LinkFinding)> {
        LinkCategory::all()
            .into_iter()
            .flat_map(move |category| self.bucket(category).iter().map(move |f| (category, f)))
    }
}

/// How many pages had zero, one, or several H1 headings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeadingDistribution {
    pub missing: usize,
    pub single: usize,
    pub multiple: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordCount {
    pub keyword: String,
    pub count: usize,
}

/// Headline numbers for a report
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportSummary {
    pub pages_analyzed: usize,
    pub pages_with_title: usize,
    pub pages_missing_title: usize,
    pub pages_with_meta_description: usize,
    pub pages_missing_meta_description: usize,
    pub headings: HeadingDistribution,
    pub internal_links: LinkCounts,
    pub external_links: LinkCounts,
    pub external_links_discovered: usize,
    pub external_links_checked: usize,
    pub top_keywords: Vec<KeywordCount>,
}

/// Bookkeeping from the external verification run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerificationStats {
    pub profile: String,
    pub urls_discovered: usize,
    pub urls_checked: usize,
    pub urls_excluded: usize,
    pub chunks_total: usize,
    pub chunks_succeeded: usize,
    pub chunks_failed: usize,
    pub chunks_timed_out: usize,
    pub suppressed: usize,
}

/// The persisted audit report
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Report {
    pub summary: ReportSummary,

    /// Per-page check results keyed by page URL
    pub pages: BTreeMap<String, Vec<CheckResult>>,

    pub internal_links: LinkBuckets,
    pub external_links: LinkBuckets,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification: Option<VerificationStats>,
}
