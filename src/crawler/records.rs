//! Fetched-page records and their on-disk JSON Lines form
//!
//! The crawl stage writes one record per fetched page to an artifact file in
//! the audit's work directory. The interpretation stage reads the artifact
//! and deletes it.

use serde::{Deserialize, Deserializer, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Separator used when several values are joined into one field
pub const MULTI_VALUE_SEPARATOR: &str = "@@";

/// A field that is either a delimiter-joined string or a native list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MultiValue {
    Joined(String),
    List(Vec<String>),
}

impl MultiValue {
    /// Returns the non-empty, trimmed values
    pub fn values(&self) -> Vec<String> {
        let raw: Vec<&str> = match self {
            Self::Joined(joined) => joined.split(MULTI_VALUE_SEPARATOR).collect(),
            Self::List(list) => list.iter().map(String::as_str).collect(),
        };
        raw.into_iter()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .collect()
    }
}

impl Default for MultiValue {
    fn default() -> Self {
        Self::List(Vec::new())
    }
}

impl From<Vec<String>> for MultiValue {
    fn from(values: Vec<String>) -> Self {
        Self::List(values)
    }
}

/// One fetched page
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageRecord {
    pub url: String,

    /// HTTP status, or None when no response was received
    #[serde(default, deserialize_with = "deserialize_lenient_status")]
    pub status: Option<u16>,

    #[serde(default)]
    pub title: Option<String>,

    #[serde(default, alias = "meta_desc", alias = "meta_description")]
    pub meta_description: Option<String>,

    #[serde(default, alias = "h1")]
    pub headings: Option<MultiValue>,

    #[serde(
        default,
        alias = "request_headers_Referer",
        alias = "referer",
        alias = "referer_header"
    )]
    pub referer_header: Option<String>,

    /// Outbound link targets found on the page
    #[serde(default, alias = "links_url")]
    pub links: Option<MultiValue>,
}

impl PageRecord {
    /// True when the page carries any on-page content
    pub fn has_content(&self) -> bool {
        let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
        present(&self.title)
            || present(&self.meta_description)
            || self
                .headings
                .as_ref()
                .is_some_and(|h| !h.values().is_empty())
    }

    pub fn heading_values(&self) -> Vec<String> {
        self.headings
            .as_ref()
            .map(MultiValue::values)
            .unwrap_or_default()
    }

    pub fn link_values(&self) -> Vec<String> {
        self.links
            .as_ref()
            .map(MultiValue::values)
            .unwrap_or_default()
    }
}

/// Accepts an integer, a float, a numeric string, or null
fn deserialize_lenient_status<'de, D>(deserializer: D) -> Result<Option<u16>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawStatus {
        Int(i64),
        Float(f64),
        Text(String),
        Null(()),
    }

    Ok(match RawStatus::deserialize(deserializer)? {
        RawStatus::Int(code) => u16::try_from(code).ok().filter(|c| *c > 0),
        RawStatus::Float(code) if code.is_finite() && code > 0.0 && code < 65536.0 => {
            Some(code as u16)
        }
        RawStatus::Float(_) => None,
        RawStatus::Text(text) => text.trim().parse::<u16>().ok().filter(|c| *c > 0),
        RawStatus::Null(()) => None,
    })
}

/// Writes records as JSON Lines
pub fn write_records(path: &Path, records: &[PageRecord]) -> crate::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    for record in records {
        serde_json::to_writer(&mut writer, record)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}

/// Reads JSON Lines records, skipping blank lines
pub fn read_records(path: &Path) -> crate::Result<Vec<PageRecord>> {
    let reader = BufReader::new(File::open(path)?);
    let mut records = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        records.push(serde_json::from_str(&line)?);
    }
    Ok(records)
}

/// A crawl artifact file that is removed when dropped
///
/// Ensures the file is cleaned up on every exit path of the stages that
/// touch it.
#[derive(Debug)]
pub struct CrawlArtifact {
    path: PathBuf,
}

impl CrawlArtifact {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for CrawlArtifact {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(path = %self.path.display(), error = %e, "Failed to remove crawl artifact");
            }
        }
    }
}
