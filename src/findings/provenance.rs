use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A link target together with every page that references it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkTarget {
    pub url: String,
    pub sources: Vec<String>,
}

/// Insertion-ordered map from link target to its referring pages
///
/// Targets keep the order in which they were first seen, and each target's
/// sources are deduplicated while keeping first-seen order.
#[derive(Debug, Clone, Default)]
pub struct ProvenanceMap {
    targets: Vec<LinkTarget>,
    index: HashMap<String, usize>,
}

impl ProvenanceMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `source` links to `target`
    ///
    /// An empty `source` only registers the target.
    pub fn add(&mut self, target: &str, source: &str) {
        let slot = match self.index.get(target) {
            Some(&slot) => slot,
            None => {
                self.targets.push(LinkTarget {
                    url: target.to_string(),
                    sources: Vec::new(),
                });
                self.index.insert(target.to_string(), self.targets.len() - 1);
                self.targets.len() - 1
            }
        };

        let sources = &mut self.targets[slot].sources;
        if !source.is_empty() && !sources.iter().any(|s| s == source) {
            sources.push(source.to_string());
        }
    }

    /// Returns the referring pages for `target`, or an empty slice
    pub fn sources(&self, target: &str) -> &[String] {
        self.index
            .get(target)
            .map(|&slot| self.targets[slot].sources.as_slice())
            .unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn into_targets(self) -> Vec<LinkTarget> {
        self.targets
    }
}
