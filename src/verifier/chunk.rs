//! Domain-interleaved chunking of link targets

use crate::findings::LinkTarget;
use crate::url::domain_key_str;
use serde::Serialize;
use std::collections::{HashMap, VecDeque};

/// Lifecycle of one verification chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkState {
    Pending,
    Running,
    Succeeded,
    Failed,
    TimedOut,
}

/// A bounded batch of unique targets probed by one worker
#[derive(Debug, Clone)]
pub struct VerificationChunk {
    pub index: usize,
    pub targets: Vec<LinkTarget>,
    pub state: ChunkState,
}

impl VerificationChunk {
    /// File name of this chunk's result artifact
    pub fn artifact_name(&self) -> String {
        format!("chunk-{:03}.jsonl", self.index)
    }
}

/// Orders targets so consecutive entries rotate through hosts
///
/// Hosts are visited in first-seen order; each round takes the next target
/// from every host that still has one.
pub fn interleave_by_domain(targets: Vec<LinkTarget>) -> Vec<LinkTarget> {
    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, VecDeque<LinkTarget>> = HashMap::new();

    for target in targets {
        let domain = domain_key_str(&target.url);
        groups
            .entry(domain.clone())
            .or_insert_with(|| {
                order.push(domain);
                VecDeque::new()
            })
            .push_back(target);
    }

    let total: usize = groups.values().map(VecDeque::len).sum();
    let mut interleaved = Vec::with_capacity(total);
    while interleaved.len() < total {
        for domain in &order {
            if let Some(target) = groups.get_mut(domain).and_then(VecDeque::pop_front) {
                interleaved.push(target);
            }
        }
    }
    interleaved
}

/// Splits targets into chunks of at most `chunk_size`
///
/// Targets are interleaved by host and then dealt round-robin, so each
/// host's URLs are spread across chunks instead of piling into one. Empty
/// chunks are never returned.
pub fn build_chunks(targets: Vec<LinkTarget>, chunk_size: usize) -> Vec<VerificationChunk> {
    let chunk_size = chunk_size.max(1);
    let interleaved = interleave_by_domain(targets);
    let chunk_count = interleaved.len().div_ceil(chunk_size);

    let mut chunks: Vec<VerificationChunk> = (0..chunk_count)
        .map(|index| VerificationChunk {
            index,
            targets: Vec::new(),
            state: ChunkState::Pending,
        })
        .collect();

    for (position, target) in interleaved.into_iter().enumerate() {
        chunks[position % chunk_count].targets.push(target);
    }

    chunks.retain(|chunk| !chunk.targets.is_empty());
    chunks
}
