//! Concurrent verification of external links
//!
//! Targets are capped, split into domain-interleaved chunks, and probed by at
//! most `max-concurrent-chunks` workers. Each chunk writes its results to its
//! own artifact under a per-run temporary directory and runs under its own
//! timeout; the whole run is bounded by an overall deadline. One per-host
//! throttle is shared by all chunks. A chunk that fails or times out
//! contributes nothing, and the rest carry on.

use super::chunk::{build_chunks, ChunkState, VerificationChunk};
use super::probe::{LinkProber, ProbeOutcome};
use super::profile::{PolitenessProfile, ProbeSettings};
use super::throttle::DomainThrottle;
use crate::config::{Config, VerifierConfig};
use crate::crawler::build_http_client;
use crate::findings::{FalsePositiveFilter, LinkBuckets, LinkFinding, LinkTarget, VerificationStats};
use crate::url::domain_key_str;
use crate::AuditError;
use futures::{stream, StreamExt};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::Instrument;

/// Verified external links and how the run went
#[derive(Debug, Clone, Default)]
pub struct VerificationOutcome {
    pub external_links: LinkBuckets,
    pub stats: VerificationStats,
}

/// External link verification engine
#[derive(Debug, Clone)]
pub struct LinkVerifier {
    prober: Arc<LinkProber>,
    config: VerifierConfig,
    filter: FalsePositiveFilter,
    work_dir: PathBuf,
}

impl LinkVerifier {
    /// Creates a verifier sharing the crawler's HTTP settings
    pub fn new(config: &Config) -> Result<Self, AuditError> {
        let client = build_http_client(config)?;
        Ok(Self {
            prober: Arc::new(LinkProber::new(client)),
            config: config.verifier.clone(),
            filter: FalsePositiveFilter::new(config.verifier.ignore_domains.clone()),
            work_dir: PathBuf::from(&config.storage.work_dir),
        })
    }

    /// Verifies external link targets
    ///
    /// # Arguments
    ///
    /// * `targets` - Unique targets in discovery order, each with its referring pages
    ///
    /// # Returns
    ///
    /// * `Ok(outcome)` - Categorized errors plus run statistics; failed or
    ///   timed-out chunks reduce coverage but never fail the run
    /// * `Err(AuditError)` - The work directory could not be prepared
    pub async fn verify(&self, targets: Vec<LinkTarget>) -> Result<VerificationOutcome, AuditError> {
        let discovered = targets.len();
        let mut targets = targets;
        targets.truncate(self.config.max_urls);

        let profile = PolitenessProfile::for_targets(&targets);
        let mut stats = VerificationStats {
            profile: profile.to_string(),
            urls_discovered: discovered,
            urls_excluded: discovered - targets.len(),
            ..Default::default()
        };

        if stats.urls_excluded > 0 {
            tracing::info!(
                "Verifying first {} of {} external links",
                targets.len(),
                discovered
            );
        }
        if targets.is_empty() {
            return Ok(VerificationOutcome {
                external_links: LinkBuckets::new(),
                stats,
            });
        }

        let order: HashMap<String, usize> = targets
            .iter()
            .enumerate()
            .map(|(i, t)| (t.url.clone(), i))
            .collect();
        let sources: HashMap<String, Vec<String>> = targets
            .iter()
            .map(|t| (t.url.clone(), t.sources.clone()))
            .collect();

        std::fs::create_dir_all(&self.work_dir)?;
        let run_dir = tempfile::Builder::new()
            .prefix("verify-")
            .tempdir_in(&self.work_dir)?;

        let settings = ProbeSettings::new(profile, &self.config);
        let mut chunks = build_chunks(targets, self.config.chunk_size);
        stats.chunks_total = chunks.len();
        tracing::info!(
            profile = %profile,
            chunks = chunks.len(),
            "Starting external link verification"
        );

        self.run_chunks(&mut chunks, run_dir.path(), &settings).await;

        let mut outcomes: Vec<ProbeOutcome> = Vec::new();
        for chunk in &chunks {
            match chunk.state {
                ChunkState::Succeeded => {
                    match read_outcomes(&run_dir.path().join(chunk.artifact_name())).await {
                        Ok(mut lines) => {
                            stats.chunks_succeeded += 1;
                            outcomes.append(&mut lines);
                        }
                        Err(e) => {
                            tracing::warn!(chunk = chunk.index, "Unreadable chunk artifact: {}", e);
                            stats.chunks_failed += 1;
                        }
                    }
                }
                ChunkState::TimedOut => stats.chunks_timed_out += 1,
                _ => stats.chunks_failed += 1,
            }
        }

        outcomes.sort_by_key(|o| order.get(&o.url).copied().unwrap_or(usize::MAX));
        stats.urls_checked = outcomes.len();

        let mut external_links = LinkBuckets::new();
        for outcome in outcomes {
            if !outcome.status.is_error() {
                continue;
            }
            if self.filter.is_suppressed(&outcome.url, outcome.status) {
                tracing::debug!(url = %outcome.url, status = outcome.status.code(), "Suppressed false positive");
                stats.suppressed += 1;
                continue;
            }
            let referers = sources.get(&outcome.url).cloned().unwrap_or_default();
            external_links.insert(LinkFinding::new(outcome.url, outcome.status, referers));
        }

        tracing::info!(
            checked = stats.urls_checked,
            errors = external_links.counts().total,
            failed_chunks = stats.chunks_failed + stats.chunks_timed_out,
            "External link verification finished"
        );

        // run_dir drops here and takes every chunk artifact with it
        Ok(VerificationOutcome {
            external_links,
            stats,
        })
    }

    /// Runs all chunks, updating each chunk's state in place
    async fn run_chunks(&self, chunks: &mut [VerificationChunk], dir: &Path, settings: &ProbeSettings) {
        let limiter = Arc::new(Semaphore::new(self.config.max_concurrent_chunks.max(1)));
        let chunk_timeout = Duration::from_secs(self.config.chunk_timeout_secs);
        let deadline =
            tokio::time::Instant::now() + Duration::from_secs(self.config.overall_timeout_secs);
        let in_flight = self.config.in_flight_per_chunk.max(1);
        let throttle = Arc::new(DomainThrottle::new(settings.delay, settings.per_domain));

        let mut workers = JoinSet::new();
        for chunk in chunks.iter() {
            let limiter = Arc::clone(&limiter);
            let throttle = Arc::clone(&throttle);
            let prober = Arc::clone(&self.prober);
            let settings = settings.clone();
            let targets = chunk.targets.clone();
            let path = dir.join(chunk.artifact_name());
            let index = chunk.index;

            let task = async move {
                let Ok(_permit) = limiter.acquire_owned().await else {
                    return (index, ChunkState::Failed);
                };
                tracing::debug!(chunk = index, urls = targets.len(), "Chunk running");

                let work = run_chunk(prober, throttle, targets, &path, settings, in_flight);
                let state = match tokio::time::timeout(chunk_timeout, work).await {
                    Ok(Ok(checked)) => {
                        tracing::debug!(chunk = index, checked, "Chunk finished");
                        ChunkState::Succeeded
                    }
                    Ok(Err(e)) => {
                        tracing::warn!(chunk = index, "Chunk failed: {}", e);
                        ChunkState::Failed
                    }
                    Err(_) => {
                        tracing::warn!(chunk = index, "Chunk timed out after {:?}", chunk_timeout);
                        ChunkState::TimedOut
                    }
                };
                (index, state)
            };
            workers.spawn(task.instrument(tracing::Span::current()));
        }

        for chunk in chunks.iter_mut() {
            chunk.state = ChunkState::Running;
        }
        let mut finished: HashMap<usize, ChunkState> = HashMap::new();

        loop {
            match tokio::time::timeout_at(deadline, workers.join_next()).await {
                Ok(Some(Ok((index, state)))) => {
                    finished.insert(index, state);
                }
                // A panicked chunk never reports in and is counted as failed below
                Ok(Some(Err(e))) => tracing::warn!("Chunk task aborted: {}", e),
                Ok(None) => break,
                Err(_) => {
                    tracing::warn!(
                        unfinished = workers.len(),
                        "Verification deadline reached, keeping completed chunks"
                    );
                    workers.abort_all();
                    break;
                }
            }
        }

        for chunk in chunks.iter_mut() {
            chunk.state = finished.remove(&chunk.index).unwrap_or(ChunkState::Failed);
        }
    }
}

/// Probes one chunk's targets, appending each outcome to the artifact
///
/// `throttle` is shared by every chunk of the run, so per-host limits hold
/// across chunks.
async fn run_chunk(
    prober: Arc<LinkProber>,
    throttle: Arc<DomainThrottle>,
    targets: Vec<LinkTarget>,
    path: &Path,
    settings: ProbeSettings,
    in_flight: usize,
) -> Result<usize, AuditError> {
    let mut artifact = tokio::fs::File::create(path).await?;

    let mut probes = stream::iter(targets)
        .map(|target| {
            let prober = &prober;
            let throttle = throttle.as_ref();
            let settings = &settings;
            async move {
                let host = domain_key_str(&target.url);
                let _permit = throttle.acquire(&host).await;
                let outcome = prober.probe(&target.url, settings).await;
                if outcome.status.code() == 429 {
                    throttle.mark_rate_limited(&host);
                }
                outcome
            }
        })
        .buffer_unordered(in_flight);

    let mut checked = 0;
    while let Some(outcome) = probes.next().await {
        let mut line = serde_json::to_string(&outcome)?;
        line.push('\n');
        artifact.write_all(line.as_bytes()).await?;
        checked += 1;
    }
    artifact.flush().await?;

    Ok(checked)
}

/// Reads a chunk artifact, skipping lines that do not parse
async fn read_outcomes(path: &Path) -> Result<Vec<ProbeOutcome>, AuditError> {
    let content = tokio::fs::read_to_string(path).await?;
    Ok(content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| match serde_json::from_str(line) {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                tracing::warn!("Skipping malformed probe line: {}", e);
                None
            }
        })
        .collect())
}
