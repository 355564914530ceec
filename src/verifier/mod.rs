//! External link verification module
//!
//! This module checks every external link target found during a crawl:
//! - Politeness profile selection from the target mix
//! - Domain-interleaved chunking
//! - Per-host throttling
//! - HEAD probing with GET fallback
//! - Bounded, isolated, deadline-limited chunk execution

mod chunk;
mod engine;
mod probe;
mod profile;
mod throttle;

pub use chunk::{build_chunks, interleave_by_domain, ChunkState, VerificationChunk};
pub use engine::{LinkVerifier, VerificationOutcome};
pub use probe::{LinkProber, ProbeOutcome};
pub use profile::{PolitenessProfile, ProbeSettings};
pub use throttle::DomainThrottle;
