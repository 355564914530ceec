//! Politeness profiles for link verification

use crate::config::VerifierConfig;
use crate::findings::{is_auth_sensitive, LinkTarget};
use crate::url::domain_key_str;
use std::collections::HashSet;
use std::time::Duration;

/// How hard the verifier may push on the linked hosts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PolitenessProfile {
    /// Auth-sensitive targets present: slow, single-flight, retried, browser headers
    Gentle,
    /// All targets on one host: slow and single-flight
    Conservative,
    /// Many hosts, nothing sensitive: faster, two requests per host
    Aggressive,
}

impl PolitenessProfile {
    /// Picks a profile for a batch of targets
    ///
    /// Any auth-sensitive URL forces `Gentle`; otherwise a single distinct
    /// host means `Conservative` and anything else `Aggressive`.
    pub fn for_targets(targets: &[LinkTarget]) -> Self {
        if targets.iter().any(|t| is_auth_sensitive(&t.url)) {
            return Self::Gentle;
        }

        let domains: HashSet<String> = targets.iter().map(|t| domain_key_str(&t.url)).collect();
        if domains.len() <= 1 {
            Self::Conservative
        } else {
            Self::Aggressive
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gentle => "gentle",
            Self::Conservative => "conservative",
            Self::Aggressive => "aggressive",
        }
    }
}

impl std::fmt::Display for PolitenessProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Concrete request settings derived from a profile
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeSettings {
    pub profile: PolitenessProfile,

    /// Minimum spacing between requests to one host
    pub delay: Duration,

    /// Concurrent requests allowed per host
    pub per_domain: usize,

    /// Timeout for a single request
    pub request_timeout: Duration,

    /// Extra attempts after a transient failure
    pub retries: u32,

    /// Send browser-style headers instead of the crawler's own
    pub browser_headers: bool,
}

impl ProbeSettings {
    pub fn new(profile: PolitenessProfile, config: &VerifierConfig) -> Self {
        let base_timeout = Duration::from_secs(config.request_timeout_secs);
        match profile {
            PolitenessProfile::Gentle => Self {
                profile,
                delay: Duration::from_millis(config.gentle_delay_ms),
                per_domain: 1,
                request_timeout: base_timeout * 2,
                retries: config.gentle_retries,
                browser_headers: true,
            },
            PolitenessProfile::Conservative => Self {
                profile,
                delay: Duration::from_millis(config.conservative_delay_ms),
                per_domain: 1,
                request_timeout: base_timeout,
                retries: 0,
                browser_headers: false,
            },
            PolitenessProfile::Aggressive => Self {
                profile,
                delay: Duration::from_millis(config.aggressive_delay_ms),
                per_domain: 2,
                request_timeout: base_timeout,
                retries: 0,
                browser_headers: false,
            },
        }
    }
}
