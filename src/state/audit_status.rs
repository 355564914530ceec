/// Audit lifecycle states
///
/// An audit moves `Pending -> AnalyzingExternal -> Complete`. `Failed`,
/// `Error` and `Partial` can be reached from either non-terminal state.
/// Transitions only move forward; terminal states accept no further writes.
use serde::{Deserialize, Serialize};
use std::fmt;

/// Represents the current state of an audit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditStatus {
    // ===== Active States =====
    /// Audit accepted, crawl not yet finished
    Pending,

    /// Internal findings persisted, external links being verified
    AnalyzingExternal,

    // ===== Terminal States =====
    /// Report assembled and stored
    Complete,

    /// The audited website could not be analyzed
    Failed,

    /// The audit machinery itself failed
    Error,

    /// The crawl was cut short; whatever was stored is all there is
    Partial,
}

impl AuditStatus {
    /// Returns true if this is a terminal state (no further writes allowed)
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending | Self::AnalyzingExternal)
    }

    /// Returns true if this is a failure outcome
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed | Self::Error | Self::Partial)
    }

    /// Returns true if an audit in this state may move to `next`
    pub fn can_transition_to(&self, next: AuditStatus) -> bool {
        match self {
            Self::Pending => next != Self::Pending,
            Self::AnalyzingExternal => !matches!(next, Self::Pending | Self::AnalyzingExternal),
            _ => false,
        }
    }

    /// Converts the status to its database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::AnalyzingExternal => "ANALYZING_EXTERNAL",
            Self::Complete => "COMPLETE",
            Self::Failed => "FAILED",
            Self::Error => "ERROR",
            Self::Partial => "PARTIAL",
        }
    }

    /// Parses a status from its database string representation
    ///
    /// Returns None if the string doesn't match any known status.
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(Self::Pending),
            "ANALYZING_EXTERNAL" => Some(Self::AnalyzingExternal),
            "COMPLETE" => Some(Self::Complete),
            "FAILED" => Some(Self::Failed),
            "ERROR" => Some(Self::Error),
            "PARTIAL" => Some(Self::Partial),
            _ => None,
        }
    }

    /// Returns all audit statuses
    pub fn all_states() -> [Self; 6] {
        [
            Self::Pending,
            Self::AnalyzingExternal,
            Self::Complete,
            Self::Failed,
            Self::Error,
            Self::Partial,
        ]
    }
}

impl fmt::Display for AuditStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}
