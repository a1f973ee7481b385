//! Curation-related event payload types

use serde::{Deserialize, Serialize};

/// Step a candidate is currently in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateStage {
    /// Fetching the clip and asking for a description
    Describing,
    /// Screening the description for copyright-sensitive mentions
    Moderating,
}

/// Why a candidate did not make it into the results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionReason {
    /// Media fetch or description call failed
    DescribeFailed,
    /// Moderator flagged a violation
    ViolationDetected,
    /// Moderation call failed and the policy rejects on error
    ModerationFailed,
}

impl RejectionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectionReason::DescribeFailed => "describe_failed",
            RejectionReason::ViolationDetected => "violation_detected",
            RejectionReason::ModerationFailed => "moderation_failed",
        }
    }
}
