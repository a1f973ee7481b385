//! Core Types and Trait Definitions for inspo-curator
//!
//! Defines the data model that flows through a curation run and the two
//! capability traits the pipeline is polymorphic over:
//! - **Describer:** media clip → natural-language description
//! - **Moderator:** description → violation verdict
//!
//! Both capabilities are backed by a hosted generative model in production
//! (see `services::describer` and `services::moderator`), and by scripted
//! fakes in tests.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::services::media_source::MediaError;

// ============================================================================
// Data Model
// ============================================================================

/// A source clip considered during one curation run
///
/// Immutable once enumerated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CandidateItem {
    /// Display identifier (e.g. file name)
    pub identifier: String,
    /// Opaque reference resolved by a `MediaSource`
    pub media_ref: String,
}

impl CandidateItem {
    /// Create an item whose media reference equals its identifier
    pub fn new(identifier: impl Into<String>) -> Self {
        let identifier = identifier.into();
        Self {
            media_ref: identifier.clone(),
            identifier,
        }
    }

    pub fn with_media_ref(identifier: impl Into<String>, media_ref: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            media_ref: media_ref.into(),
        }
    }
}

/// Generated description of a candidate clip
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Description {
    pub source: CandidateItem,
    pub text: String,
}

/// Moderator verdict for one description
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ModerationVerdict {
    NoViolation,
    ViolationDetected,
}

impl ModerationVerdict {
    pub const NO_VIOLATION_TOKEN: &'static str = "NO_VIOLATION";
    pub const VIOLATION_TOKEN: &'static str = "VIOLATION_DETECTED";

    /// Map one of the two literal reply tokens to a verdict
    ///
    /// Surrounding whitespace, backticks and a trailing period are tolerated;
    /// anything else returns `None`.
    pub fn from_token(reply: &str) -> Option<Self> {
        let token = reply
            .trim()
            .trim_matches('`')
            .trim_end_matches('.')
            .trim();
        if token.eq_ignore_ascii_case(Self::VIOLATION_TOKEN) {
            Some(ModerationVerdict::ViolationDetected)
        } else if token.eq_ignore_ascii_case(Self::NO_VIOLATION_TOKEN) {
            Some(ModerationVerdict::NoViolation)
        } else {
            None
        }
    }

    pub fn is_violation(&self) -> bool {
        matches!(self, ModerationVerdict::ViolationDetected)
    }
}

/// Where an accepted result came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultKind {
    /// Generated by the curation pipeline and moderated
    Trending,
    /// Pre-vetted fallback content
    Popular,
}

/// Social proof shown next to popular prompts
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Popularity {
    pub friend_ids: Vec<String>,
    pub others: u64,
}

/// A prompt cleared for display
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AcceptedResult {
    pub kind: ResultKind,
    pub prompt_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_ref: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub popularity: Option<Popularity>,
}

impl AcceptedResult {
    pub fn trending(prompt_text: impl Into<String>, source_ref: impl Into<String>) -> Self {
        Self {
            kind: ResultKind::Trending,
            prompt_text: prompt_text.into(),
            source_ref: Some(source_ref.into()),
            popularity: None,
        }
    }

    pub fn popular(prompt_text: impl Into<String>, popularity: Option<Popularity>) -> Self {
        Self {
            kind: ResultKind::Popular,
            prompt_text: prompt_text.into(),
            source_ref: None,
            popularity,
        }
    }
}

/// Final shuffled set handed to the presentation layer
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResultSet {
    pub items: Vec<AcceptedResult>,
    pub trending_count: usize,
    pub popular_count: usize,
}

impl ResultSet {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Per-item describe failure (absorbed by the pipeline)
#[derive(Debug, Error)]
pub enum DescribeError {
    #[error("Media unavailable: {0}")]
    Media(#[from] MediaError),

    /// Backing service unreachable, rejected the request, or blocked output
    #[error("Description service error: {0}")]
    Service(String),

    #[error("Description service returned no text")]
    EmptyDescription,

    #[error("Description timed out after {0:?}")]
    Timeout(Duration),
}

/// Per-item moderation failure (handled by `ModerateErrorPolicy`)
#[derive(Debug, Error)]
pub enum ModerateError {
    #[error("Moderation service error: {0}")]
    Service(String),

    /// Reply was neither of the two verdict tokens
    #[error("Unexpected moderation reply: {0:?}")]
    UnexpectedVerdict(String),

    #[error("Moderation timed out after {0:?}")]
    Timeout(Duration),
}

/// Run-level failure
#[derive(Debug, Error)]
pub enum CurationError {
    /// Credential missing or client could not be built; nothing was attempted
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Moderation failed and the policy is `propagate`
    #[error("Moderation failed for {identifier}: {source}")]
    Moderation {
        identifier: String,
        #[source]
        source: ModerateError,
    },
}

// ============================================================================
// Capabilities
// ============================================================================

/// Produces a description for a candidate clip
///
/// One outbound request per call, no internal retries.
#[async_trait]
pub trait Describer: Send + Sync {
    /// Backend name for logs
    fn name(&self) -> &'static str;

    async fn describe(&self, item: &CandidateItem) -> Result<Description, DescribeError>;
}

/// Classifies a description as clean or violating
#[async_trait]
pub trait Moderator: Send + Sync {
    /// Backend name for logs
    fn name(&self) -> &'static str;

    async fn moderate(&self, description: &Description)
        -> Result<ModerationVerdict, ModerateError>;
}
