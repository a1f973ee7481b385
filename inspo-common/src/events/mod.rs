//! Event types for the inspo event system
//!
//! Provides shared event definitions and the EventBus used to stream curation
//! progress to connected clients.

mod curation_types;

pub use curation_types::{CandidateStage, RejectionReason};

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Inspo event types
///
/// Events are broadcast via EventBus and can be serialized for SSE transmission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum InspoEvent {
    /// A curation run started
    CurationStarted {
        run_id: Uuid,
        /// Trending results wanted
        target: usize,
        /// Candidates available to try
        pool_size: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A candidate entered a pipeline step ("checking item k of N")
    CandidateChecking {
        run_id: Uuid,
        identifier: String,
        stage: CandidateStage,
        /// 1-based position in the candidate order
        attempt: usize,
        /// Candidates in the run
        pool_size: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A candidate was dropped
    CandidateRejected {
        run_id: Uuid,
        identifier: String,
        reason: RejectionReason,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A candidate was accepted as a trending result
    CandidateAccepted {
        run_id: Uuid,
        identifier: String,
        accepted: usize,
        target: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A curation run finished
    CurationCompleted {
        run_id: Uuid,
        attempted: usize,
        accepted: usize,
        target: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A curation run could not start because no credential is configured
    CurationUnavailable {
        message: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl InspoEvent {
    /// SSE event name
    pub fn event_type(&self) -> &str {
        match self {
            InspoEvent::CurationStarted { .. } => "CurationStarted",
            InspoEvent::CandidateChecking { .. } => "CandidateChecking",
            InspoEvent::CandidateRejected { .. } => "CandidateRejected",
            InspoEvent::CandidateAccepted { .. } => "CandidateAccepted",
            InspoEvent::CurationCompleted { .. } => "CurationCompleted",
            InspoEvent::CurationUnavailable { .. } => "CurationUnavailable",
        }
    }
}

/// Central event distribution bus
///
/// Thin wrapper around a tokio broadcast channel. Cloning shares the channel.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<InspoEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// `capacity` is the number of events buffered before slow receivers
    /// start missing old events.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<InspoEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: InspoEvent,
    ) -> Result<usize, broadcast::error::SendError<InspoEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: InspoEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
