//! Curation pipeline
//!
//! Drives a shuffled candidate list through Describer then Moderator and
//! collects up to `target` trending results.
//!
//! # Algorithm
//! 1. Walk the candidates in order, each at most once
//! 2. Describe; on `DescribeError` skip the item
//! 3. Moderate; on `ModerateError` apply `ModerateErrorPolicy` (default accept)
//! 4. Drop `ViolationDetected`, otherwise accept
//! 5. Stop at `target` accepted or when candidates run out
//!
//! Per-item failures are absorbed. The only run-level error is a moderation
//! failure under `ModerateErrorPolicy::Propagate`.
//!
//! With `describe_concurrency > 1`, describe calls run ahead of moderation in
//! an ordered buffer, so acceptance order still follows the candidate order.
//! Each describe runs on its own task so it keeps making progress while the
//! loop awaits a moderation. Describes still in flight when the run ends are
//! aborted.

use chrono::Utc;
use futures::stream::{self, StreamExt};
use inspo_common::config::{ModerateErrorPolicy, PipelineConfig};
use inspo_common::events::{CandidateStage, EventBus, InspoEvent, RejectionReason};
use serde::Serialize;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::types::{
    AcceptedResult, CandidateItem, CurationError, DescribeError, Describer, ModerateError,
    ModerationVerdict, Moderator,
};

/// Pipeline tuning
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Trending results wanted
    pub target: usize,
    pub on_moderate_error: ModerateErrorPolicy,
    /// Upper bound for each describe / moderate call
    pub call_timeout: Option<Duration>,
    /// Describe calls in flight at once (1 = strictly sequential)
    pub describe_concurrency: usize,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            target: 3,
            on_moderate_error: ModerateErrorPolicy::Accept,
            call_timeout: None,
            describe_concurrency: 1,
        }
    }
}

impl From<&PipelineConfig> for PipelineOptions {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            target: config.target_count,
            on_moderate_error: config.on_moderate_error,
            call_timeout: (config.call_timeout_secs > 0)
                .then(|| Duration::from_secs(config.call_timeout_secs)),
            describe_concurrency: config.describe_concurrency.max(1),
        }
    }
}

/// Per-run counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CurationStats {
    /// Candidates taken from the pool
    pub attempted: usize,
    pub describe_failures: usize,
    pub violations: usize,
    /// Moderation calls that errored, whatever the policy did next
    pub moderation_failures: usize,
    /// Items dropped because moderation errored under `Reject`
    pub moderation_rejections: usize,
}

/// Why a run produced fewer results than its target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Shortfall {
    /// No candidates to try
    NoCandidates,
    /// Every attempted clip failed to describe
    AllDescribeFailed,
    /// Every described clip was moderated out
    AllModeratedOut,
    /// Candidates ran out after some mix of outcomes
    PoolExhausted,
}

/// Result of one run
#[derive(Debug, Clone)]
pub struct CurationOutcome {
    pub run_id: Uuid,
    pub target: usize,
    /// Trending results in candidate order
    pub accepted: Vec<AcceptedResult>,
    pub stats: CurationStats,
}

impl CurationOutcome {
    /// `None` when the target was met
    pub fn shortfall(&self) -> Option<Shortfall> {
        if self.accepted.len() >= self.target {
            return None;
        }

        let stats = &self.stats;
        if stats.attempted == 0 {
            Some(Shortfall::NoCandidates)
        } else if !self.accepted.is_empty() {
            Some(Shortfall::PoolExhausted)
        } else if stats.describe_failures == stats.attempted {
            Some(Shortfall::AllDescribeFailed)
        } else if stats.describe_failures == 0 {
            Some(Shortfall::AllModeratedOut)
        } else {
            Some(Shortfall::PoolExhausted)
        }
    }
}

/// Describe → moderate → collect
pub struct CurationPipeline {
    describer: Arc<dyn Describer>,
    moderator: Arc<dyn Moderator>,
    options: PipelineOptions,
    event_bus: Option<EventBus>,
}

impl CurationPipeline {
    pub fn new(
        describer: Arc<dyn Describer>,
        moderator: Arc<dyn Moderator>,
        options: PipelineOptions,
    ) -> Self {
        Self {
            describer,
            moderator,
            options,
            event_bus: None,
        }
    }

    /// Publish progress events on `event_bus`
    pub fn with_event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    fn emit(&self, event: InspoEvent) {
        if let Some(bus) = &self.event_bus {
            bus.emit_lossy(event);
        }
    }

    fn reject(&self, run_id: Uuid, item: &CandidateItem, reason: RejectionReason) {
        self.emit(InspoEvent::CandidateRejected {
            run_id,
            identifier: item.identifier.clone(),
            reason,
            timestamp: Utc::now(),
        });
    }

    /// Run over `candidates` (already shuffled) until the target is met
    pub async fn run(
        &self,
        candidates: Vec<CandidateItem>,
    ) -> Result<CurationOutcome, CurationError> {
        let run_id = Uuid::new_v4();
        let target = self.options.target;
        let pool_size = candidates.len();

        info!(
            %run_id,
            target,
            pool_size,
            describer = self.describer.name(),
            moderator = self.moderator.name(),
            "Curation run started"
        );
        self.emit(InspoEvent::CurationStarted {
            run_id,
            target,
            pool_size,
            timestamp: Utc::now(),
        });

        let mut accepted: Vec<AcceptedResult> = Vec::with_capacity(target.min(pool_size));
        let mut stats = CurationStats::default();

        let describer = Arc::clone(&self.describer);
        let event_bus = self.event_bus.clone();
        let call_timeout = self.options.call_timeout;

        // Lazily polled: no describe starts until the loop asks for an item
        let described = stream::iter(candidates.into_iter().enumerate())
            .map(move |(index, item)| {
                let describer = Arc::clone(&describer);
                let event_bus = event_bus.clone();
                async move {
                    if let Some(bus) = &event_bus {
                        bus.emit_lossy(InspoEvent::CandidateChecking {
                            run_id,
                            identifier: item.identifier.clone(),
                            stage: CandidateStage::Describing,
                            attempt: index + 1,
                            pool_size,
                            timestamp: Utc::now(),
                        });
                    }
                    let task = DescribeTask(tokio::spawn({
                        let item = item.clone();
                        async move {
                            with_timeout(
                                call_timeout,
                                describer.describe(&item),
                                DescribeError::Timeout,
                            )
                            .await
                        }
                    }));
                    let result = task.await.unwrap_or_else(|e| {
                        Err(DescribeError::Service(format!("describe task failed: {}", e)))
                    });
                    (index, item, result)
                }
            })
            .buffered(self.options.describe_concurrency.max(1));
        futures::pin_mut!(described);

        while accepted.len() < target {
            let Some((index, item, described)) = described.next().await else {
                break;
            };
            stats.attempted += 1;
            let attempt = index + 1;

            let description = match described {
                Ok(description) => description,
                Err(e) => {
                    stats.describe_failures += 1;
                    warn!(
                        %run_id,
                        identifier = %item.identifier,
                        attempt,
                        error = %e,
                        "Describe failed, skipping candidate"
                    );
                    self.reject(run_id, &item, RejectionReason::DescribeFailed);
                    continue;
                }
            };

            self.emit(InspoEvent::CandidateChecking {
                run_id,
                identifier: item.identifier.clone(),
                stage: CandidateStage::Moderating,
                attempt,
                pool_size,
                timestamp: Utc::now(),
            });

            let verdict = match with_timeout(
                call_timeout,
                self.moderator.moderate(&description),
                ModerateError::Timeout,
            )
            .await
            {
                Ok(verdict) => verdict,
                Err(e) => {
                    stats.moderation_failures += 1;
                    match self.options.on_moderate_error {
                        ModerateErrorPolicy::Accept => {
                            warn!(
                                %run_id,
                                identifier = %item.identifier,
                                error = %e,
                                "Moderation failed, accepting description (fail-open)"
                            );
                            ModerationVerdict::NoViolation
                        }
                        ModerateErrorPolicy::Reject => {
                            stats.moderation_rejections += 1;
                            warn!(
                                %run_id,
                                identifier = %item.identifier,
                                error = %e,
                                "Moderation failed, discarding description"
                            );
                            self.reject(run_id, &item, RejectionReason::ModerationFailed);
                            continue;
                        }
                        ModerateErrorPolicy::Propagate => {
                            error!(
                                %run_id,
                                identifier = %item.identifier,
                                error = %e,
                                "Moderation failed, aborting run"
                            );
                            return Err(CurationError::Moderation {
                                identifier: item.identifier,
                                source: e,
                            });
                        }
                    }
                }
            };

            if verdict.is_violation() {
                stats.violations += 1;
                warn!(
                    %run_id,
                    identifier = %item.identifier,
                    reason = RejectionReason::ViolationDetected.as_str(),
                    "Violation detected, discarding description"
                );
                self.reject(run_id, &item, RejectionReason::ViolationDetected);
                continue;
            }

            debug!(%run_id, identifier = %item.identifier, "Description accepted");
            accepted.push(AcceptedResult::trending(
                description.text,
                item.identifier.clone(),
            ));
            self.emit(InspoEvent::CandidateAccepted {
                run_id,
                identifier: item.identifier,
                accepted: accepted.len(),
                target,
                timestamp: Utc::now(),
            });
        }

        info!(
            %run_id,
            attempted = stats.attempted,
            accepted = accepted.len(),
            describe_failures = stats.describe_failures,
            violations = stats.violations,
            moderation_failures = stats.moderation_failures,
            "Curation run finished"
        );
        self.emit(InspoEvent::CurationCompleted {
            run_id,
            attempted: stats.attempted,
            accepted: accepted.len(),
            target,
            timestamp: Utc::now(),
        });

        Ok(CurationOutcome {
            run_id,
            target,
            accepted,
            stats,
        })
    }
}

/// Spawned describe call, aborted when dropped unfinished
struct DescribeTask<T>(JoinHandle<T>);

impl<T> Future for DescribeTask<T> {
    type Output = Result<T, JoinError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.0).poll(cx)
    }
}

impl<T> Drop for DescribeTask<T> {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Bound `fut` by `limit`, mapping an elapsed timer to `on_elapsed(limit)`
async fn with_timeout<T, E, F>(
    limit: Option<Duration>,
    fut: F,
    on_elapsed: fn(Duration) -> E,
) -> Result<T, E>
where
    F: Future<Output = Result<T, E>>,
{
    match limit {
        Some(limit) => match tokio::time::timeout(limit, fut).await {
            Ok(result) => result,
            Err(_) => Err(on_elapsed(limit)),
        },
        None => fut.await,
    }
}
