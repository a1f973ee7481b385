//! Inspiration service
//!
//! Owns everything one "load inspirations" request needs: the candidate pool,
//! the fallback supplier and the credential-bound curator session. The session
//! is created once per credential and replaced only when the credential
//! changes; runs themselves are never memoized.

use chrono::{DateTime, Utc};
use inspo_common::config::{PipelineConfig, TomlConfig};
use inspo_common::events::{EventBus, InspoEvent};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::KeySource;
use crate::services::assembly::assemble;
use crate::services::candidate_pool::CandidatePool;
use crate::services::curation_pipeline::{
    CurationPipeline, CurationStats, PipelineOptions, Shortfall,
};
use crate::services::describer::GeminiDescriber;
use crate::services::fallback::FallbackSupplier;
use crate::services::gemini_client::{GeminiClient, GeminiSettings, GEMINI_BASE_URL};
use crate::services::media_source::MediaSource;
use crate::services::moderator::GeminiModerator;
use crate::types::{CurationError, ResultSet};

pub const MISSING_KEY_MESSAGE: &str =
    "Gemini API key not set. Please set it to load inspirations.";

/// Credential-bound pipeline
pub struct CuratorSession {
    pipeline: CurationPipeline,
    key_source: KeySource,
    created_at: DateTime<Utc>,
}

impl CuratorSession {
    pub fn new(pipeline: CurationPipeline, key_source: KeySource) -> Self {
        Self {
            pipeline,
            key_source,
            created_at: Utc::now(),
        }
    }

    /// Session whose describer and moderator share one Gemini client
    pub fn gemini(
        api_key: String,
        key_source: KeySource,
        config: &PipelineConfig,
        media: Arc<dyn MediaSource>,
        event_bus: EventBus,
    ) -> Result<Self, CurationError> {
        let settings = GeminiSettings {
            model: config.model.clone(),
            request_timeout: Duration::from_secs(config.request_timeout_secs),
            min_request_interval: Duration::from_millis(config.min_request_interval_ms),
            base_url: GEMINI_BASE_URL.to_string(),
        };
        let client = GeminiClient::new(api_key, settings)
            .map_err(|e| CurationError::Configuration(format!("Gemini client: {}", e)))?;
        info!(model = %client.model(), source = %key_source, "Gemini client initialized");

        let client = Arc::new(client);
        let pipeline = CurationPipeline::new(
            Arc::new(GeminiDescriber::new(Arc::clone(&client), media)),
            Arc::new(GeminiModerator::new(client)),
            PipelineOptions::from(config),
        )
        .with_event_bus(event_bus);

        Ok(Self::new(pipeline, key_source))
    }

    pub fn pipeline(&self) -> &CurationPipeline {
        &self.pipeline
    }

    pub fn key_source(&self) -> KeySource {
        self.key_source
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Presentation state of a load
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum InspirationStatus {
    /// Target met
    Ready,
    /// Some trending results, fewer than wanted
    Partial { shortfall: Shortfall },
    /// No trending results; popular prompts only
    PopularOnly { shortfall: Shortfall },
    /// Nothing to show at all
    Empty {
        #[serde(skip_serializing_if = "Option::is_none")]
        shortfall: Option<Shortfall>,
    },
    /// No credential; pipeline not attempted
    ConfigurationRequired,
}

impl InspirationStatus {
    pub fn from_outcome(shortfall: Option<Shortfall>, result_set: &ResultSet) -> Self {
        if result_set.is_empty() {
            return InspirationStatus::Empty { shortfall };
        }
        match shortfall {
            None => InspirationStatus::Ready,
            Some(shortfall) if result_set.trending_count == 0 => {
                InspirationStatus::PopularOnly { shortfall }
            }
            Some(shortfall) => InspirationStatus::Partial { shortfall },
        }
    }

    /// User-facing status line
    pub fn message(&self) -> &'static str {
        match self {
            InspirationStatus::Ready => "Inspirations ready.",
            InspirationStatus::Partial { .. } => {
                "Fewer new inspirations than usual passed checks."
            }
            InspirationStatus::PopularOnly { shortfall } => match shortfall {
                Shortfall::AllDescribeFailed => {
                    "Could not analyze any songs right now. Showing popular only."
                }
                Shortfall::AllModeratedOut => {
                    "No new trending inspirations passed checks. Showing popular only."
                }
                Shortfall::NoCandidates | Shortfall::PoolExhausted => {
                    "No new trending inspirations available. Showing popular only."
                }
            },
            InspirationStatus::Empty { .. } => {
                "No inspirations available. All AI suggestions might have been filtered."
            }
            InspirationStatus::ConfigurationRequired => {
                "Please set your Gemini API key to load inspirations."
            }
        }
    }
}

/// Result of one successful load
#[derive(Debug, Clone)]
pub struct InspirationReport {
    pub run_id: Uuid,
    pub result_set: ResultSet,
    pub status: InspirationStatus,
    pub stats: CurationStats,
}

/// Loads inspiration result sets
pub struct InspirationService {
    pool: CandidatePool,
    fallback: FallbackSupplier,
    pipeline_config: PipelineConfig,
    media: Arc<dyn MediaSource>,
    event_bus: EventBus,
    session: RwLock<Option<Arc<CuratorSession>>>,
}

impl InspirationService {
    pub fn new(
        pool: CandidatePool,
        fallback: FallbackSupplier,
        pipeline_config: PipelineConfig,
        media: Arc<dyn MediaSource>,
        event_bus: EventBus,
    ) -> Self {
        Self {
            pool,
            fallback,
            pipeline_config,
            media,
            event_bus,
            session: RwLock::new(None),
        }
    }

    /// Service for the bootstrap config; no session until a key is set
    pub fn from_config(
        config: &TomlConfig,
        media: Arc<dyn MediaSource>,
        event_bus: EventBus,
    ) -> Self {
        Self::new(
            CandidatePool::from_identifiers(config.clips.iter().cloned()),
            FallbackSupplier::from_config(&config.popular),
            config.pipeline.clone(),
            media,
            event_bus,
        )
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    pub fn pool(&self) -> &CandidatePool {
        &self.pool
    }

    /// (Re)create the Gemini session for `api_key`
    ///
    /// On failure the previous session is dropped, so a rejected key never
    /// lingers.
    pub async fn set_api_key(&self, api_key: &str, source: KeySource) -> Result<(), CurationError> {
        let built = CuratorSession::gemini(
            api_key.trim().to_string(),
            source,
            &self.pipeline_config,
            Arc::clone(&self.media),
            self.event_bus.clone(),
        );

        let mut slot = self.session.write().await;
        match built {
            Ok(session) => {
                *slot = Some(Arc::new(session));
                Ok(())
            }
            Err(e) => {
                *slot = None;
                warn!(error = %e, "Gemini session could not be created");
                Err(e)
            }
        }
    }

    /// Install an already-built session (alternate backends, tests)
    pub async fn install_session(&self, session: CuratorSession) {
        *self.session.write().await = Some(Arc::new(session));
    }

    pub async fn clear_session(&self) {
        *self.session.write().await = None;
    }

    pub async fn key_source(&self) -> Option<KeySource> {
        self.session.read().await.as_ref().map(|s| s.key_source())
    }

    pub async fn is_configured(&self) -> bool {
        self.session.read().await.is_some()
    }

    /// Run the pipeline and merge with the popular prompts
    ///
    /// Fails with `CurationError::Configuration` before any request when no
    /// credential is set.
    pub async fn load(&self) -> Result<InspirationReport, CurationError> {
        let session = self.session.read().await.clone();
        let Some(session) = session else {
            warn!("Inspiration load requested without a configured API key");
            self.event_bus.emit_lossy(InspoEvent::CurationUnavailable {
                message: MISSING_KEY_MESSAGE.to_string(),
                timestamp: Utc::now(),
            });
            return Err(CurationError::Configuration(MISSING_KEY_MESSAGE.to_string()));
        };

        let candidates = self.pool.enumerate();
        let outcome = session.pipeline().run(candidates).await?;
        let shortfall = outcome.shortfall();

        let result_set = assemble(outcome.accepted, self.fallback.supply());
        let status = InspirationStatus::from_outcome(shortfall, &result_set);
        if let Some(shortfall) = shortfall {
            info!(
                run_id = %outcome.run_id,
                shortfall = ?shortfall,
                trending = result_set.trending_count,
                "Fewer trending inspirations than requested"
            );
        }

        Ok(InspirationReport {
            run_id: outcome.run_id,
            result_set,
            status,
            stats: outcome.stats,
        })
    }

    /// Popular prompts only, shuffled; renderable without a credential
    pub fn fallback_only(&self) -> ResultSet {
        assemble(Vec::new(), self.fallback.supply())
    }
}
