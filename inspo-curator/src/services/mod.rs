//! Service modules for inspiration curation
//!
//! - Candidate pool and media access
//! - Gemini-backed describer and moderator
//! - Curation pipeline, fallback supplier and result assembly
//! - `InspirationService`, the per-process entry point used by the API

pub mod assembly;
pub mod candidate_pool;
pub mod curation_pipeline;
pub mod describer;
pub mod fallback;
pub mod gemini_client;
pub mod inspiration;
pub mod media_source;
pub mod moderator;

pub use assembly::{assemble, assemble_with};
pub use candidate_pool::CandidatePool;
pub use curation_pipeline::{
    CurationOutcome, CurationPipeline, CurationStats, PipelineOptions, Shortfall,
};
pub use describer::GeminiDescriber;
pub use fallback::FallbackSupplier;
pub use gemini_client::{GeminiClient, GeminiError, GeminiSettings};
pub use inspiration::{CuratorSession, InspirationReport, InspirationService, InspirationStatus};
pub use media_source::{FsMediaSource, HttpMediaSource, MediaBlob, MediaError, MediaSource};
pub use moderator::GeminiModerator;
