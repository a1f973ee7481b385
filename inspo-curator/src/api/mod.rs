//! HTTP API handlers for inspo-curator
//!
//! JSON endpoints plus an SSE stream of curation progress. This is the
//! presentation adapter; all curation logic lives in `services`.

pub mod health;
pub mod inspiration;
pub mod settings;
pub mod sse;

pub use health::health_routes;
pub use inspiration::inspiration_routes;
pub use settings::settings_routes;
pub use sse::event_stream;
