//! Inspiration endpoints
//!
//! `GET /inspiration` runs a full curation (never cached) and answers with the
//! shuffled result set plus a presentation status. A missing API key is not an
//! HTTP error: the page still renders the popular prompts, with state
//! `configuration_required`.

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::services::curation_pipeline::CurationStats;
use crate::services::inspiration::InspirationStatus;
use crate::types::{CurationError, ResultSet};
use crate::{ApiError, ApiResult, AppState};

/// Body of `GET /inspiration`
#[derive(Debug, Serialize)]
pub struct InspirationResponse {
    #[serde(flatten)]
    pub status: InspirationStatus,
    /// User-facing status line
    pub message: String,
    #[serde(flatten)]
    pub result_set: ResultSet,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<CurationStats>,
}

/// GET /inspiration
pub async fn load_inspiration(
    State(state): State<AppState>,
) -> ApiResult<Json<InspirationResponse>> {
    match state.service.load().await {
        Ok(report) => {
            info!(
                run_id = %report.run_id,
                trending = report.result_set.trending_count,
                popular = report.result_set.popular_count,
                "Inspirations loaded"
            );
            Ok(Json(InspirationResponse {
                message: report.status.message().to_string(),
                status: report.status,
                result_set: report.result_set,
                run_id: Some(report.run_id),
                stats: Some(report.stats),
            }))
        }
        Err(CurationError::Configuration(msg)) => {
            Ok(Json(InspirationResponse {
                status: InspirationStatus::ConfigurationRequired,
                message: msg,
                result_set: state.service.fallback_only(),
                run_id: None,
                stats: None,
            }))
        }
        Err(e @ CurationError::Moderation { .. }) => {
            warn!(error = %e, "Curation run aborted");
            *state.last_error.write().await = Some(e.to_string());
            Err(ApiError::Upstream(e.to_string()))
        }
    }
}

/// GET /inspiration/popular
pub async fn popular_inspiration(State(state): State<AppState>) -> Json<ResultSet> {
    Json(state.service.fallback_only())
}

/// Build inspiration routes
pub fn inspiration_routes() -> Router<AppState> {
    Router::new()
        .route("/inspiration", get(load_inspiration))
        .route("/inspiration/popular", get(popular_inspiration))
}
