//! Settings API endpoint
//!
//! Provides GET/POST /settings/api_key for the Gemini credential. The key is
//! held in memory only and is never echoed back.

use axum::{extract::State, routing::get, Json, Router};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::{is_valid_key, KeySource};
use crate::{ApiError, ApiResult, AppState};

/// Request payload for setting the Gemini API key
#[derive(Debug, Deserialize)]
pub struct SetApiKeyRequest {
    pub api_key: String,
}

/// Response payload for API key configuration
#[derive(Debug, Serialize)]
pub struct SetApiKeyResponse {
    pub success: bool,
    pub message: String,
}

/// Current credential state
#[derive(Debug, Serialize)]
pub struct ApiKeyStatus {
    pub configured: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<KeySource>,
}

/// GET /settings/api_key
pub async fn get_api_key_status(State(state): State<AppState>) -> Json<ApiKeyStatus> {
    let source = state.service.key_source().await;
    Json(ApiKeyStatus {
        configured: source.is_some(),
        source,
    })
}

/// POST /settings/api_key
///
/// **Request:** `{"api_key": "your-gemini-key"}`
///
/// **Errors:**
/// - 400 Bad Request: Empty or whitespace-only key
pub async fn set_api_key(
    State(state): State<AppState>,
    Json(payload): Json<SetApiKeyRequest>,
) -> ApiResult<Json<SetApiKeyResponse>> {
    if !is_valid_key(&payload.api_key) {
        return Err(ApiError::BadRequest(
            "API key cannot be empty or whitespace-only".to_string(),
        ));
    }

    state
        .service
        .set_api_key(&payload.api_key, KeySource::Runtime)
        .await
        .map_err(|e| ApiError::Internal(format!("Failed to apply API key: {}", e)))?;

    info!("Gemini API key configured via settings endpoint");

    Ok(Json(SetApiKeyResponse {
        success: true,
        message: "Gemini API key configured successfully".to_string(),
    }))
}

/// Build settings routes
pub fn settings_routes() -> Router<AppState> {
    Router::new().route("/settings/api_key", get(get_api_key_status).post(set_api_key))
}
