//! Gemini generateContent client
//!
//! Minimal REST client for the hosted generative model used by both the
//! describer and the moderator. One method, `generate_content`, sends a list of
//! parts (instruction text, optionally one inlined media blob) and returns the
//! concatenated text of the first candidate.
//!
//! # API Reference
//! - Endpoint: `POST {base}/v1beta/models/{model}:generateContent`
//! - Auth: `x-goog-api-key` header

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::Instant;

pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash-latest";
const USER_AGENT: &str = concat!("inspo-curator/", env!("CARGO_PKG_VERSION"));
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Gemini client errors
#[derive(Debug, Error)]
pub enum GeminiError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Invalid API key")]
    InvalidApiKey,

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("API error {0}: {1}")]
    ApiError(u16, String),

    /// Prompt or output blocked by the service's safety filters
    #[error("Blocked: {0}")]
    Blocked(String),

    #[error("Response contained no text")]
    EmptyResponse,

    #[error("Parse error: {0}")]
    ParseError(String),
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

/// One request/response part
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Part {
    Text {
        text: String,
    },
    Inline {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Part::Text { text: text.into() }
    }

    /// Inline media, base64-encoded
    pub fn inline(mime_type: impl Into<String>, data_base64: impl Into<String>) -> Self {
        Part::Inline {
            inline_data: InlineData {
                mime_type: mime_type.into(),
                data: data_base64.into(),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, Serialize)]
struct GenerateContentRequest<'a> {
    contents: [Content; 1],
    #[serde(rename = "generationConfig", skip_serializing_if = "Option::is_none")]
    generation_config: Option<&'a GenerationConfig>,
}

/// Sampling overrides
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    #[serde(default)]
    pub prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
    #[serde(default)]
    pub finish_reason: Option<String>,
    #[serde(default)]
    pub safety_ratings: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    #[serde(default)]
    pub block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: Option<String>,
}

/// Pull the answer text out of a response
///
/// Prompt-level blocks and non-STOP finish reasons without text are reported
/// as `Blocked`, with safety ratings appended when present.
pub fn extract_text(response: &GenerateContentResponse) -> Result<String, GeminiError> {
    if let Some(reason) = response
        .prompt_feedback
        .as_ref()
        .and_then(|f| f.block_reason.as_ref())
    {
        return Err(GeminiError::Blocked(format!("prompt blocked: {}", reason)));
    }

    let candidate = response
        .candidates
        .first()
        .ok_or(GeminiError::EmptyResponse)?;

    let text: String = candidate
        .content
        .iter()
        .flat_map(|c| c.parts.iter())
        .filter_map(|p| match p {
            Part::Text { text } => Some(text.as_str()),
            Part::Inline { .. } => None,
        })
        .collect();

    if !text.trim().is_empty() {
        return Ok(text);
    }

    match candidate.finish_reason.as_deref() {
        Some(reason) if reason != "STOP" => {
            let mut message = format!("finish reason {}", reason);
            if !candidate.safety_ratings.is_empty() {
                let ratings = serde_json::to_string(&candidate.safety_ratings)
                    .unwrap_or_default();
                message.push_str(&format!(", safety ratings {}", ratings));
            }
            Err(GeminiError::Blocked(message))
        }
        _ => Err(GeminiError::EmptyResponse),
    }
}

/// Map a non-success HTTP response to an error
fn classify_error(status: u16, body: &str) -> GeminiError {
    let parsed = serde_json::from_str::<ErrorEnvelope>(body).ok();
    let message = parsed
        .as_ref()
        .map(|e| e.error.message.clone())
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| body.to_string());

    let key_rejected = body.contains("API_KEY_INVALID")
        || message.contains("API key not valid")
        || parsed
            .as_ref()
            .and_then(|e| e.error.status.as_deref())
            .map(|s| s == "UNAUTHENTICATED")
            .unwrap_or(false);

    match status {
        401 | 403 => GeminiError::InvalidApiKey,
        400 if key_rejected => GeminiError::InvalidApiKey,
        429 => GeminiError::RateLimited(message),
        _ => GeminiError::ApiError(status, message),
    }
}

// ============================================================================
// Client
// ============================================================================

/// Minimum spacing between outbound requests
///
/// Each caller reserves the next free slot under the lock and sleeps after
/// releasing it, so concurrent callers queue up one interval apart.
struct RateLimiter {
    next_slot: Mutex<Option<Instant>>,
    min_interval: Duration,
}

impl RateLimiter {
    fn new(min_interval: Duration) -> Self {
        Self {
            next_slot: Mutex::new(None),
            min_interval,
        }
    }

    async fn wait(&self) {
        let wait_time = {
            let mut next = self.next_slot.lock().await;
            let now = Instant::now();
            let slot = match *next {
                Some(reserved) if reserved > now => reserved,
                _ => now,
            };
            *next = Some(slot + self.min_interval);
            slot - now
        };

        if !wait_time.is_zero() {
            tracing::debug!("Gemini rate limiting: waiting {:?}", wait_time);
            tokio::time::sleep(wait_time).await;
        }
    }
}

/// Client settings
#[derive(Debug, Clone)]
pub struct GeminiSettings {
    pub model: String,
    pub request_timeout: Duration,
    pub min_request_interval: Duration,
    pub base_url: String,
}

impl Default for GeminiSettings {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            request_timeout: Duration::from_secs(30),
            min_request_interval: Duration::from_millis(250),
            base_url: GEMINI_BASE_URL.to_string(),
        }
    }
}

/// Gemini API client
pub struct GeminiClient {
    http_client: reqwest::Client,
    rate_limiter: Arc<RateLimiter>,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: String, settings: GeminiSettings) -> Result<Self, GeminiError> {
        if api_key.trim().is_empty() {
            return Err(GeminiError::InvalidApiKey);
        }

        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|e| GeminiError::NetworkError(e.to_string()))?;

        Ok(Self {
            http_client,
            rate_limiter: Arc::new(RateLimiter::new(settings.min_request_interval)),
            api_key,
            model: settings.model,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }

    /// Send one generateContent request and return the answer text
    pub async fn generate_content(
        &self,
        parts: Vec<Part>,
        generation_config: Option<&GenerationConfig>,
    ) -> Result<String, GeminiError> {
        self.rate_limiter.wait().await;

        let request = GenerateContentRequest {
            contents: [Content {
                role: Some("user".to_string()),
                parts,
            }],
            generation_config,
        };

        tracing::debug!(model = %self.model, "Querying Gemini generateContent");

        let response = self
            .http_client
            .post(self.endpoint())
            .header(API_KEY_HEADER, &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| GeminiError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let error = classify_error(status.as_u16(), &body);
            tracing::warn!(status = status.as_u16(), error = %error, "Gemini request failed");
            return Err(error);
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| GeminiError::ParseError(e.to_string()))?;

        extract_text(&parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> GenerateContentResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_request_wire_shape() {
        let request = GenerateContentRequest {
            contents: [Content {
                role: Some("user".to_string()),
                parts: vec![Part::text("describe"), Part::inline("audio/mpeg", "AAAA")],
            }],
            generation_config: None,
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["contents"][0]["parts"][0]["text"], "describe");
        assert_eq!(
            json["contents"][0]["parts"][1]["inlineData"]["mimeType"],
            "audio/mpeg"
        );
        assert_eq!(json["contents"][0]["parts"][1]["inlineData"]["data"], "AAAA");
        assert!(json.get("generationConfig").is_none());
    }

    #[test]
    fn test_extract_text_joins_parts() {
        let response = parse(
            r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"An upbeat "},{"text":"pop track."}]},"finishReason":"STOP"}]}"#,
        );
        assert_eq!(extract_text(&response).unwrap(), "An upbeat pop track.");
    }

    #[test]
    fn test_extract_text_prompt_blocked() {
        let response = parse(r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#);
        match extract_text(&response) {
            Err(GeminiError::Blocked(msg)) => assert!(msg.contains("SAFETY")),
            other => panic!("expected Blocked, got {:?}", other),
        }
    }

    #[test]
    fn test_extract_text_finish_reason_reported() {
        let response = parse(
            r#"{"candidates":[{"finishReason":"RECITATION","safetyRatings":[{"category":"HARM_CATEGORY_HARASSMENT","probability":"LOW"}]}]}"#,
        );
        match extract_text(&response) {
            Err(GeminiError::Blocked(msg)) => {
                assert!(msg.contains("RECITATION"));
                assert!(msg.contains("HARM_CATEGORY_HARASSMENT"));
            }
            other => panic!("expected Blocked, got {:?}", other),
        }
    }

    #[test]
    fn test_extract_text_empty() {
        assert!(matches!(
            extract_text(&parse(r#"{"candidates":[]}"#)),
            Err(GeminiError::EmptyResponse)
        ));
        assert!(matches!(
            extract_text(&parse(
                r#"{"candidates":[{"content":{"parts":[{"text":"  "}]},"finishReason":"STOP"}]}"#
            )),
            Err(GeminiError::EmptyResponse)
        ));
    }

    #[test]
    fn test_classify_errors() {
        let invalid_key = r#"{"error":{"code":400,"message":"API key not valid. Please pass a valid API key.","status":"INVALID_ARGUMENT","details":[{"reason":"API_KEY_INVALID"}]}}"#;
        assert!(matches!(classify_error(400, invalid_key), GeminiError::InvalidApiKey));
        assert!(matches!(classify_error(403, ""), GeminiError::InvalidApiKey));
        assert!(matches!(
            classify_error(429, r#"{"error":{"message":"quota"}}"#),
            GeminiError::RateLimited(m) if m == "quota"
        ));
        assert!(matches!(
            classify_error(500, "oops"),
            GeminiError::ApiError(500, m) if m == "oops"
        ));
    }

    #[test]
    fn test_blank_key_rejected() {
        assert!(matches!(
            GeminiClient::new("   ".to_string(), GeminiSettings::default()),
            Err(GeminiError::InvalidApiKey)
        ));
    }

    #[test]
    fn test_endpoint_uses_model() {
        let client = GeminiClient::new(
            "key".to_string(),
            GeminiSettings {
                base_url: "http://127.0.0.1:9999/".to_string(),
                ..GeminiSettings::default()
            },
        )
        .unwrap();
        assert_eq!(
            client.endpoint(),
            "http://127.0.0.1:9999/v1beta/models/gemini-1.5-flash-latest:generateContent"
        );
        assert_eq!(client.model(), DEFAULT_MODEL);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limiter_spacing() {
        let limiter = RateLimiter::new(Duration::from_millis(50));
        let start = Instant::now();
        for _ in 0..3 {
            limiter.wait().await;
        }
        assert!(start.elapsed() >= Duration::from_millis(100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limiter_concurrent_callers_do_not_serialize_sleeps() {
        let limiter = Arc::new(RateLimiter::new(Duration::from_secs(1)));
        let start = Instant::now();

        let waits: Vec<_> = (0..3)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                tokio::spawn(async move {
                    limiter.wait().await;
                    start.elapsed()
                })
            })
            .collect();

        let mut released = Vec::new();
        for wait in waits {
            released.push(wait.await.unwrap());
        }
        released.sort();

        // slots at 0s, 1s and 2s
        assert!(released[0] < Duration::from_millis(500));
        assert!(released[1] >= Duration::from_secs(1));
        assert!(released[2] >= Duration::from_secs(2));
        assert!(released[2] < Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limiter_idle_gap_needs_no_wait() {
        let limiter = RateLimiter::new(Duration::from_secs(1));
        limiter.wait().await;
        tokio::time::sleep(Duration::from_secs(5)).await;

        let start = Instant::now();
        limiter.wait().await;
        assert_eq!(start.elapsed(), Duration::ZERO);
    }
}
