//! Clip describer backed by the generative model
//!
//! Fetches the clip through a `MediaSource`, inlines it as base64 with its
//! media type, and asks the model for a one-paragraph musical description
//! usable as a generation prompt.

use async_trait::async_trait;
use base64::Engine;
use std::sync::Arc;

use crate::services::gemini_client::{GenerationConfig, GeminiClient, Part};
use crate::services::media_source::MediaSource;
use crate::types::{CandidateItem, DescribeError, Describer, Description};

/// Instruction sent alongside every clip
///
/// Asking the model not to name artists, titles or lyrics is a request only;
/// the moderator enforces it.
pub const DESCRIBE_INSTRUCTION: &str = "\
Analyze the following audio music file.
Describe its key musical characteristics such as tempo (e.g., slow, mid-tempo, fast, very fast), \
primary genre influences (e.g., pop, rock, jazz, electronic, folk, classical, hip-hop, R&B), \
overall mood or emotion it evokes (e.g., melancholic, joyful, energetic, relaxing, intense, dreamy), \
and prominent instrumentation (e.g., acoustic guitar, electric guitar, piano, synths, drums, strings, brass, percussion).
Also describe the general vibe it creates (e.g., good for studying, dancing, a road trip, a quiet evening).
The description should work as a prompt for an AI music generation model to create a similar sounding new piece of music.
IMPORTANT: Do NOT mention any real-world artist's name, song title, or any recognizable lyrics from any song.
Focus solely on the musical and stylistic qualities. Keep the description concise, ideally one paragraph.
Example of good output: \"An upbeat electronic pop track with a driving synth bassline, shimmering pads, and a four-on-the-floor drum beat. \
It has a joyful, energetic mood, perfect for a summer festival vibe. Features prominent vocal chops and layered synth melodies.\"
Now analyze the provided audio.";

const LOG_PREVIEW_CHARS: usize = 70;

/// Gemini-backed describer
pub struct GeminiDescriber {
    client: Arc<GeminiClient>,
    media: Arc<dyn MediaSource>,
    generation_config: GenerationConfig,
}

impl GeminiDescriber {
    pub fn new(client: Arc<GeminiClient>, media: Arc<dyn MediaSource>) -> Self {
        Self {
            client,
            media,
            generation_config: GenerationConfig {
                temperature: Some(0.7),
                max_output_tokens: Some(512),
            },
        }
    }
}

#[async_trait]
impl Describer for GeminiDescriber {
    fn name(&self) -> &'static str {
        "gemini"
    }

    async fn describe(&self, item: &CandidateItem) -> Result<Description, DescribeError> {
        let blob = self.media.fetch(&item.media_ref).await?;
        tracing::debug!(
            identifier = %item.identifier,
            size = blob.len(),
            mime_type = %blob.mime_type,
            "Describing clip"
        );

        let encoded = base64::engine::general_purpose::STANDARD.encode(&blob.bytes);
        let parts = vec![
            Part::text(DESCRIBE_INSTRUCTION),
            Part::inline(blob.mime_type, encoded),
        ];

        let text = self
            .client
            .generate_content(parts, Some(&self.generation_config))
            .await
            .map_err(|e| DescribeError::Service(e.to_string()))?;

        let text = text.trim().to_string();
        if text.is_empty() {
            return Err(DescribeError::EmptyDescription);
        }

        tracing::debug!(
            identifier = %item.identifier,
            preview = %preview(&text),
            "Description received"
        );

        Ok(Description {
            source: item.clone(),
            text,
        })
    }
}

/// First characters of a text, for log lines
pub(crate) fn preview(text: &str) -> String {
    let mut out: String = text.chars().take(LOG_PREVIEW_CHARS).collect();
    if text.chars().count() > LOG_PREVIEW_CHARS {
        out.push_str("...");
    }
    out
}
