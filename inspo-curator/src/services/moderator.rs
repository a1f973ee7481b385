//! Copyright-mention moderator backed by the generative model
//!
//! Sends the description to the model with a classification instruction and
//! maps the single-token reply to a `ModerationVerdict`.

use async_trait::async_trait;
use std::sync::Arc;

use crate::services::describer::preview;
use crate::services::gemini_client::{GenerationConfig, GeminiClient, Part};
use crate::types::{Description, ModerateError, ModerationVerdict, Moderator};

const CHECKER_INSTRUCTION: &str = "\
You are a copyright detection assistant. Your task is to analyze the following text, which is a description of a piece of music, and determine if it contains any of the following:
1. The specific name of any real-world musical artist or band.
2. The specific title of any real-world song or album.
3. Any direct quotes of specific, recognizable lyrics from a real-world song.

Do not be overly sensitive to common words or generic phrases that might be part of a title or lyric if used generally. Only flag clear, specific, and identifiable mentions.
For example:
- Input: \"Sounds like a song by a named pop star.\" -> Output: VIOLATION_DETECTED
- Input: \"Has a vibe similar to a named, quoted hit single.\" -> Output: VIOLATION_DETECTED
- Input: \"Includes a verbatim line from a well-known chorus.\" -> Output: VIOLATION_DETECTED
- Input: \"A powerful rock ballad with operatic, layered harmonies.\" -> Output: NO_VIOLATION
- Input: \"Features a catchy chorus and a memorable guitar solo.\" -> Output: NO_VIOLATION
- Input: \"The song mentions feeling 'happy'.\" -> Output: NO_VIOLATION";

/// Build the full classification prompt for one description
pub fn moderation_prompt(description_text: &str) -> String {
    format!(
        "{}\n\nAnalyze the following text:\n---\n{}\n---\n\nRespond with ONLY ONE of the following lines:\n{}\n{}",
        CHECKER_INSTRUCTION,
        description_text,
        ModerationVerdict::NO_VIOLATION_TOKEN,
        ModerationVerdict::VIOLATION_TOKEN,
    )
}

/// Gemini-backed moderator
pub struct GeminiModerator {
    client: Arc<GeminiClient>,
    generation_config: GenerationConfig,
}

impl GeminiModerator {
    pub fn new(client: Arc<GeminiClient>) -> Self {
        Self {
            client,
            generation_config: GenerationConfig {
                temperature: Some(0.0),
                max_output_tokens: Some(16),
            },
        }
    }
}

#[async_trait]
impl Moderator for GeminiModerator {
    fn name(&self) -> &'static str {
        "gemini"
    }

    async fn moderate(
        &self,
        description: &Description,
    ) -> Result<ModerationVerdict, ModerateError> {
        tracing::debug!(
            identifier = %description.source.identifier,
            preview = %preview(&description.text),
            "Checking description for copyright mentions"
        );

        let reply = self
            .client
            .generate_content(
                vec![Part::text(moderation_prompt(&description.text))],
                Some(&self.generation_config),
            )
            .await
            .map_err(|e| ModerateError::Service(e.to_string()))?;

        let verdict = ModerationVerdict::from_token(&reply)
            .ok_or_else(|| ModerateError::UnexpectedVerdict(reply.trim().to_string()))?;

        tracing::debug!(
            identifier = %description.source.identifier,
            verdict = ?verdict,
            "Moderation decision"
        );
        Ok(verdict)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_embeds_description_and_tokens() {
        let prompt = moderation_prompt("A mellow jazz trio with brushed drums.");
        assert!(prompt.contains("---\nA mellow jazz trio with brushed drums.\n---"));
        assert!(prompt.ends_with("NO_VIOLATION\nVIOLATION_DETECTED"));
        assert!(prompt.starts_with("You are a copyright detection assistant."));
    }
}
