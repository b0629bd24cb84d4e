//! Image synthesis: one photo in, one idealized photo out.

use crate::client::ContentGenerator;
use crate::prompts;
use crate::settings;
use crate::wire::{Content, GenerateContentRequest, GenerateContentResponse, Part};
use async_trait::async_trait;
use aura_core::{ImagePayload, Mode, Refusal, RemoteError, Synthesizer};

const FALLBACK_MEDIA_TYPE: &str = "image/png";
const SAFETY_REASONS: [&str; 2] = ["SAFETY", "IMAGE_SAFETY"];

/// What a synthesis response amounted to.
#[derive(Debug, Clone, PartialEq)]
pub enum SynthesisOutcome {
    Image(ImagePayload),
    Declined(String),
    SafetyBlocked,
    Failed(Option<String>),
}

impl SynthesisOutcome {
    /// Classify a response.
    ///
    /// An inline image wins over everything else. Explanatory text wins over
    /// a safety finish reason, so the model's own words reach the user.
    pub fn interpret(response: &GenerateContentResponse) -> Self {
        let candidate = response.first_candidate();

        if let Some(blob) = candidate
            .into_iter()
            .flat_map(|c| c.parts())
            .filter_map(|p| p.inline_data.as_ref())
            .find(|b| !b.data.is_empty())
        {
            let media_type = blob
                .mime_type
                .as_deref()
                .filter(|m| !m.is_empty())
                .unwrap_or(FALLBACK_MEDIA_TYPE);
            return SynthesisOutcome::Image(ImagePayload::from_base64(media_type, blob.data.clone()));
        }

        let text = response.text_parts().join(" ");
        if !text.trim().is_empty() {
            return SynthesisOutcome::Declined(text);
        }

        let finish_reason = candidate.and_then(|c| c.finish_reason.clone());
        let block_reason = response
            .prompt_feedback
            .as_ref()
            .and_then(|f| f.block_reason.clone());

        let is_safety = |r: &Option<String>| {
            r.as_deref()
                .map(|r| SAFETY_REASONS.contains(&r))
                .unwrap_or(false)
        };
        if is_safety(&finish_reason) || is_safety(&block_reason) {
            return SynthesisOutcome::SafetyBlocked;
        }

        SynthesisOutcome::Failed(finish_reason.or(block_reason))
    }

    pub fn into_result(self) -> Result<ImagePayload, RemoteError> {
        match self {
            SynthesisOutcome::Image(payload) => Ok(payload),
            SynthesisOutcome::Declined(text) => {
                Err(RemoteError::SynthesisRefused(Refusal::Declined(text)))
            }
            SynthesisOutcome::SafetyBlocked => {
                Err(RemoteError::SynthesisRefused(Refusal::SafetyBlocked))
            }
            SynthesisOutcome::Failed(reason) => Err(RemoteError::SynthesisFailed { reason }),
        }
    }
}

/// The photo followed by the mode's instruction, with permissive safety settings.
pub fn build_request(original: &ImagePayload, mode: Mode) -> GenerateContentRequest {
    GenerateContentRequest {
        contents: vec![Content::user(vec![
            Part::image(original),
            Part::text(prompts::synthesis_prompt(mode)),
        ])],
        generation_config: Some(settings::image_generation_config()),
        safety_settings: settings::permissive_safety_settings(),
    }
}

pub struct GeminiSynthesizer<G> {
    generator: G,
    model: String,
}

impl<G: ContentGenerator> GeminiSynthesizer<G> {
    pub fn new(generator: G) -> Self {
        Self {
            generator,
            model: settings::IMAGE_MODEL.to_string(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl<G: ContentGenerator> Synthesizer for GeminiSynthesizer<G> {
    async fn synthesize(
        &self,
        original: &ImagePayload,
        mode: Mode,
    ) -> Result<ImagePayload, RemoteError> {
        let request = build_request(original, mode);
        let response = self.generator.generate_content(&self.model, &request).await?;

        let outcome = SynthesisOutcome::interpret(&response);
        match &outcome {
            SynthesisOutcome::Image(payload) => {
                tracing::info!(%mode, media_type = payload.media_type(), "projection received");
            }
            SynthesisOutcome::Declined(text) => {
                tracing::warn!(%mode, text = %text, "model answered without an image");
            }
            SynthesisOutcome::SafetyBlocked => {
                tracing::warn!(%mode, "projection blocked by safety filters");
            }
            SynthesisOutcome::Failed(reason) => {
                tracing::error!(%mode, reason = ?reason, "projection failed");
            }
        }
        outcome.into_result()
    }
}
