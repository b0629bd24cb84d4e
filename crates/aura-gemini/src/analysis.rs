//! Structured critique of an original face against its projection.

use crate::client::ContentGenerator;
use crate::prompts;
use crate::settings;
use crate::wire::{Content, GenerateContentRequest, GenerateContentResponse, GenerationConfig, Part};
use async_trait::async_trait;
use aura_core::{AnalysisResult, Analyzer, Difficulty, EmptyResponse, ImagePayload, Mode, RemoteError};
use serde_json::{json, Value};

/// JSON schema the model is constrained to.
pub fn response_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "symmetryScore": {
                "type": "NUMBER",
                "description": "Current symmetry score out of 100"
            },
            "achievabilityScore": {
                "type": "NUMBER",
                "description": "Percentage of the ideal look achievable through natural exercise (0-100)"
            },
            "analysisSummary": {
                "type": "STRING",
                "description": "A brief paragraph analyzing the user's face structure vs the target."
            },
            "keyDifferences": {
                "type": "ARRAY",
                "items": { "type": "STRING" },
                "description": "List of 3-5 key structural differences identified."
            },
            "exercises": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "name": { "type": "STRING" },
                        "targetArea": { "type": "STRING" },
                        "instructions": { "type": "STRING" },
                        "duration": { "type": "STRING" },
                        "difficulty": { "type": "STRING", "enum": Difficulty::LITERALS }
                    },
                    "required": ["name", "targetArea", "instructions", "duration", "difficulty"]
                }
            }
        },
        "required": [
            "symmetryScore",
            "achievabilityScore",
            "analysisSummary",
            "keyDifferences",
            "exercises"
        ]
    })
}

/// Original first, projection second, then the instruction.
pub fn build_request(
    original: &ImagePayload,
    synthesized: &ImagePayload,
    mode: Mode,
) -> GenerateContentRequest {
    GenerateContentRequest {
        contents: vec![Content::user(vec![
            Part::image(original),
            Part::image(synthesized),
            Part::text(prompts::analysis_instruction(mode)),
        ])],
        generation_config: Some(GenerationConfig {
            response_mime_type: Some("application/json".into()),
            response_schema: Some(response_schema()),
            ..Default::default()
        }),
        safety_settings: settings::permissive_safety_settings(),
    }
}

pub fn parse_response(response: &GenerateContentResponse) -> Result<AnalysisResult, RemoteError> {
    if response.candidates.is_empty() {
        return Err(RemoteError::AnalysisEmpty(EmptyResponse::NoCandidates));
    }
    let text = response.text();
    if text.trim().is_empty() {
        return Err(RemoteError::AnalysisEmpty(EmptyResponse::NoText));
    }
    AnalysisResult::from_json(&text)
}

pub struct GeminiAnalyzer<G> {
    generator: G,
    model: String,
}

impl<G: ContentGenerator> GeminiAnalyzer<G> {
    pub fn new(generator: G) -> Self {
        Self {
            generator,
            model: settings::TEXT_MODEL.to_string(),
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
impl<G: ContentGenerator> Analyzer for GeminiAnalyzer<G> {
    async fn analyze(
        &self,
        original: &ImagePayload,
        synthesized: &ImagePayload,
        mode: Mode,
    ) -> Result<AnalysisResult, RemoteError> {
        let request = build_request(original, synthesized, mode);
        let response = self.generator.generate_content(&self.model, &request).await?;

        match parse_response(&response) {
            Ok(result) => {
                tracing::info!(
                    %mode,
                    symmetry = result.symmetry_score,
                    achievability = result.achievability_score,
                    exercises = result.exercises.len(),
                    "analysis received"
                );
                Ok(result)
            }
            Err(e) => {
                tracing::error!(%mode, error = %e, "analysis failed");
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::TransportError;
    use std::sync::Mutex;

    const RESULT_JSON: &str = r#"{"symmetryScore":81.5,"achievabilityScore":40,"analysisSummary":"Strong midface, slight jaw deviation.","keyDifferences":["jaw width","chin projection","brow height"],"exercises":[{"name":"Mewing","targetArea":"jaw","instructions":"Rest the tongue on the palate.","duration":"All day","difficulty":"Medium"}]}"#;

    struct Canned {
        body: String,
        seen: Mutex<Option<(String, GenerateContentRequest)>>,
    }

    impl Canned {
        fn new(body: impl Into<String>) -> Self {
            Self {
                body: body.into(),
                seen: Mutex::new(None),
            }
        }
    }

    #[async_trait]
    impl ContentGenerator for Canned {
        async fn generate_content(
            &self,
            model: &str,
            request: &GenerateContentRequest,
        ) -> Result<GenerateContentResponse, TransportError> {
            *self.seen.lock().unwrap() = Some((model.to_string(), request.clone()));
            serde_json::from_str(&self.body).map_err(|e| TransportError::Decode(e.to_string()))
        }
    }

    fn text_response(text: &str) -> String {
        json!({"candidates": [{"content": {"parts": [{"text": text}]}, "finishReason": "STOP"}]})
            .to_string()
    }

    fn images() -> (ImagePayload, ImagePayload) {
        (
            ImagePayload::from_base64("image/jpeg", "b3JpZw=="),
            ImagePayload::from_base64("image/png", "aWRlYWw="),
        )
    }

    #[test]
    fn test_schema_requires_every_field() {
        let schema = response_schema();
        let required: Vec<&str> = schema["required"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap())
            .collect();
        assert_eq!(required.len(), 5);
        assert!(required.contains(&"keyDifferences"));
        assert_eq!(
            schema["properties"]["exercises"]["items"]["properties"]["difficulty"]["enum"],
            json!(["Easy", "Medium", "Hard"])
        );
    }

    #[test]
    fn test_request_carries_both_images_in_order() {
        let (orig, ideal) = images();
        let req = build_request(&orig, &ideal, Mode::GoldenRatio);
        let json = serde_json::to_value(&req).unwrap();
        let parts = &json["contents"][0]["parts"];
        assert_eq!(parts[0]["inlineData"]["data"], "b3JpZw==");
        assert_eq!(parts[0]["inlineData"]["mimeType"], "image/jpeg");
        assert_eq!(parts[1]["inlineData"]["data"], "aWRlYWw=");
        assert_eq!(parts[1]["inlineData"]["mimeType"], "image/png");
        assert!(parts[2]["text"].as_str().unwrap().contains("Golden Ratio"));
        assert_eq!(json["generationConfig"]["responseMimeType"], "application/json");
        assert_eq!(json["safetySettings"].as_array().unwrap().len(), 4);
    }

    #[test]
    fn test_no_candidates() {
        let resp: GenerateContentResponse = serde_json::from_str(r#"{"candidates":[]}"#).unwrap();
        let err = parse_response(&resp).unwrap_err();
        assert_eq!(err, RemoteError::AnalysisEmpty(EmptyResponse::NoCandidates));
        assert_eq!(err.user_message(), "No analysis generated by AI.");
    }

    #[test]
    fn test_empty_text() {
        let resp: GenerateContentResponse =
            serde_json::from_str(r#"{"candidates":[{"content":{"parts":[{"text":""}]}}]}"#).unwrap();
        assert_eq!(
            parse_response(&resp).unwrap_err(),
            RemoteError::AnalysisEmpty(EmptyResponse::NoText)
        );
    }

    #[test]
    fn test_missing_field_is_unparseable() {
        let body = text_response(r#"{"symmetryScore":50,"achievabilityScore":50,"analysisSummary":"x","keyDifferences":[]}"#);
        let resp: GenerateContentResponse = serde_json::from_str(&body).unwrap();
        assert!(matches!(
            parse_response(&resp),
            Err(RemoteError::AnalysisUnparseable(_))
        ));
    }

    #[test]
    fn test_prose_is_unparseable() {
        let resp: GenerateContentResponse =
            serde_json::from_str(&text_response("Sorry, I can't analyze faces.")).unwrap();
        assert!(matches!(
            parse_response(&resp),
            Err(RemoteError::AnalysisUnparseable(_))
        ));
    }

    #[tokio::test]
    async fn test_analyze_returns_result() {
        let analyzer = GeminiAnalyzer::new(Canned::new(text_response(RESULT_JSON)));
        let (orig, ideal) = images();
        let result = analyzer.analyze(&orig, &ideal, Mode::Symmetry).await.unwrap();
        assert_eq!(result.symmetry_score, 81.5);
        assert_eq!(result.key_differences.len(), 3);
        assert_eq!(result.exercises[0].difficulty, Difficulty::Medium);

        let seen = analyzer.generator.seen.lock().unwrap();
        let (model, request) = seen.as_ref().unwrap();
        assert_eq!(model, settings::TEXT_MODEL);
        assert_eq!(request.contents[0].parts.len(), 3);
    }

    #[tokio::test]
    async fn test_analyze_rejects_out_of_range_score() {
        let body = RESULT_JSON.replace("81.5", "140");
        let analyzer = GeminiAnalyzer::new(Canned::new(text_response(&body)));
        let (orig, ideal) = images();
        let err = analyzer.analyze(&orig, &ideal, Mode::GoldenRatio).await.unwrap_err();
        assert!(matches!(err, RemoteError::AnalysisUnparseable(_)));
    }
}
