use crate::error::RemoteError;
use crate::payload::ImagePayload;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The cosmetic ideal a face is reconstructed towards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Proportions following Phi (1.618).
    #[default]
    GoldenRatio,
    /// Bilateral symmetry about the facial midline.
    Symmetry,
}

impl Mode {
    /// Identifier used in file names and on the wire (`golden_ratio`, `symmetry`).
    pub fn slug(self) -> &'static str {
        match self {
            Mode::GoldenRatio => "golden_ratio",
            Mode::Symmetry => "symmetry",
        }
    }

    /// Label used when describing the generated image to the analysis model.
    pub fn analysis_label(self) -> &'static str {
        match self {
            Mode::GoldenRatio => "Golden Ratio",
            Mode::Symmetry => "Perfect Symmetry",
        }
    }

    /// Label drawn over the synthesized side of a comparison.
    pub fn after_label(self) -> &'static str {
        match self {
            Mode::GoldenRatio => "Golden Ratio",
            Mode::Symmetry => "Symmetrical",
        }
    }

    /// Heading for the results view.
    pub fn projection_title(self) -> &'static str {
        match self {
            Mode::GoldenRatio => "Golden Ratio Projection",
            Mode::Symmetry => "Symmetry Alignment",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "golden_ratio" | "golden" | "phi" => Ok(Mode::GoldenRatio),
            "symmetry" | "symmetric" => Ok(Mode::Symmetry),
            other => Err(format!("unknown mode '{other}' (expected golden-ratio or symmetry)")),
        }
    }
}

/// Exercise difficulty. Serialized as the literals `Easy`, `Medium`, `Hard`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub const LITERALS: [&'static str; 3] = ["Easy", "Medium", "Hard"];

    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Medium => "Medium",
            Difficulty::Hard => "Hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A recommended facial exercise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exercise {
    pub name: String,
    pub target_area: String,
    pub instructions: String,
    pub duration: String,
    pub difficulty: Difficulty,
}

/// Structured critique comparing the original face with its projection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    /// Current symmetry score, 0–100.
    pub symmetry_score: f64,
    /// Share of the projected change reachable without surgery, 0–100.
    pub achievability_score: f64,
    pub analysis_summary: String,
    pub key_differences: Vec<String>,
    pub exercises: Vec<Exercise>,
}

impl AnalysisResult {
    /// Parse and validate the JSON body returned by the analysis model.
    ///
    /// Missing fields, wrong types, unknown difficulty literals and
    /// out-of-range scores are all rejected; nothing is defaulted.
    pub fn from_json(text: &str) -> Result<Self, RemoteError> {
        let result: AnalysisResult = serde_json::from_str(text)
            .map_err(|e| RemoteError::AnalysisUnparseable(e.to_string()))?;
        result.validate()?;
        Ok(result)
    }

    /// Check score ranges.
    pub fn validate(&self) -> Result<(), RemoteError> {
        for (field, value) in [
            ("symmetryScore", self.symmetry_score),
            ("achievabilityScore", self.achievability_score),
        ] {
            if !value.is_finite() || !(0.0..=100.0).contains(&value) {
                return Err(RemoteError::AnalysisUnparseable(format!(
                    "{field} out of range: {value} (expected 0-100)"
                )));
            }
        }
        Ok(())
    }
}

/// Produces an idealized face from a source photo.
#[async_trait]
pub trait Synthesizer: Send + Sync {
    async fn synthesize(
        &self,
        original: &ImagePayload,
        mode: Mode,
    ) -> Result<ImagePayload, RemoteError>;
}

/// Produces a structured critique comparing the original and idealized faces.
#[async_trait]
pub trait Analyzer: Send + Sync {
    async fn analyze(
        &self,
        original: &ImagePayload,
        synthesized: &ImagePayload,
        mode: Mode,
    ) -> Result<AnalysisResult, RemoteError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "symmetryScore": 72,
        "achievabilityScore": 65,
        "analysisSummary": "Mild lower-face asymmetry.",
        "keyDifferences": ["jaw asymmetry", "nose deviation"],
        "exercises": [{
            "name": "Jaw Clench",
            "targetArea": "jaw",
            "instructions": "Clench and hold.",
            "duration": "5 min",
            "difficulty": "Easy"
        }]
    }"#;

    #[test]
    fn test_parse_complete_result() {
        let result = AnalysisResult::from_json(SAMPLE).unwrap();
        assert_eq!(result.symmetry_score, 72.0);
        assert_eq!(result.achievability_score, 65.0);
        assert_eq!(result.key_differences, vec!["jaw asymmetry", "nose deviation"]);
        assert_eq!(result.exercises.len(), 1);
        assert_eq!(result.exercises[0].target_area, "jaw");
        assert_eq!(result.exercises[0].difficulty, Difficulty::Easy);
    }

    #[test]
    fn test_missing_top_level_field_is_unparseable() {
        for field in [
            "symmetryScore",
            "achievabilityScore",
            "analysisSummary",
            "keyDifferences",
            "exercises",
        ] {
            let mut value: serde_json::Value = serde_json::from_str(SAMPLE).unwrap();
            value.as_object_mut().unwrap().remove(field);
            let err = AnalysisResult::from_json(&value.to_string()).unwrap_err();
            assert!(
                matches!(err, RemoteError::AnalysisUnparseable(_)),
                "removing {field} gave {err:?}"
            );
        }
    }

    #[test]
    fn test_missing_exercise_field_is_unparseable() {
        let mut value: serde_json::Value = serde_json::from_str(SAMPLE).unwrap();
        value["exercises"][0].as_object_mut().unwrap().remove("duration");
        let err = AnalysisResult::from_json(&value.to_string()).unwrap_err();
        assert!(matches!(err, RemoteError::AnalysisUnparseable(_)));
    }

    #[test]
    fn test_unknown_difficulty_is_unparseable() {
        let text = SAMPLE.replace("\"Easy\"", "\"Extreme\"");
        let err = AnalysisResult::from_json(&text).unwrap_err();
        assert!(matches!(err, RemoteError::AnalysisUnparseable(_)));
    }

    #[test]
    fn test_out_of_range_score_is_unparseable() {
        let text = SAMPLE.replace("\"symmetryScore\": 72", "\"symmetryScore\": 140");
        let err = AnalysisResult::from_json(&text).unwrap_err();
        assert!(matches!(err, RemoteError::AnalysisUnparseable(msg) if msg.contains("symmetryScore")));
    }

    #[test]
    fn test_not_json_is_unparseable() {
        let err = AnalysisResult::from_json("Sure! Here is your analysis").unwrap_err();
        assert!(matches!(err, RemoteError::AnalysisUnparseable(_)));
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!("golden-ratio".parse::<Mode>().unwrap(), Mode::GoldenRatio);
        assert_eq!("golden_ratio".parse::<Mode>().unwrap(), Mode::GoldenRatio);
        assert_eq!("Symmetry".parse::<Mode>().unwrap(), Mode::Symmetry);
        assert!("beauty".parse::<Mode>().is_err());
    }

    #[test]
    fn test_mode_labels_distinct() {
        assert_ne!(Mode::GoldenRatio.slug(), Mode::Symmetry.slug());
        assert_ne!(Mode::GoldenRatio.after_label(), Mode::Symmetry.after_label());
        assert_eq!(Mode::default(), Mode::GoldenRatio);
    }
}
