//! Errors surfaced by the remote synthesis and analysis calls.

use thiserror::Error;

/// Longest model explanation surfaced verbatim when no image comes back.
pub const REFUSAL_TEXT_LIMIT: usize = 150;

/// Message shown when the synthesis request is blocked by safety filters.
pub const SAFETY_BLOCK_MESSAGE: &str =
    "The image was flagged by safety filters. Please try a clearer, neutral portrait.";

/// Why the synthesis model returned no image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Refusal {
    /// The model answered with text instead of an image.
    Declined(String),
    /// The prompt or the candidate was blocked for safety.
    SafetyBlocked,
}

/// Which part of the analysis response was missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmptyResponse {
    NoCandidates,
    NoText,
}

impl EmptyResponse {
    fn message(self) -> &'static str {
        match self {
            EmptyResponse::NoCandidates => "No analysis generated by AI.",
            EmptyResponse::NoText => "Analysis generated empty response.",
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RemoteError {
    #[error("{}", refusal_message(.0))]
    SynthesisRefused(Refusal),
    #[error("AI generation failed. Reason: {}", .reason.as_deref().unwrap_or("Unknown"))]
    SynthesisFailed { reason: Option<String> },
    #[error("{}", .0.message())]
    AnalysisEmpty(EmptyResponse),
    #[error("analysis response could not be parsed: {0}")]
    AnalysisUnparseable(String),
    #[error("request failed: {0}")]
    Transport(String),
}

impl RemoteError {
    /// Message shown to the user in the error state.
    pub fn user_message(&self) -> String {
        self.to_string()
    }
}

fn refusal_message(refusal: &Refusal) -> String {
    match refusal {
        Refusal::Declined(text) => format!("Model response (No Image): {}", truncate_text(text)),
        Refusal::SafetyBlocked => SAFETY_BLOCK_MESSAGE.to_string(),
    }
}

/// Cut `text` to [`REFUSAL_TEXT_LIMIT`] characters, appending `...` when cut.
pub fn truncate_text(text: &str) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(REFUSAL_TEXT_LIMIT).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declined_message_contains_text() {
        let err = RemoteError::SynthesisRefused(Refusal::Declined("I can't edit faces.".into()));
        assert_eq!(
            err.user_message(),
            "Model response (No Image): I can't edit faces."
        );
    }

    #[test]
    fn test_declined_message_truncated() {
        let long = "x".repeat(400);
        let msg = RemoteError::SynthesisRefused(Refusal::Declined(long.clone())).user_message();
        assert!(msg.contains(&long[..REFUSAL_TEXT_LIMIT]));
        assert!(!msg.contains(&long[..REFUSAL_TEXT_LIMIT + 1]));
        assert!(msg.ends_with("..."));
    }

    #[test]
    fn test_truncate_counts_characters() {
        let text = "é".repeat(REFUSAL_TEXT_LIMIT);
        assert_eq!(truncate_text(&text), text);
        let longer = "é".repeat(REFUSAL_TEXT_LIMIT + 3);
        assert_eq!(truncate_text(&longer).chars().count(), REFUSAL_TEXT_LIMIT + 3);
    }

    #[test]
    fn test_safety_message() {
        let err = RemoteError::SynthesisRefused(Refusal::SafetyBlocked);
        assert_eq!(err.user_message(), SAFETY_BLOCK_MESSAGE);
    }

    #[test]
    fn test_empty_analysis_messages_distinct() {
        let a = RemoteError::AnalysisEmpty(EmptyResponse::NoCandidates).user_message();
        let b = RemoteError::AnalysisEmpty(EmptyResponse::NoText).user_message();
        assert_eq!(a, "No analysis generated by AI.");
        assert_eq!(b, "Analysis generated empty response.");
    }

    #[test]
    fn test_failed_reason() {
        let err = RemoteError::SynthesisFailed { reason: Some("MAX_TOKENS".into()) };
        assert_eq!(err.user_message(), "AI generation failed. Reason: MAX_TOKENS");
        let err = RemoteError::SynthesisFailed { reason: None };
        assert_eq!(err.user_message(), "AI generation failed. Reason: Unknown");
    }
}
