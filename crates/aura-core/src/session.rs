//! Session state machine: Upload → Analyzing → Results | Error.
//!
//! Each state carries exactly the data valid in it, so a result without a
//! synthesized image (or vice versa) cannot be constructed.

use crate::payload::ImagePayload;
use crate::types::{AnalysisResult, Mode};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("an analysis is already in progress")]
    Busy,
    #[error("session is not analyzing")]
    NotAnalyzing,
    #[error("previous scan must be cleared before starting a new one")]
    NotIdle,
}

/// Everything held once a run succeeds.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanResults {
    pub mode: Mode,
    pub original: ImagePayload,
    pub synthesized: ImagePayload,
    pub analysis: AnalysisResult,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum Session {
    /// Waiting for a photo.
    #[default]
    Upload,
    Analyzing {
        mode: Mode,
        original: ImagePayload,
    },
    Results(Box<ScanResults>),
    Error {
        message: String,
    },
}

/// State discriminant, for logging and display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Upload,
    Analyzing,
    Results,
    Error,
}

impl Session {
    pub fn phase(&self) -> Phase {
        match self {
            Session::Upload => Phase::Upload,
            Session::Analyzing { .. } => Phase::Analyzing,
            Session::Results(_) => Phase::Results,
            Session::Error { .. } => Phase::Error,
        }
    }

    /// Enter `Analyzing` with a freshly acquired photo. Only valid from `Upload`.
    pub fn begin(&mut self, original: ImagePayload, mode: Mode) -> Result<(), SessionError> {
        match self {
            Session::Upload => {
                *self = Session::Analyzing { mode, original };
                Ok(())
            }
            Session::Analyzing { .. } => Err(SessionError::Busy),
            Session::Results(_) | Session::Error { .. } => Err(SessionError::NotIdle),
        }
    }

    /// Move `Analyzing` to `Results`, taking ownership of the original photo.
    pub fn complete(
        &mut self,
        synthesized: ImagePayload,
        analysis: AnalysisResult,
    ) -> Result<(), SessionError> {
        match std::mem::take(self) {
            Session::Analyzing { mode, original } => {
                *self = Session::Results(Box::new(ScanResults {
                    mode,
                    original,
                    synthesized,
                    analysis,
                }));
                Ok(())
            }
            other => {
                *self = other;
                Err(SessionError::NotAnalyzing)
            }
        }
    }

    /// Move `Analyzing` to `Error`, dropping the held photo.
    pub fn fail(&mut self, message: impl Into<String>) -> Result<(), SessionError> {
        if !matches!(self, Session::Analyzing { .. }) {
            return Err(SessionError::NotAnalyzing);
        }
        *self = Session::Error {
            message: message.into(),
        };
        Ok(())
    }

    /// Return to `Upload`, clearing every held image and result.
    pub fn reset(&mut self) {
        *self = Session::Upload;
    }

    pub fn original(&self) -> Option<&ImagePayload> {
        match self {
            Session::Analyzing { original, .. } => Some(original),
            Session::Results(r) => Some(&r.original),
            Session::Upload | Session::Error { .. } => None,
        }
    }

    pub fn results(&self) -> Option<&ScanResults> {
        match self {
            Session::Results(r) => Some(r),
            _ => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            Session::Error { message } => Some(message),
            _ => None,
        }
    }
}
