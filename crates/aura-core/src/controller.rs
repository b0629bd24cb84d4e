//! Application controller: owns the session and runs one analysis at a time.

use crate::compare::ViewMode;
use crate::error::RemoteError;
use crate::payload::ImagePayload;
use crate::session::{Session, SessionError};
use crate::types::{AnalysisResult, Analyzer, Mode, Synthesizer};
use std::time::Duration;
use tokio::sync::watch;

/// Pause before the first remote call. Cosmetic only.
pub const DEFAULT_PROGRESS_DELAY: Duration = Duration::from_millis(1500);

/// Progress reported while a run is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    Mapping,
    Projecting(Mode),
    Prescribing,
    Done,
    Failed,
}

impl Stage {
    pub fn message(self) -> &'static str {
        match self {
            Stage::Idle => "",
            Stage::Mapping => "Mapping facial topography...",
            Stage::Projecting(Mode::GoldenRatio) => "Computing Phi projections...",
            Stage::Projecting(Mode::Symmetry) => "Calculating bilateral variances...",
            Stage::Prescribing => "Synthesizing corrective protocol...",
            Stage::Done => "Analysis complete",
            Stage::Failed => "Analysis interrupted",
        }
    }
}

/// Drives a [`Session`] through synthesis and analysis.
///
/// `run` borrows the controller mutably for its whole duration, so a second
/// analysis cannot start while one is in flight.
pub struct Controller<S, A> {
    synthesizer: S,
    analyzer: A,
    mode: Mode,
    view: ViewMode,
    session: Session,
    progress_delay: Duration,
    stage_tx: watch::Sender<Stage>,
}

impl<S: Synthesizer, A: Analyzer> Controller<S, A> {
    pub fn new(synthesizer: S, analyzer: A) -> Self {
        let (stage_tx, _) = watch::channel(Stage::Idle);
        Self {
            synthesizer,
            analyzer,
            mode: Mode::default(),
            view: ViewMode::default(),
            session: Session::Upload,
            progress_delay: DEFAULT_PROGRESS_DELAY,
            stage_tx,
        }
    }

    pub fn with_progress_delay(mut self, delay: Duration) -> Self {
        self.progress_delay = delay;
        self
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Select the mode for the next run. Only allowed while waiting for a photo.
    pub fn set_mode(&mut self, mode: Mode) -> Result<(), SessionError> {
        match self.session {
            Session::Upload => {
                self.mode = mode;
                Ok(())
            }
            Session::Analyzing { .. } => Err(SessionError::Busy),
            Session::Results(_) | Session::Error { .. } => Err(SessionError::NotIdle),
        }
    }

    pub fn view_mode(&self) -> ViewMode {
        self.view
    }

    pub fn set_view_mode(&mut self, view: ViewMode) {
        self.view = view;
    }

    /// Watch progress stages of the current run.
    pub fn subscribe(&self) -> watch::Receiver<Stage> {
        self.stage_tx.subscribe()
    }

    /// Analyze a freshly acquired photo.
    ///
    /// Remote failures do not surface as `Err`: they move the session to
    /// [`Session::Error`]. `Err` means the session was not in `Upload`.
    pub async fn run(&mut self, original: ImagePayload) -> Result<&Session, SessionError> {
        let mode = self.mode;
        self.session.begin(original, mode)?;
        tracing::info!(%mode, "analysis started");

        let outcome = match &self.session {
            Session::Analyzing { original, .. } => {
                pipeline(
                    &self.synthesizer,
                    &self.analyzer,
                    &self.stage_tx,
                    self.progress_delay,
                    original,
                    mode,
                )
                .await
            }
            _ => return Err(SessionError::NotAnalyzing),
        };

        match outcome {
            Ok((synthesized, analysis)) => {
                tracing::info!(
                    symmetry = analysis.symmetry_score,
                    achievability = analysis.achievability_score,
                    exercises = analysis.exercises.len(),
                    "analysis complete"
                );
                self.session.complete(synthesized, analysis)?;
                self.stage_tx.send_replace(Stage::Done);
            }
            Err(err) => {
                tracing::warn!(error = %err, "analysis failed");
                self.session.fail(err.user_message())?;
                self.stage_tx.send_replace(Stage::Failed);
            }
        }
        Ok(&self.session)
    }

    /// Clear the session back to `Upload`. Also restores the slider view.
    pub fn reset(&mut self) {
        tracing::debug!(from = ?self.session.phase(), "session reset");
        self.session.reset();
        self.view = ViewMode::default();
        self.stage_tx.send_replace(Stage::Idle);
    }
}

/// Synthesis then analysis, strictly in order: the second call needs the
/// first call's image.
async fn pipeline<S: Synthesizer, A: Analyzer>(
    synthesizer: &S,
    analyzer: &A,
    stage_tx: &watch::Sender<Stage>,
    delay: Duration,
    original: &ImagePayload,
    mode: Mode,
) -> Result<(ImagePayload, AnalysisResult), RemoteError> {
    stage_tx.send_replace(Stage::Mapping);
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }

    stage_tx.send_replace(Stage::Projecting(mode));
    let synthesized = synthesizer.synthesize(original, mode).await?;
    tracing::debug!(media_type = synthesized.media_type(), "projection received");

    stage_tx.send_replace(Stage::Prescribing);
    let analysis = analyzer.analyze(original, &synthesized, mode).await?;
    Ok((synthesized, analysis))
}
