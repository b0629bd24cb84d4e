//! aura-core: Session orchestration and presentation for facial projections.
//!
//! Holds the session state machine and the controller that runs a photo
//! through remote synthesis and analysis, plus the comparison and scanning
//! renderers. The remote calls themselves sit behind the [`Synthesizer`] and
//! [`Analyzer`] traits.

pub mod compare;
pub mod controller;
pub mod error;
pub mod payload;
pub mod scan;
pub mod session;
pub mod types;

pub use controller::{Controller, Stage};
pub use error::{EmptyResponse, Refusal, RemoteError};
pub use payload::{download_filename, ImagePayload, PayloadError};
pub use session::{Phase, ScanResults, Session, SessionError};
pub use types::{AnalysisResult, Analyzer, Difficulty, Exercise, Mode, Synthesizer};
