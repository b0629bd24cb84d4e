//! aura-gemini: Gemini-backed synthesis and analysis.
//!
//! [`GeminiSynthesizer`] and [`GeminiAnalyzer`] implement the `aura-core`
//! remote traits on top of any [`ContentGenerator`]; [`GeminiClient`] is the
//! HTTP one.

pub mod analysis;
pub mod client;
pub mod prompts;
pub mod settings;
pub mod synthesis;
pub mod wire;

pub use analysis::GeminiAnalyzer;
pub use client::{ContentGenerator, GeminiClient, TransportError, DEFAULT_API_BASE, DEFAULT_TIMEOUT};
pub use synthesis::{GeminiSynthesizer, SynthesisOutcome};
