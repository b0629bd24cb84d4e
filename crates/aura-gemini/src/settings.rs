//! Model names and sampling parameters.

use crate::wire::{GenerationConfig, HarmBlockThreshold, HarmCategory, SafetySetting};

pub const IMAGE_MODEL: &str = "gemini-2.5-flash-image";
pub const TEXT_MODEL: &str = "gemini-2.5-flash";

pub const TEMPERATURE: f32 = 0.8;
pub const TOP_P: f32 = 0.95;
pub const TOP_K: u32 = 40;

/// Sampling for image synthesis.
pub fn image_generation_config() -> GenerationConfig {
    GenerationConfig {
        temperature: Some(TEMPERATURE),
        top_p: Some(TOP_P),
        top_k: Some(TOP_K),
        ..Default::default()
    }
}

/// Every harm category with blocking disabled.
///
/// Portraits of faces regularly trip the default thresholds.
pub fn permissive_safety_settings() -> Vec<SafetySetting> {
    HarmCategory::ALL
        .iter()
        .map(|&category| SafetySetting {
            category,
            threshold: HarmBlockThreshold::BlockNone,
        })
        .collect()
}
