use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Keys checked, in order, for the Gemini API key.
const API_KEY_VARS: [&str; 3] = ["AURA_API_KEY", "GEMINI_API_KEY", "API_KEY"];

/// CLI configuration: `AURA_*` environment variables over an optional TOML file.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub api_key: Option<String>,
    /// Base URL of the Generative Language API.
    pub api_base: String,
    /// Model used to synthesize the projection.
    pub image_model: String,
    /// Model used for the structured analysis.
    pub text_model: String,
    pub request_timeout_secs: u64,
    /// Cosmetic pause before the first remote call.
    pub progress_delay_ms: u64,
    /// V4L2 device path. When unset the user-facing camera is discovered.
    pub camera_device: Option<String>,
    /// Frames discarded after opening the camera (AGC/AE settling).
    pub warmup_frames: usize,
    /// Where projections and comparisons are written.
    pub output_dir: PathBuf,
}

/// On-disk form. Every field optional; unknown keys are rejected.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileConfig {
    api_key: Option<String>,
    api_base: Option<String>,
    image_model: Option<String>,
    text_model: Option<String>,
    request_timeout_secs: Option<u64>,
    progress_delay_ms: Option<u64>,
    camera_device: Option<String>,
    warmup_frames: Option<usize>,
    output_dir: Option<PathBuf>,
}

impl FileConfig {
    fn read(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("parsing config file {}", path.display()))
    }
}

impl Config {
    /// Load the config file (if any) and apply environment overrides.
    pub fn load() -> Result<Self> {
        let env = |key: &str| std::env::var(key).ok();
        let file = match std::env::var("AURA_CONFIG") {
            // An explicitly named file must exist.
            Ok(path) => FileConfig::read(Path::new(&path))?,
            Err(_) => match default_config_path(&env) {
                Some(path) if path.exists() => FileConfig::read(&path)?,
                _ => FileConfig::default(),
            },
        };
        Ok(Self::from_sources(file, &env))
    }

    fn from_sources(file: FileConfig, env: &dyn Fn(&str) -> Option<String>) -> Self {
        let api_key = API_KEY_VARS
            .iter()
            .find_map(|&key| env(key).filter(|v| !v.trim().is_empty()))
            .or(file.api_key);

        Self {
            api_key,
            api_base: env_string(env, "AURA_API_BASE")
                .or(file.api_base)
                .unwrap_or_else(|| aura_gemini::DEFAULT_API_BASE.to_string()),
            image_model: env_string(env, "AURA_IMAGE_MODEL")
                .or(file.image_model)
                .unwrap_or_else(|| aura_gemini::settings::IMAGE_MODEL.to_string()),
            text_model: env_string(env, "AURA_TEXT_MODEL")
                .or(file.text_model)
                .unwrap_or_else(|| aura_gemini::settings::TEXT_MODEL.to_string()),
            request_timeout_secs: env_u64(
                env,
                "AURA_REQUEST_TIMEOUT_SECS",
                file.request_timeout_secs.unwrap_or(120),
            ),
            progress_delay_ms: env_u64(
                env,
                "AURA_PROGRESS_DELAY_MS",
                file.progress_delay_ms.unwrap_or(1500),
            ),
            camera_device: env_string(env, "AURA_CAMERA_DEVICE").or(file.camera_device),
            warmup_frames: env_usize(env, "AURA_WARMUP_FRAMES", file.warmup_frames.unwrap_or(4)),
            output_dir: env_string(env, "AURA_OUTPUT_DIR")
                .map(PathBuf::from)
                .or(file.output_dir)
                .unwrap_or_else(|| PathBuf::from(".")),
        }
    }

    /// The API key, or an error telling the user how to provide one.
    pub fn require_api_key(&self) -> Result<&str> {
        match self.api_key.as_deref() {
            Some(key) if !key.trim().is_empty() => Ok(key),
            _ => bail!("no API key configured; set AURA_API_KEY (or GEMINI_API_KEY) or add api_key to the config file"),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn progress_delay(&self) -> Duration {
        Duration::from_millis(self.progress_delay_ms)
    }
}

/// `$XDG_CONFIG_HOME/aura/config.toml`, falling back to `~/.config`.
fn default_config_path(env: &dyn Fn(&str) -> Option<String>) -> Option<PathBuf> {
    let base = env("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| env("HOME").map(|home| PathBuf::from(home).join(".config")))?;
    Some(base.join("aura").join("config.toml"))
}

fn env_string(env: &dyn Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    env(key).filter(|v| !v.is_empty())
}

fn env_u64(env: &dyn Fn(&str) -> Option<String>, key: &str, default: u64) -> u64 {
    env(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_usize(env: &dyn Fn(&str) -> Option<String>, key: &str, default: usize) -> usize {
    env(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}
