use anyhow::{bail, Context, Result};
use aura_core::compare::{SliderPosition, ViewMode};
use aura_core::scan::ScanOverlay;
use aura_core::{Controller, ImagePayload, Mode, Session};
use aura_gemini::{GeminiAnalyzer, GeminiClient, GeminiSynthesizer};
use aura_hw::{Camera, Facing};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

mod camera_prompt;
mod config;
mod report;

use config::Config;

#[derive(Parser)]
#[command(name = "aura", about = "Aura facial projection and analysis CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Project a face onto an ideal and get a corrective plan
    Analyze {
        /// Target ideal: golden-ratio or symmetry
        #[arg(short, long, default_value = "golden-ratio")]
        mode: Mode,
        /// Photo to analyze
        #[arg(short, long, conflicts_with = "camera", required_unless_present = "camera")]
        image: Option<PathBuf>,
        /// Take the photo with the camera instead
        #[arg(long)]
        camera: bool,
        /// Comparison view to save: slider or morph
        #[arg(long, default_value = "slider")]
        view: ViewMode,
        /// Slider divider position, 0-100
        #[arg(long, default_value_t = 50.0)]
        position: f32,
        /// Output directory (overrides the configured one)
        #[arg(short, long)]
        out_dir: Option<PathBuf>,
    },
    /// Render a before/after comparison offline
    Compare {
        #[arg(long)]
        before: PathBuf,
        #[arg(long)]
        after: PathBuf,
        #[arg(long, default_value = "slider")]
        view: ViewMode,
        #[arg(long, default_value_t = 50.0)]
        position: f32,
        /// Point in the 3 s morph loop to render
        #[arg(long, default_value_t = 750)]
        time_ms: u64,
        #[arg(short, long)]
        out: PathBuf,
    },
    /// Render the scanning animation over a photo
    ScanPreview {
        #[arg(long)]
        image: PathBuf,
        #[arg(long)]
        out_dir: PathBuf,
        /// Frames across one 2 s loop
        #[arg(long, default_value_t = 12)]
        frames: usize,
    },
    /// List video capture devices
    Devices,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze {
            mode,
            image,
            camera,
            view,
            position,
            out_dir,
        } => {
            let config = Config::load()?;
            config.require_api_key()?;
            let original = match (image, camera) {
                (Some(path), _) => ImagePayload::from_file(&path)
                    .with_context(|| format!("loading {}", path.display()))?,
                (None, true) => match take_photo(&config).await? {
                    Some(photo) => photo,
                    None => {
                        println!("Cancelled.");
                        return Ok(());
                    }
                },
                (None, false) => bail!("either --image or --camera is required"),
            };
            let out_dir = out_dir.unwrap_or_else(|| config.output_dir.clone());
            analyze(&config, mode, original, view, SliderPosition::new(position), out_dir).await?;
        }
        Commands::Compare {
            before,
            after,
            view,
            position,
            time_ms,
            out,
        } => {
            let before = ImagePayload::from_file(&before)?.decode_image()?;
            let after = ImagePayload::from_file(&after)?.decode_image()?;
            let img = report::render_comparison(
                &before,
                &after,
                view,
                SliderPosition::new(position),
                Duration::from_millis(time_ms),
            )?;
            report::save_comparison(img, &out)?;
            println!("Wrote {}", out.display());
        }
        Commands::ScanPreview {
            image,
            out_dir,
            frames,
        } => {
            let source = ImagePayload::from_file(&image)?.decode_image()?;
            std::fs::create_dir_all(&out_dir)
                .with_context(|| format!("creating {}", out_dir.display()))?;
            for (i, frame) in ScanOverlay::default().frames(&source, frames).iter().enumerate() {
                let path = out_dir.join(format!("scan-{i:03}.png"));
                frame
                    .save(&path)
                    .with_context(|| format!("saving {}", path.display()))?;
            }
            println!("Wrote {frames} frames to {}", out_dir.display());
        }
        Commands::Devices => {
            let devices = aura_hw::list_devices();
            if devices.is_empty() {
                println!("No video capture devices found.");
                return Ok(());
            }
            let preferred = aura_hw::select_device(&devices, Facing::User).map(|d| d.path.clone());
            for dev in &devices {
                let marker = if preferred.as_deref() == Some(dev.path.as_str()) {
                    "*"
                } else {
                    " "
                };
                println!("{marker} {}  {} ({}, {})", dev.path, dev.name, dev.driver, dev.bus);
            }
        }
    }

    Ok(())
}

/// Run the interactive capture on a blocking thread; V4L2 and stdin both block.
async fn take_photo(config: &Config) -> Result<Option<ImagePayload>> {
    let device = config.camera_device.clone();
    let warmup = config.warmup_frames;
    tokio::task::spawn_blocking(move || -> Result<Option<ImagePayload>> {
        let camera = match device {
            Some(path) => Camera::new(path),
            None => Camera::discover(Facing::User)?,
        }
        .with_warmup_frames(warmup);
        let stdin = std::io::stdin();
        let mut input = stdin.lock();
        let mut out = std::io::stdout();
        camera_prompt::capture_photo(camera, &mut input, &mut out)
    })
    .await?
}

async fn analyze(
    config: &Config,
    mode: Mode,
    original: ImagePayload,
    view: ViewMode,
    position: SliderPosition,
    out_dir: PathBuf,
) -> Result<()> {
    let client = GeminiClient::new(
        config.require_api_key()?,
        config.api_base.clone(),
        config.request_timeout(),
    )?;
    let synthesizer = GeminiSynthesizer::new(client.clone()).with_model(config.image_model.clone());
    let analyzer = GeminiAnalyzer::new(client).with_model(config.text_model.clone());
    let mut controller =
        Controller::new(synthesizer, analyzer).with_progress_delay(config.progress_delay());
    controller.set_mode(mode)?;
    controller.set_view_mode(view);

    let mut stages = controller.subscribe();
    let session = {
        let run = controller.run(original);
        tokio::pin!(run);
        loop {
            tokio::select! {
                result = &mut run => break result?.clone(),
                Ok(()) = stages.changed() => {
                    let message = stages.borrow_and_update().message();
                    if !message.is_empty() {
                        println!("{message}");
                    }
                }
            }
        }
    };

    match session {
        Session::Results(results) => {
            let mut stdout = std::io::stdout();
            report::print_results(&mut stdout, &results)?;
            let millis = chrono::Utc::now().timestamp_millis();
            let saved =
                report::save_outputs(&out_dir, &results, controller.view_mode(), position, millis)?;
            report::print_saved(&mut stdout, results.mode, &saved)?;
        }
        Session::Error { message } => {
            controller.reset();
            bail!("analysis failed: {message}");
        }
        other => bail!("analysis ended in unexpected state {:?}", other.phase()),
    }
    Ok(())
}
