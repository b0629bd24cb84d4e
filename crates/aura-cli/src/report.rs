//! Results output: text summary, saved projection and comparison image.

use anyhow::{Context, Result};
use aura_core::compare::{self, CrossFade, SliderPosition, ViewMode};
use aura_core::{download_filename, Mode, ScanResults};
use image::{DynamicImage, RgbaImage};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Point in the cross-fade loop used for still morph renders (a 50/50 blend).
pub const MORPH_STILL_AT: Duration = Duration::from_millis(750);

pub fn comparison_filename(mode: Mode, timestamp_millis: i64) -> String {
    format!("aura-{}-{}-compare.png", mode.slug(), timestamp_millis)
}

/// Render one still of the comparison view.
pub fn render_comparison(
    before: &DynamicImage,
    after: &DynamicImage,
    view: ViewMode,
    position: SliderPosition,
    elapsed: Duration,
) -> Result<RgbaImage> {
    let img = match view {
        ViewMode::Slider => compare::render_split(before, after, position)?,
        ViewMode::Morph => {
            let opacity = CrossFade::default().opacity_at(elapsed);
            compare::render_crossfade(before, after, opacity)?
        }
    };
    Ok(img)
}

/// Write a comparison still. Flattened to RGB so any output format works.
pub fn save_comparison(img: RgbaImage, path: &Path) -> Result<()> {
    DynamicImage::ImageRgba8(img)
        .to_rgb8()
        .save(path)
        .with_context(|| format!("saving comparison to {}", path.display()))
}

/// Side labels of the comparison, before then after.
pub fn comparison_caption(mode: Mode) -> String {
    format!("Original | {}", mode.after_label())
}

#[derive(Debug)]
pub struct SavedFiles {
    pub projection: PathBuf,
    pub comparison: PathBuf,
}

/// Write the projection (PNG) and a comparison still into `dir`.
pub fn save_outputs(
    dir: &Path,
    results: &ScanResults,
    view: ViewMode,
    position: SliderPosition,
    timestamp_millis: i64,
) -> Result<SavedFiles> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("creating output directory {}", dir.display()))?;

    let projection = dir.join(download_filename(results.mode, timestamp_millis));
    results
        .synthesized
        .save_png(&projection)
        .with_context(|| format!("saving projection to {}", projection.display()))?;

    let before = results.original.decode_image().context("decoding original photo")?;
    let after = results.synthesized.decode_image().context("decoding projection")?;
    let still = render_comparison(&before, &after, view, position, MORPH_STILL_AT)?;
    let comparison = dir.join(comparison_filename(results.mode, timestamp_millis));
    save_comparison(still, &comparison)?;

    tracing::info!(
        projection = %projection.display(),
        comparison = %comparison.display(),
        "outputs saved"
    );
    Ok(SavedFiles {
        projection,
        comparison,
    })
}

pub fn print_saved(out: &mut impl Write, mode: Mode, saved: &SavedFiles) -> std::io::Result<()> {
    writeln!(out)?;
    writeln!(out, "Projection saved to {}", saved.projection.display())?;
    writeln!(
        out,
        "Comparison ({}) saved to {}",
        comparison_caption(mode),
        saved.comparison.display()
    )
}

pub fn print_results(out: &mut impl Write, results: &ScanResults) -> std::io::Result<()> {
    let analysis = &results.analysis;
    writeln!(out)?;
    writeln!(out, "== {} ==", results.mode.projection_title())?;
    writeln!(out, "Symmetry score:     {:.0}/100", analysis.symmetry_score)?;
    writeln!(out, "Natural potential:  {:.0}%", analysis.achievability_score)?;
    writeln!(out)?;
    writeln!(out, "Structural analysis")?;
    writeln!(out, "  {}", analysis.analysis_summary)?;

    if !analysis.key_differences.is_empty() {
        writeln!(out)?;
        writeln!(out, "Key divergences")?;
        for diff in &analysis.key_differences {
            writeln!(out, "  - {diff}")?;
        }
    }

    writeln!(out)?;
    writeln!(out, "Corrective protocol")?;
    if analysis.exercises.is_empty() {
        writeln!(out, "  (no exercises recommended)")?;
    }
    for (i, ex) in analysis.exercises.iter().enumerate() {
        writeln!(out, "  {}. {} [{}]", i + 1, ex.name, ex.difficulty)?;
        writeln!(out, "     Target: {}  Duration: {}", ex.target_area, ex.duration)?;
        writeln!(out, "     {}", ex.instructions)?;
    }
    Ok(())
}
