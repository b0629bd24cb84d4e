//! Before/after comparison rendering: draggable split and looping cross-fade.

use image::{imageops, DynamicImage, Rgba, RgbaImage};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Width of the white divider drawn at the split, in pixels.
pub const DIVIDER_WIDTH: u32 = 4;

const DIVIDER_COLOR: Rgba<u8> = Rgba([255, 255, 255, 255]);

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    #[error("cannot render an empty image ({width}x{height})")]
    EmptyImage { width: u32, height: u32 },
}

/// How the two images are presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewMode {
    #[default]
    Slider,
    Morph,
}

impl FromStr for ViewMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "slider" | "split" => Ok(ViewMode::Slider),
            "morph" | "fade" | "crossfade" => Ok(ViewMode::Morph),
            other => Err(format!("unknown view '{other}' (expected slider or morph)")),
        }
    }
}

/// Divider position as a percentage of the container width, always in [0, 100].
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct SliderPosition(f32);

impl Default for SliderPosition {
    fn default() -> Self {
        Self(50.0)
    }
}

impl SliderPosition {
    pub const MIN: f32 = 0.0;
    pub const MAX: f32 = 100.0;

    /// Clamp `percent` into range. NaN becomes 0.
    pub fn new(percent: f32) -> Self {
        if percent.is_nan() {
            return Self(Self::MIN);
        }
        Self(percent.clamp(Self::MIN, Self::MAX))
    }

    /// Position for a pointer at `pointer_x` over a container spanning
    /// `container_left..container_left + container_width`. Pointers outside
    /// the container pin to the nearest edge.
    pub fn from_pointer(pointer_x: f32, container_left: f32, container_width: f32) -> Self {
        if container_width.is_nan() || container_width <= 0.0 {
            return Self(Self::MIN);
        }
        let x = (pointer_x - container_left).clamp(0.0, container_width);
        Self::new(x / container_width * 100.0)
    }

    pub fn percent(self) -> f32 {
        self.0
    }

    /// First column that shows the synthesized image for a `width`-pixel render.
    pub fn split_column(self, width: u32) -> u32 {
        ((width as f32 * self.0 / 100.0).round() as u32).min(width)
    }
}

/// Looping fade of the synthesized image over the original.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CrossFade {
    pub period: Duration,
}

impl Default for CrossFade {
    fn default() -> Self {
        Self {
            period: Duration::from_secs(3),
        }
    }
}

impl CrossFade {
    /// Opacity of the synthesized image at `elapsed`: 0 at the loop start,
    /// 1 at half period, back to 0, with ease-in-out.
    pub fn opacity_at(&self, elapsed: Duration) -> f32 {
        let period = self.period.as_secs_f32();
        if period <= 0.0 {
            return 1.0;
        }
        let phase = (elapsed.as_secs_f32() % period) / period;
        let tri = 1.0 - (2.0 * phase - 1.0).abs();
        tri * tri * (3.0 - 2.0 * tri)
    }
}

/// Original on the left of the divider, synthesized on the right.
/// `after` is resized to match `before`.
pub fn render_split(
    before: &DynamicImage,
    after: &DynamicImage,
    position: SliderPosition,
) -> Result<RgbaImage, RenderError> {
    let before = before.to_rgba8();
    let (width, height) = check_dimensions(&before)?;
    let mut out = fit(after, width, height);

    let split = position.split_column(width);
    for y in 0..height {
        for x in 0..split {
            out.put_pixel(x, y, *before.get_pixel(x, y));
        }
    }

    let start = split.saturating_sub(DIVIDER_WIDTH / 2);
    let end = (split + DIVIDER_WIDTH / 2).min(width);
    for y in 0..height {
        for x in start..end {
            out.put_pixel(x, y, DIVIDER_COLOR);
        }
    }
    Ok(out)
}

/// Blend `after` over `before` at the given opacity (0 = original only).
pub fn render_crossfade(
    before: &DynamicImage,
    after: &DynamicImage,
    opacity: f32,
) -> Result<RgbaImage, RenderError> {
    let before = before.to_rgba8();
    let (width, height) = check_dimensions(&before)?;
    let after = fit(after, width, height);
    let alpha = if opacity.is_nan() { 0.0 } else { opacity.clamp(0.0, 1.0) };

    let mut out = before;
    for (x, y, px) in out.enumerate_pixels_mut() {
        let top = after.get_pixel(x, y);
        for c in 0..4 {
            let mixed = px[c] as f32 * (1.0 - alpha) + top[c] as f32 * alpha;
            px[c] = mixed.round().clamp(0.0, 255.0) as u8;
        }
    }
    Ok(out)
}

fn check_dimensions(img: &RgbaImage) -> Result<(u32, u32), RenderError> {
    let (width, height) = img.dimensions();
    if width == 0 || height == 0 {
        return Err(RenderError::EmptyImage { width, height });
    }
    Ok((width, height))
}

fn fit(img: &DynamicImage, width: u32, height: u32) -> RgbaImage {
    let rgba = img.to_rgba8();
    if rgba.dimensions() == (width, height) {
        rgba
    } else {
        imageops::resize(&rgba, width, height, imageops::FilterType::Triangle)
    }
}
