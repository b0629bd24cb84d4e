//! Scanning overlay shown while an analysis is in flight. Cosmetic only.

use image::{DynamicImage, Rgba, RgbaImage};
use std::time::Duration;

const TINT: [f32; 3] = [16.0, 185.0, 129.0];
const GRID: [f32; 3] = [0.0, 255.0, 170.0];
const LINE: [f32; 3] = [52.0, 211.0, 153.0];

/// Rows of glow drawn on each side of the scan line.
const GLOW_ROWS: u32 = 6;

/// Share of the period spent fading the line in (and, mirrored, out).
const FADE_SHARE: f32 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScanOverlay {
    pub period: Duration,
    pub grid_spacing: u32,
    pub line_thickness: u32,
    pub contrast: f32,
    pub tint_strength: f32,
    pub grid_opacity: f32,
}

impl Default for ScanOverlay {
    fn default() -> Self {
        Self {
            period: Duration::from_secs(2),
            grid_spacing: 20,
            line_thickness: 4,
            contrast: 1.25,
            tint_strength: 0.2,
            // 50% line color under a 30% layer.
            grid_opacity: 0.15,
        }
    }
}

impl ScanOverlay {
    fn phase(&self, elapsed: Duration) -> f32 {
        let period = self.period.as_secs_f32();
        if period <= 0.0 {
            return 0.0;
        }
        (elapsed.as_secs_f32() % period) / period
    }

    /// Vertical position of the scan line as a fraction of the height.
    pub fn line_position(&self, elapsed: Duration) -> f32 {
        self.phase(elapsed)
    }

    /// Scan line opacity: fades in over the first tenth of the loop and
    /// out over the last tenth.
    pub fn line_opacity(&self, elapsed: Duration) -> f32 {
        let phase = self.phase(elapsed);
        if phase < FADE_SHARE {
            phase / FADE_SHARE
        } else if phase > 1.0 - FADE_SHARE {
            (1.0 - phase) / FADE_SHARE
        } else {
            1.0
        }
    }

    /// Render one overlay frame over `source`.
    pub fn render(&self, source: &DynamicImage, elapsed: Duration) -> RgbaImage {
        let gray = source.to_luma8();
        let (width, height) = gray.dimensions();
        let mut out = RgbaImage::new(width, height);
        if width == 0 || height == 0 {
            return out;
        }

        let spacing = self.grid_spacing.max(1);
        for (x, y, px) in out.enumerate_pixels_mut() {
            let luma = gray.get_pixel(x, y)[0] as f32;
            let v = ((luma - 128.0) * self.contrast + 128.0).clamp(0.0, 255.0);
            let mut rgb = mix([v, v, v], TINT, self.tint_strength);
            if x % spacing == 0 || y % spacing == 0 {
                rgb = mix(rgb, GRID, self.grid_opacity);
            }
            *px = to_rgba(rgb);
        }

        let opacity = self.line_opacity(elapsed);
        if opacity > 0.0 {
            let line_y = (self.line_position(elapsed) * (height - 1) as f32).round() as u32;
            let half = self.line_thickness / 2;
            let top = line_y.saturating_sub(half + GLOW_ROWS);
            let bottom = (line_y + half + GLOW_ROWS).min(height - 1);
            for y in top..=bottom {
                let distance = y.abs_diff(line_y).saturating_sub(half);
                let strength = if distance == 0 {
                    opacity
                } else {
                    opacity * 0.5 * (1.0 - distance as f32 / (GLOW_ROWS + 1) as f32)
                };
                for x in 0..width {
                    let px = out.get_pixel_mut(x, y);
                    let rgb = [px[0] as f32, px[1] as f32, px[2] as f32];
                    *px = to_rgba(mix(rgb, LINE, strength));
                }
            }
        }
        out
    }

    /// `count` frames spread evenly over one loop.
    pub fn frames(&self, source: &DynamicImage, count: usize) -> Vec<RgbaImage> {
        let step = self.period.as_secs_f32() / count.max(1) as f32;
        (0..count)
            .map(|i| self.render(source, Duration::from_secs_f32(step * i as f32)))
            .collect()
    }
}

fn mix(base: [f32; 3], over: [f32; 3], alpha: f32) -> [f32; 3] {
    let a = alpha.clamp(0.0, 1.0);
    [
        base[0] * (1.0 - a) + over[0] * a,
        base[1] * (1.0 - a) + over[1] * a,
        base[2] * (1.0 - a) + over[2] * a,
    ]
}

fn to_rgba(rgb: [f32; 3]) -> Rgba<u8> {
    Rgba([
        rgb[0].round().clamp(0.0, 255.0) as u8,
        rgb[1].round().clamp(0.0, 255.0) as u8,
        rgb[2].round().clamp(0.0, 255.0) as u8,
        255,
    ])
}
