//! Network-free fallback analysis from pixel statistics.
//!
//! This is the terminal step of the provider chain. It always succeeds for a
//! decodable image and derives a small set of directionally sensible
//! adjustments from average brightness and channel balance.

use image::{DynamicImage, GenericImageView};

use crate::error::{AnalysisError, AnalysisResult};
use crate::profile::AdjustmentProfile;
use crate::temperature;

/// Roughly this many samples are taken along the shorter image edge.
const SAMPLES_PER_EDGE: u32 = 100;

/// Averages over a spatial subsample, all normalized to 0..1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelStats {
    pub brightness: f64,
    pub red: f64,
    pub green: f64,
    pub blue: f64,
}

impl PixelStats {
    /// Sample every `step`-th pixel in both directions.
    pub fn sample(image: &DynamicImage) -> Self {
        let (width, height) = image.dimensions();
        let step = (width.min(height) / SAMPLES_PER_EDGE).max(1) as usize;
        let rgb = image.to_rgb8();

        let (mut r, mut g, mut b, mut luma) = (0u64, 0u64, 0u64, 0f64);
        let mut count = 0u64;
        for y in (0..height).step_by(step) {
            for x in (0..width).step_by(step) {
                let [pr, pg, pb] = rgb.get_pixel(x, y).0;
                r += u64::from(pr);
                g += u64::from(pg);
                b += u64::from(pb);
                // ITU-R BT.601 luma
                luma += 0.299 * f64::from(pr) + 0.587 * f64::from(pg) + 0.114 * f64::from(pb);
                count += 1;
            }
        }

        if count == 0 {
            return Self {
                brightness: 0.5,
                red: 0.5,
                green: 0.5,
                blue: 0.5,
            };
        }

        let scale = count as f64 * 255.0;
        Self {
            brightness: luma / scale,
            red: r as f64 / scale,
            green: g as f64 / scale,
            blue: b as f64 / scale,
        }
    }
}

/// Build a profile from raw image bytes.
pub fn analyze_bytes(bytes: &[u8]) -> AnalysisResult<AdjustmentProfile> {
    if bytes.is_empty() {
        return Err(AnalysisError::EmptyInput);
    }
    let image = image::load_from_memory(bytes)
        .map_err(|e| AnalysisError::ImageUndecodable(e.to_string()))?;
    Ok(profile_from_stats(&PixelStats::sample(&image)))
}

/// Derive default adjustments from pixel statistics.
pub fn profile_from_stats(stats: &PixelStats) -> AdjustmentProfile {
    let mut profile = AdjustmentProfile::default();

    let basic = &mut profile.basic;
    basic.exposure = Some(if stats.brightness > 0.5 { 0.0 } else { 0.5 });
    basic.contrast = Some(0.0);
    basic.highlights = Some(if stats.brightness > 0.7 { -15.0 } else { 0.0 });
    basic.shadows = Some(if stats.brightness < 0.3 { 15.0 } else { 0.0 });
    basic.whites = Some(0.0);
    basic.blacks = Some(0.0);
    basic.clarity = Some(10.0);
    basic.vibrance = Some(10.0);
    basic.saturation = Some(0.0);

    // Counter a blue cast by warming (negative) and a red cast by cooling
    let temperature = if stats.blue > stats.red {
        -10.0
    } else if stats.red > stats.blue {
        10.0
    } else {
        0.0
    };
    let magenta_green = (stats.red + stats.blue) / 2.0;
    let tint = if stats.green < magenta_green {
        -10.0
    } else if stats.green > magenta_green {
        10.0
    } else {
        0.0
    };
    profile.color.temperature = Some(temperature);
    profile.color.tint = Some(tint);
    profile.color.absolute_kelvin = Some(temperature::to_kelvin(temperature));

    let detail = &mut profile.detail;
    detail.sharpness = Some(40.0);
    detail.radius = Some(1.0);
    detail.detail = Some(25.0);
    detail.masking = Some(0.0);
    detail.noise_reduction = Some(25.0);
    detail.color_noise_reduction = Some(25.0);

    let effects = &mut profile.effects;
    effects.amount = Some(0.0);
    effects.midpoint = Some(50.0);
    effects.roundness = Some(0.0);
    effects.feather = Some(50.0);

    profile
}
