//! Payload conditioning: keep an image under a provider's request ceiling.
//!
//! Images travel base64-encoded, which inflates them by roughly a third.
//! When the inflated size is already comfortably small the bytes are passed
//! through untouched; otherwise the image is repeatedly downscaled and
//! re-encoded as JPEG for a bounded number of rounds.

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageFormat};

use crate::config::ConditionerConfig;
use crate::error::{AnalysisError, AnalysisResult};

/// Size multiplier of the text-safe transport encoding.
pub const TRANSPORT_INFLATION: f64 = 1.33;

/// Below this share of the ceiling the input is returned unchanged.
const PASSTHROUGH_RATIO: f64 = 0.8;

/// Shrinking stops once the estimate is under this share of the ceiling,
/// leaving room for the prompt and the rest of the request body.
const TARGET_RATIO: f64 = 0.7;

/// Estimated transmitted size of `len` raw bytes.
pub fn estimate_payload(len: usize) -> u64 {
    (len as f64 * TRANSPORT_INFLATION) as u64
}

/// Result of conditioning an image.
#[derive(Debug, Clone)]
pub struct ConditionedImage {
    /// Bytes to send
    pub bytes: Vec<u8>,
    /// Format identifier of `bytes` ("jpeg", "png", "webp", ...)
    pub format: String,
    /// Downscale rounds performed (0 for pass-through)
    pub rounds: u32,
    /// JPEG quality of the last re-encode, if any
    pub quality: Option<u8>,
    /// Estimated transmitted size of `bytes`
    pub estimated_payload: u64,
    /// Whether the estimate fits under the ceiling
    pub within_limit: bool,
}

/// Bounded, deterministic downscale-and-recompress loop.
#[derive(Debug, Clone)]
pub struct PayloadConditioner {
    config: ConditionerConfig,
}

impl PayloadConditioner {
    pub fn new(config: ConditionerConfig) -> Self {
        Self { config }
    }

    /// Condition with the configured ceiling and quality.
    pub fn condition(&self, bytes: &[u8]) -> AnalysisResult<ConditionedImage> {
        self.condition_with(
            bytes,
            self.config.max_payload_bytes,
            self.config.initial_quality,
        )
    }

    /// Condition `bytes` so their estimated payload fits `max_payload_bytes`.
    ///
    /// Returns a best-effort result when the round limit is reached; the
    /// caller learns about it through `within_limit`, never through an
    /// error. Only empty or (when shrinking is needed) undecodable input
    /// fails.
    pub fn condition_with(
        &self,
        bytes: &[u8],
        max_payload_bytes: u64,
        quality_hint: u8,
    ) -> AnalysisResult<ConditionedImage> {
        if bytes.is_empty() {
            return Err(AnalysisError::EmptyInput);
        }

        let limit = max_payload_bytes as f64;
        let estimate = estimate_payload(bytes.len());
        if (estimate as f64) < limit * PASSTHROUGH_RATIO {
            tracing::debug!(
                "Payload ~{} bytes is within limits, sending as-is",
                estimate
            );
            return Ok(ConditionedImage {
                bytes: bytes.to_vec(),
                format: detect_format(bytes),
                rounds: 0,
                quality: None,
                estimated_payload: estimate,
                within_limit: true,
            });
        }

        let source = image::load_from_memory(bytes)
            .map_err(|e| AnalysisError::ImageUndecodable(e.to_string()))?;
        let (mut width, mut height) = source.dimensions();
        let target = limit * TARGET_RATIO;

        let mut current = bytes.to_vec();
        let mut estimate = estimate;
        let mut quality = quality_hint.clamp(1, 100);
        let mut last_quality = None;
        let mut rounds = 0;

        while estimate as f64 > target && rounds < self.config.max_rounds {
            width = scale_dimension(width, self.config.scale_factor);
            height = scale_dimension(height, self.config.scale_factor);

            let resized = source.resize_exact(width, height, FilterType::Lanczos3);
            current = encode_jpeg(&resized, quality)?;
            estimate = estimate_payload(current.len());
            last_quality = Some(quality);
            rounds += 1;

            tracing::debug!(
                "Round {rounds}: {width}x{height} @ q{quality} -> ~{estimate} bytes"
            );

            if rounds >= self.config.quality_drop_after && estimate as f64 > target {
                quality = quality
                    .saturating_sub(self.config.quality_step)
                    .max(self.config.min_quality);
            }
        }

        let within_limit = estimate <= max_payload_bytes;
        if !within_limit {
            tracing::warn!(
                "{}",
                AnalysisError::PayloadTooLarge {
                    estimated: estimate,
                    limit: max_payload_bytes,
                }
            );
        } else {
            tracing::info!(
                "Conditioned image from {} to {} bytes in {rounds} round(s)",
                bytes.len(),
                current.len()
            );
        }

        Ok(ConditionedImage {
            format: if rounds == 0 {
                detect_format(&current)
            } else {
                "jpeg".to_string()
            },
            bytes: current,
            rounds,
            quality: last_quality,
            estimated_payload: estimate,
            within_limit,
        })
    }
}

fn scale_dimension(value: u32, factor: f64) -> u32 {
    ((f64::from(value) * factor) as u32).max(1)
}

fn encode_jpeg(image: &DynamicImage, quality: u8) -> AnalysisResult<Vec<u8>> {
    let rgb = DynamicImage::ImageRgb8(image.to_rgb8());
    let mut buffer = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut buffer, quality);
    rgb.write_with_encoder(encoder)
        .map_err(|e| AnalysisError::Encode(e.to_string()))?;
    Ok(buffer)
}

/// Detect the format of an encoded image from its magic bytes.
pub fn detect_format(bytes: &[u8]) -> String {
    match image::guess_format(bytes) {
        Ok(ImageFormat::Jpeg) => "jpeg",
        Ok(ImageFormat::Png) => "png",
        Ok(ImageFormat::WebP) => "webp",
        Ok(ImageFormat::Gif) => "gif",
        _ => "jpeg",
    }
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use std::io::Cursor;

    /// Deterministic high-entropy image that compresses poorly.
    fn noisy_png(width: u32, height: u32) -> Vec<u8> {
        let mut state: u32 = 0x9E37_79B9;
        let img = RgbImage::from_fn(width, height, |_, _| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            let [r, g, b, _] = state.to_le_bytes();
            Rgb([r, g, b])
        });
        let mut buffer = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img)
            .write_to(&mut buffer, ImageFormat::Png)
            .unwrap();
        buffer.into_inner()
    }

    fn conditioner() -> PayloadConditioner {
        PayloadConditioner::new(ConditionerConfig::default())
    }

    #[test]
    fn test_estimate_payload() {
        assert_eq!(estimate_payload(100), 133);
        assert_eq!(estimate_payload(0), 0);
    }

    #[test]
    fn test_small_image_passes_through_unchanged() {
        let png = noisy_png(32, 32);
        let result = conditioner().condition_with(&png, 10 * 1024 * 1024, 85).unwrap();
        assert_eq!(result.bytes, png);
        assert_eq!(result.rounds, 0);
        assert_eq!(result.format, "png");
        assert!(result.quality.is_none());
        assert!(result.within_limit);
    }

    #[test]
    fn test_oversized_image_converges_or_hits_round_limit() {
        let png = noisy_png(256, 256);
        let ceiling = 60_000;
        let result = conditioner().condition_with(&png, ceiling, 85).unwrap();

        assert!(result.rounds >= 1);
        assert!(result.rounds <= 5);
        assert!(result.estimated_payload <= ceiling || result.rounds == 5);
        assert_eq!(result.format, "jpeg");
        assert!(result.bytes.len() < png.len());
        // Output is a decodable JPEG
        assert_eq!(
            image::guess_format(&result.bytes).unwrap(),
            ImageFormat::Jpeg
        );
    }

    #[test]
    fn test_unreachable_ceiling_stops_after_five_rounds() {
        let png = noisy_png(128, 128);
        let result = conditioner().condition_with(&png, 100, 85).unwrap();

        assert_eq!(result.rounds, 5);
        assert!(!result.within_limit);
        // 85 for rounds 1-3, then 70, then floored at 60
        assert_eq!(result.quality, Some(60));
        let decoded = image::load_from_memory(&result.bytes).unwrap();
        // 128 * 0.8^5, truncated each round
        assert_eq!(decoded.dimensions(), (40, 40));
    }

    #[test]
    fn test_empty_input_is_rejected() {
        let err = conditioner().condition(&[]).unwrap_err();
        assert!(matches!(err, AnalysisError::EmptyInput));
    }

    #[test]
    fn test_undecodable_oversized_input_is_rejected() {
        let garbage = vec![0xAB; 4096];
        let err = conditioner().condition_with(&garbage, 1000, 85).unwrap_err();
        assert!(matches!(err, AnalysisError::ImageUndecodable(_)));
    }

    #[test]
    fn test_undecodable_small_input_passes_through() {
        // Small payloads are never decoded here; the chain decides what to do
        let garbage = vec![0xAB; 64];
        let result = conditioner().condition(&garbage).unwrap();
        assert_eq!(result.bytes, garbage);
    }

    #[test]
    fn test_detect_format() {
        assert_eq!(detect_format(&noisy_png(4, 4)), "png");
        assert_eq!(detect_format(&[0xFF, 0xD8, 0xFF, 0xE0]), "jpeg");
        assert_eq!(detect_format(b"garbage!"), "jpeg");
    }
}
