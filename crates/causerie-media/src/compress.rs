//! The adaptive two-pass compression pipeline.
//!
//! A primary pass (0.5 MiB target, 1280 px bounding box, quality 0.7)
//! handles most natural photos in one go.  Synthetic or high-detail images
//! that come out above 500 KiB get a second, stricter pass (0.3 MiB
//! target, quality 0.6) over the original bytes.  Exactly two attempts —
//! if the smaller of the two results still exceeds the 1 MiB ceiling, the
//! pipeline gives up and the user is asked for a different image.

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::RgbImage;
use tracing::debug;

use causerie_shared::constants::{
    MAX_COMPRESSION_ITERATIONS, MAX_IMAGE_DIMENSION, MAX_INPUT_IMAGE_SIZE, MAX_OUTPUT_IMAGE_SIZE,
    PRIMARY_INITIAL_QUALITY, PRIMARY_TARGET_SIZE, SECONDARY_INITIAL_QUALITY,
    SECONDARY_TARGET_SIZE, SECOND_PASS_THRESHOLD,
};

use crate::error::{MediaError, Result};

/// Quality floor for the refinement loop; below this we shed pixels
/// instead of quantization bits.
const MIN_QUALITY: f32 = 0.2;

/// Dimension multiplier applied once the quality floor is reached.
const DIMENSION_STEP: f32 = 0.85;

/// The outcome of a successful compression.
#[derive(Debug, Clone)]
pub struct CompressedImage {
    /// JPEG-encoded payload, guaranteed ≤ 1 MiB by [`compress`].
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// Quality factor the final encode used.
    pub quality: f32,
    /// Size of the raw input, for logging and savings display.
    pub original_size: usize,
}

/// Parameters for one compression pass.
#[derive(Debug, Clone, Copy)]
pub struct PassSettings {
    pub target_size: usize,
    pub initial_quality: f32,
    pub max_dimension: u32,
    pub max_iterations: u32,
}

impl PassSettings {
    pub fn primary() -> Self {
        Self {
            target_size: PRIMARY_TARGET_SIZE,
            initial_quality: PRIMARY_INITIAL_QUALITY,
            max_dimension: MAX_IMAGE_DIMENSION,
            max_iterations: MAX_COMPRESSION_ITERATIONS,
        }
    }

    pub fn secondary() -> Self {
        Self {
            target_size: SECONDARY_TARGET_SIZE,
            initial_quality: SECONDARY_INITIAL_QUALITY,
            max_dimension: MAX_IMAGE_DIMENSION,
            max_iterations: MAX_COMPRESSION_ITERATIONS,
        }
    }
}

/// Cheap early-exit guard run before any decode work.
///
/// Rejects non-image MIME types and raw input above the 5 MiB ceiling.
pub fn validate(mime: &str, size: usize) -> Result<()> {
    if !mime.starts_with("image/") {
        return Err(MediaError::NotAnImage {
            mime: mime.to_string(),
        });
    }
    if size > MAX_INPUT_IMAGE_SIZE {
        return Err(MediaError::InputTooLarge { size });
    }
    Ok(())
}

/// Compress `bytes` down to at most 1 MiB, escalating to a stricter second
/// pass when the primary result stays above 500 KiB.
pub fn compress(bytes: &[u8]) -> Result<CompressedImage> {
    let primary = compress_pass(bytes, PassSettings::primary())?;

    let chosen = if primary.bytes.len() > SECOND_PASS_THRESHOLD {
        debug!(
            primary_size = primary.bytes.len(),
            "Primary pass above threshold, running stricter second pass"
        );
        let secondary = compress_pass(bytes, PassSettings::secondary())?;
        // Stricter settings must never make the payload bigger.
        if secondary.bytes.len() <= primary.bytes.len() {
            secondary
        } else {
            primary
        }
    } else {
        primary
    };

    if chosen.bytes.len() > MAX_OUTPUT_IMAGE_SIZE {
        return Err(MediaError::StillTooLarge {
            size: chosen.bytes.len(),
        });
    }

    debug!(
        original_size = chosen.original_size,
        compressed_size = chosen.bytes.len(),
        width = chosen.width,
        height = chosen.height,
        "Image compressed"
    );
    Ok(chosen)
}

/// One application of the size-reduction algorithm: decode, fit into the
/// bounding box, then iteratively re-encode at decreasing quality until
/// the target size is met or the iteration budget runs out.
pub fn compress_pass(bytes: &[u8], settings: PassSettings) -> Result<CompressedImage> {
    let original_size = bytes.len();
    let img = image::load_from_memory(bytes)?;

    let (width, height) = (img.width(), img.height());
    let (new_width, new_height) = fit_dimensions(width, height, settings.max_dimension);

    let resized = if new_width != width || new_height != height {
        img.resize(new_width, new_height, FilterType::Lanczos3)
    } else {
        img
    };
    let mut current: RgbImage = resized.to_rgb8();

    let mut quality = settings.initial_quality;
    let mut encoded = encode_jpeg(&current, quality)?;
    let mut iteration = 1;

    while encoded.len() > settings.target_size && iteration < settings.max_iterations {
        let ratio = settings.target_size as f32 / encoded.len() as f32;
        let next_quality = (quality * ratio.sqrt()).max(MIN_QUALITY);

        if next_quality < quality {
            quality = next_quality;
        } else {
            // Quality is floored; shed pixels instead.
            let w = ((current.width() as f32 * DIMENSION_STEP) as u32).max(1);
            let h = ((current.height() as f32 * DIMENSION_STEP) as u32).max(1);
            current = image::imageops::resize(&current, w, h, FilterType::Lanczos3);
        }

        encoded = encode_jpeg(&current, quality)?;
        iteration += 1;
    }

    Ok(CompressedImage {
        width: current.width(),
        height: current.height(),
        quality,
        original_size,
        bytes: encoded,
    })
}

/// Fit `(width, height)` inside a `max_dimension` square, preserving
/// aspect ratio.  Images already inside the box are left alone.
fn fit_dimensions(width: u32, height: u32, max_dimension: u32) -> (u32, u32) {
    if width <= max_dimension && height <= max_dimension {
        return (width, height);
    }
    if width > height {
        let ratio = max_dimension as f32 / width as f32;
        (max_dimension, ((height as f32 * ratio) as u32).max(1))
    } else {
        let ratio = max_dimension as f32 / height as f32;
        (((width as f32 * ratio) as u32).max(1), max_dimension)
    }
}

fn encode_jpeg(img: &RgbImage, quality: f32) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    let q = (quality * 100.0).round().clamp(1.0, 100.0) as u8;
    let mut encoder = JpegEncoder::new_with_quality(&mut buf, q);
    encoder.encode_image(img)?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    /// A smooth gradient, the friendly case: compresses like a photo.
    fn gradient_png(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbImage::from_fn(width, height, |x, y| {
            image::Rgb([
                (x % 256) as u8,
                (y % 256) as u8,
                ((x + y) % 256) as u8,
            ])
        });
        let mut buf = Vec::new();
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        buf
    }

    /// Deterministic pixel noise, the hostile case: resists compression.
    fn noise_png(width: u32, height: u32) -> Vec<u8> {
        let mut seed: u32 = 0x1234_5678;
        let img = image::RgbImage::from_fn(width, height, |_, _| {
            seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            let b = seed.to_le_bytes();
            image::Rgb([b[0], b[1], b[2]])
        });
        let mut buf = Vec::new();
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        buf
    }

    #[test]
    fn rejects_non_image_mime() {
        let err = validate("application/pdf", 1024).unwrap_err();
        assert!(matches!(err, MediaError::NotAnImage { .. }));
    }

    #[test]
    fn rejects_oversized_input_before_any_decode() {
        // Scenario: a 6 MiB selection never reaches the pipeline.
        let err = validate("image/jpeg", 6 * 1024 * 1024).unwrap_err();
        assert!(matches!(err, MediaError::InputTooLarge { .. }));
    }

    #[test]
    fn accepts_image_at_the_ceiling() {
        assert!(validate("image/png", MAX_INPUT_IMAGE_SIZE).is_ok());
    }

    #[test]
    fn photo_like_image_fits_in_one_pass() {
        let input = gradient_png(1600, 1200);
        let out = compress(&input).unwrap();
        assert!(out.bytes.len() <= PRIMARY_TARGET_SIZE);
        assert!(out.width <= MAX_IMAGE_DIMENSION && out.height <= MAX_IMAGE_DIMENSION);
    }

    #[test]
    fn small_image_is_not_upscaled() {
        let input = gradient_png(320, 240);
        let out = compress(&input).unwrap();
        assert_eq!((out.width, out.height), (320, 240));
    }

    #[test]
    fn output_never_exceeds_absolute_ceiling() {
        let input = noise_png(2000, 1500);
        match compress(&input) {
            Ok(out) => assert!(out.bytes.len() <= MAX_OUTPUT_IMAGE_SIZE),
            Err(MediaError::StillTooLarge { size }) => assert!(size > MAX_OUTPUT_IMAGE_SIZE),
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn escalation_is_monotone() {
        // Whatever compress() picks is never larger than the primary pass
        // alone would have produced.
        let input = noise_png(2000, 1500);
        let primary = compress_pass(&input, PassSettings::primary()).unwrap();
        if let Ok(chosen) = compress(&input) {
            assert!(chosen.bytes.len() <= primary.bytes.len());
        }
    }

    #[test]
    fn fit_dimensions_preserves_aspect() {
        assert_eq!(fit_dimensions(2560, 1440, 1280), (1280, 720));
        assert_eq!(fit_dimensions(1440, 2560, 1280), (720, 1280));
        assert_eq!(fit_dimensions(800, 600, 1280), (800, 600));
    }
}
