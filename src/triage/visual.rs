//! Visual irregularity heuristic for an optional skin image.
//!
//! Crude proxy, not a diagnostic signal: the score is the spread of
//! saturation, brightness and grey level over a normalized thumbnail.
//! A flagged image can only ever lift OPD care to Ward and add Dermatology
//! to the suggested specialties.
//!
//! Pipeline:
//! 1. Guard byte length and header dimensions
//! 2. Decode (PNG/JPEG)
//! 3. Convert to RGB, resize to `target_size` square (bilinear)
//! 4. color_variation = σ(S) + σ(V) in 8-bit HSV
//! 5. texture_variation = σ(grey), BT.601 luminance
//! 6. score = color + texture; irregular when score > threshold

use std::io::Cursor;

use image::imageops::FilterType;
use image::{ImageError, RgbImage};
use serde::Serialize;
use tracing::debug;

use super::ImageDecodeError;

// ═══════════════════════════════════════════════════════════
// Constants
// ═══════════════════════════════════════════════════════════

/// Side of the square the image is normalized to before scoring.
pub const TARGET_SIZE: u32 = 224;

/// Scores strictly above this are flagged.
pub const IRREGULARITY_THRESHOLD: f64 = 40.0;

/// Maximum input image size (in bytes) before rejecting.
const MAX_IMAGE_BYTES: usize = 50 * 1024 * 1024; // 50 MB

/// Maximum width or height declared by the image header. The decoder
/// allocates the full pixel buffer up front, so this is checked first.
pub const MAX_IMAGE_DIMENSION: u32 = 8192;

// ═══════════════════════════════════════════════════════════
// Types
// ═══════════════════════════════════════════════════════════

/// Component scores behind the flag.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct IrregularityReport {
    /// σ(saturation) + σ(value).
    pub color_variation: f64,
    /// σ(grey level).
    pub texture_variation: f64,
    pub score: f64,
    pub irregular: bool,
}

/// Produces the "possible visual irregularity" flag from raw image bytes.
pub trait IrregularityDetector: Send + Sync {
    fn analyze(&self, image_bytes: &[u8]) -> Result<IrregularityReport, ImageDecodeError>;

    fn detect(&self, image_bytes: &[u8]) -> Result<bool, ImageDecodeError> {
        Ok(self.analyze(image_bytes)?.irregular)
    }
}

/// HSV + greyscale spread detector.
#[derive(Debug, Clone)]
pub struct VariationDetector {
    target_size: u32,
    threshold: f64,
}

impl Default for VariationDetector {
    fn default() -> Self {
        Self {
            target_size: TARGET_SIZE,
            threshold: IRREGULARITY_THRESHOLD,
        }
    }
}

impl VariationDetector {
    pub fn new(target_size: u32, threshold: f64) -> Self {
        Self {
            target_size: target_size.max(1),
            threshold,
        }
    }

    /// Score an already-decoded image.
    pub fn score_rgb(&self, rgb: &RgbImage) -> IrregularityReport {
        let resized = image::imageops::resize(
            rgb,
            self.target_size,
            self.target_size,
            FilterType::Triangle,
        );

        let mut saturation = RunningStats::default();
        let mut value = RunningStats::default();
        let mut grey = RunningStats::default();
        for pixel in resized.pixels() {
            let [r, g, b] = pixel.0;
            let (s, v) = saturation_value(r, g, b);
            saturation.push(s);
            value.push(v);
            grey.push(luminance(r, g, b));
        }

        let color_variation = saturation.std_dev() + value.std_dev();
        let texture_variation = grey.std_dev();
        let score = color_variation + texture_variation;

        IrregularityReport {
            color_variation,
            texture_variation,
            score,
            irregular: score > self.threshold,
        }
    }
}

impl IrregularityDetector for VariationDetector {
    fn analyze(&self, image_bytes: &[u8]) -> Result<IrregularityReport, ImageDecodeError> {
        validate_image_bytes(image_bytes)?;
        validate_image_dimensions(image_bytes)?;

        let img = image::load_from_memory(image_bytes)?;
        let report = self.score_rgb(&img.to_rgb8());

        debug!(
            color = report.color_variation,
            texture = report.texture_variation,
            score = report.score,
            irregular = report.irregular,
            "Skin image scored"
        );
        Ok(report)
    }
}

// ═══════════════════════════════════════════════════════════
// Pure helper functions
// ═══════════════════════════════════════════════════════════

/// Reject clearly unusable input before decoding.
pub fn validate_image_bytes(bytes: &[u8]) -> Result<(), ImageDecodeError> {
    if bytes.is_empty() {
        return Err(ImageDecodeError::Empty);
    }
    if bytes.len() > MAX_IMAGE_BYTES {
        return Err(ImageDecodeError::TooLarge {
            bytes: bytes.len(),
            limit: MAX_IMAGE_BYTES,
        });
    }
    Ok(())
}

/// Read only the header and reject declared sizes over `MAX_IMAGE_DIMENSION`.
pub fn validate_image_dimensions(bytes: &[u8]) -> Result<(), ImageDecodeError> {
    let (width, height) = image::io::Reader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(ImageError::IoError)?
        .into_dimensions()?;

    if width > MAX_IMAGE_DIMENSION || height > MAX_IMAGE_DIMENSION {
        return Err(ImageDecodeError::DimensionsTooLarge {
            width,
            height,
            limit: MAX_IMAGE_DIMENSION,
        });
    }
    Ok(())
}

/// 8-bit HSV saturation and value: V = max, S = 255·(max − min)/max.
fn saturation_value(r: u8, g: u8, b: u8) -> (f64, f64) {
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let s = if max == 0 {
        0.0
    } else {
        (255.0 * f64::from(max - min) / f64::from(max)).round()
    };
    (s, f64::from(max))
}

/// ITU-R BT.601 luminance, rounded to the nearest grey level.
fn luminance(r: u8, g: u8, b: u8) -> f64 {
    (0.299 * f64::from(r) + 0.587 * f64::from(g) + 0.114 * f64::from(b)).round()
}

/// Population mean/variance accumulator.
#[derive(Debug, Default)]
struct RunningStats {
    sum: f64,
    sum_sq: f64,
    count: u64,
}

impl RunningStats {
    fn push(&mut self, v: f64) {
        self.sum += v;
        self.sum_sq += v * v;
        self.count += 1;
    }

    fn std_dev(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        let n = self.count as f64;
        let mean = self.sum / n;
        let variance = (self.sum_sq / n) - (mean * mean);
        variance.max(0.0).sqrt()
    }
}

// ═══════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use image::{DynamicImage, ImageOutputFormat, Rgb};

    use super::*;

    fn encode(img: RgbImage, format: ImageOutputFormat) -> Vec<u8> {
        let mut cursor = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img)
            .write_to(&mut cursor, format)
            .unwrap();
        cursor.into_inner()
    }

    fn make_uniform_png(color: [u8; 3]) -> Vec<u8> {
        encode(
            RgbImage::from_pixel(300, 200, Rgb(color)),
            ImageOutputFormat::Png,
        )
    }

    /// Black/white blocks: maximal grey and value spread.
    fn make_checkerboard_png() -> Vec<u8> {
        let img = RgbImage::from_fn(448, 448, |x, y| {
            if (x / 32 + y / 32) % 2 == 0 {
                Rgb([0, 0, 0])
            } else {
                Rgb([255, 255, 255])
            }
        });
        encode(img, ImageOutputFormat::Png)
    }

    #[test]
    fn uniform_image_is_not_irregular() {
        let report = VariationDetector::default()
            .analyze(&make_uniform_png([180, 120, 100]))
            .unwrap();
        assert!(report.score < 1.0, "score {}", report.score);
        assert!(!report.irregular);
    }

    #[test]
    fn high_contrast_image_is_irregular() {
        let report = VariationDetector::default()
            .analyze(&make_checkerboard_png())
            .unwrap();
        assert!(report.texture_variation > 100.0, "{report:?}");
        assert!(report.score > IRREGULARITY_THRESHOLD);
        assert!(report.irregular);
        assert!(VariationDetector::default()
            .detect(&make_checkerboard_png())
            .unwrap());
    }

    #[test]
    fn jpeg_is_accepted() {
        let img = RgbImage::from_pixel(64, 64, Rgb([90, 140, 200]));
        let bytes = encode(img, ImageOutputFormat::Jpeg(90));
        assert!(!VariationDetector::default().detect(&bytes).unwrap());
    }

    #[test]
    fn threshold_is_strict() {
        let img = RgbImage::from_fn(2, 2, |x, _| {
            if x == 0 {
                Rgb([0, 0, 0])
            } else {
                Rgb([255, 255, 255])
            }
        });
        let report = VariationDetector::new(2, f64::MAX).score_rgb(&img);
        let at_threshold = VariationDetector::new(2, report.score).score_rgb(&img);
        assert!(!at_threshold.irregular);
    }

    #[test]
    fn garbage_bytes_fail_to_decode() {
        let err = VariationDetector::default()
            .analyze(b"definitely not an image, just some text bytes")
            .unwrap_err();
        assert!(matches!(err, ImageDecodeError::Decode(_)));
    }

    #[test]
    fn truncated_png_fails_to_decode() {
        let mut bytes = make_uniform_png([10, 20, 30]);
        bytes.truncate(bytes.len() / 2);
        assert!(VariationDetector::default().analyze(&bytes).is_err());
    }

    #[test]
    fn empty_input_is_rejected_before_decode() {
        let err = VariationDetector::default().analyze(&[]).unwrap_err();
        assert!(matches!(err, ImageDecodeError::Empty));
    }

    /// Small JPEG whose frame header claims 65000x65000 pixels.
    fn make_oversized_header_jpeg() -> Vec<u8> {
        let mut bytes = encode(
            RgbImage::from_pixel(16, 16, Rgb([120, 80, 60])),
            ImageOutputFormat::Jpeg(90),
        );
        let sof = bytes
            .windows(2)
            .position(|w| w == [0xFF, 0xC0])
            .unwrap();
        // FF C0, length (2), precision (1), height (2), width (2)
        bytes[sof + 5..sof + 7].copy_from_slice(&65000u16.to_be_bytes());
        bytes[sof + 7..sof + 9].copy_from_slice(&65000u16.to_be_bytes());
        bytes
    }

    #[test]
    fn oversized_header_is_rejected_before_decode() {
        let bytes = make_oversized_header_jpeg();
        assert!(bytes.len() < 4096);
        let err = VariationDetector::default().analyze(&bytes).unwrap_err();
        assert!(
            matches!(
                err,
                ImageDecodeError::DimensionsTooLarge {
                    width: 65000,
                    height: 65000,
                    limit: MAX_IMAGE_DIMENSION
                }
            ),
            "got: {err:?}"
        );
    }

    #[test]
    fn ordinary_image_passes_header_check() {
        let bytes = make_uniform_png([1, 2, 3]);
        assert!(validate_image_dimensions(&bytes).is_ok());
    }

    #[test]
    fn hsv_matches_8bit_convention() {
        assert_eq!(saturation_value(0, 0, 0), (0.0, 0.0));
        assert_eq!(saturation_value(255, 255, 255), (0.0, 255.0));
        assert_eq!(saturation_value(255, 0, 0), (255.0, 255.0));
        assert_eq!(saturation_value(200, 100, 100), (128.0, 200.0));
    }

    #[test]
    fn luminance_weights() {
        assert_eq!(luminance(255, 255, 255), 255.0);
        assert_eq!(luminance(255, 0, 0), 76.0);
        assert_eq!(luminance(0, 255, 0), 150.0);
    }

    #[test]
    fn running_stats_population_std() {
        let mut stats = RunningStats::default();
        for v in [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0] {
            stats.push(v);
        }
        assert!((stats.std_dev() - 2.0).abs() < 1e-12);
        assert_eq!(RunningStats::default().std_dev(), 0.0);
    }
}
