//! Template matching: locate a reference image inside a capture.
//!
//! The production implementation runs normalized cross-correlation from
//! `imageproc` over grayscale versions of both images.  Reference images
//! are authored against a fixed 1920-wide baseline and rescaled to the
//! capture's width before matching, so the same template works across
//! window sizes.

use std::path::Path;

use image::imageops::FilterType;
use image::{imageops, RgbaImage};
use imageproc::template_matching::{find_extremes, match_template, MatchTemplateMethod};

use crate::errors::WinclickError;

/// Width the reference templates were captured at.
pub const REFERENCE_WIDTH: u32 = 1920;

/// Default minimum similarity for a template hit.
pub const DEFAULT_THRESHOLD: f32 = 0.7;

/// Best template-match location in a haystack image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TemplateHit {
    /// Top-left corner of the match, haystack-local pixels.
    pub top_left: (u32, u32),
    /// Similarity score in `[0, 1]`.
    pub similarity: f32,
    /// Dimensions of the needle that was matched (after rescaling).
    pub needle_size: (u32, u32),
}

impl TemplateHit {
    /// Center of the matched region.
    pub fn center(&self) -> (i32, i32) {
        (
            self.top_left.0 as i32 + self.needle_size.0 as i32 / 2,
            self.top_left.1 as i32 + self.needle_size.1 as i32 / 2,
        )
    }
}

/// Template matching engine: "where does this needle best fit".
pub trait TemplateMatcher {
    /// Best-scoring location of `needle` inside `haystack`, or `None` when
    /// matching is impossible (needle larger than haystack).
    fn best_match(
        &self,
        haystack: &RgbaImage,
        needle: &RgbaImage,
    ) -> Result<Option<TemplateHit>, WinclickError>;
}

/// Scale factor that maps a reference-resolution needle onto a capture.
pub fn needle_scale(capture_width: u32) -> f64 {
    capture_width as f64 / REFERENCE_WIDTH as f64
}

/// Proportionally resize a needle image; a factor within 1% of unity
/// returns the needle unchanged.
pub fn scale_needle(needle: &RgbaImage, scale: f64) -> RgbaImage {
    if !(scale > 0.0) || (scale - 1.0).abs() < 0.01 {
        return needle.clone();
    }
    let width = ((needle.width() as f64 * scale).round() as u32).max(1);
    let height = ((needle.height() as f64 * scale).round() as u32).max(1);
    imageops::resize(needle, width, height, FilterType::Triangle)
}

/// Load a template image from disk as RGBA.
pub fn load_template(path: impl AsRef<Path>) -> Result<RgbaImage, WinclickError> {
    let path = path.as_ref();
    let img = image::open(path)
        .map_err(|e| WinclickError::LocateError(format!("load template {}: {e}", path.display())))?;
    Ok(img.to_rgba8())
}

/// Production matcher using `imageproc` normalized cross-correlation.
#[derive(Debug, Clone, Copy, Default)]
pub struct CrossCorrelationMatcher;

impl TemplateMatcher for CrossCorrelationMatcher {
    fn best_match(
        &self,
        haystack: &RgbaImage,
        needle: &RgbaImage,
    ) -> Result<Option<TemplateHit>, WinclickError> {
        if needle.width() > haystack.width() || needle.height() > haystack.height() {
            log::warn!(
                "needle {}x{} larger than haystack {}x{}",
                needle.width(),
                needle.height(),
                haystack.width(),
                haystack.height()
            );
            return Ok(None);
        }
        if needle.width() == 0 || needle.height() == 0 {
            return Err(WinclickError::LocateError("empty needle image".into()));
        }

        let haystack_gray = imageops::grayscale(haystack);
        let needle_gray = imageops::grayscale(needle);

        let scores = match_template(
            &haystack_gray,
            &needle_gray,
            MatchTemplateMethod::CrossCorrelationNormalized,
        );
        let extremes = find_extremes(&scores);

        Ok(Some(TemplateHit {
            top_left: extremes.max_value_location,
            similarity: extremes.max_value,
            needle_size: (needle.width(), needle.height()),
        }))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    /// Deterministic non-repeating texture so windows are unambiguous.
    fn textured(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_fn(width, height, |x, y| {
            let v = (x * x * 31 + y * y * 17 + x * y * 7) % 251;
            Rgba([v as u8, v as u8, v as u8, 255])
        })
    }

    #[test]
    fn test_needle_scale_reference_halved() {
        assert_eq!(needle_scale(960), 0.5);
        assert_eq!(needle_scale(1920), 1.0);
        assert_eq!(needle_scale(3840), 2.0);
    }

    #[test]
    fn test_scale_needle_dimensions() {
        let needle = RgbaImage::new(100, 40);
        let half = scale_needle(&needle, 0.5);
        assert_eq!((half.width(), half.height()), (50, 20));

        let same = scale_needle(&needle, 1.0);
        assert_eq!((same.width(), same.height()), (100, 40));
    }

    #[test]
    fn test_scale_needle_never_collapses_to_zero() {
        let needle = RgbaImage::new(4, 4);
        let tiny = scale_needle(&needle, 0.01);
        assert_eq!((tiny.width(), tiny.height()), (1, 1));
    }

    #[test]
    fn test_best_match_finds_embedded_needle() {
        let haystack = textured(64, 48);
        let needle = imageops::crop_imm(&haystack, 20, 10, 16, 16).to_image();

        let hit = CrossCorrelationMatcher
            .best_match(&haystack, &needle)
            .unwrap()
            .expect("needle fits in haystack");

        assert_eq!(hit.top_left, (20, 10));
        assert!(hit.similarity > 0.99, "similarity was {}", hit.similarity);
        assert_eq!(hit.center(), (28, 18));
    }

    #[test]
    fn test_best_match_oversized_needle_is_none() {
        let haystack = textured(16, 16);
        let needle = textured(32, 32);
        let hit = CrossCorrelationMatcher.best_match(&haystack, &needle).unwrap();
        assert!(hit.is_none());
    }
}
