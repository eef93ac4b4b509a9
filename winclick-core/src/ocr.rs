//! OCR text recognition over a window capture.
//!
//! The locator consumes OCR through the [`TextRecognizer`] trait; the
//! production implementation wraps `rust-paddle-ocr` (PP-OCR detection +
//! recognition models).  Tests substitute scripted fakes.

use image::{DynamicImage, RgbaImage};
use rust_paddle_ocr::{Det, Rec};

use crate::config::OcrModelPaths;
use crate::errors::WinclickError;

/// Recognition threshold below which the engine discards a box.
const MIN_SCORE: f32 = 0.6;
/// Separate, laxer threshold for punctuation characters.
const PUNCT_MIN_SCORE: f32 = 0.1;
/// Detector box-merge distance, in the detector's own units.
const MERGE_THRESHOLD: i32 = 1;

/// One recognized text region.
///
/// `corners` follow the detector's order (top-left, top-right,
/// bottom-right, bottom-left) in capture-local pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct TextBox {
    pub corners: [(f32, f32); 4],
    pub text: String,
    pub confidence: f32,
}

impl TextBox {
    /// Axis-aligned box from a left/top/width/height rectangle.
    pub fn from_rect(x: f32, y: f32, width: f32, height: f32, text: String, confidence: f32) -> Self {
        Self {
            corners: [
                (x, y),
                (x + width, y),
                (x + width, y + height),
                (x, y + height),
            ],
            text,
            confidence,
        }
    }

    /// Centroid of the four corners, rounded to pixel coordinates.
    pub fn centroid(&self) -> (i32, i32) {
        let (sx, sy) = self
            .corners
            .iter()
            .fold((0.0f32, 0.0f32), |(sx, sy), (x, y)| (sx + x, sy + y));
        ((sx / 4.0).round() as i32, (sy / 4.0).round() as i32)
    }
}

/// Text recognition engine: "where is text in this image".
///
/// Implementations return boxes in their own order; callers must not
/// assume sorting by confidence or position.
pub trait TextRecognizer {
    fn recognize(&mut self, image: &RgbaImage) -> Result<Vec<TextBox>, WinclickError>;
}

/// Production recognizer backed by `rust-paddle-ocr`.
///
/// Holds the detection and recognition models so repeated captures do not
/// pay the model load cost again.
pub struct PaddleRecognizer {
    det: Det,
    rec: Rec,
}

impl PaddleRecognizer {
    /// Load the detection/recognition models from disk.
    pub fn new(paths: &OcrModelPaths) -> Result<Self, WinclickError> {
        let det = Det::from_file(&paths.detection)
            .map_err(|e| WinclickError::LocateError(format!("load detection model: {e}")))?
            .with_merge_boxes(true)
            .with_merge_threshold(MERGE_THRESHOLD);

        let rec = Rec::from_file(&paths.recognition, &paths.keys)
            .map_err(|e| WinclickError::LocateError(format!("load recognition model: {e}")))?
            .with_min_score(MIN_SCORE)
            .with_punct_min_score(PUNCT_MIN_SCORE);

        Ok(Self { det, rec })
    }
}

impl TextRecognizer for PaddleRecognizer {
    fn recognize(&mut self, image: &RgbaImage) -> Result<Vec<TextBox>, WinclickError> {
        let dynamic = DynamicImage::ImageRgba8(image.clone());

        let rects = self
            .det
            .find_text_rect(&dynamic)
            .map_err(|e| WinclickError::LocateError(format!("text detection: {e}")))?;

        let mut boxes = Vec::with_capacity(rects.len());
        for rect in rects {
            let crop = dynamic.crop_imm(
                rect.left().max(0) as u32,
                rect.top().max(0) as u32,
                rect.width(),
                rect.height(),
            );
            let text = self
                .rec
                .predict_str(&crop)
                .map_err(|e| WinclickError::LocateError(format!("text recognition: {e}")))?;
            // The engine filters recognitions below MIN_SCORE internally and
            // does not expose per-box scores; surviving boxes report 1.0.
            boxes.push(TextBox::from_rect(
                rect.left() as f32,
                rect.top() as f32,
                rect.width() as f32,
                rect.height() as f32,
                text,
                1.0,
            ));
        }

        Ok(boxes)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
