//! Resolve a logical target against a window capture.
//!
//! The locator turns one [`Action`] plus one [`Capture`] into a
//! window-local point, delegating to the OCR and template-matching engines.
//! Resolution is stateless per call: every step re-captures and
//! re-resolves, because window content may change between steps and a
//! cached position could be stale by the time it is clicked.

use crate::action::{parse_fixed_target, Action, TargetKind};
use crate::capture::Capture;
use crate::ocr::TextRecognizer;
use crate::template::{
    load_template, needle_scale, scale_needle, TemplateMatcher, DEFAULT_THRESHOLD,
};

/// Capture-plus-action to window-local point resolver.
pub struct Locator {
    matcher: Box<dyn TemplateMatcher>,
    recognizer: Option<Box<dyn TextRecognizer>>,
    threshold: f32,
}

impl Locator {
    /// Build a locator around a template matcher; OCR is optional and
    /// only needed for text targets.
    pub fn new(matcher: Box<dyn TemplateMatcher>) -> Self {
        Self {
            matcher,
            recognizer: None,
            threshold: DEFAULT_THRESHOLD,
        }
    }

    /// Attach a text-recognition engine.
    pub fn with_recognizer(mut self, recognizer: Box<dyn TextRecognizer>) -> Self {
        self.recognizer = Some(recognizer);
        self
    }

    /// Override the template similarity threshold.
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    /// Resolve `action` within `capture` to a window-local point, offset
    /// already applied.  `None` means the target was not found this time;
    /// the sequencer decides whether to retry.
    pub fn resolve(&mut self, capture: &Capture, action: &Action) -> Option<(i32, i32)> {
        let base = match action.kind {
            TargetKind::Fixed => self.resolve_fixed(capture, &action.target),
            TargetKind::Text => self.resolve_text(capture, &action.target),
            TargetKind::Template => {
                let needle = match load_template(&action.target) {
                    Ok(needle) => needle,
                    Err(e) => {
                        log::warn!("{e}");
                        return None;
                    }
                };
                self.resolve_template(capture, &needle)
            }
        }?;

        let (dx, dy) = action.offset_delta();
        Some((base.0 + dx, base.1 + dy))
    }

    fn resolve_fixed(&self, capture: &Capture, target: &str) -> Option<(i32, i32)> {
        let (x, y) = parse_fixed_target(target)?;
        // Slightly out-of-capture coordinates are legitimate (windows can
        // extend the actionable area past the captured rect), so flag but
        // do not reject them.
        if x < 0 || y < 0 || x >= capture.width() as i32 || y >= capture.height() as i32 {
            log::warn!(
                "fixed target ({x},{y}) outside capture {}x{}",
                capture.width(),
                capture.height()
            );
        }
        Some((x, y))
    }

    fn resolve_text(&mut self, capture: &Capture, query: &str) -> Option<(i32, i32)> {
        let Some(recognizer) = self.recognizer.as_mut() else {
            log::warn!("text target {query:?} but no OCR recognizer configured");
            return None;
        };

        let boxes = match recognizer.recognize(&capture.pixels) {
            Ok(boxes) => boxes,
            Err(e) => {
                log::warn!("OCR failed: {e}");
                return None;
            }
        };

        // First box in the engine's own return order whose text contains
        // the query; no re-sorting by confidence or position.
        let found = boxes.iter().find(|b| b.text.contains(query));
        match found {
            Some(text_box) => {
                log::debug!(
                    "text {query:?} matched {:?} (confidence {:.2})",
                    text_box.text,
                    text_box.confidence
                );
                Some(text_box.centroid())
            }
            None => {
                log::info!("text {query:?} not among {} recognized boxes", boxes.len());
                None
            }
        }
    }

    /// Match a needle (reference-resolution template) against the capture,
    /// rescaling it proportionally to the capture's width first.
    pub fn resolve_template(
        &self,
        capture: &Capture,
        needle: &image::RgbaImage,
    ) -> Option<(i32, i32)> {
        let scale = needle_scale(capture.width());
        let scaled = scale_needle(needle, scale);

        let hit = match self.matcher.best_match(&capture.pixels, &scaled) {
            Ok(Some(hit)) => hit,
            Ok(None) => return None,
            Err(e) => {
                log::warn!("template match failed: {e}");
                return None;
            }
        };

        if hit.similarity < self.threshold {
            log::info!(
                "best template similarity {:.3} below threshold {:.3}",
                hit.similarity,
                self.threshold
            );
            return None;
        }
        Some(hit.center())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
