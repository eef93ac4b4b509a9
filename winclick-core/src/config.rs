//! Run configuration loaded from a JSON file.
//!
//! The file enumerates the target window, the ordered click sequence, and
//! the knobs the sequencer and executor need.  Everything except
//! `window_title` and `actions` has a serde default, so minimal configs
//! stay minimal.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::action::Action;
use crate::errors::WinclickError;
use crate::sequence::RetryPolicy;

/// Paths to the PP-OCR model files used by the text recognizer.
#[derive(Debug, Clone, Deserialize)]
pub struct OcrModelPaths {
    /// Detection model (`.mnn`).
    pub detection: PathBuf,
    /// Recognition model (`.mnn`).
    pub recognition: PathBuf,
    /// Character set file for the recognition model.
    pub keys: PathBuf,
}

/// Top-level run configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RunConfig {
    /// Title substring of the window to automate.
    pub window_title: String,
    /// Ordered click sequence.
    pub actions: Vec<Action>,
    /// Per-step retry policy.
    #[serde(default)]
    pub retry: RetryPolicy,
    /// Title substrings of windows known to accept input while backgrounded
    /// (virtualized / emulator windows); these get the driver-backed click
    /// channel first.
    #[serde(default)]
    pub background_input_titles: Vec<String>,
    /// Pointer travel animation in seconds; `0` jumps straight to the target.
    #[serde(default)]
    pub move_duration: f64,
    /// Minimum template-match similarity, overriding the built-in default.
    #[serde(default)]
    pub template_threshold: Option<f32>,
    /// OCR model files; required only when the sequence contains text targets.
    #[serde(default)]
    pub ocr_models: Option<OcrModelPaths>,
}

impl RunConfig {
    /// Read and parse a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, WinclickError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| WinclickError::ConfigError(format!("read {}: {e}", path.display())))?;
        serde_json::from_str(&raw)
            .map_err(|e| WinclickError::ConfigError(format!("parse {}: {e}", path.display())))
    }

    /// Whether the target window is flagged as accepting background input.
    pub fn accepts_background_input(&self, window_title: &str) -> bool {
        let title = window_title.to_lowercase();
        self.background_input_titles
            .iter()
            .any(|needle| title.contains(&needle.to_lowercase()))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{ClickKind, TargetKind};

    #[test]
    fn test_minimal_config() {
        let json = r#"{
            "window_title": "Notepad",
            "actions": [
                {"kind": "fixed", "target": "50:50"}
            ]
        }"#;
        let config: RunConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.window_title, "Notepad");
        assert_eq!(config.actions.len(), 1);
        assert!(config.retry.max_attempts.is_none());
        assert!(config.background_input_titles.is_empty());
        assert_eq!(config.move_duration, 0.0);
        assert!(config.template_threshold.is_none());
        assert!(config.ocr_models.is_none());
    }

    #[test]
    fn test_full_config() {
        let json = r#"{
            "window_title": "Ace云手机",
            "actions": [
                {"kind": "text", "target": "开始", "click": "single", "delay": 2.0, "offset": "D30"},
                {"kind": "template", "target": "assets/confirm.png", "click": "double"}
            ],
            "retry": {"max_attempts": 5, "delay": 0.25},
            "background_input_titles": ["云手机"],
            "move_duration": 0.5,
            "template_threshold": 0.8,
            "ocr_models": {
                "detection": "models/det.mnn",
                "recognition": "models/rec.mnn",
                "keys": "models/keys.txt"
            }
        }"#;
        let config: RunConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.actions[0].kind, TargetKind::Text);
        assert_eq!(config.actions[1].click, ClickKind::Double);
        assert_eq!(config.retry.max_attempts, Some(5));
        assert_eq!(config.template_threshold, Some(0.8));
        assert!(config.ocr_models.is_some());
    }

    #[test]
    fn test_background_input_lookup_case_insensitive() {
        let json = r#"{
            "window_title": "Ace",
            "actions": [],
            "background_input_titles": ["ace云手机"]
        }"#;
        let config: RunConfig = serde_json::from_str(json).unwrap();
        assert!(config.accepts_background_input("Ace云手机 - 实例1"));
        assert!(!config.accepts_background_input("Notepad"));
    }

    #[test]
    fn test_load_missing_file_is_config_error() {
        let err = RunConfig::load("definitely/not/here.json").unwrap_err();
        assert!(err.to_string().contains("ConfigError"));
    }
}
