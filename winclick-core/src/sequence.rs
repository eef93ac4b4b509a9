//! Cursor-driven execution of a configured action sequence.
//!
//! The sequencer consumes the action list front-to-back with an explicit
//! step cursor: a failed step is retried in place without advancing, and
//! completed steps are never restarted.  It is the only layer that decides
//! whether a failure is retryable or run-ending; everything below it
//! degrades to `bool`/`Option`.

use std::thread;
use std::time::Duration;

use serde::Deserialize;

use crate::action::Action;
use crate::capture::{save_click_marker, Capture};
use crate::click::Clicker;
use crate::locate::Locator;
use crate::window::WindowSession;

/// Per-step retry policy.
///
/// `max_attempts: None` reproduces the reference behavior of retrying a
/// missing target indefinitely; a bounded policy fails the run once one
/// step has used up its attempts.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RetryPolicy {
    /// Attempts allowed per step; `None` means unbounded.
    #[serde(default)]
    pub max_attempts: Option<u32>,
    /// Seconds to sleep between attempts on the same step.
    #[serde(default = "default_retry_delay")]
    pub delay: f64,
}

fn default_retry_delay() -> f64 {
    0.5
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: None,
            delay: default_retry_delay(),
        }
    }
}

impl RetryPolicy {
    /// Retry forever (reference behavior).
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Fail the run after `max_attempts` tries of a single step.
    pub fn bounded(max_attempts: u32) -> Self {
        Self {
            max_attempts: Some(max_attempts),
            ..Self::default()
        }
    }

    fn delay_duration(&self) -> Duration {
        Duration::from_secs_f64(self.delay.max(0.0))
    }
}

/// The window surface the sequencer drives.
///
/// [`WindowSession`] is the production implementation; tests substitute a
/// scripted fake.
pub trait TargetWindow {
    /// Whether the tracked handle still refers to a live window.
    fn is_valid(&self) -> bool;
    /// Re-run the original title search and re-bind the handle.
    fn find_window(&mut self) -> bool;
    /// Best-effort raise before a click; `true` also covers "visible but
    /// not foreground".
    fn activate(&self) -> bool;
    /// Capture the window's pixels together with its current screen origin.
    fn capture_window(&mut self) -> Option<Capture>;
}

impl TargetWindow for WindowSession {
    fn is_valid(&self) -> bool {
        WindowSession::is_valid(self)
    }

    fn find_window(&mut self) -> bool {
        WindowSession::find_window(self)
    }

    fn activate(&self) -> bool {
        WindowSession::activate(self)
    }

    fn capture_window(&mut self) -> Option<Capture> {
        WindowSession::capture_window(self)
    }
}

/// Drives a [`TargetWindow`] through an action list.
pub struct Sequencer {
    retry: RetryPolicy,
    move_duration: f64,
}

impl Sequencer {
    pub fn new(retry: RetryPolicy) -> Self {
        Self {
            retry,
            move_duration: 0.0,
        }
    }

    /// Pointer glide duration passed through to the clicker.
    pub fn with_move_duration(mut self, move_duration_secs: f64) -> Self {
        self.move_duration = move_duration_secs;
        self
    }

    /// Execute the whole sequence.  Returns `true` only when the cursor
    /// has advanced past the final action; `false` when the window cannot
    /// be re-acquired or a bounded retry budget runs out.
    pub fn run(
        &self,
        window: &mut dyn TargetWindow,
        actions: &[Action],
        locator: &mut Locator,
        clicker: &dyn Clicker,
    ) -> bool {
        let mut cursor = 0usize;
        let mut attempts = 0u32;

        while let Some(action) = actions.get(cursor) {
            if !window.is_valid() {
                log::warn!("window handle stale at step {cursor}, searching again");
                if !window.find_window() {
                    log::error!("window lost and could not be re-acquired, aborting run");
                    return false;
                }
            }

            // Origin and target always come from this one capture; the
            // window may have moved since the previous step.
            let Some(capture) = window.capture_window() else {
                if !self.retry_step(&mut attempts, cursor, "capture failed") {
                    return false;
                }
                continue;
            };

            let Some(local) = locator.resolve(&capture, action) else {
                if !self.retry_step(&mut attempts, cursor, "target not resolved") {
                    return false;
                }
                continue;
            };

            save_click_marker(&capture, local);

            let (screen_x, screen_y) = capture.to_screen(local);
            log::info!(
                "step {cursor}: {:?} target {:?} -> screen ({screen_x},{screen_y})",
                action.kind,
                action.target
            );

            if !window.activate() {
                if !self.retry_step(&mut attempts, cursor, "window not activatable") {
                    return false;
                }
                continue;
            }

            if !clicker.click(screen_x, screen_y, action.click, self.move_duration) {
                if !self.retry_step(&mut attempts, cursor, "click failed") {
                    return false;
                }
                continue;
            }

            thread::sleep(action.delay_duration());
            cursor += 1;
            attempts = 0;
        }

        true
    }

    /// Record a failed attempt on the current step.  Returns `false` when
    /// the retry budget is exhausted and the run must end.
    fn retry_step(&self, attempts: &mut u32, cursor: usize, reason: &str) -> bool {
        *attempts += 1;
        if let Some(max) = self.retry.max_attempts {
            if *attempts >= max {
                log::error!("step {cursor}: {reason}; attempt {attempts}/{max}, giving up");
                return false;
            }
            log::info!("step {cursor}: {reason}; attempt {attempts}/{max}, retrying");
        } else {
            log::info!("step {cursor}: {reason}; retrying");
        }
        thread::sleep(self.retry.delay_duration());
        true
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{ClickKind, TargetKind};
    use crate::errors::WinclickError;
    use crate::ocr::{TextBox, TextRecognizer};
    use crate::template::{TemplateHit, TemplateMatcher};
    use image::RgbaImage;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct NullMatcher;

    impl TemplateMatcher for NullMatcher {
        fn best_match(
            &self,
            _haystack: &RgbaImage,
            _needle: &RgbaImage,
        ) -> Result<Option<TemplateHit>, WinclickError> {
            Ok(None)
        }
    }

    struct ScriptedRecognizer {
        boxes: Vec<TextBox>,
    }

    impl TextRecognizer for ScriptedRecognizer {
        fn recognize(&mut self, _image: &RgbaImage) -> Result<Vec<TextBox>, WinclickError> {
            Ok(self.boxes.clone())
        }
    }

    /// Window fixed at (100,100) 800x600, with scriptable liveness.
    struct FakeWindow {
        valid: bool,
        refind_succeeds: bool,
        activatable: bool,
        captures: u32,
    }

    impl FakeWindow {
        fn healthy() -> Self {
            Self {
                valid: true,
                refind_succeeds: true,
                activatable: true,
                captures: 0,
            }
        }
    }

    impl TargetWindow for FakeWindow {
        fn is_valid(&self) -> bool {
            self.valid
        }

        fn find_window(&mut self) -> bool {
            if self.refind_succeeds {
                self.valid = true;
            }
            self.refind_succeeds
        }

        fn activate(&self) -> bool {
            self.activatable
        }

        fn capture_window(&mut self) -> Option<Capture> {
            self.captures += 1;
            Some(Capture {
                pixels: RgbaImage::new(800, 600),
                origin: (100, 100),
            })
        }
    }

    struct RecordingClicker {
        clicks: Rc<RefCell<Vec<(i32, i32, ClickKind)>>>,
    }

    impl RecordingClicker {
        fn new() -> (Self, Rc<RefCell<Vec<(i32, i32, ClickKind)>>>) {
            let clicks = Rc::new(RefCell::new(Vec::new()));
            (
                Self {
                    clicks: Rc::clone(&clicks),
                },
                clicks,
            )
        }
    }

    impl Clicker for RecordingClicker {
        fn click(&self, x: i32, y: i32, kind: ClickKind, _move_duration_secs: f64) -> bool {
            self.clicks.borrow_mut().push((x, y, kind));
            true
        }
    }

    fn fixed_action(target: &str) -> Action {
        Action {
            kind: TargetKind::Fixed,
            target: target.into(),
            click: ClickKind::Single,
            delay: 0.0,
            offset: "0".into(),
        }
    }

    fn text_action(query: &str) -> Action {
        Action {
            kind: TargetKind::Text,
            target: query.into(),
            click: ClickKind::Single,
            delay: 0.0,
            offset: String::new(),
        }
    }

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts: Some(max_attempts),
            delay: 0.0,
        }
    }

    #[test]
    fn test_fixed_action_clicks_at_global_point() {
        let mut window = FakeWindow::healthy();
        let mut locator = Locator::new(Box::new(NullMatcher));
        let (clicker, clicks) = RecordingClicker::new();
        let actions = vec![fixed_action("50:50")];

        let ok = Sequencer::new(fast_policy(3)).run(&mut window, &actions, &mut locator, &clicker);

        assert!(ok);
        assert_eq!(*clicks.borrow(), vec![(150, 150, ClickKind::Single)]);
    }

    #[test]
    fn test_sequence_advances_through_all_steps() {
        let mut window = FakeWindow::healthy();
        let mut locator = Locator::new(Box::new(NullMatcher));
        let (clicker, clicks) = RecordingClicker::new();
        let actions = vec![fixed_action("10:10"), fixed_action("20:30")];

        let ok = Sequencer::new(fast_policy(3)).run(&mut window, &actions, &mut locator, &clicker);

        assert!(ok);
        assert_eq!(
            *clicks.borrow(),
            vec![(110, 110, ClickKind::Single), (120, 130, ClickKind::Single)]
        );
    }

    #[test]
    fn test_unresolved_target_retries_same_step_without_advancing() {
        let mut window = FakeWindow::healthy();
        let mut locator = Locator::new(Box::new(NullMatcher)).with_recognizer(Box::new(
            ScriptedRecognizer {
                boxes: vec![TextBox::from_rect(0.0, 0.0, 40.0, 16.0, "Cancel".into(), 0.9)],
            },
        ));
        let (clicker, clicks) = RecordingClicker::new();
        let actions = vec![text_action("Submit")];

        let ok = Sequencer::new(fast_policy(3)).run(&mut window, &actions, &mut locator, &clicker);

        assert!(!ok);
        // Every attempt re-captured the same step; nothing was clicked.
        assert_eq!(window.captures, 3);
        assert!(clicks.borrow().is_empty());
    }

    #[test]
    fn test_lost_window_aborts_run_when_refind_fails() {
        let mut window = FakeWindow {
            valid: false,
            refind_succeeds: false,
            activatable: false,
            captures: 0,
        };
        let mut locator = Locator::new(Box::new(NullMatcher));
        let (clicker, clicks) = RecordingClicker::new();
        let actions = vec![fixed_action("50:50")];

        let ok = Sequencer::new(fast_policy(3)).run(&mut window, &actions, &mut locator, &clicker);

        assert!(!ok);
        assert_eq!(window.captures, 0);
        assert!(clicks.borrow().is_empty());
    }

    #[test]
    fn test_lost_window_recovers_when_refind_succeeds() {
        let mut window = FakeWindow {
            valid: false,
            refind_succeeds: true,
            activatable: true,
            captures: 0,
        };
        let mut locator = Locator::new(Box::new(NullMatcher));
        let (clicker, clicks) = RecordingClicker::new();
        let actions = vec![fixed_action("1:2")];

        let ok = Sequencer::new(fast_policy(3)).run(&mut window, &actions, &mut locator, &clicker);

        assert!(ok);
        assert_eq!(*clicks.borrow(), vec![(101, 102, ClickKind::Single)]);
    }

    #[test]
    fn test_unactivatable_window_exhausts_retry_budget() {
        let mut window = FakeWindow {
            valid: true,
            refind_succeeds: true,
            activatable: false,
            captures: 0,
        };
        let mut locator = Locator::new(Box::new(NullMatcher));
        let (clicker, clicks) = RecordingClicker::new();
        let actions = vec![fixed_action("50:50")];

        let ok = Sequencer::new(fast_policy(2)).run(&mut window, &actions, &mut locator, &clicker);

        assert!(!ok);
        assert!(clicks.borrow().is_empty());
    }

    #[test]
    fn test_empty_sequence_succeeds() {
        let mut window = FakeWindow::healthy();
        let mut locator = Locator::new(Box::new(NullMatcher));
        let (clicker, _clicks) = RecordingClicker::new();

        assert!(Sequencer::new(fast_policy(1)).run(&mut window, &[], &mut locator, &clicker));
    }

    #[test]
    fn test_retry_policy_deserialization() {
        let policy: RetryPolicy = serde_json::from_str(r#"{"max_attempts": 4, "delay": 0.1}"#).unwrap();
        assert_eq!(policy.max_attempts, Some(4));
        assert_eq!(policy.delay, 0.1);

        let default: RetryPolicy = serde_json::from_str("{}").unwrap();
        assert!(default.max_attempts.is_none());
        assert_eq!(default.delay, 0.5);
    }
}
