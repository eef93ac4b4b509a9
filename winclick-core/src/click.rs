//! Click execution against absolute screen coordinates.
//!
//! The executor is a stateless synchronous procedure: clamp the target to
//! the screen, optionally glide the pointer there so an operator can watch
//! the aim, then synthesize the press/release sequence.  Windows flagged
//! as accepting background input get the DD driver channel first, falling
//! back to the generic `SendInput` path when the driver is unavailable.

use std::thread;
use std::time::Duration;

use crate::action::ClickKind;
use crate::driver::with_driver;
use crate::indicator::show_click_indicator;
use crate::input::{InputBackend, MouseButton};

/// Gap between press and release.  Some targets debounce zero-duration
/// presses, so this cannot be removed.
const PRESS_GAP: Duration = Duration::from_millis(50);

/// Gap between the two clicks of a double click.
const DOUBLE_GAP: Duration = Duration::from_millis(100);

/// Settle time after the pointer reaches the target.
const MOVE_SETTLE: Duration = Duration::from_millis(50);

/// How long the click indicator stays visible.
const INDICATOR_DURATION: Duration = Duration::from_millis(300);

/// Pointer-glide step count for a given animation duration (implicit
/// 60 steps/second, bounded to `[10, 100]`).
fn animation_steps(duration_secs: f64) -> u32 {
    ((duration_secs * 60.0) as i64).clamp(10, 100) as u32
}

/// Screen-point click interface consumed by the sequencer.
pub trait Clicker {
    /// Click at absolute screen coordinates.  Never panics; `false` means
    /// input could not be synthesized.
    fn click(&self, x: i32, y: i32, kind: ClickKind, move_duration_secs: f64) -> bool;
}

/// Production clicker over an injected [`InputBackend`].
pub struct ClickExecutor {
    backend: Box<dyn InputBackend>,
    driver_first: bool,
    indicator: bool,
}

impl ClickExecutor {
    pub fn new(backend: Box<dyn InputBackend>) -> Self {
        Self {
            backend,
            driver_first: false,
            indicator: true,
        }
    }

    /// Try the DD driver channel before `SendInput` (for windows that
    /// accept input while backgrounded).
    pub fn with_driver_first(mut self, driver_first: bool) -> Self {
        self.driver_first = driver_first;
        self
    }

    /// Disable the on-screen click marker.
    pub fn without_indicator(mut self) -> Self {
        self.indicator = false;
        self
    }

    /// Move the pointer to the target, linearly interpolated from its
    /// current position when an animation duration is configured.
    fn glide_to(&self, x: i32, y: i32, duration_secs: f64) -> bool {
        if duration_secs <= 0.0 {
            return self.backend.move_to(x, y);
        }

        let steps = animation_steps(duration_secs);
        let (start_x, start_y) = self.backend.cursor_pos();
        let pause = Duration::from_secs_f64(duration_secs / steps as f64);

        for step in 1..=steps as i32 {
            let ix = start_x + (x - start_x) * step / steps as i32;
            let iy = start_y + (y - start_y) * step / steps as i32;
            if !self.backend.move_to(ix, iy) {
                return false;
            }
            thread::sleep(pause);
        }
        true
    }

    fn press_release(&self, button: MouseButton) -> bool {
        if !self.backend.press(button) {
            return false;
        }
        thread::sleep(PRESS_GAP);
        self.backend.release(button)
    }

    /// Generic `SendInput` click at already-clamped coordinates.
    fn click_send_input(&self, x: i32, y: i32, kind: ClickKind, move_duration_secs: f64) -> bool {
        if !self.glide_to(x, y, move_duration_secs) {
            return false;
        }
        thread::sleep(MOVE_SETTLE);

        match kind {
            ClickKind::Single => self.press_release(MouseButton::Left),
            ClickKind::Double => {
                if !self.press_release(MouseButton::Left) {
                    return false;
                }
                thread::sleep(DOUBLE_GAP);
                self.press_release(MouseButton::Left)
            }
            ClickKind::Right => self.press_release(MouseButton::Right),
        }
    }

    /// DD driver click at already-clamped coordinates.
    fn click_driver(&self, x: i32, y: i32, kind: ClickKind) -> bool {
        let result = with_driver(|driver| {
            driver.move_to(x, y);
            thread::sleep(Duration::from_millis(100));

            let button = match kind {
                ClickKind::Right => MouseButton::Right,
                _ => MouseButton::Left,
            };

            driver.press(button);
            thread::sleep(PRESS_GAP);
            driver.release(button);

            if kind == ClickKind::Double {
                thread::sleep(PRESS_GAP);
                driver.press(button);
                thread::sleep(PRESS_GAP);
                driver.release(button);
            }
        });

        match result {
            Ok(()) => true,
            Err(e) => {
                log::warn!("driver click failed ({e}), falling back to SendInput");
                false
            }
        }
    }
}

impl Clicker for ClickExecutor {
    fn click(&self, x: i32, y: i32, kind: ClickKind, move_duration_secs: f64) -> bool {
        let (screen_w, screen_h) = self.backend.screen_size();
        let x = x.clamp(0, screen_w - 1);
        let y = y.clamp(0, screen_h - 1);

        if self.indicator {
            show_click_indicator(x, y, INDICATOR_DURATION);
        }

        if self.driver_first && self.click_driver(x, y, kind) {
            return true;
        }

        self.click_send_input(x, y, kind, move_duration_secs)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Event {
        Move(i32, i32),
        Press(MouseButton),
        Release(MouseButton),
    }

    /// Recording backend on a fixed 1920x1080 screen with cursor at origin.
    struct FakeBackend {
        events: Rc<RefCell<Vec<Event>>>,
    }

    impl FakeBackend {
        fn new() -> (Self, Rc<RefCell<Vec<Event>>>) {
            let events = Rc::new(RefCell::new(Vec::new()));
            (
                Self {
                    events: Rc::clone(&events),
                },
                events,
            )
        }
    }

    impl InputBackend for FakeBackend {
        fn screen_size(&self) -> (i32, i32) {
            (1920, 1080)
        }

        fn cursor_pos(&self) -> (i32, i32) {
            (0, 0)
        }

        fn move_to(&self, x: i32, y: i32) -> bool {
            self.events.borrow_mut().push(Event::Move(x, y));
            true
        }

        fn press(&self, button: MouseButton) -> bool {
            self.events.borrow_mut().push(Event::Press(button));
            true
        }

        fn release(&self, button: MouseButton) -> bool {
            self.events.borrow_mut().push(Event::Release(button));
            true
        }
    }

    fn executor() -> (ClickExecutor, Rc<RefCell<Vec<Event>>>) {
        let (backend, events) = FakeBackend::new();
        (
            ClickExecutor::new(Box::new(backend)).without_indicator(),
            events,
        )
    }

    #[test]
    fn test_click_clamps_to_screen() {
        let (exec, events) = executor();
        assert!(exec.click(-5, 100_000, ClickKind::Single, 0.0));
        assert_eq!(events.borrow()[0], Event::Move(0, 1079));
    }

    #[test]
    fn test_single_click_event_order() {
        let (exec, events) = executor();
        assert!(exec.click(100, 200, ClickKind::Single, 0.0));
        assert_eq!(
            *events.borrow(),
            vec![
                Event::Move(100, 200),
                Event::Press(MouseButton::Left),
                Event::Release(MouseButton::Left),
            ]
        );
    }

    #[test]
    fn test_double_click_sends_two_pairs() {
        let (exec, events) = executor();
        assert!(exec.click(10, 10, ClickKind::Double, 0.0));
        let presses = events
            .borrow()
            .iter()
            .filter(|e| matches!(e, Event::Press(MouseButton::Left)))
            .count();
        let releases = events
            .borrow()
            .iter()
            .filter(|e| matches!(e, Event::Release(MouseButton::Left)))
            .count();
        assert_eq!(presses, 2);
        assert_eq!(releases, 2);
    }

    #[test]
    fn test_right_click_uses_secondary_button() {
        let (exec, events) = executor();
        assert!(exec.click(10, 10, ClickKind::Right, 0.0));
        assert!(events
            .borrow()
            .contains(&Event::Press(MouseButton::Right)));
        assert!(!events.borrow().iter().any(|e| matches!(
            e,
            Event::Press(MouseButton::Left) | Event::Release(MouseButton::Left)
        )));
    }

    #[test]
    fn test_animated_move_interpolates_and_lands_on_target() {
        let (exec, events) = executor();
        // 0.2s -> 12 steps at the implicit 60 steps/second rate.
        assert!(exec.click(120, 60, ClickKind::Single, 0.2));

        let moves: Vec<_> = events
            .borrow()
            .iter()
            .filter_map(|e| match e {
                Event::Move(x, y) => Some((*x, *y)),
                _ => None,
            })
            .collect();
        assert_eq!(moves.len(), 12);
        assert_eq!(*moves.last().unwrap(), (120, 60));
        // Monotonic approach along x.
        assert!(moves.windows(2).all(|w| w[0].0 <= w[1].0));
    }

    #[test]
    fn test_animation_steps_bounds() {
        assert_eq!(animation_steps(0.05), 10);
        assert_eq!(animation_steps(0.5), 30);
        assert_eq!(animation_steps(10.0), 100);
    }

    /// Backend whose press always fails.
    struct DeadMouse;

    impl InputBackend for DeadMouse {
        fn screen_size(&self) -> (i32, i32) {
            (1920, 1080)
        }
        fn cursor_pos(&self) -> (i32, i32) {
            (0, 0)
        }
        fn move_to(&self, _x: i32, _y: i32) -> bool {
            true
        }
        fn press(&self, _button: MouseButton) -> bool {
            false
        }
        fn release(&self, _button: MouseButton) -> bool {
            true
        }
    }

    #[test]
    fn test_failed_press_reports_false() {
        let exec = ClickExecutor::new(Box::new(DeadMouse)).without_indicator();
        assert!(!exec.click(10, 10, ClickKind::Single, 0.0));
    }
}
