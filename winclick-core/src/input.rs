//! Mouse input simulation via Win32 `SendInput`.
//!
//! The click executor never talks to the OS directly: it goes through the
//! [`InputBackend`] trait so tests can substitute a recording fake for the
//! real [`SendInputBackend`].  The backend owns all ambient OS state --
//! screen metrics and the current cursor position.

use windows::Win32::Foundation::POINT;
use windows::Win32::UI::Input::KeyboardAndMouse::{
    SendInput, INPUT, INPUT_0, INPUT_MOUSE, MOUSEEVENTF_ABSOLUTE, MOUSEEVENTF_LEFTDOWN,
    MOUSEEVENTF_LEFTUP, MOUSEEVENTF_MOVE, MOUSEEVENTF_RIGHTDOWN, MOUSEEVENTF_RIGHTUP, MOUSEINPUT,
    MOUSE_EVENT_FLAGS,
};
use windows::Win32::UI::WindowsAndMessaging::{
    GetCursorPos, GetSystemMetrics, SM_CXSCREEN, SM_CYSCREEN,
};

/// Pre-computed size of `INPUT` struct for `SendInput` calls.
const INPUT_SIZE: i32 = std::mem::size_of::<INPUT>() as i32;

/// Mouse buttons the executor can press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Right,
}

/// Injected OS capability for pointer input and screen queries.
///
/// All methods are best-effort: a `false` return means the underlying OS
/// call failed and the caller should treat the whole click as failed.
pub trait InputBackend {
    /// Primary screen dimensions in pixels.
    fn screen_size(&self) -> (i32, i32);
    /// Current cursor position in screen pixels.
    fn cursor_pos(&self) -> (i32, i32);
    /// Move the cursor to absolute screen coordinates.
    fn move_to(&self, x: i32, y: i32) -> bool;
    /// Press a mouse button at the current cursor position.
    fn press(&self, button: MouseButton) -> bool;
    /// Release a mouse button at the current cursor position.
    fn release(&self, button: MouseButton) -> bool;
}

// ---------------------------------------------------------------------------
// Helpers: build INPUT structs
// ---------------------------------------------------------------------------

fn mouse_input(abs_x: i32, abs_y: i32, flags: MOUSE_EVENT_FLAGS) -> INPUT {
    INPUT {
        r#type: INPUT_MOUSE,
        Anonymous: INPUT_0 {
            mi: MOUSEINPUT {
                dx: abs_x,
                dy: abs_y,
                mouseData: 0,
                dwFlags: flags,
                time: 0,
                dwExtraInfo: 0,
            },
        },
    }
}

/// Convert pixel coordinates to 0..65535 normalised space for the primary
/// screen, using the MSDN formula `(pixel * 65535) / (screen_size - 1)`.
/// Result is clamped to `[0, 65535]` to prevent out-of-range values.
pub(crate) fn normalise_coords(x: i32, y: i32, screen_w: i32, screen_h: i32) -> (i32, i32) {
    if screen_w <= 1 || screen_h <= 1 {
        return (0, 0);
    }

    let abs_x = ((x as i64 * 65535) / (screen_w as i64 - 1)).clamp(0, 65535) as i32;
    let abs_y = ((y as i64 * 65535) / (screen_h as i64 - 1)).clamp(0, 65535) as i32;
    (abs_x, abs_y)
}

/// Flags for absolute mouse positioning on the primary screen.
const ABSOLUTE_MOVE: MOUSE_EVENT_FLAGS =
    MOUSE_EVENT_FLAGS(MOUSEEVENTF_ABSOLUTE.0 | MOUSEEVENTF_MOVE.0);

// ---------------------------------------------------------------------------
// Real backend
// ---------------------------------------------------------------------------

/// Production [`InputBackend`] backed by `SendInput` and `GetSystemMetrics`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SendInputBackend;

impl InputBackend for SendInputBackend {
    fn screen_size(&self) -> (i32, i32) {
        let (w, h) = unsafe { (GetSystemMetrics(SM_CXSCREEN), GetSystemMetrics(SM_CYSCREEN)) };
        // GetSystemMetrics returns 0 on failure
        if w > 0 && h > 0 {
            (w, h)
        } else {
            (1920, 1080)
        }
    }

    fn cursor_pos(&self) -> (i32, i32) {
        let mut point = POINT::default();
        match unsafe { GetCursorPos(&mut point) } {
            Ok(()) => (point.x, point.y),
            Err(e) => {
                log::warn!("GetCursorPos failed: {e}");
                (0, 0)
            }
        }
    }

    fn move_to(&self, x: i32, y: i32) -> bool {
        let (screen_w, screen_h) = self.screen_size();
        let (abs_x, abs_y) = normalise_coords(x, y, screen_w, screen_h);
        let input = mouse_input(abs_x, abs_y, ABSOLUTE_MOVE);
        let sent = unsafe { SendInput(&[input], INPUT_SIZE) };
        if sent == 0 {
            log::warn!("SendInput(move to {x},{y}) injected no events");
        }
        sent > 0
    }

    fn press(&self, button: MouseButton) -> bool {
        let flag = match button {
            MouseButton::Left => MOUSEEVENTF_LEFTDOWN,
            MouseButton::Right => MOUSEEVENTF_RIGHTDOWN,
        };
        let input = mouse_input(0, 0, flag);
        let sent = unsafe { SendInput(&[input], INPUT_SIZE) };
        if sent == 0 {
            log::warn!("SendInput({button:?} down) injected no events");
        }
        sent > 0
    }

    fn release(&self, button: MouseButton) -> bool {
        let flag = match button {
            MouseButton::Left => MOUSEEVENTF_LEFTUP,
            MouseButton::Right => MOUSEEVENTF_RIGHTUP,
        };
        let input = mouse_input(0, 0, flag);
        let sent = unsafe { SendInput(&[input], INPUT_SIZE) };
        if sent == 0 {
            log::warn!("SendInput({button:?} up) injected no events");
        }
        sent > 0
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
