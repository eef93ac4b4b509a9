//! Window discovery and session management via Win32 API.
//!
//! A [`WindowSession`] tracks one target window across an automation run:
//! it is created from a title substring, finds and activates the window,
//! refreshes its bounds on every capture, and detects a stale handle
//! lazily on next use (no callback when the window closes).  All OS
//! failures degrade to `bool`/`Option` results; retry decisions belong to
//! the sequencing layer.

use std::ffi::OsString;
use std::os::windows::ffi::OsStringExt;
use std::thread;
use std::time::Duration;

use serde::Serialize;
use windows::Win32::Foundation::{BOOL, HWND, LPARAM, RECT, TRUE};
use windows::Win32::UI::WindowsAndMessaging::{
    EnumWindows, GetForegroundWindow, GetWindowLongW, GetWindowRect, GetWindowTextLengthW,
    GetWindowTextW, IsIconic, IsWindow, IsWindowVisible, SetWindowPos, ShowWindow, GWL_EXSTYLE,
    GWL_STYLE, HWND_NOTOPMOST, HWND_TOPMOST, SWP_NOMOVE, SWP_NOSIZE, SW_RESTORE,
    WS_EX_NOACTIVATE, WS_EX_TOOLWINDOW, WS_VISIBLE,
};

use crate::capture::{capture_screen_rect, save_debug_snapshot, Capture};

/// A window positioned further off-screen than this is treated as hidden.
const OFFSCREEN_LIMIT: i32 = -10_000;

// ---------------------------------------------------------------------------
// Data types
// ---------------------------------------------------------------------------

/// Window bounding rectangle in screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WindowRect {
    pub left: i32,
    pub top: i32,
    pub width: i32,
    pub height: i32,
}

impl WindowRect {
    pub fn right(&self) -> i32 {
        self.left + self.width
    }

    pub fn bottom(&self) -> i32 {
        self.top + self.height
    }

    /// Whether the rectangle describes a window that can be captured:
    /// on-screen (not parked at the minimised position) with positive area.
    pub fn is_plausible(&self) -> bool {
        self.left > OFFSCREEN_LIMIT && self.top > OFFSCREEN_LIMIT && self.width > 0 && self.height > 0
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Read the window title (up to its reported length).
fn read_window_title(hwnd: HWND) -> String {
    let len = unsafe { GetWindowTextLengthW(hwnd) };
    if len <= 0 {
        return String::new();
    }
    let mut buf = vec![0u16; (len + 1) as usize];
    let copied = unsafe { GetWindowTextW(hwnd, &mut buf) };
    if copied <= 0 {
        return String::new();
    }
    OsString::from_wide(&buf[..copied as usize])
        .to_string_lossy()
        .into_owned()
}

/// Case-insensitive substring match of `query` against a window title.
fn title_matches(title: &str, query: &str) -> bool {
    title.to_lowercase().contains(&query.to_lowercase())
}

/// Check if a window is a normal top-level application window (not a tool
/// window or otherwise invisible to the taskbar).
fn is_alt_tab_window(hwnd: HWND) -> bool {
    let style = unsafe { GetWindowLongW(hwnd, GWL_STYLE) } as u32;
    let ex_style = unsafe { GetWindowLongW(hwnd, GWL_EXSTYLE) } as u32;

    if style & WS_VISIBLE.0 == 0 {
        return false;
    }
    if ex_style & WS_EX_TOOLWINDOW.0 != 0 {
        return false;
    }
    if ex_style & WS_EX_NOACTIVATE.0 != 0 {
        return false;
    }

    true
}

/// Callback for EnumWindows that collects visible titled window handles.
unsafe extern "system" fn enum_callback(hwnd: HWND, lparam: LPARAM) -> BOOL {
    let handles = unsafe { &mut *(lparam.0 as *mut Vec<HWND>) };

    if unsafe { IsWindowVisible(hwnd) }.as_bool() && is_alt_tab_window(hwnd) {
        let title_len = unsafe { GetWindowTextLengthW(hwnd) };
        if title_len > 0 {
            handles.push(hwnd);
        }
    }

    TRUE // continue enumeration
}

/// Enumerate visible top-level windows and return the first whose title
/// contains `query` (case-insensitive), in enumeration order.
fn find_first_window(query: &str) -> Option<isize> {
    let mut handles: Vec<HWND> = Vec::with_capacity(64);
    let result = unsafe {
        EnumWindows(
            Some(enum_callback),
            LPARAM(&mut handles as *mut Vec<HWND> as isize),
        )
    };
    if let Err(e) = result {
        log::warn!("EnumWindows failed: {e}");
        return None;
    }

    handles
        .into_iter()
        .find(|&hwnd| title_matches(&read_window_title(hwnd), query))
        .map(|hwnd| hwnd.0 as isize)
}

/// Read a window's screen rectangle, or `None` on failure.
fn read_rect(hwnd: HWND) -> Option<WindowRect> {
    let mut raw = RECT::default();
    match unsafe { GetWindowRect(hwnd, &mut raw) } {
        Ok(()) => Some(WindowRect {
            left: raw.left,
            top: raw.top,
            width: raw.right - raw.left,
            height: raw.bottom - raw.top,
        }),
        Err(e) => {
            log::warn!("GetWindowRect failed: {e}");
            None
        }
    }
}

// ---------------------------------------------------------------------------
// Window session
// ---------------------------------------------------------------------------

/// One target window, tracked by handle and title query across a run.
#[derive(Debug)]
pub struct WindowSession {
    hwnd: Option<isize>,
    title_query: String,
    last_bounds: Option<WindowRect>,
}

impl WindowSession {
    /// Create an unbound session for a title substring.
    pub fn new(title_query: impl Into<String>) -> Self {
        Self {
            hwnd: None,
            title_query: title_query.into(),
            last_bounds: None,
        }
    }

    /// The title substring this session searches for.
    pub fn title_query(&self) -> &str {
        &self.title_query
    }

    /// The bound window handle, if any.
    pub fn hwnd(&self) -> Option<isize> {
        self.hwnd
    }

    /// Bounds from the most recent successful [`WindowSession::bounds`] call.
    pub fn last_bounds(&self) -> Option<WindowRect> {
        self.last_bounds
    }

    /// Live title of the bound window (may differ from the query).
    pub fn window_title(&self) -> Option<String> {
        self.hwnd
            .map(|h| read_window_title(HWND(h as *mut core::ffi::c_void)))
    }

    /// Whether the stored handle still refers to a live window.
    pub fn is_valid(&self) -> bool {
        match self.hwnd {
            Some(h) => unsafe { IsWindow(HWND(h as *mut core::ffi::c_void)) }.as_bool(),
            None => false,
        }
    }

    /// Find the first visible window whose title contains the query,
    /// store its handle, and attempt foreground activation.
    ///
    /// Returns `false` if no window matches.
    pub fn find_window(&mut self) -> bool {
        match find_first_window(&self.title_query) {
            Some(hwnd) => {
                self.hwnd = Some(hwnd);
                log::info!("bound window {hwnd:#x} for title query {:?}", self.title_query);
                self.activate();
                true
            }
            None => {
                log::warn!("no visible window title contains {:?}", self.title_query);
                false
            }
        }
    }

    /// Best-effort foreground activation.
    ///
    /// Restores a minimised window; otherwise toggles TOPMOST/NOTOPMOST to
    /// raise it without pinning it.  Returns whether the window ended up as
    /// the OS foreground window or at least visible -- callers decide
    /// whether "visible but not foreground" is acceptable for their target.
    pub fn activate(&self) -> bool {
        let Some(h) = self.hwnd else {
            return false;
        };
        let hwnd = HWND(h as *mut core::ffi::c_void);

        unsafe {
            if IsIconic(hwnd).as_bool() {
                log::debug!("window {h:#x} minimised, restoring");
                let _ = ShowWindow(hwnd, SW_RESTORE);
            } else {
                if let Err(e) = SetWindowPos(hwnd, HWND_TOPMOST, 0, 0, 0, 0, SWP_NOMOVE | SWP_NOSIZE)
                {
                    log::warn!("SetWindowPos(TOPMOST) failed: {e}");
                }
                // Undo TOPMOST so the window does not stay pinned.
                if let Err(e) =
                    SetWindowPos(hwnd, HWND_NOTOPMOST, 0, 0, 0, 0, SWP_NOMOVE | SWP_NOSIZE)
                {
                    log::warn!("SetWindowPos(NOTOPMOST) failed: {e}");
                }
            }
        }

        // Give the window manager a moment to react.
        thread::sleep(Duration::from_millis(100));

        let foreground = unsafe { GetForegroundWindow() }.0 as isize;
        let visible = unsafe { IsWindowVisible(hwnd) }.as_bool();

        if foreground == h {
            true
        } else if visible {
            log::debug!("window {h:#x} visible but not foreground (foreground: {foreground:#x})");
            true
        } else {
            log::warn!("window {h:#x} neither foreground nor visible");
            false
        }
    }

    /// Current window bounds, refreshed from the OS.
    ///
    /// A rect parked off-screen or with non-positive size triggers one
    /// re-activation-and-retry; returns `None` if still implausible.
    pub fn bounds(&mut self) -> Option<WindowRect> {
        let h = self.hwnd?;
        let hwnd = HWND(h as *mut core::ffi::c_void);

        let mut rect = read_rect(hwnd)?;
        if !rect.is_plausible() {
            log::warn!("window {h:#x} bounds implausible ({rect:?}), re-activating");
            self.activate();
            thread::sleep(Duration::from_millis(500));
            rect = read_rect(hwnd)?;
            if !rect.is_plausible() {
                log::warn!("window {h:#x} bounds still implausible after re-activation");
                return None;
            }
        }

        self.last_bounds = Some(rect);
        Some(rect)
    }

    /// Snapshot exactly the window's bounding rectangle from the screen.
    ///
    /// Side effect: overwrites the debug snapshot on disk.  Returns `None`
    /// if bounds cannot be obtained or the blit fails.
    pub fn capture_window(&mut self) -> Option<Capture> {
        let rect = self.bounds()?;

        match capture_screen_rect(rect.left, rect.top, rect.width as u32, rect.height as u32) {
            Ok(pixels) => {
                save_debug_snapshot(&pixels);
                Some(Capture {
                    pixels,
                    origin: (rect.left, rect.top),
                })
            }
            Err(e) => {
                log::warn!("window capture failed: {e}");
                None
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_matches_case_insensitive_substring() {
        assert!(title_matches("Untitled - Notepad", "notepad"));
        assert!(title_matches("Ace云手机 - 1", "云手机"));
        assert!(!title_matches("Calculator", "notepad"));
        // Empty query matches everything, mirroring substring semantics.
        assert!(title_matches("anything", ""));
    }

    #[test]
    fn test_rect_plausibility() {
        let ok = WindowRect {
            left: 100,
            top: 100,
            width: 800,
            height: 600,
        };
        assert!(ok.is_plausible());

        let minimised = WindowRect {
            left: -32_000,
            top: -32_000,
            width: 160,
            height: 28,
        };
        assert!(!minimised.is_plausible());

        let degenerate = WindowRect {
            left: 0,
            top: 0,
            width: 0,
            height: 600,
        };
        assert!(!degenerate.is_plausible());
    }

    #[test]
    fn test_rect_edges() {
        let r = WindowRect {
            left: 100,
            top: 200,
            width: 800,
            height: 600,
        };
        assert_eq!(r.right(), 900);
        assert_eq!(r.bottom(), 800);
    }

    #[test]
    fn test_unbound_session_is_invalid() {
        let session = WindowSession::new("Notepad");
        assert!(!session.is_valid());
        assert!(session.hwnd().is_none());
        assert!(session.last_bounds().is_none());
        assert_eq!(session.title_query(), "Notepad");
    }
}
