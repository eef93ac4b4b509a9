//! Transient on-screen click marker.
//!
//! Draws a small circle on the desktop DC at the click point from a
//! fire-and-forget background thread and erases it by invalidating the
//! desktop after a fixed duration.  Purely cosmetic -- the marker lets a
//! human operator verify the automation is aiming at the right spot.  It
//! is never awaited and has no synchronization with the click itself.

use std::thread;
use std::time::Duration;

use windows::Win32::Foundation::{COLORREF, HWND};
use windows::Win32::Graphics::Gdi::{
    CreatePen, DeleteObject, Ellipse, GetDC, GetStockObject, RedrawWindow, ReleaseDC,
    SelectObject, HRGN, NULL_BRUSH, PS_SOLID, RDW_ALLCHILDREN, RDW_ERASE, RDW_INVALIDATE,
};

/// Marker radius in pixels.
const RADIUS: i32 = 10;

/// 0x00BBGGRR -- pure red.
const MARKER_COLOR: COLORREF = COLORREF(0x0000_00FF);

/// Draw a circle at screen coordinates, erase it after `duration`.
///
/// Negative coordinates are skipped (nothing to show off-screen).  The
/// spawned thread is detached; callers must not rely on it for timing or
/// correctness.
pub fn show_click_indicator(x: i32, y: i32, duration: Duration) {
    if x < 0 || y < 0 {
        log::debug!("skipping indicator at off-screen ({x},{y})");
        return;
    }

    thread::spawn(move || unsafe {
        let desktop = HWND(std::ptr::null_mut());
        let hdc = GetDC(desktop);
        if hdc.is_invalid() {
            return;
        }

        let pen = CreatePen(PS_SOLID, 2, MARKER_COLOR);
        let old_pen = SelectObject(hdc, pen);
        // Hollow circle: null brush leaves the interior untouched.
        let brush = GetStockObject(NULL_BRUSH);
        let old_brush = SelectObject(hdc, brush);

        let _ = Ellipse(hdc, x - RADIUS, y - RADIUS, x + RADIUS, y + RADIUS);

        SelectObject(hdc, old_pen);
        SelectObject(hdc, old_brush);
        let _ = DeleteObject(pen);
        ReleaseDC(desktop, hdc);

        thread::sleep(duration);

        // Invalidate the desktop so the circle is repainted away.
        let _ = RedrawWindow(
            desktop,
            None,
            HRGN::default(),
            RDW_INVALIDATE | RDW_ERASE | RDW_ALLCHILDREN,
        );
    });
}
