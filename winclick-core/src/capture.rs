//! Screen-region capture via GDI `BitBlt`.
//!
//! Captures an arbitrary rectangle of the screen (a window's bounds) into
//! an owned RGBA buffer.  A [`Capture`] pairs the pixels with the screen
//! origin they were taken at; every screen-space click coordinate must be
//! derived from the origin and a target offset computed within the same
//! capture, never from two different captures.

use image::{Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_hollow_circle_mut};

use windows::Win32::Foundation::HWND;
use windows::Win32::Graphics::Gdi::{
    BitBlt, CreateCompatibleBitmap, CreateCompatibleDC, DeleteDC, DeleteObject, GetDC, GetDIBits,
    ReleaseDC, SelectObject, BITMAPINFO, BITMAPINFOHEADER, BI_RGB, DIB_RGB_COLORS, SRCCOPY,
};

use crate::errors::WinclickError;

/// Fixed path the most recent window snapshot is written to.
///
/// Diagnostic only -- overwritten on every capture, never read back.
pub const DEBUG_SNAPSHOT_PATH: &str = "screenshots/screenshot.png";

/// Fixed path the most recent click-target visualization is written to.
pub const CLICK_TARGET_PATH: &str = "screenshots/click_target.png";

/// A single snapshot of a window's pixel contents plus the screen origin
/// at which it was taken.
#[derive(Debug, Clone)]
pub struct Capture {
    /// RGBA pixels, row-major, top-down.
    pub pixels: RgbaImage,
    /// Screen coordinates of the captured rectangle's top-left corner.
    pub origin: (i32, i32),
}

impl Capture {
    /// Capture width in pixels.
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    /// Capture height in pixels.
    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// Translate a window-local point into screen space using this
    /// capture's origin.
    pub fn to_screen(&self, local: (i32, i32)) -> (i32, i32) {
        (self.origin.0 + local.0, self.origin.1 + local.1)
    }
}

/// Convert a BGRA pixel buffer (GDI DIBSection layout) to RGBA in place.
fn bgra_to_rgba(pixels: &mut [u8]) {
    for chunk in pixels.chunks_exact_mut(4) {
        chunk.swap(0, 2);
    }
}

/// Capture the screen rectangle `(left, top, width, height)` using GDI
/// `BitBlt` and return it as an RGBA image.
///
/// GDI `BI_RGB` 32-bit retrieval produces BGRA with the alpha channel set
/// to 0; alpha is forced to 255 before the buffer is returned.
pub fn capture_screen_rect(
    left: i32,
    top: i32,
    width: u32,
    height: u32,
) -> Result<RgbaImage, WinclickError> {
    if width == 0 || height == 0 {
        return Err(WinclickError::CaptureError(format!(
            "refusing to capture zero-size rect ({width}x{height})"
        )));
    }

    unsafe {
        // Get the screen DC.
        let screen_dc = GetDC(HWND(std::ptr::null_mut()));
        if screen_dc.is_invalid() {
            return Err(WinclickError::CaptureError("GetDC(NULL) failed".into()));
        }
        // RAII-style cleanup via a guard closure at the end.
        let result = (|| -> Result<RgbaImage, WinclickError> {
            let mem_dc = CreateCompatibleDC(screen_dc);
            if mem_dc.is_invalid() {
                return Err(WinclickError::CaptureError(
                    "CreateCompatibleDC failed".into(),
                ));
            }
            let bitmap = CreateCompatibleBitmap(screen_dc, width as i32, height as i32);
            if bitmap.is_invalid() {
                let _ = DeleteDC(mem_dc);
                return Err(WinclickError::CaptureError(
                    "CreateCompatibleBitmap failed".into(),
                ));
            }

            let old_bitmap = SelectObject(mem_dc, bitmap);

            // Copy the window's screen rectangle into the memory DC.
            BitBlt(
                mem_dc,
                0,
                0,
                width as i32,
                height as i32,
                screen_dc,
                left,
                top,
                SRCCOPY,
            )
            .map_err(|e| {
                SelectObject(mem_dc, old_bitmap);
                let _ = DeleteObject(bitmap);
                let _ = DeleteDC(mem_dc);
                WinclickError::CaptureError(format!("BitBlt failed: {e}"))
            })?;

            // Retrieve pixels in 32-bit BGRA format.
            let pixel_count = (width * height) as usize;
            let mut pixels = vec![0u8; pixel_count * 4];

            let bmi = BITMAPINFO {
                bmiHeader: BITMAPINFOHEADER {
                    biSize: std::mem::size_of::<BITMAPINFOHEADER>() as u32,
                    biWidth: width as i32,
                    // Negative height = top-down bitmap (row 0 at top).
                    biHeight: -(height as i32),
                    biPlanes: 1,
                    biBitCount: 32,
                    biCompression: BI_RGB.0,
                    biSizeImage: 0,
                    biXPelsPerMeter: 0,
                    biYPelsPerMeter: 0,
                    biClrUsed: 0,
                    biClrImportant: 0,
                },
                bmiColors: [Default::default()],
            };

            let lines = GetDIBits(
                mem_dc,
                bitmap,
                0,
                height,
                Some(pixels.as_mut_ptr() as *mut _),
                &bmi as *const _ as *mut _,
                DIB_RGB_COLORS,
            );

            SelectObject(mem_dc, old_bitmap);
            let _ = DeleteObject(bitmap);
            let _ = DeleteDC(mem_dc);

            if lines == 0 {
                return Err(WinclickError::CaptureError("GetDIBits failed".into()));
            }

            bgra_to_rgba(&mut pixels);
            // GDI BI_RGB 32-bit has alpha = 0; set it to 255 (fully opaque).
            for chunk in pixels.chunks_exact_mut(4) {
                chunk[3] = 255;
            }

            RgbaImage::from_raw(width, height, pixels).ok_or_else(|| {
                WinclickError::CaptureError("RgbaImage::from_raw: buffer size mismatch".into())
            })
        })();

        ReleaseDC(HWND(std::ptr::null_mut()), screen_dc);
        result
    }
}

fn persist_diagnostic(image: &RgbaImage, path: &str) {
    if let Some(dir) = std::path::Path::new(path).parent() {
        if let Err(e) = std::fs::create_dir_all(dir) {
            log::warn!("snapshot dir {dir:?} could not be created: {e}");
            return;
        }
    }
    if let Err(e) = image.save(path) {
        log::warn!("snapshot write to {path} failed: {e}");
    }
}

/// Persist `image` to [`DEBUG_SNAPSHOT_PATH`], overwriting any previous
/// snapshot.  Failures are logged and swallowed.
pub fn save_debug_snapshot(image: &RgbaImage) {
    persist_diagnostic(image, DEBUG_SNAPSHOT_PATH);
}

/// Persist a copy of the capture with the resolved click point marked
/// (hollow circle plus center dot) to [`CLICK_TARGET_PATH`].
///
/// Diagnostic only, like the plain snapshot: overwritten every step and
/// never read back.
pub fn save_click_marker(capture: &Capture, local: (i32, i32)) {
    let mut annotated = capture.pixels.clone();
    draw_hollow_circle_mut(&mut annotated, local, 20, Rgba([0, 255, 0, 255]));
    draw_filled_circle_mut(&mut annotated, local, 5, Rgba([255, 0, 0, 255]));
    persist_diagnostic(&annotated, CLICK_TARGET_PATH);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bgra_to_rgba_swaps_channels() {
        let mut px = vec![10u8, 20, 30, 0, 1, 2, 3, 0];
        bgra_to_rgba(&mut px);
        assert_eq!(px, vec![30, 20, 10, 0, 3, 2, 1, 0]);
    }

    #[test]
    fn test_capture_to_screen_adds_origin() {
        let cap = Capture {
            pixels: RgbaImage::new(800, 600),
            origin: (100, 100),
        };
        assert_eq!(cap.to_screen((50, 50)), (150, 150));
        assert_eq!(cap.to_screen((0, 0)), (100, 100));
    }

    #[test]
    fn test_capture_dimensions() {
        let cap = Capture {
            pixels: RgbaImage::new(320, 240),
            origin: (0, 0),
        };
        assert_eq!(cap.width(), 320);
        assert_eq!(cap.height(), 240);
    }
}
