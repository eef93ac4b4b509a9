//! Error types for `winclick_core`.
//!
//! All Rust-side failures are funnelled through [`WinclickError`], which
//! uses `thiserror` for `Display` and `Error` derives.  Most session-level
//! APIs degrade to `bool`/`Option` results (the sequencer decides what is
//! retryable); `Result` is reserved for the edges -- configuration loading,
//! engine construction, and the CLI binaries.

use thiserror::Error;
use windows::core::Error as WindowsError;

/// Top-level error type for the `winclick_core` library.
///
/// Each variant corresponds to a distinct subsystem.
#[derive(Debug, Error)]
pub enum WinclickError {
    /// Window lookup, activation, or geometry failure.
    #[error("WindowError: {0}")]
    WindowError(String),

    /// Screen capture failure (GDI).
    #[error("CaptureError: {0}")]
    CaptureError(String),

    /// Input simulation failure (SendInput / mouse).
    #[error("InputError: {0}")]
    InputError(String),

    /// OCR or template-matching engine failure.
    #[error("LocateError: {0}")]
    LocateError(String),

    /// Configuration file could not be read or parsed.
    #[error("ConfigError: {0}")]
    ConfigError(String),

    /// DD vendor driver could not be loaded or initialised.
    #[error("DriverError: {0}")]
    DriverError(String),
}

/// Convert a `windows::core::Error` (Win32 HRESULT failure) into a
/// `WinclickError::WindowError`.
impl From<WindowsError> for WinclickError {
    fn from(err: WindowsError) -> Self {
        WinclickError::WindowError(format!("Win32 error: {err}"))
    }
}
