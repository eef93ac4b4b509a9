//! DD vendor mouse driver binding.
//!
//! Some virtualized targets (cloud-phone emulators) ignore `SendInput`
//! events but accept input injected by the DD kernel driver.  The driver
//! ships as `dd43390.dll` next to the executable and is loaded lazily on
//! first use; the handle is cached for the process lifetime and never
//! freed.
//!
//! Exported calling convention (from the vendor's documentation):
//! `DD_btn(0)` initialises and must return 1; `DD_mov(x, y)` moves the
//! cursor to absolute pixel coordinates; `DD_btn` codes 1/2 are left
//! down/up and 4/8 are right down/up.

use parking_lot::Mutex;
use windows::core::s;
use windows::Win32::System::LibraryLoader::{GetProcAddress, LoadLibraryA};

use crate::errors::WinclickError;
use crate::input::MouseButton;

/// DLL file name, resolved through the normal library search path.
const DRIVER_DLL: &str = "dd43390.dll";

const BTN_INIT: i32 = 0;
const BTN_LEFT_DOWN: i32 = 1;
const BTN_LEFT_UP: i32 = 2;
const BTN_RIGHT_DOWN: i32 = 4;
const BTN_RIGHT_UP: i32 = 8;

type BtnFn = unsafe extern "system" fn(i32) -> i32;
type MovFn = unsafe extern "system" fn(i32, i32) -> i32;

/// Resolved entry points of a loaded DD driver.
#[derive(Clone, Copy)]
pub struct DdDriver {
    btn: BtnFn,
    mov: MovFn,
}

static DRIVER: Mutex<Option<DdDriver>> = Mutex::new(None);

impl DdDriver {
    /// Load the DLL, resolve exports, and run the initialisation
    /// handshake (`DD_btn(0)` must return 1).
    fn load() -> Result<Self, WinclickError> {
        let module = unsafe { LoadLibraryA(s!("dd43390.dll")) }
            .map_err(|e| WinclickError::DriverError(format!("load {DRIVER_DLL}: {e}")))?;

        let btn_addr = unsafe { GetProcAddress(module, s!("DD_btn")) }
            .ok_or_else(|| WinclickError::DriverError("DD_btn export missing".into()))?;
        let mov_addr = unsafe { GetProcAddress(module, s!("DD_mov")) }
            .ok_or_else(|| WinclickError::DriverError("DD_mov export missing".into()))?;

        let driver = Self {
            btn: unsafe { std::mem::transmute::<_, BtnFn>(btn_addr) },
            mov: unsafe { std::mem::transmute::<_, MovFn>(mov_addr) },
        };

        let status = unsafe { (driver.btn)(BTN_INIT) };
        if status != 1 {
            return Err(WinclickError::DriverError(format!(
                "initialisation handshake returned {status}"
            )));
        }

        log::info!("DD driver loaded and initialised");
        Ok(driver)
    }

    /// Move the cursor to absolute pixel coordinates.
    pub fn move_to(&self, x: i32, y: i32) {
        unsafe { (self.mov)(x, y) };
    }

    /// Press a mouse button.
    pub fn press(&self, button: MouseButton) {
        let code = match button {
            MouseButton::Left => BTN_LEFT_DOWN,
            MouseButton::Right => BTN_RIGHT_DOWN,
        };
        unsafe { (self.btn)(code) };
    }

    /// Release a mouse button.
    pub fn release(&self, button: MouseButton) {
        let code = match button {
            MouseButton::Left => BTN_LEFT_UP,
            MouseButton::Right => BTN_RIGHT_UP,
        };
        unsafe { (self.btn)(code) };
    }
}

/// Run `f` against the process-wide driver, loading it on first use.
///
/// Returns `Err` if the driver cannot be loaded or initialised; the
/// failure is not cached, so a later call retries the load.
pub fn with_driver<R>(f: impl FnOnce(&DdDriver) -> R) -> Result<R, WinclickError> {
    let mut slot = DRIVER.lock();
    let driver = match *slot {
        Some(driver) => driver,
        None => {
            let driver = DdDriver::load()?;
            *slot = Some(driver);
            driver
        }
    };
    Ok(f(&driver))
}
