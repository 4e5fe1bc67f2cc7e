//! C interface.
//!
//! ```c
//! typedef struct FrameGrabber FrameGrabber;
//! FrameGrabber*  framegrab_create(void);
//! void           framegrab_release(FrameGrabber*);
//! const uint8_t* framegrab_grab(FrameGrabber*, int x, int y, int w, int h,
//!                               int format, int timeout_ms, bool wait, int* frames);
//! bool           framegrab_save(FrameGrabber*, int x, int y, int w, int h,
//!                               int format, int timeout_ms, const char* path);
//! ```
//!
//! `format` is 0 for RGB (24-bit) and 1 for planar float RGB (96-bit). The
//! pointer returned by `framegrab_grab` is owned by the grabber and stays
//! valid until the next call on the same handle. Errors are logged and
//! collapse to NULL / false.

use std::ffi::{c_char, c_int, CStr};
use std::ptr;
use std::time::Duration;

use framegrab_core::{GrabError, OutputFormat, Region};
use tracing::error;

use crate::driver::CaptureDriver;
use crate::grabber::{GrabOptions, Grabber};
use crate::PlatformDriver;

/// Opaque handle given to C callers.
pub struct FrameGrabber(Grabber<PlatformDriver>);

#[no_mangle]
pub extern "C" fn framegrab_create() -> *mut FrameGrabber {
    match Grabber::open_default() {
        Ok(grabber) => Box::into_raw(Box::new(FrameGrabber(grabber))),
        Err(e) => {
            error!("framegrab_create: {}", e);
            ptr::null_mut()
        }
    }
}

/// # Safety
/// `grabber` must be NULL or a handle from `framegrab_create` not yet released.
#[no_mangle]
pub unsafe extern "C" fn framegrab_release(grabber: *mut FrameGrabber) {
    if !grabber.is_null() {
        drop(unsafe { Box::from_raw(grabber) });
    }
}

/// # Safety
/// `grabber` must be NULL or a live handle; `frames` must be NULL or writable.
#[no_mangle]
pub unsafe extern "C" fn framegrab_grab(
    grabber: *mut FrameGrabber,
    x: c_int,
    y: c_int,
    width: c_int,
    height: c_int,
    format: c_int,
    timeout_ms: c_int,
    wait: bool,
    frames: *mut c_int,
) -> *const u8 {
    let mut accumulated: c_int = 0;
    let data = match unsafe { grabber.as_mut() } {
        Some(FrameGrabber(grabber)) => {
            grab_raw(grabber, [x, y, width, height], format, timeout_ms, wait, &mut accumulated)
        }
        None => ptr::null(),
    };
    if let Some(frames) = unsafe { frames.as_mut() } {
        *frames = accumulated;
    }
    data
}

/// # Safety
/// `grabber` must be NULL or a live handle; `path` must be NULL or a
/// NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn framegrab_save(
    grabber: *mut FrameGrabber,
    x: c_int,
    y: c_int,
    width: c_int,
    height: c_int,
    format: c_int,
    timeout_ms: c_int,
    path: *const c_char,
) -> bool {
    let Some(FrameGrabber(grabber)) = (unsafe { grabber.as_mut() }) else {
        return false;
    };
    if path.is_null() {
        return false;
    }
    let path = match unsafe { CStr::from_ptr(path) }.to_str() {
        Ok(path) => path,
        Err(e) => {
            error!("framegrab_save: path is not UTF-8: {}", e);
            return false;
        }
    };
    save_raw(grabber, [x, y, width, height], format, timeout_ms, path)
}

// ── Safe cores (generic over the driver for testing) ─────────────────────────

fn region_from(rect: [c_int; 4]) -> Result<Region, GrabError> {
    let [x, y, w, h] = rect.map(|v| u32::try_from(v).unwrap_or(0));
    let region = Region::new(x, y, w, h);
    if rect.iter().any(|&v| v < 0) {
        return Err(GrabError::InvalidRegion { region, reason: "negative coordinate or size".into() });
    }
    Ok(region)
}

fn timeout_from(ms: c_int) -> Duration {
    Duration::from_millis(ms.max(0) as u64)
}

pub(crate) fn grab_raw<D: CaptureDriver>(
    grabber: &mut Grabber<D>,
    rect: [c_int; 4],
    format: c_int,
    timeout_ms: c_int,
    wait: bool,
    frames: &mut c_int,
) -> *const u8 {
    *frames = 0;
    let options = GrabOptions { timeout: timeout_from(timeout_ms), wait };
    let result = region_from(rect).and_then(|region| grabber.grab_code(region, format, options));
    match result {
        Ok(grab) => {
            *frames = c_int::try_from(grab.accumulated_frames).unwrap_or(c_int::MAX);
            grab.as_ptr()
        }
        Err(e) => {
            if !e.is_retryable() {
                error!("framegrab_grab: {}", e);
            }
            ptr::null()
        }
    }
}

pub(crate) fn save_raw<D: CaptureDriver>(
    grabber: &mut Grabber<D>,
    rect: [c_int; 4],
    format: c_int,
    timeout_ms: c_int,
    path: &str,
) -> bool {
    let result = region_from(rect).and_then(|region| {
        let format = OutputFormat::try_from(format)?;
        grabber.save_ppm(region, format, timeout_from(timeout_ms), path)
    });
    match result {
        Ok(_) => true,
        Err(e) => {
            error!("framegrab_save: {}", e);
            false
        }
    }
}
