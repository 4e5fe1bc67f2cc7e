//! framegrab-capture — on-demand desktop region capture.
//!
//! Grabs a region of one display output, converts it to RGB or planar float
//! RGB, and optionally saves it as a PPM. On non-Windows targets a stub driver
//! is compiled for CI compatibility; [`SyntheticDriver`] works everywhere.
//!
//! # Pipeline
//!
//! ```text
//! CaptureDriver ──► GraphicsDevice + Duplication        (Session::init)
//!                          │  acquire_frame(timeout)    (Session::capture)
//!                          ▼
//!               AcquiredFrame { texture, accumulated_frames }
//!                          │  copy_resource → read_staging
//!                          ▼
//!               SourceFrame (BGRA) ──convert──► OutputBuffer  (Session::save)
//!                          │
//!                          ▼
//!                   Grab<'_> / PPM file                (Grabber::grab / save_ppm)
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use framegrab_capture::{GrabOptions, Grabber, RetryPolicy, SyntheticDriver};
//! use framegrab_core::{OutputFormat, Region};
//!
//! let mut grabber = Grabber::create(SyntheticDriver::default(), RetryPolicy::default())?;
//! let grab = grabber.grab(Region::new(0, 0, 640, 480), OutputFormat::Rgb, GrabOptions::default())?;
//! println!("{} bytes, {} new frames", grab.bytes().len(), grab.accumulated_frames);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod driver;
pub mod ffi;
pub mod grabber;
pub mod session;
pub mod synthetic;

pub use driver::{AcquiredFrame, CaptureDriver, Duplication, GraphicsDevice};
pub use grabber::{Grab, GrabOptions, GrabState, Grabber, RetryPolicy};
pub use session::Session;
pub use synthetic::SyntheticDriver;

// ── Platform split ─────────────────────────────────────────────────────────────

#[cfg(target_os = "windows")]
mod dxgi;
#[cfg(target_os = "windows")]
pub use dxgi::DxgiDriver as PlatformDriver;

#[cfg(not(target_os = "windows"))]
mod stub;
#[cfg(not(target_os = "windows"))]
pub use stub::StubDriver as PlatformDriver;
