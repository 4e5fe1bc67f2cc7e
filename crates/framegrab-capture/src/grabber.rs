//! `Grabber` — the public "grab a frame" operation on top of a [`Session`].
//!
//! # State machine
//!
//! ```text
//! Idle ──validate──► Capturing ──frame──► Converting ──► Grab<'_>
//!                     │  ▲   │
//!          failure    │  │   └─ wait && accumulated == 0 → Capturing
//!   (budget left)     ▼  │
//!                    Recovering   cleanup(partial) + init
//! ```
//!
//! Timeouts end the grab immediately. Other capture failures trigger at most
//! `RetryPolicy::max_recoveries` recoveries per grab.

use std::path::Path;
use std::time::Duration;

use framegrab_core::{
    ppm, CaptureError, FrameDesc, GrabConfig, GrabError, OutputBuffer, OutputFormat, Region,
};
use tracing::{debug, info, trace, warn};

use crate::driver::CaptureDriver;
use crate::session::Session;
use crate::PlatformDriver;

// ── Public types ──────────────────────────────────────────────────────────────

/// How many times one grab may rebuild a failed duplication.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_recoveries: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_recoveries: 1 }
    }
}

/// Per-call grab options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GrabOptions {
    /// Longest a single capture may block.
    pub timeout: Duration,
    /// Keep capturing until the backend reports new content.
    pub wait: bool,
}

impl Default for GrabOptions {
    fn default() -> Self {
        Self { timeout: Duration::from_millis(100), wait: false }
    }
}

impl From<&GrabConfig> for GrabOptions {
    fn from(cfg: &GrabConfig) -> Self {
        Self { timeout: cfg.timeout(), wait: cfg.wait_for_change }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrabState {
    Idle,
    Capturing,
    Recovering,
    Converting { accumulated_frames: u32 },
}

/// A converted frame, borrowed from the grabber's output buffer.
///
/// Valid until the next call that mutates the grabber.
#[derive(Debug, Clone, Copy)]
pub struct Grab<'a> {
    pub accumulated_frames: u32,
    pub region: Region,
    pub format: OutputFormat,
    buffer: &'a OutputBuffer,
}

impl<'a> Grab<'a> {
    /// Raw output bytes (`f32` samples in native byte order for planar).
    pub fn bytes(&self) -> &'a [u8] {
        self.buffer.as_bytes()
    }

    pub fn rgb(&self) -> Option<&'a [u8]> {
        (self.format == OutputFormat::Rgb).then(|| self.buffer.as_bytes())
    }

    pub fn planes(&self) -> Option<&'a [f32]> {
        self.buffer.as_planes()
    }

    pub fn as_ptr(&self) -> *const u8 {
        self.buffer.as_ptr()
    }

    pub fn to_vec(&self) -> Vec<u8> {
        self.bytes().to_vec()
    }
}

// ── Grabber ───────────────────────────────────────────────────────────────────

pub struct Grabber<D: CaptureDriver> {
    session: Session<D>,
    policy:  RetryPolicy,
}

impl<D: CaptureDriver> Grabber<D> {
    /// Initialize a session on `driver`.
    pub fn create(driver: D, policy: RetryPolicy) -> Result<Self, CaptureError> {
        let mut session = Session::new(driver);
        session.init()?;
        info!("Grabber ready (max {} recoveries per grab)", policy.max_recoveries);
        Ok(Self { session, policy })
    }

    pub fn from_config(driver: D, cfg: &GrabConfig) -> Result<Self, CaptureError> {
        Self::create(driver, RetryPolicy { max_recoveries: cfg.max_recoveries })
    }

    /// Capture the desktop and convert `region` into `format`.
    pub fn grab(
        &mut self,
        region: Region,
        format: OutputFormat,
        options: GrabOptions,
    ) -> Result<Grab<'_>, GrabError> {
        let mut recoveries_left = self.policy.max_recoveries;
        let mut state = GrabState::Idle;

        let accumulated_frames = loop {
            let next = match state {
                GrabState::Idle => {
                    region.check_size()?;
                    GrabState::Capturing
                }
                GrabState::Capturing => match self.session.capture(options.timeout) {
                    Ok(0) if options.wait => {
                        trace!("No new desktop content, capturing again");
                        GrabState::Capturing
                    }
                    Ok(frames) => GrabState::Converting { accumulated_frames: frames },
                    Err(CaptureError::Timeout { ms }) => return Err(GrabError::Timeout { ms }),
                    Err(e) if recoveries_left > 0 => {
                        recoveries_left -= 1;
                        warn!("Capture failed ({}), recreating duplication", e);
                        GrabState::Recovering
                    }
                    Err(e) => return Err(e.into()),
                },
                GrabState::Recovering => {
                    self.session.cleanup(false);
                    self.session.init().map_err(GrabError::ReinitFailure)?;
                    GrabState::Capturing
                }
                GrabState::Converting { accumulated_frames } => {
                    self.session.save(&region, format)?;
                    break accumulated_frames;
                }
            };
            if next != state {
                debug!("Grab {:?} → {:?}", state, next);
            }
            state = next;
        };

        Ok(Grab {
            accumulated_frames,
            region,
            format,
            buffer: self.session.output(),
        })
    }

    /// [`Grabber::grab`] with the integer format code of the C interface.
    ///
    /// Unknown codes discard the output buffer and return
    /// [`GrabError::UnsupportedFormat`].
    pub fn grab_code(
        &mut self,
        region: Region,
        code: i32,
        options: GrabOptions,
    ) -> Result<Grab<'_>, GrabError> {
        match OutputFormat::try_from(code) {
            Ok(format) => self.grab(region, format, options),
            Err(e) => {
                self.session.discard_output();
                Err(e)
            }
        }
    }

    /// Wait for a changed frame and write `region` to `path` as a P6 pixmap.
    ///
    /// Only [`OutputFormat::Rgb`] can be exported; other formats fail without
    /// capturing or touching the file system.
    pub fn save_ppm(
        &mut self,
        region: Region,
        format: OutputFormat,
        timeout: Duration,
        path: impl AsRef<Path>,
    ) -> Result<u32, GrabError> {
        if format != OutputFormat::Rgb {
            return Err(GrabError::UnsupportedFormat { code: format.code() });
        }
        let grab = self.grab(region, format, GrabOptions { timeout, wait: true })?;
        ppm::save_ppm(path.as_ref(), region.width, region.height, grab.bytes())?;
        info!("Saved {} to {}", region, path.as_ref().display());
        Ok(grab.accumulated_frames)
    }

    pub fn init(&mut self) -> Result<(), CaptureError> {
        self.session.init()
    }

    pub fn cleanup(&mut self, full: bool) {
        self.session.cleanup(full);
    }

    /// Tear everything down and start over.
    pub fn reset(&mut self) -> Result<(), CaptureError> {
        self.session.cleanup(true);
        self.session.init()
    }

    pub fn is_initialized(&self) -> bool {
        self.session.is_initialized()
    }

    pub fn output(&self) -> &OutputBuffer {
        self.session.output()
    }

    pub fn frame_desc(&self) -> Option<FrameDesc> {
        self.session.frame_desc()
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }
}

impl Grabber<PlatformDriver> {
    /// Primary display output on the platform driver, default retry policy.
    pub fn open_default() -> Result<Self, CaptureError> {
        Self::create(PlatformDriver::new(0), RetryPolicy::default())
    }
}
