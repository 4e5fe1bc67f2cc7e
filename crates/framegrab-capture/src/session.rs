//! `Session` — owns the device, the duplication, the staging texture and the
//! output buffer for one display output.
//!
//! Field order is drop order: the held frame goes before the duplication that
//! produced it, the staging texture before the device that created it.

use std::time::Duration;

use framegrab_core::convert::convert;
use framegrab_core::{CaptureError, FrameDesc, GrabError, OutputBuffer, OutputFormat, Region};
use tracing::{debug, info, warn};

use crate::driver::{AcquiredFrame, CaptureDriver, Duplication, GraphicsDevice, StagingOf, TextureOf};

struct StagingSlot<S> {
    desc:    FrameDesc,
    texture: S,
}

pub struct Session<D: CaptureDriver> {
    held:        Option<AcquiredFrame<TextureOf<D>>>,
    duplication: Option<D::Duplication>,
    staging:     Option<StagingSlot<StagingOf<D>>>,
    device:      Option<D::Device>,
    output:      OutputBuffer,
    driver:      D,
}

impl<D: CaptureDriver> Session<D> {
    /// An uninitialized session; call [`Session::init`] before capturing.
    pub fn new(driver: D) -> Self {
        Self {
            held:        None,
            duplication: None,
            staging:     None,
            device:      None,
            output:      OutputBuffer::new(),
            driver,
        }
    }

    /// Create whichever of device and duplication is missing.
    pub fn init(&mut self) -> Result<(), CaptureError> {
        if self.device.is_none() {
            let device = self.driver.create_device()?;
            info!("Graphics device created");
            self.device = Some(device);
        }

        if self.duplication.is_none() {
            if let Some(device) = self.device.as_ref() {
                let duplication = self.driver.duplicate_output(device)?;
                info!("Desktop duplication started");
                self.duplication = Some(duplication);
            }
        }

        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.device.is_some() && self.duplication.is_some()
    }

    /// Acquire the next frame, returning its accumulated-frame count.
    ///
    /// Any previously held frame is released first.
    pub fn capture(&mut self, timeout: Duration) -> Result<u32, CaptureError> {
        self.release_held();

        let duplication = self.duplication.as_mut().ok_or_else(|| CaptureError::CaptureFailed {
            reason: "duplication not initialized".into(),
        })?;
        let frame = duplication.acquire_frame(timeout)?;
        let accumulated = frame.accumulated_frames;
        self.held = Some(frame);
        Ok(accumulated)
    }

    /// Convert the held frame into the output buffer, then release it.
    pub fn save(&mut self, region: &Region, format: OutputFormat) -> Result<(), GrabError> {
        let frame = self.held.take().ok_or(CaptureError::NoFrameHeld)?;
        let result = self.materialize(&frame.texture, region, format);
        drop(frame);
        self.release_duplication_frame();
        result
    }

    fn materialize(
        &mut self,
        texture: &TextureOf<D>,
        region: &Region,
        format: OutputFormat,
    ) -> Result<(), GrabError> {
        let device = self.device.as_ref().ok_or_else(|| CaptureError::Device {
            reason: "device not initialized".into(),
        })?;

        let desc = device.frame_desc(texture);
        region.check_within(desc)?;

        let slot = match self.staging.take() {
            Some(slot) if slot.desc == desc => slot,
            stale => {
                if let Some(old) = stale {
                    info!("Frame size changed {} → {}, recreating staging texture", old.desc, desc);
                }
                StagingSlot { desc, texture: device.create_staging(desc)? }
            }
        };
        let slot = self.staging.insert(slot);

        device.copy_resource(&slot.texture, texture);
        let output = &mut self.output;
        device.read_staging(&slot.texture, |src| convert(&src, region, format, output))??;
        Ok(())
    }

    /// Release the held frame and the duplication; with `full`, also the
    /// staging texture, the device and the output buffer.
    pub fn cleanup(&mut self, full: bool) {
        self.release_held();
        if self.duplication.take().is_some() {
            debug!("Desktop duplication released");
        }

        if full {
            self.staging = None;
            if self.device.take().is_some() {
                debug!("Graphics device released");
            }
            self.output.discard();
        }
    }

    pub fn output(&self) -> &OutputBuffer {
        &self.output
    }

    /// Forget the last converted image.
    pub fn discard_output(&mut self) {
        self.output.discard();
    }

    /// Size of the desktop as of the last conversion.
    pub fn frame_desc(&self) -> Option<FrameDesc> {
        self.staging.as_ref().map(|slot| slot.desc)
    }

    fn release_held(&mut self) {
        if self.held.take().is_some() {
            self.release_duplication_frame();
        }
    }

    fn release_duplication_frame(&mut self) {
        if let Some(duplication) = self.duplication.as_mut() {
            if let Err(e) = duplication.release_frame() {
                warn!("Releasing duplication frame failed: {}", e);
            }
        }
    }
}

impl<D: CaptureDriver> Drop for Session<D> {
    fn drop(&mut self) {
        self.cleanup(true);
    }
}
