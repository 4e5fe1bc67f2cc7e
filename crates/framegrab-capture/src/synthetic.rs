//! CPU-only driver producing a moving checkerboard.
//!
//! Useful for demos and CI where no desktop duplication is available. Every
//! acquisition reports one accumulated frame and shifts the pattern by one
//! pixel.

use std::cell::RefCell;
use std::time::Duration;

use framegrab_core::{CaptureError, FrameDesc, SourceFrame};
use tracing::info;

use crate::driver::{AcquiredFrame, CaptureDriver, Duplication, GraphicsDevice};

const CHECKER: u32 = 32;

#[derive(Debug, Clone)]
pub struct SyntheticDriver {
    desc: FrameDesc,
}

impl SyntheticDriver {
    pub fn new(desc: FrameDesc) -> Self {
        Self { desc }
    }
}

impl Default for SyntheticDriver {
    fn default() -> Self {
        Self::new(FrameDesc::FHD)
    }
}

pub struct SyntheticDevice;

pub struct SyntheticDuplication {
    desc:  FrameDesc,
    frame: u32,
}

/// BGRA pixels of one generated frame.
pub struct SyntheticTexture {
    desc: FrameDesc,
    data: Vec<u8>,
}

pub struct SyntheticStaging {
    desc: FrameDesc,
    data: RefCell<Vec<u8>>,
}

impl CaptureDriver for SyntheticDriver {
    type Device = SyntheticDevice;
    type Duplication = SyntheticDuplication;

    fn create_device(&mut self) -> Result<SyntheticDevice, CaptureError> {
        Ok(SyntheticDevice)
    }

    fn duplicate_output(&mut self, _device: &SyntheticDevice) -> Result<SyntheticDuplication, CaptureError> {
        if self.desc.width == 0 || self.desc.height == 0 {
            return Err(CaptureError::DuplicationInitFailed {
                reason: format!("synthetic output has no pixels ({})", self.desc),
            });
        }
        info!("Synthetic output {}", self.desc);
        Ok(SyntheticDuplication { desc: self.desc, frame: 0 })
    }
}

impl Duplication for SyntheticDuplication {
    type Texture = SyntheticTexture;

    fn acquire_frame(&mut self, _timeout: Duration) -> Result<AcquiredFrame<SyntheticTexture>, CaptureError> {
        self.frame = self.frame.wrapping_add(1);
        Ok(AcquiredFrame {
            texture: SyntheticTexture { desc: self.desc, data: checkerboard(self.desc, self.frame) },
            accumulated_frames: 1,
        })
    }

    fn release_frame(&mut self) -> Result<(), CaptureError> {
        Ok(())
    }
}

impl GraphicsDevice for SyntheticDevice {
    type Texture = SyntheticTexture;
    type Staging = SyntheticStaging;

    fn frame_desc(&self, texture: &SyntheticTexture) -> FrameDesc {
        texture.desc
    }

    fn create_staging(&self, desc: FrameDesc) -> Result<SyntheticStaging, CaptureError> {
        let len = desc.packed_pitch() * desc.height as usize;
        Ok(SyntheticStaging { desc, data: RefCell::new(vec![0; len]) })
    }

    fn copy_resource(&self, dst: &SyntheticStaging, src: &SyntheticTexture) {
        let mut data = dst.data.borrow_mut();
        let n = data.len().min(src.data.len());
        data[..n].copy_from_slice(&src.data[..n]);
    }

    fn read_staging<R>(
        &self,
        staging: &SyntheticStaging,
        read: impl FnOnce(SourceFrame<'_>) -> R,
    ) -> Result<R, CaptureError> {
        let data = staging.data.borrow();
        let src = SourceFrame::packed(&data, staging.desc)?;
        Ok(read(src))
    }
}

/// Blue/orange checkerboard shifted right by `offset` pixels.
fn checkerboard(desc: FrameDesc, offset: u32) -> Vec<u8> {
    let mut data = Vec::with_capacity(desc.packed_pitch() * desc.height as usize);
    for y in 0..desc.height {
        for x in 0..desc.width {
            let light = ((x.wrapping_add(offset) / CHECKER) + (y / CHECKER)) % 2 == 0;
            let bgra = if light { [200, 120, 40, 255] } else { [40, 100, 160, 255] };
            data.extend_from_slice(&bgra);
        }
    }
    data
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{GrabOptions, Grabber, RetryPolicy};
    use framegrab_core::{OutputFormat, Region};

    #[test]
    fn grabs_checkerboard_pixels() {
        let driver = SyntheticDriver::new(FrameDesc::new(64, 64));
        let mut grabber = Grabber::create(driver, RetryPolicy::default()).unwrap();

        let grab = grabber
            .grab(Region::new(0, 0, 64, 1), OutputFormat::Rgb, GrabOptions::default())
            .unwrap();
        let rgb = grab.rgb().expect("rgb output");

        // First frame is shifted by one: x=0..30 light, x=31 dark.
        assert_eq!(&rgb[..3], &[40, 120, 200]);
        assert_eq!(&rgb[31 * 3..32 * 3], &[160, 100, 40]);
        assert_eq!(grab.accumulated_frames, 1);
    }

    #[test]
    fn zero_sized_output_fails_to_duplicate() {
        let driver = SyntheticDriver::new(FrameDesc::new(0, 10));
        assert!(matches!(
            Grabber::create(driver, RetryPolicy::default()),
            Err(CaptureError::DuplicationInitFailed { .. })
        ));
    }
}
