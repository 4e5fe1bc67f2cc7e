//! Non-Windows stub driver (CI + cross-compilation).
//!
//! Desktop duplication only exists on Windows; every session creation fails
//! with `BackendUnavailable`.

use std::time::Duration;

use framegrab_core::{CaptureError, FrameDesc, SourceFrame};

use crate::driver::{AcquiredFrame, CaptureDriver, Duplication, GraphicsDevice};

#[derive(Debug, Clone)]
pub struct StubDriver {
    output_index: u32,
}

impl StubDriver {
    pub fn new(output_index: u32) -> Self {
        Self { output_index }
    }
}

/// Never constructed.
pub enum StubDevice {}

/// Never constructed.
pub enum StubDuplication {}

impl CaptureDriver for StubDriver {
    type Device = StubDevice;
    type Duplication = StubDuplication;

    fn create_device(&mut self) -> Result<StubDevice, CaptureError> {
        tracing::warn!("Desktop duplication stub (non-Windows), output {}", self.output_index);
        Err(CaptureError::BackendUnavailable {
            reason: "desktop duplication requires Windows".into(),
        })
    }

    fn duplicate_output(&mut self, device: &StubDevice) -> Result<StubDuplication, CaptureError> {
        match *device {}
    }
}

impl Duplication for StubDuplication {
    type Texture = ();

    fn acquire_frame(&mut self, _timeout: Duration) -> Result<AcquiredFrame<()>, CaptureError> {
        match *self {}
    }

    fn release_frame(&mut self) -> Result<(), CaptureError> {
        match *self {}
    }
}

impl GraphicsDevice for StubDevice {
    type Texture = ();
    type Staging = ();

    fn frame_desc(&self, _texture: &()) -> FrameDesc {
        match *self {}
    }

    fn create_staging(&self, _desc: FrameDesc) -> Result<(), CaptureError> {
        match *self {}
    }

    fn copy_resource(&self, _dst: &(), _src: &()) {
        match *self {}
    }

    fn read_staging<R>(
        &self,
        _staging: &(),
        _read: impl FnOnce(SourceFrame<'_>) -> R,
    ) -> Result<R, CaptureError> {
        match *self {}
    }
}
