//! Platform seams: graphics device, output duplication, and the driver that
//! creates both.

use std::time::Duration;

use framegrab_core::{CaptureError, FrameDesc, SourceFrame};

/// A frame handed out by [`Duplication::acquire_frame`].
#[derive(Debug)]
pub struct AcquiredFrame<T> {
    /// GPU-side desktop image. Dropping it releases the reference.
    pub texture: T,
    /// Desktop updates merged into this frame since the previous acquisition.
    pub accumulated_frames: u32,
}

/// A live desktop duplication session against one display output.
pub trait Duplication {
    type Texture;

    /// Block up to `timeout` for the next desktop frame.
    ///
    /// Must return [`CaptureError::Timeout`] when nothing arrived in time and
    /// [`CaptureError::CaptureFailed`] when the session is no longer usable.
    fn acquire_frame(&mut self, timeout: Duration)
        -> Result<AcquiredFrame<Self::Texture>, CaptureError>;

    /// Hand the most recently acquired frame back to the backend.
    fn release_frame(&mut self) -> Result<(), CaptureError>;
}

/// GPU device able to read desktop textures back to the CPU.
pub trait GraphicsDevice {
    type Texture;
    /// CPU-readable copy target.
    type Staging;

    fn frame_desc(&self, texture: &Self::Texture) -> FrameDesc;

    fn create_staging(&self, desc: FrameDesc) -> Result<Self::Staging, CaptureError>;

    fn copy_resource(&self, dst: &Self::Staging, src: &Self::Texture);

    /// Map `staging` for reading, run `read` over its pixels, then unmap.
    fn read_staging<R>(
        &self,
        staging: &Self::Staging,
        read: impl FnOnce(SourceFrame<'_>) -> R,
    ) -> Result<R, CaptureError>;
}

/// Creates devices and duplication sessions for one display output.
pub trait CaptureDriver {
    type Device: GraphicsDevice;
    type Duplication: Duplication<Texture = <Self::Device as GraphicsDevice>::Texture>;

    /// Fails with [`CaptureError::BackendUnavailable`].
    fn create_device(&mut self) -> Result<Self::Device, CaptureError>;

    /// Fails with [`CaptureError::DuplicationInitFailed`].
    fn duplicate_output(&mut self, device: &Self::Device) -> Result<Self::Duplication, CaptureError>;
}

pub type TextureOf<D> = <<D as CaptureDriver>::Device as GraphicsDevice>::Texture;
pub type StagingOf<D> = <<D as CaptureDriver>::Device as GraphicsDevice>::Staging;
