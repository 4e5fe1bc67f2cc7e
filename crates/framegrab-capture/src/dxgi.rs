//! DXGI Desktop Duplication driver.
//!
//! Requires Windows 8+ and the `windows` crate with Direct3D11/DXGI features.
//!
//! # Pipeline
//!
//! ```text
//! D3D11CreateDevice (HARDWARE → WARP → REFERENCE)
//!   │  IDXGIDevice::GetAdapter → EnumOutputs(output_index)
//!   ▼
//! IDXGIOutput1::DuplicateOutput
//!   │  AcquireNextFrame(timeout) → IDXGIResource → ID3D11Texture2D
//!   ▼
//! CopyResource → staging texture (CPU read) → Map → SourceFrame
//! ```

use std::time::Duration;

use framegrab_core::{CaptureError, FrameDesc, SourceFrame};
use tracing::{debug, info};
use windows::core::Interface;
use windows::Win32::Foundation::HMODULE;
use windows::Win32::Graphics::Direct3D::{
    D3D_DRIVER_TYPE, D3D_DRIVER_TYPE_HARDWARE, D3D_DRIVER_TYPE_REFERENCE, D3D_DRIVER_TYPE_WARP,
    D3D_FEATURE_LEVEL, D3D_FEATURE_LEVEL_10_0, D3D_FEATURE_LEVEL_10_1, D3D_FEATURE_LEVEL_11_0,
    D3D_FEATURE_LEVEL_9_1,
};
use windows::Win32::Graphics::Direct3D11::{
    D3D11CreateDevice, ID3D11Device, ID3D11DeviceContext, ID3D11Texture2D,
    D3D11_CPU_ACCESS_READ, D3D11_CREATE_DEVICE_BGRA_SUPPORT, D3D11_MAPPED_SUBRESOURCE,
    D3D11_MAP_READ, D3D11_SDK_VERSION, D3D11_TEXTURE2D_DESC, D3D11_USAGE_STAGING,
};
use windows::Win32::Graphics::Dxgi::Common::{DXGI_FORMAT_B8G8R8A8_UNORM, DXGI_SAMPLE_DESC};
use windows::Win32::Graphics::Dxgi::{
    IDXGIDevice, IDXGIOutput1, IDXGIOutputDuplication, IDXGIResource, DXGI_ERROR_WAIT_TIMEOUT,
    DXGI_OUTDUPL_FRAME_INFO,
};

use crate::driver::{AcquiredFrame, CaptureDriver, Duplication, GraphicsDevice};

/// Driver types tried in order until one produces a device.
const DRIVER_TYPES: [D3D_DRIVER_TYPE; 3] = [
    D3D_DRIVER_TYPE_HARDWARE,
    D3D_DRIVER_TYPE_WARP,
    D3D_DRIVER_TYPE_REFERENCE,
];

const FEATURE_LEVELS: [D3D_FEATURE_LEVEL; 4] = [
    D3D_FEATURE_LEVEL_11_0,
    D3D_FEATURE_LEVEL_10_1,
    D3D_FEATURE_LEVEL_10_0,
    D3D_FEATURE_LEVEL_9_1,
];

// ── Driver ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct DxgiDriver {
    output_index: u32,
}

impl DxgiDriver {
    pub fn new(output_index: u32) -> Self {
        Self { output_index }
    }
}

impl CaptureDriver for DxgiDriver {
    type Device = DxgiDevice;
    type Duplication = DxgiDuplication;

    fn create_device(&mut self) -> Result<DxgiDevice, CaptureError> {
        let mut last_error = String::from("no driver type tried");

        for driver_type in DRIVER_TYPES {
            let mut device: Option<ID3D11Device> = None;
            let mut context: Option<ID3D11DeviceContext> = None;
            let created = unsafe {
                D3D11CreateDevice(
                    None,
                    driver_type,
                    HMODULE::default(),
                    D3D11_CREATE_DEVICE_BGRA_SUPPORT,
                    Some(&FEATURE_LEVELS[..]),
                    D3D11_SDK_VERSION,
                    Some(&mut device),
                    None,
                    Some(&mut context),
                )
            };
            match (created, device, context) {
                (Ok(()), Some(device), Some(context)) => {
                    info!("D3D11 device created (driver type {:?})", driver_type);
                    return Ok(DxgiDevice { device, context });
                }
                (Err(e), _, _) => {
                    debug!("D3D11CreateDevice {:?} failed: {}", driver_type, e);
                    last_error = e.to_string();
                }
                _ => last_error = format!("{driver_type:?} returned no device"),
            }
        }

        Err(CaptureError::BackendUnavailable { reason: last_error })
    }

    fn duplicate_output(&mut self, device: &DxgiDevice) -> Result<DxgiDuplication, CaptureError> {
        let init_failed = |step: &str, e: windows::core::Error| CaptureError::DuplicationInitFailed {
            reason: format!("{step}: {e}"),
        };

        let dxgi_device: IDXGIDevice = device.device.cast().map_err(|e| init_failed("cast IDXGIDevice", e))?;
        let adapter = unsafe { dxgi_device.GetAdapter() }.map_err(|e| init_failed("GetAdapter", e))?;
        let output = unsafe { adapter.EnumOutputs(self.output_index) }
            .map_err(|e| init_failed(&format!("EnumOutputs({})", self.output_index), e))?;
        let output1: IDXGIOutput1 = output.cast().map_err(|e| init_failed("cast IDXGIOutput1", e))?;
        let duplication = unsafe { output1.DuplicateOutput(&device.device) }
            .map_err(|e| init_failed("DuplicateOutput", e))?;

        info!("Duplicating DXGI output {}", self.output_index);
        Ok(DxgiDuplication { duplication, holding: false })
    }
}

// ── Device ────────────────────────────────────────────────────────────────────

pub struct DxgiDevice {
    device:  ID3D11Device,
    context: ID3D11DeviceContext,
}

impl GraphicsDevice for DxgiDevice {
    type Texture = ID3D11Texture2D;
    type Staging = ID3D11Texture2D;

    fn frame_desc(&self, texture: &ID3D11Texture2D) -> FrameDesc {
        let mut desc = D3D11_TEXTURE2D_DESC::default();
        unsafe { texture.GetDesc(&mut desc) };
        FrameDesc::new(desc.Width, desc.Height)
    }

    /// CPU-readable staging texture matching (w×h, BGRA8).
    fn create_staging(&self, frame: FrameDesc) -> Result<ID3D11Texture2D, CaptureError> {
        let desc = D3D11_TEXTURE2D_DESC {
            Width:          frame.width,
            Height:         frame.height,
            MipLevels:      1,
            ArraySize:      1,
            Format:         DXGI_FORMAT_B8G8R8A8_UNORM,
            SampleDesc:     DXGI_SAMPLE_DESC { Count: 1, Quality: 0 },
            Usage:          D3D11_USAGE_STAGING,
            BindFlags:      0,
            CPUAccessFlags: D3D11_CPU_ACCESS_READ.0 as u32,
            MiscFlags:      0,
        };
        let mut texture: Option<ID3D11Texture2D> = None;
        unsafe { self.device.CreateTexture2D(&desc, None, Some(&mut texture)) }
            .map_err(|e| CaptureError::Device { reason: format!("CreateTexture2D staging: {e}") })?;
        texture.ok_or_else(|| CaptureError::Device { reason: "CreateTexture2D returned no texture".into() })
    }

    fn copy_resource(&self, dst: &ID3D11Texture2D, src: &ID3D11Texture2D) {
        unsafe { self.context.CopyResource(dst, src) };
    }

    fn read_staging<R>(
        &self,
        staging: &ID3D11Texture2D,
        read: impl FnOnce(SourceFrame<'_>) -> R,
    ) -> Result<R, CaptureError> {
        let desc = self.frame_desc(staging);
        let mut mapped = D3D11_MAPPED_SUBRESOURCE::default();
        unsafe { self.context.Map(staging, 0, D3D11_MAP_READ, 0, Some(&mut mapped)) }
            .map_err(|e| CaptureError::Device { reason: format!("Map staging: {e}") })?;

        let row_pitch = mapped.RowPitch as usize;
        let len = row_pitch * desc.height as usize;
        // Valid until Unmap below.
        let data = unsafe { std::slice::from_raw_parts(mapped.pData as *const u8, len) };
        let result = SourceFrame::new(data, desc, row_pitch).map(read);

        unsafe { self.context.Unmap(staging, 0) };
        result
    }
}

// ── Duplication ───────────────────────────────────────────────────────────────

pub struct DxgiDuplication {
    duplication: IDXGIOutputDuplication,
    /// A frame is acquired and not yet released.
    holding: bool,
}

impl Duplication for DxgiDuplication {
    type Texture = ID3D11Texture2D;

    fn acquire_frame(&mut self, timeout: Duration) -> Result<AcquiredFrame<ID3D11Texture2D>, CaptureError> {
        self.release_frame()?;

        let ms = timeout.as_millis().min(u32::MAX as u128) as u32;
        let mut info = DXGI_OUTDUPL_FRAME_INFO::default();
        let mut resource: Option<IDXGIResource> = None;
        match unsafe { self.duplication.AcquireNextFrame(ms, &mut info, &mut resource) } {
            Ok(()) => {}
            Err(e) if e.code() == DXGI_ERROR_WAIT_TIMEOUT => {
                return Err(CaptureError::Timeout { ms: ms as u64 });
            }
            Err(e) => {
                return Err(CaptureError::CaptureFailed { reason: format!("AcquireNextFrame: {e}") });
            }
        }
        self.holding = true;

        let texture = resource
            .ok_or_else(|| CaptureError::CaptureFailed { reason: "AcquireNextFrame returned no resource".into() })?
            .cast::<ID3D11Texture2D>()
            .map_err(|e| CaptureError::CaptureFailed { reason: format!("cast ID3D11Texture2D: {e}") })?;

        Ok(AcquiredFrame { texture, accumulated_frames: info.AccumulatedFrames })
    }

    fn release_frame(&mut self) -> Result<(), CaptureError> {
        if self.holding {
            self.holding = false;
            unsafe { self.duplication.ReleaseFrame() }
                .map_err(|e| CaptureError::CaptureFailed { reason: format!("ReleaseFrame: {e}") })?;
        }
        Ok(())
    }
}

impl Drop for DxgiDuplication {
    fn drop(&mut self) {
        let _ = self.release_frame();
    }
}
