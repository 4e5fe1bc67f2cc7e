//! Scripted capture driver shared by the integration tests.
//!
//! Pixel (x, y) of every mock frame is BGRA `[x, y, 0x80, 0xFF]`.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

use framegrab_capture::{AcquiredFrame, CaptureDriver, Duplication, GraphicsDevice, Grabber, RetryPolicy};
use framegrab_core::{CaptureError, FrameDesc, SourceFrame};

/// Outcome of one `acquire_frame` call.
#[derive(Debug, Clone, Copy)]
pub enum Step {
    Frame(u32),
    Timeout,
    Fail,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Calls {
    pub create_device:     u32,
    pub duplicate_output:  u32,
    pub acquire:           u32,
    pub release_frame:     u32,
    pub staging_created:   u32,
    pub devices_dropped:   u32,
    pub duplications_dropped: u32,
    pub textures_dropped:  u32,
}

pub struct Script {
    pub desc: FrameDesc,
    /// Consumed front to back; once empty every acquisition yields `Frame(1)`.
    pub steps: VecDeque<Step>,
    pub fail_device: bool,
    /// Number of upcoming `duplicate_output` calls that fail.
    pub fail_duplication: u32,
    pub calls: Calls,
}

impl Script {
    pub fn new(desc: FrameDesc) -> Self {
        Self {
            desc,
            steps: VecDeque::new(),
            fail_device: false,
            fail_duplication: 0,
            calls: Calls::default(),
        }
    }

    pub fn with_steps(mut self, steps: impl IntoIterator<Item = Step>) -> Self {
        self.steps.extend(steps);
        self
    }
}

pub type Shared = Rc<RefCell<Script>>;

pub struct MockDriver(pub Shared);
pub struct MockDevice(Shared);
pub struct MockDuplication(Shared);

pub struct MockTexture {
    desc:   FrameDesc,
    data:   Vec<u8>,
    script: Shared,
}

pub struct MockStaging {
    desc: FrameDesc,
    data: RefCell<Vec<u8>>,
}

/// Grabber over a fresh script, plus the handle to inspect it.
pub fn grabber(script: Script) -> (Grabber<MockDriver>, Shared) {
    grabber_with(script, RetryPolicy::default())
}

pub fn grabber_with(script: Script, policy: RetryPolicy) -> (Grabber<MockDriver>, Shared) {
    let shared = Rc::new(RefCell::new(script));
    let grabber = Grabber::create(MockDriver(Rc::clone(&shared)), policy).expect("mock grabber");
    (grabber, shared)
}

pub fn calls(shared: &Shared) -> Calls {
    shared.borrow().calls
}

/// Expected RGB bytes for a region of a mock frame.
pub fn expected_rgb(x: u32, y: u32, w: u32, h: u32) -> Vec<u8> {
    let mut out = Vec::new();
    for py in y..y + h {
        for px in x..x + w {
            out.extend_from_slice(&[0x80, py as u8, px as u8]);
        }
    }
    out
}

fn pattern(desc: FrameDesc) -> Vec<u8> {
    let mut data = Vec::with_capacity(desc.packed_pitch() * desc.height as usize);
    for y in 0..desc.height {
        for x in 0..desc.width {
            data.extend_from_slice(&[x as u8, y as u8, 0x80, 0xFF]);
        }
    }
    data
}

impl CaptureDriver for MockDriver {
    type Device = MockDevice;
    type Duplication = MockDuplication;

    fn create_device(&mut self) -> Result<MockDevice, CaptureError> {
        let mut script = self.0.borrow_mut();
        script.calls.create_device += 1;
        if script.fail_device {
            return Err(CaptureError::BackendUnavailable { reason: "scripted".into() });
        }
        Ok(MockDevice(Rc::clone(&self.0)))
    }

    fn duplicate_output(&mut self, _device: &MockDevice) -> Result<MockDuplication, CaptureError> {
        let mut script = self.0.borrow_mut();
        script.calls.duplicate_output += 1;
        if script.fail_duplication > 0 {
            script.fail_duplication -= 1;
            return Err(CaptureError::DuplicationInitFailed { reason: "scripted".into() });
        }
        Ok(MockDuplication(Rc::clone(&self.0)))
    }
}

impl Duplication for MockDuplication {
    type Texture = MockTexture;

    fn acquire_frame(&mut self, timeout: Duration) -> Result<AcquiredFrame<MockTexture>, CaptureError> {
        let mut script = self.0.borrow_mut();
        script.calls.acquire += 1;
        match script.steps.pop_front().unwrap_or(Step::Frame(1)) {
            Step::Frame(accumulated_frames) => {
                let desc = script.desc;
                Ok(AcquiredFrame {
                    texture: MockTexture { desc, data: pattern(desc), script: Rc::clone(&self.0) },
                    accumulated_frames,
                })
            }
            Step::Timeout => Err(CaptureError::Timeout { ms: timeout.as_millis() as u64 }),
            Step::Fail => Err(CaptureError::CaptureFailed { reason: "access lost".into() }),
        }
    }

    fn release_frame(&mut self) -> Result<(), CaptureError> {
        self.0.borrow_mut().calls.release_frame += 1;
        Ok(())
    }
}

impl GraphicsDevice for MockDevice {
    type Texture = MockTexture;
    type Staging = MockStaging;

    fn frame_desc(&self, texture: &MockTexture) -> FrameDesc {
        texture.desc
    }

    fn create_staging(&self, desc: FrameDesc) -> Result<MockStaging, CaptureError> {
        self.0.borrow_mut().calls.staging_created += 1;
        Ok(MockStaging {
            desc,
            data: RefCell::new(vec![0; desc.packed_pitch() * desc.height as usize]),
        })
    }

    fn copy_resource(&self, dst: &MockStaging, src: &MockTexture) {
        dst.data.borrow_mut().copy_from_slice(&src.data);
    }

    fn read_staging<R>(
        &self,
        staging: &MockStaging,
        read: impl FnOnce(SourceFrame<'_>) -> R,
    ) -> Result<R, CaptureError> {
        let data = staging.data.borrow();
        Ok(read(SourceFrame::packed(&data, staging.desc)?))
    }
}

impl Drop for MockDevice {
    fn drop(&mut self) {
        self.0.borrow_mut().calls.devices_dropped += 1;
    }
}

impl Drop for MockDuplication {
    fn drop(&mut self) {
        self.0.borrow_mut().calls.duplications_dropped += 1;
    }
}

impl Drop for MockTexture {
    fn drop(&mut self) {
        self.script.borrow_mut().calls.textures_dropped += 1;
    }
}
