use serde::{Deserialize, Serialize};

use crate::errors::{CaptureError, GrabError};

/// Bytes per source pixel (B, G, R, A).
pub const SOURCE_BYTES_PER_PIXEL: usize = 4;

// MARK: - Region

/// Rectangle in source framebuffer coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Whole-frame region for a display of the given size.
    pub fn full(desc: FrameDesc) -> Self {
        Self::new(0, 0, desc.width, desc.height)
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Rejects zero-sized regions.
    pub fn check_size(&self) -> Result<(), GrabError> {
        if self.is_empty() {
            return Err(GrabError::InvalidRegion {
                region: *self,
                reason: "width and height must be non-zero".into(),
            });
        }
        Ok(())
    }

    /// Rejects regions that are empty or reach past the frame edges.
    pub fn check_within(&self, desc: FrameDesc) -> Result<(), GrabError> {
        self.check_size()?;
        let right = self.x as u64 + self.width as u64;
        let bottom = self.y as u64 + self.height as u64;
        if right > desc.width as u64 || bottom > desc.height as u64 {
            return Err(GrabError::InvalidRegion {
                region: *self,
                reason: format!("extends past the {desc} source frame"),
            });
        }
        Ok(())
    }
}

impl std::fmt::Display for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}×{}+{}+{}", self.width, self.height, self.x, self.y)
    }
}

impl std::str::FromStr for Region {
    type Err = String;

    /// Parses `x,y,w,h`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if parts.len() != 4 {
            return Err("region must be x,y,w,h".to_string());
        }
        let field = |i: usize, name: &str| {
            parts[i]
                .parse::<u32>()
                .map_err(|_| format!("invalid {name}: {:?}", parts[i]))
        };
        Ok(Self::new(field(0, "x")?, field(1, "y")?, field(2, "w")?, field(3, "h")?))
    }
}

// MARK: - OutputFormat

/// Pixel layout produced by a grab.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Interleaved 8-bit R, G, B.
    Rgb,
    /// Three contiguous `f32` planes (R, G, B) normalized to `[0, 1]`.
    #[serde(alias = "planarFloatRgb", alias = "darknet")]
    Planar,
}

impl OutputFormat {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            Self::Rgb => 3,
            Self::Planar => 3 * std::mem::size_of::<f32>(),
        }
    }

    /// Integer code used at the C boundary.
    pub fn code(self) -> i32 {
        match self {
            Self::Rgb => 0,
            Self::Planar => 1,
        }
    }

    pub fn output_len(self, region: &Region) -> usize {
        region.pixel_count() * self.bytes_per_pixel()
    }
}

impl TryFrom<i32> for OutputFormat {
    type Error = GrabError;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Self::Rgb),
            1 => Ok(Self::Planar),
            _ => Err(GrabError::UnsupportedFormat { code }),
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "rgb" | "0" => Ok(Self::Rgb),
            "planar" | "darknet" | "1" => Ok(Self::Planar),
            other => Err(format!("unknown format {other:?} (expected rgb or planar)")),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rgb => write!(f, "RGB"),
            Self::Planar => write!(f, "planar float RGB"),
        }
    }
}

// MARK: - FrameDesc

/// Dimensions of a captured desktop frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FrameDesc {
    pub width: u32,
    pub height: u32,
}

impl FrameDesc {
    pub const FHD: Self = Self { width: 1920, height: 1080 };

    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Tightly packed BGRA row length in bytes.
    pub fn packed_pitch(&self) -> usize {
        self.width as usize * SOURCE_BYTES_PER_PIXEL
    }
}

impl std::fmt::Display for FrameDesc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}×{}", self.width, self.height)
    }
}

// MARK: - SourceFrame

/// CPU-mapped BGRA framebuffer.
///
/// `row_pitch` is the distance in bytes between the starts of two rows and
/// may exceed `width * 4` when the driver pads rows.
#[derive(Debug, Clone, Copy)]
pub struct SourceFrame<'a> {
    data: &'a [u8],
    desc: FrameDesc,
    row_pitch: usize,
}

impl<'a> SourceFrame<'a> {
    pub fn new(data: &'a [u8], desc: FrameDesc, row_pitch: usize) -> Result<Self, CaptureError> {
        let packed = desc.packed_pitch();
        if row_pitch < packed {
            return Err(CaptureError::Device {
                reason: format!("row pitch {row_pitch} shorter than {packed} bytes of pixels"),
            });
        }
        let needed = match desc.height as usize {
            0 => 0,
            rows => row_pitch * (rows - 1) + packed,
        };
        if data.len() < needed {
            return Err(CaptureError::Device {
                reason: format!(
                    "mapped frame holds {} bytes, {desc} at pitch {row_pitch} needs {needed}",
                    data.len()
                ),
            });
        }
        Ok(Self { data, desc, row_pitch })
    }

    /// Frame without row padding.
    pub fn packed(data: &'a [u8], desc: FrameDesc) -> Result<Self, CaptureError> {
        Self::new(data, desc, desc.packed_pitch())
    }

    pub fn desc(&self) -> FrameDesc {
        self.desc
    }

    pub fn row_pitch(&self) -> usize {
        self.row_pitch
    }

    /// BGRA bytes of `width` pixels starting at (`x`, `y`).
    pub(crate) fn row(&self, x: u32, y: u32, width: u32) -> &'a [u8] {
        let start = y as usize * self.row_pitch + x as usize * SOURCE_BYTES_PER_PIXEL;
        &self.data[start..start + width as usize * SOURCE_BYTES_PER_PIXEL]
    }
}
