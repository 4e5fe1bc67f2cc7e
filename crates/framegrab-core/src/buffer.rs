//! Reusable destination for converted pixels.
//!
//! Backed by `u32` words so the same allocation can be viewed as bytes (RGB)
//! or as `f32` samples (planar) without alignment hazards.

use crate::types::{OutputFormat, Region};

#[derive(Debug, Default)]
pub struct OutputBuffer {
    words:  Vec<u32>,
    len:    usize,
    format: Option<OutputFormat>,
}

impl OutputBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Size the buffer for `region` in `format`.
    ///
    /// The allocation is kept whenever the byte length is unchanged; returns
    /// `true` if a new one was made.
    pub fn prepare(&mut self, region: &Region, format: OutputFormat) -> bool {
        let len = format.output_len(region);
        let reallocated = len != self.len || self.words.is_empty();
        if reallocated {
            self.words = vec![0u32; len.div_ceil(4)];
            self.len = len;
            tracing::debug!("Output buffer reallocated: {} bytes ({})", len, format);
        }
        self.format = Some(format);
        reallocated
    }

    /// Drop the allocation; the buffer reports zero length until the next `prepare`.
    pub fn discard(&mut self) {
        self.words = Vec::new();
        self.len = 0;
        self.format = None;
    }

    pub fn format(&self) -> Option<OutputFormat> {
        self.format
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_bytes(&self) -> &[u8] {
        &bytemuck::cast_slice::<u32, u8>(&self.words)[..self.len]
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut bytemuck::cast_slice_mut::<u32, u8>(&mut self.words)[..self.len]
    }

    /// Samples of a planar buffer (`None` for other layouts).
    pub fn as_planes(&self) -> Option<&[f32]> {
        match self.format {
            Some(OutputFormat::Planar) => Some(bytemuck::cast_slice(&self.words)),
            _ => None,
        }
    }

    pub fn as_planes_mut(&mut self) -> Option<&mut [f32]> {
        match self.format {
            Some(OutputFormat::Planar) => Some(bytemuck::cast_slice_mut(&mut self.words)),
            _ => None,
        }
    }

    /// Full backing storage as `f32`, whatever the current format.
    pub(crate) fn samples_mut(&mut self) -> &mut [f32] {
        bytemuck::cast_slice_mut(&mut self.words)
    }

    /// Address of the backing allocation (stable while the length is unchanged).
    pub fn as_ptr(&self) -> *const u8 {
        self.words.as_ptr().cast()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reuses_allocation_for_same_length() {
        let mut buf = OutputBuffer::new();
        let region = Region::new(0, 0, 8, 4);
        assert!(buf.prepare(&region, OutputFormat::Rgb));
        let ptr = buf.as_ptr();
        assert!(!buf.prepare(&Region::new(5, 5, 8, 4), OutputFormat::Rgb));
        assert_eq!(buf.as_ptr(), ptr);
        assert_eq!(buf.len(), 96);
    }

    #[test]
    fn reallocates_when_length_changes() {
        let mut buf = OutputBuffer::new();
        buf.prepare(&Region::new(0, 0, 8, 4), OutputFormat::Rgb);
        assert!(buf.prepare(&Region::new(0, 0, 8, 4), OutputFormat::Planar));
        assert_eq!(buf.len(), 8 * 4 * 12);
        assert_eq!(buf.as_planes().map(<[f32]>::len), Some(8 * 4 * 3));
        assert!(buf.prepare(&Region::new(0, 0, 9, 4), OutputFormat::Planar));
    }

    #[test]
    fn rgb_length_not_multiple_of_four() {
        let mut buf = OutputBuffer::new();
        buf.prepare(&Region::new(0, 0, 1, 1), OutputFormat::Rgb);
        assert_eq!(buf.as_bytes().len(), 3);
        assert!(buf.as_planes().is_none());
    }

    #[test]
    fn discard_reports_empty() {
        let mut buf = OutputBuffer::new();
        buf.prepare(&Region::new(0, 0, 3, 3), OutputFormat::Rgb);
        buf.discard();
        assert!(buf.is_empty());
        assert!(buf.as_bytes().is_empty());
        assert_eq!(buf.format(), None);
    }
}
