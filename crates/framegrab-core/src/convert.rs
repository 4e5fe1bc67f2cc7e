//! BGRA framebuffer → caller layouts.
//!
//! ```text
//! source  [B G R A][B G R A] ...          (row_pitch bytes per row)
//! Rgb     [R G B][R G B] ...              (u8, interleaved)
//! Planar  [R R R ...][G G G ...][B B B ...]  (f32, byte / 255)
//! ```

use crate::buffer::OutputBuffer;
use crate::errors::GrabError;
use crate::types::{OutputFormat, Region, SourceFrame, SOURCE_BYTES_PER_PIXEL};

/// Convert `region` of `src` into `out`.
///
/// The region must lie entirely inside the source frame. `out` is resized
/// (reusing its allocation where possible) and fully overwritten.
pub fn convert(
    src: &SourceFrame<'_>,
    region: &Region,
    format: OutputFormat,
    out: &mut OutputBuffer,
) -> Result<(), GrabError> {
    region.check_within(src.desc())?;
    out.prepare(region, format);
    match format {
        OutputFormat::Rgb => to_rgb(src, region, out.as_bytes_mut()),
        OutputFormat::Planar => to_planar(src, region, out.samples_mut()),
    }
    Ok(())
}

fn to_rgb(src: &SourceFrame<'_>, region: &Region, out: &mut [u8]) {
    let row_len = region.width as usize * 3;
    for (dy, dst_row) in out.chunks_exact_mut(row_len).enumerate() {
        let src_row = src.row(region.x, region.y + dy as u32, region.width);
        for (px, dst) in src_row
            .chunks_exact(SOURCE_BYTES_PER_PIXEL)
            .zip(dst_row.chunks_exact_mut(3))
        {
            dst[0] = px[2];
            dst[1] = px[1];
            dst[2] = px[0];
        }
    }
}

fn to_planar(src: &SourceFrame<'_>, region: &Region, out: &mut [f32]) {
    let plane_len = region.pixel_count();
    let row_len = region.width as usize;
    for (c, plane) in out.chunks_exact_mut(plane_len).take(3).enumerate() {
        // Planes are R, G, B; the source stores B, G, R.
        let offset = 2 - c;
        for (dy, dst_row) in plane.chunks_exact_mut(row_len).enumerate() {
            let src_row = src.row(region.x, region.y + dy as u32, region.width);
            for (px, dst) in src_row.chunks_exact(SOURCE_BYTES_PER_PIXEL).zip(dst_row) {
                *dst = px[offset] as f32 / 255.0;
            }
        }
    }
}
