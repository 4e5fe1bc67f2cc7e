//! Binary portable pixmap (P6) export.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Write interleaved RGB as a P6 image: `P6\n<w> <h>\n255\n` then raw triples.
pub fn write_ppm<W: Write>(mut writer: W, width: u32, height: u32, rgb: &[u8]) -> io::Result<()> {
    let expected = width as usize * height as usize * 3;
    if rgb.len() != expected {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{width}×{height} RGB image needs {expected} bytes, got {}", rgb.len()),
        ));
    }
    write!(writer, "P6\n{width} {height}\n255\n")?;
    writer.write_all(rgb)?;
    writer.flush()
}

/// Create (or truncate) `path` and write the image into it.
pub fn save_ppm(path: impl AsRef<Path>, width: u32, height: u32, rgb: &[u8]) -> io::Result<()> {
    let file = File::create(path.as_ref())?;
    write_ppm(BufWriter::new(file), width, height, rgb)?;
    tracing::debug!("Wrote {}×{} PPM to {}", width, height, path.as_ref().display());
    Ok(())
}
