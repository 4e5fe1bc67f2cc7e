//! framegrab — capture a desktop region from the command line.
//!
//! ```text
//! framegrab --region 0,0,640,480 --out shot.ppm
//! framegrab --region 100,100,416,416 --format planar --out tensor.bin --count 10 --wait
//! framegrab --synthetic --region 0,0,64,64 --out pattern.ppm
//! ```
//!
//! RGB grabs are written as P6 pixmaps, planar grabs as raw little-endian
//! `f32` planes (R, G, B). With `--count` above one, output names get a
//! `-NNNN` suffix before the extension.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use framegrab_capture::{CaptureDriver, Grab, GrabOptions, Grabber, PlatformDriver, SyntheticDriver};
use framegrab_core::{ppm, FrameDesc, GrabConfig, OutputFormat, Region};
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "framegrab")]
#[command(about = "Capture a desktop region to PPM or planar float RGB")]
#[command(version)]
struct Cli {
    /// Region to capture (x,y,w,h)
    #[arg(long)]
    region: Region,

    /// Output layout: rgb or planar
    #[arg(long)]
    format: Option<OutputFormat>,

    /// Output file
    #[arg(short, long, default_value = "framegrab.ppm")]
    out: PathBuf,

    /// Number of grabs to take
    #[arg(long, default_value_t = 1)]
    count: u32,

    /// Longest a single capture may block (ms)
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Only accept frames with new desktop content
    #[arg(long)]
    wait: bool,

    /// Display output to duplicate
    #[arg(long)]
    output_index: Option<u32>,

    /// JSON config file (CLI flags override it)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Use the built-in test pattern instead of the desktop
    #[arg(long)]
    synthetic: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("framegrab v{}", env!("CARGO_PKG_VERSION"));

    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => Ok(()),
        Err(e) => {
            error!("Fatal error: {:#}", e);
            Err(e)
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let cfg = resolve_config(cli)?;
    info!(
        "Grabbing {} as {} (output {}, timeout {}ms, wait={})",
        cli.region, cfg.format, cfg.output_index, cfg.timeout_ms, cfg.wait_for_change
    );

    if cli.synthetic {
        let driver = SyntheticDriver::new(FrameDesc::FHD);
        let mut grabber = Grabber::from_config(driver, &cfg).context("Synthetic grabber")?;
        capture_loop(&mut grabber, cli, &cfg)
    } else {
        let driver = PlatformDriver::new(cfg.output_index);
        let mut grabber = Grabber::from_config(driver, &cfg).context("Desktop duplication")?;
        capture_loop(&mut grabber, cli, &cfg)
    }
}

fn resolve_config(cli: &Cli) -> Result<GrabConfig> {
    let mut cfg = match &cli.config {
        Some(path) => GrabConfig::load(path)
            .with_context(|| format!("Loading config {}", path.display()))?,
        None => GrabConfig::default(),
    };
    if let Some(format) = cli.format {
        cfg.format = format;
    }
    if let Some(ms) = cli.timeout_ms {
        cfg.timeout_ms = ms;
    }
    if let Some(index) = cli.output_index {
        cfg.output_index = index;
    }
    cfg.wait_for_change |= cli.wait;
    cfg.validate().context("Invalid configuration")?;
    Ok(cfg)
}

fn capture_loop<D: CaptureDriver>(grabber: &mut Grabber<D>, cli: &Cli, cfg: &GrabConfig) -> Result<()> {
    let options = GrabOptions::from(cfg);
    let mut saved = 0u32;

    for n in 0..cli.count {
        let path = numbered_path(&cli.out, n, cli.count);
        let outcome = match grabber.grab(cli.region, cfg.format, options) {
            Ok(grab) => {
                write_grab(&grab, &path)?;
                Ok(grab.accumulated_frames)
            }
            Err(e) => Err(e),
        };

        match outcome {
            Ok(frames) => {
                info!("Grab {} → {} ({} accumulated frames)", n + 1, path.display(), frames);
                saved += 1;
            }
            Err(e) if e.is_retryable() => debug!("Grab {}: {}", n + 1, e),
            Err(e) if e.needs_reset() => {
                warn!("Grab {}: {}; resetting session", n + 1, e);
                grabber.reset().context("Session reset")?;
            }
            Err(e) => return Err(e).with_context(|| format!("Grab {}", n + 1)),
        }
    }

    info!("Saved {}/{} grabs", saved, cli.count);
    Ok(())
}

fn write_grab(grab: &Grab<'_>, path: &Path) -> Result<()> {
    let written = match (grab.rgb(), grab.planes()) {
        (Some(rgb), _) => ppm::save_ppm(path, grab.region.width, grab.region.height, rgb),
        (None, Some(planes)) => {
            let bytes: Vec<u8> = planes.iter().flat_map(|v| v.to_le_bytes()).collect();
            std::fs::write(path, bytes)
        }
        (None, None) => Ok(()),
    };
    written.with_context(|| format!("Writing {}", path.display()))
}

/// `shot.ppm` → `shot-0003.ppm` when more than one grab is taken.
fn numbered_path(base: &Path, n: u32, count: u32) -> PathBuf {
    if count <= 1 {
        return base.to_path_buf();
    }
    let stem = base.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
    let name = match base.extension() {
        Some(ext) => format!("{stem}-{n:04}.{}", ext.to_string_lossy()),
        None => format!("{stem}-{n:04}"),
    };
    base.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbered_paths() {
        let base = Path::new("out/shot.ppm");
        assert_eq!(numbered_path(base, 0, 1), PathBuf::from("out/shot.ppm"));
        assert_eq!(numbered_path(base, 3, 5), PathBuf::from("out/shot-0003.ppm"));
        assert_eq!(numbered_path(Path::new("raw"), 12, 20), PathBuf::from("raw-0012"));
    }

    #[test]
    fn flags_override_config() {
        let cli = Cli::parse_from([
            "framegrab", "--region", "1,2,3,4", "--format", "planar", "--timeout-ms", "40", "--wait",
        ]);
        let cfg = resolve_config(&cli).unwrap();
        assert_eq!(cli.region, Region::new(1, 2, 3, 4));
        assert_eq!(cfg.format, OutputFormat::Planar);
        assert_eq!(cfg.timeout_ms, 40);
        assert!(cfg.wait_for_change);
        assert_eq!(cfg.max_recoveries, 1);
    }

    #[test]
    fn synthetic_run_writes_files() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("pattern.bin");
        let cli = Cli::parse_from([
            "framegrab", "--synthetic", "--region", "0,0,8,4", "--format", "planar", "--count", "2",
            "--out", out.to_str().unwrap(),
        ]);
        run(&cli).unwrap();

        for n in 0..2 {
            let bytes = std::fs::read(dir.path().join(format!("pattern-{n:04}.bin"))).unwrap();
            assert_eq!(bytes.len(), 8 * 4 * 12);
        }
    }
}
