mod common;

use std::time::Duration;

use common::{calls, expected_rgb, grabber, Script, Step};
use framegrab_capture::GrabOptions;
use framegrab_core::{FrameDesc, GrabError, OutputFormat, Region};

const DESC: FrameDesc = FrameDesc { width: 16, height: 8 };

fn once() -> GrabOptions {
    GrabOptions { timeout: Duration::from_millis(5), wait: false }
}

#[test]
fn identical_requests_reuse_the_buffer() {
    let (mut grabber, script) = grabber(Script::new(DESC));

    let first = grabber.grab(Region::new(0, 0, 4, 4), OutputFormat::Rgb, once()).unwrap().as_ptr();
    let second = grabber.grab(Region::new(8, 2, 4, 4), OutputFormat::Rgb, once()).unwrap().as_ptr();
    assert_eq!(first, second);
    assert_eq!(grabber.output().as_bytes(), expected_rgb(8, 2, 4, 4).as_slice());
    assert_eq!(calls(&script).staging_created, 1);
}

#[test]
fn size_or_format_change_reallocates() {
    let (mut grabber, _) = grabber(Script::new(DESC));

    let rgb = grabber.grab(Region::new(0, 0, 4, 4), OutputFormat::Rgb, once()).unwrap().as_ptr();
    let wider = grabber.grab(Region::new(0, 0, 5, 4), OutputFormat::Rgb, once()).unwrap().as_ptr();
    assert_ne!(rgb, wider);
    assert_eq!(grabber.output().len(), 5 * 4 * 3);

    let planar = grabber.grab(Region::new(0, 0, 5, 4), OutputFormat::Planar, once()).unwrap().as_ptr();
    assert_ne!(wider, planar);
    assert_eq!(grabber.output().len(), 5 * 4 * 12);
}

#[test]
fn planar_grab_emits_rgb_planes() {
    let (mut grabber, _) = grabber(Script::new(DESC));

    let grab = grabber.grab(Region::new(2, 3, 2, 1), OutputFormat::Planar, once()).unwrap();
    assert!(grab.rgb().is_none());
    let planes = grab.planes().expect("planar samples");

    let expected: Vec<f32> = [0x80u8, 0x80, 3, 3, 2, 3].iter().map(|&b| b as f32 / 255.0).collect();
    assert_eq!(planes.len(), expected.len());
    for (got, want) in planes.iter().zip(&expected) {
        assert!((got - want).abs() < f32::EPSILON, "got {got}, want {want}");
    }
}

#[test]
fn unknown_format_code_empties_the_buffer() {
    let (mut grabber, _) = grabber(Script::new(DESC));
    grabber.grab(Region::new(0, 0, 4, 4), OutputFormat::Rgb, once()).unwrap();

    for region in [Region::new(0, 0, 4, 4), Region::new(0, 0, 16, 8)] {
        let err = grabber.grab_code(region, 2, once()).unwrap_err();
        assert!(matches!(err, GrabError::UnsupportedFormat { code: 2 }));
        assert_eq!(grabber.output().len(), 0);
    }
}

#[test]
fn staging_follows_display_mode_changes() {
    let (mut grabber, script) = grabber(Script::new(DESC));
    grabber.grab(Region::new(0, 0, 4, 4), OutputFormat::Rgb, once()).unwrap();

    script.borrow_mut().desc = FrameDesc::new(32, 16);
    let grab = grabber.grab(Region::new(20, 10, 4, 4), OutputFormat::Rgb, once()).unwrap();
    assert_eq!(grab.bytes(), expected_rgb(20, 10, 4, 4).as_slice());
    assert_eq!(grabber.frame_desc(), Some(FrameDesc::new(32, 16)));
    assert_eq!(calls(&script).staging_created, 2);
}

#[test]
fn save_ppm_writes_exact_pixmap() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("region.ppm");
    let (mut grabber, _) = grabber(Script::new(DESC).with_steps([Step::Frame(0), Step::Frame(1)]));

    let frames = grabber
        .save_ppm(Region::new(1, 1, 2, 2), OutputFormat::Rgb, Duration::from_millis(5), &path)
        .unwrap();
    assert_eq!(frames, 1);

    let mut expected = b"P6\n2 2\n255\n".to_vec();
    expected.extend(expected_rgb(1, 1, 2, 2));
    assert_eq!(std::fs::read(&path).unwrap(), expected);
}

#[test]
fn save_ppm_refuses_planar_without_capturing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("planar.ppm");
    let (mut grabber, script) = grabber(Script::new(DESC));

    let err = grabber
        .save_ppm(Region::new(0, 0, 4, 4), OutputFormat::Planar, Duration::from_millis(5), &path)
        .unwrap_err();
    assert!(matches!(err, GrabError::UnsupportedFormat { code: 1 }));
    assert!(!path.exists());
    assert_eq!(calls(&script).acquire, 0);
}
