//! CLI integration tests for `picframe border` and `picframe round`
//!
//! Fixtures are built in temp directories and the binary runs with that
//! directory as its working directory, so no stray picframe.toml is found.

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use image::{Rgba, RgbaImage};
use picframe::gif_codec::{decode_gif, encode_gif, DecodedGif};
use picframe::pipeline::AnimatedFrame;
use tempfile::TempDir;

/// Get the path to the picframe binary
fn picframe_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_picframe"))
}

fn run_in(dir: &Path, args: &[&str]) -> Output {
    Command::new(picframe_binary())
        .current_dir(dir)
        .args(args)
        .output()
        .expect("Failed to execute picframe")
}

fn solid_frame(w: u32, h: u32, color: [u8; 4], duration_ms: u32) -> AnimatedFrame {
    AnimatedFrame { image: RgbaImage::from_pixel(w, h, Rgba(color)), duration_ms }
}

fn write_gif(path: &Path, frames: &[AnimatedFrame], loop_count: u16) {
    let file = File::create(path).expect("should create fixture");
    encode_gif(file, frames, loop_count).expect("should encode fixture");
}

fn read_gif(path: &Path) -> DecodedGif {
    decode_gif(File::open(path).expect("output should exist")).expect("output should decode")
}

/// Three 60x50 frames shown for 100, 150 and 100 ms, looping forever.
fn three_frame_fixture(dir: &Path) -> PathBuf {
    let input = dir.join("in.gif");
    let frames = vec![
        solid_frame(60, 50, [255, 0, 0, 255], 100),
        solid_frame(60, 50, [0, 255, 0, 255], 150),
        solid_frame(60, 50, [0, 0, 255, 255], 100),
    ];
    write_gif(&input, &frames, 0);
    input
}

// ============================================================================
// Border Tests
// ============================================================================

#[test]
fn test_border_three_frames() {
    let temp = TempDir::new().unwrap();
    let input = three_frame_fixture(temp.path());
    let output = temp.path().join("out.gif");

    let result = run_in(
        temp.path(),
        &["border", input.to_str().unwrap(), output.to_str().unwrap(), "20", "40"],
    );
    assert!(result.status.success(), "stderr: {}", String::from_utf8_lossy(&result.stderr));

    let decoded = read_gif(&output);
    assert_eq!(decoded.frames.len(), 3);
    assert_eq!(decoded.loop_count, 0);
    let durations: Vec<u32> = decoded.frames.iter().map(|f| f.duration_ms).collect();
    assert_eq!(durations, vec![100, 150, 100]);

    let expected_centres = [[255, 0, 0, 255], [0, 255, 0, 255], [0, 0, 255, 255]];
    for (frame, centre) in decoded.frames.iter().zip(expected_centres) {
        let img = &frame.image;
        assert_eq!(img.dimensions(), (100, 90));
        // Corners are cut
        assert_eq!(img.get_pixel(0, 0)[3], 0);
        assert_eq!(img.get_pixel(99, 0)[3], 0);
        assert_eq!(img.get_pixel(0, 89)[3], 0);
        assert_eq!(img.get_pixel(99, 89)[3], 0);
        // Border band is opaque black
        assert_eq!(*img.get_pixel(50, 5), Rgba([0, 0, 0, 255]));
        assert_eq!(*img.get_pixel(5, 45), Rgba([0, 0, 0, 255]));
        // Source sits inside the border, colors untouched
        assert_eq!(*img.get_pixel(50, 45), Rgba(centre));
        assert_eq!(*img.get_pixel(20, 20), Rgba(centre));
    }
}

#[test]
fn test_border_defaults() {
    let temp = TempDir::new().unwrap();
    let input = three_frame_fixture(temp.path());
    let output = temp.path().join("out.gif");

    let result = run_in(temp.path(), &["border", input.to_str().unwrap(), output.to_str().unwrap()]);
    assert!(result.status.success());
    let decoded = read_gif(&output);
    assert_eq!(decoded.frames[0].image.dimensions(), (100, 90));
}

#[test]
fn test_border_css_color() {
    let temp = TempDir::new().unwrap();
    let input = three_frame_fixture(temp.path());
    let output = temp.path().join("out.gif");

    let result = run_in(
        temp.path(),
        &["border", input.to_str().unwrap(), output.to_str().unwrap(), "4", "0", "--color", "white"],
    );
    assert!(result.status.success());
    let decoded = read_gif(&output);
    let img = &decoded.frames[0].image;
    assert_eq!(img.dimensions(), (68, 58));
    // Radius 0 keeps the corners
    assert_eq!(*img.get_pixel(0, 0), Rgba([255, 255, 255, 255]));
    assert_eq!(*img.get_pixel(34, 29), Rgba([255, 0, 0, 255]));
}

#[test]
fn test_border_preserves_finite_loop_count() {
    let temp = TempDir::new().unwrap();
    let input = temp.path().join("in.gif");
    write_gif(&input, &[solid_frame(10, 10, [9, 9, 9, 255], 40)], 3);
    let output = temp.path().join("out.gif");

    let result = run_in(temp.path(), &["border", input.to_str().unwrap(), output.to_str().unwrap()]);
    assert!(result.status.success());
    assert_eq!(read_gif(&output).loop_count, 3);
}

#[test]
fn test_border_json_report() {
    let temp = TempDir::new().unwrap();
    let input = three_frame_fixture(temp.path());
    let output = temp.path().join("out.gif");

    let result = run_in(
        temp.path(),
        &["border", input.to_str().unwrap(), output.to_str().unwrap(), "--json"],
    );
    assert!(result.status.success());
    let report: serde_json::Value =
        serde_json::from_slice(&result.stdout).expect("stdout should be JSON");
    assert_eq!(report["frames"], 3);
    assert_eq!(report["width"], 100);
    assert_eq!(report["height"], 90);
    assert_eq!(report["durations"], serde_json::json!([100, 150, 100]));
}

#[test]
fn test_border_config_file_values() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("picframe.toml"), "[border]\nsize = 2\nradius = 0\n").unwrap();
    let input = three_frame_fixture(temp.path());
    let output = temp.path().join("out.gif");

    // Found by walking up from the working directory
    let result = run_in(temp.path(), &["border", input.to_str().unwrap(), output.to_str().unwrap()]);
    assert!(result.status.success());
    assert_eq!(read_gif(&output).frames[0].image.dimensions(), (64, 54));
}

#[test]
fn test_border_keeps_odd_pixel_color() {
    let temp = TempDir::new().unwrap();
    let input = temp.path().join("in.gif");
    let mut image = RgbaImage::from_pixel(30, 30, Rgba([255, 0, 0, 255]));
    image.put_pixel(15, 15, Rgba([0, 0, 255, 255]));
    image.put_pixel(16, 15, Rgba([7, 8, 9, 255]));
    write_gif(&input, &[AnimatedFrame { image, duration_ms: 50 }], 0);
    let output = temp.path().join("out.gif");

    let result = run_in(
        temp.path(),
        &["border", input.to_str().unwrap(), output.to_str().unwrap(), "5", "4", "--color", "#102030"],
    );
    assert!(result.status.success());

    let img = &read_gif(&output).frames[0].image;
    assert_eq!(*img.get_pixel(20, 20), Rgba([0, 0, 255, 255]));
    assert_eq!(*img.get_pixel(21, 20), Rgba([7, 8, 9, 255]));
    assert_eq!(*img.get_pixel(10, 10), Rgba([255, 0, 0, 255]));
    assert_eq!(*img.get_pixel(20, 2), Rgba([16, 32, 48, 255]));
}

// ============================================================================
// Round Tests
// ============================================================================

#[test]
fn test_round_ignores_other_sections() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("picframe.toml"), "[threshold]\nname = \"1bad\"\n").unwrap();
    let input = three_frame_fixture(temp.path());
    let output = temp.path().join("out.gif");

    let result = run_in(temp.path(), &["round", input.to_str().unwrap(), output.to_str().unwrap()]);
    assert!(result.status.success(), "stderr: {}", String::from_utf8_lossy(&result.stderr));

    // The section is still checked when its command runs
    let result = run_in(temp.path(), &["threshold", input.to_str().unwrap()]);
    assert_eq!(result.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&result.stderr).contains("threshold.name"));
}

#[test]
fn test_round_keeps_size() {
    let temp = TempDir::new().unwrap();
    let input = three_frame_fixture(temp.path());
    let output = temp.path().join("round.gif");

    let result = run_in(temp.path(), &["round", input.to_str().unwrap(), output.to_str().unwrap()]);
    assert!(result.status.success());

    let decoded = read_gif(&output);
    assert_eq!(decoded.frames.len(), 3);
    let img = &decoded.frames[1].image;
    assert_eq!(img.dimensions(), (60, 50));
    assert_eq!(img.get_pixel(0, 0)[3], 0);
    assert_eq!(img.get_pixel(30, 25)[3], 255);
}

#[test]
fn test_round_writes_png_still() {
    let temp = TempDir::new().unwrap();
    let input = temp.path().join("in.png");
    RgbaImage::from_pixel(40, 40, Rgba([10, 20, 30, 255])).save(&input).unwrap();
    let output = temp.path().join("out.png");

    let result = run_in(
        temp.path(),
        &["round", input.to_str().unwrap(), output.to_str().unwrap(), "10"],
    );
    assert!(result.status.success());

    let img = image::open(&output).unwrap().to_rgba8();
    assert_eq!(img.get_pixel(0, 0)[3], 0);
    // PNG keeps exact colors
    assert_eq!(*img.get_pixel(20, 20), Rgba([10, 20, 30, 255]));
}

// ============================================================================
// Failure Tests
// ============================================================================

#[test]
fn test_missing_arguments_is_usage_error() {
    let temp = TempDir::new().unwrap();
    let result = run_in(temp.path(), &["border", "only-input.gif"]);
    assert_eq!(result.status.code(), Some(2));
}

#[test]
fn test_negative_radius_rejected() {
    let temp = TempDir::new().unwrap();
    let input = three_frame_fixture(temp.path());
    let output = temp.path().join("out.gif");

    let result =
        run_in(temp.path(), &["round", input.to_str().unwrap(), output.to_str().unwrap(), "-5"]);
    assert_eq!(result.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&result.stderr).contains("round.radius"));
    assert!(!output.exists());
}

#[test]
fn test_three_channel_border_color_rejected() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("picframe.toml"), "[border]\ncolor = [0, 0, 0]\n").unwrap();
    let input = three_frame_fixture(temp.path());
    let output = temp.path().join("out.gif");

    let result = run_in(temp.path(), &["border", input.to_str().unwrap(), output.to_str().unwrap()]);
    assert_eq!(result.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&result.stderr).contains("4 channels"));
    assert!(!output.exists());
}

#[test]
fn test_zero_frame_gif_fails_without_output() {
    let temp = TempDir::new().unwrap();
    let input = temp.path().join("empty.gif");
    {
        let file = File::create(&input).unwrap();
        // Header and trailer only
        let _encoder = gif::Encoder::new(file, 8, 8, &[]).unwrap();
    }
    let output = temp.path().join("out.gif");

    let result = run_in(temp.path(), &["border", input.to_str().unwrap(), output.to_str().unwrap()]);
    assert_eq!(result.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&result.stderr).contains("input contains no frames"));
    assert!(!output.exists());
}

#[test]
fn test_non_image_input_fails_without_output() {
    let temp = TempDir::new().unwrap();
    let input = temp.path().join("notes.gif");
    fs::write(&input, "these bytes are plain text").unwrap();
    let output = temp.path().join("out.gif");

    let result = run_in(temp.path(), &["round", input.to_str().unwrap(), output.to_str().unwrap()]);
    assert_eq!(result.status.code(), Some(1));
    assert!(!output.exists());
}

#[test]
fn test_missing_input_fails() {
    let temp = TempDir::new().unwrap();
    let output = temp.path().join("out.gif");
    let result = run_in(temp.path(), &["round", "does-not-exist.gif", output.to_str().unwrap()]);
    assert_eq!(result.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&result.stderr).contains("does-not-exist.gif"));
    assert!(!output.exists());
}

#[test]
fn test_failed_run_keeps_existing_output() {
    let temp = TempDir::new().unwrap();
    let input = temp.path().join("broken.gif");
    fs::write(&input, b"GIF89a").unwrap();
    let output = temp.path().join("out.gif");
    fs::write(&output, b"previous").unwrap();

    let result = run_in(temp.path(), &["round", input.to_str().unwrap(), output.to_str().unwrap()]);
    assert_eq!(result.status.code(), Some(1));
    assert_eq!(fs::read(&output).unwrap(), b"previous");
}
