// Sprite sheet generation
//
// A sprite sheet is one horizontal JPG strip of fixed-size frames; the web
// client steps background-position across it to fake animation. Frame i
// occupies pixel columns [i*w, (i+1)*w).

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use std::process::Command;

use image::codecs::jpeg::JpegEncoder;
use image::{imageops, Rgb, RgbImage};

use crate::constants::{
    SPRITE_FRAME_HEIGHT, SPRITE_FRAME_WIDTH, SPRITE_MAX_FRAMES, THUMB_QUALITY,
};
use crate::error::{Result, VaultError};

/// Frame colors for placeholder sprites, cycled by chapter position.
const PLACEHOLDER_COLORS: [[u8; 3]; 10] = [
    [65, 105, 225],  // royal blue
    [34, 139, 34],   // forest green
    [220, 20, 60],   // crimson
    [255, 140, 0],   // dark orange
    [138, 43, 226],  // blue violet
    [0, 139, 139],   // dark cyan
    [255, 20, 147],  // deep pink
    [30, 144, 255],  // dodger blue
    [255, 165, 0],   // orange
    [50, 205, 50],   // lime green
];

/// Placeholder color for a chapter position.
pub fn palette_color(position: usize) -> [u8; 3] {
    PLACEHOLDER_COLORS[position % PLACEHOLDER_COLORS.len()]
}

/// Sprite layout stored on the film row for client-side stepping.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpriteLayout {
    pub frame_count: u32,
    pub frame_width: u32,
    pub frame_height: u32,
    /// Seconds between frames when animated against the film duration.
    pub frame_interval: f64,
}

/// Calculate the layout for a sheet of `frame_count` frames over an optional
/// film duration. Frame count is clamped to [1, SPRITE_MAX_FRAMES].
pub fn calculate_layout(duration_seconds: Option<i64>, frame_count: u32) -> SpriteLayout {
    let frame_count = frame_count.clamp(1, SPRITE_MAX_FRAMES);

    let frame_interval = match duration_seconds {
        Some(d) if d > 0 => d as f64 / frame_count as f64,
        _ => 1.0,
    };

    SpriteLayout {
        frame_count,
        frame_width: SPRITE_FRAME_WIDTH,
        frame_height: SPRITE_FRAME_HEIGHT,
        frame_interval,
    }
}

/// Blit frames side-by-side into a single strip.
/// Frames must already be frame-sized; the strip is exactly
/// (n * frame_width) x frame_height.
pub fn compose_strip(frames: &[RgbImage]) -> Result<RgbImage> {
    if frames.is_empty() {
        return Err(VaultError::Image("no frames to compose".to_string()));
    }

    let w = SPRITE_FRAME_WIDTH;
    let h = SPRITE_FRAME_HEIGHT;
    let mut strip = RgbImage::new(w * frames.len() as u32, h);

    for (i, frame) in frames.iter().enumerate() {
        imageops::replace(&mut strip, frame, (i as u32 * w) as i64, 0);
    }

    Ok(strip)
}

/// Load a source image and scale it to frame size.
pub fn load_frame(path: &Path) -> Result<RgbImage> {
    let img = image::open(path)
        .map_err(|e| VaultError::Image(format!("{}: {}", path.display(), e)))?
        .to_rgb8();
    Ok(imageops::resize(
        &img,
        SPRITE_FRAME_WIDTH,
        SPRITE_FRAME_HEIGHT,
        imageops::FilterType::Triangle,
    ))
}

/// A solid-color frame for chapters with no still yet.
pub fn placeholder_frame(position: usize) -> RgbImage {
    let [r, g, b] = palette_color(position);
    RgbImage::from_pixel(SPRITE_FRAME_WIDTH, SPRITE_FRAME_HEIGHT, Rgb([r, g, b]))
}

/// Compose a sprite sheet from chapter thumbnail files. Sources that fail to
/// load fall back to a placeholder frame so positions stay aligned with
/// chapter order.
pub fn compose_chapter_sprite(sources: &[std::path::PathBuf], output_path: &Path) -> Result<()> {
    let frames: Vec<RgbImage> = sources
        .iter()
        .enumerate()
        .map(|(i, path)| load_frame(path).unwrap_or_else(|_| placeholder_frame(i)))
        .collect();

    let strip = compose_strip(&frames)?;
    write_sprite(&strip, output_path)
}

/// Write a sprite image as JPEG via a temp file and atomic rename.
pub fn write_sprite(strip: &RgbImage, output_path: &Path) -> Result<()> {
    if let Some(parent) = output_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let tmp_path = output_path.with_extension("tmp.jpg");
    {
        let file = File::create(&tmp_path)?;
        let mut writer = BufWriter::new(file);
        let mut encoder = JpegEncoder::new_with_quality(&mut writer, THUMB_QUALITY as u8);
        encoder.encode_image(strip).map_err(|e| {
            let _ = std::fs::remove_file(&tmp_path);
            VaultError::Image(e.to_string())
        })?;
    }

    std::fs::rename(&tmp_path, output_path)?;
    Ok(())
}

/// Decode a generated sheet and check its dimensions match the layout.
pub fn verify_sprite(path: &Path, frame_count: u32) -> Result<(u32, u32)> {
    let img = image::open(path)
        .map_err(|e| VaultError::Image(format!("{}: {}", path.display(), e)))?;

    let expected_w = frame_count * SPRITE_FRAME_WIDTH;
    let expected_h = SPRITE_FRAME_HEIGHT;
    let (w, h) = (img.width(), img.height());

    if w != expected_w || h != expected_h {
        return Err(VaultError::Image(format!(
            "sprite {} is {}x{}, expected {}x{}",
            path.display(),
            w,
            h,
            expected_w,
            expected_h
        )));
    }

    Ok((w, h))
}

/// Extract evenly spaced frames from a local video into a horizontal strip
/// with ffmpeg. Used when a source video is available instead of chapter
/// stills.
pub fn extract_video_sprite(
    source_path: &Path,
    output_path: &Path,
    duration_seconds: i64,
    frame_count: u32,
) -> Result<SpriteLayout> {
    if let Some(parent) = output_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let layout = calculate_layout(Some(duration_seconds), frame_count);

    // One frame every frame_interval seconds, scaled and tiled into a
    // single row.
    let filter = format!(
        "fps=1/{:.3},scale={}:{},tile={}x1",
        layout.frame_interval.max(0.001),
        layout.frame_width,
        layout.frame_height,
        layout.frame_count
    );

    // FFmpeg JPEG quality scale is 1-31 where 1 is best
    let q_value = ((100 - THUMB_QUALITY) as f32 / 100.0 * 30.0 + 1.0) as u32;

    let tmp_path = output_path.with_extension("tmp.jpg");
    let source_arg = source_path.to_string_lossy().to_string();
    let tmp_arg = tmp_path.to_string_lossy().to_string();
    let q_arg = q_value.to_string();

    let output = Command::new(crate::tools::ffmpeg_path())
        .args([
            "-y",
            "-i", source_arg.as_str(),
            "-vf", filter.as_str(),
            "-frames:v", "1",
            "-q:v", q_arg.as_str(),
            tmp_arg.as_str(),
        ])
        .output()?;

    if !output.status.success() {
        let _ = std::fs::remove_file(&tmp_path);
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(VaultError::FFmpeg(format!("sprite extraction failed: {}", stderr)));
    }

    std::fs::rename(&tmp_path, output_path)?;

    if !output_path.exists() || std::fs::metadata(output_path)?.len() == 0 {
        let _ = std::fs::remove_file(output_path);
        return Err(VaultError::FFmpeg("sprite file is empty or missing".to_string()));
    }

    Ok(layout)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_calculate_layout() {
        let layout = calculate_layout(Some(60), 6);
        assert_eq!(layout.frame_count, 6);
        assert_eq!(layout.frame_width, SPRITE_FRAME_WIDTH);
        assert_eq!(layout.frame_height, SPRITE_FRAME_HEIGHT);
        assert!((layout.frame_interval - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_calculate_layout_clamps_frames() {
        assert_eq!(calculate_layout(Some(10), 0).frame_count, 1);
        assert_eq!(
            calculate_layout(Some(10_000), 10_000).frame_count,
            SPRITE_MAX_FRAMES
        );
    }

    #[test]
    fn test_calculate_layout_no_duration() {
        let layout = calculate_layout(None, 4);
        assert!((layout.frame_interval - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_compose_strip_places_frame_i_at_i_times_w() {
        let frames = vec![
            RgbImage::from_pixel(SPRITE_FRAME_WIDTH, SPRITE_FRAME_HEIGHT, Rgb([255, 0, 0])),
            RgbImage::from_pixel(SPRITE_FRAME_WIDTH, SPRITE_FRAME_HEIGHT, Rgb([0, 255, 0])),
            RgbImage::from_pixel(SPRITE_FRAME_WIDTH, SPRITE_FRAME_HEIGHT, Rgb([0, 0, 255])),
        ];

        let strip = compose_strip(&frames).unwrap();
        assert_eq!(strip.width(), 3 * SPRITE_FRAME_WIDTH);
        assert_eq!(strip.height(), SPRITE_FRAME_HEIGHT);

        // First pixel of each frame slot
        assert_eq!(strip.get_pixel(0, 0), &Rgb([255, 0, 0]));
        assert_eq!(strip.get_pixel(SPRITE_FRAME_WIDTH, 0), &Rgb([0, 255, 0]));
        assert_eq!(strip.get_pixel(2 * SPRITE_FRAME_WIDTH, 0), &Rgb([0, 0, 255]));
        // Last pixel of the middle slot still belongs to frame 1
        assert_eq!(
            strip.get_pixel(2 * SPRITE_FRAME_WIDTH - 1, SPRITE_FRAME_HEIGHT - 1),
            &Rgb([0, 255, 0])
        );
    }

    #[test]
    fn test_compose_strip_rejects_empty() {
        assert!(compose_strip(&[]).is_err());
    }

    #[test]
    fn test_write_and_verify_sprite() {
        let tmp = TempDir::new().unwrap();
        let output = tmp.path().join("sprite.jpg");

        let frames = vec![placeholder_frame(0), placeholder_frame(1)];
        let strip = compose_strip(&frames).unwrap();
        write_sprite(&strip, &output).unwrap();

        let (w, h) = verify_sprite(&output, 2).unwrap();
        assert_eq!(w, 2 * SPRITE_FRAME_WIDTH);
        assert_eq!(h, SPRITE_FRAME_HEIGHT);

        // Wrong expected frame count must fail verification
        assert!(verify_sprite(&output, 3).is_err());
    }

    #[test]
    fn test_compose_chapter_sprite_falls_back_to_placeholder() {
        let tmp = TempDir::new().unwrap();
        let missing = tmp.path().join("not_there.jpg");
        let output = tmp.path().join("sprite.jpg");

        compose_chapter_sprite(&[missing], &output).unwrap();
        verify_sprite(&output, 1).unwrap();
    }

    #[test]
    fn test_palette_cycles() {
        assert_eq!(palette_color(0), palette_color(10));
        assert_ne!(palette_color(0), palette_color(1));
    }
}
