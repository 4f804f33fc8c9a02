// Chapter thumbnail generation
//
// Extracts a single still at a chapter's start time with ffmpeg, or writes
// a solid-color placeholder when no source video is available.

use std::path::Path;
use std::process::Command;

use image::{Rgb, RgbImage};
use serde::Deserialize;

use crate::constants::{SPRITE_FRAME_HEIGHT, SPRITE_FRAME_WIDTH, THUMB_QUALITY};
use crate::error::{Result, VaultError};

/// Extract a frame-sized still at `start_seconds` into the video.
pub fn extract_chapter_still(
    source_path: &Path,
    output_path: &Path,
    start_seconds: i64,
) -> Result<()> {
    if let Some(parent) = output_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let tmp_path = output_path.with_extension("tmp.jpg");

    let seek_time = format_seek_time(start_seconds);
    let scale_filter = format!("scale={}:{}", SPRITE_FRAME_WIDTH, SPRITE_FRAME_HEIGHT);

    // FFmpeg JPEG quality scale is 1-31 where 1 is best
    let q_value = ((100 - THUMB_QUALITY) as f32 / 100.0 * 30.0 + 1.0) as u32;

    let source_arg = source_path.to_string_lossy().to_string();
    let tmp_arg = tmp_path.to_string_lossy().to_string();
    let q_arg = q_value.to_string();

    let output = Command::new(crate::tools::ffmpeg_path())
        .args([
            "-y",
            "-ss", seek_time.as_str(), // Seek before input (faster)
            "-i", source_arg.as_str(),
            "-vframes", "1",
            "-vf", scale_filter.as_str(),
            "-q:v", q_arg.as_str(),
            tmp_arg.as_str(),
        ])
        .output()?;

    if !output.status.success() {
        let _ = std::fs::remove_file(&tmp_path);
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(VaultError::FFmpeg(format!("still extraction failed: {}", stderr)));
    }

    // Atomic rename
    std::fs::rename(&tmp_path, output_path)?;

    if !output_path.exists() || std::fs::metadata(output_path)?.len() == 0 {
        let _ = std::fs::remove_file(output_path);
        return Err(VaultError::FFmpeg("thumbnail file is empty or missing".to_string()));
    }

    Ok(())
}

/// Write a solid-color placeholder thumbnail.
pub fn generate_placeholder_thumbnail(output_path: &Path, color: [u8; 3]) -> Result<()> {
    if let Some(parent) = output_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let [r, g, b] = color;
    let frame = RgbImage::from_pixel(SPRITE_FRAME_WIDTH, SPRITE_FRAME_HEIGHT, Rgb([r, g, b]));

    let tmp_path = output_path.with_extension("tmp.jpg");
    frame
        .save(&tmp_path)
        .map_err(|e| VaultError::Image(e.to_string()))?;
    std::fs::rename(&tmp_path, output_path)?;

    Ok(())
}

#[derive(Debug, Deserialize)]
struct FFprobeOutput {
    format: Option<FFprobeFormat>,
}

#[derive(Debug, Deserialize)]
struct FFprobeFormat {
    duration: Option<String>,
}

/// Probe a video's duration in whole seconds with ffprobe.
pub fn probe_duration_seconds(path: &Path) -> Result<Option<i64>> {
    let output = Command::new(crate::tools::ffprobe_path())
        .args(["-v", "quiet", "-print_format", "json", "-show_format"])
        .arg(path)
        .output()
        .map_err(|e| VaultError::FFprobe(format!("Failed to run ffprobe: {}", e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(VaultError::FFprobe(format!("ffprobe failed: {}", stderr)));
    }

    let probe: FFprobeOutput = serde_json::from_slice(&output.stdout)
        .map_err(|e| VaultError::FFprobe(format!("Failed to parse ffprobe output: {}", e)))?;

    let duration = probe
        .format
        .and_then(|f| f.duration)
        .and_then(|d| d.parse::<f64>().ok())
        .map(|d| d.round() as i64);

    Ok(duration)
}

/// Format seconds as HH:MM:SS for ffmpeg seeking.
fn format_seek_time(seconds: i64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    format!("{:02}:{:02}:{:02}", hours, minutes, secs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_format_seek_time() {
        assert_eq!(format_seek_time(0), "00:00:00");
        assert_eq!(format_seek_time(65), "00:01:05");
        assert_eq!(format_seek_time(3661), "01:01:01");
    }

    #[test]
    fn test_generate_placeholder_thumbnail() {
        let tmp = TempDir::new().unwrap();
        let output = tmp.path().join("ch01.jpg");

        generate_placeholder_thumbnail(&output, [65, 105, 225]).unwrap();

        let img = image::open(&output).unwrap();
        assert_eq!(img.width(), SPRITE_FRAME_WIDTH);
        assert_eq!(img.height(), SPRITE_FRAME_HEIGHT);
    }
}
