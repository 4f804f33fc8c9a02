// XLS embedded image extraction
//
// Legacy chapter sheets are .xls workbooks with a still image pasted per
// row. Rather than parse the OLE2 container, this scans the raw bytes for
// JPEG start/end signatures and slices out candidates, keeping only the
// ones that actually decode.

use std::path::{Path, PathBuf};

use tracing::{info, warn};
use walkdir::WalkDir;

use crate::constants::XLS_MIN_IMAGE_BYTES;
use crate::error::{Result, VaultError};

const JPEG_SOI: [u8; 3] = [0xFF, 0xD8, 0xFF];
const JPEG_EOI: [u8; 2] = [0xFF, 0xD9];

/// A validated image sliced out of a workbook.
#[derive(Debug, Clone)]
pub struct ExtractedImage {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// Byte offset of the JPEG start signature in the source file.
    pub offset: usize,
}

/// Candidate byte range [start, end) that looks like a JPEG.
fn find_jpeg_ranges(content: &[u8]) -> Vec<(usize, usize)> {
    let mut ranges = Vec::new();
    let mut start_pos = 0;

    while let Some(start) = find_signature(content, &JPEG_SOI, start_pos) {
        // Find the matching end marker; fall back to the next start
        // signature or the end of the buffer when it is missing.
        let end = match find_signature(content, &JPEG_EOI, start + JPEG_SOI.len()) {
            Some(eoi) => eoi + JPEG_EOI.len(),
            None => match find_signature(content, &JPEG_SOI, start + JPEG_SOI.len()) {
                Some(next_start) => next_start,
                None => content.len(),
            },
        };

        ranges.push((start, end));
        start_pos = end.max(start + 1);
    }

    ranges
}

fn find_signature(content: &[u8], signature: &[u8], from: usize) -> Option<usize> {
    if from >= content.len() {
        return None;
    }
    content[from..]
        .windows(signature.len())
        .position(|w| w == signature)
        .map(|pos| from + pos)
}

/// Scan a workbook's bytes for embedded JPEGs. Candidates below the size
/// floor or that fail to decode are discarded.
pub fn extract_images(content: &[u8]) -> Vec<ExtractedImage> {
    let mut images = Vec::new();

    for (start, end) in find_jpeg_ranges(content) {
        let data = &content[start..end];
        if data.len() < XLS_MIN_IMAGE_BYTES {
            continue;
        }

        match image::load_from_memory(data) {
            Ok(img) => {
                images.push(ExtractedImage {
                    data: data.to_vec(),
                    width: img.width(),
                    height: img.height(),
                    offset: start,
                });
            }
            Err(e) => {
                warn!("Discarding invalid image candidate at offset {}: {}", start, e);
            }
        }
    }

    images
}

/// Extract embedded images from one workbook file and write them as
/// numbered JPEGs under `output_dir`. Returns the written paths.
pub fn extract_file(xls_path: &Path, output_dir: &Path) -> Result<Vec<PathBuf>> {
    let content = std::fs::read(xls_path)
        .map_err(|_| VaultError::FileNotFound(xls_path.display().to_string()))?;

    let images = extract_images(&content);
    if images.is_empty() {
        info!("No embedded images found in {}", xls_path.display());
        return Ok(Vec::new());
    }

    std::fs::create_dir_all(output_dir)?;

    let stem = xls_path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "workbook".to_string());

    let mut written = Vec::with_capacity(images.len());
    for (i, img) in images.iter().enumerate() {
        let out = output_dir.join(format!("{}_{:03}.jpg", stem, i));
        std::fs::write(&out, &img.data)?;
        info!(
            "Extracted {}x{} image ({} bytes) to {}",
            img.width,
            img.height,
            img.data.len(),
            out.display()
        );
        written.push(out);
    }

    Ok(written)
}

/// Extract from every .xls/.xlsx workbook under a directory (or a single
/// file). Returns (workbooks processed, images written).
pub fn extract_path(source: &Path, output_dir: &Path) -> Result<(usize, usize)> {
    let mut workbooks = 0;
    let mut images = 0;

    if source.is_file() {
        images += extract_file(source, output_dir)?.len();
        workbooks += 1;
        return Ok((workbooks, images));
    }

    for entry in WalkDir::new(source).into_iter().filter_map(|e| e.ok()) {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let is_workbook = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| {
                let e = e.to_lowercase();
                e == "xls" || e == "xlsx"
            })
            .unwrap_or(false);
        if !is_workbook {
            continue;
        }

        match extract_file(path, output_dir) {
            Ok(paths) => {
                workbooks += 1;
                images += paths.len();
            }
            Err(e) => warn!("Skipping {}: {}", path.display(), e),
        }
    }

    Ok((workbooks, images))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A valid JPEG produced in-process. A 1px checkerboard compresses
    /// poorly, so the result clears the extraction size floor.
    fn tiny_jpeg() -> Vec<u8> {
        let img = image::RgbImage::from_fn(128, 128, |x, y| {
            if (x + y) % 2 == 0 {
                image::Rgb([255, 255, 255])
            } else {
                image::Rgb([0, 0, 0])
            }
        });
        let mut bytes = Vec::new();
        let mut cursor = std::io::Cursor::new(&mut bytes);
        img.write_to(&mut cursor, image::ImageFormat::Jpeg).unwrap();
        assert!(bytes.len() >= XLS_MIN_IMAGE_BYTES);
        bytes
    }

    #[test]
    fn test_find_jpeg_ranges_in_padding() {
        let jpeg = tiny_jpeg();
        let mut content = vec![0u8; 512];
        content.extend_from_slice(&jpeg);
        content.extend(vec![0u8; 256]);

        let ranges = find_jpeg_ranges(&content);
        assert_eq!(ranges.len(), 1);
        assert_eq!(ranges[0].0, 512);
    }

    #[test]
    fn test_truncated_jpeg_ends_at_next_start_or_eof() {
        // SOI with no EOI runs to end of buffer
        let mut content = vec![0u8; 16];
        content.extend_from_slice(&JPEG_SOI);
        content.extend(vec![1u8; 64]);

        let ranges = find_jpeg_ranges(&content);
        assert_eq!(ranges.len(), 1);
        assert_eq!(ranges[0], (16, content.len()));
    }

    #[test]
    fn test_extract_images_discards_garbage() {
        // A signature followed by garbage and an EOI: scanned, then
        // rejected by the decoder.
        let mut content = vec![0u8; 8];
        content.extend_from_slice(&JPEG_SOI);
        content.extend(vec![0xABu8; crate::constants::XLS_MIN_IMAGE_BYTES + 16]);
        content.extend_from_slice(&JPEG_EOI);

        assert!(extract_images(&content).is_empty());
    }

    #[test]
    fn test_extract_images_discards_undersized() {
        // Valid signature structure but below the size floor
        let mut content = Vec::new();
        content.extend_from_slice(&JPEG_SOI);
        content.extend(vec![0u8; 8]);
        content.extend_from_slice(&JPEG_EOI);

        assert!(extract_images(&content).is_empty());
    }

    #[test]
    fn test_extract_images_keeps_valid_jpeg() {
        let jpeg = tiny_jpeg();
        // Pad the jpeg to clear the size floor if the encoder is compact
        let mut content = vec![0u8; 100];
        content.extend_from_slice(&jpeg);

        let images = extract_images(&content);
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].width, 128);
        assert_eq!(images[0].height, 128);
        assert_eq!(images[0].offset, 100);
    }

    #[test]
    fn test_extract_file_writes_numbered_jpegs() {
        let tmp = tempfile::TempDir::new().unwrap();
        let xls = tmp.path().join("sheet.xls");

        // Fake workbook: header bytes, then two embedded JPEGs
        let jpeg = tiny_jpeg();
        let mut content = vec![0xD0u8; 64];
        content.extend_from_slice(&jpeg);
        content.extend(vec![0u8; 32]);
        content.extend_from_slice(&jpeg);
        std::fs::write(&xls, &content).unwrap();

        let out_dir = tmp.path().join("out");
        let written = extract_file(&xls, &out_dir).unwrap();

        assert_eq!(written.len(), 2);
        assert!(written[0].file_name().unwrap().to_string_lossy().starts_with("sheet_000"));
        assert!(written[0].exists());
        assert!(written[1].exists());
    }
}
