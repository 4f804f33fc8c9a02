// Preview pipeline module
//
// Handles generation of derived thumbnail assets:
// - Chapter thumbnails: JPG stills for chapter navigation
// - Sprite sheets: one horizontal JPG strip per film for hover animation

pub mod sprite;
pub mod thumb;

use std::path::{Path, PathBuf};

use rusqlite::Connection;
use tracing::{info, warn};

use crate::constants::{
    CHAPTERS_FOLDER, PREVIEWS_FOLDER, SPRITE_FRAME_HEIGHT, SPRITE_FRAME_WIDTH,
    THUMBNAILS_FOLDER,
};
use crate::db::schema::{self, Film, NewJob};
use crate::error::{Result, VaultError};

/// Output path for a film's sprite sheet.
pub fn sprite_output_path(catalog_root: &Path, file_id: &str) -> PathBuf {
    catalog_root
        .join(THUMBNAILS_FOLDER)
        .join(PREVIEWS_FOLDER)
        .join(format!("{}_sprite.jpg", file_id))
}

/// Output path for one chapter thumbnail.
pub fn chapter_thumb_output_path(catalog_root: &Path, file_id: &str, position: i64) -> PathBuf {
    catalog_root
        .join(THUMBNAILS_FOLDER)
        .join(CHAPTERS_FOLDER)
        .join(format!("{}_ch{:02}.jpg", file_id, position))
}

/// Convert a catalog-absolute path to a relative path for DB storage.
pub fn to_relative_path(catalog_root: &Path, absolute_path: &Path) -> String {
    absolute_path
        .strip_prefix(catalog_root)
        .map(|p| p.to_string_lossy().replace('\\', "/"))
        .unwrap_or_else(|_| absolute_path.to_string_lossy().to_string())
}

/// Ensure every chapter of a film has a thumbnail.
///
/// With a local source video, stills are extracted at each chapter's start
/// time. Without one, solid-color placeholder frames keep the animation path
/// working until real stills arrive (from a video or an XLS extraction).
pub fn build_chapter_thumbnails(
    conn: &Connection,
    catalog_root: &Path,
    film: &Film,
    video_path: Option<&Path>,
) -> Result<usize> {
    let chapters = schema::list_chapters(conn, film.id)?;
    let mut generated = 0;

    for chapter in &chapters {
        if chapter.thumbnail_path.is_some() {
            continue;
        }

        let output = chapter_thumb_output_path(catalog_root, &film.file_id, chapter.position);

        let result = match video_path {
            Some(video) => thumb::extract_chapter_still(video, &output, chapter.start_time_seconds),
            None => thumb::generate_placeholder_thumbnail(
                &output,
                sprite::palette_color(chapter.position as usize),
            ),
        };

        match result {
            Ok(()) => {
                let rel = to_relative_path(catalog_root, &output);
                schema::update_chapter_thumbnail(conn, chapter.id, &rel)?;
                generated += 1;
            }
            Err(e) => {
                warn!(
                    "Thumbnail for {} chapter {} failed: {}",
                    film.file_id, chapter.position, e
                );
            }
        }
    }

    Ok(generated)
}

/// Compose a film's sprite sheet from its chapter thumbnails and record the
/// sprite metadata on the film row. Returns the layout used.
pub fn build_film_sprite(
    conn: &Connection,
    catalog_root: &Path,
    film: &Film,
) -> Result<sprite::SpriteLayout> {
    let rel_paths = schema::chapter_thumbnail_paths(conn, film.id)?;
    if rel_paths.is_empty() {
        return Err(VaultError::Other(format!(
            "film {} has no chapter thumbnails to compose",
            film.file_id
        )));
    }

    let sources: Vec<PathBuf> = rel_paths.iter().map(|p| catalog_root.join(p)).collect();
    let layout = sprite::calculate_layout(film.duration_seconds, sources.len() as u32);

    let output = sprite_output_path(catalog_root, &film.file_id);
    sprite::compose_chapter_sprite(&sources, &output)?;
    sprite::verify_sprite(&output, layout.frame_count)?;

    let rel = to_relative_path(catalog_root, &output);
    schema::update_film_sprite(
        conn,
        film.id,
        &rel,
        layout.frame_count as i64,
        layout.frame_interval,
        SPRITE_FRAME_WIDTH as i64,
        SPRITE_FRAME_HEIGHT as i64,
    )?;

    info!(
        "Sprite for {}: {} frames at {:.2}s interval",
        film.file_id, layout.frame_count, layout.frame_interval
    );

    Ok(layout)
}

/// Extract a film's sprite sheet directly from a source video and record
/// the layout on the film row. Frame count follows the chapter count when
/// chapters exist, otherwise one frame per second up to the cap.
pub fn build_video_sprite(
    conn: &Connection,
    catalog_root: &Path,
    film: &Film,
    video_path: &Path,
) -> Result<sprite::SpriteLayout> {
    let duration = film.duration_seconds.unwrap_or(0);
    let chapter_count = schema::list_chapters(conn, film.id)?.len() as u32;
    let frame_count = if chapter_count > 0 {
        chapter_count
    } else {
        (duration.max(1) as u32).min(crate::constants::SPRITE_MAX_FRAMES)
    };

    let output = sprite_output_path(catalog_root, &film.file_id);
    let layout = sprite::extract_video_sprite(video_path, &output, duration, frame_count)?;
    sprite::verify_sprite(&output, layout.frame_count)?;

    let rel = to_relative_path(catalog_root, &output);
    schema::update_film_sprite(
        conn,
        film.id,
        &rel,
        layout.frame_count as i64,
        layout.frame_interval,
        SPRITE_FRAME_WIDTH as i64,
        SPRITE_FRAME_HEIGHT as i64,
    )?;

    Ok(layout)
}

/// Queue thumbnail and sprite jobs for a film.
pub fn queue_preview_jobs(conn: &Connection, film_id: i64) -> Result<()> {
    crate::jobs::create_job(conn, &NewJob {
        job_type: "chapter_thumbs".to_string(),
        film_id: Some(film_id),
        priority: 8,
        payload: "{}".to_string(),
    })?;

    crate::jobs::create_job(conn, &NewJob {
        job_type: "sprite".to_string(),
        film_id: Some(film_id),
        priority: 3,
        payload: "{}".to_string(),
    })?;

    Ok(())
}
