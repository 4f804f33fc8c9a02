// YouTube metadata cache and mapping application
//
// The catalog never talks to the YouTube API directly: yt-dlp dumps playlist
// metadata into a JSON cache, the matcher produces a mapping CSV, and this
// module applies reviewed mappings back onto film rows. Video descriptions
// carry "File ID: <id>" markers for exact re-matching.

use std::path::{Path, PathBuf};
use std::process::Command;

use regex::Regex;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::constants::{PLACEHOLDER_ID_PREFIX, YOUTUBE_CACHE_FILENAME, YOUTUBE_THUMB_VARIANTS};
use crate::db::schema::{self, Film};
use crate::error::{Result, VaultError};
use crate::matching::MatchCandidate;

/// One playlist entry in the metadata cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedVideo {
    pub video_id: String,
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub duration_seconds: Option<i64>,
    #[serde(default)]
    pub playlist_index: Option<i64>,
}

/// Cache file path under the vault folder.
pub fn cache_file_path(catalog_root: &Path) -> PathBuf {
    crate::db::get_cache_path(catalog_root).join(YOUTUBE_CACHE_FILENAME)
}

pub fn load_cache(path: &Path) -> Result<Vec<CachedVideo>> {
    let json = std::fs::read_to_string(path)
        .map_err(|_| VaultError::FileNotFound(path.display().to_string()))?;
    let videos: Vec<CachedVideo> = serde_json::from_str(&json)?;
    Ok(videos)
}

pub fn save_cache(path: &Path, videos: &[CachedVideo]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(videos)?;
    std::fs::write(path, json)?;
    Ok(())
}

/// yt-dlp's per-video JSON dump, reduced to the fields the cache keeps.
#[derive(Debug, Deserialize)]
struct YtDlpEntry {
    id: String,
    title: String,
    webpage_url: Option<String>,
    description: Option<String>,
    duration: Option<f64>,
    playlist_index: Option<i64>,
}

/// Refresh the metadata cache by dumping the playlist with yt-dlp.
pub fn refresh_cache(catalog_root: &Path, playlist_url: &str) -> Result<Vec<CachedVideo>> {
    let output = Command::new(crate::tools::ytdlp_path())
        .args(["--dump-json", "--ignore-errors", playlist_url])
        .output()
        .map_err(|e| VaultError::YtDlp(format!("Failed to run yt-dlp: {}", e)))?;

    if !output.status.success() && output.stdout.is_empty() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(VaultError::YtDlp(format!("yt-dlp failed: {}", stderr)));
    }

    // One JSON object per line; tolerate individual bad entries.
    let stdout = String::from_utf8_lossy(&output.stdout);
    let mut videos = Vec::new();
    for line in stdout.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<YtDlpEntry>(line) {
            Ok(entry) => videos.push(CachedVideo {
                url: entry.webpage_url.unwrap_or_else(|| {
                    format!("https://www.youtube.com/watch?v={}", entry.id)
                }),
                video_id: entry.id,
                title: entry.title,
                description: entry.description.unwrap_or_default(),
                duration_seconds: entry.duration.map(|d| d as i64),
                playlist_index: entry.playlist_index,
            }),
            Err(e) => warn!("Skipping unparseable yt-dlp entry: {}", e),
        }
    }

    let path = cache_file_path(catalog_root);
    save_cache(&path, &videos)?;
    info!("Cached metadata for {} videos at {}", videos.len(), path.display());

    Ok(videos)
}

/// Recover a file id embedded in a video description ("File ID: P-61_FROS").
pub fn extract_file_id(description: &str) -> Option<String> {
    static RE: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"File ID:\s*([A-Za-z0-9_\-]+)").unwrap());
    re.captures(description).map(|caps| caps[1].to_string())
}

/// Exact matches recovered from description markers: (file_id, video index).
pub fn direct_matches<'a>(videos: &'a [CachedVideo]) -> Vec<(String, &'a CachedVideo)> {
    videos
        .iter()
        .filter_map(|v| extract_file_id(&v.description).map(|fid| (fid, v)))
        .collect()
}

/// Derived thumbnail URLs for a video id (maxres, high, medium).
pub fn thumbnail_urls(youtube_id: &str) -> (String, String, String) {
    let [maxres, high, medium] = YOUTUBE_THUMB_VARIANTS;
    (
        format!("https://img.youtube.com/vi/{}/{}.jpg", youtube_id, maxres),
        format!("https://img.youtube.com/vi/{}/{}.jpg", youtube_id, high),
        format!("https://img.youtube.com/vi/{}/{}.jpg", youtube_id, medium),
    )
}

// ---------------------------------------------------------------------------
// Mapping CSV
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MappingRow {
    pub file_id: String,
    pub film_title: String,
    pub current_youtube_id: String,
    pub new_youtube_id: String,
    pub new_youtube_url: String,
    pub video_title: String,
    pub confidence_score: f64,
    pub confidence_level: String,
    pub action_needed: String,
}

pub fn write_mapping_csv(path: &Path, candidates: &[MatchCandidate]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;

    for c in candidates {
        writer.serialize(MappingRow {
            file_id: c.file_id.clone(),
            film_title: c.film_title.clone(),
            current_youtube_id: c.current_youtube_id.clone().unwrap_or_default(),
            new_youtube_id: c.video_id.clone(),
            new_youtube_url: c.video_url.clone(),
            video_title: c.video_title.clone(),
            confidence_score: (c.score * 1000.0).round() / 1000.0,
            confidence_level: c.confidence.label().to_string(),
            action_needed: c.confidence.action().to_string(),
        })?;
    }

    writer.flush()?;
    Ok(())
}

pub fn read_mapping_csv(path: &Path) -> Result<Vec<MappingRow>> {
    let mut reader = csv::Reader::from_path(path)
        .map_err(|_| VaultError::FileNotFound(path.display().to_string()))?;
    let rows = reader
        .deserialize()
        .collect::<std::result::Result<Vec<MappingRow>, _>>()?;
    Ok(rows)
}

// ---------------------------------------------------------------------------
// Apply / verify
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct ApplyStats {
    pub applied: usize,
    pub skipped_review: usize,
    pub skipped_missing: usize,
    pub errors: Vec<String>,
}

/// Apply a reviewed mapping CSV: set youtube_id/url and the derived
/// thumbnail URLs on each matched film. Rows needing review are skipped
/// unless their score clears the confidence floor.
pub fn apply_mapping(
    conn: &Connection,
    rows: &[MappingRow],
    min_confidence: f64,
    dry_run: bool,
) -> Result<ApplyStats> {
    let mut stats = ApplyStats::default();
    let tx = conn.unchecked_transaction()?;

    for row in rows {
        let apply = row.action_needed == "AUTO_APPLY" || row.confidence_score >= min_confidence;
        if !apply {
            stats.skipped_review += 1;
            continue;
        }

        let film = match schema::get_film_by_file_id(&tx, &row.file_id)? {
            Some(f) => f,
            None => {
                stats.skipped_missing += 1;
                warn!("Mapping row for unknown film {}", row.file_id);
                continue;
            }
        };

        let (maxres, high, medium) = thumbnail_urls(&row.new_youtube_id);
        match schema::update_film_youtube(
            &tx,
            film.id,
            &row.new_youtube_id,
            &row.new_youtube_url,
            &maxres,
            &high,
            &medium,
        ) {
            Ok(()) => stats.applied += 1,
            Err(e) => {
                // Usually a duplicate youtube_id; record and keep going.
                stats.errors.push(format!("{}: {}", row.file_id, e));
            }
        }
    }

    if dry_run {
        tx.rollback()?;
    } else {
        tx.commit()?;
    }

    Ok(stats)
}

/// Store cached playlist positions on mapped films. Returns the number of
/// films updated.
pub fn sync_playlist_order(conn: &Connection, videos: &[CachedVideo]) -> Result<usize> {
    let mut updated = 0;
    for video in videos {
        let index = match video.playlist_index {
            Some(i) => i,
            None => continue,
        };
        if let Some(film) = schema::get_film_by_youtube_id(conn, &video.video_id)? {
            schema::update_film_playlist_order(conn, film.id, index)?;
            updated += 1;
        }
    }
    Ok(updated)
}

/// Films whose youtube_id is still a placeholder (or missing entirely).
pub fn unmapped_films(conn: &Connection) -> Result<Vec<Film>> {
    let films = schema::all_films(conn)?;
    Ok(films
        .into_iter()
        .filter(|f| match &f.youtube_id {
            Some(id) => id.starts_with(PLACEHOLDER_ID_PREFIX),
            None => true,
        })
        .collect())
}

#[derive(Debug, Default)]
pub struct MappingReport {
    pub unknown_film_ids: Vec<String>,
    pub duplicate_video_ids: Vec<String>,
}

/// Validate a mapping CSV against the catalog before applying it:
/// rows naming films that don't exist, and video ids assigned to more than
/// one film.
pub fn verify_mapping_rows(conn: &Connection, rows: &[MappingRow]) -> Result<MappingReport> {
    let mut report = MappingReport::default();
    let mut seen = std::collections::HashMap::new();

    for row in rows {
        if schema::get_film_by_file_id(conn, &row.file_id)?.is_none() {
            report.unknown_film_ids.push(row.file_id.clone());
        }
        let entry = seen.entry(row.new_youtube_id.clone()).or_insert(0usize);
        *entry += 1;
        if *entry == 2 {
            report.duplicate_video_ids.push(row.new_youtube_id.clone());
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::Confidence;
    use tempfile::TempDir;

    fn setup_test_db() -> rusqlite::Connection {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA foreign_keys = ON;").unwrap();
        crate::db::migrations::run_migrations(&conn).unwrap();
        conn
    }

    fn seed_film(conn: &Connection, file_id: &str) -> i64 {
        schema::upsert_film(
            conn,
            &schema::NewFilm {
                file_id: file_id.to_string(),
                title: format!("Film {}", file_id),
                youtube_id: Some(format!("{}{}", PLACEHOLDER_ID_PREFIX, file_id)),
                ..Default::default()
            },
        )
        .unwrap()
    }

    #[test]
    fn test_extract_file_id() {
        assert_eq!(
            extract_file_id("Family film.\n\nFile ID: P-61_FROS\nScanned 2023"),
            Some("P-61_FROS".to_string())
        );
        assert_eq!(extract_file_id("File ID:RLD-R01"), Some("RLD-R01".to_string()));
        assert_eq!(extract_file_id("no marker here"), None);
    }

    #[test]
    fn test_cache_round_trip() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("cache.json");
        let videos = vec![CachedVideo {
            video_id: "abc123".to_string(),
            title: "Fresno Trip".to_string(),
            url: "https://www.youtube.com/watch?v=abc123".to_string(),
            description: "File ID: P-61_FROS".to_string(),
            duration_seconds: Some(566),
            playlist_index: Some(3),
        }];

        save_cache(&path, &videos).unwrap();
        let loaded = load_cache(&path).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].video_id, "abc123");
        assert_eq!(loaded[0].duration_seconds, Some(566));
    }

    #[test]
    fn test_direct_matches() {
        let videos = vec![
            CachedVideo {
                video_id: "a".into(),
                title: "t".into(),
                url: "u".into(),
                description: "File ID: X-01".into(),
                duration_seconds: None,
                playlist_index: None,
            },
            CachedVideo {
                video_id: "b".into(),
                title: "t".into(),
                url: "u".into(),
                description: "nothing".into(),
                duration_seconds: None,
                playlist_index: None,
            },
        ];
        let matches = direct_matches(&videos);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].0, "X-01");
    }

    #[test]
    fn test_mapping_csv_round_trip() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("mapping.csv");

        let candidates = vec![MatchCandidate {
            file_id: "P-61_FROS".into(),
            film_title: "Fresno Trip".into(),
            current_youtube_id: Some("placeholder_P-61_FROS".into()),
            video_id: "abc123".into(),
            video_url: "https://www.youtube.com/watch?v=abc123".into(),
            video_title: "Fresno Trip 1955".into(),
            score: 0.873,
            confidence: Confidence::High,
        }];

        write_mapping_csv(&path, &candidates).unwrap();
        let rows = read_mapping_csv(&path).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].file_id, "P-61_FROS");
        assert_eq!(rows[0].new_youtube_id, "abc123");
        assert_eq!(rows[0].action_needed, "AUTO_APPLY");
    }

    #[test]
    fn test_apply_mapping_updates_film() {
        let conn = setup_test_db();
        seed_film(&conn, "P-61_FROS");

        let rows = vec![MappingRow {
            file_id: "P-61_FROS".into(),
            film_title: "Film".into(),
            current_youtube_id: "placeholder_P-61_FROS".into(),
            new_youtube_id: "abc123".into(),
            new_youtube_url: "https://www.youtube.com/watch?v=abc123".into(),
            video_title: "Fresno Trip 1955".into(),
            confidence_score: 0.87,
            confidence_level: "High Confidence".into(),
            action_needed: "AUTO_APPLY".into(),
        }];

        let stats = apply_mapping(&conn, &rows, 0.6, false).unwrap();
        assert_eq!(stats.applied, 1);
        assert!(stats.errors.is_empty());

        let film = schema::get_film_by_file_id(&conn, "P-61_FROS").unwrap().unwrap();
        assert_eq!(film.youtube_id.as_deref(), Some("abc123"));
        assert_eq!(
            film.thumbnail_url.as_deref(),
            Some("https://img.youtube.com/vi/abc123/maxresdefault.jpg")
        );
        assert_eq!(
            film.thumbnail_medium_url.as_deref(),
            Some("https://img.youtube.com/vi/abc123/mqdefault.jpg")
        );
        assert!(unmapped_films(&conn).unwrap().is_empty());
    }

    #[test]
    fn test_apply_mapping_skips_review_rows() {
        let conn = setup_test_db();
        seed_film(&conn, "A-01");

        let rows = vec![MappingRow {
            file_id: "A-01".into(),
            film_title: "Film".into(),
            current_youtube_id: "".into(),
            new_youtube_id: "vid1".into(),
            new_youtube_url: "u".into(),
            video_title: "t".into(),
            confidence_score: 0.45,
            confidence_level: "Medium Confidence".into(),
            action_needed: "REVIEW_RECOMMENDED".into(),
        }];

        let stats = apply_mapping(&conn, &rows, 0.6, false).unwrap();
        assert_eq!(stats.applied, 0);
        assert_eq!(stats.skipped_review, 1);

        // Lowering the floor applies it
        let stats = apply_mapping(&conn, &rows, 0.4, false).unwrap();
        assert_eq!(stats.applied, 1);
    }

    #[test]
    fn test_apply_mapping_dry_run_rolls_back() {
        let conn = setup_test_db();
        seed_film(&conn, "A-01");

        let rows = vec![MappingRow {
            file_id: "A-01".into(),
            film_title: "Film".into(),
            current_youtube_id: "".into(),
            new_youtube_id: "vid1".into(),
            new_youtube_url: "u".into(),
            video_title: "t".into(),
            confidence_score: 0.9,
            confidence_level: "High Confidence".into(),
            action_needed: "AUTO_APPLY".into(),
        }];

        let stats = apply_mapping(&conn, &rows, 0.6, true).unwrap();
        assert_eq!(stats.applied, 1);

        let film = schema::get_film_by_file_id(&conn, "A-01").unwrap().unwrap();
        assert_eq!(film.youtube_id.as_deref(), Some("placeholder_A-01"));
    }

    #[test]
    fn test_sync_playlist_order() {
        let conn = setup_test_db();
        let film_id = seed_film(&conn, "A-01");
        conn.execute(
            "UPDATE films SET youtube_id = 'abc123' WHERE id = ?1",
            [film_id],
        )
        .unwrap();

        let videos = vec![CachedVideo {
            video_id: "abc123".to_string(),
            title: "t".to_string(),
            url: "u".to_string(),
            description: String::new(),
            duration_seconds: None,
            playlist_index: Some(7),
        }];

        let updated = sync_playlist_order(&conn, &videos).unwrap();
        assert_eq!(updated, 1);

        let film = schema::get_film_by_file_id(&conn, "A-01").unwrap().unwrap();
        assert_eq!(film.playlist_order, Some(7));
    }

    #[test]
    fn test_verify_mapping_rows() {
        let conn = setup_test_db();
        seed_film(&conn, "A-01");

        let row = |fid: &str, vid: &str| MappingRow {
            file_id: fid.into(),
            film_title: "f".into(),
            current_youtube_id: "".into(),
            new_youtube_id: vid.into(),
            new_youtube_url: "u".into(),
            video_title: "t".into(),
            confidence_score: 0.9,
            confidence_level: "High Confidence".into(),
            action_needed: "AUTO_APPLY".into(),
        };

        let rows = vec![row("A-01", "v1"), row("GHOST", "v1")];
        let report = verify_mapping_rows(&conn, &rows).unwrap();
        assert_eq!(report.unknown_film_ids, vec!["GHOST".to_string()]);
        assert_eq!(report.duplicate_video_ids, vec!["v1".to_string()]);
    }
}
