// Catalog import pipeline
//
// Two sources feed the catalog: the master film CSV (one row per reel) and
// per-film chapter sheets exported from the scanning workbooks. Both are
// hand-maintained, so every row is processed independently: a bad row is
// recorded and skipped, never fatal.

pub mod bitfield;
pub mod parse;

#[cfg(test)]
mod tests;

use std::collections::HashMap;
use std::path::Path;

use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::db::schema::{
    self, NewFilm, NewJob,
    upsert_film, upsert_chapter, get_or_create_person, get_or_create_location,
    get_or_create_tag, link_film_person, link_film_location, link_film_tag,
    link_chapter_person, link_chapter_location, link_chapter_tag,
    refresh_chapter_flags, insert_import_row, update_import_row_complete,
    update_import_row_failed, update_job_progress,
};
use crate::error::{Result, VaultError};

/// Fixed tag columns in the master sheet, mapped to tag categories.
const FILM_TAG_COLUMNS: [(&str, &str); 5] = [
    ("Tag: Ruth", "people"),
    ("Tag: Disney", "themes"),
    ("Tag: SF", "places"),
    ("Tag: Needs Edit", "other"),
    ("Tag: Theme Park", "activities"),
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportPayload {
    pub csv_path: String,
    pub playlist_url: String,
}

#[derive(Debug, Default)]
pub struct ImportStats {
    pub films: usize,
    pub chapters: usize,
    pub people: usize,
    pub locations: usize,
    pub tags: usize,
    pub errors: Vec<String>,
}

#[derive(Debug, Default)]
struct RowStats {
    chapters: usize,
    people: usize,
    locations: usize,
    tags: usize,
}

/// Create a durable import job for a CSV file.
pub fn create_import_job(conn: &Connection, csv_path: &str, playlist_url: &str) -> Result<i64> {
    let payload = ImportPayload {
        csv_path: csv_path.to_string(),
        playlist_url: playlist_url.to_string(),
    };

    let job = NewJob {
        job_type: "import".to_string(),
        film_id: None,
        priority: 10,
        payload: serde_json::to_string(&payload)?,
    };

    schema::insert_job(conn, &job)
}

/// Run an import job created by create_import_job.
pub fn run_import_job(conn: &Connection, job_id: i64) -> Result<ImportStats> {
    let job = schema::get_job(conn, job_id)?
        .ok_or(VaultError::JobNotFound(job_id))?;
    let payload: ImportPayload = serde_json::from_str(&job.payload)?;

    schema::update_job_status(conn, job_id, "running")?;

    let result = run_import(conn, Path::new(&payload.csv_path), &payload.playlist_url, false, Some(job_id));

    match &result {
        Ok(stats) => {
            let final_status = if !stats.errors.is_empty() && stats.films == 0 {
                "failed"
            } else {
                "completed"
            };
            schema::update_job_status(conn, job_id, final_status)?;
        }
        Err(_) => {
            schema::update_job_status(conn, job_id, "failed")?;
        }
    }

    result
}

/// Import the master film CSV. The whole run is one transaction; --dry-run
/// parses and counts everything, then rolls back.
pub fn run_import(
    conn: &Connection,
    csv_path: &Path,
    playlist_url: &str,
    dry_run: bool,
    job_id: Option<i64>,
) -> Result<ImportStats> {
    let content = std::fs::read_to_string(csv_path)
        .map_err(|_| VaultError::FileNotFound(csv_path.display().to_string()))?;

    // The sheet carries front matter above the column headers.
    let header_offset = find_header_offset(&content)
        .ok_or_else(|| VaultError::Import("header row not found (expected Filenames/Years/People columns)".to_string()))?;

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(content[header_offset..].as_bytes());

    let headers = header_index(reader.headers()?);
    let playlist_id = extract_playlist_id(playlist_url).unwrap_or_default();

    let records: Vec<csv::StringRecord> = reader.records()
        .collect::<std::result::Result<Vec<_>, _>>()?;
    let total = records.len();

    let mut stats = ImportStats::default();

    // Shared-ref transaction: the job runner hands out &Connection.
    let tx = conn.unchecked_transaction()?;

    for (idx, record) in records.iter().enumerate() {
        let row_number = (idx + 2) as i64; // 1-based, after the header row

        let file_id = field(record, &headers, "Filenames").to_string();
        let title = field(record, &headers, "Title");
        if file_id.is_empty() || title.is_empty() {
            continue;
        }

        let import_row_id = match job_id {
            Some(jid) => Some(insert_import_row(&tx, jid, row_number, &file_id)?),
            None => None,
        };

        match process_film_row(&tx, record, &headers, &playlist_id) {
            Ok((film_id, row_stats)) => {
                stats.films += 1;
                stats.chapters += row_stats.chapters;
                stats.people += row_stats.people;
                stats.locations += row_stats.locations;
                stats.tags += row_stats.tags;

                if let Some(rid) = import_row_id {
                    update_import_row_complete(&tx, rid, film_id)?;
                }
                if stats.films % 10 == 0 {
                    info!("Processed {} films...", stats.films);
                }
            }
            Err(e) => {
                let msg = format!("row {} ({}): {}", row_number, file_id, e);
                warn!("Import error: {}", msg);
                if let Some(rid) = import_row_id {
                    update_import_row_failed(&tx, rid, &e.to_string())?;
                }
                stats.errors.push(msg);
            }
        }

        if let Some(jid) = job_id {
            let progress = ((idx + 1) * 100 / total.max(1)) as i32;
            update_job_progress(&tx, jid, progress)?;
        }
    }

    if dry_run {
        tx.rollback()?;
    } else {
        tx.commit()?;
    }

    Ok(stats)
}

/// Process one film row: upsert the film, then link people, locations, tags
/// and chapters.
fn process_film_row(
    conn: &Connection,
    record: &csv::StringRecord,
    headers: &HashMap<String, usize>,
    playlist_id: &str,
) -> Result<(i64, RowStats)> {
    let file_id = field(record, headers, "Filenames").to_string();

    // Unmapped films carry a placeholder id until the YouTube matcher runs.
    let youtube_id = format!("{}{}", crate::constants::PLACEHOLDER_ID_PREFIX, file_id);
    let youtube_url = format!(
        "https://www.youtube.com/watch?v={}&list={}",
        youtube_id, playlist_id
    );
    let thumbnail_url = format!("https://img.youtube.com/vi/{}/maxresdefault.jpg", youtube_id);

    let film = NewFilm {
        file_id: file_id.clone(),
        title: field(record, headers, "Title").to_string(),
        description: field(record, headers, "Description").to_string(),
        summary: field(record, headers, "Summary").to_string(),
        youtube_id: Some(youtube_id),
        youtube_url: Some(youtube_url),
        duration_seconds: parse::parse_duration_seconds(field(record, headers, "Duration at 23.97 fps")),
        thumbnail_url: Some(thumbnail_url),
        years: field(record, headers, "Years").to_string(),
        technical_notes: field(record, headers, "Tech Notes").to_string(),
        workflow_state: field(record, headers, "Workflow State").to_string(),
    };
    let film_id = upsert_film(conn, &film)?;

    let mut stats = RowStats::default();

    // People
    for name in parse::parse_people_list(field(record, headers, "People")) {
        if let Some((first, last)) = parse::split_person_name(&name) {
            let person_id = get_or_create_person(conn, &first, &last, &format!("Imported from CSV: {}", name))?;
            link_film_person(conn, film_id, person_id)?;
            stats.people += 1;
        }
    }

    // Locations
    for loc in parse::parse_locations_list(field(record, headers, "Location")) {
        let (name, city, state) = parse::split_location_name(&loc);
        let location_id = get_or_create_location(conn, &name, &city, &state, "Imported from CSV")?;
        link_film_location(conn, film_id, location_id)?;
        stats.locations += 1;
    }

    // Fixed tag columns plus the Format column
    for (column, category) in FILM_TAG_COLUMNS {
        if !field(record, headers, column).is_empty() {
            let tag_name = column.trim_start_matches("Tag: ").trim();
            let tag = get_or_create_tag(conn, tag_name, category, "Imported from CSV")?;
            link_film_tag(conn, film_id, &tag, false)?;
            stats.tags += 1;
        }
    }
    let format_val = field(record, headers, "Format");
    if !format_val.is_empty() {
        let tag = get_or_create_tag(conn, format_val, "other", "Imported from CSV")?;
        link_film_tag(conn, film_id, &tag, false)?;
        stats.tags += 1;
    }

    // Chapters from the multi-line cell
    for (position, (start_time, title)) in
        parse::parse_chapter_lines(field(record, headers, "Chapters")).iter().enumerate()
    {
        let start_time_seconds = parse::parse_time_to_seconds(start_time)?;
        let title: String = title.chars().take(500).collect();
        upsert_chapter(
            conn,
            film_id,
            (position + 1) as i64,
            start_time,
            start_time_seconds,
            &title,
            "",
            "",
        )?;
        stats.chapters += 1;
    }

    Ok((film_id, stats))
}

/// Byte offset of the line containing the column headers.
fn find_header_offset(content: &str) -> Option<usize> {
    let mut offset = 0;
    for line in content.split_inclusive('\n') {
        if line.contains("Filenames") && line.contains("Years") && line.contains("People") {
            return Some(offset);
        }
        offset += line.len();
    }
    None
}

/// Header name -> column index, trimmed.
fn header_index(headers: &csv::StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (name.trim().to_string(), idx))
        .collect()
}

/// Field by header name, trimmed; absent columns read as empty.
fn field<'a>(
    record: &'a csv::StringRecord,
    headers: &HashMap<String, usize>,
    name: &str,
) -> &'a str {
    headers
        .get(name)
        .and_then(|&idx| record.get(idx))
        .map(|v| v.trim())
        .unwrap_or("")
}

/// Extract the playlist id from a YouTube playlist URL (the `list` query
/// parameter).
pub fn extract_playlist_id(url: &str) -> Option<String> {
    let query = url.split_once('?')?.1;
    for pair in query.split('&') {
        if let Some((key, value)) = pair.split_once('=') {
            if key == "list" && !value.is_empty() {
                return Some(value.to_string());
            }
        }
    }
    None
}

// ---------------------------------------------------------------------------
// Chapter sheet import
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct ChapterSheetStats {
    pub chapters: usize,
    pub people: usize,
    pub locations: usize,
    pub tags: usize,
    pub errors: Vec<String>,
}

/// Import a per-film chapter sheet (CSV export of the scanning workbook).
/// Rows carry a start timecode, a title, and the presence bitfield plus
/// free-text people/locations/tags columns.
pub fn run_chapter_sheet_import(
    conn: &Connection,
    film_file_id: &str,
    csv_path: &Path,
    dry_run: bool,
) -> Result<ChapterSheetStats> {
    let film = schema::get_film_by_file_id(conn, film_file_id)?
        .ok_or_else(|| VaultError::FilmNotFound(film_file_id.to_string()))?;

    let content = std::fs::read_to_string(csv_path)
        .map_err(|_| VaultError::FileNotFound(csv_path.display().to_string()))?;

    // The bitfield key is declared in a cell above the header row.
    let key = find_bitfield_key(&content).unwrap_or_else(bitfield::default_key);

    let header_offset = find_chapter_header_offset(&content)
        .ok_or_else(|| VaultError::Import("chapter sheet header row not found".to_string()))?;

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(content[header_offset..].as_bytes());

    // Chapter sheet headers vary in case across batches.
    let headers: HashMap<String, usize> = reader.headers()?
        .iter()
        .enumerate()
        .map(|(idx, name)| (name.trim().to_lowercase(), idx))
        .collect();

    let records: Vec<csv::StringRecord> = reader.records()
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut stats = ChapterSheetStats::default();
    let tx = conn.unchecked_transaction()?;
    let mut position = 0i64;

    for (idx, record) in records.iter().enumerate() {
        let title = lower_field(record, &headers, &["title"]).to_string();
        if title.is_empty() {
            continue;
        }

        position += 1;
        match process_chapter_row(&tx, film.id, position, &title, record, &headers, &key) {
            Ok(row_stats) => {
                stats.chapters += 1;
                stats.people += row_stats.people;
                stats.locations += row_stats.locations;
                stats.tags += row_stats.tags;
            }
            Err(e) => {
                let msg = format!("row {}: {}", idx + 2, e);
                warn!("Chapter sheet error: {}", msg);
                stats.errors.push(msg);
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

fn process_chapter_row(
    conn: &Connection,
    film_id: i64,
    position: i64,
    title: &str,
    record: &csv::StringRecord,
    headers: &HashMap<String, usize>,
    key: &[String],
) -> Result<RowStats> {
    let start_time = lower_field(
        record,
        headers,
        &["start time", "16fps start timecode", "18fps start timecode"],
    ).to_string();
    if start_time.is_empty() {
        return Err(VaultError::Import("chapter row has no start time".to_string()));
    }
    let start_time_seconds = parse::parse_time_to_seconds(&start_time)?;

    let description = lower_field(record, headers, &["description"]).to_string();
    let years = lower_field(record, headers, &["years", "year"]).to_string();

    let chapter_id = upsert_chapter(
        conn,
        film_id,
        position,
        &start_time,
        start_time_seconds,
        title,
        &description,
        &years,
    )?;

    let mut stats = RowStats::default();

    // Presence bitfield
    let bits = lower_field(record, headers, &["haywards present"]);
    if bitfield::is_bitfield_cell(bits) {
        for name in bitfield::decode_bitfield(bits, key)? {
            if let Some((first, last)) = parse::split_person_name(&name) {
                let person_id = get_or_create_person(conn, &first, &last, "")?;
                link_chapter_person(conn, chapter_id, person_id, None)?;
                stats.people += 1;
            }
        }
    }

    // Free-text people beyond the fixed family slots
    for name in parse::parse_people_list(lower_field(record, headers, &["other people"])) {
        if let Some((first, last)) = parse::split_person_name(&name) {
            let person_id = get_or_create_person(conn, &first, &last, "")?;
            link_chapter_person(conn, chapter_id, person_id, None)?;
            stats.people += 1;
        }
    }

    for loc in parse::parse_locations_list(lower_field(record, headers, &["locations", "location"])) {
        let (name, city, state) = parse::split_location_name(&loc);
        let location_id = get_or_create_location(conn, &name, &city, &state, "")?;
        link_chapter_location(conn, chapter_id, location_id)?;
        stats.locations += 1;
    }

    for tag_name in lower_field(record, headers, &["tags"])
        .split(',')
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
    {
        let tag = get_or_create_tag(conn, tag_name, "other", "")?;
        link_chapter_tag(conn, chapter_id, &tag, false)?;
        stats.tags += 1;
    }

    refresh_chapter_flags(conn, chapter_id)?;

    Ok(stats)
}

/// Scan the rows above the data for a "bitfield: A, B, C, D" cell.
fn find_bitfield_key(content: &str) -> Option<Vec<String>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    for record in reader.records().take(10).flatten() {
        for cell in record.iter() {
            if let Some(key) = bitfield::parse_bitfield_key(cell) {
                return Some(key);
            }
        }
    }
    None
}

/// Byte offset of the chapter sheet header row (contains "start" and "title").
fn find_chapter_header_offset(content: &str) -> Option<usize> {
    let mut offset = 0;
    for line in content.split_inclusive('\n') {
        let lower = line.to_lowercase();
        if lower.contains("start") && lower.contains("title") {
            return Some(offset);
        }
        offset += line.len();
    }
    None
}

/// Field lookup over lowercased headers, first matching candidate wins.
fn lower_field<'a>(
    record: &'a csv::StringRecord,
    headers: &HashMap<String, usize>,
    candidates: &[&str],
) -> &'a str {
    for name in candidates {
        if let Some(&idx) = headers.get(*name) {
            if let Some(value) = record.get(idx) {
                let value = value.trim();
                if !value.is_empty() && value.to_lowercase() != "nan" {
                    return value;
                }
            }
        }
    }
    ""
}
