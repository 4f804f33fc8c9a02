// Database schema types and query helpers

use rusqlite::{Connection, params, OptionalExtension};
use serde::{Deserialize, Serialize};
use crate::error::Result;

// ----- Film -----

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Film {
    pub id: i64,
    pub file_id: String,
    pub title: String,
    pub description: String,
    pub summary: String,
    pub youtube_id: Option<String>,
    pub youtube_url: Option<String>,
    pub duration_seconds: Option<i64>,
    pub upload_date: Option<String>,
    pub thumbnail_url: Option<String>,
    pub thumbnail_high_url: Option<String>,
    pub thumbnail_medium_url: Option<String>,
    pub preview_sprite_path: Option<String>,
    pub preview_frame_count: i64,
    pub preview_frame_interval: f64,
    pub preview_frame_width: i64,
    pub preview_frame_height: i64,
    pub years: String,
    pub technical_notes: String,
    pub workflow_state: String,
    pub playlist_order: Option<i64>,
    pub created_at: String,
}

#[derive(Debug, Clone, Default)]
pub struct NewFilm {
    pub file_id: String,
    pub title: String,
    pub description: String,
    pub summary: String,
    pub youtube_id: Option<String>,
    pub youtube_url: Option<String>,
    pub duration_seconds: Option<i64>,
    pub thumbnail_url: Option<String>,
    pub years: String,
    pub technical_notes: String,
    pub workflow_state: String,
}

const FILM_COLUMNS: &str =
    "id, file_id, title, description, summary, youtube_id, youtube_url, duration_seconds,
     upload_date, thumbnail_url, thumbnail_high_url, thumbnail_medium_url,
     preview_sprite_path, preview_frame_count, preview_frame_interval,
     preview_frame_width, preview_frame_height, years, technical_notes,
     workflow_state, playlist_order, created_at";

fn map_film(row: &rusqlite::Row) -> rusqlite::Result<Film> {
    Ok(Film {
        id: row.get(0)?,
        file_id: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        summary: row.get(4)?,
        youtube_id: row.get(5)?,
        youtube_url: row.get(6)?,
        duration_seconds: row.get(7)?,
        upload_date: row.get(8)?,
        thumbnail_url: row.get(9)?,
        thumbnail_high_url: row.get(10)?,
        thumbnail_medium_url: row.get(11)?,
        preview_sprite_path: row.get(12)?,
        preview_frame_count: row.get(13)?,
        preview_frame_interval: row.get(14)?,
        preview_frame_width: row.get(15)?,
        preview_frame_height: row.get(16)?,
        years: row.get(17)?,
        technical_notes: row.get(18)?,
        workflow_state: row.get(19)?,
        playlist_order: row.get(20)?,
        created_at: row.get(21)?,
    })
}

/// Insert a film or update the existing row with the same file_id.
/// Returns the film id. Re-importing a row never creates a second film.
pub fn upsert_film(conn: &Connection, film: &NewFilm) -> Result<i64> {
    conn.execute(
        "INSERT INTO films (file_id, title, description, summary, youtube_id, youtube_url,
                            duration_seconds, thumbnail_url, years, technical_notes, workflow_state)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
         ON CONFLICT(file_id) DO UPDATE SET
            title = excluded.title,
            description = excluded.description,
            summary = excluded.summary,
            duration_seconds = excluded.duration_seconds,
            years = excluded.years,
            technical_notes = excluded.technical_notes,
            workflow_state = excluded.workflow_state",
        params![
            film.file_id,
            film.title,
            film.description,
            film.summary,
            film.youtube_id,
            film.youtube_url,
            film.duration_seconds,
            film.thumbnail_url,
            film.years,
            film.technical_notes,
            film.workflow_state,
        ],
    )?;

    let id: i64 = conn.query_row(
        "SELECT id FROM films WHERE file_id = ?1",
        params![film.file_id],
        |row| row.get(0),
    )?;
    Ok(id)
}

pub fn get_film(conn: &Connection, id: i64) -> Result<Option<Film>> {
    let result = conn.query_row(
        &format!("SELECT {} FROM films WHERE id = ?1", FILM_COLUMNS),
        params![id],
        map_film,
    ).optional()?;
    Ok(result)
}

pub fn get_film_by_file_id(conn: &Connection, file_id: &str) -> Result<Option<Film>> {
    let result = conn.query_row(
        &format!("SELECT {} FROM films WHERE file_id = ?1", FILM_COLUMNS),
        params![file_id],
        map_film,
    ).optional()?;
    Ok(result)
}

pub fn get_film_by_youtube_id(conn: &Connection, youtube_id: &str) -> Result<Option<Film>> {
    let result = conn.query_row(
        &format!("SELECT {} FROM films WHERE youtube_id = ?1", FILM_COLUMNS),
        params![youtube_id],
        map_film,
    ).optional()?;
    Ok(result)
}

/// List films visible in the catalog (placeholder-mapped films excluded),
/// newest upload first.
pub fn list_films(conn: &Connection, limit: i64, offset: i64) -> Result<Vec<Film>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM films
         WHERE youtube_id IS NULL OR youtube_id NOT LIKE 'placeholder\\_%' ESCAPE '\\'
         ORDER BY upload_date DESC, title ASC
         LIMIT ?1 OFFSET ?2",
        FILM_COLUMNS
    ))?;

    let films = stmt.query_map(params![limit, offset], map_film)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(films)
}

pub fn count_films(conn: &Connection) -> Result<i64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM films WHERE youtube_id IS NULL OR youtube_id NOT LIKE 'placeholder\\_%' ESCAPE '\\'",
        [],
        |row| row.get(0),
    )?;
    Ok(count)
}

/// Every film, placeholders included (matching and maintenance passes).
pub fn all_films(conn: &Connection) -> Result<Vec<Film>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM films ORDER BY file_id ASC",
        FILM_COLUMNS
    ))?;
    let films = stmt.query_map([], map_film)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(films)
}

/// Set the YouTube mapping and derived thumbnail URLs for a film.
pub fn update_film_youtube(
    conn: &Connection,
    id: i64,
    youtube_id: &str,
    youtube_url: &str,
    thumbnail_url: &str,
    thumbnail_high_url: &str,
    thumbnail_medium_url: &str,
) -> Result<()> {
    conn.execute(
        "UPDATE films SET youtube_id = ?1, youtube_url = ?2, thumbnail_url = ?3,
                          thumbnail_high_url = ?4, thumbnail_medium_url = ?5
         WHERE id = ?6",
        params![youtube_id, youtube_url, thumbnail_url, thumbnail_high_url, thumbnail_medium_url, id],
    )?;
    Ok(())
}

/// Record generated sprite sheet metadata on a film.
pub fn update_film_sprite(
    conn: &Connection,
    id: i64,
    sprite_path: &str,
    frame_count: i64,
    frame_interval: f64,
    frame_width: i64,
    frame_height: i64,
) -> Result<()> {
    conn.execute(
        "UPDATE films SET preview_sprite_path = ?1, preview_frame_count = ?2,
                          preview_frame_interval = ?3, preview_frame_width = ?4,
                          preview_frame_height = ?5
         WHERE id = ?6",
        params![sprite_path, frame_count, frame_interval, frame_width, frame_height, id],
    )?;
    Ok(())
}

pub fn update_film_duration(conn: &Connection, id: i64, duration_seconds: i64) -> Result<()> {
    conn.execute(
        "UPDATE films SET duration_seconds = ?1 WHERE id = ?2",
        params![duration_seconds, id],
    )?;
    Ok(())
}

pub fn update_film_playlist_order(conn: &Connection, id: i64, playlist_order: i64) -> Result<()> {
    conn.execute(
        "UPDATE films SET playlist_order = ?1 WHERE id = ?2",
        params![playlist_order, id],
    )?;
    Ok(())
}

// ----- Chapter -----

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chapter {
    pub id: i64,
    pub film_id: i64,
    pub position: i64,
    pub start_time: String,
    pub start_time_seconds: i64,
    pub title: String,
    pub description: String,
    pub years: String,
    pub thumbnail_path: Option<String>,
    pub has_people: bool,
    pub has_locations: bool,
    pub has_tags: bool,
    pub has_years: bool,
}

const CHAPTER_COLUMNS: &str =
    "id, film_id, position, start_time, start_time_seconds, title, description, years,
     thumbnail_path, has_people, has_locations, has_tags, has_years";

fn map_chapter(row: &rusqlite::Row) -> rusqlite::Result<Chapter> {
    Ok(Chapter {
        id: row.get(0)?,
        film_id: row.get(1)?,
        position: row.get(2)?,
        start_time: row.get(3)?,
        start_time_seconds: row.get(4)?,
        title: row.get(5)?,
        description: row.get(6)?,
        years: row.get(7)?,
        thumbnail_path: row.get(8)?,
        has_people: row.get(9)?,
        has_locations: row.get(10)?,
        has_tags: row.get(11)?,
        has_years: row.get(12)?,
    })
}

/// Insert a chapter or update the existing one at the same position.
/// start_time_seconds must be the parse of start_time; callers go through
/// import::parse::parse_time_to_seconds.
pub fn upsert_chapter(
    conn: &Connection,
    film_id: i64,
    position: i64,
    start_time: &str,
    start_time_seconds: i64,
    title: &str,
    description: &str,
    years: &str,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO chapters (film_id, position, start_time, start_time_seconds, title, description, years)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
         ON CONFLICT(film_id, position) DO UPDATE SET
            start_time = excluded.start_time,
            start_time_seconds = excluded.start_time_seconds,
            title = excluded.title,
            description = excluded.description,
            years = excluded.years",
        params![film_id, position, start_time, start_time_seconds, title, description, years],
    )?;

    let id: i64 = conn.query_row(
        "SELECT id FROM chapters WHERE film_id = ?1 AND position = ?2",
        params![film_id, position],
        |row| row.get(0),
    )?;
    Ok(id)
}

pub fn list_chapters(conn: &Connection, film_id: i64) -> Result<Vec<Chapter>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM chapters WHERE film_id = ?1 ORDER BY position ASC",
        CHAPTER_COLUMNS
    ))?;
    let chapters = stmt.query_map(params![film_id], map_chapter)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(chapters)
}

pub fn update_chapter_thumbnail(conn: &Connection, id: i64, thumbnail_path: &str) -> Result<()> {
    conn.execute(
        "UPDATE chapters SET thumbnail_path = ?1 WHERE id = ?2",
        params![thumbnail_path, id],
    )?;
    Ok(())
}

/// Recompute the metadata-presence flags from the association tables.
pub fn refresh_chapter_flags(conn: &Connection, chapter_id: i64) -> Result<()> {
    conn.execute(
        "UPDATE chapters SET
            has_people = EXISTS (SELECT 1 FROM chapter_people WHERE chapter_id = ?1),
            has_locations = EXISTS (SELECT 1 FROM chapter_locations WHERE chapter_id = ?1),
            has_tags = EXISTS (SELECT 1 FROM chapter_tags WHERE chapter_id = ?1),
            has_years = (SELECT trim(years) != '' FROM chapters WHERE id = ?1)
         WHERE id = ?1",
        params![chapter_id],
    )?;
    Ok(())
}

/// Ordered thumbnail paths for a film's chapters (sprite composition input).
pub fn chapter_thumbnail_paths(conn: &Connection, film_id: i64) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT thumbnail_path FROM chapters
         WHERE film_id = ?1 AND thumbnail_path IS NOT NULL AND thumbnail_path != ''
         ORDER BY position ASC"
    )?;
    let paths = stmt.query_map(params![film_id], |row| row.get(0))?
        .collect::<std::result::Result<Vec<String>, _>>()?;
    Ok(paths)
}

pub fn count_chapters(conn: &Connection) -> Result<i64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM chapters", [], |row| row.get(0))?;
    Ok(count)
}

// ----- Person -----

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Person {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub birth_date: Option<String>,
    pub death_date: Option<String>,
    pub father_id: Option<i64>,
    pub mother_id: Option<i64>,
    pub spouse_id: Option<i64>,
    pub notes: String,
    pub bitfield_index: Option<i64>,
}

impl Person {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name).trim().to_string()
    }
}

const PERSON_COLUMNS: &str =
    "id, first_name, last_name, birth_date, death_date, father_id, mother_id, spouse_id,
     notes, bitfield_index";

fn map_person(row: &rusqlite::Row) -> rusqlite::Result<Person> {
    Ok(Person {
        id: row.get(0)?,
        first_name: row.get(1)?,
        last_name: row.get(2)?,
        birth_date: row.get(3)?,
        death_date: row.get(4)?,
        father_id: row.get(5)?,
        mother_id: row.get(6)?,
        spouse_id: row.get(7)?,
        notes: row.get(8)?,
        bitfield_index: row.get(9)?,
    })
}

pub fn get_person(conn: &Connection, id: i64) -> Result<Option<Person>> {
    let result = conn.query_row(
        &format!("SELECT {} FROM people WHERE id = ?1", PERSON_COLUMNS),
        params![id],
        map_person,
    ).optional()?;
    Ok(result)
}

/// Get or create a person by exact (first, last) name pair.
/// When duplicates already exist the lowest id wins.
pub fn get_or_create_person(conn: &Connection, first_name: &str, last_name: &str, notes: &str) -> Result<i64> {
    if let Some(id) = conn.query_row(
        "SELECT id FROM people WHERE first_name = ?1 AND last_name = ?2 ORDER BY id ASC LIMIT 1",
        params![first_name, last_name],
        |row| row.get::<_, i64>(0),
    ).optional()? {
        return Ok(id);
    }

    conn.execute(
        "INSERT INTO people (first_name, last_name, notes) VALUES (?1, ?2, ?3)",
        params![first_name, last_name, notes],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn list_people(conn: &Connection) -> Result<Vec<Person>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM people ORDER BY last_name ASC, first_name ASC",
        PERSON_COLUMNS
    ))?;
    let people = stmt.query_map([], map_person)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(people)
}

pub fn update_person_relationships(
    conn: &Connection,
    id: i64,
    father_id: Option<i64>,
    mother_id: Option<i64>,
    spouse_id: Option<i64>,
) -> Result<()> {
    conn.execute(
        "UPDATE people SET father_id = ?1, mother_id = ?2, spouse_id = ?3 WHERE id = ?4",
        params![father_id, mother_id, spouse_id, id],
    )?;
    Ok(())
}

pub fn update_person_name(conn: &Connection, id: i64, first_name: &str, last_name: &str) -> Result<()> {
    conn.execute(
        "UPDATE people SET first_name = ?1, last_name = ?2 WHERE id = ?3",
        params![first_name, last_name, id],
    )?;
    Ok(())
}

pub fn delete_person(conn: &Connection, id: i64) -> Result<()> {
    conn.execute("DELETE FROM people WHERE id = ?1", params![id])?;
    Ok(())
}

/// Children of a person through either parent link.
pub fn children_of(conn: &Connection, person_id: i64) -> Result<Vec<Person>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM people WHERE father_id = ?1 OR mother_id = ?1
         ORDER BY birth_date ASC, id ASC",
        PERSON_COLUMNS
    ))?;
    let people = stmt.query_map(params![person_id], map_person)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(people)
}

/// Films a person appears in, through film-level or chapter-level links.
pub fn person_film_count(conn: &Connection, person_id: i64) -> Result<i64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(DISTINCT f.id) FROM films f
         WHERE f.id IN (SELECT film_id FROM film_people WHERE person_id = ?1)
            OR f.id IN (SELECT c.film_id FROM chapter_people cp
                        JOIN chapters c ON cp.chapter_id = c.id
                        WHERE cp.person_id = ?1)",
        params![person_id],
        |row| row.get(0),
    )?;
    Ok(count)
}

pub fn count_people(conn: &Connection) -> Result<i64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM people", [], |row| row.get(0))?;
    Ok(count)
}

// ----- Location -----

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Location {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub city: String,
    pub state: String,
    pub country: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

const LOCATION_COLUMNS: &str =
    "id, name, description, city, state, country, latitude, longitude";

fn map_location(row: &rusqlite::Row) -> rusqlite::Result<Location> {
    Ok(Location {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        city: row.get(3)?,
        state: row.get(4)?,
        country: row.get(5)?,
        latitude: row.get(6)?,
        longitude: row.get(7)?,
    })
}

pub fn get_location(conn: &Connection, id: i64) -> Result<Option<Location>> {
    let result = conn.query_row(
        &format!("SELECT {} FROM locations WHERE id = ?1", LOCATION_COLUMNS),
        params![id],
        map_location,
    ).optional()?;
    Ok(result)
}

pub fn get_or_create_location(conn: &Connection, name: &str, city: &str, state: &str, description: &str) -> Result<i64> {
    if let Some(id) = conn.query_row(
        "SELECT id FROM locations WHERE name = ?1 ORDER BY id ASC LIMIT 1",
        params![name],
        |row| row.get::<_, i64>(0),
    ).optional()? {
        return Ok(id);
    }

    conn.execute(
        "INSERT INTO locations (name, city, state, description) VALUES (?1, ?2, ?3, ?4)",
        params![name, city, state, description],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn list_locations(conn: &Connection) -> Result<Vec<Location>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM locations ORDER BY name ASC",
        LOCATION_COLUMNS
    ))?;
    let locations = stmt.query_map([], map_location)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(locations)
}

pub fn location_film_count(conn: &Connection, location_id: i64) -> Result<i64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(DISTINCT f.id) FROM films f
         WHERE f.id IN (SELECT film_id FROM film_locations WHERE location_id = ?1)
            OR f.id IN (SELECT c.film_id FROM chapter_locations cl
                        JOIN chapters c ON cl.chapter_id = c.id
                        WHERE cl.location_id = ?1)",
        params![location_id],
        |row| row.get(0),
    )?;
    Ok(count)
}

pub fn count_locations(conn: &Connection) -> Result<i64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM locations", [], |row| row.get(0))?;
    Ok(count)
}

// ----- Tag -----

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tag {
    pub tag: String,
    pub category: String,
    pub description: String,
}

pub fn get_or_create_tag(conn: &Connection, tag: &str, category: &str, description: &str) -> Result<String> {
    let tag = tag.to_lowercase();
    conn.execute(
        "INSERT OR IGNORE INTO tags (tag, category, description) VALUES (?1, ?2, ?3)",
        params![tag, category, description],
    )?;
    Ok(tag)
}

pub fn list_tags(conn: &Connection) -> Result<Vec<Tag>> {
    let mut stmt = conn.prepare(
        "SELECT tag, category, description FROM tags ORDER BY category ASC, tag ASC"
    )?;
    let tags = stmt.query_map([], |row| {
        Ok(Tag {
            tag: row.get(0)?,
            category: row.get(1)?,
            description: row.get(2)?,
        })
    })?.collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(tags)
}

pub fn tag_film_count(conn: &Connection, tag: &str) -> Result<i64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(DISTINCT f.id) FROM films f
         WHERE f.id IN (SELECT film_id FROM film_tags WHERE tag = ?1)
            OR f.id IN (SELECT c.film_id FROM chapter_tags ct
                        JOIN chapters c ON ct.chapter_id = c.id
                        WHERE ct.tag = ?1)",
        params![tag],
        |row| row.get(0),
    )?;
    Ok(count)
}

pub fn count_tags(conn: &Connection) -> Result<i64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM tags", [], |row| row.get(0))?;
    Ok(count)
}

// ----- Association links (idempotent) -----

pub fn link_film_person(conn: &Connection, film_id: i64, person_id: i64) -> Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO film_people (film_id, person_id) VALUES (?1, ?2)",
        params![film_id, person_id],
    )?;
    Ok(())
}

pub fn link_film_location(conn: &Connection, film_id: i64, location_id: i64) -> Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO film_locations (film_id, location_id) VALUES (?1, ?2)",
        params![film_id, location_id],
    )?;
    Ok(())
}

pub fn link_film_tag(conn: &Connection, film_id: i64, tag: &str, is_auto: bool) -> Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO film_tags (film_id, tag, is_auto) VALUES (?1, ?2, ?3)",
        params![film_id, tag, is_auto],
    )?;
    Ok(())
}

pub fn link_chapter_person(conn: &Connection, chapter_id: i64, person_id: i64, confidence: Option<f64>) -> Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO chapter_people (chapter_id, person_id, confidence) VALUES (?1, ?2, ?3)",
        params![chapter_id, person_id, confidence],
    )?;
    Ok(())
}

pub fn link_chapter_location(conn: &Connection, chapter_id: i64, location_id: i64) -> Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO chapter_locations (chapter_id, location_id) VALUES (?1, ?2)",
        params![chapter_id, location_id],
    )?;
    Ok(())
}

pub fn link_chapter_tag(conn: &Connection, chapter_id: i64, tag: &str, is_auto: bool) -> Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO chapter_tags (chapter_id, tag, is_auto) VALUES (?1, ?2, ?3)",
        params![chapter_id, tag, is_auto],
    )?;
    Ok(())
}

// ----- Aggregated film metadata -----
// Film-level and chapter-level links combined, the way the catalog pages
// present a film.

pub fn film_people_aggregated(conn: &Connection, film_id: i64) -> Result<Vec<Person>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT DISTINCT {} FROM people p
         WHERE p.id IN (SELECT person_id FROM film_people WHERE film_id = ?1)
            OR p.id IN (SELECT cp.person_id FROM chapter_people cp
                        JOIN chapters c ON cp.chapter_id = c.id
                        WHERE c.film_id = ?1)
         ORDER BY p.last_name ASC, p.first_name ASC",
        "p.id, p.first_name, p.last_name, p.birth_date, p.death_date, p.father_id, p.mother_id, p.spouse_id, p.notes, p.bitfield_index"
    ))?;
    let people = stmt.query_map(params![film_id], map_person)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(people)
}

pub fn film_locations_aggregated(conn: &Connection, film_id: i64) -> Result<Vec<Location>> {
    let mut stmt = conn.prepare(
        "SELECT DISTINCT l.id, l.name, l.description, l.city, l.state, l.country, l.latitude, l.longitude
         FROM locations l
         WHERE l.id IN (SELECT location_id FROM film_locations WHERE film_id = ?1)
            OR l.id IN (SELECT cl.location_id FROM chapter_locations cl
                        JOIN chapters c ON cl.chapter_id = c.id
                        WHERE c.film_id = ?1)
         ORDER BY l.name ASC"
    )?;
    let locations = stmt.query_map(params![film_id], map_location)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(locations)
}

pub fn film_tags_aggregated(conn: &Connection, film_id: i64) -> Result<Vec<Tag>> {
    let mut stmt = conn.prepare(
        "SELECT DISTINCT t.tag, t.category, t.description FROM tags t
         WHERE t.tag IN (SELECT tag FROM film_tags WHERE film_id = ?1)
            OR t.tag IN (SELECT ct.tag FROM chapter_tags ct
                         JOIN chapters c ON ct.chapter_id = c.id
                         WHERE c.film_id = ?1)
         ORDER BY t.tag ASC"
    )?;
    let tags = stmt.query_map(params![film_id], |row| {
        Ok(Tag {
            tag: row.get(0)?,
            category: row.get(1)?,
            description: row.get(2)?,
        })
    })?.collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(tags)
}

/// Years strings from a film and all its chapters (callers extract 4-digit years).
pub fn film_years_fields(conn: &Connection, film_id: i64) -> Result<Vec<String>> {
    let mut fields = Vec::new();

    let film_years: Option<String> = conn.query_row(
        "SELECT years FROM films WHERE id = ?1",
        params![film_id],
        |row| row.get(0),
    ).optional()?;
    if let Some(y) = film_years {
        fields.push(y);
    }

    let mut stmt = conn.prepare(
        "SELECT years FROM chapters WHERE film_id = ?1 AND trim(years) != ''"
    )?;
    let chapter_years = stmt.query_map(params![film_id], |row| row.get::<_, String>(0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    fields.extend(chapter_years);

    Ok(fields)
}

// ----- Jobs -----

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: i64,
    pub job_type: String,
    pub status: String,
    pub film_id: Option<i64>,
    pub priority: i32,
    pub attempts: i32,
    pub last_error: Option<String>,
    pub progress: Option<i32>,
    pub payload: String,
    pub claimed_by: Option<String>,
    pub run_token: Option<String>,
    pub lease_expires_at: Option<String>,
    pub heartbeat_at: Option<String>,
    pub created_at: String,
    pub started_at: Option<String>,
    pub completed_at: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewJob {
    pub job_type: String,
    pub film_id: Option<i64>,
    pub priority: i32,
    pub payload: String,
}

pub(crate) const JOB_COLUMNS: &str =
    "id, type, status, film_id, priority, attempts, last_error, progress, payload,
     claimed_by, run_token, lease_expires_at, heartbeat_at, created_at, started_at, completed_at";

pub(crate) fn map_job(row: &rusqlite::Row) -> rusqlite::Result<Job> {
    Ok(Job {
        id: row.get(0)?,
        job_type: row.get(1)?,
        status: row.get(2)?,
        film_id: row.get(3)?,
        priority: row.get(4)?,
        attempts: row.get(5)?,
        last_error: row.get(6)?,
        progress: row.get(7)?,
        payload: row.get(8)?,
        claimed_by: row.get(9)?,
        run_token: row.get(10)?,
        lease_expires_at: row.get(11)?,
        heartbeat_at: row.get(12)?,
        created_at: row.get(13)?,
        started_at: row.get(14)?,
        completed_at: row.get(15)?,
    })
}

pub fn insert_job(conn: &Connection, job: &NewJob) -> Result<i64> {
    conn.execute(
        "INSERT INTO jobs (type, film_id, priority, payload) VALUES (?1, ?2, ?3, ?4)",
        params![job.job_type, job.film_id, job.priority, job.payload],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_job(conn: &Connection, id: i64) -> Result<Option<Job>> {
    let result = conn.query_row(
        &format!("SELECT {} FROM jobs WHERE id = ?1", JOB_COLUMNS),
        params![id],
        map_job,
    ).optional()?;
    Ok(result)
}

pub fn list_jobs(conn: &Connection, status: Option<&str>, limit: i64) -> Result<Vec<Job>> {
    let jobs = match status {
        Some(st) => {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM jobs WHERE status = ?1
                 ORDER BY priority DESC, created_at ASC LIMIT ?2",
                JOB_COLUMNS
            ))?;
            let rows = stmt.query_map(params![st, limit], map_job)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            rows
        }
        None => {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM jobs ORDER BY priority DESC, created_at ASC LIMIT ?1",
                JOB_COLUMNS
            ))?;
            let rows = stmt.query_map(params![limit], map_job)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            rows
        }
    };
    Ok(jobs)
}

pub fn update_job_status(conn: &Connection, id: i64, status: &str) -> Result<()> {
    let stamp = if status == "completed" || status == "failed" {
        ", completed_at = datetime('now')"
    } else if status == "running" {
        ", started_at = datetime('now')"
    } else {
        ""
    };

    conn.execute(
        &format!("UPDATE jobs SET status = ?1{} WHERE id = ?2", stamp),
        params![status, id],
    )?;
    Ok(())
}

pub fn update_job_progress(conn: &Connection, id: i64, progress: i32) -> Result<()> {
    conn.execute(
        "UPDATE jobs SET progress = ?1, heartbeat_at = datetime('now') WHERE id = ?2",
        params![progress, id],
    )?;
    Ok(())
}

pub fn cancel_job(conn: &Connection, id: i64) -> Result<()> {
    conn.execute(
        "UPDATE jobs SET status = 'cancelled', completed_at = datetime('now')
         WHERE id = ?1 AND status IN ('pending', 'running')",
        params![id],
    )?;
    Ok(())
}

// ----- Import rows -----

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportRow {
    pub id: i64,
    pub job_id: i64,
    pub row_number: i64,
    pub file_id: String,
    pub status: String,
    pub film_id: Option<i64>,
    pub error_message: Option<String>,
}

pub fn insert_import_row(conn: &Connection, job_id: i64, row_number: i64, file_id: &str) -> Result<i64> {
    conn.execute(
        "INSERT INTO import_rows (job_id, row_number, file_id) VALUES (?1, ?2, ?3)",
        params![job_id, row_number, file_id],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn update_import_row_complete(conn: &Connection, id: i64, film_id: i64) -> Result<()> {
    conn.execute(
        "UPDATE import_rows SET status = 'complete', film_id = ?1, updated_at = datetime('now')
         WHERE id = ?2",
        params![film_id, id],
    )?;
    Ok(())
}

pub fn update_import_row_failed(conn: &Connection, id: i64, error: &str) -> Result<()> {
    conn.execute(
        "UPDATE import_rows SET status = 'failed', error_message = ?1, updated_at = datetime('now')
         WHERE id = ?2",
        params![error, id],
    )?;
    Ok(())
}

pub fn failed_import_rows(conn: &Connection, job_id: i64) -> Result<Vec<ImportRow>> {
    let mut stmt = conn.prepare(
        "SELECT id, job_id, row_number, file_id, status, film_id, error_message
         FROM import_rows WHERE job_id = ?1 AND status = 'failed'
         ORDER BY row_number ASC"
    )?;
    let rows = stmt.query_map(params![job_id], |row| {
        Ok(ImportRow {
            id: row.get(0)?,
            job_id: row.get(1)?,
            row_number: row.get(2)?,
            file_id: row.get(3)?,
            status: row.get(4)?,
            film_id: row.get(5)?,
            error_message: row.get(6)?,
        })
    })?.collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}
