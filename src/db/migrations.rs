// Database migrations
// Migrations are forward-only. Never edit or delete a migration after it ships.

use rusqlite::Connection;
use anyhow::Result;

/// All migrations in order. Each migration is a SQL string.
const MIGRATIONS: &[&str] = &[
    // Migration 1: Initial schema
    r#"
    -- Films (one row per digitized reel published to YouTube)
    CREATE TABLE films (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        file_id TEXT NOT NULL UNIQUE,
        title TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        summary TEXT NOT NULL DEFAULT '',
        youtube_id TEXT UNIQUE,
        youtube_url TEXT,
        duration_seconds INTEGER,
        upload_date TEXT,
        thumbnail_url TEXT,
        thumbnail_high_url TEXT,
        thumbnail_medium_url TEXT,
        preview_sprite_path TEXT,
        preview_frame_count INTEGER NOT NULL DEFAULT 0,
        preview_frame_interval REAL NOT NULL DEFAULT 0,
        preview_frame_width INTEGER NOT NULL DEFAULT 0,
        preview_frame_height INTEGER NOT NULL DEFAULT 0,
        years TEXT NOT NULL DEFAULT '',
        technical_notes TEXT NOT NULL DEFAULT '',
        workflow_state TEXT NOT NULL DEFAULT '',
        playlist_order INTEGER,
        created_at TEXT NOT NULL DEFAULT (datetime('now'))
    );

    -- Chapters (named timestamp ranges within a film)
    CREATE TABLE chapters (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        film_id INTEGER NOT NULL REFERENCES films(id) ON DELETE CASCADE,
        position INTEGER NOT NULL,
        start_time TEXT NOT NULL,
        start_time_seconds INTEGER NOT NULL,
        title TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        years TEXT NOT NULL DEFAULT '',
        thumbnail_path TEXT,
        has_people INTEGER NOT NULL DEFAULT 0,
        has_locations INTEGER NOT NULL DEFAULT 0,
        has_tags INTEGER NOT NULL DEFAULT 0,
        has_years INTEGER NOT NULL DEFAULT 0,
        UNIQUE(film_id, position)
    );

    -- People (self-referential genealogy links; name pairs are NOT unique,
    -- deduplication is an explicit merge operation)
    CREATE TABLE people (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        first_name TEXT NOT NULL,
        last_name TEXT NOT NULL,
        birth_date TEXT,
        death_date TEXT,
        father_id INTEGER REFERENCES people(id) ON DELETE SET NULL,
        mother_id INTEGER REFERENCES people(id) ON DELETE SET NULL,
        spouse_id INTEGER REFERENCES people(id) ON DELETE SET NULL,
        notes TEXT NOT NULL DEFAULT '',
        bitfield_index INTEGER
    );

    -- Locations
    CREATE TABLE locations (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        city TEXT NOT NULL DEFAULT '',
        state TEXT NOT NULL DEFAULT '',
        country TEXT NOT NULL DEFAULT 'USA',
        latitude REAL,
        longitude REAL
    );

    -- Tags (lowercase tag text is the key)
    CREATE TABLE tags (
        tag TEXT PRIMARY KEY,
        category TEXT NOT NULL DEFAULT 'other'
            CHECK (category IN ('holidays', 'events', 'activities', 'people', 'places', 'themes', 'other')),
        description TEXT NOT NULL DEFAULT ''
    );

    -- Association tables
    CREATE TABLE film_people (
        film_id INTEGER NOT NULL REFERENCES films(id) ON DELETE CASCADE,
        person_id INTEGER NOT NULL REFERENCES people(id) ON DELETE CASCADE,
        is_primary INTEGER NOT NULL DEFAULT 0,
        PRIMARY KEY (film_id, person_id)
    );

    CREATE TABLE film_locations (
        film_id INTEGER NOT NULL REFERENCES films(id) ON DELETE CASCADE,
        location_id INTEGER NOT NULL REFERENCES locations(id) ON DELETE CASCADE,
        is_primary INTEGER NOT NULL DEFAULT 0,
        PRIMARY KEY (film_id, location_id)
    );

    CREATE TABLE film_tags (
        film_id INTEGER NOT NULL REFERENCES films(id) ON DELETE CASCADE,
        tag TEXT NOT NULL REFERENCES tags(tag) ON DELETE CASCADE,
        is_auto INTEGER NOT NULL DEFAULT 0,
        PRIMARY KEY (film_id, tag)
    );

    CREATE TABLE chapter_people (
        chapter_id INTEGER NOT NULL REFERENCES chapters(id) ON DELETE CASCADE,
        person_id INTEGER NOT NULL REFERENCES people(id) ON DELETE CASCADE,
        is_primary INTEGER NOT NULL DEFAULT 0,
        confidence REAL,
        PRIMARY KEY (chapter_id, person_id)
    );

    CREATE TABLE chapter_locations (
        chapter_id INTEGER NOT NULL REFERENCES chapters(id) ON DELETE CASCADE,
        location_id INTEGER NOT NULL REFERENCES locations(id) ON DELETE CASCADE,
        is_primary INTEGER NOT NULL DEFAULT 0,
        PRIMARY KEY (chapter_id, location_id)
    );

    CREATE TABLE chapter_tags (
        chapter_id INTEGER NOT NULL REFERENCES chapters(id) ON DELETE CASCADE,
        tag TEXT NOT NULL REFERENCES tags(tag) ON DELETE CASCADE,
        is_auto INTEGER NOT NULL DEFAULT 0,
        confidence REAL,
        PRIMARY KEY (chapter_id, tag)
    );

    -- Jobs table (durable work queue)
    CREATE TABLE jobs (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        type TEXT NOT NULL CHECK (type IN ('import', 'sprite', 'chapter_thumbs', 'xls_extract')),
        status TEXT NOT NULL DEFAULT 'pending'
            CHECK (status IN ('pending', 'running', 'completed', 'failed', 'cancelled')),
        film_id INTEGER REFERENCES films(id),
        priority INTEGER NOT NULL DEFAULT 0,
        attempts INTEGER NOT NULL DEFAULT 0,
        last_error TEXT,
        progress INTEGER DEFAULT 0,
        payload TEXT DEFAULT '{}',
        claimed_by TEXT,
        run_token TEXT,
        lease_expires_at TEXT,
        heartbeat_at TEXT,
        created_at TEXT NOT NULL DEFAULT (datetime('now')),
        started_at TEXT,
        completed_at TEXT
    );

    -- Import row tracking (per-row crash recovery and error reporting)
    CREATE TABLE import_rows (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        job_id INTEGER NOT NULL REFERENCES jobs(id),
        row_number INTEGER NOT NULL,
        file_id TEXT NOT NULL,
        status TEXT NOT NULL DEFAULT 'pending'
            CHECK (status IN ('pending', 'complete', 'failed', 'skipped')),
        film_id INTEGER REFERENCES films(id),
        error_message TEXT,
        created_at TEXT NOT NULL DEFAULT (datetime('now')),
        updated_at TEXT NOT NULL DEFAULT (datetime('now'))
    );

    -- Indexes for common queries
    CREATE INDEX idx_films_file_id ON films(file_id);
    CREATE INDEX idx_films_youtube_id ON films(youtube_id);
    CREATE INDEX idx_films_upload_date ON films(upload_date);
    CREATE INDEX idx_chapters_film ON chapters(film_id, position);
    CREATE INDEX idx_chapters_start ON chapters(start_time_seconds);
    CREATE INDEX idx_people_last_name ON people(last_name);
    CREATE INDEX idx_people_bitfield ON people(bitfield_index);
    CREATE INDEX idx_locations_name ON locations(name);
    CREATE INDEX idx_locations_city_state ON locations(city, state);
    CREATE INDEX idx_film_people_person ON film_people(person_id);
    CREATE INDEX idx_film_locations_location ON film_locations(location_id);
    CREATE INDEX idx_film_tags_tag ON film_tags(tag);
    CREATE INDEX idx_chapter_people_person ON chapter_people(person_id);
    CREATE INDEX idx_chapter_locations_location ON chapter_locations(location_id);
    CREATE INDEX idx_chapter_tags_tag ON chapter_tags(tag);
    CREATE INDEX idx_jobs_status ON jobs(status);
    CREATE INDEX idx_jobs_type_status ON jobs(type, status);
    CREATE INDEX idx_import_rows_job ON import_rows(job_id);
    CREATE INDEX idx_import_rows_status ON import_rows(status);
    "#,
];

/// Get current schema version from database
fn get_schema_version(conn: &Connection) -> Result<u32> {
    let version: u32 = conn.query_row(
        "PRAGMA user_version",
        [],
        |row| row.get(0)
    )?;
    Ok(version)
}

/// Run all pending migrations (crash-safe)
pub fn run_migrations(conn: &Connection) -> Result<()> {
    let current_version = get_schema_version(conn)?;
    let target_version = MIGRATIONS.len() as u32;

    // Refuse to open a DB created by a newer build
    if current_version > target_version {
        anyhow::bail!(
            "Database schema version {} is newer than this build supports (max {}). Please upgrade reel-vault.",
            current_version,
            target_version
        );
    }

    if current_version == target_version {
        return Ok(());
    }

    // Apply pending migrations one-by-one
    for (i, migration) in MIGRATIONS.iter().enumerate() {
        let migration_version = (i + 1) as u32;
        if migration_version <= current_version {
            continue;
        }

        conn.execute_batch(migration)?;
        conn.execute_batch(&format!("PRAGMA user_version = {}", migration_version))?;

        tracing::info!("Applied migration {}", migration_version);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_apply_cleanly() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        assert_eq!(get_schema_version(&conn).unwrap(), MIGRATIONS.len() as u32);

        // Re-running is a no-op
        run_migrations(&conn).unwrap();
    }

    #[test]
    fn test_refuses_newer_schema() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA user_version = 99").unwrap();
        assert!(run_migrations(&conn).is_err());
    }
}
