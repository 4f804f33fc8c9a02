// Job runner - executes jobs from the queue

use std::path::Path;

use rusqlite::Connection;
use serde::Deserialize;
use tracing::{error, info};

use crate::db::schema;
use crate::error::{Result, VaultError};
use crate::jobs::{claim_job, complete_job, fail_job, reclaim_expired_jobs};
use crate::{import, preview, xls};

/// Run a single job from the queue. Returns false when no job was available.
pub fn run_next_job(conn: &Connection, catalog_root: &Path) -> Result<bool> {
    // First reclaim any expired jobs
    let reclaimed = reclaim_expired_jobs(conn)?;
    if reclaimed > 0 {
        info!("Reclaimed {} expired jobs", reclaimed);
    }

    // Try to claim a job
    let job = match claim_job(conn, None)? {
        Some(j) => j,
        None => return Ok(false), // No jobs available
    };

    let run_token = job.run_token.clone().unwrap_or_default();

    info!("Running job {} (type: {})", job.id, job.job_type);

    // Execute based on job type
    let result = match job.job_type.as_str() {
        "import" => run_import_job(conn, job.id),
        "sprite" => run_sprite_job(conn, &job, catalog_root),
        "chapter_thumbs" => run_chapter_thumbs_job(conn, &job, catalog_root),
        "xls_extract" => run_xls_extract_job(conn, &job, catalog_root),
        _ => Err(VaultError::Other(format!("Unknown job type: {}", job.job_type))),
    };

    // Update job status
    match result {
        Ok(_) => {
            complete_job(conn, job.id, &run_token)?;
            info!("Job {} completed successfully", job.id);
        }
        Err(e) => {
            fail_job(conn, job.id, &run_token, &e.to_string())?;
            error!("Job {} failed: {}", job.id, e);
        }
    }

    Ok(true)
}

/// Run all pending jobs
pub fn run_all_jobs(conn: &Connection, catalog_root: &Path) -> Result<usize> {
    let mut count = 0;
    while run_next_job(conn, catalog_root)? {
        count += 1;
    }
    Ok(count)
}

fn run_import_job(conn: &Connection, job_id: i64) -> Result<()> {
    let stats = import::run_import_job(conn, job_id)?;

    info!(
        "Import complete: {} films, {} chapters, {} errors",
        stats.films,
        stats.chapters,
        stats.errors.len()
    );

    if !stats.errors.is_empty() && stats.films == 0 {
        return Err(VaultError::Import("all rows failed to import".to_string()));
    }

    Ok(())
}

fn job_film(conn: &Connection, job: &schema::Job) -> Result<schema::Film> {
    let film_id = job
        .film_id
        .ok_or_else(|| VaultError::Other(format!("job {} has no film", job.id)))?;
    schema::get_film(conn, film_id)?
        .ok_or_else(|| VaultError::FilmNotFound(film_id.to_string()))
}

fn run_sprite_job(conn: &Connection, job: &schema::Job, catalog_root: &Path) -> Result<()> {
    let film = job_film(conn, job)?;
    preview::build_film_sprite(conn, catalog_root, &film)?;
    Ok(())
}

#[derive(Debug, Deserialize, Default)]
struct ChapterThumbsPayload {
    #[serde(default)]
    video_path: Option<String>,
}

fn run_chapter_thumbs_job(conn: &Connection, job: &schema::Job, catalog_root: &Path) -> Result<()> {
    let film = job_film(conn, job)?;
    let payload: ChapterThumbsPayload = serde_json::from_str(&job.payload).unwrap_or_default();

    let video_path = payload.video_path.as_ref().map(Path::new);
    let generated = preview::build_chapter_thumbnails(conn, catalog_root, &film, video_path)?;
    info!("Generated {} chapter thumbnails for {}", generated, film.file_id);
    Ok(())
}

#[derive(Debug, Deserialize)]
struct XlsExtractPayload {
    source_path: String,
}

fn run_xls_extract_job(_conn: &Connection, job: &schema::Job, catalog_root: &Path) -> Result<()> {
    let payload: XlsExtractPayload = serde_json::from_str(&job.payload)?;

    let output_dir = crate::db::get_thumbnails_path(catalog_root)
        .join(crate::constants::CHAPTERS_FOLDER);
    let (workbooks, images) = xls::extract_path(Path::new(&payload.source_path), &output_dir)?;
    info!("Extracted {} images from {} workbooks", images, workbooks);
    Ok(())
}

/// Count pending jobs by type
pub fn count_pending_jobs(conn: &Connection) -> Result<Vec<(String, i64)>> {
    let mut stmt = conn.prepare(
        "SELECT type, COUNT(*) FROM jobs WHERE status = 'pending' GROUP BY type ORDER BY type"
    )?;

    let counts = stmt.query_map([], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
    })?.collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(counts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schema::NewJob;

    fn setup_test_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA foreign_keys = ON;").unwrap();
        crate::db::migrations::run_migrations(&conn).unwrap();
        conn
    }

    #[test]
    fn test_run_next_job_empty_queue() {
        let conn = setup_test_db();
        let tmp = tempfile::TempDir::new().unwrap();
        assert!(!run_next_job(&conn, tmp.path()).unwrap());
    }

    #[test]
    fn test_unknown_film_job_fails_cleanly() {
        let conn = setup_test_db();
        let tmp = tempfile::TempDir::new().unwrap();

        crate::jobs::create_job(&conn, &NewJob {
            job_type: "sprite".to_string(),
            film_id: Some(999),
            priority: 0,
            payload: "{}".to_string(),
        }).unwrap();

        // Job runs, fails, and goes back to pending for retry
        assert!(run_next_job(&conn, tmp.path()).unwrap());
        let job = schema::list_jobs(&conn, None, 10).unwrap().remove(0);
        assert_eq!(job.status, "pending");
        assert_eq!(job.attempts, 1);
        assert!(job.last_error.is_some());
    }

    #[test]
    fn test_count_pending_jobs() {
        let conn = setup_test_db();
        for _ in 0..2 {
            crate::jobs::create_job(&conn, &NewJob {
                job_type: "sprite".to_string(),
                film_id: None,
                priority: 0,
                payload: "{}".to_string(),
            }).unwrap();
        }

        let counts = count_pending_jobs(&conn).unwrap();
        assert_eq!(counts, vec![("sprite".to_string(), 2)]);
    }
}
