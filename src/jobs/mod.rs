// Job system module
//
// Durable SQLite work queue: jobs are claimed with a lease token, completed
// or failed under that token, and retried with exponential backoff until
// the attempt cap.

pub mod runner;

use rusqlite::Connection;
use uuid::Uuid;
use chrono::Utc;

use crate::db::schema::{self, Job, NewJob, JOB_COLUMNS, map_job};
use crate::constants::{JOB_BASE_BACKOFF_SECONDS, JOB_LEASE_DURATION_SECONDS, JOB_MAX_RETRIES};
use crate::error::{Result, VaultError};

/// Claim a pending job with lease
pub fn claim_job(conn: &Connection, job_type: Option<&str>) -> Result<Option<Job>> {
    let worker_id = get_worker_id();
    let run_token = Uuid::new_v4().to_string();
    let lease_expires = Utc::now()
        .checked_add_signed(chrono::Duration::seconds(JOB_LEASE_DURATION_SECONDS))
        .unwrap_or_else(Utc::now)
        .format("%Y-%m-%dT%H:%M:%SZ")
        .to_string();

    // Find and claim a job atomically
    let sql = match job_type {
        Some(_) => format!(
            r#"
            UPDATE jobs
            SET status = 'running',
                claimed_by = ?1,
                run_token = ?2,
                lease_expires_at = ?3,
                heartbeat_at = datetime('now'),
                started_at = datetime('now')
            WHERE id = (
                SELECT id FROM jobs
                WHERE type = ?4
                  AND status = 'pending'
                  AND (attempts < ?5 OR attempts IS NULL)
                ORDER BY priority DESC, created_at ASC
                LIMIT 1
            )
            RETURNING {}
            "#,
            JOB_COLUMNS
        ),
        None => format!(
            r#"
            UPDATE jobs
            SET status = 'running',
                claimed_by = ?1,
                run_token = ?2,
                lease_expires_at = ?3,
                heartbeat_at = datetime('now'),
                started_at = datetime('now')
            WHERE id = (
                SELECT id FROM jobs
                WHERE status = 'pending'
                  AND (attempts < ?4 OR attempts IS NULL)
                ORDER BY priority DESC, created_at ASC
                LIMIT 1
            )
            RETURNING {}
            "#,
            JOB_COLUMNS
        ),
    };

    let result = match job_type {
        Some(jt) => conn.query_row(
            &sql,
            rusqlite::params![worker_id, run_token, lease_expires, jt, JOB_MAX_RETRIES],
            map_job,
        ),
        None => conn.query_row(
            &sql,
            rusqlite::params![worker_id, run_token, lease_expires, JOB_MAX_RETRIES],
            map_job,
        ),
    };

    match result {
        Ok(job) => Ok(Some(job)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(VaultError::Database(e)),
    }
}

/// Complete a job successfully
pub fn complete_job(conn: &Connection, job_id: i64, run_token: &str) -> Result<bool> {
    let rows = conn.execute(
        "UPDATE jobs SET status = 'completed', completed_at = datetime('now'), progress = 100
         WHERE id = ?1 AND run_token = ?2 AND status = 'running'",
        rusqlite::params![job_id, run_token],
    )?;

    Ok(rows > 0)
}

/// Fail a job with error message
pub fn fail_job(conn: &Connection, job_id: i64, run_token: &str, error: &str) -> Result<bool> {
    let job = schema::get_job(conn, job_id)?
        .ok_or(VaultError::JobNotFound(job_id))?;

    let new_attempts = job.attempts + 1;

    if new_attempts >= JOB_MAX_RETRIES {
        // Max retries exceeded, mark as failed
        let rows = conn.execute(
            "UPDATE jobs SET status = 'failed', last_error = ?1, attempts = ?2, completed_at = datetime('now')
             WHERE id = ?3 AND run_token = ?4",
            rusqlite::params![error, new_attempts, job_id, run_token],
        )?;
        Ok(rows > 0)
    } else {
        // Schedule for retry with exponential backoff
        let backoff = JOB_BASE_BACKOFF_SECONDS * (2_i64.pow(new_attempts as u32 - 1));
        let retry_after = Utc::now()
            .checked_add_signed(chrono::Duration::seconds(backoff))
            .unwrap_or_else(Utc::now)
            .format("%Y-%m-%dT%H:%M:%SZ")
            .to_string();

        let rows = conn.execute(
            "UPDATE jobs SET status = 'pending', last_error = ?1, attempts = ?2,
             claimed_by = NULL, run_token = NULL, lease_expires_at = ?3
             WHERE id = ?4 AND run_token = ?5",
            rusqlite::params![error, new_attempts, retry_after, job_id, run_token],
        )?;
        Ok(rows > 0)
    }
}

/// Reclaim expired/abandoned jobs
pub fn reclaim_expired_jobs(conn: &Connection) -> Result<usize> {
    let rows = conn.execute(
        "UPDATE jobs SET status = 'pending', claimed_by = NULL, run_token = NULL
         WHERE status = 'running'
           AND lease_expires_at < datetime('now')
           AND attempts < ?1",
        rusqlite::params![JOB_MAX_RETRIES],
    )?;

    Ok(rows)
}

/// Get worker identifier
fn get_worker_id() -> String {
    let hostname = hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown".to_string());
    let pid = std::process::id();
    format!("{}:{}", hostname, pid)
}

/// Create a new job
pub fn create_job(conn: &Connection, job: &NewJob) -> Result<i64> {
    schema::insert_job(conn, job)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_test_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA foreign_keys = ON;").unwrap();
        crate::db::migrations::run_migrations(&conn).unwrap();
        conn
    }

    fn queue_job(conn: &Connection, job_type: &str, priority: i32) -> i64 {
        create_job(conn, &NewJob {
            job_type: job_type.to_string(),
            film_id: None,
            priority,
            payload: "{}".to_string(),
        }).unwrap()
    }

    #[test]
    fn test_claim_respects_priority() {
        let conn = setup_test_db();
        queue_job(&conn, "sprite", 1);
        let high = queue_job(&conn, "import", 10);

        let job = claim_job(&conn, None).unwrap().unwrap();
        assert_eq!(job.id, high);
        assert_eq!(job.status, "running");
        assert!(job.run_token.is_some());
    }

    #[test]
    fn test_claim_by_type() {
        let conn = setup_test_db();
        queue_job(&conn, "sprite", 5);
        let import = queue_job(&conn, "import", 1);

        let job = claim_job(&conn, Some("import")).unwrap().unwrap();
        assert_eq!(job.id, import);

        // No more import jobs to claim
        assert!(claim_job(&conn, Some("import")).unwrap().is_none());
    }

    #[test]
    fn test_complete_requires_run_token() {
        let conn = setup_test_db();
        queue_job(&conn, "sprite", 0);

        let job = claim_job(&conn, None).unwrap().unwrap();
        let token = job.run_token.clone().unwrap();

        assert!(!complete_job(&conn, job.id, "wrong-token").unwrap());
        assert!(complete_job(&conn, job.id, &token).unwrap());

        let job = schema::get_job(&conn, job.id).unwrap().unwrap();
        assert_eq!(job.status, "completed");
        assert_eq!(job.progress, Some(100));
    }

    #[test]
    fn test_fail_retries_until_cap() {
        let conn = setup_test_db();
        let id = queue_job(&conn, "sprite", 0);

        for attempt in 1..JOB_MAX_RETRIES {
            let job = claim_job(&conn, None).unwrap().unwrap();
            let token = job.run_token.clone().unwrap();
            fail_job(&conn, job.id, &token, "boom").unwrap();

            let job = schema::get_job(&conn, id).unwrap().unwrap();
            assert_eq!(job.attempts, attempt);
            assert_eq!(job.status, "pending");
        }

        let job = claim_job(&conn, None).unwrap().unwrap();
        let token = job.run_token.clone().unwrap();
        fail_job(&conn, job.id, &token, "boom").unwrap();

        let job = schema::get_job(&conn, id).unwrap().unwrap();
        assert_eq!(job.status, "failed");
        assert_eq!(job.last_error.as_deref(), Some("boom"));

        // Exhausted jobs are not claimable
        assert!(claim_job(&conn, None).unwrap().is_none());
    }

    #[test]
    fn test_reclaim_expired_jobs() {
        let conn = setup_test_db();
        queue_job(&conn, "sprite", 0);

        let job = claim_job(&conn, None).unwrap().unwrap();
        // Force the lease into the past
        conn.execute(
            "UPDATE jobs SET lease_expires_at = '2000-01-01T00:00:00Z' WHERE id = ?1",
            [job.id],
        ).unwrap();

        let reclaimed = reclaim_expired_jobs(&conn).unwrap();
        assert_eq!(reclaimed, 1);

        let job = schema::get_job(&conn, job.id).unwrap().unwrap();
        assert_eq!(job.status, "pending");
        assert!(job.run_token.is_none());
    }
}
