// Shared server state

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use rusqlite::Connection;

use anyhow::Result;

/// The catalog database handle shared across request handlers. rusqlite
/// connections are not Sync, so handlers take the lock for the duration of
/// their queries.
pub struct Catalog {
    conn: Mutex<Connection>,
}

impl Catalog {
    pub fn open(db_path: &Path) -> Result<Self> {
        let conn = crate::db::open_db(db_path)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    pub fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap()
    }
}

#[derive(Clone)]
pub struct ServerState {
    pub catalog: Arc<Catalog>,
    pub catalog_root: PathBuf,
    pub start_time: Instant,
}

impl ServerState {
    pub fn new(catalog: Arc<Catalog>, catalog_root: PathBuf) -> Self {
        Self {
            catalog,
            catalog_root,
            start_time: Instant::now(),
        }
    }
}
