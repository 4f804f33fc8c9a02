// Database module

pub mod migrations;
pub mod schema;

use rusqlite::Connection;
use std::path::Path;
use anyhow::Result;

use crate::constants::{VAULT_FOLDER, DB_FILENAME};

/// Open or create a database at the given path
pub fn open_db(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path)?;

    // Enable foreign keys (must be done per connection)
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;

    // Enable WAL mode for better concurrency
    conn.execute_batch("PRAGMA journal_mode = WAL;")?;

    // Run migrations
    migrations::run_migrations(&conn)?;

    Ok(conn)
}

/// Get the database path for a catalog root
pub fn get_db_path(catalog_root: &Path) -> std::path::PathBuf {
    catalog_root
        .join(VAULT_FOLDER)
        .join(DB_FILENAME)
}

/// Get the .reelvault folder path for a catalog root
pub fn get_vault_path(catalog_root: &Path) -> std::path::PathBuf {
    catalog_root.join(VAULT_FOLDER)
}

/// Get the YouTube metadata cache directory for a catalog root
pub fn get_cache_path(catalog_root: &Path) -> std::path::PathBuf {
    catalog_root.join(VAULT_FOLDER).join(crate::constants::CACHE_FOLDER)
}

/// Get the thumbnails directory for a catalog root
pub fn get_thumbnails_path(catalog_root: &Path) -> std::path::PathBuf {
    catalog_root.join(crate::constants::THUMBNAILS_FOLDER)
}

/// Initialize catalog folder structure
pub fn init_catalog_folders(catalog_root: &Path) -> Result<()> {
    use crate::constants::*;

    let vault = catalog_root.join(VAULT_FOLDER);
    std::fs::create_dir_all(&vault)?;
    std::fs::create_dir_all(vault.join(CACHE_FOLDER))?;

    let thumbnails = catalog_root.join(THUMBNAILS_FOLDER);
    std::fs::create_dir_all(thumbnails.join(PREVIEWS_FOLDER))?;
    std::fs::create_dir_all(thumbnails.join(CHAPTERS_FOLDER))?;

    Ok(())
}
