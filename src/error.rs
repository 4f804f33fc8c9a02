// Reel Vault Error Types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum VaultError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Film not found: {0}")]
    FilmNotFound(String),

    #[error("Person not found: {0}")]
    PersonNotFound(i64),

    #[error("Job not found: {0}")]
    JobNotFound(i64),

    #[error("Invalid time: {0}")]
    InvalidTime(String),

    #[error("Invalid bitfield: {0}")]
    InvalidBitfield(String),

    #[error("Invalid relationship: {0}")]
    InvalidRelationship(String),

    #[error("FFmpeg error: {0}")]
    FFmpeg(String),

    #[error("FFprobe error: {0}")]
    FFprobe(String),

    #[error("yt-dlp error: {0}")]
    YtDlp(String),

    #[error("Import error: {0}")]
    Import(String),

    #[error("Image error: {0}")]
    Image(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    Other(String),
}

impl From<anyhow::Error> for VaultError {
    fn from(err: anyhow::Error) -> Self {
        VaultError::Other(err.to_string())
    }
}

impl From<image::ImageError> for VaultError {
    fn from(err: image::ImageError) -> Self {
        VaultError::Image(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, VaultError>;
