// Reel Vault - catalog library for digitized home movies

pub mod constants;
pub mod error;
pub mod tools;
pub mod db;
pub mod import;
pub mod matching;
pub mod youtube;
pub mod preview;
pub mod xls;
pub mod genealogy;
pub mod search;
pub mod jobs;
pub mod server;
