// Import pipeline tests

use super::*;
use crate::db::schema;
use std::io::Write as IoWrite;
use tempfile::TempDir;

/// Set up an in-memory DB with all migrations applied.
fn setup_test_db() -> rusqlite::Connection {
    let conn = rusqlite::Connection::open_in_memory().unwrap();
    conn.execute_batch("PRAGMA foreign_keys = ON;").unwrap();
    crate::db::migrations::run_migrations(&conn).unwrap();
    conn
}

const PLAYLIST: &str = "https://www.youtube.com/playlist?list=PLTESTLIST123";

/// A master sheet with front matter, one valid film row with people,
/// locations, tags and a multi-line chapters cell, and one junk row.
fn write_master_csv(dir: &std::path::Path) -> std::path::PathBuf {
    let path = dir.join("family_films.csv");
    let mut f = std::fs::File::create(&path).unwrap();
    writeln!(f, "Family Films Master Sheet,,,,,,,,,,,").unwrap();
    writeln!(f, "exported 2024,,,,,,,,,,,").unwrap();
    writeln!(
        f,
        "Filenames,Title,Description,Summary,Years,People,Location,Chapters,Duration at 23.97 fps,Format,Tag: Disney,Workflow State"
    )
    .unwrap();
    writeln!(
        f,
        "P-61_FROS,Fresno Trip,Long desc,Short summary,1955-1956,\"John Hayward Jr, Ruth Myre and Linda Hayward (nee Thompson)\",\"Fresno, California\",\"0:00 Arrival\n2:15 At the park\",0:09:26,16mm,x,Published"
    )
    .unwrap();
    writeln!(f, ",No file id so skipped,,,,,,,,,,").unwrap();
    path
}

#[test]
fn test_import_creates_exactly_one_film_per_file_id() {
    let conn = setup_test_db();
    let tmp = TempDir::new().unwrap();
    let csv_path = write_master_csv(tmp.path());

    let stats = run_import(&conn, &csv_path, PLAYLIST, false, None).unwrap();
    assert_eq!(stats.films, 1);
    assert!(stats.errors.is_empty(), "errors: {:?}", stats.errors);

    let film = schema::get_film_by_file_id(&conn, "P-61_FROS").unwrap().unwrap();
    assert_eq!(film.title, "Fresno Trip");
    assert_eq!(film.duration_seconds, Some(566));
    assert_eq!(film.youtube_id.as_deref(), Some("placeholder_P-61_FROS"));
    assert!(film.youtube_url.as_deref().unwrap().contains("list=PLTESTLIST123"));

    // Re-import must update in place, never duplicate
    run_import(&conn, &csv_path, PLAYLIST, false, None).unwrap();
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM films WHERE file_id = 'P-61_FROS'", [], |r| r.get(0))
        .unwrap();
    assert_eq!(count, 1);
}

#[test]
fn test_import_links_people_locations_tags_chapters() {
    let conn = setup_test_db();
    let tmp = TempDir::new().unwrap();
    let csv_path = write_master_csv(tmp.path());

    run_import(&conn, &csv_path, PLAYLIST, false, None).unwrap();
    let film = schema::get_film_by_file_id(&conn, "P-61_FROS").unwrap().unwrap();

    let people = schema::film_people_aggregated(&conn, film.id).unwrap();
    let names: Vec<String> = people.iter().map(|p| p.full_name()).collect();
    assert!(names.contains(&"John Hayward Jr".to_string()));
    assert!(names.contains(&"Ruth Myre".to_string()));
    // Maiden-name parenthetical stripped
    assert!(names.contains(&"Linda Hayward".to_string()));

    // "Fresno, California" splits into two location entries
    let locations = schema::film_locations_aggregated(&conn, film.id).unwrap();
    let location_names: Vec<&str> = locations.iter().map(|l| l.name.as_str()).collect();
    assert!(location_names.contains(&"Fresno"));
    assert!(location_names.contains(&"California"));

    // Fixed tag column + Format column
    let tags = schema::film_tags_aggregated(&conn, film.id).unwrap();
    let tag_names: Vec<&str> = tags.iter().map(|t| t.tag.as_str()).collect();
    assert!(tag_names.contains(&"disney"));
    assert!(tag_names.contains(&"16mm"));

    let chapters = schema::list_chapters(&conn, film.id).unwrap();
    assert_eq!(chapters.len(), 2);
    assert_eq!(chapters[0].position, 1);
    assert_eq!(chapters[0].start_time, "0:00");
    assert_eq!(chapters[0].start_time_seconds, 0);
    assert_eq!(chapters[1].start_time, "2:15");
    assert_eq!(chapters[1].start_time_seconds, 135);
}

#[test]
fn test_dry_run_rolls_back_everything() {
    let conn = setup_test_db();
    let tmp = TempDir::new().unwrap();
    let csv_path = write_master_csv(tmp.path());

    let stats = run_import(&conn, &csv_path, PLAYLIST, true, None).unwrap();
    assert_eq!(stats.films, 1);

    let film_count: i64 = conn.query_row("SELECT COUNT(*) FROM films", [], |r| r.get(0)).unwrap();
    assert_eq!(film_count, 0);
    let people_count: i64 = conn.query_row("SELECT COUNT(*) FROM people", [], |r| r.get(0)).unwrap();
    assert_eq!(people_count, 0);
}

#[test]
fn test_import_records_row_errors_and_continues() {
    let conn = setup_test_db();
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("bad_rows.csv");
    let mut f = std::fs::File::create(&path).unwrap();
    writeln!(f, "Filenames,Title,Years,People,Location,Chapters").unwrap();
    // Chapter with an out-of-range seconds field fails the time parse
    writeln!(f, "BAD-01,Broken film,,,,\"0:99 Bad timestamp\"").unwrap();
    writeln!(f, "OK-01,Good film,1960,,,").unwrap();

    let stats = run_import(&conn, &path, PLAYLIST, false, None).unwrap();
    assert_eq!(stats.films, 1);
    assert_eq!(stats.errors.len(), 1);
    assert!(stats.errors[0].contains("BAD-01"));
    assert!(schema::get_film_by_file_id(&conn, "OK-01").unwrap().is_some());
}

#[test]
fn test_import_missing_header_row_fails() {
    let conn = setup_test_db();
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("no_header.csv");
    std::fs::write(&path, "a,b,c\n1,2,3\n").unwrap();

    assert!(run_import(&conn, &path, PLAYLIST, false, None).is_err());
}

#[test]
fn test_import_job_tracks_rows() {
    let conn = setup_test_db();
    let tmp = TempDir::new().unwrap();
    let csv_path = write_master_csv(tmp.path());

    let job_id = create_import_job(&conn, csv_path.to_str().unwrap(), PLAYLIST).unwrap();
    let stats = run_import_job(&conn, job_id).unwrap();
    assert_eq!(stats.films, 1);

    let job = schema::get_job(&conn, job_id).unwrap().unwrap();
    assert_eq!(job.status, "completed");

    let tracked: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM import_rows WHERE job_id = ?1 AND status = 'complete'",
            [job_id],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(tracked, 1);
}

#[test]
fn test_extract_playlist_id() {
    assert_eq!(
        extract_playlist_id("https://www.youtube.com/playlist?list=PLK3abc"),
        Some("PLK3abc".to_string())
    );
    assert_eq!(
        extract_playlist_id("https://www.youtube.com/watch?v=xyz&list=PL9"),
        Some("PL9".to_string())
    );
    assert_eq!(extract_playlist_id("https://example.com/"), None);
}

// ---------------------------------------------------------------
// Chapter sheet import
// ---------------------------------------------------------------

fn write_chapter_sheet(dir: &std::path::Path) -> std::path::PathBuf {
    let path = dir.join("p61_chapters.csv");
    let mut f = std::fs::File::create(&path).unwrap();
    writeln!(f, "P-61_FROS chapter sheet,,,,,,").unwrap();
    writeln!(f, "\"bitfield: John Hayward Jr, Linda Hayward, Jonathan Hayward, Matthew Hayward\",,,,,,").unwrap();
    writeln!(f, "Start Time,Title,Description,Haywards Present,Other People,Locations,Years").unwrap();
    writeln!(f, "0:00,Arrival,Driving in,0110,Ruth Myre,\"Fresno, California\",1955").unwrap();
    writeln!(f, "2:15,At the park,,0000,,,").unwrap();
    path
}

#[test]
fn test_chapter_sheet_import_decodes_bitfield() {
    let conn = setup_test_db();
    let tmp = TempDir::new().unwrap();
    let master = write_master_csv(tmp.path());
    run_import(&conn, &master, PLAYLIST, false, None).unwrap();

    let sheet = write_chapter_sheet(tmp.path());
    let stats = run_chapter_sheet_import(&conn, "P-61_FROS", &sheet, false).unwrap();
    assert_eq!(stats.chapters, 2);
    assert!(stats.errors.is_empty(), "errors: {:?}", stats.errors);

    let film = schema::get_film_by_file_id(&conn, "P-61_FROS").unwrap().unwrap();
    let chapters = schema::list_chapters(&conn, film.id).unwrap();
    assert_eq!(chapters.len(), 2);

    // Bitfield 0110 -> Linda and Jonathan, plus Ruth from Other People
    let first = &chapters[0];
    let people: Vec<String> = conn
        .prepare(
            "SELECT p.first_name || ' ' || p.last_name FROM chapter_people cp
             JOIN people p ON cp.person_id = p.id WHERE cp.chapter_id = ?1
             ORDER BY p.first_name",
        )
        .unwrap()
        .query_map([first.id], |r| r.get::<_, String>(0))
        .unwrap()
        .collect::<std::result::Result<Vec<_>, _>>()
        .unwrap();
    assert_eq!(people, vec!["Jonathan Hayward", "Linda Hayward", "Ruth Myre"]);

    assert!(first.has_people);
    assert!(first.has_locations);
    assert!(first.has_years);

    // All-zero bitfield chapter has no people
    let second = &chapters[1];
    assert!(!second.has_people);
}

#[test]
fn test_chapter_sheet_import_unknown_film_fails() {
    let conn = setup_test_db();
    let tmp = TempDir::new().unwrap();
    let sheet = write_chapter_sheet(tmp.path());
    assert!(run_chapter_sheet_import(&conn, "NOPE-00", &sheet, false).is_err());
}
