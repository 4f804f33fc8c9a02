// Catalog search
//
// LIKE-based substring filtering across films, chapters, people, locations
// and tags, always excluding films that still carry a placeholder YouTube
// id. Entity browse queries annotate each entity with a film count that
// combines film-level and chapter-level links.

use std::collections::BTreeMap;

use rusqlite::{params, Connection};
use serde::Serialize;

use crate::constants::{AUTOCOMPLETE_LIMIT, SEARCH_SECTION_LIMIT};
use crate::db::schema::{self, Chapter, Film, Location, Person, Tag};
use crate::error::Result;
use crate::import::parse;

// The underscore is escaped so LIKE treats it literally.
const NOT_PLACEHOLDER: &str =
    "(f.youtube_id IS NULL OR f.youtube_id NOT LIKE 'placeholder\\_%' ESCAPE '\\')";

fn like_pattern(query: &str) -> String {
    format!("%{}%", query.trim())
}

// ---------------------------------------------------------------------------
// Overall search
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct SearchCounts {
    pub films: i64,
    pub chapters: i64,
    pub people: i64,
    pub locations: i64,
    pub tags: i64,
}

#[derive(Debug, Serialize)]
pub struct ChapterHit {
    pub chapter: Chapter,
    pub film_file_id: String,
    pub film_title: String,
}

#[derive(Debug, Serialize)]
pub struct PersonHit {
    pub person: Person,
    pub film_count: i64,
}

#[derive(Debug, Serialize)]
pub struct LocationHit {
    pub location: Location,
    pub film_count: i64,
}

#[derive(Debug, Serialize)]
pub struct TagHit {
    pub tag: Tag,
    pub film_count: i64,
}

#[derive(Debug, Serialize)]
pub struct OverallResults {
    pub query: String,
    pub films: Vec<Film>,
    pub chapters: Vec<ChapterHit>,
    pub people: Vec<PersonHit>,
    pub locations: Vec<LocationHit>,
    pub tags: Vec<TagHit>,
    pub totals: SearchCounts,
}

/// Search films, chapters, people, locations and tags for a substring.
/// Section lists are capped; totals carry the full counts.
pub fn overall_search(conn: &Connection, query: &str) -> Result<OverallResults> {
    if query.trim().is_empty() {
        return Ok(OverallResults {
            query: String::new(),
            films: Vec::new(),
            chapters: Vec::new(),
            people: Vec::new(),
            locations: Vec::new(),
            tags: Vec::new(),
            totals: SearchCounts { films: 0, chapters: 0, people: 0, locations: 0, tags: 0 },
        });
    }

    let pattern = like_pattern(query);

    let films = search_films(conn, &pattern, SEARCH_SECTION_LIMIT)?;
    let chapters = search_chapters(conn, &pattern, SEARCH_SECTION_LIMIT)?;
    let people = search_people(conn, &pattern, SEARCH_SECTION_LIMIT)?;
    let locations = search_locations(conn, &pattern, SEARCH_SECTION_LIMIT)?;
    let tags = search_tags(conn, &pattern, SEARCH_SECTION_LIMIT)?;

    let totals = SearchCounts {
        films: count_query(
            conn,
            &format!(
                "SELECT COUNT(*) FROM films f
                 WHERE {} AND (f.title LIKE ?1 OR f.description LIKE ?1 OR f.summary LIKE ?1)",
                NOT_PLACEHOLDER
            ),
            &pattern,
        )?,
        chapters: count_query(
            conn,
            &format!(
                "SELECT COUNT(*) FROM chapters c JOIN films f ON c.film_id = f.id
                 WHERE {} AND (c.title LIKE ?1 OR c.description LIKE ?1)",
                NOT_PLACEHOLDER
            ),
            &pattern,
        )?,
        people: count_query(
            conn,
            "SELECT COUNT(*) FROM people WHERE first_name LIKE ?1 OR last_name LIKE ?1",
            &pattern,
        )?,
        locations: count_query(
            conn,
            "SELECT COUNT(*) FROM locations WHERE name LIKE ?1 OR description LIKE ?1",
            &pattern,
        )?,
        tags: count_query(conn, "SELECT COUNT(*) FROM tags WHERE tag LIKE ?1", &pattern)?,
    };

    Ok(OverallResults {
        query: query.trim().to_string(),
        films,
        chapters,
        people,
        locations,
        tags,
        totals,
    })
}

fn count_query(conn: &Connection, sql: &str, pattern: &str) -> Result<i64> {
    let count: i64 = conn.query_row(sql, params![pattern], |row| row.get(0))?;
    Ok(count)
}

fn search_films(conn: &Connection, pattern: &str, limit: i64) -> Result<Vec<Film>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT f.id, f.file_id, f.title, f.description, f.summary, f.youtube_id, f.youtube_url,
                f.duration_seconds, f.upload_date, f.thumbnail_url, f.thumbnail_high_url,
                f.thumbnail_medium_url, f.preview_sprite_path, f.preview_frame_count,
                f.preview_frame_interval, f.preview_frame_width, f.preview_frame_height,
                f.years, f.technical_notes, f.workflow_state, f.playlist_order, f.created_at
         FROM films f
         WHERE {} AND (f.title LIKE ?1 OR f.description LIKE ?1 OR f.summary LIKE ?1)
         ORDER BY f.title ASC
         LIMIT ?2",
        NOT_PLACEHOLDER
    ))?;

    let films = stmt.query_map(params![pattern, limit], |row| {
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
    })?.collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(films)
}

fn search_chapters(conn: &Connection, pattern: &str, limit: i64) -> Result<Vec<ChapterHit>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT c.id, c.film_id, c.position, c.start_time, c.start_time_seconds, c.title,
                c.description, c.years, c.thumbnail_path, c.has_people, c.has_locations,
                c.has_tags, c.has_years, f.file_id, f.title
         FROM chapters c JOIN films f ON c.film_id = f.id
         WHERE {} AND (c.title LIKE ?1 OR c.description LIKE ?1)
         ORDER BY f.title ASC, c.position ASC
         LIMIT ?2",
        NOT_PLACEHOLDER
    ))?;

    let hits = stmt.query_map(params![pattern, limit], |row| {
        Ok(ChapterHit {
            chapter: Chapter {
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
            },
            film_file_id: row.get(13)?,
            film_title: row.get(14)?,
        })
    })?.collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(hits)
}

fn search_people(conn: &Connection, pattern: &str, limit: i64) -> Result<Vec<PersonHit>> {
    let people = {
        let mut stmt = conn.prepare(
            "SELECT id FROM people
             WHERE first_name LIKE ?1 OR last_name LIKE ?1
             ORDER BY last_name ASC, first_name ASC
             LIMIT ?2"
        )?;
        let rows = stmt.query_map(params![pattern, limit], |row| row.get::<_, i64>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        rows
    };

    let mut hits = Vec::with_capacity(people.len());
    for id in people {
        if let Some(person) = schema::get_person(conn, id)? {
            let film_count = schema::person_film_count(conn, id)?;
            hits.push(PersonHit { person, film_count });
        }
    }
    Ok(hits)
}

fn search_locations(conn: &Connection, pattern: &str, limit: i64) -> Result<Vec<LocationHit>> {
    let ids = {
        let mut stmt = conn.prepare(
            "SELECT id FROM locations
             WHERE name LIKE ?1 OR description LIKE ?1
             ORDER BY name ASC
             LIMIT ?2"
        )?;
        let rows = stmt.query_map(params![pattern, limit], |row| row.get::<_, i64>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        rows
    };

    let mut hits = Vec::with_capacity(ids.len());
    for id in ids {
        if let Some(location) = schema::get_location(conn, id)? {
            let film_count = schema::location_film_count(conn, id)?;
            hits.push(LocationHit { location, film_count });
        }
    }
    Ok(hits)
}

fn search_tags(conn: &Connection, pattern: &str, limit: i64) -> Result<Vec<TagHit>> {
    let tags = {
        let mut stmt = conn.prepare(
            "SELECT tag, category, description FROM tags WHERE tag LIKE ?1 ORDER BY tag ASC LIMIT ?2"
        )?;
        let rows = stmt.query_map(params![pattern, limit], |row| {
            Ok(Tag {
                tag: row.get(0)?,
                category: row.get(1)?,
                description: row.get(2)?,
            })
        })?.collect::<std::result::Result<Vec<_>, _>>()?;
        rows
    };

    let mut hits = Vec::with_capacity(tags.len());
    for tag in tags {
        let film_count = schema::tag_film_count(conn, &tag.tag)?;
        hits.push(TagHit { tag, film_count });
    }
    Ok(hits)
}

// ---------------------------------------------------------------------------
// Entity browse (people / locations / tags with film counts)
// ---------------------------------------------------------------------------

/// People that appear in at least one film, with film counts. An optional
/// substring filter narrows the list.
pub fn browse_people(conn: &Connection, query: Option<&str>) -> Result<Vec<PersonHit>> {
    let mut hits = Vec::new();
    for person in schema::list_people(conn)? {
        if let Some(q) = query {
            let pattern = q.trim().to_lowercase();
            if !person.first_name.to_lowercase().contains(&pattern)
                && !person.last_name.to_lowercase().contains(&pattern)
            {
                continue;
            }
        }
        let film_count = schema::person_film_count(conn, person.id)?;
        if film_count > 0 {
            hits.push(PersonHit { person, film_count });
        }
    }
    Ok(hits)
}

pub fn browse_locations(conn: &Connection, query: Option<&str>) -> Result<Vec<LocationHit>> {
    let mut hits = Vec::new();
    for location in schema::list_locations(conn)? {
        if let Some(q) = query {
            let pattern = q.trim().to_lowercase();
            if !location.name.to_lowercase().contains(&pattern)
                && !location.city.to_lowercase().contains(&pattern)
                && !location.state.to_lowercase().contains(&pattern)
            {
                continue;
            }
        }
        let film_count = schema::location_film_count(conn, location.id)?;
        if film_count > 0 {
            hits.push(LocationHit { location, film_count });
        }
    }
    Ok(hits)
}

/// Tags grouped by category, counted, filtered to tags with films.
pub fn browse_tags(conn: &Connection, category: Option<&str>) -> Result<BTreeMap<String, Vec<TagHit>>> {
    let mut grouped: BTreeMap<String, Vec<TagHit>> = BTreeMap::new();

    for tag in schema::list_tags(conn)? {
        if let Some(cat) = category {
            if tag.category != cat {
                continue;
            }
        }
        let film_count = schema::tag_film_count(conn, &tag.tag)?;
        if film_count > 0 {
            grouped.entry(tag.category.clone()).or_default().push(TagHit { tag, film_count });
        }
    }

    Ok(grouped)
}

// ---------------------------------------------------------------------------
// Films by selected entities
// ---------------------------------------------------------------------------

/// Films linked to any of the selected people, directly or through a
/// chapter.
pub fn films_for_people(conn: &Connection, person_ids: &[i64]) -> Result<Vec<Film>> {
    films_for_entity(conn, person_ids, "film_people", "person_id", "chapter_people")
}

pub fn films_for_locations(conn: &Connection, location_ids: &[i64]) -> Result<Vec<Film>> {
    films_for_entity(conn, location_ids, "film_locations", "location_id", "chapter_locations")
}

fn films_for_entity(
    conn: &Connection,
    ids: &[i64],
    film_table: &str,
    id_column: &str,
    chapter_table: &str,
) -> Result<Vec<Film>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let placeholders = ids.iter().map(|_| "?").collect::<Vec<_>>().join(", ");
    let sql = format!(
        "SELECT DISTINCT f.id FROM films f
         WHERE {np}
           AND (f.id IN (SELECT film_id FROM {ft} WHERE {idc} IN ({ph}))
             OR f.id IN (SELECT c.film_id FROM {ct} x
                         JOIN chapters c ON x.chapter_id = c.id
                         WHERE x.{idc} IN ({ph})))
         ORDER BY f.id ASC",
        np = NOT_PLACEHOLDER,
        ft = film_table,
        idc = id_column,
        ph = placeholders,
        ct = chapter_table,
    );

    let mut stmt = conn.prepare(&sql)?;
    let mut bound: Vec<&dyn rusqlite::ToSql> = Vec::with_capacity(ids.len() * 2);
    for id in ids {
        bound.push(id);
    }
    for id in ids {
        bound.push(id);
    }

    let film_ids = stmt.query_map(bound.as_slice(), |row| row.get::<_, i64>(0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut films = Vec::with_capacity(film_ids.len());
    for id in film_ids {
        if let Some(film) = schema::get_film(conn, id)? {
            films.push(film);
        }
    }
    Ok(films)
}

/// Films tagged with any of the selected tags, directly or through a
/// chapter.
pub fn films_for_tags(conn: &Connection, tags: &[String]) -> Result<Vec<Film>> {
    if tags.is_empty() {
        return Ok(Vec::new());
    }

    let placeholders = tags.iter().map(|_| "?").collect::<Vec<_>>().join(", ");
    let sql = format!(
        "SELECT DISTINCT f.id FROM films f
         WHERE {np}
           AND (f.id IN (SELECT film_id FROM film_tags WHERE tag IN ({ph}))
             OR f.id IN (SELECT c.film_id FROM chapter_tags ct
                         JOIN chapters c ON ct.chapter_id = c.id
                         WHERE ct.tag IN ({ph})))
         ORDER BY f.id ASC",
        np = NOT_PLACEHOLDER,
        ph = placeholders,
    );

    let mut stmt = conn.prepare(&sql)?;
    let mut bound: Vec<&dyn rusqlite::ToSql> = Vec::with_capacity(tags.len() * 2);
    for tag in tags {
        bound.push(tag);
    }
    for tag in tags {
        bound.push(tag);
    }

    let film_ids = stmt.query_map(bound.as_slice(), |row| row.get::<_, i64>(0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut films = Vec::with_capacity(film_ids.len());
    for id in film_ids {
        if let Some(film) = schema::get_film(conn, id)? {
            films.push(film);
        }
    }
    Ok(films)
}

// ---------------------------------------------------------------------------
// Years / decades
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct YearCount {
    pub year: i64,
    pub count: i64,
}

/// Per-year film counts from film and chapter years fields, grouped into
/// decades.
pub fn years_by_decade(conn: &Connection) -> Result<BTreeMap<i64, Vec<YearCount>>> {
    let mut counts: BTreeMap<i64, i64> = BTreeMap::new();

    for film in schema::all_films(conn)? {
        if film
            .youtube_id
            .as_deref()
            .map(|id| id.starts_with(crate::constants::PLACEHOLDER_ID_PREFIX))
            .unwrap_or(false)
        {
            continue;
        }

        let mut years: Vec<i64> = parse::extract_years(&film.years);
        for field in schema::film_years_fields(conn, film.id)? {
            years.extend(parse::extract_years(&field));
        }
        years.sort_unstable();
        years.dedup();

        for year in years {
            *counts.entry(year).or_insert(0) += 1;
        }
    }

    let mut decades: BTreeMap<i64, Vec<YearCount>> = BTreeMap::new();
    for (year, count) in counts {
        let decade = (year / 10) * 10;
        decades.entry(decade).or_default().push(YearCount { year, count });
    }

    Ok(decades)
}

/// Films whose years field (or any chapter's) mentions any selected year.
pub fn films_for_years(conn: &Connection, years: &[i64]) -> Result<Vec<Film>> {
    if years.is_empty() {
        return Ok(Vec::new());
    }

    let wanted: std::collections::HashSet<i64> = years.iter().copied().collect();
    let mut films = Vec::new();

    for film in schema::all_films(conn)? {
        if film
            .youtube_id
            .as_deref()
            .map(|id| id.starts_with(crate::constants::PLACEHOLDER_ID_PREFIX))
            .unwrap_or(false)
        {
            continue;
        }

        let mut film_years: Vec<i64> = parse::extract_years(&film.years);
        for field in schema::film_years_fields(conn, film.id)? {
            film_years.extend(parse::extract_years(&field));
        }

        if film_years.iter().any(|y| wanted.contains(y)) {
            films.push(film);
        }
    }

    Ok(films)
}

// ---------------------------------------------------------------------------
// Autocomplete
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct AutocompleteEntry {
    pub id: i64,
    pub name: String,
    pub film_count: i64,
}

pub fn people_autocomplete(conn: &Connection, query: &str) -> Result<Vec<AutocompleteEntry>> {
    if query.trim().is_empty() {
        return Ok(Vec::new());
    }

    let hits = search_people(conn, &like_pattern(query), AUTOCOMPLETE_LIMIT * 3)?;
    Ok(hits
        .into_iter()
        .filter(|h| h.film_count > 0)
        .take(AUTOCOMPLETE_LIMIT as usize)
        .map(|h| AutocompleteEntry {
            id: h.person.id,
            name: h.person.full_name(),
            film_count: h.film_count,
        })
        .collect())
}

pub fn locations_autocomplete(conn: &Connection, query: &str) -> Result<Vec<AutocompleteEntry>> {
    if query.trim().is_empty() {
        return Ok(Vec::new());
    }

    let hits = search_locations(conn, &like_pattern(query), AUTOCOMPLETE_LIMIT * 3)?;
    Ok(hits
        .into_iter()
        .filter(|h| h.film_count > 0)
        .take(AUTOCOMPLETE_LIMIT as usize)
        .map(|h| AutocompleteEntry {
            id: h.location.id,
            name: h.location.name,
            film_count: h.film_count,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schema::{
        get_or_create_location, get_or_create_person, get_or_create_tag, link_chapter_person,
        link_film_location, link_film_person, link_film_tag, upsert_chapter, upsert_film, NewFilm,
    };

    fn setup_test_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA foreign_keys = ON;").unwrap();
        crate::db::migrations::run_migrations(&conn).unwrap();
        conn
    }

    fn seed_film(conn: &Connection, file_id: &str, title: &str, youtube_id: Option<&str>, years: &str) -> i64 {
        upsert_film(conn, &NewFilm {
            file_id: file_id.to_string(),
            title: title.to_string(),
            description: "desc".to_string(),
            youtube_id: youtube_id.map(|s| s.to_string()),
            years: years.to_string(),
            ..Default::default()
        }).unwrap()
    }

    #[test]
    fn test_overall_search_excludes_placeholder_films() {
        let conn = setup_test_db();
        seed_film(&conn, "A-01", "Christmas Morning", Some("vid1"), "1962");
        seed_film(&conn, "B-01", "Christmas Eve", Some("placeholder_B-01"), "1963");

        let results = overall_search(&conn, "christmas").unwrap();
        assert_eq!(results.totals.films, 1);
        assert_eq!(results.films.len(), 1);
        assert_eq!(results.films[0].file_id, "A-01");
    }

    #[test]
    fn test_overall_search_finds_chapters_and_entities() {
        let conn = setup_test_db();
        let film = seed_film(&conn, "A-01", "Trip", Some("vid1"), "");
        upsert_chapter(&conn, film, 1, "0:00", 0, "Christmas at the lake", "", "").unwrap();

        let person = get_or_create_person(&conn, "Chris", "Hayward", "").unwrap();
        link_film_person(&conn, film, person).unwrap();

        let location = get_or_create_location(&conn, "Christmas Valley", "", "", "").unwrap();
        link_film_location(&conn, film, location).unwrap();

        let tag = get_or_create_tag(&conn, "christmas", "holidays", "").unwrap();
        link_film_tag(&conn, film, &tag, false).unwrap();

        let results = overall_search(&conn, "chris").unwrap();
        assert_eq!(results.chapters.len(), 1);
        assert_eq!(results.chapters[0].film_file_id, "A-01");
        assert_eq!(results.people.len(), 1);
        assert_eq!(results.people[0].film_count, 1);
        assert_eq!(results.locations.len(), 1);
        assert_eq!(results.tags.len(), 1);
        assert_eq!(results.tags[0].film_count, 1);
    }

    #[test]
    fn test_browse_people_requires_film_links() {
        let conn = setup_test_db();
        let film = seed_film(&conn, "A-01", "Trip", Some("vid1"), "");

        let linked = get_or_create_person(&conn, "Ruth", "Myre", "").unwrap();
        link_film_person(&conn, film, linked).unwrap();
        get_or_create_person(&conn, "No", "Films", "").unwrap();

        let hits = browse_people(&conn, None).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].person.id, linked);
    }

    #[test]
    fn test_films_for_people_includes_chapter_links() {
        let conn = setup_test_db();
        let film_a = seed_film(&conn, "A-01", "Direct", Some("vid1"), "");
        let film_b = seed_film(&conn, "B-01", "Via chapter", Some("vid2"), "");
        let chapter = upsert_chapter(&conn, film_b, 1, "0:00", 0, "Ch", "", "").unwrap();

        let person = get_or_create_person(&conn, "Ruth", "Myre", "").unwrap();
        link_film_person(&conn, film_a, person).unwrap();
        link_chapter_person(&conn, chapter, person, None).unwrap();

        let films = films_for_people(&conn, &[person]).unwrap();
        let file_ids: Vec<&str> = films.iter().map(|f| f.file_id.as_str()).collect();
        assert_eq!(file_ids, vec!["A-01", "B-01"]);
    }

    #[test]
    fn test_films_for_tags() {
        let conn = setup_test_db();
        let film = seed_film(&conn, "A-01", "Tagged", Some("vid1"), "");
        let tag = get_or_create_tag(&conn, "disney", "themes", "").unwrap();
        link_film_tag(&conn, film, &tag, false).unwrap();

        let films = films_for_tags(&conn, &[tag]).unwrap();
        assert_eq!(films.len(), 1);
        assert!(films_for_tags(&conn, &["nothing".to_string()]).unwrap().is_empty());
    }

    #[test]
    fn test_years_by_decade() {
        let conn = setup_test_db();
        let film = seed_film(&conn, "A-01", "Years", Some("vid1"), "1955, 1962");
        upsert_chapter(&conn, film, 1, "0:00", 0, "Ch", "", "1963").unwrap();
        seed_film(&conn, "B-01", "More", Some("vid2"), "1955");

        let decades = years_by_decade(&conn).unwrap();
        assert_eq!(decades.len(), 2);

        let fifties = &decades[&1950];
        assert_eq!(fifties.len(), 1);
        assert_eq!(fifties[0].year, 1955);
        assert_eq!(fifties[0].count, 2);

        let sixties = &decades[&1960];
        let years: Vec<i64> = sixties.iter().map(|y| y.year).collect();
        assert_eq!(years, vec![1962, 1963]);
    }

    #[test]
    fn test_films_for_years_spans_chapter_years() {
        let conn = setup_test_db();
        let film = seed_film(&conn, "A-01", "Years", Some("vid1"), "1955");
        upsert_chapter(&conn, film, 1, "0:00", 0, "Ch", "", "1963").unwrap();

        assert_eq!(films_for_years(&conn, &[1963]).unwrap().len(), 1);
        assert_eq!(films_for_years(&conn, &[1970]).unwrap().len(), 0);
    }

    #[test]
    fn test_autocomplete_caps_and_filters() {
        let conn = setup_test_db();
        let film = seed_film(&conn, "A-01", "Trip", Some("vid1"), "");

        let ruth = get_or_create_person(&conn, "Ruth", "Myre", "").unwrap();
        link_film_person(&conn, film, ruth).unwrap();
        // Person without films never autocompletes
        get_or_create_person(&conn, "Ruthless", "Nobody", "").unwrap();

        let entries = people_autocomplete(&conn, "ruth").unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "Ruth Myre");

        assert!(people_autocomplete(&conn, "  ").unwrap().is_empty());
    }
}
