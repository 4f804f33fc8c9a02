// Genealogy: family tree traversal, relationship validation, and
// duplicate-person merging.
//
// People carry nullable self-referential father/mother/spouse links. The
// tree endpoint walks those links breadth-first; the merge operation is the
// only deduplication path for people (name pairs are deliberately not
// unique in the schema).

use std::collections::{HashMap, HashSet, VecDeque};

use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::constants::{DEFAULT_TREE_DEPTH, MAX_TREE_DEPTH};
use crate::db::schema::{self, Person};
use crate::error::{Result, VaultError};

// ---------------------------------------------------------------------------
// Family tree
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeNode {
    pub id: i64,
    pub name: String,
    pub birth_date: Option<String>,
    pub death_date: Option<String>,
    pub father_id: Option<i64>,
    pub mother_id: Option<i64>,
    pub spouse_id: Option<i64>,
    pub children_ids: Vec<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FamilyTree {
    pub root_id: i64,
    pub nodes: Vec<TreeNode>,
}

/// Walk father/mother/spouse/children links breadth-first from a person,
/// bounded by depth. A visited set guards against reference cycles in
/// hand-entered data.
pub fn family_tree_data(conn: &Connection, person_id: i64, depth: Option<u32>) -> Result<FamilyTree> {
    let depth = depth.unwrap_or(DEFAULT_TREE_DEPTH).min(MAX_TREE_DEPTH);

    let root = schema::get_person(conn, person_id)?
        .ok_or(VaultError::PersonNotFound(person_id))?;

    let mut visited: HashSet<i64> = HashSet::new();
    let mut nodes: Vec<TreeNode> = Vec::new();
    let mut queue: VecDeque<(Person, u32)> = VecDeque::new();

    visited.insert(root.id);
    queue.push_back((root, 0));

    while let Some((person, level)) = queue.pop_front() {
        let children = schema::children_of(conn, person.id)?;
        let children_ids: Vec<i64> = children.iter().map(|c| c.id).collect();

        nodes.push(TreeNode {
            id: person.id,
            name: person.full_name(),
            birth_date: person.birth_date.clone(),
            death_date: person.death_date.clone(),
            father_id: person.father_id,
            mother_id: person.mother_id,
            spouse_id: person.spouse_id,
            children_ids: children_ids.clone(),
        });

        if level >= depth {
            continue;
        }

        let mut neighbors: Vec<i64> = Vec::new();
        neighbors.extend(person.father_id);
        neighbors.extend(person.mother_id);
        neighbors.extend(person.spouse_id);
        neighbors.extend(children_ids);

        for id in neighbors {
            if visited.insert(id) {
                if let Some(next) = schema::get_person(conn, id)? {
                    queue.push_back((next, level + 1));
                }
            }
        }
    }

    Ok(FamilyTree { root_id: person_id, nodes })
}

// ---------------------------------------------------------------------------
// Relationship validation
// ---------------------------------------------------------------------------

/// A person may not be their own father, mother, or spouse.
pub fn validate_relationships(
    person_id: i64,
    father_id: Option<i64>,
    mother_id: Option<i64>,
    spouse_id: Option<i64>,
) -> Result<()> {
    for (role, id) in [("father", father_id), ("mother", mother_id), ("spouse", spouse_id)] {
        if id == Some(person_id) {
            return Err(VaultError::InvalidRelationship(format!(
                "person {} cannot be their own {}",
                person_id, role
            )));
        }
    }
    Ok(())
}

/// Validate and store a person's relationship links. Referenced people must
/// exist.
pub fn set_relationships(
    conn: &Connection,
    person_id: i64,
    father_id: Option<i64>,
    mother_id: Option<i64>,
    spouse_id: Option<i64>,
) -> Result<()> {
    schema::get_person(conn, person_id)?
        .ok_or(VaultError::PersonNotFound(person_id))?;

    validate_relationships(person_id, father_id, mother_id, spouse_id)?;

    for id in [father_id, mother_id, spouse_id].into_iter().flatten() {
        schema::get_person(conn, id)?.ok_or(VaultError::PersonNotFound(id))?;
    }

    schema::update_person_relationships(conn, person_id, father_id, mother_id, spouse_id)
}

// ---------------------------------------------------------------------------
// Duplicate detection and merge
// ---------------------------------------------------------------------------

/// Groups of people sharing an exact (first, last) name pair, each group
/// ordered by id ascending.
pub fn find_duplicate_people(conn: &Connection) -> Result<Vec<Vec<Person>>> {
    let people = schema::list_people(conn)?;

    let mut groups: HashMap<(String, String), Vec<Person>> = HashMap::new();
    for person in people {
        groups
            .entry((person.first_name.clone(), person.last_name.clone()))
            .or_default()
            .push(person);
    }

    let mut duplicates: Vec<Vec<Person>> = groups
        .into_values()
        .filter(|group| group.len() > 1)
        .collect();

    for group in &mut duplicates {
        group.sort_by_key(|p| p.id);
    }
    duplicates.sort_by_key(|group| group[0].id);

    Ok(duplicates)
}

#[derive(Debug, Default, Clone, Serialize)]
pub struct MergeStats {
    pub films_moved: usize,
    pub films_skipped: usize,
    pub chapters_moved: usize,
    pub chapters_skipped: usize,
}

/// Merge `src` into `dst`: reassign film and chapter associations (dropping
/// ones dst already has), repoint genealogy references, then delete src.
/// Runs in its own transaction; afterwards nothing references src.
pub fn merge_person(conn: &Connection, dst_id: i64, src_id: i64) -> Result<MergeStats> {
    if dst_id == src_id {
        return Err(VaultError::InvalidRelationship(
            "cannot merge a person into themselves".to_string(),
        ));
    }

    schema::get_person(conn, dst_id)?.ok_or(VaultError::PersonNotFound(dst_id))?;
    schema::get_person(conn, src_id)?.ok_or(VaultError::PersonNotFound(src_id))?;

    let tx = conn.unchecked_transaction()?;
    let mut stats = MergeStats::default();

    // Film links: drop the ones dst already has, move the rest.
    stats.films_skipped = tx.execute(
        "DELETE FROM film_people WHERE person_id = ?1
         AND film_id IN (SELECT film_id FROM film_people WHERE person_id = ?2)",
        params![src_id, dst_id],
    )?;
    stats.films_moved = tx.execute(
        "UPDATE film_people SET person_id = ?1 WHERE person_id = ?2",
        params![dst_id, src_id],
    )?;

    // Chapter links, same shape.
    stats.chapters_skipped = tx.execute(
        "DELETE FROM chapter_people WHERE person_id = ?1
         AND chapter_id IN (SELECT chapter_id FROM chapter_people WHERE person_id = ?2)",
        params![src_id, dst_id],
    )?;
    stats.chapters_moved = tx.execute(
        "UPDATE chapter_people SET person_id = ?1 WHERE person_id = ?2",
        params![dst_id, src_id],
    )?;

    // Repoint genealogy references at the surviving person. A person cannot
    // become their own parent/spouse through the merge.
    tx.execute(
        "UPDATE people SET father_id = ?1 WHERE father_id = ?2 AND id != ?1",
        params![dst_id, src_id],
    )?;
    tx.execute(
        "UPDATE people SET father_id = NULL WHERE father_id = ?1",
        params![src_id],
    )?;
    tx.execute(
        "UPDATE people SET mother_id = ?1 WHERE mother_id = ?2 AND id != ?1",
        params![dst_id, src_id],
    )?;
    tx.execute(
        "UPDATE people SET mother_id = NULL WHERE mother_id = ?1",
        params![src_id],
    )?;
    tx.execute(
        "UPDATE people SET spouse_id = ?1 WHERE spouse_id = ?2 AND id != ?1",
        params![dst_id, src_id],
    )?;
    tx.execute(
        "UPDATE people SET spouse_id = NULL WHERE spouse_id = ?1",
        params![src_id],
    )?;

    // Nothing may reference src anymore.
    let remaining: i64 = tx.query_row(
        "SELECT (SELECT COUNT(*) FROM film_people WHERE person_id = ?1)
              + (SELECT COUNT(*) FROM chapter_people WHERE person_id = ?1)
              + (SELECT COUNT(*) FROM people WHERE father_id = ?1 OR mother_id = ?1 OR spouse_id = ?1)",
        params![src_id],
        |row| row.get(0),
    )?;
    if remaining > 0 {
        tx.rollback()?;
        return Err(VaultError::Other(format!(
            "merge left {} dangling references to person {}",
            remaining, src_id
        )));
    }

    tx.execute("DELETE FROM people WHERE id = ?1", params![src_id])?;
    tx.commit()?;

    info!(
        "Merged person {} into {}: {} film links and {} chapter links moved",
        src_id, dst_id, stats.films_moved, stats.chapters_moved
    );

    Ok(stats)
}

/// Merge every duplicate group into its lowest id. Returns the number of
/// people removed.
pub fn merge_all_duplicates(conn: &Connection, dry_run: bool) -> Result<usize> {
    let duplicates = find_duplicate_people(conn)?;
    let mut merged = 0;

    for group in duplicates {
        let keep = &group[0];
        for person in &group[1..] {
            info!(
                "{} '{}' (id {}) into id {}",
                if dry_run { "Would merge" } else { "Merging" },
                person.full_name(),
                person.id,
                keep.id
            );
            if !dry_run {
                merge_person(conn, keep.id, person.id)?;
            }
            merged += 1;
        }
    }

    Ok(merged)
}

/// Trim and collapse whitespace in stored person names. Returns the number
/// of rows changed.
pub fn normalize_person_names(conn: &Connection) -> Result<usize> {
    let people = schema::list_people(conn)?;
    let mut changed = 0;

    for person in people {
        let first = collapse_whitespace(&person.first_name);
        let last = collapse_whitespace(&person.last_name);
        if first != person.first_name || last != person.last_name {
            schema::update_person_name(conn, person.id, &first, &last)?;
            changed += 1;
        }
    }

    Ok(changed)
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// People with no film or chapter links and no genealogy references,
/// candidates for cleanup after merges.
pub fn orphaned_people(conn: &Connection) -> Result<Vec<Person>> {
    let people = schema::list_people(conn)?;
    let mut orphans = Vec::new();

    for person in people {
        let linked: i64 = conn.query_row(
            "SELECT (SELECT COUNT(*) FROM film_people WHERE person_id = ?1)
                  + (SELECT COUNT(*) FROM chapter_people WHERE person_id = ?1)
                  + (SELECT COUNT(*) FROM people WHERE father_id = ?1 OR mother_id = ?1 OR spouse_id = ?1)",
            params![person.id],
            |row| row.get(0),
        )?;

        let has_genealogy = person.father_id.is_some()
            || person.mother_id.is_some()
            || person.spouse_id.is_some();

        if linked == 0 && !has_genealogy {
            orphans.push(person);
        }
    }

    Ok(orphans)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schema::{
        get_or_create_person, link_chapter_person, link_film_person, upsert_chapter, upsert_film,
        NewFilm,
    };

    fn setup_test_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA foreign_keys = ON;").unwrap();
        crate::db::migrations::run_migrations(&conn).unwrap();
        conn
    }

    fn seed_film(conn: &Connection, file_id: &str) -> i64 {
        upsert_film(conn, &NewFilm {
            file_id: file_id.to_string(),
            title: file_id.to_string(),
            ..Default::default()
        }).unwrap()
    }

    /// Insert a duplicate person directly (get_or_create would reuse the
    /// existing row).
    fn insert_duplicate(conn: &Connection, first: &str, last: &str) -> i64 {
        conn.execute(
            "INSERT INTO people (first_name, last_name) VALUES (?1, ?2)",
            params![first, last],
        ).unwrap();
        conn.last_insert_rowid()
    }

    #[test]
    fn test_merge_reassigns_links_and_deletes_source() {
        let conn = setup_test_db();

        let keep = get_or_create_person(&conn, "Ruth", "Myre", "").unwrap();
        let dup = insert_duplicate(&conn, "Ruth", "Myre");

        let film_a = seed_film(&conn, "A-01");
        let film_b = seed_film(&conn, "B-01");
        let chapter = upsert_chapter(&conn, film_a, 1, "0:00", 0, "Ch", "", "").unwrap();

        // keep appears in film A; dup appears in films A and B and a chapter
        link_film_person(&conn, film_a, keep).unwrap();
        link_film_person(&conn, film_a, dup).unwrap();
        link_film_person(&conn, film_b, dup).unwrap();
        link_chapter_person(&conn, chapter, dup, None).unwrap();

        let stats = merge_person(&conn, keep, dup).unwrap();
        assert_eq!(stats.films_moved, 1); // film B moved
        assert_eq!(stats.films_skipped, 1); // film A link already existed
        assert_eq!(stats.chapters_moved, 1);

        // Source person is gone and nothing references it
        assert!(schema::get_person(&conn, dup).unwrap().is_none());
        let keep_films = schema::person_film_count(&conn, keep).unwrap();
        assert_eq!(keep_films, 2);
    }

    #[test]
    fn test_merge_repoints_genealogy_references() {
        let conn = setup_test_db();

        let keep = get_or_create_person(&conn, "John", "Hayward", "").unwrap();
        let dup = insert_duplicate(&conn, "John", "Hayward");
        let child = get_or_create_person(&conn, "Jonathan", "Hayward", "").unwrap();

        schema::update_person_relationships(&conn, child, Some(dup), None, None).unwrap();

        merge_person(&conn, keep, dup).unwrap();

        let child = schema::get_person(&conn, child).unwrap().unwrap();
        assert_eq!(child.father_id, Some(keep));
    }

    #[test]
    fn test_merge_rejects_self_merge() {
        let conn = setup_test_db();
        let p = get_or_create_person(&conn, "A", "B", "").unwrap();
        assert!(merge_person(&conn, p, p).is_err());
    }

    #[test]
    fn test_find_duplicates_groups_by_exact_name() {
        let conn = setup_test_db();

        let a = get_or_create_person(&conn, "Ruth", "Myre", "").unwrap();
        let b = insert_duplicate(&conn, "Ruth", "Myre");
        get_or_create_person(&conn, "Ruth", "Hayward", "").unwrap();

        let groups = find_duplicate_people(&conn).unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].iter().map(|p| p.id).collect::<Vec<_>>(), vec![a, b]);
    }

    #[test]
    fn test_merge_all_duplicates_dry_run_changes_nothing() {
        let conn = setup_test_db();
        get_or_create_person(&conn, "Ruth", "Myre", "").unwrap();
        insert_duplicate(&conn, "Ruth", "Myre");

        let merged = merge_all_duplicates(&conn, true).unwrap();
        assert_eq!(merged, 1);
        assert_eq!(schema::count_people(&conn).unwrap(), 2);

        let merged = merge_all_duplicates(&conn, false).unwrap();
        assert_eq!(merged, 1);
        assert_eq!(schema::count_people(&conn).unwrap(), 1);
    }

    #[test]
    fn test_family_tree_walks_relations() {
        let conn = setup_test_db();

        let father = get_or_create_person(&conn, "John", "Hayward Jr", "").unwrap();
        let mother = get_or_create_person(&conn, "Linda", "Hayward", "").unwrap();
        let child = get_or_create_person(&conn, "Jonathan", "Hayward", "").unwrap();

        set_relationships(&conn, child, Some(father), Some(mother), None).unwrap();
        set_relationships(&conn, father, None, None, Some(mother)).unwrap();

        let tree = family_tree_data(&conn, child, Some(2)).unwrap();
        assert_eq!(tree.root_id, child);

        let ids: HashSet<i64> = tree.nodes.iter().map(|n| n.id).collect();
        assert!(ids.contains(&child));
        assert!(ids.contains(&father));
        assert!(ids.contains(&mother));

        let child_node = tree.nodes.iter().find(|n| n.id == child).unwrap();
        assert_eq!(child_node.father_id, Some(father));

        let father_node = tree.nodes.iter().find(|n| n.id == father).unwrap();
        assert!(father_node.children_ids.contains(&child));
    }

    #[test]
    fn test_family_tree_survives_cycles() {
        let conn = setup_test_db();

        let a = get_or_create_person(&conn, "A", "One", "").unwrap();
        let b = get_or_create_person(&conn, "B", "Two", "").unwrap();

        // Mutual spouses form a cycle
        set_relationships(&conn, a, None, None, Some(b)).unwrap();
        set_relationships(&conn, b, None, None, Some(a)).unwrap();

        let tree = family_tree_data(&conn, a, Some(5)).unwrap();
        assert_eq!(tree.nodes.len(), 2);
    }

    #[test]
    fn test_self_reference_rejected() {
        let conn = setup_test_db();
        let p = get_or_create_person(&conn, "A", "B", "").unwrap();

        assert!(set_relationships(&conn, p, Some(p), None, None).is_err());
        assert!(set_relationships(&conn, p, None, Some(p), None).is_err());
        assert!(set_relationships(&conn, p, None, None, Some(p)).is_err());
    }

    #[test]
    fn test_normalize_person_names() {
        let conn = setup_test_db();
        insert_duplicate(&conn, "  Ruth ", "Myre  Smith");

        let changed = normalize_person_names(&conn).unwrap();
        assert_eq!(changed, 1);

        let people = schema::list_people(&conn).unwrap();
        assert_eq!(people[0].first_name, "Ruth");
        assert_eq!(people[0].last_name, "Myre Smith");
    }

    #[test]
    fn test_orphaned_people() {
        let conn = setup_test_db();

        let orphan = get_or_create_person(&conn, "No", "Links", "").unwrap();
        let linked = get_or_create_person(&conn, "Has", "Links", "").unwrap();
        let film = seed_film(&conn, "F-01");
        link_film_person(&conn, film, linked).unwrap();

        let orphans = orphaned_people(&conn).unwrap();
        assert_eq!(orphans.len(), 1);
        assert_eq!(orphans[0].id, orphan);
    }
}
