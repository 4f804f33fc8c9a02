// Spreadsheet cell parsing for catalog import
//
// The source sheet is hand-maintained: multi-line cells, uneven delimiters,
// descriptive fragments mixed into name lists. These helpers normalize that
// into rows the schema layer can store.

use regex::Regex;
use std::sync::OnceLock;

use crate::error::{Result, VaultError};

fn year_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d{4}").unwrap())
}

fn chapter_line_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d{1,2}:\d{2}(?::\d{2})?)\s+(.+)$").unwrap())
}

fn nee_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\(nee [^)]+\)").unwrap())
}

/// Convert MM:SS or HH:MM:SS to seconds.
pub fn parse_time_to_seconds(time_str: &str) -> Result<i64> {
    let parts: Vec<&str> = time_str.trim().split(':').collect();
    let numbers: Vec<i64> = parts
        .iter()
        .map(|p| p.parse::<i64>())
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|_| VaultError::InvalidTime(time_str.to_string()))?;

    match numbers.as_slice() {
        [m, s] if *s < 60 => Ok(m * 60 + s),
        [h, m, s] if *m < 60 && *s < 60 => Ok(h * 3600 + m * 60 + s),
        _ => Err(VaultError::InvalidTime(time_str.to_string())),
    }
}

/// Parse a duration cell like "0:09:26" to seconds. Empty cells are None.
pub fn parse_duration_seconds(duration_str: &str) -> Option<i64> {
    let trimmed = duration_str.trim();
    if trimmed.is_empty() {
        return None;
    }
    let parts: Vec<&str> = trimmed.split(':').collect();
    if parts.len() != 3 {
        return None;
    }
    let hours: i64 = parts[0].parse().ok()?;
    let minutes: i64 = parts[1].parse().ok()?;
    let seconds: i64 = parts[2].parse().ok()?;
    Some(hours * 3600 + minutes * 60 + seconds)
}

/// All 4-digit years in a free-text field, sorted and deduplicated.
pub fn extract_years(years_str: &str) -> Vec<i64> {
    let mut years: Vec<i64> = year_re()
        .find_iter(years_str)
        .filter_map(|m| m.as_str().parse().ok())
        .collect();
    years.sort_unstable();
    years.dedup();
    years
}

/// Split a people cell into individual names.
/// Delimiters: comma, "and", "&", newline. Descriptive fragments dropped.
pub fn parse_people_list(people_str: &str) -> Vec<String> {
    if people_str.trim().is_empty() {
        return Vec::new();
    }

    static SPLIT_RE: OnceLock<Regex> = OnceLock::new();
    let split_re = SPLIT_RE.get_or_init(|| Regex::new(r",|\band\b|&|\n").unwrap());

    static DESC_RE: OnceLock<Regex> = OnceLock::new();
    let desc_re = DESC_RE.get_or_init(|| Regex::new(r"^(and their|with|including)").unwrap());

    split_re
        .split(people_str)
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .filter(|p| !desc_re.is_match(&p.to_lowercase()))
        .map(|p| p.to_string())
        .collect()
}

/// Split a locations cell into location names.
/// Delimiters: comma, semicolon, newline; "Location(s):" prefixes stripped;
/// order-preserving dedup.
pub fn parse_locations_list(locations_str: &str) -> Vec<String> {
    if locations_str.trim().is_empty() {
        return Vec::new();
    }

    static PREFIX_RE: OnceLock<Regex> = OnceLock::new();
    let prefix_re = PREFIX_RE.get_or_init(|| Regex::new(r"(?i)^(Locations?:?\s*)").unwrap());

    let mut cleaned: Vec<String> = Vec::new();
    for part in locations_str.split(|c| c == ',' || c == ';' || c == '\n') {
        let loc = prefix_re.replace(part.trim(), "").trim().to_string();
        if !loc.is_empty() && !cleaned.contains(&loc) {
            cleaned.push(loc);
        }
    }
    cleaned
}

/// Split a full name into (first, last). First word is the first name, the
/// rest is the last name with any "(nee …)" parenthetical removed.
pub fn split_person_name(full_name: &str) -> Option<(String, String)> {
    let trimmed = full_name.trim();
    if trimmed.is_empty() {
        return None;
    }

    let mut parts = trimmed.split_whitespace();
    let first = parts.next().unwrap_or_default().to_string();
    let rest: Vec<&str> = parts.collect();
    let last = nee_re().replace_all(&rest.join(" "), "").trim().to_string();

    Some((first, last))
}

/// Parse a location name like "Oakland, California" into (name, city, state).
/// Anything that isn't a two-part "City, State" keeps the whole string as the
/// name with empty city/state.
pub fn split_location_name(location: &str) -> (String, String, String) {
    let trimmed = location.trim();
    if trimmed.contains(',') {
        let parts: Vec<&str> = trimmed.split(',').map(|p| p.trim()).collect();
        if parts.len() == 2 {
            let (city, state) = (parts[0].to_string(), parts[1].to_string());
            return (format!("{}, {}", city, state), city, state);
        }
    }
    (trimmed.to_string(), String::new(), String::new())
}

/// Parse a multi-line chapters cell into ordered (start_time, title) pairs.
/// Lines without a leading timestamp are skipped.
pub fn parse_chapter_lines(chapters_str: &str) -> Vec<(String, String)> {
    chapters_str
        .lines()
        .filter_map(|line| {
            let line = line.trim();
            chapter_line_re().captures(line).map(|caps| {
                (caps[1].to_string(), caps[2].trim().to_string())
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_time_mm_ss() {
        assert_eq!(parse_time_to_seconds("9:26").unwrap(), 566);
        assert_eq!(parse_time_to_seconds("0:00").unwrap(), 0);
        assert_eq!(parse_time_to_seconds("12:05").unwrap(), 725);
    }

    #[test]
    fn test_parse_time_hh_mm_ss() {
        assert_eq!(parse_time_to_seconds("1:02:03").unwrap(), 3723);
        assert_eq!(parse_time_to_seconds("0:09:26").unwrap(), 566);
    }

    #[test]
    fn test_parse_time_rejects_malformed() {
        assert!(parse_time_to_seconds("").is_err());
        assert!(parse_time_to_seconds("abc").is_err());
        assert!(parse_time_to_seconds("1:99").is_err());
        assert!(parse_time_to_seconds("1:2:3:4").is_err());
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration_seconds("0:09:26"), Some(566));
        assert_eq!(parse_duration_seconds("1:00:00"), Some(3600));
        assert_eq!(parse_duration_seconds(""), None);
        assert_eq!(parse_duration_seconds("9:26"), None);
    }

    #[test]
    fn test_extract_years() {
        assert_eq!(extract_years("1962-1963"), vec![1962, 1963]);
        assert_eq!(extract_years("filmed 1955, also 1955 and 1957"), vec![1955, 1957]);
        assert!(extract_years("no years here").is_empty());
    }

    #[test]
    fn test_parse_people_list() {
        let people = parse_people_list("John Hayward Jr, Linda Hayward and Jonathan Hayward");
        assert_eq!(people, vec!["John Hayward Jr", "Linda Hayward", "Jonathan Hayward"]);
    }

    #[test]
    fn test_parse_people_list_drops_descriptive() {
        let people = parse_people_list("Ruth Myre, with various cousins\nincluding neighbors");
        assert_eq!(people, vec!["Ruth Myre"]);
    }

    #[test]
    fn test_parse_people_list_empty() {
        assert!(parse_people_list("  ").is_empty());
    }

    #[test]
    fn test_parse_locations_list() {
        let locs = parse_locations_list("Locations: Oakland, California; Disneyland");
        assert_eq!(locs, vec!["Oakland", "California", "Disneyland"]);
    }

    #[test]
    fn test_parse_locations_dedup() {
        let locs = parse_locations_list("Disneyland\nDisneyland, Yosemite");
        assert_eq!(locs, vec!["Disneyland", "Yosemite"]);
    }

    #[test]
    fn test_split_person_name() {
        assert_eq!(
            split_person_name("John Hayward Jr"),
            Some(("John".to_string(), "Hayward Jr".to_string()))
        );
        assert_eq!(
            split_person_name("Linda Hayward (nee Thompson)"),
            Some(("Linda".to_string(), "Hayward".to_string()))
        );
        assert_eq!(
            split_person_name("Ruth"),
            Some(("Ruth".to_string(), "".to_string()))
        );
        assert_eq!(split_person_name("   "), None);
    }

    #[test]
    fn test_split_location_name() {
        assert_eq!(
            split_location_name("Oakland, California"),
            ("Oakland, California".to_string(), "Oakland".to_string(), "California".to_string())
        );
        assert_eq!(
            split_location_name("Disneyland"),
            ("Disneyland".to_string(), String::new(), String::new())
        );
    }

    #[test]
    fn test_parse_chapter_lines() {
        let cell = "0:00 Opening at the lake\n2:15 Birthday party\nno timestamp here\n1:02:03 Closing";
        let chapters = parse_chapter_lines(cell);
        assert_eq!(chapters.len(), 3);
        assert_eq!(chapters[0], ("0:00".to_string(), "Opening at the lake".to_string()));
        assert_eq!(chapters[1], ("2:15".to_string(), "Birthday party".to_string()));
        assert_eq!(chapters[2], ("1:02:03".to_string(), "Closing".to_string()));
    }
}
