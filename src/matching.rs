// YouTube title matching
//
// Matches catalog films to videos in the YouTube metadata cache by fuzzy
// title similarity. Scores blend a normalized edit-distance ratio with
// word-set overlap; candidates land in confidence tiers that decide whether
// a mapping is applied automatically or routed to manual review.

use std::collections::HashSet;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::constants::{
    MATCH_AUTO_APPLY_THRESHOLD, MATCH_LOW_THRESHOLD, MATCH_OVERLAP_WEIGHT,
    MATCH_RATIO_WEIGHT, MATCH_REVIEW_THRESHOLD, TITLE_STOPWORDS,
};
use crate::db::schema::Film;
use crate::youtube::CachedVideo;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    High,
    Medium,
    Low,
    NoMatch,
}

impl Confidence {
    pub fn from_score(score: f64, threshold: f64) -> Self {
        if score >= threshold {
            Confidence::High
        } else if score >= MATCH_REVIEW_THRESHOLD {
            Confidence::Medium
        } else if score >= MATCH_LOW_THRESHOLD {
            Confidence::Low
        } else {
            Confidence::NoMatch
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Confidence::High => "High Confidence",
            Confidence::Medium => "Medium Confidence",
            Confidence::Low => "Low Confidence",
            Confidence::NoMatch => "No Match",
        }
    }

    /// What the mapping apply step should do with a match at this tier.
    pub fn action(&self) -> &'static str {
        match self {
            Confidence::High => "AUTO_APPLY",
            Confidence::Medium => "REVIEW_RECOMMENDED",
            Confidence::Low | Confidence::NoMatch => "MANUAL_REVIEW_REQUIRED",
        }
    }
}

/// Best cached-video candidate for one film.
#[derive(Debug, Clone)]
pub struct MatchCandidate {
    pub file_id: String,
    pub film_title: String,
    pub current_youtube_id: Option<String>,
    pub video_id: String,
    pub video_url: String,
    pub video_title: String,
    pub score: f64,
    pub confidence: Confidence,
}

/// Normalize a title for scoring: lowercase, punctuation to spaces,
/// stopwords removed, whitespace collapsed.
pub fn normalize_title(title: &str) -> String {
    static PUNCT: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    let punct = PUNCT.get_or_init(|| Regex::new(r"[^\w\s]").unwrap());

    let lowered = title.to_lowercase();
    let stripped = punct.replace_all(&lowered, " ");

    stripped
        .split_whitespace()
        .filter(|word| !TITLE_STOPWORDS.contains(word))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Similarity between two normalized titles in [0, 1].
/// Edit-distance ratio carries most of the weight; exact word overlap
/// rewards reordered titles.
pub fn title_similarity(a: &str, b: &str) -> f64 {
    let ratio = strsim::normalized_levenshtein(a, b);

    let words_a: HashSet<&str> = a.split_whitespace().collect();
    let words_b: HashSet<&str> = b.split_whitespace().collect();

    if words_a.is_empty() || words_b.is_empty() {
        return ratio;
    }

    let intersection = words_a.intersection(&words_b).count() as f64;
    let union = words_a.union(&words_b).count() as f64;
    let overlap = intersection / union;

    MATCH_RATIO_WEIGHT * ratio + MATCH_OVERLAP_WEIGHT * overlap
}

/// Score every cached video against every film, keeping the best candidate
/// per film. Films with no candidate at all (empty cache) are skipped.
pub fn match_films(
    films: &[Film],
    videos: &[CachedVideo],
    threshold: f64,
) -> Vec<MatchCandidate> {
    let mut candidates = Vec::new();

    for film in films {
        let film_norm = normalize_title(&film.title);

        let mut best: Option<(f64, &CachedVideo)> = None;
        for video in videos {
            let video_norm = normalize_title(&video.title);
            let score = title_similarity(&film_norm, &video_norm);

            let better = best.map_or(true, |(bs, _)| score > bs);
            if better {
                best = Some((score, video));
            }
        }

        if let Some((score, video)) = best {
            candidates.push(MatchCandidate {
                file_id: film.file_id.clone(),
                film_title: film.title.clone(),
                current_youtube_id: film.youtube_id.clone(),
                video_id: video.video_id.clone(),
                video_url: video.url.clone(),
                video_title: video.title.clone(),
                score,
                confidence: Confidence::from_score(score, threshold),
            });
        }
    }

    candidates
}

/// Default auto-apply threshold.
pub fn default_threshold() -> f64 {
    MATCH_AUTO_APPLY_THRESHOLD
}

#[cfg(test)]
mod tests {
    use super::*;

    fn film(file_id: &str, title: &str) -> Film {
        Film {
            id: 0,
            file_id: file_id.to_string(),
            title: title.to_string(),
            description: String::new(),
            summary: String::new(),
            youtube_id: None,
            youtube_url: None,
            duration_seconds: None,
            upload_date: None,
            thumbnail_url: None,
            thumbnail_high_url: None,
            thumbnail_medium_url: None,
            preview_sprite_path: None,
            preview_frame_count: 0,
            preview_frame_interval: 0.0,
            preview_frame_width: 0,
            preview_frame_height: 0,
            years: String::new(),
            technical_notes: String::new(),
            workflow_state: String::new(),
            playlist_order: None,
            created_at: String::new(),
        }
    }

    fn video(id: &str, title: &str) -> CachedVideo {
        CachedVideo {
            video_id: id.to_string(),
            title: title.to_string(),
            url: format!("https://www.youtube.com/watch?v={}", id),
            description: String::new(),
            duration_seconds: None,
            playlist_index: None,
        }
    }

    #[test]
    fn test_normalize_title_strips_noise() {
        assert_eq!(
            normalize_title("The Hayward Family Trip to Disneyland!"),
            "disneyland"
        );
        assert_eq!(normalize_title("Fresno, 1955 - Part 2"), "fresno 1955 part 2");
    }

    #[test]
    fn test_identical_titles_score_one() {
        let a = normalize_title("Christmas Morning 1962");
        let score = title_similarity(&a, &a);
        assert!((score - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_unrelated_titles_score_low() {
        let a = normalize_title("Christmas Morning 1962");
        let b = normalize_title("Yosemite Camping");
        assert!(title_similarity(&a, &b) < MATCH_LOW_THRESHOLD);
    }

    #[test]
    fn test_reordered_words_keep_overlap_credit() {
        let a = normalize_title("Disneyland 1958 Summer");
        let b = normalize_title("Summer 1958 Disneyland");
        let score = title_similarity(&a, &b);
        // Word overlap is perfect even though the edit distance is large,
        // so the blend must beat the raw ratio
        let raw = strsim::normalized_levenshtein(&a, &b);
        assert!(score > raw, "score {} should exceed raw ratio {}", score, raw);
        assert!(score >= 0.3, "score was {}", score);
    }

    #[test]
    fn test_confidence_tiers() {
        let t = default_threshold();
        assert_eq!(Confidence::from_score(0.85, t), Confidence::High);
        assert_eq!(Confidence::from_score(0.6, t), Confidence::High);
        assert_eq!(Confidence::from_score(0.5, t), Confidence::Medium);
        assert_eq!(Confidence::from_score(0.3, t), Confidence::Low);
        assert_eq!(Confidence::from_score(0.1, t), Confidence::NoMatch);
    }

    #[test]
    fn test_match_films_picks_best_candidate() {
        let films = vec![film("P-61_FROS", "Fresno Trip 1955")];
        let videos = vec![
            video("v1", "Yosemite Camping 1960"),
            video("v2", "Fresno Trip 1955"),
            video("v3", "Christmas 1962"),
        ];

        let matches = match_films(&films, &videos, default_threshold());
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].video_id, "v2");
        assert_eq!(matches[0].confidence, Confidence::High);
    }

    #[test]
    fn test_match_films_empty_cache_yields_nothing() {
        let films = vec![film("A", "Anything")];
        let matches = match_films(&films, &[], default_threshold());
        assert!(matches.is_empty());
    }
}
