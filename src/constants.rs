// Reel Vault Constants

// Paths
pub const VAULT_FOLDER: &str = ".reelvault";
pub const DB_FILENAME: &str = "catalog.db";
pub const CACHE_FOLDER: &str = "cache";
pub const THUMBNAILS_FOLDER: &str = "static/thumbnails";
pub const PREVIEWS_FOLDER: &str = "previews";
pub const CHAPTERS_FOLDER: &str = "chapters";

// YouTube metadata cache
pub const YOUTUBE_CACHE_FILENAME: &str = "youtube_videos.json";
pub const YOUTUBE_THUMB_VARIANTS: [&str; 3] = ["maxresdefault", "hqdefault", "mqdefault"];
pub const PLACEHOLDER_ID_PREFIX: &str = "placeholder_";

// Sprite settings
// A sprite sheet is one horizontal strip: frame i occupies columns [i*w, (i+1)*w).
pub const SPRITE_FRAME_WIDTH: u32 = 160;
pub const SPRITE_FRAME_HEIGHT: u32 = 90;
pub const SPRITE_MAX_FRAMES: u32 = 60;
pub const THUMB_QUALITY: u32 = 85;

// Title matching
pub const MATCH_RATIO_WEIGHT: f64 = 0.7;
pub const MATCH_OVERLAP_WEIGHT: f64 = 0.3;
pub const MATCH_AUTO_APPLY_THRESHOLD: f64 = 0.6;
pub const MATCH_REVIEW_THRESHOLD: f64 = 0.4;
pub const MATCH_LOW_THRESHOLD: f64 = 0.2;

// Words stripped from titles before scoring. The family surname appears in
// almost every video title, so it carries no signal.
pub const TITLE_STOPWORDS: [&str; 10] = [
    "and", "the", "with", "trip", "to", "in", "at", "family", "hayward", "haywards",
];

// Presence bitfield: one character per family member, worksheet order.
pub const BITFIELD_SLOTS: usize = 4;
pub const DEFAULT_BITFIELD_KEY: [&str; 4] = [
    "John Hayward Jr",
    "Linda Hayward (nee Thompson)",
    "Jonathan Hayward",
    "Matthew Hayward",
];

// XLS image extraction
pub const XLS_MIN_IMAGE_BYTES: usize = 1024;

// Job settings
pub const JOB_MAX_RETRIES: i32 = 3;
pub const JOB_BASE_BACKOFF_SECONDS: i64 = 60;
pub const JOB_LEASE_DURATION_SECONDS: i64 = 300; // 5 minutes

// Genealogy
pub const DEFAULT_TREE_DEPTH: u32 = 3;
pub const MAX_TREE_DEPTH: u32 = 8;

// Search
pub const SEARCH_SECTION_LIMIT: i64 = 10;
pub const AUTOCOMPLETE_LIMIT: i64 = 10;
pub const FILMS_PAGE_SIZE: i64 = 12;
