// Reel Vault maintenance CLI

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use reel_vault::db::{self, get_db_path, init_catalog_folders, open_db, schema};
use reel_vault::{genealogy, import, jobs, matching, preview, search, xls, youtube};

#[derive(Parser)]
#[command(name = "reelvault")]
#[command(about = "Reel Vault - maintenance tools for the home movie catalog", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new catalog
    Init {
        /// Catalog root path
        path: PathBuf,
    },

    /// Import the master film CSV
    Import {
        /// Path to the films CSV file
        csv: PathBuf,
        /// Catalog root (defaults to current directory)
        #[arg(short, long)]
        root: Option<PathBuf>,
        /// YouTube playlist URL recorded on imported films
        #[arg(long, default_value = "https://www.youtube.com/playlist?list=PLK3iapm6jnkkDIa9IzKV7eP17HS4vdlCm")]
        playlist: String,
        /// Parse and count without saving anything
        #[arg(long)]
        dry_run: bool,
    },

    /// Import a per-film chapter sheet CSV
    ImportChapters {
        /// Path to the chapter sheet CSV
        csv: PathBuf,
        /// File id of the film the sheet belongs to
        #[arg(long)]
        film: String,
        /// Catalog root (defaults to current directory)
        #[arg(short, long)]
        root: Option<PathBuf>,
        /// Parse and count without saving anything
        #[arg(long)]
        dry_run: bool,
    },

    /// Match films to cached YouTube videos by title similarity
    MatchYoutube {
        /// Catalog root (defaults to current directory)
        #[arg(short, long)]
        root: Option<PathBuf>,
        /// Output mapping CSV path
        #[arg(long, default_value = "matched_youtube_mapping.csv")]
        output_mapping: PathBuf,
        /// Minimum score for automatic matching (0.0-1.0)
        #[arg(long, default_value_t = matching::default_threshold())]
        confidence_threshold: f64,
        /// Show matches without writing the mapping file
        #[arg(long)]
        dry_run: bool,
    },

    /// Apply a reviewed mapping CSV to the catalog
    ApplyMapping {
        /// Mapping CSV produced by match-youtube
        csv: PathBuf,
        /// Catalog root (defaults to current directory)
        #[arg(short, long)]
        root: Option<PathBuf>,
        /// Confidence floor for rows not marked AUTO_APPLY
        #[arg(long, default_value_t = matching::default_threshold())]
        min_confidence: f64,
        /// Report what would change without saving
        #[arg(long)]
        dry_run: bool,
    },

    /// Check mapping health: placeholder films, or validate a mapping CSV
    VerifyMappings {
        /// Catalog root (defaults to current directory)
        #[arg(short, long)]
        root: Option<PathBuf>,
        /// Mapping CSV to validate instead of listing unmapped films
        #[arg(long)]
        mapping: Option<PathBuf>,
    },

    /// Refresh the YouTube metadata cache with yt-dlp
    RefreshCache {
        /// Playlist URL to dump
        playlist: String,
        /// Catalog root (defaults to current directory)
        #[arg(short, long)]
        root: Option<PathBuf>,
    },

    /// Generate chapter thumbnails and sprite sheets
    Thumbs {
        /// Catalog root (defaults to current directory)
        #[arg(short, long)]
        root: Option<PathBuf>,
        /// Only this film (file id); all films when omitted
        #[arg(long)]
        film: Option<String>,
        /// Local source video for chapter still extraction
        #[arg(long)]
        video: Option<PathBuf>,
    },

    /// Extract embedded JPEGs from .xls chapter workbooks
    ExtractXls {
        /// Workbook file or directory to scan
        path: PathBuf,
        /// Catalog root (defaults to current directory)
        #[arg(short, long)]
        root: Option<PathBuf>,
        /// Output directory (defaults to the chapter thumbnails folder)
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },

    /// Find and merge duplicate people
    MergePeople {
        /// Catalog root (defaults to current directory)
        #[arg(short, long)]
        root: Option<PathBuf>,
        /// Report duplicates without merging
        #[arg(long)]
        dry_run: bool,
    },

    /// Print a person's family tree
    Tree {
        /// Person id
        id: i64,
        /// Catalog root (defaults to current directory)
        #[arg(short, long)]
        root: Option<PathBuf>,
        /// Traversal depth
        #[arg(long)]
        depth: Option<u32>,
    },

    /// List films
    List {
        /// Catalog root (defaults to current directory)
        #[arg(short, long)]
        root: Option<PathBuf>,
        /// Maximum films to show
        #[arg(long, default_value = "100")]
        limit: i64,
    },

    /// Show film details
    Show {
        /// Film file id
        file_id: String,
        /// Catalog root (defaults to current directory)
        #[arg(short, long)]
        root: Option<PathBuf>,
    },

    /// List and manage jobs
    Jobs {
        /// Catalog root (defaults to current directory)
        #[arg(short, long)]
        root: Option<PathBuf>,
        /// Cancel a job
        #[arg(long)]
        cancel: Option<i64>,
        /// Run pending jobs
        #[arg(long)]
        run: bool,
        /// Filter by status
        #[arg(long)]
        status: Option<String>,
    },

    /// Search the catalog
    Search {
        /// Query string
        query: String,
        /// Catalog root (defaults to current directory)
        #[arg(short, long)]
        root: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().without_time())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::WARN.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init { path } => cmd_init(path),
        Commands::Import { csv, root, playlist, dry_run } => cmd_import(csv, root, playlist, dry_run),
        Commands::ImportChapters { csv, film, root, dry_run } => cmd_import_chapters(csv, film, root, dry_run),
        Commands::MatchYoutube { root, output_mapping, confidence_threshold, dry_run } => {
            cmd_match_youtube(root, output_mapping, confidence_threshold, dry_run)
        }
        Commands::ApplyMapping { csv, root, min_confidence, dry_run } => {
            cmd_apply_mapping(csv, root, min_confidence, dry_run)
        }
        Commands::VerifyMappings { root, mapping } => cmd_verify_mappings(root, mapping),
        Commands::RefreshCache { playlist, root } => cmd_refresh_cache(playlist, root),
        Commands::Thumbs { root, film, video } => cmd_thumbs(root, film, video),
        Commands::ExtractXls { path, root, output_dir } => cmd_extract_xls(path, root, output_dir),
        Commands::MergePeople { root, dry_run } => cmd_merge_people(root, dry_run),
        Commands::Tree { id, root, depth } => cmd_tree(id, root, depth),
        Commands::List { root, limit } => cmd_list(root, limit),
        Commands::Show { file_id, root } => cmd_show(file_id, root),
        Commands::Jobs { root, cancel, run, status } => cmd_jobs(root, cancel, run, status),
        Commands::Search { query, root } => cmd_search(query, root),
    }
}

fn cmd_init(path: PathBuf) -> Result<()> {
    let catalog_root = path.canonicalize().unwrap_or(path.clone());

    // Check if catalog already exists
    let db_path = get_db_path(&catalog_root);
    if db_path.exists() {
        anyhow::bail!("Catalog already exists at {}", catalog_root.display());
    }

    // Create folder structure
    init_catalog_folders(&catalog_root)?;

    // Open/create database (runs migrations)
    open_db(&db_path)?;

    println!("Initialized catalog at {}", catalog_root.display());
    println!("Structure created:");
    println!("  .reelvault/catalog.db            - Database");
    println!("  .reelvault/cache/                - YouTube metadata cache");
    println!("  static/thumbnails/previews/      - Sprite sheets");
    println!("  static/thumbnails/chapters/      - Chapter thumbnails");

    Ok(())
}

fn cmd_import(csv: PathBuf, root: Option<PathBuf>, playlist: String, dry_run: bool) -> Result<()> {
    let catalog_root = resolve_catalog_root(root)?;
    let conn = open_db(&get_db_path(&catalog_root))?;

    println!("Importing from {}", csv.display());
    if dry_run {
        println!("DRY RUN MODE - no data will be saved");
    }

    let stats = if dry_run {
        import::run_import(&conn, &csv, &playlist, true, None)?
    } else {
        let job_id = import::create_import_job(&conn, &csv.to_string_lossy(), &playlist)?;
        println!("Created import job {}", job_id);
        let stats = import::run_import_job(&conn, job_id)?;

        let failed = schema::failed_import_rows(&conn, job_id)?;
        for row in &failed {
            println!(
                "  failed row {} ({}): {}",
                row.row_number,
                row.file_id,
                row.error_message.as_deref().unwrap_or("unknown error")
            );
        }
        stats
    };

    println!();
    println!("=== Import Statistics ===");
    println!("Films imported:     {}", stats.films);
    println!("Chapters created:   {}", stats.chapters);
    println!("People processed:   {}", stats.people);
    println!("Locations processed: {}", stats.locations);
    println!("Tags processed:     {}", stats.tags);

    print_errors(&stats.errors);

    Ok(())
}

fn cmd_import_chapters(csv: PathBuf, film: String, root: Option<PathBuf>, dry_run: bool) -> Result<()> {
    let catalog_root = resolve_catalog_root(root)?;
    let conn = open_db(&get_db_path(&catalog_root))?;

    let stats = import::run_chapter_sheet_import(&conn, &film, &csv, dry_run)?;

    println!("Chapters:  {}", stats.chapters);
    println!("People:    {}", stats.people);
    println!("Locations: {}", stats.locations);
    println!("Tags:      {}", stats.tags);
    print_errors(&stats.errors);

    // New chapters need thumbnails and a fresh sprite
    if !dry_run && stats.chapters > 0 {
        if let Some(film_row) = schema::get_film_by_file_id(&conn, &film)? {
            preview::queue_preview_jobs(&conn, film_row.id)?;
            println!("Queued thumbnail and sprite jobs (run with 'reelvault jobs --run')");
        }
    }

    Ok(())
}

fn cmd_match_youtube(
    root: Option<PathBuf>,
    output_mapping: PathBuf,
    confidence_threshold: f64,
    dry_run: bool,
) -> Result<()> {
    let catalog_root = resolve_catalog_root(root)?;
    let conn = open_db(&get_db_path(&catalog_root))?;

    let cache_path = youtube::cache_file_path(&catalog_root);
    let videos = youtube::load_cache(&cache_path)?;
    println!("Loaded {} cached videos", videos.len());

    let films = schema::all_films(&conn)?;
    println!("Found {} films in catalog", films.len());

    // Exact matches from description markers first
    let direct: std::collections::HashMap<String, String> = youtube::direct_matches(&videos)
        .into_iter()
        .map(|(fid, video)| (fid, video.video_id.clone()))
        .collect();

    let mut candidates = matching::match_films(&films, &videos, confidence_threshold);

    // A description marker overrides the fuzzy score for its film
    for candidate in &mut candidates {
        if let Some(video_id) = direct.get(&candidate.file_id) {
            if &candidate.video_id == video_id {
                candidate.score = 1.0;
                candidate.confidence = matching::Confidence::High;
            }
        }
    }

    println!();
    println!("=== MATCHING RESULTS ===");
    println!("{:>6}  {:>18}  {:>12}  {}", "Score", "Confidence", "File", "Video Title");
    println!("{}", "-".repeat(70));
    for candidate in &candidates {
        println!(
            "{:>6.3}  {:>18}  {:>12}  {}",
            candidate.score,
            candidate.confidence.label(),
            candidate.file_id,
            truncate(&candidate.video_title, 40),
        );
    }

    if !dry_run {
        youtube::write_mapping_csv(&output_mapping, &candidates)?;
        println!();
        println!("Created mapping file: {}", output_mapping.display());
    }

    Ok(())
}

fn cmd_apply_mapping(csv: PathBuf, root: Option<PathBuf>, min_confidence: f64, dry_run: bool) -> Result<()> {
    let catalog_root = resolve_catalog_root(root)?;
    let conn = open_db(&get_db_path(&catalog_root))?;

    let rows = youtube::read_mapping_csv(&csv)?;
    let stats = youtube::apply_mapping(&conn, &rows, min_confidence, dry_run)?;

    println!("Applied:          {}", stats.applied);
    println!("Skipped (review): {}", stats.skipped_review);
    println!("Skipped (missing):{}", stats.skipped_missing);
    print_errors(&stats.errors);

    if dry_run {
        println!();
        println!("DRY RUN - nothing saved");
    }

    Ok(())
}

fn cmd_verify_mappings(root: Option<PathBuf>, mapping: Option<PathBuf>) -> Result<()> {
    let catalog_root = resolve_catalog_root(root)?;
    let conn = open_db(&get_db_path(&catalog_root))?;

    match mapping {
        Some(path) => {
            let rows = youtube::read_mapping_csv(&path)?;
            let report = youtube::verify_mapping_rows(&conn, &rows)?;

            if report.unknown_film_ids.is_empty() && report.duplicate_video_ids.is_empty() {
                println!("Mapping OK: {} rows", rows.len());
            } else {
                for fid in &report.unknown_film_ids {
                    println!("Unknown film: {}", fid);
                }
                for vid in &report.duplicate_video_ids {
                    println!("Video assigned more than once: {}", vid);
                }
                anyhow::bail!("mapping file has problems");
            }
        }
        None => {
            let unmapped = youtube::unmapped_films(&conn)?;
            if unmapped.is_empty() {
                println!("All films are mapped to YouTube videos.");
            } else {
                println!("{} films still unmapped:", unmapped.len());
                for film in unmapped {
                    println!("  {:>12}  {}", film.file_id, truncate(&film.title, 50));
                }
            }
        }
    }

    Ok(())
}

fn cmd_refresh_cache(playlist: String, root: Option<PathBuf>) -> Result<()> {
    let catalog_root = resolve_catalog_root(root)?;
    let conn = open_db(&get_db_path(&catalog_root))?;

    let videos = youtube::refresh_cache(&catalog_root, &playlist)?;
    println!("Cached metadata for {} videos", videos.len());

    let ordered = youtube::sync_playlist_order(&conn, &videos)?;
    if ordered > 0 {
        println!("Updated playlist order on {} films", ordered);
    }

    Ok(())
}

fn cmd_thumbs(root: Option<PathBuf>, film: Option<String>, video: Option<PathBuf>) -> Result<()> {
    let catalog_root = resolve_catalog_root(root)?;
    let conn = open_db(&get_db_path(&catalog_root))?;

    let films = match film {
        Some(file_id) => {
            let film = schema::get_film_by_file_id(&conn, &file_id)?
                .ok_or_else(|| anyhow::anyhow!("Film {} not found", file_id))?;
            vec![film]
        }
        None => schema::all_films(&conn)?,
    };

    let mut sprites = 0;
    let mut thumbs = 0;
    for film in &films {
        let mut film = film.clone();

        // Fill in a missing duration from the source video so the sprite
        // interval comes out right.
        if let Some(video_path) = video.as_deref() {
            if film.duration_seconds.is_none() {
                if let Some(secs) = preview::thumb::probe_duration_seconds(video_path).ok().flatten() {
                    schema::update_film_duration(&conn, film.id, secs)?;
                    film.duration_seconds = Some(secs);
                }
            }
        }

        thumbs += preview::build_chapter_thumbnails(&conn, &catalog_root, &film, video.as_deref())?;

        // A local source video gives real frames; otherwise the sprite is
        // composed from chapter thumbnails.
        let sprite_result = match video.as_deref() {
            Some(video_path) => preview::build_video_sprite(&conn, &catalog_root, &film, video_path),
            None => preview::build_film_sprite(&conn, &catalog_root, &film),
        };

        match sprite_result {
            Ok(layout) => {
                sprites += 1;
                println!(
                    "{:>12}  {} frames at {:.2}s",
                    film.file_id, layout.frame_count, layout.frame_interval
                );
            }
            Err(e) => println!("{:>12}  skipped: {}", film.file_id, e),
        }
    }

    println!();
    println!("Generated {} chapter thumbnails and {} sprites", thumbs, sprites);
    Ok(())
}

fn cmd_extract_xls(path: PathBuf, root: Option<PathBuf>, output_dir: Option<PathBuf>) -> Result<()> {
    let catalog_root = resolve_catalog_root(root)?;

    let output = output_dir.unwrap_or_else(|| {
        db::get_thumbnails_path(&catalog_root).join(reel_vault::constants::CHAPTERS_FOLDER)
    });

    let (workbooks, images) = xls::extract_path(&path, &output)?;
    println!("Extracted {} images from {} workbooks into {}", images, workbooks, output.display());

    Ok(())
}

fn cmd_merge_people(root: Option<PathBuf>, dry_run: bool) -> Result<()> {
    let catalog_root = resolve_catalog_root(root)?;
    let conn = open_db(&get_db_path(&catalog_root))?;

    let duplicates = genealogy::find_duplicate_people(&conn)?;
    if duplicates.is_empty() {
        println!("No duplicate people found.");
        return Ok(());
    }

    println!("Found {} groups of duplicate people:", duplicates.len());
    for group in &duplicates {
        println!();
        println!("'{}' has {} entries:", group[0].full_name(), group.len());
        for person in group {
            let films = schema::person_film_count(&conn, person.id)?;
            println!("  id {:>5}  {} films", person.id, films);
        }
    }

    println!();
    let merged = genealogy::merge_all_duplicates(&conn, dry_run)?;
    if dry_run {
        println!("Would merge {} duplicate people (dry run)", merged);
    } else {
        println!("Merged {} duplicate people", merged);
    }

    Ok(())
}

fn cmd_tree(id: i64, root: Option<PathBuf>, depth: Option<u32>) -> Result<()> {
    let catalog_root = resolve_catalog_root(root)?;
    let conn = open_db(&get_db_path(&catalog_root))?;

    let tree = genealogy::family_tree_data(&conn, id, depth)?;
    println!("{}", serde_json::to_string_pretty(&tree)?);

    Ok(())
}

fn cmd_list(root: Option<PathBuf>, limit: i64) -> Result<()> {
    let catalog_root = resolve_catalog_root(root)?;
    let conn = open_db(&get_db_path(&catalog_root))?;

    let films = schema::list_films(&conn, limit, 0)?;
    let total = schema::count_films(&conn)?;

    println!("Catalog: {} films", total);
    println!();

    if films.is_empty() {
        println!("No films found. Use 'reelvault import <csv>' to add some.");
        return Ok(());
    }

    println!("{:>12}  {:>9}  {:>12}  {}", "File ID", "Duration", "Years", "Title");
    println!("{}", "-".repeat(70));

    for film in films {
        let duration = film.duration_seconds
            .map(format_duration)
            .unwrap_or_else(|| "-".to_string());
        let years = if film.years.is_empty() { "-".to_string() } else { truncate(&film.years, 12) };

        println!(
            "{:>12}  {:>9}  {:>12}  {}",
            film.file_id,
            duration,
            years,
            truncate(&film.title, 40),
        );
    }

    if total > limit {
        println!();
        println!("Showing {} of {} films. Use --limit to see more.", limit, total);
    }

    Ok(())
}

fn cmd_show(file_id: String, root: Option<PathBuf>) -> Result<()> {
    let catalog_root = resolve_catalog_root(root)?;
    let conn = open_db(&get_db_path(&catalog_root))?;

    let film = schema::get_film_by_file_id(&conn, &file_id)?
        .ok_or_else(|| anyhow::anyhow!("Film {} not found", file_id))?;

    println!("Film {}", film.file_id);
    println!();
    println!("Title:       {}", film.title);
    if let Some(duration) = film.duration_seconds {
        println!("Duration:    {}", format_duration(duration));
    }
    if !film.years.is_empty() {
        println!("Years:       {}", film.years);
    }
    if let Some(ref youtube_id) = film.youtube_id {
        println!("YouTube:     {}", youtube_id);
    }
    if !film.workflow_state.is_empty() {
        println!("Workflow:    {}", film.workflow_state);
    }
    if let Some(ref sprite) = film.preview_sprite_path {
        println!(
            "Sprite:      {} ({} frames, {:.2}s interval)",
            sprite, film.preview_frame_count, film.preview_frame_interval
        );
    }

    let chapters = schema::list_chapters(&conn, film.id)?;
    if !chapters.is_empty() {
        println!();
        println!("Chapters:");
        for chapter in &chapters {
            println!("  {:>8}  {}", chapter.start_time, truncate(&chapter.title, 55));
        }
    }

    let people = schema::film_people_aggregated(&conn, film.id)?;
    if !people.is_empty() {
        let names: Vec<String> = people.iter().map(|p| p.full_name()).collect();
        println!();
        println!("People:      {}", names.join(", "));
    }

    let locations = schema::film_locations_aggregated(&conn, film.id)?;
    if !locations.is_empty() {
        let names: Vec<&str> = locations.iter().map(|l| l.name.as_str()).collect();
        println!("Locations:   {}", names.join(", "));
    }

    let tags = schema::film_tags_aggregated(&conn, film.id)?;
    if !tags.is_empty() {
        let names: Vec<&str> = tags.iter().map(|t| t.tag.as_str()).collect();
        println!("Tags:        {}", names.join(", "));
    }

    Ok(())
}

fn cmd_jobs(root: Option<PathBuf>, cancel: Option<i64>, run: bool, status: Option<String>) -> Result<()> {
    let catalog_root = resolve_catalog_root(root)?;
    let conn = open_db(&get_db_path(&catalog_root))?;

    // Handle cancel
    if let Some(job_id) = cancel {
        schema::cancel_job(&conn, job_id)?;
        println!("Cancelled job {}", job_id);
        return Ok(());
    }

    // Handle run
    if run {
        println!("Running pending jobs...");
        let count = jobs::runner::run_all_jobs(&conn, &catalog_root)?;
        println!("Completed {} jobs", count);
        return Ok(());
    }

    // List jobs
    let jobs_list = schema::list_jobs(&conn, status.as_deref(), 50)?;

    if jobs_list.is_empty() {
        println!("No jobs found.");
        return Ok(());
    }

    println!("{:>5}  {:>14}  {:>10}  {:>8}  {:>20}", "ID", "Type", "Status", "Progress", "Created");
    println!("{}", "-".repeat(65));

    for job in jobs_list {
        let progress = job.progress.map(|p| format!("{}%", p)).unwrap_or_else(|| "-".to_string());
        let created = job.created_at.split('T').next().unwrap_or(&job.created_at);

        println!("{:>5}  {:>14}  {:>10}  {:>8}  {:>20}",
            job.id,
            job.job_type,
            job.status,
            progress,
            created
        );
    }

    // Show pending counts
    let pending = jobs::runner::count_pending_jobs(&conn)?;
    if !pending.is_empty() {
        println!();
        println!("Pending jobs:");
        for (job_type, count) in pending {
            println!("  {}: {}", job_type, count);
        }
    }

    Ok(())
}

fn cmd_search(query: String, root: Option<PathBuf>) -> Result<()> {
    let catalog_root = resolve_catalog_root(root)?;
    let conn = open_db(&get_db_path(&catalog_root))?;

    let results = search::overall_search(&conn, &query)?;

    println!(
        "Results for '{}': {} films, {} chapters, {} people, {} locations, {} tags",
        results.query,
        results.totals.films,
        results.totals.chapters,
        results.totals.people,
        results.totals.locations,
        results.totals.tags,
    );

    for film in &results.films {
        println!("  film     {:>12}  {}", film.file_id, truncate(&film.title, 45));
    }
    for hit in &results.chapters {
        println!(
            "  chapter  {:>12}  {} ({})",
            hit.film_file_id,
            truncate(&hit.chapter.title, 35),
            hit.chapter.start_time
        );
    }
    for hit in &results.people {
        println!("  person   {:>12}  {} ({} films)", hit.person.id, hit.person.full_name(), hit.film_count);
    }
    for hit in &results.locations {
        println!("  location {:>12}  {} ({} films)", hit.location.id, hit.location.name, hit.film_count);
    }
    for hit in &results.tags {
        println!("  tag      {:>12}  {} ({} films)", hit.tag.category, hit.tag.tag, hit.film_count);
    }

    Ok(())
}

// --- Helper Functions ---

fn resolve_catalog_root(root: Option<PathBuf>) -> Result<PathBuf> {
    let path = root.unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));
    let path = path.canonicalize().unwrap_or(path);

    // Check if .reelvault exists
    let db_path = get_db_path(&path);
    if !db_path.exists() {
        anyhow::bail!(
            "No catalog found at {}. Use 'reelvault init <path>' to create one.",
            path.display()
        );
    }

    Ok(path)
}

fn print_errors(errors: &[String]) {
    if errors.is_empty() {
        return;
    }
    println!();
    println!("Errors encountered: {}", errors.len());
    for error in errors.iter().take(10) {
        println!("  - {}", error);
    }
    if errors.len() > 10 {
        println!("  ... and {} more", errors.len() - 10);
    }
}

fn format_duration(seconds: i64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{}:{:02}", minutes, secs)
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() > max {
        let cut: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", cut)
    } else {
        s.to_string()
    }
}
