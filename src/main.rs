// Reel Vault catalog server binary

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use reel_vault::db;
use reel_vault::server::{run_server, Catalog, ServerState};

#[derive(Parser, Debug)]
#[command(name = "reel-vault")]
#[command(about = "Catalog server for a family's digitized home movies", long_about = None)]
#[command(version)]
struct CliArgs {
    /// Catalog root directory (holds .reelvault/ and static/thumbnails/).
    #[arg(default_value = ".")]
    root: PathBuf,

    /// The port to listen on.
    #[arg(short, long, default_value_t = 3400)]
    port: u16,

    /// The address to bind.
    #[arg(long, default_value = "127.0.0.1")]
    bind: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .init();

    let root = args
        .root
        .canonicalize()
        .with_context(|| format!("catalog root {} does not exist", args.root.display()))?;

    let db_path = db::get_db_path(&root);
    if !db_path.exists() {
        anyhow::bail!(
            "No catalog found at {}. Use 'reelvault init <path>' to create one.",
            root.display()
        );
    }

    info!("Opening catalog database at {}", db_path.display());
    let catalog = Arc::new(Catalog::open(&db_path)?);

    let state = ServerState::new(catalog, root);
    run_server(state, &args.bind, args.port).await
}
