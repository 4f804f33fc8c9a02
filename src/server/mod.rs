// HTTP server module
//
// JSON API over the catalog plus static serving of generated thumbnails.

mod routes;
mod state;

pub use state::{Catalog, ServerState};

use std::net::SocketAddr;
use std::path::Path;

use anyhow::Result;
use axum::Router;
use tower_http::services::ServeDir;
use tracing::info;

/// Build the full application router: /api JSON routes and /thumbnails
/// static files.
pub fn make_app(state: ServerState, thumbnails_dir: &Path) -> Router {
    Router::new()
        .nest("/api", routes::make_api_routes(state))
        .nest_service("/thumbnails", ServeDir::new(thumbnails_dir))
}

/// Serve the catalog until the process is stopped.
pub async fn run_server(state: ServerState, bind: &str, port: u16) -> Result<()> {
    let thumbnails_dir = crate::db::get_thumbnails_path(&state.catalog_root);
    let app = make_app(state, &thumbnails_dir);

    let addr: SocketAddr = format!("{}:{}", bind, port).parse()?;
    info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
