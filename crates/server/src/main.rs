//! Rollup REST API Server
//!
//! Exposes the progress rollup computations as JSON endpoints for a web UI
//! and external integrations.

mod routes;

use anyhow::Result;
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use rollup::config::RollupConfig;
use rollup::directory::RestDirectory;
use rollup::rollup::ProgressService;
use routes::AppContext;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_target(false)
        .compact()
        .init();

    info!("Starting rollup API server...");

    let config = RollupConfig::load(None)?;
    let directory = RestDirectory::from_config(&config).map_err(|e| {
        anyhow::anyhow!(
            "Failed to initialize the directory client: {}\n\n\
             The server needs the remote tracker connection configured.\n\
             Provide rollup.toml or set ROLLUP_ORG_URL, ROLLUP_PROJECT, \
             ROLLUP_API_VERSION and ROLLUP_PAT.",
            e
        )
    })?;

    let port = config.port();
    let service = ProgressService::new(directory).with_max_depth(config.max_depth());
    let state = Arc::new(AppContext { service, config });

    // Build CORS layer for local development
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Build router
    let app = Router::new()
        .merge(routes::create_routes(state))
        .layer(cors)
        .layer(tower_http::trace::TraceLayer::new_for_http());

    // Bind to 0.0.0.0 to accept connections from all network interfaces
    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
