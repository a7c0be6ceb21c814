//! Exotransit HTTP server binary.
//!
//! Serves the submission page, the JSON API and the rendered plots.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin exotransit-server
//!
//! # explicit config file and port
//! EXOTRANSIT_CONFIG=./exotransit.toml PORT=8080 cargo run --bin exotransit-server
//! ```
//!
//! # Environment Variables
//!
//! - `HOST`, `PORT`: bind address (default 0.0.0.0:5000)
//! - `EXOTRANSIT_CONFIG`: config file to load instead of the default search
//! - `EXOTRANSIT_PLOTS_DIR`, `EXOTRANSIT_PLOT_NAMING`: plot output
//! - `EXOTRANSIT_TIMEOUT_SECS`, `EXOTRANSIT_TAP_URL`, `EXOTRANSIT_MAST_URL`: remote services
//! - `EXOTRANSIT_MISSION`: light-curve mission filter (default Kepler)
//! - `RUST_LOG`: log level (default: info)

use std::env;
use std::net::SocketAddr;

use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use exotransit::config::AppConfig;
use exotransit::http::{create_router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    FmtSubscriber::builder()
        .with_max_level(
            env::var("RUST_LOG")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(Level::INFO),
        )
        .with_target(true)
        .with_thread_ids(true)
        .init();

    info!("Starting exotransit server");

    let config = AppConfig::load()?;
    std::fs::create_dir_all(&config.plots.dir)?;
    info!(
        plots_dir = %config.plots.dir.display(),
        naming = ?config.plots.naming,
        mission = %config.lightcurve.mission,
        "Configuration loaded"
    );

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let app = create_router(AppState::new(config));

    info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
