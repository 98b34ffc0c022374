//! supakit-api: auth/profile HTTP service.
//!
//! Startup sequence:
//!   1. Load .env (if present)
//!   2. Load and validate config
//!   3. Init logger at the configured level
//!   4. Build the identity backend
//!   5. Serve until Ctrl-C

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use supakit::error::AppError;
use supakit::identity::IdentityBackend;
use supakit::logger::{self, LogStyle};
use supakit::{api, config};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), AppError> {
    // Missing .env is fine; the process env may carry everything.
    let _ = dotenvy::dotenv();

    let config = config::load()?;
    logger::parse_level(&config.log_level)?;
    logger::init(&config.log_level, true, LogStyle::Service)?;
    info!(
        project = %config.project_name,
        backend = ?config.backend,
        "config loaded"
    );

    let identity = IdentityBackend::build(&config)
        .map_err(|e| AppError::Server(format!("identity backend: {e}")))?;

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("ctrl-c received, shutting down"),
            Err(e) => warn!("ctrl-c handler failed: {e}"),
        }
        signal_token.cancel();
    });

    api::serve(Arc::new(config), identity, shutdown).await
}
