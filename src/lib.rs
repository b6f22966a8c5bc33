pub mod accounts;
pub mod api;
pub mod booking;
pub mod config;
pub mod core_state;
pub mod db;
pub mod messaging;
pub mod models;
pub mod receipt;

use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use crate::core_state::AppState;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let db_path = config::database_path();
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let core = Arc::new(AppState::open(&db_path)?);
    tracing::info!(path = %db_path.display(), "database ready");

    api::server::serve(core, config::bind_addr()).await?;
    Ok(())
}
