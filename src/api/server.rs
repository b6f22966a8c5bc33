//! HTTP server lifecycle: bind, serve, shut down on ctrl-c.

use std::net::SocketAddr;
use std::sync::Arc;

use crate::api::router::api_router;
use crate::core_state::AppState;

/// Bind and serve the API until interrupted.
pub async fn serve(core: Arc<AppState>, addr: SocketAddr) -> Result<(), std::io::Error> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let local = listener.local_addr()?;
    tracing::info!(%local, "API server listening");

    let app = api_router(core);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        tracing::warn!("failed to install ctrl-c handler, running without graceful shutdown");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
