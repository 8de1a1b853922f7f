pub mod handlers;
pub mod routes;

use tokio::sync::broadcast;
use tracing::info;

use crate::config::Config;
use crate::error::{PrerollError, Result};

pub use routes::AppState;

pub async fn serve(
    config: &Config,
    state: AppState,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<()> {
    let app = routes::build(state, &config.allowed_origins());
    let bind = &config.server.bind;

    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .map_err(|e| PrerollError::Config(format!("failed to bind {bind}: {e}")))?;

    info!(bind = %bind, "API listening (HTTP)");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
        })
        .await
        .map_err(|e| PrerollError::Config(format!("server error: {e}")))?;

    Ok(())
}
