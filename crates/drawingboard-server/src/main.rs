//! DrawingBoard server binary.
//!
//! Listens on `HOSTNAME:PORT` (default `localhost:8888`). See
//! [`ServerConfig`] for the other environment variables.

use std::sync::Arc;

use drawingboard_server::{AppState, config::ServerConfig, router};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "drawingboard_server=info,drawingboard_core=info,tower_http=info".into()
            }),
        )
        .init();

    let config = ServerConfig::from_env()?;
    let state = Arc::new(AppState::from_config(&config));
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr()).await?;
    let addr = listener.local_addr()?;
    info!("DrawingBoard server listening on {}", addr);
    info!("WebSocket endpoint: ws://{}/websockets/{{id}}", addr);
    info!("Announcing event stream at {}", config.sse_location);

    axum::serve(listener, app).await?;
    Ok(())
}
