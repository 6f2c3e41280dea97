//! Server startup: bind and serve the router.

use std::net::SocketAddr;

use crate::router::build_router;
use crate::state::AppState;

/// Errors that can occur starting the API server.
#[derive(Debug, thiserror::Error)]
pub enum ServeError {
    /// The listen address failed to parse.
    #[error("invalid listen address {0}")]
    BadAddress(String),

    /// Binding or serving failed.
    #[error("server error: {0}")]
    Io(#[from] std::io::Error),
}

/// Bind `host:port` and serve the API until the process stops.
///
/// # Errors
///
/// Returns [`ServeError`] if the address is invalid or the listener
/// cannot bind.
pub async fn serve(state: AppState, host: &str, port: u16) -> Result<(), ServeError> {
    let addr: SocketAddr = format!("{host}:{port}")
        .parse()
        .map_err(|_| ServeError::BadAddress(format!("{host}:{port}")))?;

    let router = build_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "API server listening");
    axum::serve(listener, router).await?;
    Ok(())
}
