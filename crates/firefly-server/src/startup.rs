//! Background task helpers used by the engine binary.
//!
//! [`spawn_server`] binds eagerly, so a port that cannot be bound fails
//! startup instead of surfacing later in a detached task.
//! [`spawn_dispatcher`] starts the broadcast loop.

use std::net::SocketAddr;
use std::sync::Arc;

use firefly_core::config::ServerSettings;
use tokio::task::JoinHandle;
use tracing::info;

use crate::error::{ServerError, StartupError};
use crate::router::build_router;
use crate::server;
use crate::state::AppState;

/// A server running on a background task.
#[derive(Debug)]
pub struct RunningServer {
    /// The address actually bound (useful when port 0 was requested).
    pub addr: SocketAddr,
    /// The serving task. Completes only on a fatal serve error.
    pub handle: JoinHandle<Result<(), ServerError>>,
}

/// Bind the listener, then serve on a background Tokio task.
///
/// # Errors
///
/// Returns [`StartupError::Server`] if the address cannot be bound.
pub async fn spawn_server(
    settings: &ServerSettings,
    state: Arc<AppState>,
) -> Result<RunningServer, StartupError> {
    let listener = server::bind(settings).await?;
    let addr = listener
        .local_addr()
        .map_err(|e| ServerError::Bind(format!("local address unavailable: {e}")))?;
    let router = build_router(settings, state);

    let handle = tokio::spawn(server::serve(listener, router));

    info!(%addr, ws_path = %settings.ws_path, static_dir = %settings.static_dir, "Viewer server listening");

    Ok(RunningServer { addr, handle })
}

/// Start the broadcast dispatcher on a background Tokio task.
pub fn spawn_dispatcher(state: &AppState) -> JoinHandle<()> {
    tokio::spawn(state.dispatcher.clone().run())
}
