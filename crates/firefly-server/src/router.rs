//! Axum router construction for the viewer server.
//!
//! Assembles the `WebSocket` route, the status route, and the static
//! asset fallback into a single [`Router`] with CORS and request tracing.

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use firefly_core::config::ServerSettings;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;
use crate::ws;

/// Build the complete Axum router.
///
/// The router includes:
/// - `GET {ws_path}` -- viewer `WebSocket` stream
/// - `GET /api/status` -- grid and session counts
/// - everything else -- files under `static_dir`
///
/// Any origin may connect; viewers are unauthenticated.
pub fn build_router(settings: &ServerSettings, state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route(&settings.ws_path, get(ws::ws_viewer))
        .route("/api/status", get(handlers::status))
        .fallback_service(ServeDir::new(&settings.static_dir))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
