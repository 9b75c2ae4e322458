//! REST handlers for the viewer server.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::state::AppState;

/// Response body for `GET /api/status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResponse {
    /// Side length N of the grid.
    pub grid_size: usize,
    /// Cells holding a firefly.
    pub active_cells: usize,
    /// Cells flashing right now.
    pub flashing_cells: usize,
    /// Connected viewers.
    pub sessions: usize,
    /// When the server started.
    pub started_at: DateTime<Utc>,
    /// When the current grid was built.
    pub last_restart_at: DateTime<Utc>,
    /// Restarts since startup.
    pub restarts: u64,
}

/// Report grid and session counts.
///
/// # Route
///
/// `GET /api/status`
pub async fn status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let stats = state.grid.stats().await;
    let sessions = state.registry.len().await;
    Json(StatusResponse {
        grid_size: stats.size,
        active_cells: stats.active_cells,
        flashing_cells: stats.flashing_cells,
        sessions,
        started_at: state.started_at,
        last_restart_at: stats.created_at,
        restarts: state.grid.restarts(),
    })
}
