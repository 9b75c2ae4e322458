//! Shared application state for the viewer server.
//!
//! [`AppState`] ties together the live grid, the session registry, and
//! the dispatcher that connects them. It is wrapped in [`Arc`] and
//! injected into handlers via Axum's `State` extractor.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use firefly_core::config::BroadcastConfig;
use firefly_core::shared::SharedGrid;

use crate::dispatcher::Dispatcher;
use crate::registry::SessionRegistry;

/// Shared state for the Axum application.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The live simulation grid.
    pub grid: Arc<SharedGrid>,
    /// Connected viewer sessions.
    pub registry: Arc<SessionRegistry>,
    /// Delivery from grid to sessions.
    pub dispatcher: Dispatcher,
    /// Outbound frames buffered per session.
    pub session_queue_capacity: usize,
    /// When the server state was created.
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// Create server state around a running grid.
    pub fn new(grid: Arc<SharedGrid>, broadcast: &BroadcastConfig) -> Self {
        let registry = Arc::new(SessionRegistry::new());
        let dispatcher = Dispatcher::new(
            Arc::clone(&grid),
            Arc::clone(&registry),
            broadcast.interval(),
        );
        Self {
            grid,
            registry,
            dispatcher,
            session_queue_capacity: broadcast.session_queue_capacity,
            started_at: Utc::now(),
        }
    }
}
