//! Engine binary for the Firefly simulation.
//!
//! Wires the simulation clock, the scheduled restart loop, the broadcast
//! dispatcher, and the viewer server together, then serves until the
//! server stops or the process is interrupted.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `firefly-config.yaml`
//! 2. Initialize structured logging (tracing)
//! 3. Build the initial grid
//! 4. Start the clock and restart tasks
//! 5. Start the broadcast dispatcher
//! 6. Bind and start the viewer server
//! 7. Wait for the server to stop or Ctrl-C

mod error;

use std::path::Path;
use std::sync::Arc;

use firefly_core::config::SimulationConfig;
use firefly_core::runner;
use firefly_core::shared::SharedGrid;
use firefly_server::state::AppState;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;

/// Path of the configuration file, relative to the working directory.
const CONFIG_PATH: &str = "firefly-config.yaml";

/// Application entry point.
///
/// # Errors
///
/// Returns an error if configuration is invalid, the listening address
/// cannot be bound, or the server fails while serving.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration.
    let config = load_config()?;

    // 2. Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .with_target(true)
        .init();

    info!(
        grid_size = config.grid.size,
        activation_probability = config.grid.activation_probability,
        neighbor_radius = config.grid.neighbor_radius,
        tick_interval_ms = config.timing.tick_interval_ms,
        broadcast_interval_ms = config.broadcast.interval_ms,
        "Configuration loaded"
    );

    // 3. Build the initial grid.
    let grid = Arc::new(SharedGrid::seeded(config.grid_blueprint()));
    let stats = grid.stats().await;
    info!(
        active_cells = stats.active_cells,
        total_cells = stats.size.saturating_mul(stats.size),
        "Initial grid created"
    );

    // 4. Start the simulation clock and restart schedule.
    let simulation = runner::spawn_simulation(&grid, &config);

    // 5. Start the dispatcher.
    let state = Arc::new(AppState::new(Arc::clone(&grid), &config.broadcast));
    let dispatcher = firefly_server::spawn_dispatcher(&state);

    // 6. Start the viewer server.
    let server = firefly_server::spawn_server(&config.server, Arc::clone(&state))
        .await
        .map_err(EngineError::from)?;

    // 7. Serve until the server stops or we are interrupted.
    let result = tokio::select! {
        joined = server.handle => match joined {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(EngineError::from(e)),
            Err(e) => Err(EngineError::Task {
                message: format!("server task failed: {e}"),
            }),
        },
        signal = tokio::signal::ctrl_c() => {
            if let Err(e) = signal {
                warn!("Failed to listen for Ctrl-C: {e}");
            }
            info!("Interrupt received, shutting down");
            Ok(())
        }
    };

    simulation.abort();
    dispatcher.abort();
    info!(restarts = grid.restarts(), "firefly-engine shutdown complete");

    result.map_err(Into::into)
}

/// Load configuration from `firefly-config.yaml`, or use defaults when
/// the file is absent.
fn load_config() -> Result<SimulationConfig, EngineError> {
    Ok(SimulationConfig::load(Path::new(CONFIG_PATH))?)
}
