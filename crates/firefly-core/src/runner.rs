//! Long-lived simulation tasks.
//!
//! - [`run_clock`] ticks the grid on a fixed period and signals the
//!   dispatcher whenever a tick changed visible state.
//! - [`run_scheduled_restarts`] replaces the grid on a fixed period.
//!
//! [`spawn_simulation`] starts both on the Tokio runtime. Restarts only
//! swap the grid, so exactly one clock task exists per process.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{info, trace};

use crate::clock::{self, Coupling};
use crate::config::SimulationConfig;
use crate::shared::{RestartTrigger, SharedGrid};

/// Handles to the background simulation tasks.
#[derive(Debug)]
pub struct SimulationHandles {
    /// The tick loop.
    pub clock: JoinHandle<()>,
    /// The scheduled restart loop, when enabled.
    pub restarts: Option<JoinHandle<()>>,
}

impl SimulationHandles {
    /// Abort every task.
    pub fn abort(&self) {
        self.clock.abort();
        if let Some(handle) = &self.restarts {
            handle.abort();
        }
    }
}

/// Spawn the clock and, if configured, the scheduled restart loop.
pub fn spawn_simulation(grid: &Arc<SharedGrid>, config: &SimulationConfig) -> SimulationHandles {
    let clock = tokio::spawn(run_clock(
        Arc::clone(grid),
        config.coupling(),
        config.timing.tick_interval(),
    ));

    let restarts = config
        .timing
        .restart_interval()
        .map(|period| tokio::spawn(run_scheduled_restarts(Arc::clone(grid), period)));

    info!(
        tick_interval_ms = config.timing.tick_interval_ms,
        neighbor_radius = config.grid.neighbor_radius,
        restart_interval_secs = config.timing.restart_interval_secs,
        "Simulation tasks started"
    );

    SimulationHandles { clock, restarts }
}

/// Tick `grid` every `period` forever.
///
/// Each tick runs under the write lock against one captured `now`, so a
/// reader never observes a half-applied tick.
pub async fn run_clock(grid: Arc<SharedGrid>, coupling: Coupling, period: Duration) {
    let mut ticker = time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;
        let now = Instant::now();
        let outcome = grid
            .with_write(|grid| clock::step(grid, now, &coupling))
            .await;
        if outcome.changed() {
            trace!(
                flashed = outcome.flashed,
                pulled = outcome.pulled,
                dimmed = outcome.dimmed,
                "Tick changed state"
            );
            grid.notify_changed();
        }
    }
}

/// Restart `grid` every `period` forever. The first restart happens one
/// full period after the call.
pub async fn run_scheduled_restarts(grid: Arc<SharedGrid>, period: Duration) {
    let start = Instant::now().checked_add(period).unwrap_or_else(Instant::now);
    let mut ticker = time::interval_at(start, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        grid.restart(RestartTrigger::Scheduled).await;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use firefly_types::CellState;

    use super::*;
    use crate::grid::{Activation, Cell, Firefly, Grid, GridBlueprint};

    fn single_cell_grid(t0: Instant) -> SharedGrid {
        let mut grid = Grid::new(3);
        grid.set(
            1,
            1,
            Cell::Active(Firefly::dim(
                Duration::from_millis(5000),
                Duration::from_millis(650),
                t0 + Duration::from_millis(1000),
            )),
        );
        SharedGrid::new(GridBlueprint::default(), grid)
    }

    #[tokio::test(start_paused = true)]
    async fn clock_drives_flash_cycle() {
        let t0 = Instant::now();
        let grid = Arc::new(single_cell_grid(t0));
        let handle = tokio::spawn(run_clock(
            Arc::clone(&grid),
            Coupling::default(),
            Duration::from_millis(100),
        ));

        time::sleep_until(t0 + Duration::from_millis(1050)).await;
        assert_eq!(grid.with_read(|g| g.state(1, 1)).await, CellState::Flashing);

        time::sleep_until(t0 + Duration::from_millis(1750)).await;
        assert_eq!(grid.with_read(|g| g.state(1, 1)).await, CellState::Dim);

        handle.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn clock_signals_changes() {
        let t0 = Instant::now();
        let grid = Arc::new(single_cell_grid(t0));
        let handle = tokio::spawn(run_clock(
            Arc::clone(&grid),
            Coupling::default(),
            Duration::from_millis(100),
        ));

        time::timeout(Duration::from_secs(2), grid.changed())
            .await
            .unwrap();
        assert!(Instant::now() >= t0 + Duration::from_millis(1000));

        handle.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn scheduled_restart_replaces_grid() {
        let blueprint = GridBlueprint {
            size: 6,
            activation: Activation {
                probability: 1.0,
                ..Activation::default()
            },
        };
        let grid = Arc::new(SharedGrid::new(blueprint, Grid::new(6)));
        let handle = tokio::spawn(run_scheduled_restarts(
            Arc::clone(&grid),
            Duration::from_secs(3600),
        ));

        time::sleep(Duration::from_secs(3599)).await;
        assert_eq!(grid.restarts(), 0);
        assert_eq!(grid.stats().await.active_cells, 0);

        time::sleep(Duration::from_secs(2)).await;
        assert_eq!(grid.restarts(), 1);
        assert_eq!(grid.stats().await.active_cells, 36);

        handle.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn disabled_restart_spawns_no_task() {
        let mut config = SimulationConfig::default();
        config.timing.restart_interval_secs = 0;
        let grid = Arc::new(SharedGrid::seeded(config.grid_blueprint()));

        let handles = spawn_simulation(&grid, &config);
        assert!(handles.restarts.is_none());
        handles.abort();
    }
}
