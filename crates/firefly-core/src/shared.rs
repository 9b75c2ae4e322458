//! Lock-guarded ownership of the live grid.
//!
//! [`SharedGrid`] is the only way to reach the grid once the simulation
//! is running. Access goes through scoped accessors ([`with_read`] and
//! [`with_write`]) so no caller can hold a bare reference across an
//! await point or outside the lock.
//!
//! The change signal is a single-slot [`Notify`]: signalling while
//! nobody waits stores one permit, and further signals coalesce into it.
//! The dispatcher's heartbeat delivers state regardless, so a lost or
//! merged signal only costs latency.
//!
//! [`with_read`]: SharedGrid::with_read
//! [`with_write`]: SharedGrid::with_write

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use firefly_types::FlatState;
use tokio::sync::{Notify, RwLock};
use tokio::time::Instant;
use tracing::info;

use crate::grid::{Grid, GridBlueprint};

/// Why a restart happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestartTrigger {
    /// A viewer sent the `restart` command.
    Command,
    /// The scheduled restart timer fired.
    Scheduled,
}

impl fmt::Display for RestartTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Command => f.write_str("command"),
            Self::Scheduled => f.write_str("scheduled"),
        }
    }
}

/// Point-in-time counts for status reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridStats {
    /// Side length N.
    pub size: usize,
    /// Cells holding a firefly.
    pub active_cells: usize,
    /// Cells currently flashing.
    pub flashing_cells: usize,
    /// When the current grid was built.
    pub created_at: DateTime<Utc>,
}

/// The live grid behind a read-write lock, plus its change signal.
pub struct SharedGrid {
    blueprint: GridBlueprint,
    grid: RwLock<Grid>,
    changed: Notify,
    restarts: AtomicU64,
}

impl SharedGrid {
    /// Wrap an existing grid. Restarts will build grids from `blueprint`.
    pub fn new(blueprint: GridBlueprint, grid: Grid) -> Self {
        Self {
            blueprint,
            grid: RwLock::new(grid),
            changed: Notify::new(),
            restarts: AtomicU64::new(0),
        }
    }

    /// Build a randomly populated grid from `blueprint` and wrap it.
    pub fn seeded(blueprint: GridBlueprint) -> Self {
        let grid = blueprint.generate(&mut rand::rng(), Instant::now());
        Self::new(blueprint, grid)
    }

    /// The parameters restarts use.
    pub const fn blueprint(&self) -> &GridBlueprint {
        &self.blueprint
    }

    /// Run `f` with shared access to the grid.
    pub async fn with_read<R>(&self, f: impl FnOnce(&Grid) -> R) -> R {
        let guard = self.grid.read().await;
        f(&guard)
    }

    /// Run `f` with exclusive access to the grid.
    pub async fn with_write<R>(&self, f: impl FnOnce(&mut Grid) -> R) -> R {
        let mut guard = self.grid.write().await;
        f(&mut guard)
    }

    /// Copy out the row-major state codes under the read lock.
    pub async fn flatten(&self) -> FlatState {
        self.with_read(Grid::flatten).await
    }

    /// Counts for status reporting, taken under the read lock.
    pub async fn stats(&self) -> GridStats {
        self.with_read(|grid| GridStats {
            size: grid.size(),
            active_cells: grid.active_count(),
            flashing_cells: grid.flashing_count(),
            created_at: grid.created_at(),
        })
        .await
    }

    /// Signal that the grid changed. Never blocks; coalesces with any
    /// signal not yet consumed.
    pub fn notify_changed(&self) {
        self.changed.notify_one();
    }

    /// Wait for the next change signal.
    pub async fn changed(&self) {
        self.changed.notified().await;
    }

    /// Swap in `grid` as a whole under the write lock, then signal.
    pub async fn replace(&self, grid: Grid) {
        {
            let mut guard = self.grid.write().await;
            *guard = grid;
        }
        self.restarts.fetch_add(1, Ordering::AcqRel);
        self.notify_changed();
    }

    /// Discard every cell and start over with a fresh random grid.
    ///
    /// Returns the number of activated cells.
    pub async fn restart(&self, trigger: RestartTrigger) -> usize {
        let grid = self.blueprint.generate(&mut rand::rng(), Instant::now());
        let active = grid.active_count();
        self.replace(grid).await;
        info!(%trigger, active_cells = active, "Simulation restarted");
        active
    }

    /// Number of restarts since startup.
    pub fn restarts(&self) -> u64 {
        self.restarts.load(Ordering::Acquire)
    }
}

impl fmt::Debug for SharedGrid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedGrid")
            .field("blueprint", &self.blueprint)
            .field("restarts", &self.restarts())
            .finish_non_exhaustive()
    }
}
