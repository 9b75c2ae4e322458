//! The N x N toroidal grid of firefly cells.
//!
//! A [`Grid`] is plain data: construction, lookup, and flattening to the
//! wire payload. Timing transitions live in [`crate::clock`] and locking
//! lives in [`crate::shared`].
//!
//! Cells are stored row-major; position `(x, y)` is row `x`, column `y`
//! and sits at index `x * size + y`.

use std::ops::Range;
use std::time::Duration;

use chrono::{DateTime, Utc};
use firefly_types::{CellState, FlatState};
use rand::Rng;
use tokio::time::Instant;

/// Timing state of a living firefly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Waiting for the next flash.
    Dim,
    /// Flashing until `dim_at`.
    Flashing {
        /// When the flash ends.
        dim_at: Instant,
    },
}

/// An active cell and its flash schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Firefly {
    /// Current phase. The dim deadline only exists while flashing.
    pub phase: Phase,
    /// Length of one dim-flash-dim cycle.
    pub cycle_period: Duration,
    /// How long a flash lasts.
    pub flash_duration: Duration,
    /// Absolute time of the next transition into flashing.
    pub next_flash_at: Instant,
}

impl Firefly {
    /// A dim firefly scheduled to flash at `next_flash_at`.
    pub const fn dim(cycle_period: Duration, flash_duration: Duration, next_flash_at: Instant) -> Self {
        Self {
            phase: Phase::Dim,
            cycle_period,
            flash_duration,
            next_flash_at,
        }
    }

    /// The observable state of this firefly.
    pub const fn state(&self) -> CellState {
        match self.phase {
            Phase::Dim => CellState::Dim,
            Phase::Flashing { .. } => CellState::Flashing,
        }
    }

    /// End of the current flash, if flashing.
    pub const fn next_dim_at(&self) -> Option<Instant> {
        match self.phase {
            Phase::Dim => None,
            Phase::Flashing { dim_at } => Some(dim_at),
        }
    }
}

/// One grid position.
///
/// Inactive cells carry no timing at all; they stay inactive until the
/// whole grid is replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cell {
    /// Empty position, skipped by the clock.
    #[default]
    Inactive,
    /// A living firefly.
    Active(Firefly),
}

impl Cell {
    /// The observable state of this cell.
    pub const fn state(&self) -> CellState {
        match self {
            Self::Inactive => CellState::Inactive,
            Self::Active(firefly) => firefly.state(),
        }
    }

    /// The firefly at this position, if any.
    pub const fn firefly(&self) -> Option<&Firefly> {
        match self {
            Self::Inactive => None,
            Self::Active(firefly) => Some(firefly),
        }
    }
}

/// Random parameters for populating a fresh grid.
#[derive(Debug, Clone, PartialEq)]
pub struct Activation {
    /// Chance that a cell receives a firefly.
    pub probability: f64,
    /// Cycle period range in milliseconds (end exclusive).
    pub cycle_period_ms: Range<u64>,
    /// Flash duration range in milliseconds (end exclusive).
    pub flash_duration_ms: Range<u64>,
}

impl Activation {
    /// Roll the dice for one cell.
    ///
    /// With probability [`Self::probability`] returns a dim firefly with a
    /// random cycle period, a random flash duration, and a first flash at
    /// a uniformly random phase within its first cycle.
    pub fn roll<R: Rng + ?Sized>(&self, rng: &mut R, now: Instant) -> Cell {
        if rng.random::<f64>() >= self.probability {
            return Cell::Inactive;
        }
        let cycle_period = sample_ms(rng, &self.cycle_period_ms);
        let flash_duration = sample_ms(rng, &self.flash_duration_ms);
        let phase_offset = cycle_period.mul_f64(rng.random::<f64>());
        let next_flash_at = now.checked_add(phase_offset).unwrap_or(now);
        Cell::Active(Firefly::dim(cycle_period, flash_duration, next_flash_at))
    }
}

impl Default for Activation {
    fn default() -> Self {
        Self {
            probability: 0.12,
            cycle_period_ms: 4000..6000,
            flash_duration_ms: 600..733,
        }
    }
}

fn sample_ms<R: Rng + ?Sized>(rng: &mut R, range: &Range<u64>) -> Duration {
    if range.is_empty() {
        return Duration::from_millis(range.start);
    }
    Duration::from_millis(rng.random_range(range.clone()))
}

/// Everything needed to build a fresh grid.
#[derive(Debug, Clone, PartialEq)]
pub struct GridBlueprint {
    /// Side length of the torus.
    pub size: usize,
    /// Population parameters.
    pub activation: Activation,
}

impl GridBlueprint {
    /// Build a grid, activating each cell independently.
    pub fn generate<R: Rng + ?Sized>(&self, rng: &mut R, now: Instant) -> Grid {
        let mut grid = Grid::new(self.size);
        for cell in &mut grid.cells {
            *cell = self.activation.roll(rng, now);
        }
        grid
    }
}

impl Default for GridBlueprint {
    fn default() -> Self {
        Self {
            size: 30,
            activation: Activation::default(),
        }
    }
}

/// The N x N toroidal array of cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    size: usize,
    cells: Vec<Cell>,
    created_at: DateTime<Utc>,
}

impl Grid {
    /// A grid of `size * size` inactive cells.
    pub fn new(size: usize) -> Self {
        Self {
            size,
            cells: vec![Cell::Inactive; size.saturating_mul(size)],
            created_at: Utc::now(),
        }
    }

    /// Side length N.
    pub const fn size(&self) -> usize {
        self.size
    }

    /// Total number of cells.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Whether the grid has no cells (size 0).
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Wall-clock time this grid was built.
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn index(&self, x: usize, y: usize) -> Option<usize> {
        if x < self.size && y < self.size {
            x.checked_mul(self.size)?.checked_add(y)
        } else {
            None
        }
    }

    /// The cell at row `x`, column `y`.
    pub fn get(&self, x: usize, y: usize) -> Option<&Cell> {
        self.index(x, y).and_then(|i| self.cells.get(i))
    }

    /// Mutable access to the cell at row `x`, column `y`.
    pub fn get_mut(&mut self, x: usize, y: usize) -> Option<&mut Cell> {
        self.index(x, y).and_then(|i| self.cells.get_mut(i))
    }

    /// Replace the cell at `(x, y)`. Out-of-range positions are ignored
    /// and reported as `false`.
    pub fn set(&mut self, x: usize, y: usize, cell: Cell) -> bool {
        match self.get_mut(x, y) {
            Some(slot) => {
                *slot = cell;
                true
            }
            None => false,
        }
    }

    /// Observable state at `(x, y)`; out-of-range reads as inactive.
    pub fn state(&self, x: usize, y: usize) -> CellState {
        self.get(x, y).map_or(CellState::Inactive, Cell::state)
    }

    /// Cells in row-major order.
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Number of cells holding a firefly.
    pub fn active_count(&self) -> usize {
        self.cells.iter().filter(|c| c.state().is_active()).count()
    }

    /// Number of cells currently flashing.
    pub fn flashing_count(&self) -> usize {
        self.cells
            .iter()
            .filter(|c| c.state() == CellState::Flashing)
            .count()
    }

    /// Row-major state codes, detached from the grid.
    pub fn flatten(&self) -> FlatState {
        FlatState::from_states(self.cells.iter().map(Cell::state))
    }
}
