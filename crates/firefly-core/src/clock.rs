//! The simulation clock: one tick of the firefly state machine.
//!
//! Each tick evaluates every active cell against a single captured
//! `now`:
//!
//! 1. Past its flash deadline: start flashing, and schedule the next
//!    flash one cycle after the *previous deadline* so periods do not
//!    drift.
//! 2. Flashing past its dim deadline: go dim.
//! 3. Dim with a flashing neighbour: pull the next flash earlier by the
//!    coupling advance. If that puts the deadline in the past, flash
//!    immediately and re-anchor the next flash to `now + cycle`.
//!
//! Cells are updated in place in row-major order, so a cell that starts
//! flashing this tick is already visible to the neighbour checks of the
//! cells after it.
//!
//! The neighbour scan is `O(radius^2)` per dim cell, so a tick costs
//! `O(N^2 * radius^2)`. When the scan window covers the whole torus it is
//! clamped to the grid instead of visiting positions twice.

use std::time::Duration;

use firefly_types::CellState;
use tokio::time::Instant;

use crate::grid::{Cell, Firefly, Grid, Phase};

/// Parameters of the neighbour coupling rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Coupling {
    /// Chebyshev radius searched for flashing neighbours.
    pub radius: usize,
    /// How far a flashing neighbour pulls the next flash earlier.
    pub advance: Duration,
}

impl Default for Coupling {
    fn default() -> Self {
        Self {
            radius: 10,
            advance: Duration::from_millis(250),
        }
    }
}

/// What happened during one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickOutcome {
    /// Cells that started flashing on their own schedule.
    pub flashed: usize,
    /// Cells that started flashing early because of a neighbour.
    pub pulled: usize,
    /// Cells whose flash ended.
    pub dimmed: usize,
}

impl TickOutcome {
    /// Whether any visible state changed.
    pub const fn changed(&self) -> bool {
        self.flashed > 0 || self.pulled > 0 || self.dimmed > 0
    }
}

/// Advance every active cell of `grid` to `now`.
pub fn step(grid: &mut Grid, now: Instant, coupling: &Coupling) -> TickOutcome {
    let size = grid.size();
    let mut outcome = TickOutcome::default();

    for x in 0..size {
        for y in 0..size {
            let Some(Cell::Active(mut firefly)) = grid.get(x, y).copied() else {
                continue;
            };

            if now >= firefly.next_flash_at {
                firefly.phase = Phase::Flashing {
                    dim_at: later(now, firefly.flash_duration),
                };
                firefly.next_flash_at = later(firefly.next_flash_at, firefly.cycle_period);
                outcome.flashed = outcome.flashed.saturating_add(1);
            } else {
                match firefly.phase {
                    Phase::Flashing { dim_at } => {
                        if now >= dim_at {
                            firefly.phase = Phase::Dim;
                            outcome.dimmed = outcome.dimmed.saturating_add(1);
                        }
                    }
                    Phase::Dim => {
                        if has_flashing_neighbor(grid, x, y, coupling.radius)
                            && pull(&mut firefly, now, coupling.advance)
                        {
                            outcome.pulled = outcome.pulled.saturating_add(1);
                        }
                    }
                }
            }

            grid.set(x, y, Cell::Active(firefly));
        }
    }

    outcome
}

/// Apply one coupling pull. Returns `true` if the firefly flashed.
fn pull(firefly: &mut Firefly, now: Instant, advance: Duration) -> bool {
    firefly.next_flash_at = earlier(firefly.next_flash_at, advance);
    if now >= firefly.next_flash_at {
        firefly.phase = Phase::Flashing {
            dim_at: later(now, firefly.flash_duration),
        };
        firefly.next_flash_at = later(now, firefly.cycle_period);
        true
    } else {
        false
    }
}

/// Whether any *other* cell within Chebyshev `radius` of `(x, y)` is
/// flashing. Coordinates wrap in both axes.
pub fn has_flashing_neighbor(grid: &Grid, x: usize, y: usize, radius: usize) -> bool {
    let size = grid.size();
    if x >= size || y >= size {
        return false;
    }
    wrapped_window(x, radius, size).any(|nx| {
        wrapped_window(y, radius, size)
            .any(|ny| (nx, ny) != (x, y) && grid.state(nx, ny) == CellState::Flashing)
    })
}

/// Distinct coordinates within `radius` of `center` on a ring of `size`.
fn wrapped_window(center: usize, radius: usize, size: usize) -> impl Iterator<Item = usize> {
    let covers_ring = radius.saturating_mul(2).saturating_add(1) >= size;
    let (start, len) = if covers_ring {
        (0, size)
    } else {
        // radius < size / 2 here, so none of this can overflow.
        (
            center.saturating_add(size).saturating_sub(radius) % size,
            radius.saturating_mul(2).saturating_add(1),
        )
    };
    (0..len).map(move |k| start.saturating_add(k) % size)
}

fn later(t: Instant, d: Duration) -> Instant {
    t.checked_add(d).unwrap_or(t)
}

fn earlier(t: Instant, d: Duration) -> Instant {
    t.checked_sub(d).unwrap_or(t)
}
