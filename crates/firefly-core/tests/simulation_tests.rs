//! Integration tests for the simulation core.
//!
//! These drive the public API the way the server does: a [`SharedGrid`]
//! built from configuration, ticked through scoped write access, and
//! restarted wholesale.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use firefly_core::clock::{self, Coupling};
use firefly_core::config::SimulationConfig;
use firefly_core::grid::{Cell, Firefly, Grid, GridBlueprint};
use firefly_core::shared::{RestartTrigger, SharedGrid};
use firefly_types::CellState;
use tokio::time::Instant;

#[tokio::test]
async fn restart_activation_fraction_converges() {
    let config = SimulationConfig::default();
    let shared = SharedGrid::seeded(config.grid_blueprint());

    let rounds = 150;
    let mut active = 0usize;
    for _ in 0..rounds {
        active += shared.restart(RestartTrigger::Command).await;
    }
    let total = rounds * 900;

    #[allow(clippy::cast_precision_loss)]
    let fraction = active as f64 / total as f64;
    assert!((fraction - 0.12).abs() < 0.015, "fraction {fraction}");
    assert_eq!(shared.restarts(), 150);
}

#[tokio::test]
async fn ticks_are_atomic_to_readers() {
    let config = SimulationConfig::default();
    let shared = Arc::new(SharedGrid::seeded(config.grid_blueprint()));
    let coupling = config.coupling();

    let writer = {
        let shared = Arc::clone(&shared);
        tokio::spawn(async move {
            let t0 = Instant::now();
            for tick in 0..300u64 {
                let now = t0 + Duration::from_millis(tick * 100);
                shared.with_write(|g| clock::step(g, now, &coupling)).await;
                tokio::task::yield_now().await;
            }
        })
    };

    let reader = {
        let shared = Arc::clone(&shared);
        tokio::spawn(async move {
            for _ in 0..300 {
                let flat = shared.flatten().await;
                assert_eq!(flat.len(), 900);
                assert!(flat.codes().iter().all(|c| (-1..=1).contains(c)));
                tokio::task::yield_now().await;
            }
        })
    };

    writer.await.unwrap();
    reader.await.unwrap();
}

#[test]
fn neighbours_pull_each_other_into_phase() {
    let t = Instant::now();
    let mut grid = Grid::new(8);
    let cycle = Duration::from_millis(5000);
    let flash = Duration::from_millis(650);
    grid.set(3, 3, Cell::Active(Firefly::dim(cycle, flash, t + Duration::from_millis(5000))));
    grid.set(3, 4, Cell::Active(Firefly::dim(cycle, flash, t + Duration::from_millis(5200))));

    let coupling = Coupling {
        radius: 1,
        advance: Duration::from_millis(250),
    };

    let mut b_first_flash = None;
    for tick in 0..=70u64 {
        let now = t + Duration::from_millis(tick * 100);
        clock::step(&mut grid, now, &coupling);
        if b_first_flash.is_none() && grid.state(3, 4) == CellState::Flashing {
            b_first_flash = Some(now);
        }
    }

    assert!(b_first_flash.unwrap() < t + Duration::from_millis(5200));
}

#[test]
fn custom_blueprint_builds_requested_size() {
    let yaml = "grid:\n  size: 4\n  activation_probability: 1.0\n";
    let config = SimulationConfig::parse(yaml).unwrap();
    let blueprint: GridBlueprint = config.grid_blueprint();
    let grid = blueprint.generate(&mut rand::rng(), Instant::now());
    assert_eq!(grid.flatten().codes(), &[0; 16]);
}
