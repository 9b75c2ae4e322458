//! Grid model, simulation clock, and restart orchestration for the
//! Firefly simulation.
//!
//! A toroidal N x N grid of fireflies flashes on individual cycles. A
//! dim firefly that sees a flashing neighbour pulls its next flash
//! earlier, and the population drifts into phase over time.
//!
//! # Modules
//!
//! - [`config`] -- Configuration loading from `firefly-config.yaml` into
//!   strongly-typed structs.
//! - [`grid`] -- Cells, grid construction with random activation, and
//!   flattening to the wire payload.
//! - [`clock`] -- The per-tick state machine and the neighbour coupling
//!   rule.
//! - [`shared`] -- [`SharedGrid`], the lock-guarded owner of the grid with
//!   the single-slot change signal and restart.
//! - [`runner`] -- Long-lived tick loop and scheduled restart loop.
//!
//! [`SharedGrid`]: shared::SharedGrid

pub mod clock;
pub mod config;
pub mod grid;
pub mod runner;
pub mod shared;
