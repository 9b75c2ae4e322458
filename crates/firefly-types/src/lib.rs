//! Shared type definitions for the Firefly simulation.
//!
//! Types defined here are used by both the simulation core and the
//! viewer-facing server. The wire payload flows downstream to
//! `TypeScript` via `ts-rs` for the browser front end.
//!
//! # Modules
//!
//! - [`cell`] -- Per-cell state machine states and their wire codes
//! - [`flat`] -- The flattened, row-major grid payload pushed to viewers
//! - [`ids`] -- Type-safe UUID wrapper for viewer sessions

pub mod cell;
pub mod flat;
pub mod ids;

pub use cell::CellState;
pub use flat::FlatState;
pub use ids::SessionId;
