//! Viewer server for the Firefly simulation.
//!
//! This crate provides an Axum HTTP server that exposes:
//!
//! - **`WebSocket` endpoint** (`/ws` by default) that pushes the
//!   flattened grid to every connected viewer and accepts the `restart`
//!   command
//! - **Status endpoint** (`GET /api/status`) with grid and session counts
//! - **Static assets** for every other path, served from a directory of
//!   pre-built front-end files
//!
//! # Architecture
//!
//! Each viewer is a [`Session`] in the [`SessionRegistry`]. A session owns
//! a bounded outbound queue drained by its own writer task, so frames
//! reach a viewer in order and a slow viewer never stalls anyone else.
//! The [`Dispatcher`] wakes on the simulation's change signal and on its
//! own heartbeat; every heartbeat it takes one snapshot of the grid and
//! offers it to every session without waiting on any of them.
//!
//! [`Session`]: registry::Session
//! [`SessionRegistry`]: registry::SessionRegistry
//! [`Dispatcher`]: dispatcher::Dispatcher

pub mod dispatcher;
pub mod error;
pub mod handlers;
pub mod registry;
pub mod router;
pub mod server;
pub mod startup;
pub mod state;
pub mod ws;

// Re-export primary types for convenience.
pub use error::{ServerError, StartupError};
pub use router::build_router;
pub use startup::{spawn_dispatcher, spawn_server};
pub use state::AppState;
