//! Flattened grid state as sent to viewers.
//!
//! A [`FlatState`] is a row-major sequence of cell codes, one per grid
//! position. It is a plain value with no link back to the grid it was
//! taken from, and serialises as a bare JSON array of integers.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::cell::CellState;

/// Row-major cell codes (`-1`, `0`, `1`) for an N x N grid.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct FlatState(#[ts(type = "Array<-1 | 0 | 1>")] pub Vec<i8>);

impl FlatState {
    /// Build a flattened state from cell states in row-major order.
    pub fn from_states<I>(states: I) -> Self
    where
        I: IntoIterator<Item = CellState>,
    {
        Self(states.into_iter().map(CellState::code).collect())
    }

    /// Number of cells in the payload.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the payload holds no cells.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Borrow the raw codes.
    pub fn codes(&self) -> &[i8] {
        &self.0
    }

    /// Count cells currently in `state`.
    pub fn count(&self, state: CellState) -> usize {
        let code = state.code();
        self.0.iter().filter(|c| **c == code).count()
    }

    /// Encode as the JSON text frame sent over the wire.
    ///
    /// # Errors
    ///
    /// Returns the underlying `serde_json` error if encoding fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
