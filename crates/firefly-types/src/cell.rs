//! Cell states for the firefly timing state machine.

use serde::{Deserialize, Serialize};

/// The state of a single grid position.
///
/// On the wire each state is encoded as a small signed integer
/// (see [`CellState::code`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CellState {
    /// No firefly lives here. Skipped by the clock until a restart.
    #[default]
    Inactive,
    /// Active firefly waiting for its next flash.
    Dim,
    /// Active firefly currently flashing.
    Flashing,
}

impl CellState {
    /// Wire code for this state: `-1` inactive, `0` dim, `1` flashing.
    pub const fn code(self) -> i8 {
        match self {
            Self::Inactive => -1,
            Self::Dim => 0,
            Self::Flashing => 1,
        }
    }

    /// Whether this cell takes part in the simulation.
    pub const fn is_active(self) -> bool {
        !matches!(self, Self::Inactive)
    }
}
