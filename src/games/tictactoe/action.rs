//! First-class action types for tic-tac-toe.
//!
//! A move is a proposal, not a commit. It is validated locally against
//! the mirrored state and only becomes real once the authoritative side
//! echoes it back.

use super::{CellId, Mark};
use serde::{Deserialize, Serialize};
use tracing::instrument;

/// A proposed move: a mark placed into a cell.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Move {
    /// The mark being placed.
    pub mark: Mark,
    /// The target cell.
    pub cell: CellId,
}

impl Move {
    /// Creates a new move.
    #[instrument]
    pub fn new(mark: Mark, cell: CellId) -> Self {
        Self { mark, cell }
    }
}

impl std::fmt::Display for Move {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} -> {}", self.mark, self.cell)
    }
}

/// Reason a proposed move was rejected locally.
///
/// Variants are listed in the order the checks run.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum InvalidMove {
    /// The game is finished.
    #[display("This game is finished")]
    GameFinished,

    /// The second mover tried to open the game.
    #[display("The first mover must make the opening move")]
    NotYourOpeningTurn,

    /// The last committed move carries this participant's mark.
    #[display("It is not your turn")]
    NotYourTurn,

    /// The target cell already holds a mark.
    #[display("Cell {} is already marked", _0)]
    CellOccupied(CellId),
}

impl std::error::Error for InvalidMove {}
