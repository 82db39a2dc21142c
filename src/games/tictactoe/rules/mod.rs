//! Game rules for tic-tac-toe.
//!
//! Pure functions evaluating a board for a result. Only the authoritative
//! side runs these; clients observe `winner` and `draw` as they arrive.

pub mod draw;
pub mod win;

pub use draw::is_draw;
pub use win::{WINNING_COMBINATIONS, check_winner};

use super::{CellId, GameState, Mark};
use tracing::instrument;

/// Result of a finished game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// A mark completed a line.
    Winner {
        /// Winning mark.
        mark: Mark,
        /// Cells of the completed line, in line order.
        combination: Vec<CellId>,
    },
    /// Every cell is marked and no line is complete.
    Draw,
}

/// Evaluates the state after the move carrying `last_mark`.
///
/// Only the mark that just moved can have completed a line.
#[instrument(skip(state), fields(status = %state.status()))]
pub fn outcome(state: &GameState) -> Option<Outcome> {
    if let Some(mark) = state.last_mark()
        && let Some(combination) = check_winner(state.coordinates(), mark)
    {
        return Some(Outcome::Winner { mark, combination });
    }

    if is_draw(state.coordinates()) {
        return Some(Outcome::Draw);
    }

    None
}
