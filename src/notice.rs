//! Player-facing notices derived from model changes.

use crate::games::tictactoe::{Field, GameState, Mark};
use derive_more::Display;
use tracing::instrument;

/// A notice for the local participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Notice {
    /// The local participant may move.
    #[display("Your turn!")]
    YourTurn,
    /// Waiting for the opponent.
    #[display("Your opponent's turn!")]
    OpponentTurn,
    /// The local participant won.
    #[display("You have won!")]
    Won,
    /// The opponent won.
    #[display("You have lost!")]
    Lost,
    /// Nobody won.
    #[display("Draw!")]
    Draw,
}

impl Notice {
    /// Notices for one aggregate state change, as seen by `mark`.
    #[instrument(skip(state))]
    pub fn from_change(fields: &[Field], state: &GameState, mark: Mark) -> Vec<Notice> {
        let mut notices = Vec::new();

        if fields.contains(&Field::Draw) && state.draw() {
            notices.push(Notice::Draw);
        }

        if fields.contains(&Field::Winner)
            && let Some(winner) = state.winner()
        {
            notices.push(if winner == mark {
                Notice::Won
            } else {
                Notice::Lost
            });
        }

        if state.is_finished() {
            return notices;
        }

        if fields.contains(&Field::LastMark) || fields.contains(&Field::Status) {
            // The first mover opens; afterwards the marks alternate.
            let to_move = state.last_mark().map_or(Mark::X, Mark::opponent);
            notices.push(if to_move == mark {
                Notice::YourTurn
            } else {
                Notice::OpponentTurn
            });
        }

        notices
    }
}
