//! Outcome exclusivity: a game has a winner, a draw, or neither.

use super::super::GameState;
use super::Invariant;

/// Invariant: `winner` and `draw` are never both set, and neither is set
/// before the game finishes. A winner always comes with its combination.
pub struct OutcomeExclusiveInvariant;

impl Invariant<GameState> for OutcomeExclusiveInvariant {
    fn holds(_before: &GameState, after: &GameState) -> bool {
        let has_winner = after.winner().is_some();
        if has_winner && after.draw() {
            return false;
        }
        if (has_winner || after.draw()) && !after.is_finished() {
            return false;
        }
        has_winner == after.winning_combination().is_some()
    }

    fn description() -> &'static str {
        "Winner and draw are exclusive and only set when finished"
    }
}
