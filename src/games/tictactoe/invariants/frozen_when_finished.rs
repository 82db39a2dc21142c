//! Finished games are frozen: no further board or turn changes.

use super::super::GameState;
use super::Invariant;

/// Invariant: Once finished, `coordinates` and `last_mark` never change.
pub struct FrozenWhenFinishedInvariant;

impl Invariant<GameState> for FrozenWhenFinishedInvariant {
    fn holds(before: &GameState, after: &GameState) -> bool {
        if !before.is_finished() {
            return true;
        }
        before.coordinates() == after.coordinates() && before.last_mark() == after.last_mark()
    }

    fn description() -> &'static str {
        "Finished games accept no further moves"
    }
}
