//! Monotonic status invariant: new, active, finished, never backwards.

use super::super::GameState;
use super::Invariant;

/// Invariant: Status never regresses.
pub struct MonotonicStatusInvariant;

impl Invariant<GameState> for MonotonicStatusInvariant {
    fn holds(before: &GameState, after: &GameState) -> bool {
        after.status() >= before.status()
    }

    fn description() -> &'static str {
        "Status never regresses (new, active, finished)"
    }
}
