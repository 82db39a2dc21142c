//! Contract-based validation for tic-tac-toe moves.
//!
//! Preconditions decide whether a proposed move is legal against the
//! mirrored state. The postcondition checks a merged snapshot against
//! the transition invariants; the authoritative session uses it before
//! committing an update.

use super::action::{InvalidMove, Move};
use super::invariants::{InvariantSet, InvariantViolation, TransitionInvariants};
use super::{GameState, GameStatus, Mark, StatePatch};
use tracing::{instrument, warn};

// ─────────────────────────────────────────────────────────────
//  Contract Trait
// ─────────────────────────────────────────────────────────────

/// A contract defines preconditions and postconditions for state transitions.
pub trait Contract<S, A> {
    /// Checks preconditions before proposing the action.
    fn pre(state: &S, action: &A) -> Result<(), InvalidMove>;

    /// Checks postconditions between two snapshots.
    fn post(before: &S, after: &S) -> Result<(), Vec<InvariantViolation>>;
}

// ─────────────────────────────────────────────────────────────
//  Move Preconditions (checked in this order)
// ─────────────────────────────────────────────────────────────

/// Precondition: The game must not be finished.
pub struct GameNotFinished;

impl GameNotFinished {
    /// Rejects any move once the game is finished.
    #[instrument(skip(state))]
    pub fn check(state: &GameState) -> Result<(), InvalidMove> {
        if state.is_finished() {
            Err(InvalidMove::GameFinished)
        } else {
            Ok(())
        }
    }
}

/// Precondition: The first mover makes the opening move.
pub struct OpeningTurn;

impl OpeningTurn {
    /// Rejects an opening move carrying the second mover's mark.
    #[instrument(skip(state))]
    pub fn check(mov: &Move, state: &GameState) -> Result<(), InvalidMove> {
        if state.status() == GameStatus::New && mov.mark == Mark::O {
            Err(InvalidMove::NotYourOpeningTurn)
        } else {
            Ok(())
        }
    }
}

/// Precondition: The mark must differ from the last committed move's.
///
/// This is the only alternation check.
pub struct PlayersTurn;

impl PlayersTurn {
    /// Rejects a second consecutive move with the same mark.
    #[instrument(skip(state))]
    pub fn check(mov: &Move, state: &GameState) -> Result<(), InvalidMove> {
        if state.last_mark() == Some(mov.mark) {
            Err(InvalidMove::NotYourTurn)
        } else {
            Ok(())
        }
    }
}

/// Precondition: The target cell must hold no mark.
///
/// A cell the snapshot does not list is unmarked.
pub struct CellIsEmpty;

impl CellIsEmpty {
    /// Rejects occupied cells.
    #[instrument(skip(state))]
    pub fn check(mov: &Move, state: &GameState) -> Result<(), InvalidMove> {
        match state.coordinates().mark_at(&mov.cell) {
            None => Ok(()),
            Some(_) => Err(InvalidMove::CellOccupied(mov.cell.clone())),
        }
    }
}

/// Composite precondition running every check in order.
pub struct LegalMove;

impl LegalMove {
    /// Validates all preconditions for a move, stopping at the first failure.
    #[instrument(skip(state))]
    pub fn check(mov: &Move, state: &GameState) -> Result<(), InvalidMove> {
        GameNotFinished::check(state)?;
        OpeningTurn::check(mov, state)?;
        PlayersTurn::check(mov, state)?;
        CellIsEmpty::check(mov, state)?;
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────
//  Move Contract
// ─────────────────────────────────────────────────────────────

/// Contract for move proposals.
pub struct MoveContract;

impl MoveContract {
    /// Validates a move and computes the patch to submit for it.
    ///
    /// The patch carries the full board with the move applied, the
    /// move's mark as `last_mark`, and `active` if the game was `new`.
    /// The given state is not modified.
    #[instrument(skip(state), fields(cell = %mov.cell, mark = %mov.mark))]
    pub fn proposal(state: &GameState, mov: &Move) -> Result<StatePatch, InvalidMove> {
        Self::pre(state, mov).inspect_err(|reason| {
            warn!(%reason, "Move rejected locally");
        })?;

        let mut coordinates = state.coordinates().clone();
        coordinates.set(&mov.cell, mov.mark);

        let status = match state.status() {
            GameStatus::New => GameStatus::Active,
            other => other,
        };

        Ok(StatePatch {
            coordinates: Some(coordinates),
            last_mark: Some(mov.mark),
            status: Some(status),
        })
    }
}

impl Contract<GameState, Move> for MoveContract {
    fn pre(state: &GameState, action: &Move) -> Result<(), InvalidMove> {
        LegalMove::check(action, state)
    }

    fn post(before: &GameState, after: &GameState) -> Result<(), Vec<InvariantViolation>> {
        TransitionInvariants::check_all(before, after)
    }
}
