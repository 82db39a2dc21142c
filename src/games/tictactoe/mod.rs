//! Tic-tac-toe domain: shared state, move legality, and result rules.

pub mod action;
pub mod contracts;
pub mod invariants;
pub mod rules;
mod types;

pub use action::{InvalidMove, Move};
pub use contracts::{Contract, LegalMove, MoveContract};
pub use invariants::{InvariantSet, InvariantViolation, TransitionInvariants};
pub use rules::Outcome;
pub use types::{Board, CellId, Field, GameState, GameStatus, Mark, Role, StatePatch};
