//! Win detection logic for tic-tac-toe.

use super::super::{Board, CellId, Mark};
use tracing::instrument;

/// The eight lines of the standard grid.
pub const WINNING_COMBINATIONS: [[&str; 3]; 8] = [
    // Columns
    ["a0", "a1", "a2"],
    ["b0", "b1", "b2"],
    ["c0", "c1", "c2"],
    // Rows
    ["a0", "b0", "c0"],
    ["a1", "b1", "c1"],
    ["a2", "b2", "c2"],
    // Diagonals
    ["a0", "b1", "c2"],
    ["a2", "b1", "c0"],
];

/// Checks whether `mark` holds a complete line.
///
/// Returns the cells of the first complete line found.
#[instrument(skip(board))]
pub fn check_winner(board: &Board, mark: Mark) -> Option<Vec<CellId>> {
    WINNING_COMBINATIONS
        .into_iter()
        .map(|line| line.map(CellId::from))
        .find(|line| line.iter().all(|cell| board.get(cell) == Some(Some(mark))))
        .map(Vec::from)
}
