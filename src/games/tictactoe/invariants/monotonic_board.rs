//! Monotonic board invariant: cells never change once marked.

use super::super::GameState;
use super::Invariant;

/// Invariant: Cells only transition from empty to marked.
///
/// Every cell marked before holds the same mark after. A snapshot may
/// list more or fewer unmarked cells than its predecessor.
pub struct MonotonicBoardInvariant;

impl Invariant<GameState> for MonotonicBoardInvariant {
    fn holds(before: &GameState, after: &GameState) -> bool {
        before
            .coordinates()
            .cells()
            .all(|(cell, mark)| mark.is_none() || after.coordinates().mark_at(cell) == mark)
    }

    fn description() -> &'static str {
        "Cells only transition from empty to marked"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::tictactoe::{Board, CellId, Mark, StatePatch};

    fn with_board(state: &GameState, board: Board) -> GameState {
        state.merged(&StatePatch {
            coordinates: Some(board),
            ..Default::default()
        })
    }

    #[test]
    fn test_marking_empty_cell_holds() {
        let before = GameState::new();
        let mut board = before.coordinates().clone();
        board.set(&CellId::from("a1"), Mark::X);
        let after = with_board(&before, board);
        assert!(MonotonicBoardInvariant::holds(&before, &after));
    }

    #[test]
    fn test_overwriting_mark_violates() {
        let start = GameState::new();
        let mut board = start.coordinates().clone();
        board.set(&CellId::from("a1"), Mark::X);
        let before = with_board(&start, board.clone());

        board.set(&CellId::from("a1"), Mark::O);
        let after = with_board(&before, board);
        assert!(!MonotonicBoardInvariant::holds(&before, &after));
    }

    #[test]
    fn test_clearing_mark_violates() {
        let start = GameState::new();
        let mut board = start.coordinates().clone();
        board.set(&CellId::from("c0"), Mark::O);
        let before = with_board(&start, board);
        assert!(!MonotonicBoardInvariant::holds(&before, &start));
    }

    #[test]
    fn test_sparse_snapshot_holds() {
        let before = GameState::new();
        let mut board = Board::with_cells(Vec::new());
        board.set(&CellId::from("a1"), Mark::X);
        let after = with_board(&before, board);
        assert!(MonotonicBoardInvariant::holds(&before, &after));
    }

    #[test]
    fn test_dropping_marked_cell_violates() {
        let start = GameState::new();
        let mut board = start.coordinates().clone();
        board.set(&CellId::from("b1"), Mark::X);
        let before = with_board(&start, board);

        let after = with_board(&before, Board::with_cells(vec![CellId::from("a0")]));
        assert!(!MonotonicBoardInvariant::holds(&before, &after));
    }
}
