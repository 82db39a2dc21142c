//! Draw detection logic for tic-tac-toe.

use super::super::{Board, Mark};
use super::win::check_winner;
use tracing::instrument;

/// Checks for a draw: a full board on which neither mark holds a line.
#[instrument(skip(board))]
pub fn is_draw(board: &Board) -> bool {
    board.is_full()
        && check_winner(board, Mark::X).is_none()
        && check_winner(board, Mark::O).is_none()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::tictactoe::CellId;

    fn fill(layout: [(&str, Mark); 9]) -> Board {
        let mut board = Board::new();
        for (cell, mark) in layout {
            board.set(&CellId::from(cell), mark);
        }
        board
    }

    #[test]
    fn test_empty_board_not_draw() {
        assert!(!is_draw(&Board::new()));
    }

    #[test]
    fn test_full_board_without_line_is_draw() {
        // X O X
        // X O O
        // O X X
        let board = fill([
            ("a0", Mark::X),
            ("b0", Mark::O),
            ("c0", Mark::X),
            ("a1", Mark::X),
            ("b1", Mark::O),
            ("c1", Mark::O),
            ("a2", Mark::O),
            ("b2", Mark::X),
            ("c2", Mark::X),
        ]);
        assert!(is_draw(&board));
    }

    #[test]
    fn test_full_board_with_line_is_not_draw() {
        let board = fill([
            ("a0", Mark::X),
            ("b0", Mark::X),
            ("c0", Mark::X),
            ("a1", Mark::O),
            ("b1", Mark::O),
            ("c1", Mark::X),
            ("a2", Mark::O),
            ("b2", Mark::X),
            ("c2", Mark::O),
        ]);
        assert!(!is_draw(&board));
    }
}
