//! Path-obstacle analysis for sliding pieces.
//!
//! Under the left-right connected topology every horizontal move has
//! two candidate paths along its rank: the direct one and the
//! complementary wrap path around the side boundary. Both are reduced
//! to an obstacle count; the archetype decides which count (0 for a
//! slide, exactly 1 for a cannon screen) makes the move legal.

use crate::board::Board;
use crate::position::{Position, BOARD_COLS};

/// Occupied cells strictly between two rows on one file.
pub fn vertical_obstacles(board: &Board, col: i8, r1: i8, r2: i8) -> usize {
    let (lo, hi) = if r1 < r2 { (r1, r2) } else { (r2, r1) };
    ((lo + 1)..hi)
        .filter(|&row| board.occupied(Position::new(row, col)))
        .count()
}

/// Occupied cells strictly between two columns on one rank, along the
/// direct (non-wrapping) path.
pub fn direct_obstacles(board: &Board, row: i8, c1: i8, c2: i8) -> usize {
    let (lo, hi) = if c1 < c2 { (c1, c2) } else { (c2, c1) };
    ((lo + 1)..hi)
        .filter(|&col| board.occupied(Position::new(row, col)))
        .count()
}

/// Occupied cells on the wrap path between two columns on one rank:
/// the complementary set of cells on that rank, both endpoints
/// excluded.
pub fn wrap_obstacles(board: &Board, row: i8, c1: i8, c2: i8) -> usize {
    let total = (0..BOARD_COLS)
        .filter(|&col| board.occupied(Position::new(row, col)))
        .count();
    let endpoints = [c1, c2]
        .iter()
        .filter(|&&col| board.occupied(Position::new(row, col)))
        .count();
    total - endpoints - direct_obstacles(board, row, c1, c2)
}

/// Whether either rank path satisfies the required obstacle count.
///
/// The wrap path is only considered when `wrap` is enabled.
pub fn rank_path_satisfies(
    board: &Board,
    row: i8,
    c1: i8,
    c2: i8,
    required: usize,
    wrap: bool,
) -> bool {
    direct_obstacles(board, row, c1, c2) == required
        || (wrap && wrap_obstacles(board, row, c1, c2) == required)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Piece, PieceKind, Side};

    fn board_with(cols: &[i8]) -> Board {
        let mut board = Board::new();
        for &col in cols {
            board.push(
                Position::new(5, col),
                Piece::new(PieceKind::Soldier, Side::Red, Position::OFF_BOARD),
            );
        }
        board
    }

    #[test]
    fn test_direct_count_is_strictly_between() {
        let board = board_with(&[0, 3, 8]);
        assert_eq!(direct_obstacles(&board, 5, 0, 8), 1);
        assert_eq!(direct_obstacles(&board, 5, 0, 3), 0);
        assert_eq!(direct_obstacles(&board, 5, 3, 0), 0);
    }

    #[test]
    fn test_wrap_count_is_complement() {
        // Occupants at both endpoints only: both paths clear.
        let board = board_with(&[0, 8]);
        assert_eq!(direct_obstacles(&board, 5, 0, 8), 0);
        assert_eq!(wrap_obstacles(&board, 5, 0, 8), 0);

        // A screen outside the direct span lands on the wrap path.
        let board = board_with(&[2, 5, 8]);
        assert_eq!(direct_obstacles(&board, 5, 2, 5), 0);
        assert_eq!(wrap_obstacles(&board, 5, 2, 5), 1);
    }

    #[test]
    fn test_vertical_count() {
        let mut board = Board::new();
        board.push(
            Position::new(4, 4),
            Piece::new(PieceKind::Soldier, Side::Red, Position::OFF_BOARD),
        );
        assert_eq!(vertical_obstacles(&board, 4, 0, 9), 1);
        assert_eq!(vertical_obstacles(&board, 4, 4, 9), 0);
    }
}
