//! Board coordinates and geometry helpers.
//!
//! The board is 10 rows by 9 columns. Black occupies rows 0-4 (top),
//! Red occupies rows 5-9 (bottom); the river runs between rows 4 and 5.
//! Each side's palace is the 3x3 region spanning columns 3-5.

use crate::types::Side;
use serde::{Deserialize, Serialize};

/// Number of rows on the board.
pub const BOARD_ROWS: i8 = 10;

/// Number of columns on the board.
pub const BOARD_COLS: i8 = 9;

/// An intersection on the board.
///
/// Signed coordinates so that offset arithmetic and the off-board
/// sentinel for captured pieces need no special casing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    /// Row, 0 at the black back rank.
    pub row: i8,
    /// Column, 0 at the left file.
    pub col: i8,
}

impl Position {
    /// Sentinel for a piece that is no longer on the board.
    pub const OFF_BOARD: Position = Position { row: -1, col: -1 };

    /// Creates a position.
    pub fn new(row: i8, col: i8) -> Self {
        Self { row, col }
    }

    /// Whether this position lies on the board.
    pub fn on_board(self) -> bool {
        (0..BOARD_ROWS).contains(&self.row) && (0..BOARD_COLS).contains(&self.col)
    }

    /// The position shifted by (d_row, d_col), or `None` off the edge.
    pub fn offset(self, d_row: i8, d_col: i8) -> Option<Position> {
        let next = Position::new(self.row + d_row, self.col + d_col);
        next.on_board().then_some(next)
    }

    /// The position shifted by (d_row, d_col) with cyclic columns.
    ///
    /// Rows never wrap; only the left and right edges are adjacent
    /// under the left-right connected topology.
    pub fn offset_wrapping(self, d_row: i8, d_col: i8) -> Option<Position> {
        let row = self.row + d_row;
        if !(0..BOARD_ROWS).contains(&row) {
            return None;
        }
        let col = (self.col + d_col).rem_euclid(BOARD_COLS);
        Some(Position::new(row, col))
    }

    /// Whether this position is inside the given side's palace.
    pub fn in_palace(self, side: Side) -> bool {
        let rows = match side {
            Side::Red => 7..=9,
            Side::Black => 0..=2,
        };
        rows.contains(&self.row) && (3..=5).contains(&self.col)
    }

    /// Whether this position is on the given side's own half.
    pub fn own_half(self, side: Side) -> bool {
        match side {
            Side::Red => self.row >= 5,
            Side::Black => self.row <= 4,
        }
    }

    /// Whether a piece of the given side standing here has crossed the river.
    pub fn crossed_river(self, side: Side) -> bool {
        !self.own_half(side)
    }

    /// The forward row direction for the given side.
    pub fn forward(side: Side) -> i8 {
        match side {
            Side::Red => -1,
            Side::Black => 1,
        }
    }

    /// The enemy back rank where a soldier of this side may promote.
    pub fn promotion_row(side: Side) -> i8 {
        match side {
            Side::Red => 0,
            Side::Black => BOARD_ROWS - 1,
        }
    }

    /// Iterates every on-board position in row-major order.
    pub fn all() -> impl Iterator<Item = Position> {
        (0..BOARD_ROWS).flat_map(|row| (0..BOARD_COLS).map(move |col| Position::new(row, col)))
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_on_board_bounds() {
        assert!(Position::new(0, 0).on_board());
        assert!(Position::new(9, 8).on_board());
        assert!(!Position::new(10, 0).on_board());
        assert!(!Position::new(0, 9).on_board());
        assert!(!Position::OFF_BOARD.on_board());
    }

    #[test]
    fn test_palace_membership() {
        assert!(Position::new(9, 4).in_palace(Side::Red));
        assert!(Position::new(7, 3).in_palace(Side::Red));
        assert!(!Position::new(6, 4).in_palace(Side::Red));
        assert!(Position::new(0, 4).in_palace(Side::Black));
        assert!(!Position::new(0, 4).in_palace(Side::Red));
    }

    #[test]
    fn test_river_crossing() {
        assert!(!Position::new(5, 0).crossed_river(Side::Red));
        assert!(Position::new(4, 0).crossed_river(Side::Red));
        assert!(Position::new(5, 0).crossed_river(Side::Black));
        assert!(!Position::new(4, 0).crossed_river(Side::Black));
    }

    #[test]
    fn test_wrapping_offset() {
        let left_edge = Position::new(5, 0);
        assert_eq!(left_edge.offset(0, -1), None);
        assert_eq!(
            left_edge.offset_wrapping(0, -1),
            Some(Position::new(5, 8))
        );
        assert_eq!(
            Position::new(5, 8).offset_wrapping(1, 2),
            Some(Position::new(6, 1))
        );
        assert_eq!(Position::new(0, 4).offset_wrapping(-1, 0), None);
    }

    #[test]
    fn test_all_covers_board() {
        assert_eq!(Position::all().count(), 90);
    }
}
