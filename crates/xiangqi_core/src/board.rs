//! The board: a 10x9 grid of ordered piece stacks.
//!
//! Each occupied cell maps to a bottom-to-top stack of pieces. The
//! "active" piece of a cell, the one displayed, moved, and attacked,
//! is always the last element. Stacks taller than one only arise when
//! the stacking variant is enabled. Every mutator keeps the per-side
//! index lists and the cached king positions consistent with the cell
//! contents; an emptied cell removes its map entry.

use crate::position::Position;
use crate::types::{Piece, PieceKind, Side};
use std::collections::HashMap;

/// Board storage and piece indexes.
#[derive(Debug, Clone)]
pub struct Board {
    cells: HashMap<Position, Vec<Piece>>,
    red_index: Vec<Position>,
    black_index: Vec<Position>,
    red_king: Option<Position>,
    black_king: Option<Position>,
}

impl Board {
    /// Creates an empty board.
    pub fn new() -> Self {
        Self {
            cells: HashMap::new(),
            red_index: Vec::new(),
            black_index: Vec::new(),
            red_king: None,
            black_king: None,
        }
    }

    /// Creates a board with the standard opening layout.
    pub fn standard() -> Self {
        use PieceKind::*;
        let back_rank = [
            Chariot, Horse, Elephant, Advisor, King, Advisor, Elephant, Horse, Chariot,
        ];

        let mut board = Board::new();
        for (col, kind) in back_rank.into_iter().enumerate() {
            let col = col as i8;
            board.push(Position::new(0, col), Piece::new(kind, Side::Black, Position::OFF_BOARD));
            board.push(Position::new(9, col), Piece::new(kind, Side::Red, Position::OFF_BOARD));
        }
        for col in [1, 7] {
            board.push(
                Position::new(2, col),
                Piece::new(Cannon, Side::Black, Position::OFF_BOARD),
            );
            board.push(
                Position::new(7, col),
                Piece::new(Cannon, Side::Red, Position::OFF_BOARD),
            );
        }
        for col in [0, 2, 4, 6, 8] {
            board.push(
                Position::new(3, col),
                Piece::new(Soldier, Side::Black, Position::OFF_BOARD),
            );
            board.push(
                Position::new(6, col),
                Piece::new(Soldier, Side::Red, Position::OFF_BOARD),
            );
        }
        board
    }

    /// The active (top-of-stack) piece at a cell.
    pub fn piece_at(&self, pos: Position) -> Option<&Piece> {
        self.cells.get(&pos).and_then(|stack| stack.last())
    }

    /// The full stack at a cell, bottom to top. Empty if unoccupied.
    pub fn stack_at(&self, pos: Position) -> &[Piece] {
        self.cells.get(&pos).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of pieces stacked at a cell.
    pub fn stack_len(&self, pos: Position) -> usize {
        self.stack_at(pos).len()
    }

    /// Whether any piece occupies the cell.
    pub fn occupied(&self, pos: Position) -> bool {
        self.cells.contains_key(&pos)
    }

    /// Pushes a piece onto the top of a cell's stack.
    pub fn push(&mut self, pos: Position, mut piece: Piece) {
        piece.pos = pos;
        self.cells.entry(pos).or_default().push(piece);
        self.index_mut(piece.side).push(pos);
        if piece.kind == PieceKind::King {
            *self.king_mut(piece.side) = Some(pos);
        }
    }

    /// Pops the active piece off a cell's stack.
    ///
    /// The returned piece carries the off-board sentinel position.
    pub fn pop_top(&mut self, pos: Position) -> Option<Piece> {
        let stack = self.cells.get_mut(&pos)?;
        let mut piece = stack.pop()?;
        if stack.is_empty() {
            self.cells.remove(&pos);
        }
        self.unindex(piece.side, pos);
        if piece.kind == PieceKind::King {
            *self.king_mut(piece.side) = None;
        }
        piece.pos = Position::OFF_BOARD;
        Some(piece)
    }

    /// Extracts the stack element at `index`, preserving the relative
    /// order of the pieces above it.
    ///
    /// The returned piece carries the off-board sentinel position.
    pub fn remove_at(&mut self, pos: Position, index: usize) -> Option<Piece> {
        let stack = self.cells.get_mut(&pos)?;
        if index >= stack.len() {
            return None;
        }
        let mut piece = stack.remove(index);
        if stack.is_empty() {
            self.cells.remove(&pos);
        }
        self.unindex(piece.side, pos);
        if piece.kind == PieceKind::King {
            *self.king_mut(piece.side) = None;
        }
        piece.pos = Position::OFF_BOARD;
        Some(piece)
    }

    /// Inserts a piece at `index` within a cell's stack, shifting the
    /// pieces at and above that index up by one. Inverse of
    /// [`Board::remove_at`]; used by undo.
    pub fn insert_at(&mut self, pos: Position, index: usize, mut piece: Piece) {
        piece.pos = pos;
        let stack = self.cells.entry(pos).or_default();
        let index = index.min(stack.len());
        stack.insert(index, piece);
        self.index_mut(piece.side).push(pos);
        if piece.kind == PieceKind::King {
            *self.king_mut(piece.side) = Some(pos);
        }
    }

    /// Removes every piece and resets the indexes.
    pub fn clear(&mut self) {
        self.cells.clear();
        self.red_index.clear();
        self.black_index.clear();
        self.red_king = None;
        self.black_king = None;
    }

    /// Full independent snapshot, used for replay bookmarks.
    pub fn deep_copy(&self) -> Board {
        self.clone()
    }

    /// Copies of every piece belonging to `side`, buried stack
    /// elements included.
    pub fn pieces(&self, side: Side) -> Vec<Piece> {
        let mut seen: Vec<Position> = Vec::new();
        let mut out = Vec::new();
        for &pos in self.index(side) {
            if seen.contains(&pos) {
                continue;
            }
            seen.push(pos);
            out.extend(self.stack_at(pos).iter().filter(|p| p.side == side));
        }
        out
    }

    /// Cells whose active piece belongs to `side`.
    pub fn active_cells(&self, side: Side) -> Vec<Position> {
        self.cells
            .iter()
            .filter(|(_, stack)| stack.last().map(|p| p.side) == Some(side))
            .map(|(&pos, _)| pos)
            .collect()
    }

    /// Cached location of the side's king, if it is on the board.
    pub fn king(&self, side: Side) -> Option<Position> {
        match side {
            Side::Red => self.red_king,
            Side::Black => self.black_king,
        }
    }

    /// Number of live pieces for `side` according to the index list.
    pub fn piece_count(&self, side: Side) -> usize {
        self.index(side).len()
    }

    fn index(&self, side: Side) -> &Vec<Position> {
        match side {
            Side::Red => &self.red_index,
            Side::Black => &self.black_index,
        }
    }

    fn index_mut(&mut self, side: Side) -> &mut Vec<Position> {
        match side {
            Side::Red => &mut self.red_index,
            Side::Black => &mut self.black_index,
        }
    }

    fn king_mut(&mut self, side: Side) -> &mut Option<Position> {
        match side {
            Side::Red => &mut self.red_king,
            Side::Black => &mut self.black_king,
        }
    }

    fn unindex(&mut self, side: Side, pos: Position) {
        let index = self.index_mut(side);
        if let Some(slot) = index.iter().position(|&p| p == pos) {
            index.swap_remove(slot);
        }
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}
