//! Core domain types: sides, piece archetypes, pieces, game states.

use crate::position::Position;
use serde::{Deserialize, Serialize};

/// One of the two players.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    /// Red moves first and starts on rows 5-9.
    Red,
    /// Black starts on rows 0-4.
    Black,
}

impl Side {
    /// Returns the opposing side.
    pub fn opponent(self) -> Self {
        match self {
            Side::Red => Side::Black,
            Side::Black => Side::Red,
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Red => write!(f, "red"),
            Side::Black => write!(f, "black"),
        }
    }
}

/// The seven piece archetypes.
///
/// A closed enum so that legality dispatch stays exhaustive at
/// compile time.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumIter,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PieceKind {
    /// The general; losing it loses the game.
    King,
    /// Palace guard moving one diagonal step.
    Advisor,
    /// Two-point diagonal jumper confined to its own half.
    Elephant,
    /// L-jumper blocked at the adjacent leg point.
    Horse,
    /// Straight slider.
    Chariot,
    /// Slider that captures over exactly one screen.
    Cannon,
    /// Forward stepper, gaining sideways moves across the river.
    Soldier,
}

/// A piece on (or captured off) the board.
///
/// `pos` is [`Position::OFF_BOARD`] once the piece has been captured or
/// removed. Move records hold copies of pieces, never live aliases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Piece {
    /// The archetype.
    pub kind: PieceKind,
    /// The owning side.
    pub side: Side,
    /// Current location, or the off-board sentinel.
    pub pos: Position,
}

impl Piece {
    /// Creates a piece at the given position.
    pub fn new(kind: PieceKind, side: Side, pos: Position) -> Self {
        Self { kind, side, pos }
    }

    /// Returns the same piece owned by the opposing side.
    ///
    /// Used by the capture-conversion variant, where a captured piece
    /// changes allegiance in place.
    pub fn converted(self) -> Self {
        Self {
            side: self.side.opponent(),
            ..self
        }
    }
}

impl std::fmt::Display for Piece {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.side, self.kind)
    }
}

/// Derived state of a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameState {
    /// The game is in progress.
    Running,
    /// Red has been checkmated or lost its king; Black wins.
    RedCheckmate,
    /// Black has been checkmated or lost its king; Red wins.
    BlackCheckmate,
    /// Reserved. No rule currently produces a draw.
    Draw,
}

impl GameState {
    /// The terminal state for the given losing side.
    pub fn checkmate_of(side: Side) -> Self {
        match side {
            Side::Red => GameState::RedCheckmate,
            Side::Black => GameState::BlackCheckmate,
        }
    }

    /// Whether the game has ended.
    pub fn is_over(self) -> bool {
        self != GameState::Running
    }
}

impl std::fmt::Display for GameState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GameState::Running => write!(f, "running"),
            GameState::RedCheckmate => write!(f, "red checkmated"),
            GameState::BlackCheckmate => write!(f, "black checkmated"),
            GameState::Draw => write!(f, "draw"),
        }
    }
}
