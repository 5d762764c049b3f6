//! First-class move records and the errors that reject them.
//!
//! Moves are domain events: created once a move executes, appended to
//! the append-only history, inverted on undo, and bulk-replaced during
//! replay or import reconstruction. They hold copies of the pieces
//! involved, never aliases into the live board.

use crate::position::Position;
use crate::rules::{RuleError, RuleKey, RuleValue};
use crate::types::{Piece, PieceKind, Side};
use serde::{Deserialize, Serialize};

/// An executed move with everything needed to invert it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Move {
    /// Source cell.
    pub from: Position,
    /// Destination cell.
    pub to: Position,
    /// The moved piece as it stood before execution.
    pub piece: Piece,
    /// The captured piece as it stood before execution, if any.
    pub captured: Option<Piece>,
    /// The capture became a push onto a friendly stack.
    pub is_stacking: bool,
    /// The captured piece changed side in place; the mover stayed put.
    pub capture_conversion: bool,
    /// The captured piece after conversion, when converting.
    pub converted: Option<Piece>,
    /// Which stack element moved; -1 selects the top.
    pub selected_stack_index: i32,
    /// Pieces that rode along from above the selected element,
    /// bottom to top. Empty unless the carry rule applied.
    pub moved_stack: Vec<Piece>,
    /// Archetype the soldier promoted to, if the move promoted.
    pub promotion: Option<PieceKind>,
    /// The move bypassed legality as an out-of-band override.
    pub force: bool,
}

impl Move {
    /// The stack index the mover occupied at the source, given the
    /// source stack length at execution time.
    pub fn source_index(&self, source_len_before: usize) -> usize {
        if self.selected_stack_index < 0 {
            source_len_before.saturating_sub(1)
        } else {
            self.selected_stack_index as usize
        }
    }
}

impl std::fmt::Display for Move {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} -> {}", self.piece, self.from, self.to)?;
        if self.capture_conversion {
            write!(f, " (converts)")?;
        } else if self.is_stacking {
            write!(f, " (stacks)")?;
        } else if self.captured.is_some() {
            write!(f, " (captures)")?;
        }
        Ok(())
    }
}

/// A move request from a collaborator: local input or a decoded
/// network move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveRequest {
    /// Source cell.
    pub from: Position,
    /// Destination cell.
    pub to: Position,
    /// Explicit stack element to move; `None` selects the top.
    pub stack_index: Option<usize>,
    /// Archetype to promote to when the move reaches the baseline.
    pub promotion: Option<PieceKind>,
}

impl MoveRequest {
    /// A plain top-of-stack move request.
    pub fn new(from: Position, to: Position) -> Self {
        Self {
            from,
            to,
            stack_index: None,
            promotion: None,
        }
    }
}

/// Why a move request was rejected. The engine mutates nothing when
/// returning any of these.
#[derive(Debug, Clone, PartialEq, derive_more::Display)]
pub enum MoveError {
    /// The game has already ended.
    #[display("game is over")]
    GameOver,
    /// A coordinate is off the board.
    #[display("cell {_0} is off the board")]
    OffBoard(Position),
    /// The source cell holds no piece.
    #[display("no piece at {_0}")]
    EmptySource(Position),
    /// The requested stack index does not exist at the source.
    #[display("stack index {index} out of range for stack of {len}")]
    BadStackIndex {
        /// Requested index.
        index: usize,
        /// Stack height at the source.
        len: usize,
    },
    /// The piece belongs to the side not on turn.
    #[display("it is not {_0}'s turn")]
    WrongSide(Side),
    /// The legality engine rejected the move.
    #[display("illegal move {_0} -> {_1}")]
    Illegal(Position, Position),
    /// The requested promotion archetype is not allowed.
    #[display("cannot promote to {_0}")]
    BadPromotion(PieceKind),
    /// Force moves are not enabled.
    #[display("force moves are disabled")]
    ForceDisabled,
    /// There is no move to undo.
    #[display("history is empty")]
    NothingToUndo,
    /// Replay step beyond the recorded history.
    #[display("step {step} beyond history of {len}")]
    BadStep {
        /// Requested step.
        step: usize,
        /// Recorded history length.
        len: usize,
    },
    /// A rule snapshot failed validation during replay.
    #[display("rule snapshot rejected: {_0}")]
    Rules(RuleError),
}

impl std::error::Error for MoveError {}

impl From<RuleError> for MoveError {
    fn from(err: RuleError) -> Self {
        MoveError::Rules(err)
    }
}

/// One accepted rule change, pinned to its place in move history so
/// replay can reproduce rule state at any step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleChangeRecord {
    /// The changed rule.
    pub key: RuleKey,
    /// Display name at the time of the change.
    pub display_name: String,
    /// Value after the change.
    pub value: RuleValue,
    /// Number of moves executed when the change took effect.
    pub after_move_index: usize,
}
