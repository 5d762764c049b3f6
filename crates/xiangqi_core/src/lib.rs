//! Pure xiangqi game logic with configurable rule variants.
//!
//! The crate is the rules core of a variant-friendly Chinese chess
//! game: no rendering, dialogs, or network transport live here.
//!
//! # Architecture
//!
//! - **Board**: a 10x9 grid whose cells hold ordered piece stacks
//! - **Rules**: ~25 toggleable variants validated against a static
//!   dependency/conflict registry, with asynchronous change events
//! - **Legality**: one pure predicate per piece archetype, variant
//!   toggles included, with wraparound-topology path analysis
//! - **Check**: check/checkmate via exhaustive simulate-and-revert
//!   search on the live board
//! - **Engine**: turn order, move execution and undo, history,
//!   replay reconstruction, and the wire snapshot
//!
//! # Example
//!
//! ```
//! use xiangqi_core::{GameEngine, GameState, MoveRequest, Position};
//!
//! let mut engine = GameEngine::new();
//! // Central cannon: (7,1) -> (7,4).
//! let mv = engine
//!     .make_move(MoveRequest::new(Position::new(7, 1), Position::new(7, 4)))
//!     .expect("opening move is legal");
//! assert_eq!(mv.to, Position::new(7, 4));
//! assert_eq!(engine.state(), GameState::Running);
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod action;
mod board;
pub mod check;
mod engine;
pub mod legality;
mod position;
mod rules;
mod snapshot;
mod types;

pub use action::{Move, MoveError, MoveRequest, RuleChangeRecord};
pub use board::Board;
pub use engine::{GameEngine, GameListener};
pub use position::{Position, BOARD_COLS, BOARD_ROWS};
pub use rules::{
    RuleChange, RuleConfig, RuleError, RuleKey, RuleListener, RuleSnapshot, RuleSource, RuleSpec,
    RuleValue,
};
pub use snapshot::{
    BoardState, GameInfo, GameSnapshot, ImportError, MoveEntry, PieceEntry, RuleChangeEntry,
    Settings,
};
pub use types::{GameState, Piece, PieceKind, Side};
