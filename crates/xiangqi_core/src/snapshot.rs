//! The persisted/wire JSON snapshot.
//!
//! The shape here is what the import/export collaborator reads and
//! writes; the core must round-trip it. Pieces at one cell are listed
//! with ascending `stackIndex` (bottom to top); a missing index means
//! a singleton stack. Import is all-or-nothing: an unknown piece-type
//! or rule name, a bad coordinate, or a missing `boardState` aborts
//! with nothing applied.

use crate::action::{Move, RuleChangeRecord};
use crate::board::Board;
use crate::engine::GameEngine;
use crate::position::{Position, BOARD_COLS, BOARD_ROWS};
use crate::rules::{RuleError, RuleKey, RuleSnapshot, RuleSource, RuleValue};
use crate::types::{GameState, Piece, PieceKind, Side};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;
use tracing::{info, instrument};

/// Top-level snapshot document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSnapshot {
    /// When the snapshot was produced.
    pub export_time: DateTime<Utc>,
    /// Turn and derived state.
    pub game_info: GameInfo,
    /// Current piece placement. Mandatory.
    pub board_state: BoardState,
    /// Executed moves, oldest first.
    #[serde(default)]
    pub move_history: Vec<MoveEntry>,
    /// Accepted rule changes pinned to move indices.
    #[serde(default)]
    pub rule_change_history: Vec<RuleChangeEntry>,
    /// Final rule values.
    #[serde(default)]
    pub settings: Settings,
}

/// Turn and game state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameInfo {
    /// Whether red is to move.
    pub is_red_turn: bool,
    /// Derived game state.
    pub game_state: GameState,
}

/// Piece placement.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardState {
    /// Board height; always 10.
    pub rows: i8,
    /// Board width; always 9.
    pub cols: i8,
    /// All pieces on the board.
    pub pieces: Vec<PieceEntry>,
}

/// One placed piece.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PieceEntry {
    /// Side-qualified type name, e.g. `red_king`.
    #[serde(rename = "type")]
    pub piece_type: String,
    /// Row of the cell.
    pub row: i8,
    /// Column of the cell.
    pub col: i8,
    /// Depth within the cell's stack, bottom at 0. Absent for a
    /// singleton stack.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack_index: Option<usize>,
}

/// One recorded move.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveEntry {
    /// Source row.
    pub from_row: i8,
    /// Source column.
    pub from_col: i8,
    /// Destination row.
    pub to_row: i8,
    /// Destination column.
    pub to_col: i8,
    /// Mover's side-qualified type name at move time.
    pub piece_type: String,
    /// Captured piece's type name, if the move captured.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub captured_piece_type: Option<String>,
    /// Whether the capture converted in place.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub capture_conversion: bool,
    /// The converted piece's type name after flipping sides.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub converted_piece_type: Option<String>,
    /// Stack element that moved; absent or -1 selects the top.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_stack_index: Option<i32>,
    /// Type names of pieces carried from above the selected element.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub moved_stack: Option<Vec<String>>,
    /// Promotion archetype, when the move promoted a soldier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub promotion_type: Option<String>,
}

/// One recorded rule change.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleChangeEntry {
    /// Wire name of the rule.
    pub rule_key: String,
    /// Display name at the time of the change.
    pub display_name: String,
    /// Whether the rule ended up enabled.
    pub enabled: bool,
    /// The count for count-valued rules.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<u8>,
    /// Number of moves executed when the change took effect.
    pub after_move_index: usize,
}

/// Final rule values.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Rule key to value.
    #[serde(default)]
    pub special_rules: BTreeMap<String, RuleValue>,
}

/// Why an import was aborted. Nothing is applied on any of these.
#[derive(Debug, derive_more::Display)]
pub enum ImportError {
    /// The document is not valid JSON of the documented shape.
    #[display("malformed snapshot: {_0}")]
    Parse(serde_json::Error),
    /// The board dimensions do not match a 10x9 grid.
    #[display("unsupported board dimensions {rows}x{cols}")]
    BadDimensions {
        /// Declared rows.
        rows: i8,
        /// Declared columns.
        cols: i8,
    },
    /// A piece-type name is not recognized.
    #[display("unknown piece type {_0:?}")]
    UnknownPieceType(String),
    /// A rule name is not recognized.
    #[display("unknown rule key {_0:?}")]
    UnknownRuleKey(String),
    /// A piece sits outside the board.
    #[display("piece at ({row}, {col}) is off the board")]
    BadCoordinate {
        /// Declared row.
        row: i8,
        /// Declared column.
        col: i8,
    },
    /// The final rule set fails dependency/conflict validation.
    #[display("snapshot rules invalid: {_0}")]
    Rules(RuleError),
}

impl std::error::Error for ImportError {}

impl From<serde_json::Error> for ImportError {
    fn from(err: serde_json::Error) -> Self {
        ImportError::Parse(err)
    }
}

impl From<RuleError> for ImportError {
    fn from(err: RuleError) -> Self {
        ImportError::Rules(err)
    }
}

impl GameSnapshot {
    /// Parses a snapshot document.
    pub fn from_json(json: &str) -> Result<Self, ImportError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serializes the snapshot document.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

fn piece_code(side: Side, kind: PieceKind) -> String {
    format!("{side}_{kind}")
}

fn parse_piece_code(code: &str) -> Result<(Side, PieceKind), ImportError> {
    let unknown = || ImportError::UnknownPieceType(code.to_string());
    let (side, kind) = code.split_once('_').ok_or_else(unknown)?;
    let side = match side {
        "red" => Side::Red,
        "black" => Side::Black,
        _ => return Err(unknown()),
    };
    let kind = PieceKind::from_str(kind).map_err(|_| unknown())?;
    Ok((side, kind))
}

impl GameEngine {
    /// Produces the wire snapshot of the current game.
    #[instrument(skip(self))]
    pub fn export_snapshot(&self) -> GameSnapshot {
        let mut pieces = Vec::new();
        for pos in Position::all() {
            let stack = self.board.stack_at(pos);
            for (index, piece) in stack.iter().enumerate() {
                pieces.push(PieceEntry {
                    piece_type: piece_code(piece.side, piece.kind),
                    row: pos.row,
                    col: pos.col,
                    stack_index: (stack.len() > 1).then_some(index),
                });
            }
        }

        let move_history = self.history.iter().map(move_entry).collect();
        let rule_change_history = self
            .rule_changes
            .iter()
            .map(|record| RuleChangeEntry {
                rule_key: record.key.to_string(),
                display_name: record.display_name.clone(),
                enabled: match record.value {
                    RuleValue::Bool(b) => b,
                    RuleValue::Count(n) => n > 0,
                },
                value: match record.value {
                    RuleValue::Bool(_) => None,
                    RuleValue::Count(n) => Some(n),
                },
                after_move_index: record.after_move_index,
            })
            .collect();
        let special_rules = self
            .rules
            .snapshot()
            .into_iter()
            .map(|(key, value)| (key.to_string(), value))
            .collect();

        GameSnapshot {
            export_time: Utc::now(),
            game_info: GameInfo {
                is_red_turn: self.red_turn,
                game_state: self.state,
            },
            board_state: BoardState {
                rows: BOARD_ROWS,
                cols: BOARD_COLS,
                pieces,
            },
            move_history,
            rule_change_history,
            settings: Settings { special_rules },
        }
    }

    /// Restores a game from a wire snapshot.
    ///
    /// Everything is parsed and validated before the first mutation,
    /// so a failed import leaves the engine untouched. A non-empty
    /// move history is replayed forward from the standard opening
    /// (history is trusted); an empty one places `boardState`
    /// directly.
    #[instrument(skip(self, snapshot))]
    pub fn import_snapshot(&mut self, snapshot: &GameSnapshot) -> Result<(), ImportError> {
        if snapshot.board_state.rows != BOARD_ROWS || snapshot.board_state.cols != BOARD_COLS {
            return Err(ImportError::BadDimensions {
                rows: snapshot.board_state.rows,
                cols: snapshot.board_state.cols,
            });
        }

        // Stage: convert every section up front; nothing mutates yet.
        let placed = placed_pieces(&snapshot.board_state)?;
        let moves = staged_moves(&snapshot.move_history)?;
        let rule_changes = staged_rule_changes(&snapshot.rule_change_history)?;
        let mut final_rules: RuleSnapshot = RuleSnapshot::new();
        for (name, value) in &snapshot.settings.special_rules {
            let key = RuleKey::from_str(name)
                .map_err(|_| ImportError::UnknownRuleKey(name.clone()))?;
            final_rules.insert(key, *value);
        }

        // Rules swap atomically first; a rejection aborts before any
        // board mutation.
        self.rules.apply_snapshot(&final_rules, RuleSource::Api)?;

        if moves.is_empty() {
            self.board.clear();
            for (pos, piece) in placed {
                self.board.push(pos, piece);
            }
            self.bookmark = self.board.deep_copy();
            self.bookmark_red_turn = snapshot.game_info.is_red_turn;
            self.bookmark_rules = final_rules;
            self.history.clear();
        } else {
            self.board = Board::standard();
            self.bookmark = self.board.deep_copy();
            self.bookmark_red_turn = true;
            self.bookmark_rules = RuleKey::default_snapshot();
            self.history.clear();
            for mut mv in moves {
                // The wire shape omits the stacking flag; it falls out
                // of the destination's occupancy at replay time.
                mv.is_stacking = mv.captured.is_none()
                    && mv
                        .converted
                        .is_none()
                    && self
                        .board
                        .piece_at(mv.to)
                        .is_some_and(|t| t.side == mv.piece.side);
                self.replay_move(&mv);
                self.history.push(mv);
            }
        }

        self.rule_changes = rule_changes;
        self.red_turn = snapshot.game_info.is_red_turn;
        self.state = snapshot.game_info.game_state;
        info!(
            moves = self.history.len(),
            state = %self.state,
            "snapshot imported"
        );
        Ok(())
    }
}

fn move_entry(mv: &Move) -> MoveEntry {
    MoveEntry {
        from_row: mv.from.row,
        from_col: mv.from.col,
        to_row: mv.to.row,
        to_col: mv.to.col,
        piece_type: piece_code(mv.piece.side, mv.piece.kind),
        captured_piece_type: mv.captured.map(|p| piece_code(p.side, p.kind)),
        capture_conversion: mv.capture_conversion,
        converted_piece_type: mv.converted.map(|p| piece_code(p.side, p.kind)),
        selected_stack_index: (mv.selected_stack_index >= 0).then_some(mv.selected_stack_index),
        moved_stack: (!mv.moved_stack.is_empty()).then(|| {
            mv.moved_stack
                .iter()
                .map(|p| piece_code(p.side, p.kind))
                .collect()
        }),
        promotion_type: mv.promotion.map(|kind| kind.to_string()),
    }
}

fn placed_pieces(board_state: &BoardState) -> Result<Vec<(Position, Piece)>, ImportError> {
    let mut placed = Vec::with_capacity(board_state.pieces.len());
    for entry in &board_state.pieces {
        let (side, kind) = parse_piece_code(&entry.piece_type)?;
        let pos = Position::new(entry.row, entry.col);
        if !pos.on_board() {
            return Err(ImportError::BadCoordinate {
                row: entry.row,
                col: entry.col,
            });
        }
        placed.push((entry.stack_index.unwrap_or(0), pos, Piece::new(kind, side, pos)));
    }
    // Bottom-to-top within each cell.
    placed.sort_by_key(|&(index, pos, _)| (pos.row, pos.col, index));
    Ok(placed.into_iter().map(|(_, pos, piece)| (pos, piece)).collect())
}

fn staged_moves(entries: &[MoveEntry]) -> Result<Vec<Move>, ImportError> {
    let mut moves = Vec::with_capacity(entries.len());
    for entry in entries {
        let (side, kind) = parse_piece_code(&entry.piece_type)?;
        let from = Position::new(entry.from_row, entry.from_col);
        let to = Position::new(entry.to_row, entry.to_col);
        if !from.on_board() {
            return Err(ImportError::BadCoordinate {
                row: entry.from_row,
                col: entry.from_col,
            });
        }
        if !to.on_board() {
            return Err(ImportError::BadCoordinate {
                row: entry.to_row,
                col: entry.to_col,
            });
        }
        let captured = entry
            .captured_piece_type
            .as_deref()
            .map(parse_piece_code)
            .transpose()?
            .map(|(s, k)| Piece::new(k, s, to));
        let converted = entry
            .converted_piece_type
            .as_deref()
            .map(parse_piece_code)
            .transpose()?
            .map(|(s, k)| Piece::new(k, s, to));
        let moved_stack = entry
            .moved_stack
            .as_deref()
            .unwrap_or(&[])
            .iter()
            .map(|code| parse_piece_code(code).map(|(s, k)| Piece::new(k, s, from)))
            .collect::<Result<Vec<_>, _>>()?;
        let promotion = entry
            .promotion_type
            .as_deref()
            .map(|code| {
                PieceKind::from_str(code)
                    .map_err(|_| ImportError::UnknownPieceType(code.to_string()))
            })
            .transpose()?;

        moves.push(Move {
            from,
            to,
            piece: Piece::new(kind, side, from),
            captured,
            is_stacking: false,
            capture_conversion: entry.capture_conversion,
            converted,
            selected_stack_index: entry.selected_stack_index.unwrap_or(-1),
            moved_stack,
            promotion,
            force: false,
        });
    }
    Ok(moves)
}

fn staged_rule_changes(
    entries: &[RuleChangeEntry],
) -> Result<Vec<RuleChangeRecord>, ImportError> {
    let mut records = Vec::with_capacity(entries.len());
    for entry in entries {
        let key = RuleKey::from_str(&entry.rule_key)
            .map_err(|_| ImportError::UnknownRuleKey(entry.rule_key.clone()))?;
        let value = match entry.value {
            Some(count) => RuleValue::Count(count),
            None => RuleValue::Bool(entry.enabled),
        };
        records.push(RuleChangeRecord {
            key,
            display_name: entry.display_name.clone(),
            value,
            after_move_index: entry.after_move_index,
        });
    }
    Ok(records)
}
