//! Chariot legality.

use super::paths;
use crate::board::Board;
use crate::position::Position;
use crate::rules::{RuleConfig, RuleKey};
use crate::types::Side;

pub(super) fn is_legal(
    board: &Board,
    rules: &RuleConfig,
    _side: Side,
    from: Position,
    to: Position,
    _capturing: bool,
) -> bool {
    if from.row == to.row {
        paths::rank_path_satisfies(
            board,
            from.row,
            from.col,
            to.col,
            0,
            rules.enabled(RuleKey::ChariotWrap),
        )
    } else if from.col == to.col {
        paths::vertical_obstacles(board, from.col, from.row, to.row) == 0
    } else {
        false
    }
}
