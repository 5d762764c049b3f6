//! Cannon legality.

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
    capturing: bool,
) -> bool {
    // Capturing needs exactly one screen on the chosen path; sliding
    // needs the path clear.
    let required = usize::from(capturing);

    if from.row == to.row {
        paths::rank_path_satisfies(
            board,
            from.row,
            from.col,
            to.col,
            required,
            rules.enabled(RuleKey::CannonWrap),
        )
    } else if from.col == to.col {
        paths::vertical_obstacles(board, from.col, from.row, to.row) == required
    } else {
        false
    }
}
