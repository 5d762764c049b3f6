//! Soldier legality.

use crate::board::Board;
use crate::position::{Position, BOARD_COLS};
use crate::rules::{RuleConfig, RuleKey};
use crate::types::Side;

pub(super) fn is_legal(
    _board: &Board,
    rules: &RuleConfig,
    side: Side,
    from: Position,
    to: Position,
    _capturing: bool,
) -> bool {
    let forward = Position::forward(side);
    let dr = to.row - from.row;
    let dc = to.col - from.col;
    let crossed = from.crossed_river(side);
    let no_river = rules.enabled(RuleKey::NoRiverLimit);

    if dc == 0 && dr == forward {
        return true;
    }

    let adjacent_col = dc.abs() == 1
        || (rules.enabled(RuleKey::SoldierWrap) && dc.abs() == BOARD_COLS - 1);
    if dr == 0 && adjacent_col {
        return crossed || no_river;
    }

    if dc == 0 && dr == -forward && rules.enabled(RuleKey::PawnCanRetreat) {
        return crossed || no_river || rules.enabled(RuleKey::PawnInsideRetreat);
    }
    false
}
