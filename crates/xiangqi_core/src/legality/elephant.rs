//! Elephant legality.

use crate::board::Board;
use crate::position::Position;
use crate::rules::{RuleConfig, RuleKey};
use crate::types::Side;

const JUMPS: [(i8, i8); 4] = [(2, 2), (2, -2), (-2, 2), (-2, -2)];

pub(super) fn is_legal(
    board: &Board,
    rules: &RuleConfig,
    side: Side,
    from: Position,
    to: Position,
    _capturing: bool,
) -> bool {
    if !rules.enabled(RuleKey::ElephantCrossRiver) && !to.own_half(side) {
        return false;
    }
    let wrap = rules.enabled(RuleKey::ElephantWrap);

    for (dr, dc) in JUMPS {
        let (target, eye) = if wrap {
            (
                from.offset_wrapping(dr, dc),
                from.offset_wrapping(dr / 2, dc / 2),
            )
        } else {
            (from.offset(dr, dc), from.offset(dr / 2, dc / 2))
        };
        if target != Some(to) {
            continue;
        }
        if let Some(eye) = eye {
            if rules.enabled(RuleKey::ElephantUnblockEye) || !board.occupied(eye) {
                return true;
            }
        }
    }
    false
}
