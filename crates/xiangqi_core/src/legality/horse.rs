//! Horse legality.

use crate::board::Board;
use crate::position::Position;
use crate::rules::{RuleConfig, RuleKey};
use crate::types::Side;

/// The eight L-jumps paired with their blocking leg offsets.
const JUMPS: [((i8, i8), (i8, i8)); 8] = [
    ((1, 2), (0, 1)),
    ((2, 1), (1, 0)),
    ((2, -1), (1, 0)),
    ((1, -2), (0, -1)),
    ((-1, -2), (0, -1)),
    ((-2, -1), (-1, 0)),
    ((-2, 1), (-1, 0)),
    ((-1, 2), (0, 1)),
];

pub(super) fn is_legal(
    board: &Board,
    rules: &RuleConfig,
    _side: Side,
    from: Position,
    to: Position,
    _capturing: bool,
) -> bool {
    let wrap = rules.enabled(RuleKey::HorseWrap);

    for ((dr, dc), (lr, lc)) in JUMPS {
        let (target, leg) = if wrap {
            (from.offset_wrapping(dr, dc), from.offset_wrapping(lr, lc))
        } else {
            (from.offset(dr, dc), from.offset(lr, lc))
        };
        if target != Some(to) {
            continue;
        }
        if let Some(leg) = leg {
            if rules.enabled(RuleKey::HorseUnblockLeg) || !board.occupied(leg) {
                return true;
            }
        }
    }
    false
}
