//! Advisor legality.

use super::paths;
use crate::board::Board;
use crate::position::{Position, BOARD_COLS};
use crate::rules::{RuleConfig, RuleKey};
use crate::types::Side;

pub(super) fn is_legal(
    board: &Board,
    rules: &RuleConfig,
    side: Side,
    from: Position,
    to: Position,
    _capturing: bool,
) -> bool {
    // The international advisor slides like a queen with path blocking.
    if rules.enabled(RuleKey::InternationalAdvisor) {
        return sliding_legal(board, rules, from, to);
    }

    let dr = to.row - from.row;
    let dc = to.col - from.col;
    if dr.abs() != 1 || dc.abs() != 1 {
        return false;
    }
    rules.enabled(RuleKey::AdvisorLeavePalace) || to.in_palace(side)
}

fn sliding_legal(board: &Board, rules: &RuleConfig, from: Position, to: Position) -> bool {
    let wrap = rules.enabled(RuleKey::AdvisorWrap);
    if from.row == to.row {
        return paths::rank_path_satisfies(board, from.row, from.col, to.col, 0, wrap);
    }
    if from.col == to.col {
        return paths::vertical_obstacles(board, from.col, from.row, to.row) == 0;
    }
    diagonal_clear(board, from, to, false) || (wrap && diagonal_clear(board, from, to, true))
}

/// Walks a diagonal from `from` toward `to`, requiring every
/// intermediate cell empty. With `wrapping` the column component is
/// cyclic, so a diagonal may run off one side edge and continue from
/// the other.
fn diagonal_clear(board: &Board, from: Position, to: Position, wrapping: bool) -> bool {
    let dr = to.row - from.row;
    let steps = dr.abs();
    if steps == 0 {
        return false;
    }
    let row_step = dr.signum();

    'direction: for col_step in [-1i8, 1] {
        let reaches = if wrapping {
            (from.col + col_step * steps).rem_euclid(BOARD_COLS) == to.col
        } else {
            from.col + col_step * steps == to.col
        };
        if !reaches {
            continue;
        }
        let mut pos = from;
        for _ in 1..steps {
            let next = if wrapping {
                pos.offset_wrapping(row_step, col_step)
            } else {
                pos.offset(row_step, col_step)
            };
            match next {
                Some(next) if !board.occupied(next) => pos = next,
                _ => continue 'direction,
            }
        }
        return true;
    }
    false
}
