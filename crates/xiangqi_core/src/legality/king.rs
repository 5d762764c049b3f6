//! King legality.

use super::paths;
use crate::board::Board;
use crate::position::Position;
use crate::rules::{RuleConfig, RuleKey};
use crate::types::{PieceKind, Side};

pub(super) fn is_legal(
    board: &Board,
    rules: &RuleConfig,
    side: Side,
    from: Position,
    to: Position,
    _capturing: bool,
) -> bool {
    // Flying general: direct king-vs-king capture across a clear rank
    // or file, the rank path optionally wrapping.
    if rules.enabled(RuleKey::FlyingGeneral) {
        if let Some(target) = board.piece_at(to) {
            if target.side != side
                && target.kind == PieceKind::King
                && flying_path_clear(board, rules, from, to)
            {
                return true;
            }
        }
    }

    let dr = to.row - from.row;
    let dc = to.col - from.col;
    let step_ok = if rules.enabled(RuleKey::InternationalKing) {
        dr.abs() <= 1 && dc.abs() <= 1
    } else {
        dr.abs() + dc.abs() == 1
    };
    if !step_ok {
        return false;
    }

    let confined =
        !rules.enabled(RuleKey::KingCrossRiver) && !rules.enabled(RuleKey::NoRiverLimit);
    if confined && !to.in_palace(side) {
        return false;
    }

    if !rules.enabled(RuleKey::KingFaceToFace) && moves_into_facing(board, side, from, to) {
        return false;
    }
    true
}

fn flying_path_clear(board: &Board, rules: &RuleConfig, from: Position, to: Position) -> bool {
    if from.col == to.col {
        paths::vertical_obstacles(board, from.col, from.row, to.row) == 0
    } else if from.row == to.row {
        paths::rank_path_satisfies(
            board,
            from.row,
            from.col,
            to.col,
            0,
            rules.enabled(RuleKey::LeftRightConnected),
        )
    } else {
        false
    }
}

/// Whether stepping to `to` would leave the king facing the enemy king
/// on an otherwise open file.
fn moves_into_facing(board: &Board, side: Side, from: Position, to: Position) -> bool {
    let Some(enemy_king) = board.king(side.opponent()) else {
        return false;
    };
    if to.col != enemy_king.col || to == enemy_king {
        return false;
    }
    let mut obstacles = paths::vertical_obstacles(board, to.col, to.row, enemy_king.row);
    // The king vacates its source cell.
    if from.col == to.col {
        let (lo, hi) = if to.row < enemy_king.row {
            (to.row, enemy_king.row)
        } else {
            (enemy_king.row, to.row)
        };
        if from.row > lo && from.row < hi {
            obstacles -= 1;
        }
    }
    obstacles == 0
}
