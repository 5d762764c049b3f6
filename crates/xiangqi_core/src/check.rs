//! Check and checkmate detection.
//!
//! Both are derived from the board and the legality engine. Checkmate
//! search simulates candidate moves destructively on the live board
//! and reverts them exactly, captured piece included, before moving
//! on; no copy-on-write board exists here, so the revert runs even
//! when the search is about to short-circuit.

use crate::board::Board;
use crate::legality;
use crate::position::Position;
use crate::rules::RuleConfig;
use crate::types::Side;
use tracing::trace;

/// Cells holding a piece of `attacker` with a legal move onto
/// `target`. Buried stack elements count when the selection rule
/// makes their moves legal.
pub fn attackers_of(
    board: &Board,
    rules: &RuleConfig,
    attacker: Side,
    target: Position,
) -> Vec<Position> {
    board
        .active_cells(attacker)
        .into_iter()
        .filter(|&from| {
            let stack = board.stack_at(from);
            let top = stack.len() - 1;
            stack.iter().enumerate().any(|(index, piece)| {
                piece.side == attacker
                    && legality::is_valid_move(
                        board,
                        rules,
                        from,
                        target,
                        (index != top).then_some(index),
                    )
            })
        })
        .collect()
}

/// Whether the side's king cell is attacked by any enemy piece.
///
/// A side with no king on the board is not in check; the engine
/// treats the captured-king case separately.
pub fn is_in_check(board: &Board, rules: &RuleConfig, side: Side) -> bool {
    let Some(king) = board.king(side) else {
        return false;
    };
    !attackers_of(board, rules, side.opponent(), king).is_empty()
}

/// Whether the side is in check with no move that resolves it.
///
/// Every owned stack element is tried against every cell the legality
/// engine accepts. Each candidate is applied to the live board,
/// check is re-evaluated, and the exact prior state is restored.
pub fn is_checkmate(board: &mut Board, rules: &RuleConfig, side: Side) -> bool {
    if !is_in_check(board, rules, side) {
        return false;
    }
    for from in board.active_cells(side) {
        let indexes: Vec<usize> = board
            .stack_at(from)
            .iter()
            .enumerate()
            .filter(|(_, p)| p.side == side)
            .map(|(i, _)| i)
            .collect();
        for index in indexes {
            let top = board.stack_len(from) - 1;
            let stack_index = (index != top).then_some(index);
            for to in Position::all() {
                if !legality::is_valid_move(board, rules, from, to, stack_index) {
                    continue;
                }
                if escapes_check(board, rules, side, from, index, to) {
                    trace!(%from, %to, "escape found");
                    return false;
                }
            }
        }
    }
    true
}

/// Simulates moving the stack element at `index` from `from` to `to`,
/// reports whether the side is out of check afterward, and restores
/// the prior board exactly.
fn escapes_check(
    board: &mut Board,
    rules: &RuleConfig,
    side: Side,
    from: Position,
    index: usize,
    to: Position,
) -> bool {
    let captured = match board.piece_at(to) {
        Some(target) if target.side != side => board.pop_top(to),
        _ => None,
    };
    let mover = board
        .remove_at(from, index)
        .expect("candidate source vetted by legality");
    board.push(to, mover);

    let escaped = !is_in_check(board, rules, side);

    let mover = board.pop_top(to).expect("simulated piece present");
    board.insert_at(from, index, mover);
    if let Some(captured) = captured {
        board.push(to, captured);
    }
    escaped
}
