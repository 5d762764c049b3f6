//! The move-legality engine.
//!
//! [`is_valid_move`] is a pure predicate over (board, rules) as of the
//! call: uniform preconditions first, then dispatch on the selected
//! piece's archetype to one legality function per variant. The match
//! is exhaustive, so adding an archetype without a rule fails to
//! compile.

mod advisor;
mod cannon;
mod chariot;
mod elephant;
mod horse;
mod king;
mod paths;
mod soldier;

pub use paths::{direct_obstacles, vertical_obstacles, wrap_obstacles};

use crate::board::Board;
use crate::position::Position;
use crate::rules::{RuleConfig, RuleKey};
use crate::types::PieceKind;

/// Decides whether moving the piece selected by `stack_index`
/// (default: top of stack) from `from` to `to` is legal under the
/// current rules.
pub fn is_valid_move(
    board: &Board,
    rules: &RuleConfig,
    from: Position,
    to: Position,
    stack_index: Option<usize>,
) -> bool {
    if !from.on_board() || !to.on_board() || from == to {
        return false;
    }
    let stack = board.stack_at(from);
    if stack.is_empty() {
        return false;
    }
    let top = stack.len() - 1;
    let index = stack_index.unwrap_or(top);
    if index > top {
        return false;
    }
    if index < top && !rules.enabled(RuleKey::StackSelect) {
        return false;
    }
    let piece = stack[index];

    let mut capturing = false;
    if let Some(target) = board.piece_at(to) {
        if target.side == piece.side {
            // Landing on a friendly cell is only a stack push, and
            // only with spare capacity for every piece that travels.
            if !rules.enabled(RuleKey::Stacking) {
                return false;
            }
            let moving = if rules.enabled(RuleKey::StackCarry) && index < top {
                stack.len() - index
            } else {
                1
            };
            let limit = usize::from(rules.count(RuleKey::StackingLimit).max(1));
            if board.stack_len(to) + moving > limit {
                return false;
            }
        } else {
            capturing = true;
        }
    }

    match piece.kind {
        PieceKind::King => king::is_legal(board, rules, piece.side, from, to, capturing),
        PieceKind::Advisor => advisor::is_legal(board, rules, piece.side, from, to, capturing),
        PieceKind::Elephant => elephant::is_legal(board, rules, piece.side, from, to, capturing),
        PieceKind::Horse => horse::is_legal(board, rules, piece.side, from, to, capturing),
        PieceKind::Chariot => chariot::is_legal(board, rules, piece.side, from, to, capturing),
        PieceKind::Cannon => cannon::is_legal(board, rules, piece.side, from, to, capturing),
        PieceKind::Soldier => soldier::is_legal(board, rules, piece.side, from, to, capturing),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{RuleSource, RuleValue};
    use crate::types::{Piece, Side};

    fn place(board: &mut Board, kind: PieceKind, side: Side, row: i8, col: i8) {
        board.push(
            Position::new(row, col),
            Piece::new(kind, side, Position::OFF_BOARD),
        );
    }

    fn enable(rules: &RuleConfig, keys: &[RuleKey]) {
        for &key in keys {
            assert!(
                rules.set(key, RuleValue::Bool(true), RuleSource::Api),
                "could not enable {key}"
            );
        }
    }

    #[test]
    fn test_king_steps_within_palace() {
        let mut board = Board::new();
        let rules = RuleConfig::new();
        place(&mut board, PieceKind::King, Side::Red, 9, 4);

        assert!(is_valid_move(&board, &rules, Position::new(9, 4), Position::new(8, 4), None));
        assert!(is_valid_move(&board, &rules, Position::new(9, 4), Position::new(9, 3), None));
        // Diagonal steps and leaving the palace are out.
        assert!(!is_valid_move(&board, &rules, Position::new(9, 4), Position::new(8, 3), None));
        assert!(!is_valid_move(&board, &rules, Position::new(9, 4), Position::new(9, 6), None));
    }

    #[test]
    fn test_international_king_diagonal_step() {
        let mut board = Board::new();
        let rules = RuleConfig::new();
        place(&mut board, PieceKind::King, Side::Red, 8, 4);
        enable(&rules, &[RuleKey::InternationalKing]);

        assert!(is_valid_move(&board, &rules, Position::new(8, 4), Position::new(7, 3), None));
    }

    #[test]
    fn test_king_cannot_step_into_facing() {
        let mut board = Board::new();
        let rules = RuleConfig::new();
        place(&mut board, PieceKind::King, Side::Red, 9, 3);
        place(&mut board, PieceKind::King, Side::Black, 0, 4);

        // Column 4 is open all the way to the black king.
        assert!(!is_valid_move(&board, &rules, Position::new(9, 3), Position::new(9, 4), None));

        enable(&rules, &[RuleKey::KingFaceToFace]);
        assert!(is_valid_move(&board, &rules, Position::new(9, 3), Position::new(9, 4), None));
    }

    #[test]
    fn test_flying_general_capture() {
        let mut board = Board::new();
        let rules = RuleConfig::new();
        place(&mut board, PieceKind::King, Side::Red, 9, 4);
        place(&mut board, PieceKind::King, Side::Black, 0, 4);
        enable(&rules, &[RuleKey::KingFaceToFace, RuleKey::FlyingGeneral]);

        assert!(is_valid_move(&board, &rules, Position::new(9, 4), Position::new(0, 4), None));

        // A screen on the file blocks the flight.
        place(&mut board, PieceKind::Soldier, Side::Red, 5, 4);
        assert!(!is_valid_move(&board, &rules, Position::new(9, 4), Position::new(0, 4), None));
    }

    #[test]
    fn test_advisor_diagonal_in_palace() {
        let mut board = Board::new();
        let rules = RuleConfig::new();
        place(&mut board, PieceKind::Advisor, Side::Red, 9, 3);

        assert!(is_valid_move(&board, &rules, Position::new(9, 3), Position::new(8, 4), None));
        assert!(!is_valid_move(&board, &rules, Position::new(9, 3), Position::new(8, 3), None));
        // Leaving the palace requires the variant.
        assert!(!is_valid_move(&board, &rules, Position::new(9, 3), Position::new(8, 2), None));
        enable(&rules, &[RuleKey::AdvisorLeavePalace]);
        assert!(is_valid_move(&board, &rules, Position::new(9, 3), Position::new(8, 2), None));
    }

    #[test]
    fn test_international_advisor_slides_with_blocking() {
        let mut board = Board::new();
        let rules = RuleConfig::new();
        place(&mut board, PieceKind::Advisor, Side::Red, 5, 4);
        enable(&rules, &[RuleKey::AdvisorLeavePalace, RuleKey::InternationalAdvisor]);

        assert!(is_valid_move(&board, &rules, Position::new(5, 4), Position::new(1, 0), None));
        assert!(is_valid_move(&board, &rules, Position::new(5, 4), Position::new(5, 0), None));
        assert!(is_valid_move(&board, &rules, Position::new(5, 4), Position::new(0, 4), None));

        place(&mut board, PieceKind::Soldier, Side::Black, 3, 2);
        assert!(!is_valid_move(&board, &rules, Position::new(5, 4), Position::new(1, 0), None));
        // The blocker itself is capturable.
        assert!(is_valid_move(&board, &rules, Position::new(5, 4), Position::new(3, 2), None));
    }

    #[test]
    fn test_elephant_eye_and_river() {
        let mut board = Board::new();
        let rules = RuleConfig::new();
        place(&mut board, PieceKind::Elephant, Side::Red, 7, 4);

        assert!(is_valid_move(&board, &rules, Position::new(7, 4), Position::new(5, 2), None));
        // Occupied eye blocks the jump.
        place(&mut board, PieceKind::Soldier, Side::Red, 6, 3);
        assert!(!is_valid_move(&board, &rules, Position::new(7, 4), Position::new(5, 2), None));
        enable(&rules, &[RuleKey::ElephantUnblockEye]);
        assert!(is_valid_move(&board, &rules, Position::new(7, 4), Position::new(5, 2), None));

        // The river still confines the elephant.
        let mut board = Board::new();
        place(&mut board, PieceKind::Elephant, Side::Red, 5, 2);
        assert!(!is_valid_move(&board, &rules, Position::new(5, 2), Position::new(3, 0), None));
        enable(&rules, &[RuleKey::ElephantCrossRiver]);
        assert!(is_valid_move(&board, &rules, Position::new(5, 2), Position::new(3, 0), None));
    }

    #[test]
    fn test_horse_leg_blocking() {
        let mut board = Board::new();
        let rules = RuleConfig::new();
        place(&mut board, PieceKind::Horse, Side::Red, 5, 4);

        assert!(is_valid_move(&board, &rules, Position::new(5, 4), Position::new(3, 5), None));
        place(&mut board, PieceKind::Soldier, Side::Red, 4, 4);
        assert!(!is_valid_move(&board, &rules, Position::new(5, 4), Position::new(3, 5), None));
        enable(&rules, &[RuleKey::HorseUnblockLeg]);
        assert!(is_valid_move(&board, &rules, Position::new(5, 4), Position::new(3, 5), None));
    }

    #[test]
    fn test_horse_wraparound_jump() {
        let mut board = Board::new();
        let rules = RuleConfig::new();
        place(&mut board, PieceKind::Horse, Side::Red, 5, 0);
        enable(&rules, &[RuleKey::LeftRightConnected, RuleKey::HorseWrap]);

        // (5,0) -> (6,7): two columns leftward across the edge.
        assert!(is_valid_move(&board, &rules, Position::new(5, 0), Position::new(6, 7), None));
        // Its leg sits on the wrapped column 8.
        place(&mut board, PieceKind::Soldier, Side::Red, 5, 8);
        assert!(!is_valid_move(&board, &rules, Position::new(5, 0), Position::new(6, 7), None));
    }

    #[test]
    fn test_chariot_slide_and_block() {
        let mut board = Board::new();
        let rules = RuleConfig::new();
        place(&mut board, PieceKind::Chariot, Side::Red, 5, 0);

        assert!(is_valid_move(&board, &rules, Position::new(5, 0), Position::new(5, 8), None));
        assert!(is_valid_move(&board, &rules, Position::new(5, 0), Position::new(0, 0), None));
        place(&mut board, PieceKind::Soldier, Side::Black, 5, 4);
        assert!(!is_valid_move(&board, &rules, Position::new(5, 0), Position::new(5, 8), None));
        assert!(is_valid_move(&board, &rules, Position::new(5, 0), Position::new(5, 4), None));
    }

    #[test]
    fn test_chariot_wraparound_path() {
        let mut board = Board::new();
        let rules = RuleConfig::new();
        place(&mut board, PieceKind::Chariot, Side::Red, 5, 0);
        place(&mut board, PieceKind::Chariot, Side::Black, 5, 8);
        place(&mut board, PieceKind::Soldier, Side::Black, 5, 4);

        // Direct path blocked by the soldier; without wrap, no capture.
        assert!(!is_valid_move(&board, &rules, Position::new(5, 0), Position::new(5, 8), None));

        enable(&rules, &[RuleKey::LeftRightConnected, RuleKey::ChariotWrap]);
        assert!(is_valid_move(&board, &rules, Position::new(5, 0), Position::new(5, 8), None));
        assert!(is_valid_move(&board, &rules, Position::new(5, 8), Position::new(5, 0), None));
    }

    #[test]
    fn test_cannon_screen_capture() {
        let mut board = Board::new();
        let rules = RuleConfig::new();
        place(&mut board, PieceKind::Cannon, Side::Red, 7, 1);
        place(&mut board, PieceKind::Soldier, Side::Red, 5, 1);
        place(&mut board, PieceKind::Horse, Side::Black, 2, 1);

        // Exactly one screen: capture allowed.
        assert!(is_valid_move(&board, &rules, Position::new(7, 1), Position::new(2, 1), None));
        // Cannot land on the screen, cannot slide through it.
        assert!(!is_valid_move(&board, &rules, Position::new(7, 1), Position::new(4, 1), None));
        // Sliding to an empty cell before the screen is fine.
        assert!(is_valid_move(&board, &rules, Position::new(7, 1), Position::new(6, 1), None));
        // A second screen spoils the capture.
        place(&mut board, PieceKind::Soldier, Side::Red, 4, 1);
        assert!(!is_valid_move(&board, &rules, Position::new(7, 1), Position::new(2, 1), None));
    }

    #[test]
    fn test_cannon_wrap_screen() {
        let mut board = Board::new();
        let rules = RuleConfig::new();
        place(&mut board, PieceKind::Cannon, Side::Red, 5, 1);
        place(&mut board, PieceKind::Soldier, Side::Red, 5, 0);
        place(&mut board, PieceKind::Horse, Side::Black, 5, 7);

        assert!(!is_valid_move(&board, &rules, Position::new(5, 1), Position::new(5, 7), None));
        enable(&rules, &[RuleKey::LeftRightConnected, RuleKey::CannonWrap]);
        // Around the edge: exactly the soldier at column 0 screens.
        assert!(is_valid_move(&board, &rules, Position::new(5, 1), Position::new(5, 7), None));
    }

    #[test]
    fn test_soldier_before_and_after_river() {
        let mut board = Board::new();
        let rules = RuleConfig::new();
        place(&mut board, PieceKind::Soldier, Side::Red, 6, 4);

        assert!(is_valid_move(&board, &rules, Position::new(6, 4), Position::new(5, 4), None));
        assert!(!is_valid_move(&board, &rules, Position::new(6, 4), Position::new(6, 3), None));
        assert!(!is_valid_move(&board, &rules, Position::new(6, 4), Position::new(7, 4), None));

        let mut board = Board::new();
        place(&mut board, PieceKind::Soldier, Side::Red, 4, 4);
        assert!(is_valid_move(&board, &rules, Position::new(4, 4), Position::new(3, 4), None));
        assert!(is_valid_move(&board, &rules, Position::new(4, 4), Position::new(4, 3), None));
        assert!(!is_valid_move(&board, &rules, Position::new(4, 4), Position::new(5, 4), None));
    }

    #[test]
    fn test_soldier_retreat_variants() {
        let mut board = Board::new();
        let rules = RuleConfig::new();
        place(&mut board, PieceKind::Soldier, Side::Red, 4, 4);
        place(&mut board, PieceKind::Soldier, Side::Red, 7, 0);

        enable(&rules, &[RuleKey::PawnCanRetreat]);
        assert!(is_valid_move(&board, &rules, Position::new(4, 4), Position::new(5, 4), None));
        // Not yet on the home half.
        assert!(!is_valid_move(&board, &rules, Position::new(7, 0), Position::new(8, 0), None));
        enable(&rules, &[RuleKey::PawnInsideRetreat]);
        assert!(is_valid_move(&board, &rules, Position::new(7, 0), Position::new(8, 0), None));
    }

    #[test]
    fn test_soldier_wrap_sideways() {
        let mut board = Board::new();
        let rules = RuleConfig::new();
        place(&mut board, PieceKind::Soldier, Side::Red, 3, 0);
        enable(&rules, &[RuleKey::LeftRightConnected, RuleKey::SoldierWrap]);

        assert!(is_valid_move(&board, &rules, Position::new(3, 0), Position::new(3, 8), None));
    }

    #[test]
    fn test_stacking_precondition_gates_friendly_destination() {
        let mut board = Board::new();
        let rules = RuleConfig::new();
        place(&mut board, PieceKind::Chariot, Side::Red, 5, 0);
        place(&mut board, PieceKind::Soldier, Side::Red, 5, 4);

        assert!(!is_valid_move(&board, &rules, Position::new(5, 0), Position::new(5, 4), None));
        enable(&rules, &[RuleKey::Stacking]);
        assert!(is_valid_move(&board, &rules, Position::new(5, 0), Position::new(5, 4), None));
    }

    #[test]
    fn test_stacking_limit_blocks_full_stack() {
        let mut board = Board::new();
        let rules = RuleConfig::new();
        enable(&rules, &[RuleKey::Stacking]);
        rules.set(RuleKey::StackingLimit, RuleValue::Count(2), RuleSource::Api);

        place(&mut board, PieceKind::Chariot, Side::Red, 5, 0);
        place(&mut board, PieceKind::Soldier, Side::Red, 5, 4);
        place(&mut board, PieceKind::Soldier, Side::Red, 5, 4);

        assert!(!is_valid_move(&board, &rules, Position::new(5, 0), Position::new(5, 4), None));
    }

    #[test]
    fn test_stack_index_requires_select_rule() {
        let mut board = Board::new();
        let rules = RuleConfig::new();
        enable(&rules, &[RuleKey::Stacking]);
        place(&mut board, PieceKind::Chariot, Side::Red, 5, 4);
        place(&mut board, PieceKind::Soldier, Side::Red, 5, 4);

        // Selecting the buried chariot needs StackSelect.
        assert!(!is_valid_move(&board, &rules, Position::new(5, 4), Position::new(5, 8), Some(0)));
        enable(&rules, &[RuleKey::StackSelect]);
        assert!(is_valid_move(&board, &rules, Position::new(5, 4), Position::new(5, 8), Some(0)));
        // The buried piece moves by its own archetype's rule.
        assert!(!is_valid_move(&board, &rules, Position::new(5, 4), Position::new(3, 3), Some(0)));
    }
}
