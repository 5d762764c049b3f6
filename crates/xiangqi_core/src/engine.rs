//! The game engine: turn order, move execution and undo, history,
//! state derivation, and replay reconstruction.
//!
//! The engine exclusively owns the board. Its mutating surface is not
//! internally synchronized; callers taking input from several sources
//! (local input plus a network receive loop) must marshal all
//! mutations onto one serialized execution context.

use crate::action::{Move, MoveError, MoveRequest, RuleChangeRecord};
use crate::board::Board;
use crate::check;
use crate::legality;
use crate::position::Position;
use crate::rules::{RuleConfig, RuleKey, RuleSnapshot, RuleSource, RuleValue};
use crate::types::{GameState, Piece, PieceKind, Side};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Receives engine notifications. Callbacks run synchronously on the
/// mutating thread, right after the mutation completes.
pub trait GameListener: Send + Sync {
    /// An accepted move was executed, or `None` after an undo.
    fn on_move_executed(&self, mv: Option<&Move>);
    /// The derived game state changed.
    fn on_game_state_changed(&self, state: GameState);
}

/// Orchestrates a single game.
pub struct GameEngine {
    pub(crate) board: Board,
    pub(crate) rules: Arc<RuleConfig>,
    pub(crate) history: Vec<Move>,
    pub(crate) rule_changes: Vec<RuleChangeRecord>,
    pub(crate) state: GameState,
    pub(crate) red_turn: bool,
    pub(crate) listeners: Vec<Arc<dyn GameListener>>,
    /// Deep copy of the board before any recorded move, with the rule
    /// set and turn that went with it. Replay starts here.
    pub(crate) bookmark: Board,
    pub(crate) bookmark_red_turn: bool,
    pub(crate) bookmark_rules: RuleSnapshot,
}

impl GameEngine {
    /// A fresh game from the standard opening with default rules.
    pub fn new() -> Self {
        Self::with_rules(Arc::new(RuleConfig::new()))
    }

    /// A fresh game sharing an existing rule configuration handle.
    pub fn with_rules(rules: Arc<RuleConfig>) -> Self {
        let board = Board::standard();
        Self {
            bookmark: board.deep_copy(),
            bookmark_red_turn: true,
            bookmark_rules: rules.snapshot(),
            board,
            rules,
            history: Vec::new(),
            rule_changes: Vec::new(),
            state: GameState::Running,
            red_turn: true,
            listeners: Vec::new(),
        }
    }

    /// The live board.
    pub fn board(&self) -> &Board {
        &self.board
    }

    /// The shared rule configuration handle.
    pub fn rules(&self) -> &Arc<RuleConfig> {
        &self.rules
    }

    /// The derived game state.
    pub fn state(&self) -> GameState {
        self.state
    }

    /// Whether red is to move.
    pub fn is_red_turn(&self) -> bool {
        self.red_turn
    }

    /// The side to move.
    pub fn side_to_move(&self) -> Side {
        if self.red_turn {
            Side::Red
        } else {
            Side::Black
        }
    }

    /// The executed move history, oldest first.
    pub fn history(&self) -> &[Move] {
        &self.history
    }

    /// Accepted rule changes, pinned to their move indices.
    pub fn rule_changes(&self) -> &[RuleChangeRecord] {
        &self.rule_changes
    }

    /// Whether the side to move is currently in check.
    pub fn in_check(&self) -> bool {
        check::is_in_check(&self.board, &self.rules, self.side_to_move())
    }

    /// Registers an engine listener.
    pub fn add_listener(&mut self, listener: Arc<dyn GameListener>) {
        self.listeners.push(listener);
    }

    /// Changes one rule and records the change against the current
    /// history index. Returns `false` when the config rejects it.
    #[instrument(skip(self))]
    pub fn set_rule(&mut self, key: RuleKey, value: RuleValue, source: RuleSource) -> bool {
        if !self.rules.set(key, value, source) {
            return false;
        }
        self.rule_changes.push(RuleChangeRecord {
            key,
            display_name: key.display_name().to_string(),
            value,
            after_move_index: self.history.len(),
        });
        true
    }

    /// Executes a move request.
    ///
    /// On any rejection the engine state is untouched. On success the
    /// move is appended to history, the active player flips, the game
    /// state is re-derived, and listeners are notified.
    #[instrument(skip(self), fields(side = %self.side_to_move()))]
    pub fn make_move(&mut self, request: MoveRequest) -> Result<Move, MoveError> {
        if self.state.is_over() {
            return Err(MoveError::GameOver);
        }
        let (piece, index) = self.resolve_source(request.from, request.stack_index)?;
        if piece.side != self.side_to_move() {
            warn!(%piece, "move out of turn rejected");
            return Err(MoveError::WrongSide(piece.side));
        }
        if !legality::is_valid_move(
            &self.board,
            &self.rules,
            request.from,
            request.to,
            request.stack_index,
        ) {
            debug!(from = %request.from, to = %request.to, "illegal move rejected");
            return Err(MoveError::Illegal(request.from, request.to));
        }

        let mv = self.classify(piece, request, index, false)?;
        self.commit(mv)
    }

    /// Executes a move without consulting the legality engine.
    ///
    /// An out-of-band override, subject to the `ForceMove` rule and
    /// to the game still running. The move is classified, recorded,
    /// and undoable like any other.
    #[instrument(skip(self))]
    pub fn force_move(&mut self, request: MoveRequest) -> Result<Move, MoveError> {
        if !self.rules.enabled(RuleKey::ForceMove) {
            return Err(MoveError::ForceDisabled);
        }
        if self.state.is_over() {
            return Err(MoveError::GameOver);
        }
        if !request.to.on_board() {
            return Err(MoveError::OffBoard(request.to));
        }
        if request.from == request.to {
            return Err(MoveError::Illegal(request.from, request.to));
        }
        let (piece, index) = self.resolve_source(request.from, request.stack_index)?;
        info!(%piece, from = %request.from, to = %request.to, "force move");
        let mv = self.classify(piece, request, index, true)?;
        self.commit(mv)
    }

    /// Undoes the last executed move, inverting exactly the
    /// classification recorded on it, and restores the prior turn.
    #[instrument(skip(self))]
    pub fn undo_last_move(&mut self) -> Result<(), MoveError> {
        let mv = self.history.pop().ok_or(MoveError::NothingToUndo)?;
        self.invert(&mv);
        self.red_turn = !self.red_turn;
        // The position before any accepted move was live by
        // construction.
        let prior = std::mem::replace(&mut self.state, GameState::Running);
        info!(%mv, "move undone");
        self.notify_move(None);
        if prior != self.state {
            self.notify_state(self.state);
        }
        Ok(())
    }

    /// Resets to the standard opening. The current rule set stays in
    /// force; move and rule-change history restart empty.
    #[instrument(skip(self))]
    pub fn restart(&mut self) {
        self.board = Board::standard();
        self.history.clear();
        self.rule_changes.clear();
        self.red_turn = true;
        self.bookmark = self.board.deep_copy();
        self.bookmark_red_turn = true;
        self.bookmark_rules = self.rules.snapshot();
        let prior = std::mem::replace(&mut self.state, GameState::Running);
        info!("game restarted");
        if prior != self.state {
            self.notify_state(self.state);
        }
    }

    /// Rebuilds the live game to the position after the first `n`
    /// recorded moves.
    ///
    /// The board is cleared and restored from the pre-game bookmark,
    /// rule changes are re-applied at their recorded indices, and the
    /// first `n` moves are replayed forward without re-validation;
    /// history is trusted. Moves and rule changes beyond `n` are
    /// dropped.
    #[instrument(skip(self))]
    pub fn rebuild_to_step(&mut self, n: usize) -> Result<(), MoveError> {
        if n > self.history.len() {
            return Err(MoveError::BadStep {
                step: n,
                len: self.history.len(),
            });
        }
        let moves: Vec<Move> = self.history.drain(..).take(n).collect();
        let changes = std::mem::take(&mut self.rule_changes);

        self.board.clear();
        self.board = self.bookmark.deep_copy();
        self.red_turn = self.bookmark_red_turn;
        self.rules
            .apply_snapshot(&self.bookmark_rules, RuleSource::Api)?;

        for (step, mv) in moves.into_iter().enumerate() {
            for change in changes.iter().filter(|c| c.after_move_index == step) {
                self.reapply_rule_change(change);
            }
            self.replay_move(&mv);
            self.history.push(mv);
            self.red_turn = !self.red_turn;
        }
        for change in changes.iter().filter(|c| c.after_move_index == n) {
            self.reapply_rule_change(change);
        }
        self.rule_changes = changes
            .into_iter()
            .filter(|c| c.after_move_index <= n)
            .collect();

        self.state = self.derive_state();
        info!(step = n, state = %self.state, "rebuilt to step");
        self.notify_move(None);
        self.notify_state(self.state);
        Ok(())
    }

    /// Resolves the moving piece at a source cell.
    fn resolve_source(
        &self,
        from: Position,
        stack_index: Option<usize>,
    ) -> Result<(Piece, usize), MoveError> {
        if !from.on_board() {
            return Err(MoveError::OffBoard(from));
        }
        let stack = self.board.stack_at(from);
        if stack.is_empty() {
            return Err(MoveError::EmptySource(from));
        }
        let top = stack.len() - 1;
        let index = stack_index.unwrap_or(top);
        if index > top {
            return Err(MoveError::BadStackIndex {
                index,
                len: stack.len(),
            });
        }
        Ok((stack[index], index))
    }

    /// Classifies a vetted move into exactly one of: plain move,
    /// capture, capture-with-conversion, or capture-as-stack, and
    /// settles promotion. Builds the immutable record; mutates
    /// nothing.
    fn classify(
        &self,
        piece: Piece,
        request: MoveRequest,
        index: usize,
        force: bool,
    ) -> Result<Move, MoveError> {
        let target = self.board.piece_at(request.to).copied();
        let (is_stacking, capture_conversion, captured, converted) = match target {
            Some(t) if t.side == piece.side => {
                if !self.rules.enabled(RuleKey::Stacking) {
                    // Reachable only through a force move; stacks may
                    // not form while the variant is off.
                    return Err(MoveError::Illegal(request.from, request.to));
                }
                (true, false, None, None)
            }
            Some(t) => {
                if self.rules.enabled(RuleKey::CaptureConversion) {
                    (false, true, Some(t), Some(t.converted()))
                } else {
                    (false, false, Some(t), None)
                }
            }
            None => (false, false, None, None),
        };

        let stack = self.board.stack_at(request.from);
        let top = stack.len() - 1;
        let moved_stack = if !capture_conversion
            && self.rules.enabled(RuleKey::StackCarry)
            && index < top
        {
            stack[index + 1..].to_vec()
        } else {
            Vec::new()
        };

        // Promotion applies only when the piece actually relocates
        // onto its promotion row.
        let relocates = !capture_conversion;
        let promotion = if relocates
            && self.rules.enabled(RuleKey::PawnPromotion)
            && piece.kind == PieceKind::Soldier
            && request.to.row == Position::promotion_row(piece.side)
        {
            match request.promotion {
                Some(PieceKind::King) => return Err(MoveError::BadPromotion(PieceKind::King)),
                choice => choice,
            }
        } else {
            None
        };

        Ok(Move {
            from: request.from,
            to: request.to,
            piece,
            captured,
            is_stacking,
            capture_conversion,
            converted,
            selected_stack_index: request.stack_index.map_or(-1, |i| i as i32),
            moved_stack,
            promotion,
            force,
        })
    }

    /// Applies a classified move, appends it, flips the turn, derives
    /// the new state, and notifies listeners.
    fn commit(&mut self, mv: Move) -> Result<Move, MoveError> {
        self.replay_move(&mv);
        self.history.push(mv.clone());
        self.red_turn = !self.red_turn;

        let next = self.derive_state();
        let changed = next != self.state;
        self.state = next;

        info!(%mv, state = %self.state, "move executed");
        self.notify_move(Some(&mv));
        if changed {
            self.notify_state(self.state);
        }
        Ok(mv)
    }

    /// Applies a move record to the board. Trusted: classification is
    /// taken from the record, not re-derived, so replay and import
    /// reconstruction go through the same path as live execution.
    pub(crate) fn replay_move(&mut self, mv: &Move) {
        if mv.capture_conversion {
            let target = self
                .board
                .pop_top(mv.to)
                .expect("conversion target recorded on move");
            self.board.push(mv.to, target.converted());
            return;
        }

        if !mv.is_stacking && mv.captured.is_some() {
            self.board.pop_top(mv.to);
        }

        let len = self.board.stack_len(mv.from);
        let index = mv.source_index(len);
        if mv.moved_stack.is_empty() {
            let mut mover = self
                .board
                .remove_at(mv.from, index)
                .expect("move source recorded on move");
            if let Some(kind) = mv.promotion {
                mover.kind = kind;
            }
            self.board.push(mv.to, mover);
        } else {
            // Lift the selected element and everything above it, then
            // set the group down in the same order.
            let mut lifted: Vec<Piece> = (index..len)
                .map(|_| self.board.pop_top(mv.from).expect("carried stack recorded"))
                .collect();
            let mut mover = lifted.pop().expect("selected element under carried stack");
            if let Some(kind) = mv.promotion {
                mover.kind = kind;
            }
            self.board.push(mv.to, mover);
            for piece in lifted.into_iter().rev() {
                self.board.push(mv.to, piece);
            }
        }
    }

    /// Inverts a move record on the board.
    fn invert(&mut self, mv: &Move) {
        if mv.capture_conversion {
            // The capturer never moved; flip the converted piece back.
            self.board
                .pop_top(mv.to)
                .expect("converted piece present at destination");
            let captured = mv.captured.expect("conversion records its capture");
            self.board.push(mv.to, captured);
            return;
        }

        // Pop the carried pieces (top first), then the mover.
        let carried: Vec<Piece> = (0..mv.moved_stack.len())
            .map(|_| self.board.pop_top(mv.to).expect("carried piece at destination"))
            .collect();
        let mut mover = self
            .board
            .pop_top(mv.to)
            .expect("moved piece at destination");
        mover.kind = mv.piece.kind;

        // Re-insert at the recorded depth; pieces that had stayed
        // above the extraction point shift back up around the group.
        let insert_index = if mv.selected_stack_index < 0 {
            self.board.stack_len(mv.from)
        } else {
            mv.selected_stack_index as usize
        };
        self.board.insert_at(mv.from, insert_index, mover);
        for (offset, piece) in carried.into_iter().rev().enumerate() {
            self.board.insert_at(mv.from, insert_index + 1 + offset, piece);
        }

        if let Some(captured) = mv.captured {
            self.board.push(mv.to, captured);
        }
    }

    /// Derives the game state from the board: a missing king loses
    /// immediately, otherwise checkmate is probed for both sides.
    fn derive_state(&mut self) -> GameState {
        if self.board.king(Side::Red).is_none() {
            return GameState::RedCheckmate;
        }
        if self.board.king(Side::Black).is_none() {
            return GameState::BlackCheckmate;
        }
        if check::is_checkmate(&mut self.board, &self.rules, Side::Red) {
            return GameState::RedCheckmate;
        }
        if check::is_checkmate(&mut self.board, &self.rules, Side::Black) {
            return GameState::BlackCheckmate;
        }
        GameState::Running
    }

    /// Re-applies a historical rule change during replay.
    fn reapply_rule_change(&self, change: &RuleChangeRecord) {
        if !self.rules.set(change.key, change.value, RuleSource::Api) {
            // History is trusted; a rejection here means the recorded
            // sequence was tampered with.
            warn!(key = %change.key, "recorded rule change no longer applies");
        }
    }

    fn notify_move(&self, mv: Option<&Move>) {
        for listener in &self.listeners {
            listener.on_move_executed(mv);
        }
    }

    fn notify_state(&self, state: GameState) {
        for listener in &self.listeners {
            listener.on_game_state_changed(state);
        }
    }
}

impl Default for GameEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for GameEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameEngine")
            .field("state", &self.state)
            .field("red_turn", &self.red_turn)
            .field("moves", &self.history.len())
            .finish_non_exhaustive()
    }
}
