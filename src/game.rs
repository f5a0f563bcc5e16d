//! Game facade: the move cycle from validation to turn lifecycle.
//!
//! A move request flows validator → snapshot → pre-move triggers → capture
//! triggers → movement → square logic → turn lifecycle → threat scan, with
//! the effect queue processed phase by phase along the way. Everything is
//! synchronous; a rejected or bounced move restores the pre-move snapshot,
//! so failure never leaves partial state behind.

use crate::board::{Board, EffectNote, MoveRecord};
use crate::effects::{EffectPhase, EffectQueue};
use crate::logic::{Dispatcher, EventContext, TriggerTarget};
use crate::piece::{Color, Piece};
use crate::square::Square;
use crate::validator::{self, SpecialMove};
use tracing::{debug, info, instrument};

/// Bound on the undo stack; the oldest snapshot is dropped beyond this.
const MAX_SNAPSHOTS: usize = 128;

/// Current status of a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameStatus {
    /// Moves are being accepted.
    InProgress,
    /// A side has won; further moves are refused.
    Won(Color),
}

/// Handle identifying a registered effect observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

type ObserverFn = Box<dyn FnMut(&EffectNote)>;

/// A running game instance: board, effect queue, trigger dispatcher,
/// snapshot stack, and presentation observers.
pub struct Game {
    board: Board,
    queue: EffectQueue,
    dispatcher: Dispatcher,
    snapshots: Vec<Board>,
    status: GameStatus,
    observers: Vec<(ObserverId, ObserverFn)>,
    next_observer: u64,
}

impl std::fmt::Debug for Game {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Game")
            .field("board", &self.board)
            .field("status", &self.status)
            .field("snapshots", &self.snapshots.len())
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl Default for Game {
    fn default() -> Self {
        Self::new()
    }
}

impl Game {
    /// New game on the standard 8×8 setup.
    pub fn new() -> Self {
        Self::with_board(Board::standard())
    }

    /// New game over an arbitrary board (custom variants, loaded rulesets).
    pub fn with_board(board: Board) -> Self {
        let status = match board.winner() {
            Some(winner) => GameStatus::Won(winner),
            None => GameStatus::InProgress,
        };
        Self {
            board,
            queue: EffectQueue::new(),
            dispatcher: Dispatcher::new(),
            snapshots: Vec::new(),
            status,
            observers: Vec::new(),
            next_observer: 0,
        }
    }

    /// The live board.
    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Mutable access to the board for setup; not intended mid-game.
    pub fn board_mut(&mut self) -> &mut Board {
        &mut self.board
    }

    /// Current game status.
    pub fn status(&self) -> GameStatus {
        self.status
    }

    /// Side to move.
    pub fn turn(&self) -> Color {
        self.board.turn()
    }

    /// Committed move history.
    pub fn history(&self) -> &[MoveRecord] {
        self.board.history()
    }

    /// Pure legality check for a candidate move; never mutates.
    pub fn is_legal(&self, from: &Square, to: &Square) -> bool {
        validator::is_legal_move(&self.board, from, to)
    }

    // ─────────────────────────────────────────────────────────────
    //  Observers
    // ─────────────────────────────────────────────────────────────

    /// Registers an effect observer and returns its handle.
    pub fn observe(&mut self, observer: impl FnMut(&EffectNote) + 'static) -> ObserverId {
        let id = ObserverId(self.next_observer);
        self.next_observer += 1;
        self.observers.push((id, Box::new(observer)));
        id
    }

    /// Unregisters an observer. Returns whether it was registered.
    pub fn unobserve(&mut self, id: ObserverId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(oid, _)| *oid != id);
        self.observers.len() != before
    }

    fn notify_observers(&mut self) {
        let notes = self.board.take_notes();
        for note in &notes {
            for (_, observer) in &mut self.observers {
                observer(note);
            }
        }
    }

    // ─────────────────────────────────────────────────────────────
    //  Move submission
    // ─────────────────────────────────────────────────────────────

    /// Attempts a move. On success every consequence — capture,
    /// transformation, logic firing, turn advance — has been applied
    /// internally; on failure nothing has changed.
    #[instrument(skip(self), fields(turn = %self.board.turn()))]
    pub fn attempt_move(&mut self, from: &Square, to: &Square, promotion: Option<&str>) -> bool {
        if self.status != GameStatus::InProgress {
            debug!("move refused: game is over");
            return false;
        }
        if !validator::is_legal_move(&self.board, from, to) {
            debug!(%from, %to, "move refused by validator");
            return false;
        }

        self.push_snapshot();
        self.queue.reset_cancellation();

        // Promotion swaps the pawn out before anything reacts to the move.
        if let Some(kind) = promotion
            && self.board.is_promotion_move(from, to)
            && let Some(old) = self.board.take_piece(from)
        {
            let promoted = Piece::from_parts(
                format!("{}_promo", old.id()),
                kind,
                old.color(),
                from.clone(),
                Vec::new(),
                Default::default(),
                Default::default(),
                None,
                None,
            );
            self.board.put(promoted);
        }

        let Some(mover) = self.board.piece_at(from) else {
            return self.rollback();
        };
        let mut mover_id = mover.id().to_string();
        let mover_color = mover.color();
        let mut mover_custom = mover.is_custom();
        let captured_id = self
            .board
            .piece_at(to)
            .filter(|victim| victim.color() != mover_color)
            .map(|victim| victim.id().to_string());

        // Pre-move triggers, then pre-move effects.
        if mover_custom {
            self.dispatch(
                EffectPhase::PreMove,
                TriggerTarget::Piece(mover_id.clone()),
                "on-move",
                EventContext {
                    from: Some(from.clone()),
                    to: Some(to.clone()),
                    captured: captured_id.clone(),
                    ..EventContext::default()
                },
            );
        }
        self.queue.process_phase(EffectPhase::PreMove, &mut self.board);
        if self.queue.was_move_cancelled() {
            // The mover may have died to its own logic; that consumes the
            // move rather than bouncing it.
            if self.board.piece_at(from).is_none() {
                return self.commit_consumed_move(from, to, mover_id);
            }
            debug!("move bounced by pre-move logic");
            return self.rollback();
        }

        // Logic may have transformed the mover in place; refresh.
        match self.board.piece_at(from) {
            Some(mover) => {
                mover_id = mover.id().to_string();
                mover_custom = mover.is_custom();
            }
            None => return self.commit_consumed_move(from, to, mover_id),
        }

        // Capture triggers fire on both parties, then on-move effects.
        let captured_id = self
            .board
            .piece_at(to)
            .filter(|victim| victim.color() != mover_color)
            .map(|victim| victim.id().to_string());
        if let Some(captured) = &captured_id {
            let context = EventContext {
                from: Some(from.clone()),
                to: Some(to.clone()),
                attacker: Some(mover_id.clone()),
                captured: Some(captured.clone()),
                ..EventContext::default()
            };
            if mover_custom {
                self.dispatch(
                    EffectPhase::OnMove,
                    TriggerTarget::Piece(mover_id.clone()),
                    "on-capture",
                    context.clone(),
                );
            }
            if self
                .board
                .piece_by_id(captured)
                .is_some_and(Piece::is_custom)
            {
                self.dispatch(
                    EffectPhase::OnMove,
                    TriggerTarget::Piece(captured.clone()),
                    "on-capture",
                    context,
                );
            }
        }
        self.queue.process_phase(EffectPhase::OnMove, &mut self.board);
        if self.queue.was_move_cancelled() {
            if self.board.piece_at(from).is_none() {
                return self.commit_consumed_move(from, to, mover_id);
            }
            debug!("move bounced by capture logic");
            return self.rollback();
        }
        if self.board.piece_at(from).is_none() {
            return self.commit_consumed_move(from, to, mover_id);
        }

        // Execute the movement itself. Special patterns move or remove a
        // second piece.
        let special = validator::special_move(&self.board, from, to);
        if let Some(SpecialMove::EnPassant { captured }) = &special {
            if self.board.take_piece(captured).is_some() {
                self.board.note("kill", Some(captured.clone()));
            }
        }
        self.board.relocate(from, to);
        if let Some(SpecialMove::Castle { rook_from, rook_to }) = &special {
            self.board.relocate(rook_from, rook_to);
        }
        self.board
            .record_move(from.clone(), to.clone(), mover_id.clone());
        info!(piece = %mover_id, %from, %to, "move committed");

        // Reactive squares: landing square first, then proximity sweep.
        let step_context = EventContext {
            from: Some(from.clone()),
            to: Some(to.clone()),
            stepper: Some(mover_id.clone()),
            ..EventContext::default()
        };
        self.dispatch(
            EffectPhase::PostMove,
            TriggerTarget::Square(to.clone()),
            "on-step",
            step_context.clone(),
        );
        for square in self.board.square_logic_squares() {
            self.dispatch(
                EffectPhase::PostMove,
                TriggerTarget::Square(square),
                "on-proximity",
                step_context.clone(),
            );
        }
        self.queue.process_phase(EffectPhase::PostMove, &mut self.board);

        // Turn lifecycle for the side now to move, then the threat scan.
        self.run_turn_lifecycle();
        self.run_threat_scan();
        self.queue.process_phase(EffectPhase::EndOfTurn, &mut self.board);

        if let Some(winner) = self.board.winner() {
            info!(winner = %winner, "game won");
            self.status = GameStatus::Won(winner);
        }
        self.notify_observers();
        true
    }

    /// The mover was destroyed by logic mid-move: the move is consumed
    /// (history advances, turn passes) but no movement happens.
    fn commit_consumed_move(&mut self, from: &Square, to: &Square, mover_id: String) -> bool {
        debug!(piece = %mover_id, "mover destroyed by logic; move consumed");
        self.board.record_move(from.clone(), to.clone(), mover_id);
        if let Some(winner) = self.board.winner() {
            self.status = GameStatus::Won(winner);
        }
        self.notify_observers();
        true
    }

    fn rollback(&mut self) -> bool {
        if let Some(previous) = self.snapshots.pop() {
            self.board = previous;
        }
        self.queue.clear();
        false
    }

    fn dispatch(
        &mut self,
        phase: EffectPhase,
        target: TriggerTarget,
        event: &str,
        context: EventContext,
    ) {
        self.dispatcher
            .dispatch(&mut self.board, &mut self.queue, phase, target, event, context);
    }

    // ─────────────────────────────────────────────────────────────
    //  Turn lifecycle
    // ─────────────────────────────────────────────────────────────

    /// Cooldown ticks, turn-start, environment, and variable triggers for
    /// every data-defined piece of the side now to move.
    fn run_turn_lifecycle(&mut self) {
        let side = self.board.turn();
        for id in self.board.custom_piece_ids(Some(side)) {
            let mut remaining = None;
            if let Some(custom) = self
                .board
                .piece_by_id_mut(&id)
                .and_then(Piece::as_custom_mut)
            {
                let cooldown = custom.variables.number("cooldown");
                if cooldown > 0.0 {
                    custom.variables.set_number("cooldown", cooldown - 1.0);
                    remaining = Some(cooldown - 1.0);
                }
            }
            if let Some(remaining) = remaining {
                self.dispatch(
                    EffectPhase::EndOfTurn,
                    TriggerTarget::Piece(id.clone()),
                    "on-cooldown-tick",
                    EventContext {
                        remaining: Some(remaining),
                        ..EventContext::default()
                    },
                );
                if remaining == 0.0 {
                    self.dispatch(
                        EffectPhase::EndOfTurn,
                        TriggerTarget::Piece(id.clone()),
                        "on-cooldown-end",
                        EventContext::default(),
                    );
                }
            }
            self.dispatch(
                EffectPhase::EndOfTurn,
                TriggerTarget::Piece(id.clone()),
                "on-turn-start",
                EventContext::default(),
            );
            self.dispatch(
                EffectPhase::EndOfTurn,
                TriggerTarget::Piece(id.clone()),
                "on-environment",
                EventContext::default(),
            );
            self.dispatch(
                EffectPhase::EndOfTurn,
                TriggerTarget::Piece(id),
                "on-var",
                EventContext::default(),
            );
        }
    }

    /// Recomputes, for every data-defined piece, which opposing pieces can
    /// attack its square, firing `on-threat` per attacking pair. Quadratic
    /// over occupied squares, which is fine at board scale.
    fn run_threat_scan(&mut self) {
        for id in self.board.custom_piece_ids(None) {
            let Some(piece) = self.board.piece_by_id(&id) else {
                continue;
            };
            let color = piece.color();
            let square = piece.square().clone();
            let attackers: Vec<String> = self
                .board
                .pieces()
                .filter(|attacker| attacker.color() == color.opponent())
                .filter(|attacker| attacker.can_attack(&square, &self.board))
                .map(|attacker| attacker.id().to_string())
                .collect();
            for attacker in attackers {
                self.dispatch(
                    EffectPhase::EndOfTurn,
                    TriggerTarget::Piece(id.clone()),
                    "on-threat",
                    EventContext {
                        attacker: Some(attacker),
                        is_attacked: true,
                        ..EventContext::default()
                    },
                );
            }
        }
    }

    // ─────────────────────────────────────────────────────────────
    //  Snapshot / undo
    // ─────────────────────────────────────────────────────────────

    fn push_snapshot(&mut self) {
        if self.snapshots.len() >= MAX_SNAPSHOTS {
            self.snapshots.remove(0);
        }
        self.snapshots.push(self.board.clone());
    }

    /// Restores the most recent pre-move snapshot: piece positions,
    /// variable banks, square state, turn, and history. An empty stack is
    /// a no-op.
    #[instrument(skip(self))]
    pub fn undo(&mut self) -> bool {
        let Some(previous) = self.snapshots.pop() else {
            debug!("undo requested with no snapshots");
            return false;
        };
        self.board = previous;
        self.status = match self.board.winner() {
            Some(winner) => GameStatus::Won(winner),
            None => GameStatus::InProgress,
        };
        self.queue.clear();
        true
    }
}
