//! The phased effect queue: the single channel through which reactive
//! logic mutates board state.
//!
//! Logic runners enqueue effects; the game processes them phase by phase.
//! Effects are transient — created, queued, executed, discarded — and an
//! effect never executes outside its declared phase.

use crate::board::Board;
use crate::piece::{Color, Piece};
use crate::square::Square;
use serde_json::Value as Json;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use tracing::{debug, instrument};

/// When during a move cycle an effect executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EffectPhase {
    /// Before the move is applied.
    PreMove,
    /// While the move (and its capture) is applied.
    OnMove,
    /// After the piece has landed.
    PostMove,
    /// During the turn-lifecycle pass.
    EndOfTurn,
}

/// What an effect is aimed at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EffectTarget {
    /// A square.
    Square(Square),
    /// A piece, addressed by id wherever it currently stands.
    Piece(String),
    /// No target (cancellation, win).
    None,
}

/// Partial update merged into a square's auxiliary state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SquareStatePatch {
    /// Replacement tag set, when present.
    pub tags: Option<BTreeSet<String>>,
    /// Replacement disabled flag, when present.
    pub disabled: Option<bool>,
    /// Properties merged over the existing ones.
    pub props: BTreeMap<String, Json>,
}

/// The mutation an effect performs.
#[derive(Debug, Clone, PartialEq)]
pub enum EffectKind {
    /// Replace the target piece with a fresh one of `new_kind`, preserving
    /// the square.
    Transform {
        /// Kind tag of the replacement.
        new_kind: String,
        /// Owner of the replacement; defaults to the old owner.
        new_color: Option<Color>,
    },
    /// Clear the target square.
    Remove,
    /// Create a piece on the target square if it is empty.
    Spawn {
        /// Kind tag of the spawned piece.
        kind: String,
        /// Owner of the spawned piece.
        color: Color,
        /// Explicit id; generated from the square when absent.
        piece_id: Option<String>,
    },
    /// Relocate the piece on the target square.
    Move {
        /// Destination.
        to: Square,
    },
    /// Merge a patch into the target square's auxiliary state.
    SetSquareState(SquareStatePatch),
    /// Add a tag to the target square.
    AddTag(String),
    /// Remove a tag from the target square.
    RemoveTag(String),
    /// Veto the move in flight (sticky until reset).
    CancelMove,
    /// Declare a winner.
    Win(Color),
}

/// A queued, phase-scoped mutation request.
#[derive(Debug, Clone, PartialEq)]
pub struct Effect {
    /// The mutation.
    pub kind: EffectKind,
    /// Phase the effect executes in.
    pub phase: EffectPhase,
    /// Target of the mutation.
    pub target: EffectTarget,
}

impl Effect {
    /// Transform the piece at a square or with an id.
    pub fn transform(target: EffectTarget, new_kind: impl Into<String>, phase: EffectPhase) -> Self {
        Self {
            kind: EffectKind::Transform {
                new_kind: new_kind.into(),
                new_color: None,
            },
            phase,
            target,
        }
    }

    /// Remove the piece on a square.
    pub fn remove(square: Square, phase: EffectPhase) -> Self {
        Self {
            kind: EffectKind::Remove,
            phase,
            target: EffectTarget::Square(square),
        }
    }

    /// Spawn a piece on an empty square.
    pub fn spawn(square: Square, kind: impl Into<String>, color: Color, phase: EffectPhase) -> Self {
        Self {
            kind: EffectKind::Spawn {
                kind: kind.into(),
                color,
                piece_id: None,
            },
            phase,
            target: EffectTarget::Square(square),
        }
    }

    /// Relocate a piece.
    pub fn relocate(from: Square, to: Square, phase: EffectPhase) -> Self {
        Self {
            kind: EffectKind::Move { to },
            phase,
            target: EffectTarget::Square(from),
        }
    }

    /// Merge auxiliary state into a square.
    pub fn set_square_state(square: Square, patch: SquareStatePatch, phase: EffectPhase) -> Self {
        Self {
            kind: EffectKind::SetSquareState(patch),
            phase,
            target: EffectTarget::Square(square),
        }
    }

    /// Tag a square.
    pub fn add_tag(square: Square, tag: impl Into<String>, phase: EffectPhase) -> Self {
        Self {
            kind: EffectKind::AddTag(tag.into()),
            phase,
            target: EffectTarget::Square(square),
        }
    }

    /// Untag a square.
    pub fn remove_tag(square: Square, tag: impl Into<String>, phase: EffectPhase) -> Self {
        Self {
            kind: EffectKind::RemoveTag(tag.into()),
            phase,
            target: EffectTarget::Square(square),
        }
    }

    /// Veto the move in flight.
    pub fn cancel_move(phase: EffectPhase) -> Self {
        Self {
            kind: EffectKind::CancelMove,
            phase,
            target: EffectTarget::None,
        }
    }

    /// Declare a winner.
    pub fn win(color: Color, phase: EffectPhase) -> Self {
        Self {
            kind: EffectKind::Win(color),
            phase,
            target: EffectTarget::None,
        }
    }
}

/// FIFO effect queue with a sticky move-cancellation flag.
#[derive(Debug, Default)]
pub struct EffectQueue {
    queue: VecDeque<Effect>,
    move_cancelled: bool,
}

impl EffectQueue {
    /// Empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an effect.
    pub fn enqueue(&mut self, effect: Effect) {
        self.queue.push_back(effect);
    }

    /// Number of queued effects.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Whether the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Whether a cancel effect has executed since the last reset.
    pub fn was_move_cancelled(&self) -> bool {
        self.move_cancelled
    }

    /// Clears the cancellation flag. Called once per move attempt, before
    /// pre-move effects run.
    pub fn reset_cancellation(&mut self) {
        self.move_cancelled = false;
    }

    /// Drops all queued effects and the cancellation flag. Used between
    /// unrelated validation attempts.
    pub fn clear(&mut self) {
        self.queue.clear();
        self.move_cancelled = false;
    }

    /// Executes and removes every queued effect of `phase`, in queue order.
    /// Effects of other phases stay queued untouched. Returns the declared
    /// winner, if an executed effect produced one.
    #[instrument(skip(self, board))]
    pub fn process_phase(&mut self, phase: EffectPhase, board: &mut Board) -> Option<Color> {
        let mut kept = VecDeque::with_capacity(self.queue.len());
        let mut batch = Vec::new();
        for effect in self.queue.drain(..) {
            if effect.phase == phase {
                batch.push(effect);
            } else {
                kept.push_back(effect);
            }
        }
        self.queue = kept;

        let mut winner = None;
        for effect in batch {
            debug!(kind = ?effect.kind, "executing effect");
            if let Some(color) = self.execute(effect, board) {
                winner.get_or_insert(color);
            }
        }
        winner
    }

    fn execute(&mut self, effect: Effect, board: &mut Board) -> Option<Color> {
        let square = match &effect.target {
            EffectTarget::Square(sq) => Some(sq.clone()),
            EffectTarget::Piece(id) => board.square_of(id),
            EffectTarget::None => None,
        };
        match effect.kind {
            EffectKind::Transform {
                new_kind,
                new_color,
            } => {
                let square = square?;
                let old = board.piece_at(&square)?.clone();
                let replacement = Piece::from_parts(
                    format!("{}_transformed", old.id()),
                    &new_kind,
                    new_color.unwrap_or(old.color()),
                    square.clone(),
                    Vec::new(),
                    Default::default(),
                    Default::default(),
                    None,
                    None,
                );
                board.put(replacement);
                board.note("transform", Some(square));
                None
            }
            EffectKind::Remove => {
                let square = square?;
                if board.take_piece(&square).is_some() {
                    board.note("kill", Some(square));
                }
                None
            }
            EffectKind::Spawn {
                kind,
                color,
                piece_id,
            } => {
                let square = square?;
                // Never spawn onto an occupied square.
                if board.piece_at(&square).is_some() {
                    return None;
                }
                let id = piece_id.unwrap_or_else(|| format!("spawned_{square}"));
                board.put(Piece::from_parts(
                    id,
                    &kind,
                    color,
                    square.clone(),
                    Vec::new(),
                    Default::default(),
                    Default::default(),
                    None,
                    None,
                ));
                board.note("spawn", Some(square));
                None
            }
            EffectKind::Move { to } => {
                let from = square?;
                if board.relocate(&from, &to) {
                    board.note("move", Some(to));
                }
                None
            }
            EffectKind::SetSquareState(patch) => {
                let square = square?;
                let state = board.square_state_mut(&square);
                if let Some(tags) = patch.tags {
                    state.tags = tags;
                }
                if let Some(disabled) = patch.disabled {
                    state.disabled = disabled;
                }
                state.props.extend(patch.props);
                board.note("square_state", Some(square));
                None
            }
            EffectKind::AddTag(tag) => {
                let square = square?;
                board.square_state_mut(&square).tags.insert(tag);
                board.note("add_tag", Some(square));
                None
            }
            EffectKind::RemoveTag(tag) => {
                let square = square?;
                board.square_state_mut(&square).tags.remove(&tag);
                board.note("remove_tag", Some(square));
                None
            }
            EffectKind::CancelMove => {
                self.move_cancelled = true;
                None
            }
            EffectKind::Win(color) => {
                board.declare_winner(color);
                Some(color)
            }
        }
    }
}
