//! Strictly Chess - a type-safe chess variant engine.
//!
//! Users define custom pieces and board shapes as data — move rules,
//! behavior graphs, variable banks, topologies — and the engine plays the
//! resulting variant deterministically.
//!
//! # Architecture
//!
//! - **Topology**: pure structural graph of squares (rectangular, hex, or
//!   an explicit adjacency graph)
//! - **Board**: mutable occupancy, turn, history, and per-square state
//! - **Pieces**: a closed variant set of standard kinds plus data-defined
//!   custom pieces
//! - **Validator**: three-layer legality pipeline (structural, rule-based,
//!   trigger veto) with speculative king-safety trials on board clones
//! - **Effects**: the phased queue through which all reactive logic
//!   mutates state
//! - **Logic runners**: interpreters for piece-bound and square-bound
//!   behavior graphs with bounded re-entrant dispatch
//! - **Snapshots**: deep pre-move clones backing undo
//!
//! # Example
//!
//! ```
//! use strictly_chess::{Game, Square};
//!
//! let mut game = Game::new();
//! // White pawn e2 → e4.
//! assert!(game.attempt_move(&Square::from("e2"), &Square::from("e4"), None));
//! assert!(!game.attempt_move(&Square::from("e2"), &Square::from("e4"), None));
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Private module declarations
mod board;
mod effects;
mod game;
pub mod invariants;
mod logic;
mod piece;
mod serialization;
mod square;
mod topology;
mod validator;

// Crate-level exports - board state
pub use board::{Board, EffectNote, MoveRecord, SquareState};

// Crate-level exports - effect engine
pub use effects::{Effect, EffectKind, EffectPhase, EffectQueue, EffectTarget, SquareStatePatch};

// Crate-level exports - game facade
pub use game::{Game, GameStatus, ObserverId};

// Crate-level exports - behavior graphs and runners
pub use logic::{
    BehaviorGraph, Block, BlockKind, Dispatcher, EventContext, MAX_TRIGGER_ITERATIONS,
    PendingTrigger, PieceAction, PieceTrigger, SocketValue, SquareAction, SquareLogic,
    SquareTrigger, TriggerTarget, Value, VariableBank, VariableMarker,
};

// Crate-level exports - pieces and move rules
pub use piece::{
    Chain, CmpOp, Color, Condition, CustomPiece, MoveDelta, MoveRule, Piece, PieceKind,
    PieceShape, RuleOutcome, SpatialVar, StandardKind, TraversalMode,
};

// Crate-level exports - serialization
pub use serialization::{
    GameStateDef, LoadError, Metadata, PieceDef, RULESET_VERSION, Ruleset, SquareStateDef,
    load_game,
};

// Crate-level exports - structure
pub use square::Square;
pub use topology::Topology;

// Crate-level exports - validator
pub use validator::is_legal_move;
