//! Ruleset (de)serialization: the single wire format for boards, pieces,
//! square state, and square logic.
//!
//! Loading refuses rulesets newer than this engine understands and runs
//! older ones through a forward-migration chain. Saving captures only
//! non-default square state to keep files small.

use crate::board::Board;
use crate::game::Game;
use crate::logic::{BehaviorGraph, SquareLogic, VariableBank};
use crate::piece::{Color, MoveRule, Piece, PieceShape};
use crate::square::Square;
use crate::topology::Topology;
use chrono::{DateTime, Utc};
use derive_getters::Getters;
use derive_more::{Display, Error, From};
use derive_new::new;
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use std::collections::BTreeMap;
use tracing::{instrument, warn};

/// Current ruleset format version. Increment on breaking changes.
pub const RULESET_VERSION: u32 = 1;

/// Errors that can occur when loading a ruleset.
#[derive(Debug, Display, Error, From)]
pub enum LoadError {
    /// The ruleset was produced by a newer engine.
    #[display("ruleset version {found} is newer than supported version {supported}")]
    #[from(ignore)]
    VersionTooNew {
        /// Version found in the file.
        found: u32,
        /// Newest version this engine reads.
        supported: u32,
    },
    /// The JSON could not be parsed into a ruleset.
    #[display("malformed ruleset: {_0}")]
    Parse(serde_json::Error),
}

/// Descriptive metadata carried by a ruleset.
#[derive(Debug, Clone, PartialEq, Getters, new, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    /// Display name of the variant.
    name: String,
    /// Optional description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    /// Optional author.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    author: Option<String>,
    /// Creation timestamp, stamped at capture time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    created_at: Option<DateTime<Utc>>,
}

impl Metadata {
    /// Metadata with just a name.
    pub fn named(name: impl Into<String>) -> Self {
        Metadata::new(name.into(), None, None, None)
    }
}

/// Serialized piece.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PieceDef {
    /// Stable piece id.
    pub id: String,
    /// Kind tag ("pawn", "rook", or a custom type string).
    #[serde(rename = "type")]
    pub kind: String,
    /// Display name, when it differs from the kind tag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Owner.
    pub color: Color,
    /// Current square.
    pub position: Square,
    /// Moved flag.
    #[serde(default)]
    pub has_moved: bool,
    /// Move rules (data-defined pieces).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rules: Vec<MoveRule>,
    /// Behavior graph (data-defined pieces).
    #[serde(default, skip_serializing_if = "BehaviorGraph::is_empty")]
    pub logic: BehaviorGraph,
    /// Variable bank (data-defined pieces).
    #[serde(default, skip_serializing_if = "VariableBank::is_empty")]
    pub variables: VariableBank,
    /// Multi-cell footprint, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shape: Option<PieceShape>,
}

/// Serialized auxiliary state of one square.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SquareStateDef {
    /// Tags on the square.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Disabled flag.
    #[serde(default)]
    pub disabled: bool,
    /// Free-form properties.
    #[serde(default)]
    pub custom_props: BTreeMap<String, Json>,
}

/// Serialized turn/winner state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameStateDef {
    /// Side to move.
    pub turn: Color,
    /// Declared winner, if the game ended.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winner: Option<Color>,
}

/// A complete serialized ruleset.
#[derive(Debug, Clone, PartialEq, Getters, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ruleset {
    /// Format version.
    version: u32,
    /// Descriptive metadata.
    metadata: Metadata,
    /// Board structure.
    topology: Topology,
    /// Every piece with its position.
    pieces: Vec<PieceDef>,
    /// Non-default square state keyed by square.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    square_states: BTreeMap<Square, SquareStateDef>,
    /// Square-bound logic keyed by square.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    square_logic: BTreeMap<Square, SquareLogic>,
    /// Turn and winner.
    game_state: GameStateDef,
}

impl Ruleset {
    /// Captures the live state of a board into a ruleset, stamping the
    /// creation time.
    #[instrument(skip(board))]
    pub fn capture(board: &Board, mut metadata: Metadata) -> Self {
        metadata.created_at = Some(Utc::now());

        let pieces = board
            .pieces()
            .map(|piece| {
                let custom = piece.as_custom();
                PieceDef {
                    id: piece.id().to_string(),
                    kind: piece.kind_tag().to_string(),
                    name: (piece.name() != piece.kind_tag())
                        .then(|| piece.name().to_string()),
                    color: piece.color(),
                    position: piece.square().clone(),
                    has_moved: piece.has_moved(),
                    rules: custom.map(|c| c.rules.clone()).unwrap_or_default(),
                    logic: custom.map(|c| c.logic.clone()).unwrap_or_default(),
                    variables: custom.map(|c| c.variables.clone()).unwrap_or_default(),
                    shape: custom.and_then(|c| c.shape.clone()),
                }
            })
            .collect();

        // Only non-default square state earns a place in the file.
        let square_states = board
            .square_states()
            .filter(|(_, state)| !state.is_default())
            .map(|(square, state)| {
                (
                    square.clone(),
                    SquareStateDef {
                        tags: state.tags.iter().cloned().collect(),
                        disabled: state.disabled,
                        custom_props: state.props.clone(),
                    },
                )
            })
            .collect();

        let square_logic = board
            .square_logic_entries()
            .map(|(square, logic)| (square.clone(), logic.clone()))
            .collect();

        Self {
            version: RULESET_VERSION,
            metadata,
            topology: board.topology().clone(),
            pieces,
            square_states,
            square_logic,
            game_state: GameStateDef {
                turn: board.turn(),
                winner: board.winner(),
            },
        }
    }

    /// Reconstructs a board from this ruleset.
    ///
    /// Rejects rulesets newer than [`RULESET_VERSION`]; older versions are
    /// migrated forward first.
    #[instrument(skip(self), fields(version = self.version))]
    pub fn into_board(self) -> Result<Board, LoadError> {
        if self.version > RULESET_VERSION {
            return Err(LoadError::VersionTooNew {
                found: self.version,
                supported: RULESET_VERSION,
            });
        }
        let ruleset = self.migrate();

        let mut board = Board::new(ruleset.topology);
        board.set_turn(ruleset.game_state.turn);
        board.set_winner(ruleset.game_state.winner);

        for def in ruleset.pieces {
            if !board.topology().contains(&def.position) {
                // Tolerated so hand-edited files still load; the square is
                // simply unreachable.
                warn!(piece = %def.id, position = %def.position, "piece outside topology");
            }
            board.put(Piece::from_parts(
                def.id,
                &def.kind,
                def.color,
                def.position,
                def.rules,
                def.logic,
                def.variables,
                def.shape,
                def.name,
            ));
        }

        for (square, def) in ruleset.square_states {
            let state = board.square_state_mut(&square);
            state.tags = def.tags.into_iter().collect();
            state.disabled = def.disabled;
            state.props = def.custom_props;
        }

        for (square, logic) in ruleset.square_logic {
            board.set_square_logic(square, logic);
        }

        Ok(board)
    }

    /// Reconstructs a full game instance.
    pub fn into_game(self) -> Result<Game, LoadError> {
        Ok(Game::with_board(self.into_board()?))
    }

    /// Applies forward migrations for rulesets written by older engines.
    fn migrate(self) -> Self {
        // Version 0 files predate squareLogic and metadata timestamps;
        // both default cleanly, so the chain is currently structural only.
        match self.version {
            0 => Self {
                version: RULESET_VERSION,
                ..self
            },
            _ => self,
        }
    }

    /// Parses a ruleset from JSON.
    pub fn from_json(json: &str) -> Result<Self, LoadError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Renders the ruleset as pretty JSON.
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }
}

/// Loads a game straight from a JSON ruleset.
pub fn load_game(json: &str) -> Result<Game, LoadError> {
    Ruleset::from_json(json)?.into_game()
}
