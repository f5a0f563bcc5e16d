//! Piece polymorphism: the closed variant set over standard chess pieces
//! and data-defined custom pieces.
//!
//! Every variant answers the same two capability questions — "is this move
//! legal" and "does this piece attack that square" — against a board passed
//! per call. Pieces never hold a reference back to the board.

mod custom;
mod rules;
mod standard;

pub use custom::{CustomPiece, PieceShape};
pub use rules::{Chain, CmpOp, Condition, MoveDelta, MoveRule, RuleOutcome, SpatialVar, TraversalMode};

use crate::board::Board;
use crate::logic::{BehaviorGraph, VariableBank};
use crate::square::Square;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Side a piece belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    /// White moves first in the standard setup.
    White,
    /// Black.
    Black,
}

impl Color {
    /// The opposing side.
    pub fn opponent(self) -> Self {
        match self {
            Color::White => Color::Black,
            Color::Black => Color::White,
        }
    }
}

impl std::fmt::Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Color::White => write!(f, "white"),
            Color::Black => write!(f, "black"),
        }
    }
}

/// The six standard piece kinds with fixed geometric rules.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    strum::EnumString,
    strum::IntoStaticStr,
    strum::EnumIter,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum StandardKind {
    /// Forward stepper with diagonal captures.
    Pawn,
    /// L-shaped jumper.
    Knight,
    /// Diagonal slider.
    Bishop,
    /// Orthogonal slider.
    Rook,
    /// Rook plus bishop.
    Queen,
    /// One-step royal piece.
    King,
}

/// Movement family of a piece.
#[derive(Debug, Clone, PartialEq)]
pub enum PieceKind {
    /// Fixed-geometry standard piece.
    Standard(StandardKind),
    /// Data-defined piece carrying rules, logic, and variables.
    Custom(Box<CustomPiece>),
}

/// A piece on the board.
#[derive(Debug, Clone, PartialEq)]
pub struct Piece {
    id: String,
    name: String,
    color: Color,
    square: Square,
    has_moved: bool,
    kind: PieceKind,
}

impl Piece {
    /// Creates a standard piece.
    pub fn standard(id: impl Into<String>, kind: StandardKind, color: Color, square: Square) -> Self {
        let tag: &'static str = kind.into();
        Self {
            id: id.into(),
            name: tag.to_string(),
            color,
            square,
            has_moved: false,
            kind: PieceKind::Standard(kind),
        }
    }

    /// Creates a data-defined piece.
    pub fn custom(
        id: impl Into<String>,
        color: Color,
        square: Square,
        custom: CustomPiece,
    ) -> Self {
        Self {
            id: id.into(),
            name: custom.tag.clone(),
            color,
            square,
            has_moved: false,
            kind: PieceKind::Custom(Box::new(custom)),
        }
    }

    /// Builds a piece from serialized parts.
    ///
    /// A known standard type with no rules and no logic becomes a standard
    /// piece; anything else — rules, logic, or an unrecognized type tag —
    /// becomes a data-defined piece.
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        id: impl Into<String>,
        type_tag: &str,
        color: Color,
        square: Square,
        rules: Vec<MoveRule>,
        logic: BehaviorGraph,
        variables: VariableBank,
        shape: Option<PieceShape>,
        name: Option<String>,
    ) -> Self {
        let mut piece = if rules.is_empty()
            && logic.is_empty()
            && variables.is_empty()
            && shape.is_none()
            && let Ok(kind) = StandardKind::from_str(type_tag)
        {
            Piece::standard(id, kind, color, square)
        } else {
            Piece::custom(
                id,
                color,
                square,
                CustomPiece {
                    tag: type_tag.to_string(),
                    rules,
                    logic,
                    variables,
                    shape,
                },
            )
        };
        if let Some(name) = name {
            piece.name = name;
        }
        piece
    }

    /// Stable piece id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Display name; defaults to the kind tag.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Owning side.
    pub fn color(&self) -> Color {
        self.color
    }

    /// Current square.
    pub fn square(&self) -> &Square {
        &self.square
    }

    /// Whether the piece has moved.
    pub fn has_moved(&self) -> bool {
        self.has_moved
    }

    /// Movement family.
    pub fn kind(&self) -> &PieceKind {
        &self.kind
    }

    /// Kind tag: `"pawn"`, `"rook"`, or the custom type string.
    pub fn kind_tag(&self) -> &str {
        match &self.kind {
            PieceKind::Standard(kind) => (*kind).into(),
            PieceKind::Custom(custom) => &custom.tag,
        }
    }

    /// Whether this is a data-defined piece.
    pub fn is_custom(&self) -> bool {
        matches!(self.kind, PieceKind::Custom(_))
    }

    /// Data-defined payload, if any.
    pub fn as_custom(&self) -> Option<&CustomPiece> {
        match &self.kind {
            PieceKind::Custom(custom) => Some(custom),
            PieceKind::Standard(_) => None,
        }
    }

    /// Mutable data-defined payload, if any.
    pub fn as_custom_mut(&mut self) -> Option<&mut CustomPiece> {
        match &mut self.kind {
            PieceKind::Custom(custom) => Some(custom),
            PieceKind::Standard(_) => None,
        }
    }

    /// Whether the piece fills the king role (standard king or a custom
    /// piece tagged as one).
    pub fn is_king(&self) -> bool {
        self.kind_tag().eq_ignore_ascii_case("king")
    }

    /// Whether the piece fills the pawn role.
    pub fn is_pawn(&self) -> bool {
        self.kind_tag().eq_ignore_ascii_case("pawn")
    }

    /// Remaining cooldown; standard pieces never cool down.
    pub fn cooldown(&self) -> f64 {
        self.as_custom()
            .map(|c| c.variables.number("cooldown"))
            .unwrap_or(0.0)
    }

    /// Whether moving `from` → `to` is legal for this piece on `board`.
    ///
    /// This is the piece-geometry layer only; side-to-move, check safety,
    /// and trigger vetoes live in the validator.
    pub fn is_legal_move(&self, from: &Square, to: &Square, board: &Board) -> bool {
        match &self.kind {
            PieceKind::Standard(kind) => {
                standard::is_legal_move(*kind, self.color, from, to, board)
            }
            PieceKind::Custom(custom) => custom.is_legal_move(self.color, from, to, board),
        }
    }

    /// Whether this piece attacks `target` from its current square.
    pub fn can_attack(&self, target: &Square, board: &Board) -> bool {
        match &self.kind {
            PieceKind::Standard(kind) => {
                standard::can_attack(*kind, self.color, &self.square, target, board)
            }
            PieceKind::Custom(custom) => custom.is_legal_move(self.color, &self.square, target, board),
        }
    }

    pub(crate) fn set_square(&mut self, square: Square) {
        self.square = square;
    }

    pub(crate) fn set_has_moved(&mut self, moved: bool) {
        self.has_moved = moved;
    }
}
