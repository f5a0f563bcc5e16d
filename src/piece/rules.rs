//! Typed move-rule expressions for data-defined pieces.
//!
//! Rules deserialize straight into this tree, so the nested editor format is
//! parsed exactly once at load time and legality checks evaluate typed data.
//! A rule is an ordered conjunction/disjunction chain of spatial conditions;
//! the chain folds left to right with no operator precedence, matching the
//! editor's reading order.

use crate::piece::Color;
use crate::square::Square;
use serde::{Deserialize, Serialize};

/// Spatial quantity a condition compares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SpatialVar {
    /// Signed file delta.
    DiffX,
    /// Signed rank delta, forward-positive for the moving color.
    DiffY,
    /// Absolute file delta.
    AbsDiffX,
    /// Absolute rank delta.
    AbsDiffY,
    /// Generalized distance: hex cube distance on hex boards, Chebyshev
    /// otherwise.
    Dist,
}

/// Comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CmpOp {
    /// Equality. The editor emits `"==="`.
    #[serde(rename = "===", alias = "==")]
    Eq,
    /// Strictly greater.
    #[serde(rename = ">")]
    Gt,
    /// Strictly less.
    #[serde(rename = "<")]
    Lt,
    /// Greater or equal.
    #[serde(rename = ">=")]
    Ge,
    /// Less or equal.
    #[serde(rename = "<=")]
    Le,
}

impl CmpOp {
    /// Applies the comparison.
    pub fn compare(self, lhs: i32, rhs: i32) -> bool {
        match self {
            CmpOp::Eq => lhs == rhs,
            CmpOp::Gt => lhs > rhs,
            CmpOp::Lt => lhs < rhs,
            CmpOp::Ge => lhs >= rhs,
            CmpOp::Le => lhs <= rhs,
        }
    }
}

/// Connective linking a condition to the one after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Chain {
    /// Both sides must hold.
    #[default]
    And,
    /// Either side may hold.
    Or,
}

/// One spatial condition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    /// Quantity under test.
    pub variable: SpatialVar,
    /// Comparison operator.
    pub operator: CmpOp,
    /// Literal to compare against.
    pub value: i32,
    /// Connective to the next condition in the chain.
    #[serde(default)]
    pub logic: Chain,
}

/// Whether a matched rule allows or vetoes the move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleOutcome {
    /// Matching geometry is legal.
    Allow,
    /// Matching geometry is illegal, overriding any allow.
    Disallow,
}

/// How a matched allow rule traverses the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TraversalMode {
    /// Intermediate squares are ignored.
    #[default]
    Jump,
    /// Every intermediate square on the straight path must be empty and
    /// active. Legacy rulesets spell this `run` or `running`.
    #[serde(alias = "run", alias = "running")]
    Slide,
}

/// One ordered move rule of a data-defined piece.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveRule {
    /// Condition chain, folded left to right.
    #[serde(default)]
    pub conditions: Vec<Condition>,
    /// Allow or veto on match.
    pub result: RuleOutcome,
    /// Traversal mode for allow rules.
    #[serde(default, rename = "mode", alias = "type")]
    pub mode: TraversalMode,
}

impl MoveRule {
    /// Whether the rule's condition chain matches the given deltas.
    ///
    /// An empty chain always matches.
    pub fn matches(&self, delta: &MoveDelta) -> bool {
        let mut result = true;
        let mut connective = Chain::And;
        for (index, cond) in self.conditions.iter().enumerate() {
            let satisfied = cond.operator.compare(delta.get(cond.variable), cond.value);
            if index == 0 {
                result = satisfied;
            } else {
                result = match connective {
                    Chain::And => result && satisfied,
                    Chain::Or => result || satisfied,
                };
            }
            connective = cond.logic;
        }
        result
    }
}

/// Color-normalized deltas of a candidate move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveDelta {
    /// Signed file delta.
    pub dx: i32,
    /// Raw signed rank delta (board orientation).
    pub dy: i32,
    /// Forward-positive rank delta for the moving color.
    pub dy_forward: i32,
    /// Absolute file delta.
    pub adx: i32,
    /// Absolute rank delta.
    pub ady: i32,
    /// Generalized distance.
    pub dist: i32,
}

impl MoveDelta {
    /// Computes deltas between two squares for a mover of the given color.
    ///
    /// Returns `None` when either square has no coordinates (custom-graph
    /// named squares) or the squares use different coordinate systems.
    pub fn compute(color: Color, from: &Square, to: &Square, hex: bool) -> Option<Self> {
        let (fx, fy) = from.coords()?;
        let (tx, ty) = to.coords()?;
        if std::mem::discriminant(from) != std::mem::discriminant(to) {
            return None;
        }
        let dx = tx - fx;
        let dy = ty - fy;
        // "Forward" is color-relative: on rectangular boards white advances
        // up the ranks; on hex boards white advances toward negative r.
        let dy_forward = match (hex, color) {
            (true, Color::White) => -dy,
            (true, Color::Black) => dy,
            (false, Color::White) => dy,
            (false, Color::Black) => -dy,
        };
        let adx = dx.abs();
        let ady = dy.abs();
        let dist = if hex {
            (dx.abs() + dy.abs() + (dx + dy).abs()) / 2
        } else {
            adx.max(ady)
        };
        Some(Self {
            dx,
            dy,
            dy_forward,
            adx,
            ady,
            dist,
        })
    }

    /// Value of a spatial variable for this delta.
    pub fn get(&self, var: SpatialVar) -> i32 {
        match var {
            SpatialVar::DiffX => self.dx,
            SpatialVar::DiffY => self.dy_forward,
            SpatialVar::AbsDiffX => self.adx,
            SpatialVar::AbsDiffY => self.ady,
            SpatialVar::Dist => self.dist,
        }
    }
}
