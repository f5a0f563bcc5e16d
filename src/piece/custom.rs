//! Data-defined pieces: movement from rules, behavior from graphs.

use crate::board::Board;
use crate::logic::{BehaviorGraph, VariableBank};
use crate::piece::rules::{MoveDelta, MoveRule, RuleOutcome, TraversalMode};
use crate::piece::{Color, StandardKind, standard};
use crate::square::Square;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Multi-cell footprint of a custom piece: extension offsets relative to
/// the anchor cell the piece stands on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PieceShape {
    /// Anchor cell, kept for editor round-trips.
    pub anchor: [i32; 2],
    /// Occupied cells relative to the anchor.
    pub extensions: Vec<[i32; 2]>,
}

/// Payload of a data-defined piece.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomPiece {
    /// User-chosen kind tag.
    pub tag: String,
    /// Ordered move rules; order matters for slide fall-through.
    pub rules: Vec<MoveRule>,
    /// Reactive behavior graph.
    pub logic: BehaviorGraph,
    /// Mutable variable bank (cooldown counters and friends).
    pub variables: VariableBank,
    /// Optional multi-cell footprint.
    pub shape: Option<PieceShape>,
}

impl CustomPiece {
    /// Rule-driven move legality.
    ///
    /// Evaluation order mirrors the editor contract: a matched disallow
    /// rule vetoes immediately, a matched allow rule whose slide path is
    /// blocked falls through to later rules, and legality requires at least
    /// one surviving allow match.
    pub fn is_legal_move(&self, color: Color, from: &Square, to: &Square, board: &Board) -> bool {
        // A cooling-down piece cannot move at all.
        if self.variables.number("cooldown") > 0.0 {
            return false;
        }
        if board.piece_at(to).is_some_and(|p| p.color() == color) {
            return false;
        }

        if self.rules.is_empty() {
            // No custom rules: borrow the standard geometry of the declared
            // type when it names one.
            return match StandardKind::from_str(&self.tag) {
                Ok(kind) => standard::is_legal_move(kind, color, from, to, board),
                Err(_) => false,
            };
        }

        let Some(delta) = MoveDelta::compute(color, from, to, board.is_hex()) else {
            return false;
        };

        let mut allowed = false;
        for rule in &self.rules {
            if !rule.matches(&delta) {
                continue;
            }
            match rule.result {
                RuleOutcome::Disallow => return false,
                RuleOutcome::Allow => {
                    if rule.mode == TraversalMode::Slide
                        && !slide_path_clear(board, from, delta.dx, delta.dy)
                    {
                        // Blocked slide: keep trying later rules.
                        continue;
                    }
                    allowed = true;
                }
            }
        }
        allowed
    }
}

/// Checks the straight GCD-step path between the endpoints: every
/// intermediate square must be empty and active.
fn slide_path_clear(board: &Board, from: &Square, dx: i32, dy: i32) -> bool {
    let steps = gcd(dx.abs(), dy.abs());
    if steps <= 1 {
        return true;
    }
    let step = (dx / steps, dy / steps);
    for i in 1..steps {
        let Some(square) = from.offset(step.0 * i, step.1 * i) else {
            return false;
        };
        if board.piece_at(&square).is_some() || !board.is_active(&square) {
            return false;
        }
    }
    true
}

fn gcd(a: i32, b: i32) -> i32 {
    if b == 0 { a } else { gcd(b, a % b) }
}
