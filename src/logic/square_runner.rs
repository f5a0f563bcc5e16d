//! Interpreter for square-bound behavior graphs (reactive squares).
//!
//! Unlike piece logic, square actions act through a small set of direct
//! board calls — teleport, kill, enable/disable, win, modify-var — all
//! narrowly scoped. Re-entrancy still goes through the dispatcher's
//! pending queue.

use crate::board::Board;
use crate::logic::{
    BehaviorGraph, Block, BlockKind, EventContext, PendingTrigger, Value, VariableBank,
    resolve_sockets,
};
use crate::piece::{Color, Piece};
use crate::square::Square;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::str::FromStr;
use tracing::debug;

/// A behavior graph bound to one square, with its own variable bank.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SquareLogic {
    /// The square's behavior graph.
    #[serde(default, rename = "behaviorGraph", alias = "logic")]
    pub graph: BehaviorGraph,
    /// The square's variable bank.
    #[serde(default)]
    pub variables: VariableBank,
}

/// Trigger ids a square graph can respond to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::EnumString, strum::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum SquareTrigger {
    /// A piece landed on the square.
    OnStep,
    /// A piece ended a move within the configured distance.
    OnProximity,
}

/// Action ids a square graph can execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::EnumString, strum::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum SquareAction {
    /// Move the stepping piece to a fixed square.
    Teleport,
    /// Remove the stepping piece.
    Kill,
    /// Disable this square.
    DisableSquare,
    /// Re-enable this square.
    EnableSquare,
    /// Declare a winner.
    Win,
    /// Edit a variable in the square's bank.
    ModifyVar,
}

/// Runs one trigger event against a square's logic entry.
pub(crate) fn run(
    board: &mut Board,
    _pending: &mut VecDeque<PendingTrigger>,
    square: &Square,
    event: &str,
    context: &EventContext,
) {
    let Ok(event_trigger) = SquareTrigger::from_str(event) else {
        return;
    };
    let Some(graph) = board.square_logic(square).map(|logic| logic.graph.clone()) else {
        return;
    };
    if graph.is_empty() {
        return;
    }

    for trigger_block in graph.triggers() {
        let Ok(op) = SquareTrigger::from_str(&trigger_block.op) else {
            continue;
        };
        if op != event_trigger {
            continue;
        }
        if !trigger_matches(board, square, op, trigger_block, context) {
            continue;
        }
        let Some(child) = trigger_block.child_id.clone() else {
            continue;
        };
        debug!(square = %square, trigger = %op, "square trigger fired");
        run_chain(board, square, &graph, &child, context);
    }
}

fn bank_sockets(board: &Board, square: &Square, block: &Block) -> BTreeMap<String, Value> {
    match board.square_logic(square) {
        Some(logic) => resolve_sockets(&block.socket_values, &logic.variables),
        None => BTreeMap::new(),
    }
}

fn socket_text(vals: &BTreeMap<String, Value>, key: &str) -> Option<String> {
    vals.get(key).map(Value::as_text)
}

fn matches_piece_type(piece: &Piece, expected: Option<String>) -> bool {
    let Some(expected) = expected.filter(|e| !e.is_empty() && e != "Any") else {
        return true;
    };
    let expected = expected.to_lowercase();
    let tag = piece.kind_tag().to_lowercase();
    let name = piece.name().to_lowercase();
    let prefixed = format!("{expected}_");
    tag == expected || tag.starts_with(&prefixed) || name == expected || name.starts_with(&prefixed)
}

fn matches_piece_color(piece: &Piece, expected: Option<String>) -> bool {
    let Some(expected) = expected.filter(|e| !e.is_empty() && e != "Any") else {
        return true;
    };
    piece.color().to_string() == expected.to_lowercase()
}

/// Distance between two squares for proximity checks: hex distance on
/// axial coordinates, Chebyshev on rectangular.
fn proximity_distance(a: &Square, b: &Square) -> Option<i32> {
    if std::mem::discriminant(a) != std::mem::discriminant(b) {
        return None;
    }
    let (ax, ay) = a.coords()?;
    let (bx, by) = b.coords()?;
    let (dx, dy) = (bx - ax, by - ay);
    match a {
        Square::Axial { .. } => Some((dx.abs() + dy.abs() + (dx + dy).abs()) / 2),
        _ => Some(dx.abs().max(dy.abs())),
    }
}

fn trigger_matches(
    board: &Board,
    square: &Square,
    op: SquareTrigger,
    block: &Block,
    context: &EventContext,
) -> bool {
    let vals = bank_sockets(board, square, block);
    let Some(stepper) = context
        .stepper
        .as_deref()
        .and_then(|id| board.piece_by_id(id))
    else {
        return false;
    };
    match op {
        SquareTrigger::OnStep => {
            matches_piece_type(stepper, socket_text(&vals, "pieceType"))
                && matches_piece_color(stepper, socket_text(&vals, "pieceColor"))
        }
        SquareTrigger::OnProximity => {
            let threshold = vals
                .get("distance")
                .map(Value::as_number)
                .filter(|d| *d > 0.0)
                .unwrap_or(1.0) as i32;
            proximity_distance(stepper.square(), square)
                .is_some_and(|dist| dist <= threshold)
        }
    }
}

fn run_chain(
    board: &mut Board,
    square: &Square,
    graph: &BehaviorGraph,
    first_child: &str,
    context: &EventContext,
) {
    let mut current = Some(first_child.to_string());
    let mut steps = 0;
    while let Some(child_id) = current {
        steps += 1;
        if steps > graph.blocks().len() {
            break;
        }
        let Some(block) = graph.block(&child_id) else {
            break;
        };
        current = block.child_id.clone();
        if block.kind != BlockKind::Action {
            continue;
        }
        let Ok(action) = SquareAction::from_str(&block.op) else {
            continue;
        };
        apply_action(board, square, action, block, context);
    }
}

fn apply_action(
    board: &mut Board,
    square: &Square,
    action: SquareAction,
    block: &Block,
    context: &EventContext,
) {
    let vals = bank_sockets(board, square, block);
    let stepper_id = context.stepper.clone();
    match action {
        SquareAction::Teleport => {
            let Some(target) = socket_text(&vals, "targetSquare").filter(|t| !t.is_empty()) else {
                return;
            };
            let target = Square::from(target.as_str());
            let Some(stepper_id) = stepper_id else {
                return;
            };
            let Some(origin) = board.square_of(&stepper_id) else {
                return;
            };
            // Only onto an active, empty square.
            if !board.is_active(&target) || board.piece_at(&target).is_some() {
                return;
            }
            if let Some(mut piece) = board.take_piece(&origin) {
                piece.set_square(target.clone());
                board.put(piece);
                board.note("teleport", Some(target));
            }
        }
        SquareAction::Kill => {
            let Some(origin) = stepper_id.as_deref().and_then(|id| board.square_of(id)) else {
                return;
            };
            if board.take_piece(&origin).is_some() {
                board.note("kill", Some(origin));
            }
        }
        SquareAction::DisableSquare => {
            board.set_active(square, false);
            board.note("disable_square", Some(square.clone()));
        }
        SquareAction::EnableSquare => {
            board.set_active(square, true);
            board.note("enable_square", Some(square.clone()));
        }
        SquareAction::Win => {
            let winner = match socket_text(&vals, "side").as_deref() {
                Some("White") => Some(Color::White),
                Some("Black") => Some(Color::Black),
                _ => stepper_id
                    .as_deref()
                    .and_then(|id| board.piece_by_id(id))
                    .map(Piece::color),
            };
            if let Some(winner) = winner {
                board.declare_winner(winner);
            }
        }
        SquareAction::ModifyVar => {
            let Some(name) = socket_text(&vals, "varName").filter(|n| !n.is_empty()) else {
                return;
            };
            let op = socket_text(&vals, "op").unwrap_or_default();
            let Some(value) = vals.get("value").cloned() else {
                return;
            };
            let Some(logic) = board.square_logic_mut(square) else {
                return;
            };
            let numeric = value.as_text().trim().parse::<f64>().ok();
            match (op.as_str(), numeric) {
                ("+=", Some(v)) => {
                    let next = logic.variables.number(&name) + v;
                    logic.variables.set_number(name.as_str(), next);
                }
                ("-=", Some(v)) => {
                    let next = logic.variables.number(&name) - v;
                    logic.variables.set_number(name.as_str(), next);
                }
                ("=", Some(v)) => logic.variables.set_number(name.as_str(), v),
                ("=", None) => logic.variables.set(name.as_str(), value),
                _ => {}
            }
        }
    }
}
