//! Interpreter for piece-bound behavior graphs.
//!
//! Piece logic never touches the board directly: every action either
//! enqueues an effect or edits the piece's own variable bank. Re-entrant
//! triggers (a `modify-var` firing `on-var`) go through the dispatcher's
//! pending queue.

use crate::board::Board;
use crate::effects::{Effect, EffectPhase, EffectQueue, EffectTarget};
use crate::logic::{
    Block, BlockKind, EventContext, PendingTrigger, TriggerTarget, Value, resolve_sockets,
};
use crate::piece::Piece;
use std::collections::{BTreeMap, VecDeque};
use std::str::FromStr;
use tracing::debug;

/// Trigger ids a piece graph can respond to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::EnumString, strum::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum PieceTrigger {
    /// The piece is about to move.
    OnMove,
    /// The piece captured or is being captured. Editors have spelled this
    /// three ways over time; all parse to the same trigger.
    #[strum(
        to_string = "on-capture",
        serialize = "on-captured",
        serialize = "on-is-captured"
    )]
    OnCapture,
    /// An opposing piece can attack this piece's square.
    OnThreat,
    /// Turn-start environment probe (square color, attacked state).
    OnEnvironment,
    /// The owning side's turn began.
    OnTurnStart,
    /// Cooldown decremented this turn.
    OnCooldownTick,
    /// Cooldown just reached zero.
    OnCooldownEnd,
    /// A variable changed or is being polled.
    OnVar,
}

/// Action ids a piece graph can execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::EnumString, strum::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum PieceAction {
    /// Remove a piece (self or the attacker).
    Kill,
    /// Replace this piece with another kind.
    Transformation,
    /// Edit a variable in the owning bank.
    ModifyVar,
    /// Start a cooldown.
    Cooldown,
    /// Veto the move in flight.
    Prevent,
}

/// Runs one trigger event against a piece's behavior graph.
pub(crate) fn run(
    board: &mut Board,
    queue: &mut EffectQueue,
    phase: EffectPhase,
    pending: &mut VecDeque<PendingTrigger>,
    piece_id: &str,
    event: &str,
    context: &EventContext,
) {
    let Ok(event_trigger) = PieceTrigger::from_str(event) else {
        return;
    };
    let Some(graph) = board
        .piece_by_id(piece_id)
        .and_then(Piece::as_custom)
        .map(|custom| custom.logic.clone())
    else {
        return;
    };
    if graph.is_empty() {
        return;
    }

    for trigger_block in graph.triggers() {
        // Unknown trigger ids are skipped, not errors.
        let Ok(op) = PieceTrigger::from_str(&trigger_block.op) else {
            continue;
        };
        if op != event_trigger {
            continue;
        }
        if !trigger_matches(board, piece_id, op, trigger_block, context) {
            continue;
        }
        let Some(child) = trigger_block.child_id.clone() else {
            continue;
        };
        debug!(piece = piece_id, trigger = %op, "piece trigger fired");
        run_chain(board, queue, phase, pending, piece_id, &graph, &child, context);
    }
}

fn bank_sockets(board: &Board, piece_id: &str, block: &Block) -> BTreeMap<String, Value> {
    match board.piece_by_id(piece_id).and_then(Piece::as_custom) {
        Some(custom) => resolve_sockets(&block.socket_values, &custom.variables),
        None => BTreeMap::new(),
    }
}

fn socket_text(vals: &BTreeMap<String, Value>, key: &str) -> Option<String> {
    vals.get(key).map(Value::as_text)
}

/// Piece-type filter: `Any` (or absent) matches everything; otherwise the
/// kind tag or display name must equal the filter or extend it with an
/// underscore suffix.
fn matches_type(piece: Option<&Piece>, expected: Option<String>) -> bool {
    let Some(expected) = expected.filter(|e| !e.is_empty() && e != "Any") else {
        return true;
    };
    let Some(piece) = piece else {
        return false;
    };
    let expected = expected.to_lowercase();
    let tag = piece.kind_tag().to_lowercase();
    let name = piece.name().to_lowercase();
    let prefixed = format!("{expected}_");
    tag == expected || tag.starts_with(&prefixed) || name == expected || name.starts_with(&prefixed)
}

fn trigger_matches(
    board: &Board,
    piece_id: &str,
    op: PieceTrigger,
    block: &Block,
    context: &EventContext,
) -> bool {
    let vals = bank_sockets(board, piece_id, block);
    match op {
        PieceTrigger::OnCapture => {
            // One trigger covers both roles: "I captured" and "I was
            // captured". The filter applies to the other party.
            if let Some(attacker) = context.attacker.as_deref()
                && attacker != piece_id
            {
                return matches_type(board.piece_by_id(attacker), socket_text(&vals, "by"));
            }
            if let Some(captured) = context.captured.as_deref()
                && captured != piece_id
            {
                return matches_type(board.piece_by_id(captured), socket_text(&vals, "by"));
            }
            false
        }
        PieceTrigger::OnThreat => matches_type(
            context.attacker.as_deref().and_then(|id| board.piece_by_id(id)),
            socket_text(&vals, "by"),
        ),
        PieceTrigger::OnEnvironment => {
            let Some(piece) = board.piece_by_id(piece_id) else {
                return false;
            };
            match socket_text(&vals, "condition").as_deref() {
                Some("White Square") => piece.square().is_light(),
                Some("Black Square") => !piece.square().is_light(),
                Some("Is Attacked") => context.is_attacked,
                _ => true,
            }
        }
        PieceTrigger::OnVar => {
            let Some(name) = socket_text(&vals, "varName").filter(|n| !n.is_empty()) else {
                return false;
            };
            let Some(custom) = board.piece_by_id(piece_id).and_then(Piece::as_custom) else {
                return false;
            };
            let current = custom
                .variables
                .get(&name)
                .cloned()
                .unwrap_or(Value::Number(0.0));
            let expected = vals.get("value").cloned().unwrap_or(Value::Number(0.0));
            let op = socket_text(&vals, "op").unwrap_or_else(|| "==".to_string());
            compare_values(&current, &op, &expected)
        }
        PieceTrigger::OnMove
        | PieceTrigger::OnTurnStart
        | PieceTrigger::OnCooldownTick
        | PieceTrigger::OnCooldownEnd => true,
    }
}

/// Variable comparison: numeric when both sides read as numbers, text
/// equality otherwise (ordered operators are number-only).
fn compare_values(current: &Value, op: &str, expected: &Value) -> bool {
    let numeric = matches!(current, Value::Number(_))
        || current.as_text().trim().parse::<f64>().is_ok();
    let expected_numeric = matches!(expected, Value::Number(_))
        || expected.as_text().trim().parse::<f64>().is_ok();
    if numeric && expected_numeric {
        let c = current.as_number();
        let v = expected.as_number();
        match op {
            "==" => c == v,
            "!=" => c != v,
            ">" => c > v,
            "<" => c < v,
            ">=" => c >= v,
            "<=" => c <= v,
            _ => false,
        }
    } else {
        let c = current.as_text();
        let v = expected.as_text();
        match op {
            "==" => c == v,
            "!=" => c != v,
            _ => false,
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn run_chain(
    board: &mut Board,
    queue: &mut EffectQueue,
    phase: EffectPhase,
    pending: &mut VecDeque<PendingTrigger>,
    piece_id: &str,
    graph: &crate::logic::BehaviorGraph,
    first_child: &str,
    context: &EventContext,
) {
    let mut current = Some(first_child.to_string());
    let mut steps = 0;
    while let Some(child_id) = current {
        // Malformed graphs can link blocks into a loop; bound the walk.
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
        let Ok(action) = PieceAction::from_str(&block.op) else {
            continue;
        };
        apply_action(board, queue, phase, pending, piece_id, action, block, context);
    }
}

#[allow(clippy::too_many_arguments)]
fn apply_action(
    board: &mut Board,
    queue: &mut EffectQueue,
    phase: EffectPhase,
    pending: &mut VecDeque<PendingTrigger>,
    piece_id: &str,
    action: PieceAction,
    block: &Block,
    context: &EventContext,
) {
    let vals = bank_sockets(board, piece_id, block);
    match action {
        PieceAction::Kill => {
            let attacker_target = socket_text(&vals, "target").as_deref() == Some("Attacker");
            let victim_id = if attacker_target {
                context.attacker.clone()
            } else {
                Some(piece_id.to_string())
            };
            let Some(victim_id) = victim_id else {
                return;
            };
            let Some(square) = board.square_of(&victim_id) else {
                return;
            };
            queue.enqueue(Effect::remove(square, phase));
            // Killing the mover (self, or the attacker mid-capture) means
            // the move in flight cannot complete.
            let killed_mover = victim_id == piece_id
                || context.attacker.as_deref() == Some(victim_id.as_str());
            if killed_mover {
                queue.enqueue(Effect::cancel_move(phase));
            }
        }
        PieceAction::Transformation => {
            let Some(new_kind) = socket_text(&vals, "target").filter(|t| !t.is_empty()) else {
                return;
            };
            queue.enqueue(Effect::transform(
                EffectTarget::Piece(piece_id.to_string()),
                new_kind,
                phase,
            ));
        }
        PieceAction::ModifyVar => {
            let Some(name) = socket_text(&vals, "varName").filter(|n| !n.is_empty()) else {
                return;
            };
            let op = socket_text(&vals, "op").unwrap_or_default();
            let Some(value) = vals.get("value").cloned() else {
                return;
            };
            let Some(custom) = board
                .piece_by_id_mut(piece_id)
                .and_then(Piece::as_custom_mut)
            else {
                return;
            };
            let numeric = value.as_text().trim().parse::<f64>().ok();
            match (op.as_str(), numeric) {
                ("+=", Some(v)) => {
                    let next = custom.variables.number(&name) + v;
                    custom.variables.set_number(name.as_str(), next);
                }
                ("-=", Some(v)) => {
                    let next = custom.variables.number(&name) - v;
                    custom.variables.set_number(name.as_str(), next);
                }
                ("=", Some(v)) => custom.variables.set_number(name.as_str(), v),
                ("=", None) => custom.variables.set(name.as_str(), value),
                _ => return,
            }
            // Let on-var triggers observe the change, via the pending
            // queue rather than recursion.
            pending.push_back(PendingTrigger {
                target: TriggerTarget::Piece(piece_id.to_string()),
                event: PieceTrigger::OnVar.to_string(),
                context: EventContext::default(),
            });
        }
        PieceAction::Cooldown => {
            let duration = vals.get("duration").map(Value::as_number).unwrap_or(0.0);
            if duration > 0.0
                && let Some(custom) = board
                    .piece_by_id_mut(piece_id)
                    .and_then(Piece::as_custom_mut)
            {
                custom.variables.set_number("cooldown", duration);
            }
        }
        PieceAction::Prevent => {
            queue.enqueue(Effect::cancel_move(phase));
        }
    }
}
