//! Data-defined behavior graphs and the trigger dispatch machinery.
//!
//! A behavior graph is a flat list of linked blocks: trigger blocks match
//! incoming events, and each trigger roots a singly-linked chain of action
//! blocks. Graphs are user-authored data; unknown trigger or action ids are
//! skipped rather than treated as errors, so a ruleset built with a newer
//! editor still loads and plays.
//!
//! Dispatch is re-entrant-safe by construction: a trigger that arrives while
//! a run is active joins a pending queue drained after the current run, with
//! a fixed iteration ceiling to break cycles.

mod piece_runner;
mod square_runner;

pub use piece_runner::{PieceAction, PieceTrigger};
pub use square_runner::{SquareAction, SquareLogic, SquareTrigger};

use crate::board::Board;
use crate::effects::{EffectPhase, EffectQueue};
use crate::square::Square;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use tracing::warn;

/// Ceiling on pending triggers drained per dispatch. Exceeding it is treated
/// as a runaway cycle: a warning is logged and the remainder discarded.
pub const MAX_TRIGGER_ITERATIONS: usize = 20;

// ─────────────────────────────────────────────────────────────
//  Variable banks
// ─────────────────────────────────────────────────────────────

/// A value in a variable bank: JSON-style number or text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Numeric value.
    Number(f64),
    /// Text value.
    Text(String),
}

impl Value {
    /// Numeric view of the value; text parses when it looks like a number,
    /// otherwise zero.
    pub fn as_number(&self) -> f64 {
        match self {
            Value::Number(n) => *n,
            Value::Text(s) => s.trim().parse().unwrap_or(0.0),
        }
    }

    /// Text view of the value.
    pub fn as_text(&self) -> String {
        match self {
            Value::Number(n) => {
                if n.fract() == 0.0 {
                    format!("{}", *n as i64)
                } else {
                    format!("{n}")
                }
            }
            Value::Text(s) => s.clone(),
        }
    }
}

/// Named mutable values owned by a piece or a square logic entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VariableBank {
    entries: BTreeMap<String, Value>,
}

impl VariableBank {
    /// Empty bank.
    pub fn new() -> Self {
        Self::default()
    }

    /// Value of a variable, if set.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries.get(name)
    }

    /// Numeric value of a variable; unset variables read as zero.
    pub fn number(&self, name: &str) -> f64 {
        self.entries.get(name).map(Value::as_number).unwrap_or(0.0)
    }

    /// Sets a variable.
    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.entries.insert(name.into(), value);
    }

    /// Sets a numeric variable.
    pub fn set_number(&mut self, name: impl Into<String>, value: f64) {
        self.set(name, Value::Number(value));
    }

    /// Whether the bank has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ─────────────────────────────────────────────────────────────
//  Behavior graph blocks
// ─────────────────────────────────────────────────────────────

/// Role of a block within a graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockKind {
    /// Root block matched against incoming events.
    Trigger,
    /// Chained block executed when its trigger fires.
    Action,
}

/// Marker for the `{"type": "variable"}` socket payload shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariableMarker {
    /// The only accepted tag.
    Variable,
}

/// A socket value on a block: either a literal or a reference into the
/// owning entity's variable bank.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SocketValue {
    /// Reference to a variable by name. `variable_only` sockets resolve to
    /// the variable's name rather than its value.
    Reference {
        /// Discriminator, always `"variable"`.
        #[serde(rename = "type")]
        marker: VariableMarker,
        /// Variable name.
        name: String,
        /// Resolve to the name itself instead of the stored value.
        #[serde(default, rename = "variableOnly")]
        variable_only: bool,
    },
    /// Literal JSON value.
    Literal(serde_json::Value),
}

/// One block of a behavior graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    /// Unique id of this block instance within the graph.
    #[serde(rename = "instanceId")]
    pub instance_id: String,
    /// Trigger or action role.
    #[serde(rename = "blockKind")]
    pub kind: BlockKind,
    /// Trigger or action id, e.g. `"on-move"` or `"kill"`.
    #[serde(rename = "triggerOrActionId")]
    pub op: String,
    /// Socket inputs keyed by socket name.
    #[serde(default, rename = "socketValues")]
    pub socket_values: BTreeMap<String, SocketValue>,
    /// Next block in the chain.
    #[serde(default, rename = "childId")]
    pub child_id: Option<String>,
}

/// A behavior graph: a flat block list with trigger-rooted chains.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BehaviorGraph {
    blocks: Vec<Block>,
}

impl BehaviorGraph {
    /// Empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Graph from a block list.
    pub fn from_blocks(blocks: Vec<Block>) -> Self {
        Self { blocks }
    }

    /// All blocks.
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Whether the graph has no blocks.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Block by instance id.
    pub fn block(&self, instance_id: &str) -> Option<&Block> {
        self.blocks.iter().find(|b| b.instance_id == instance_id)
    }

    /// All trigger blocks of the graph.
    pub fn triggers(&self) -> impl Iterator<Item = &Block> {
        self.blocks.iter().filter(|b| b.kind == BlockKind::Trigger)
    }
}

/// Resolves a block's sockets against a variable bank.
///
/// Variable references resolve to the stored value (unset reads as zero);
/// `variableOnly` references and `varName` sockets resolve to the variable
/// name itself so actions can address the bank.
pub(crate) fn resolve_sockets(
    sockets: &BTreeMap<String, SocketValue>,
    bank: &VariableBank,
) -> BTreeMap<String, Value> {
    let mut resolved = BTreeMap::new();
    for (key, socket) in sockets {
        let value = match socket {
            SocketValue::Reference {
                name,
                variable_only,
                ..
            } => {
                if *variable_only || key == "varName" {
                    Value::Text(name.clone())
                } else {
                    bank.get(name).cloned().unwrap_or(Value::Number(0.0))
                }
            }
            SocketValue::Literal(json) => match json {
                serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(0.0)),
                serde_json::Value::String(s) => Value::Text(s.clone()),
                serde_json::Value::Bool(b) => Value::Number(if *b { 1.0 } else { 0.0 }),
                _ => Value::Number(0.0),
            },
        };
        resolved.insert(key.clone(), value);
    }
    resolved
}

// ─────────────────────────────────────────────────────────────
//  Trigger dispatch
// ─────────────────────────────────────────────────────────────

/// Who a trigger event is addressed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerTarget {
    /// A piece's behavior graph, addressed by piece id.
    Piece(String),
    /// A square's logic entry.
    Square(Square),
}

/// Context accompanying a trigger event. Fields are filled per event kind;
/// the rest stay `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventContext {
    /// Origin square of the move in flight.
    pub from: Option<Square>,
    /// Destination square of the move in flight.
    pub to: Option<Square>,
    /// Attacking piece id (capture and threat events).
    pub attacker: Option<String>,
    /// Captured piece id (capture events).
    pub captured: Option<String>,
    /// Piece id that stepped or moved (square events).
    pub stepper: Option<String>,
    /// Whether the owning piece is currently attacked (environment events).
    pub is_attacked: bool,
    /// Remaining cooldown (cooldown tick events).
    pub remaining: Option<f64>,
}

/// A queued trigger awaiting dispatch.
#[derive(Debug, Clone)]
pub struct PendingTrigger {
    /// Addressee.
    pub target: TriggerTarget,
    /// Event name, e.g. `"on-move"`.
    pub event: String,
    /// Event context.
    pub context: EventContext,
}

/// Bounded work queue for trigger dispatch.
///
/// Actions never call back into the dispatcher; they append to the pending
/// queue, which the top-level dispatch drains. This keeps stack depth flat
/// and makes the cycle bound enforceable.
#[derive(Debug, Default)]
pub struct Dispatcher {
    pending: VecDeque<PendingTrigger>,
    executing: bool,
}

impl Dispatcher {
    /// New idle dispatcher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Dispatches a trigger event, draining any triggers enqueued by the
    /// actions it runs. Effects from piece logic land in `queue` with the
    /// given `phase`; square logic acts on the board directly.
    pub fn dispatch(
        &mut self,
        board: &mut Board,
        queue: &mut EffectQueue,
        phase: EffectPhase,
        target: TriggerTarget,
        event: &str,
        context: EventContext,
    ) {
        self.pending.push_back(PendingTrigger {
            target,
            event: event.to_string(),
            context,
        });
        if self.executing {
            // A run is active further up the stack; it drains the queue.
            return;
        }
        self.executing = true;

        let mut iterations = 0;
        while let Some(next) = self.pending.pop_front() {
            if iterations >= MAX_TRIGGER_ITERATIONS {
                warn!(
                    dropped = self.pending.len() + 1,
                    "trigger cycle exceeded iteration bound, discarding pending triggers"
                );
                self.pending.clear();
                break;
            }
            iterations += 1;
            match &next.target {
                TriggerTarget::Piece(id) => piece_runner::run(
                    board,
                    queue,
                    phase,
                    &mut self.pending,
                    id,
                    &next.event,
                    &next.context,
                ),
                TriggerTarget::Square(square) => square_runner::run(
                    board,
                    &mut self.pending,
                    square,
                    &next.event,
                    &next.context,
                ),
            }
        }

        self.executing = false;
    }
}
