//! Mutable board state: occupancy, turn, history, and per-square state.
//!
//! The board owns its (immutable) topology and all pieces, but contains no
//! game policy: legality lives in the validator, reactive behavior in the
//! logic runners, and mutation-by-logic flows through the effect queue.
//! Cloning a board deep-clones every piece including its variable bank,
//! which is what makes speculative legality checks and snapshots safe.

use crate::logic::SquareLogic;
use crate::piece::{Color, Piece, StandardKind};
use crate::square::Square;
use crate::topology::Topology;
use derive_getters::Getters;
use derive_new::new;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// One committed move. Records are immutable once made.
#[derive(Debug, Clone, PartialEq, Eq, new, Getters, Serialize, Deserialize)]
pub struct MoveRecord {
    /// Origin square.
    from: Square,
    /// Destination square.
    to: Square,
    /// Id of the piece that moved.
    piece_id: String,
}

/// Auxiliary per-square state, separate from occupancy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SquareState {
    /// Free-form tags.
    pub tags: BTreeSet<String>,
    /// Administratively disabled squares cannot be entered or crossed.
    pub disabled: bool,
    /// Free-form properties.
    pub props: BTreeMap<String, serde_json::Value>,
}

impl SquareState {
    /// Whether the state carries no information worth persisting.
    pub fn is_default(&self) -> bool {
        self.tags.is_empty() && !self.disabled && self.props.is_empty()
    }
}

/// Fire-and-forget notification about an executed effect, for presentation
/// consumers. Purely observational.
#[derive(Debug, Clone, PartialEq, Eq, new)]
pub struct EffectNote {
    /// Effect kind, e.g. `"kill"` or `"teleport"`.
    pub kind: String,
    /// Square the effect touched, when it has one.
    pub square: Option<Square>,
}

/// The mutable game board.
#[derive(Debug, Clone)]
pub struct Board {
    topology: Topology,
    pieces: BTreeMap<Square, Piece>,
    turn: Color,
    initial_turn: Color,
    history: Vec<MoveRecord>,
    square_states: BTreeMap<Square, SquareState>,
    square_logic: BTreeMap<Square, SquareLogic>,
    winner: Option<Color>,
    notes: Vec<EffectNote>,
}

impl Board {
    /// Empty board over a topology, white to move.
    pub fn new(topology: Topology) -> Self {
        Self {
            topology,
            pieces: BTreeMap::new(),
            turn: Color::White,
            initial_turn: Color::White,
            history: Vec::new(),
            square_states: BTreeMap::new(),
            square_logic: BTreeMap::new(),
            winner: None,
            notes: Vec::new(),
        }
    }

    /// Standard 8×8 chess setup.
    pub fn standard() -> Self {
        let mut board = Board::new(Topology::standard());
        let back_rank = [
            StandardKind::Rook,
            StandardKind::Knight,
            StandardKind::Bishop,
            StandardKind::Queen,
            StandardKind::King,
            StandardKind::Bishop,
            StandardKind::Knight,
            StandardKind::Rook,
        ];
        for file in 0..8 {
            for (color, pawn_rank, home_rank) in
                [(Color::White, 1, 0), (Color::Black, 6, 7)]
            {
                let initial = match color {
                    Color::White => 'w',
                    Color::Black => 'b',
                };
                let pawn_square = Square::alg(file, pawn_rank);
                board.put(Piece::standard(
                    format!("{pawn_square}_{initial}_pawn"),
                    StandardKind::Pawn,
                    color,
                    pawn_square.clone(),
                ));
                let kind = back_rank[file as usize];
                let tag: &'static str = kind.into();
                let home_square = Square::alg(file, home_rank);
                board.put(Piece::standard(
                    format!("{home_square}_{initial}_{tag}"),
                    kind,
                    color,
                    home_square.clone(),
                ));
            }
        }
        board
    }

    /// The board's topology.
    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    /// Whether the board uses hex geometry.
    pub fn is_hex(&self) -> bool {
        matches!(self.topology, Topology::Hex { .. })
    }

    /// Board height in ranks (rendering bounds for non-rectangular kinds).
    pub fn height(&self) -> i32 {
        self.topology.bounds().1
    }

    /// Side to move.
    pub fn turn(&self) -> Color {
        self.turn
    }

    /// Side that moved first (relevant for loaded positions).
    pub fn initial_turn(&self) -> Color {
        self.initial_turn
    }

    pub(crate) fn set_turn(&mut self, turn: Color) {
        self.turn = turn;
        self.initial_turn = turn;
    }

    /// Declared winner, if any.
    pub fn winner(&self) -> Option<Color> {
        self.winner
    }

    /// Declares a winner and emits a note. The first declaration sticks.
    pub(crate) fn declare_winner(&mut self, color: Color) {
        if self.winner.is_none() {
            self.winner = Some(color);
            self.note("win", None);
        }
    }

    pub(crate) fn set_winner(&mut self, winner: Option<Color>) {
        self.winner = winner;
    }

    // ─────────────────────────────────────────────────────────────
    //  Occupancy
    // ─────────────────────────────────────────────────────────────

    /// Piece on a square.
    pub fn piece_at(&self, square: &Square) -> Option<&Piece> {
        self.pieces.get(square)
    }

    /// Mutable piece on a square.
    pub(crate) fn piece_at_mut(&mut self, square: &Square) -> Option<&mut Piece> {
        self.pieces.get_mut(square)
    }

    /// Places a piece on the square it records as its position, replacing
    /// any occupant.
    pub fn put(&mut self, piece: Piece) {
        self.pieces.insert(piece.square().clone(), piece);
    }

    /// Removes and returns the piece on a square.
    pub fn take_piece(&mut self, square: &Square) -> Option<Piece> {
        self.pieces.remove(square)
    }

    /// Relocates the piece on `from` to `to`, capturing any occupant and
    /// setting the moved flag. Returns false when `from` is empty.
    pub(crate) fn relocate(&mut self, from: &Square, to: &Square) -> bool {
        let Some(mut piece) = self.pieces.remove(from) else {
            return false;
        };
        piece.set_square(to.clone());
        piece.set_has_moved(true);
        self.pieces.insert(to.clone(), piece);
        true
    }

    /// All pieces in board order.
    pub fn pieces(&self) -> impl Iterator<Item = &Piece> {
        self.pieces.values()
    }

    /// Number of pieces on the board.
    pub fn piece_count(&self) -> usize {
        self.pieces.len()
    }

    /// Piece by stable id.
    pub fn piece_by_id(&self, id: &str) -> Option<&Piece> {
        self.pieces.values().find(|p| p.id() == id)
    }

    /// Mutable piece by stable id.
    pub(crate) fn piece_by_id_mut(&mut self, id: &str) -> Option<&mut Piece> {
        self.pieces.values_mut().find(|p| p.id() == id)
    }

    /// Square a piece currently stands on.
    pub fn square_of(&self, id: &str) -> Option<Square> {
        self.piece_by_id(id).map(|p| p.square().clone())
    }

    /// Ids of all data-defined pieces, optionally filtered by owner.
    pub(crate) fn custom_piece_ids(&self, color: Option<Color>) -> Vec<String> {
        self.pieces
            .values()
            .filter(|p| p.is_custom())
            .filter(|p| color.is_none_or(|c| p.color() == c))
            .map(|p| p.id().to_string())
            .collect()
    }

    /// Square of the king-role piece of a color, if one exists.
    pub fn king_square(&self, color: Color) -> Option<Square> {
        self.pieces
            .values()
            .find(|p| p.color() == color && p.is_king())
            .map(|p| p.square().clone())
    }

    // ─────────────────────────────────────────────────────────────
    //  History and turn
    // ─────────────────────────────────────────────────────────────

    /// Commits a move to history and passes the turn. This is the only
    /// place the turn indicator flips.
    pub(crate) fn record_move(&mut self, from: Square, to: Square, piece_id: String) {
        self.history.push(MoveRecord::new(from, to, piece_id));
        self.turn = self.turn.opponent();
    }

    /// Committed move history, oldest first.
    pub fn history(&self) -> &[MoveRecord] {
        &self.history
    }

    // ─────────────────────────────────────────────────────────────
    //  Square state and square logic
    // ─────────────────────────────────────────────────────────────

    /// Whether the square exists and is not administratively disabled.
    pub fn is_active(&self, square: &Square) -> bool {
        self.topology.contains(square)
            && !self
                .square_states
                .get(square)
                .is_some_and(|state| state.disabled)
    }

    /// Enables or disables a square.
    pub fn set_active(&mut self, square: &Square, active: bool) {
        self.square_state_mut(square).disabled = !active;
    }

    /// Auxiliary state of a square, if any was recorded.
    pub fn square_state(&self, square: &Square) -> Option<&SquareState> {
        self.square_states.get(square)
    }

    /// Mutable auxiliary state of a square, created on demand.
    pub fn square_state_mut(&mut self, square: &Square) -> &mut SquareState {
        self.square_states.entry(square.clone()).or_default()
    }

    /// All squares carrying non-default auxiliary state.
    pub fn square_states(&self) -> impl Iterator<Item = (&Square, &SquareState)> {
        self.square_states.iter()
    }

    /// Logic entry bound to a square.
    pub fn square_logic(&self, square: &Square) -> Option<&SquareLogic> {
        self.square_logic.get(square)
    }

    /// Mutable logic entry bound to a square.
    pub(crate) fn square_logic_mut(&mut self, square: &Square) -> Option<&mut SquareLogic> {
        self.square_logic.get_mut(square)
    }

    /// Binds a logic entry to a square.
    pub fn set_square_logic(&mut self, square: Square, logic: SquareLogic) {
        self.square_logic.insert(square, logic);
    }

    /// Squares that carry logic entries.
    pub fn square_logic_squares(&self) -> Vec<Square> {
        self.square_logic.keys().cloned().collect()
    }

    /// All square logic entries.
    pub fn square_logic_entries(&self) -> impl Iterator<Item = (&Square, &SquareLogic)> {
        self.square_logic.iter()
    }

    // ─────────────────────────────────────────────────────────────
    //  Queries
    // ─────────────────────────────────────────────────────────────

    /// Whether any piece of `by_color` attacks the square.
    pub fn is_square_attacked(&self, square: &Square, by_color: Color) -> bool {
        self.pieces
            .values()
            .filter(|p| p.color() == by_color)
            .any(|p| p.can_attack(square, self))
    }

    /// Whether moving the piece on `from` to `to` would promote it: a pawn
    /// reaching the far rank, or on hex boards the edge of the active
    /// region.
    pub fn is_promotion_move(&self, from: &Square, to: &Square) -> bool {
        let Some(piece) = self.piece_at(from) else {
            return false;
        };
        if !piece.is_pawn() {
            return false;
        }
        let Some((_, to_rank)) = to.coords() else {
            return false;
        };
        if self.is_hex() {
            let dr = match piece.color() {
                Color::White => -1,
                Color::Black => 1,
            };
            match to.offset(0, dr) {
                Some(next) => !self.is_active(&next),
                None => true,
            }
        } else {
            match piece.color() {
                Color::White => to_rank == self.height() - 1,
                Color::Black => to_rank == 0,
            }
        }
    }

    /// Nearest active empty square to `target`, searching outward ring by
    /// ring. Used by spawn-style consumers needing a landing spot.
    pub fn nearest_empty_square(&self, target: &Square) -> Option<Square> {
        let vacant =
            |sq: &Square| self.is_active(sq) && self.piece_at(sq).is_none();

        match &self.topology {
            Topology::Hex { radius } => {
                let (tq, tr) = target.coords()?;
                for d in 1..=(radius * 2) {
                    let mut q = tq;
                    let mut r = tr + d;
                    for (dq, dr) in [(1, -1), (0, -1), (-1, 0), (-1, 1), (0, 1), (1, 0)] {
                        for _ in 0..d {
                            let sq = Square::axial(q, r);
                            if vacant(&sq) {
                                return Some(sq);
                            }
                            q += dq;
                            r += dr;
                        }
                    }
                }
                None
            }
            Topology::Rectangular { width, height } => {
                let (tx, ty) = target.coords()?;
                for d in 1..(*width).max(*height) {
                    for dx in -d..=d {
                        for dy in -d..=d {
                            if dx.abs() != d && dy.abs() != d {
                                continue;
                            }
                            let sq = Square::alg(tx + dx, ty + dy);
                            if vacant(&sq) {
                                return Some(sq);
                            }
                        }
                    }
                }
                None
            }
            Topology::Graph { .. } => {
                // Expanding BFS frontier over the explicit graph.
                let mut seen = HashSet::from([target.clone()]);
                let mut frontier = vec![target.clone()];
                while !frontier.is_empty() {
                    let mut next = Vec::new();
                    for sq in &frontier {
                        for adj in self.topology.adjacent(sq) {
                            if seen.insert(adj.clone()) {
                                if vacant(&adj) {
                                    return Some(adj);
                                }
                                next.push(adj);
                            }
                        }
                    }
                    frontier = next;
                }
                None
            }
        }
    }

    // ─────────────────────────────────────────────────────────────
    //  Effect notes
    // ─────────────────────────────────────────────────────────────

    /// Buffers a presentation note.
    pub(crate) fn note(&mut self, kind: impl Into<String>, square: Option<Square>) {
        self.notes.push(EffectNote::new(kind.into(), square));
    }

    /// Drains the buffered notes.
    pub(crate) fn take_notes(&mut self) -> Vec<EffectNote> {
        std::mem::take(&mut self.notes)
    }
}
