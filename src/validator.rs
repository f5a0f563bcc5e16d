//! Layered move-legality pipeline.
//!
//! A candidate move passes three layers in order — structural, rule-based,
//! trigger veto — and fails fast at the first refusal. The pipeline is a
//! pure decision: king-safety trials and trigger probes run on clones of
//! the board, so a rejected move leaves no trace on the live state.

use crate::board::Board;
use crate::effects::{EffectPhase, EffectQueue};
use crate::logic::{Dispatcher, EventContext, TriggerTarget};
use crate::piece::{Color, PieceKind, StandardKind};
use crate::square::Square;
use crate::topology::Topology;
use tracing::{debug, instrument};

/// A recognized special-cased move pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SpecialMove {
    /// Castling: the rook accompanies the king.
    Castle {
        /// Rook origin.
        rook_from: Square,
        /// Rook destination.
        rook_to: Square,
    },
    /// En passant: the captured pawn is not on the destination square.
    EnPassant {
        /// Square of the captured pawn.
        captured: Square,
    },
}

/// Full legality decision for a candidate move.
#[instrument(skip(board), fields(turn = %board.turn()))]
pub fn is_legal_move(board: &Board, from: &Square, to: &Square) -> bool {
    structural(board, from, to) && rule_based(board, from, to) && trigger_veto(board, from, to)
}

/// Layer 1: the mover exists, belongs to the side to move, and the
/// destination (plus any multi-cell footprint) is structurally available.
fn structural(board: &Board, from: &Square, to: &Square) -> bool {
    if from == to {
        return false;
    }
    let Some(piece) = board.piece_at(from) else {
        debug!(%from, "structural: no piece on origin");
        return false;
    };
    if piece.color() != board.turn() {
        debug!(piece = piece.id(), "structural: not this side's turn");
        return false;
    }
    if !board.topology().contains(to) {
        debug!(%to, "structural: destination outside topology");
        return false;
    }
    // Multi-cell pieces need their whole footprint available.
    if let Some(shape) = piece.as_custom().and_then(|c| c.shape.as_ref()) {
        for [ex, ey] in &shape.extensions {
            let Some(cell) = to.offset(*ex, *ey) else {
                return false;
            };
            if !board.is_active(&cell) {
                debug!(%cell, "structural: footprint cell unavailable");
                return false;
            }
            if board
                .piece_at(&cell)
                .is_some_and(|other| other.id() != piece.id())
            {
                debug!(%cell, "structural: footprint cell occupied");
                return false;
            }
        }
    }
    true
}

/// Layer 2: administrative state, cooldown, special-cased patterns, piece
/// geometry, and the king-safety trial.
fn rule_based(board: &Board, from: &Square, to: &Square) -> bool {
    let Some(piece) = board.piece_at(from) else {
        return false;
    };
    if !board.is_active(to) {
        debug!(%to, "rule: destination disabled");
        return false;
    }
    if piece.cooldown() > 0.0 {
        debug!(piece = piece.id(), "rule: piece on cooldown");
        return false;
    }

    let special = special_move(board, from, to);
    if special.is_none() && !piece.is_legal_move(from, to, board) {
        debug!(piece = piece.id(), %from, %to, "rule: piece geometry refused");
        return false;
    }

    if leaves_king_attacked(board, piece.color(), from, to, special.as_ref()) {
        debug!(piece = piece.id(), "rule: move leaves own king attacked");
        return false;
    }
    true
}

/// Layer 3: data-defined movers get a pre-move probe through their logic
/// graph; a cancel effect vetoes the move. Probes run on a clone.
fn trigger_veto(board: &Board, from: &Square, to: &Square) -> bool {
    let Some(piece) = board.piece_at(from) else {
        return false;
    };
    if !piece.is_custom() {
        return true;
    }
    let piece_id = piece.id().to_string();
    let captured = board
        .piece_at(to)
        .filter(|victim| victim.color() != piece.color())
        .map(|victim| victim.id().to_string());

    let mut probe = board.clone();
    let mut queue = EffectQueue::new();
    let mut dispatcher = Dispatcher::new();
    queue.reset_cancellation();
    dispatcher.dispatch(
        &mut probe,
        &mut queue,
        EffectPhase::PreMove,
        TriggerTarget::Piece(piece_id.clone()),
        "on-move",
        EventContext {
            from: Some(from.clone()),
            to: Some(to.clone()),
            captured,
            ..EventContext::default()
        },
    );
    queue.process_phase(EffectPhase::PreMove, &mut probe);
    if queue.was_move_cancelled() {
        debug!(piece = piece_id, "veto: pre-move trigger cancelled the move");
        return false;
    }
    true
}

/// Recognizes castling and en passant. Both exist on rectangular boards
/// only.
pub(crate) fn special_move(board: &Board, from: &Square, to: &Square) -> Option<SpecialMove> {
    detect_castling(board, from, to).or_else(|| detect_en_passant(board, from, to))
}

fn detect_castling(board: &Board, from: &Square, to: &Square) -> Option<SpecialMove> {
    let Topology::Rectangular { width, .. } = board.topology() else {
        return None;
    };
    let king = board.piece_at(from)?;
    if !matches!(king.kind(), PieceKind::Standard(StandardKind::King)) || king.has_moved() {
        return None;
    }
    let (from_file, rank) = from.coords()?;
    let (to_file, to_rank) = to.coords()?;
    if to_rank != rank || (to_file - from_file).abs() != 2 {
        return None;
    }
    let direction = (to_file - from_file).signum();
    let rook_file = if direction > 0 { width - 1 } else { 0 };
    let rook_square = Square::alg(rook_file, rank);
    let rook = board.piece_at(&rook_square)?;
    if !matches!(rook.kind(), PieceKind::Standard(StandardKind::Rook))
        || rook.color() != king.color()
        || rook.has_moved()
    {
        return None;
    }
    // Every square between king and rook must be empty.
    let mut file = from_file + direction;
    while file != rook_file {
        if board.piece_at(&Square::alg(file, rank)).is_some() {
            return None;
        }
        file += direction;
    }
    // The king may not castle out of, through, or into attack.
    let opponent = king.color().opponent();
    for step in 0..=2 {
        let path_square = Square::alg(from_file + direction * step, rank);
        if board.is_square_attacked(&path_square, opponent) {
            return None;
        }
    }
    Some(SpecialMove::Castle {
        rook_from: rook_square,
        rook_to: Square::alg(from_file + direction, rank),
    })
}

fn detect_en_passant(board: &Board, from: &Square, to: &Square) -> Option<SpecialMove> {
    if !matches!(board.topology(), Topology::Rectangular { .. }) {
        return None;
    }
    let pawn = board.piece_at(from)?;
    if !matches!(pawn.kind(), PieceKind::Standard(StandardKind::Pawn)) {
        return None;
    }
    if board.piece_at(to).is_some() {
        return None;
    }
    let (from_file, from_rank) = from.coords()?;
    let (to_file, to_rank) = to.coords()?;
    let direction = match pawn.color() {
        Color::White => 1,
        Color::Black => -1,
    };
    if (to_file - from_file).abs() != 1 || to_rank - from_rank != direction {
        return None;
    }
    // The immediately preceding move must be the qualifying double pawn
    // push ending beside the mover.
    let last = board.history().last()?;
    let (last_from_file, last_from_rank) = last.from().coords()?;
    let (last_to_file, last_to_rank) = last.to().coords()?;
    if last_from_file != to_file || last_to_file != to_file {
        return None;
    }
    if (last_to_rank - last_from_rank).abs() != 2 || last_to_rank != from_rank {
        return None;
    }
    let victim = board.piece_at(last.to())?;
    if victim.color() == pawn.color()
        || !matches!(victim.kind(), PieceKind::Standard(StandardKind::Pawn))
        || victim.id() != last.piece_id()
    {
        return None;
    }
    Some(SpecialMove::EnPassant {
        captured: last.to().clone(),
    })
}

/// Applies the move to a clone and reports whether the mover's king ends
/// up attacked. Variants without a king of that color skip the check.
fn leaves_king_attacked(
    board: &Board,
    color: Color,
    from: &Square,
    to: &Square,
    special: Option<&SpecialMove>,
) -> bool {
    let mut trial = board.clone();
    if let Some(SpecialMove::EnPassant { captured }) = special {
        trial.take_piece(captured);
    }
    trial.relocate(from, to);
    if let Some(SpecialMove::Castle { rook_from, rook_to }) = special {
        trial.relocate(rook_from, rook_to);
    }
    match trial.king_square(color) {
        Some(king_square) => trial.is_square_attacked(&king_square, color.opponent()),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::piece::Piece;

    fn bare_board() -> Board {
        Board::new(Topology::standard())
    }

    #[test]
    fn test_castling_recognized_when_clear() {
        let mut board = bare_board();
        board.put(Piece::standard("k", StandardKind::King, Color::White, Square::alg(4, 0)));
        board.put(Piece::standard("r", StandardKind::Rook, Color::White, Square::alg(7, 0)));
        assert!(matches!(
            special_move(&board, &Square::alg(4, 0), &Square::alg(6, 0)),
            Some(SpecialMove::Castle { .. })
        ));
        assert!(is_legal_move(&board, &Square::alg(4, 0), &Square::alg(6, 0)));
    }

    #[test]
    fn test_castling_blocked_by_intervening_piece() {
        let mut board = bare_board();
        board.put(Piece::standard("k", StandardKind::King, Color::White, Square::alg(4, 0)));
        board.put(Piece::standard("r", StandardKind::Rook, Color::White, Square::alg(7, 0)));
        board.put(Piece::standard("b", StandardKind::Bishop, Color::White, Square::alg(5, 0)));
        assert!(special_move(&board, &Square::alg(4, 0), &Square::alg(6, 0)).is_none());
    }

    #[test]
    fn test_castling_refused_through_attack() {
        let mut board = bare_board();
        board.put(Piece::standard("k", StandardKind::King, Color::White, Square::alg(4, 0)));
        board.put(Piece::standard("r", StandardKind::Rook, Color::White, Square::alg(7, 0)));
        // Black rook covers f1, the square the king passes through.
        board.put(Piece::standard("er", StandardKind::Rook, Color::Black, Square::alg(5, 7)));
        assert!(special_move(&board, &Square::alg(4, 0), &Square::alg(6, 0)).is_none());
    }

    #[test]
    fn test_en_passant_requires_immediately_preceding_double_push() {
        let mut board = bare_board();
        board.put(Piece::standard("wp", StandardKind::Pawn, Color::White, Square::alg(4, 4)));
        board.put(Piece::standard("bp", StandardKind::Pawn, Color::Black, Square::alg(3, 4)));
        // Without history there is no en passant.
        assert!(special_move(&board, &Square::alg(4, 4), &Square::alg(3, 5)).is_none());
        board.record_move(Square::alg(3, 6), Square::alg(3, 4), "bp".to_string());
        assert_eq!(
            special_move(&board, &Square::alg(4, 4), &Square::alg(3, 5)),
            Some(SpecialMove::EnPassant {
                captured: Square::alg(3, 4)
            })
        );
    }

    #[test]
    fn test_move_leaving_king_attacked_is_illegal() {
        let mut board = bare_board();
        board.put(Piece::standard("k", StandardKind::King, Color::White, Square::alg(4, 0)));
        board.put(Piece::standard("b", StandardKind::Bishop, Color::White, Square::alg(4, 1)));
        board.put(Piece::standard("er", StandardKind::Rook, Color::Black, Square::alg(4, 7)));
        // The bishop is pinned: moving it exposes the king to the rook.
        assert!(!is_legal_move(&board, &Square::alg(4, 1), &Square::alg(5, 2)));
        // The king stepping off the file is still fine.
        assert!(is_legal_move(&board, &Square::alg(4, 0), &Square::alg(3, 0)));
    }

    #[test]
    fn test_kingless_variant_skips_check() {
        let mut board = bare_board();
        board.put(Piece::standard("b", StandardKind::Bishop, Color::White, Square::alg(4, 1)));
        board.put(Piece::standard("er", StandardKind::Rook, Color::Black, Square::alg(4, 7)));
        // Same shape as the pin above, but with no white king the move is
        // explicitly allowed.
        assert!(is_legal_move(&board, &Square::alg(4, 1), &Square::alg(5, 2)));
    }

    #[test]
    fn test_wrong_side_rejected_structurally() {
        let board = Board::standard();
        // Black pawn while white is to move.
        assert!(!is_legal_move(&board, &Square::alg(4, 6), &Square::alg(4, 4)));
    }

    #[test]
    fn test_multi_cell_footprint_needs_room() {
        use crate::logic::{BehaviorGraph, VariableBank};
        use crate::piece::{CustomPiece, MoveRule, PieceShape};

        let rules: Vec<MoveRule> =
            serde_json::from_str(r#"[{"conditions": [], "result": "allow"}]"#).unwrap();
        let mut board = bare_board();
        board.put(Piece::custom(
            "wall",
            Color::White,
            Square::alg(2, 2),
            CustomPiece {
                tag: "wall".to_string(),
                rules,
                logic: BehaviorGraph::new(),
                variables: VariableBank::new(),
                shape: Some(PieceShape {
                    anchor: [0, 0],
                    extensions: vec![[1, 0]],
                }),
            },
        ));
        // Open destination with an open extension cell.
        assert!(is_legal_move(&board, &Square::alg(2, 2), &Square::alg(4, 4)));
        // The extension cell is occupied by another piece.
        board.put(Piece::standard("p", StandardKind::Pawn, Color::White, Square::alg(5, 5)));
        assert!(!is_legal_move(&board, &Square::alg(2, 2), &Square::alg(4, 5)));
        // Or falls off the board entirely.
        assert!(!is_legal_move(&board, &Square::alg(2, 2), &Square::alg(7, 6)));
    }

    #[test]
    fn test_disabled_destination_rejected() {
        let mut board = bare_board();
        board.put(Piece::standard("r", StandardKind::Rook, Color::White, Square::alg(0, 0)));
        board.set_active(&Square::alg(0, 5), false);
        assert!(!is_legal_move(&board, &Square::alg(0, 0), &Square::alg(0, 5)));
        assert!(is_legal_move(&board, &Square::alg(0, 0), &Square::alg(0, 4)));
    }
}
