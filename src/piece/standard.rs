//! Fixed geometry for the six standard piece kinds.
//!
//! Each kind supports both rectangular and hex boards. Sliders scan their
//! intermediate squares for occupancy and disabled cells; knights and kings
//! are constant-time distance checks; pawns key their direction off the
//! moving color.

use crate::board::Board;
use crate::piece::{Color, StandardKind};
use crate::square::Square;

/// Geometric move legality for a standard kind.
pub(crate) fn is_legal_move(
    kind: StandardKind,
    color: Color,
    from: &Square,
    to: &Square,
    board: &Board,
) -> bool {
    if from == to {
        return false;
    }
    // Capturing one's own color is always illegal.
    if board.piece_at(to).is_some_and(|p| p.color() == color) {
        return false;
    }
    let Some(delta) = raw_delta(from, to) else {
        return false;
    };
    match kind {
        StandardKind::Pawn => pawn_move(color, from, to, delta, board),
        StandardKind::Knight => knight_geometry(delta, board.is_hex()),
        StandardKind::Bishop => bishop_path(from, delta, board),
        StandardKind::Rook => rook_path(from, delta, board),
        StandardKind::Queen => rook_path(from, delta, board) || bishop_path(from, delta, board),
        StandardKind::King => king_geometry(delta, board.is_hex()),
    }
}

/// Whether a standard kind at `position` attacks `target`.
pub(crate) fn can_attack(
    kind: StandardKind,
    color: Color,
    position: &Square,
    target: &Square,
    board: &Board,
) -> bool {
    match kind {
        // Pawns attack diagonally only, independent of occupancy.
        StandardKind::Pawn => {
            let Some((dx, dy)) = raw_delta(position, target) else {
                return false;
            };
            if board.is_hex() {
                pawn_hex_captures(color).contains(&(dx, dy))
            } else {
                dx.abs() == 1 && dy == pawn_direction(color)
            }
        }
        _ => is_legal_move(kind, color, position, target, board),
    }
}

fn raw_delta(from: &Square, to: &Square) -> Option<(i32, i32)> {
    if std::mem::discriminant(from) != std::mem::discriminant(to) {
        return None;
    }
    let (fx, fy) = from.coords()?;
    let (tx, ty) = to.coords()?;
    Some((tx - fx, ty - fy))
}

fn pawn_direction(color: Color) -> i32 {
    match color {
        Color::White => 1,
        Color::Black => -1,
    }
}

/// Hex pawn forward step in axial coordinates; white advances toward
/// negative r.
fn pawn_hex_forward(color: Color) -> (i32, i32) {
    match color {
        Color::White => (0, -1),
        Color::Black => (0, 1),
    }
}

fn pawn_hex_captures(color: Color) -> [(i32, i32); 2] {
    match color {
        Color::White => [(-1, 0), (1, -1)],
        Color::Black => [(1, 0), (-1, 1)],
    }
}

fn pawn_move(color: Color, from: &Square, to: &Square, delta: (i32, i32), board: &Board) -> bool {
    let (dx, dy) = delta;
    if board.is_hex() {
        if (dx, dy) == pawn_hex_forward(color) {
            return board.piece_at(to).is_none();
        }
        if pawn_hex_captures(color).contains(&(dx, dy)) {
            return board
                .piece_at(to)
                .is_some_and(|victim| victim.color() != color);
        }
        return false;
    }

    let direction = pawn_direction(color);
    let height = board.height();
    let start_rank = match color {
        Color::White => 1,
        Color::Black => height - 2,
    };
    let Some((_, from_rank)) = from.coords() else {
        return false;
    };

    // Single forward step onto an empty square.
    if dx == 0 && dy == direction {
        return board.piece_at(to).is_none();
    }
    // Double step from the start rank through an empty intermediate.
    if dx == 0 && from_rank == start_rank && dy == 2 * direction {
        let Some(between) = from.offset(0, direction) else {
            return false;
        };
        return board.piece_at(&between).is_none() && board.piece_at(to).is_none();
    }
    // Diagonal capture only.
    if dx.abs() == 1 && dy == direction {
        return board
            .piece_at(to)
            .is_some_and(|victim| victim.color() != color);
    }
    false
}

fn knight_geometry(delta: (i32, i32), hex: bool) -> bool {
    let (dx, dy) = delta;
    let (adx, ady) = (dx.abs(), dy.abs());
    if hex {
        matches!(
            (adx, ady),
            (2, 1) | (1, 2) | (3, 1) | (1, 3) | (3, 2) | (2, 3)
        )
    } else {
        matches!((adx, ady), (2, 1) | (1, 2))
    }
}

fn king_geometry(delta: (i32, i32), hex: bool) -> bool {
    let (dx, dy) = delta;
    if hex {
        let dist = (dx.abs() + dy.abs() + (dx + dy).abs()) / 2;
        // One step, or the distance-2 hex diagonals.
        dist == 1 || (dist == 2 && hex_bishop_direction(dx, dy))
    } else {
        dx.abs() <= 1 && dy.abs() <= 1
    }
}

fn hex_bishop_direction(dq: i32, dr: i32) -> bool {
    dq == dr || dq == -2 * dr || 2 * dq == -dr
}

fn bishop_path(from: &Square, delta: (i32, i32), board: &Board) -> bool {
    let (dx, dy) = delta;
    if board.is_hex() {
        if !hex_bishop_direction(dx, dy) {
            return false;
        }
        let dist = if dx == dy {
            dx.abs()
        } else if dx == -2 * dy {
            dy.abs()
        } else {
            dx.abs()
        };
        line_clear(board, from, (dx / dist, dy / dist), dist)
    } else {
        if dx.abs() != dy.abs() || dx == 0 {
            return false;
        }
        line_clear(board, from, (dx.signum(), dy.signum()), dx.abs())
    }
}

fn rook_path(from: &Square, delta: (i32, i32), board: &Board) -> bool {
    let (dx, dy) = delta;
    if board.is_hex() {
        if !(dx == 0 || dy == 0 || dx == -dy) {
            return false;
        }
        let dist = dx.abs().max(dy.abs()).max((dx + dy).abs());
        line_clear(board, from, (dx / dist, dy / dist), dist)
    } else {
        if dx != 0 && dy != 0 {
            return false;
        }
        let dist = dx.abs().max(dy.abs());
        line_clear(board, from, (dx.signum(), dy.signum()), dist)
    }
}

/// Every square strictly between the endpoints must be empty and active.
fn line_clear(board: &Board, from: &Square, step: (i32, i32), dist: i32) -> bool {
    for i in 1..dist {
        let Some(square) = from.offset(step.0 * i, step.1 * i) else {
            return false;
        };
        if board.piece_at(&square).is_some() || !board.is_active(&square) {
            return false;
        }
    }
    true
}
