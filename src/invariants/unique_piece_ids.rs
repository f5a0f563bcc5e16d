//! Unique piece id invariant: ids stay distinct across the board.

use super::Invariant;
use crate::board::Board;
use std::collections::HashSet;

/// Invariant: no two pieces share an id. Spawns, promotions, and
/// transformations all derive fresh ids from existing ones.
pub struct UniquePieceIdsInvariant;

impl Invariant<Board> for UniquePieceIdsInvariant {
    fn holds(board: &Board) -> bool {
        let mut seen = HashSet::new();
        board.pieces().all(|piece| seen.insert(piece.id()))
    }

    fn description() -> &'static str {
        "Piece ids are unique across the board"
    }
}
