//! Occupancy consistency invariant: pieces agree with the board about
//! where they stand.

use super::Invariant;
use crate::board::Board;

/// Invariant: every piece's recorded square equals the square it is
/// stored under. Relocation, teleports, and undo all preserve this.
pub struct OccupancyConsistentInvariant;

impl Invariant<Board> for OccupancyConsistentInvariant {
    fn holds(board: &Board) -> bool {
        board
            .pieces()
            .all(|piece| board.piece_at(piece.square()).is_some_and(|p| p.id() == piece.id()))
    }

    fn description() -> &'static str {
        "Every piece's recorded square matches its storage key"
    }
}
