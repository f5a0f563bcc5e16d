//! Alternating turn invariant: the turn indicator flips once per
//! committed move and never otherwise.

use super::Invariant;
use crate::board::Board;

/// Invariant: the side to move is the initial side shifted by the parity
/// of the committed move count. Rejected moves leave the turn untouched,
/// so history length alone determines whose turn it is.
pub struct AlternatingTurnInvariant;

impl Invariant<Board> for AlternatingTurnInvariant {
    fn holds(board: &Board) -> bool {
        let expected = if board.history().len() % 2 == 0 {
            board.initial_turn()
        } else {
            board.initial_turn().opponent()
        };
        board.turn() == expected
    }

    fn description() -> &'static str {
        "Turn color alternates strictly with each committed move"
    }
}
