//! The two-player game consumed by sessions and peers.
//!
//! Sessions and peers only talk to the game through [`TurnGame`]; both sides
//! build their own copy from the same two ids and replay the same moves, so
//! the first mover must be derived from the ids alone.

mod board;

pub use board::Board;

use crate::error::ProtocolError;
use crate::models::TurnStatus;

/// Terminal result of a game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Winner(String),
    Tie,
}

pub trait TurnGame: Send {
    /// Record the next move. `None` is a no-op (the first signal of a game
    /// carries no move). Out-of-range or occupied slots, and any move after
    /// the game is over, are rejected.
    fn apply(&mut self, slot: Option<usize>) -> Result<(), ProtocolError>;

    /// Id of the participant to move, or `None` once the game is over.
    fn next_player(&self) -> Option<&str>;

    fn outcome(&self) -> Option<Outcome>;

    /// Status as seen by `participant`. Ids outside the game get `Error`.
    fn status_for(&self, participant: &str) -> TurnStatus;

    /// A reasonable free slot to play next, or `None` once the game is over.
    fn suggest_move(&self) -> Option<usize>;

    fn last_move(&self) -> Option<usize>;

    fn is_available(&self, slot: usize) -> bool;

    /// Text rendering of the board for terminals.
    fn render(&self) -> String;
}
