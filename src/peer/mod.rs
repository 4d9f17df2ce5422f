//! Participant side of the protocol.

mod core;
mod strategy;

pub use self::core::Peer;
pub use strategy::{parse_move, Automated, Interactive, MoveStrategy, TurnView};
