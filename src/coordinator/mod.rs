//! Coordinator side: matchmaking and per-session turn relay.

mod matchmaking;
mod session;

pub use matchmaking::Matchmaker;
pub use session::{SessionCoordinator, SessionPhase};
