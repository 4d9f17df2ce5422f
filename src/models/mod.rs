pub mod constants;
pub mod signal;
pub mod status;

pub use signal::{PairingNotice, TurnSignal};
pub use status::TurnStatus;
