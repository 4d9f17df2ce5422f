//! Liveness over the shared namespace.
//!
//! A writer rewrites its file every tick; observers judge it alive as long
//! as the content keeps changing. Without connections there is no reset
//! event, so loss is inferred from elapsed time: a writer is gone once no
//! change has been observed for `tick + slack`.

mod liveness;
mod probe;
mod registry;
mod writer;

pub use liveness::LivenessMonitor;
pub use probe::is_active;
pub use registry::HeartbeatRegistry;
pub use writer::{HeartbeatWriter, InterruptSignal};
