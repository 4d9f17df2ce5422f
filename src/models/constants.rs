use std::time::Duration;

/// Period at which every poller and heartbeat writer runs.
pub const DEFAULT_TICK: Duration = Duration::from_millis(300);

/// Extra time a liveness monitor waits beyond one tick before declaring loss.
/// One full tick, so a single poll that lands between two heartbeat writes
/// does not read as a dead writer.
pub const DEFAULT_SLACK: Duration = Duration::from_millis(300);

/// Heartbeat counters wrap at this bound.
pub const HEARTBEAT_COUNTER_BOUND: u64 = 100_000;

/// Number of participants in a session.
pub const SESSION_SIZE: usize = 2;

/// Default board edge length.
pub const DEFAULT_BOARD_SIZE: usize = 15;

/// Default number of marks in a row needed to win.
pub const DEFAULT_WIN_TARGET: usize = 5;

/// Exit codes used by the binary.
pub mod exit {
    /// Generic failure (also used when a periodic task dies).
    pub const FAILURE: i32 = 1;

    /// The coordinator received an operator interrupt.
    pub const INTERRUPTED: i32 = 130;
}
