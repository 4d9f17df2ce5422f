use std::sync::Mutex;

use super::lock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Idle,
    Running,
    Stopped,
}

/// Idle -> Running -> Stopped guard shared by every service.
///
/// Each transition succeeds at most once, which is what makes `start` and
/// `stop` idempotent without the callers tracking anything.
#[derive(Debug)]
pub struct Lifecycle {
    state: Mutex<LifecycleState>,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(LifecycleState::Idle),
        }
    }

    /// Idle -> Running. Returns true only for the call that made the move.
    pub fn begin(&self) -> bool {
        let mut state = lock(&self.state);
        if *state == LifecycleState::Idle {
            *state = LifecycleState::Running;
            true
        } else {
            false
        }
    }

    /// Idle/Running -> Stopped. Returns true only for the call that made the move.
    pub fn finish(&self) -> bool {
        let mut state = lock(&self.state);
        if *state == LifecycleState::Stopped {
            false
        } else {
            *state = LifecycleState::Stopped;
            true
        }
    }

    pub fn state(&self) -> LifecycleState {
        *lock(&self.state)
    }

    pub fn is_stopped(&self) -> bool {
        self.state() == LifecycleState::Stopped
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}
