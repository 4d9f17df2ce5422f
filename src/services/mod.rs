//! Service lifecycle, publish/subscribe channels, and the scheduler.

mod channel;
mod lifecycle;
pub mod scheduler;

use std::sync::{Mutex, MutexGuard, PoisonError};

use anyhow::Result;

pub use channel::Channel;
pub use lifecycle::{Lifecycle, LifecycleState};
pub use scheduler::{await_first, repeat, run_async, AsyncTask, CancelToken, RepeatHandle};

/// Anything that owns background work.
///
/// `start` is idempotent. `stop` is idempotent, safe before `start`, and
/// releases every timer or thread the service owns.
pub trait Service {
    fn start(&self) -> Result<()>;
    fn stop(&self);
}

/// A service that delivers values to attached callbacks.
///
/// Callbacks run synchronously on the publishing thread, in attach order.
/// Attaching a callback starts the service if it is still idle. An `Err`
/// returned by a callback propagates to whoever published the value.
pub trait Publisher<T>: Service {
    fn subscribe<F>(&self, callback: F) -> Result<()>
    where
        F: Fn(&T) -> Result<()> + Send + Sync + 'static;
}

/// Lock a mutex, ignoring poisoning. A panic in a periodic task already
/// terminates the process, so a poisoned guard carries no extra meaning.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
