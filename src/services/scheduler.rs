//! Periodic tasks, cancellable one-shot tasks, and blocking waits.
//!
//! Every poller and heartbeat writer is its own fixed-rate thread; there is
//! no global loop. A periodic task that fails takes the process down with
//! it: a dead poller would silently break every liveness guarantee built on
//! top of it.

use std::ops::ControlFlow;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};

use super::{lock, Channel, Lifecycle, Publisher, Service};
use crate::error::ProtocolError;
use crate::models::constants::exit;

/// Log and terminate. Used for failures escaping background work.
fn fatal(task: &str, message: &str) -> ! {
    tracing::error!("Background task '{task}' failed: {message}");
    std::process::exit(exit::FAILURE);
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic".to_string()
    }
}

/// Handle to a task started by [`repeat`].
pub struct RepeatHandle {
    wake: Mutex<Option<Sender<()>>>,
    finished: Arc<AtomicBool>,
}

impl RepeatHandle {
    /// Cancel future executions. A tick already in progress runs to completion.
    pub fn stop(&self) {
        // Dropping the sender wakes the sleeping thread with `Disconnected`.
        lock(&self.wake).take();
    }

    /// Whether the worker thread has exited.
    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Acquire)
    }
}

impl Drop for RepeatHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Run `task` every `period`, starting immediately, on a dedicated thread.
///
/// Scheduling is fixed-rate: each deadline is the previous one plus
/// `period`, so a slow tick shortens the next sleep rather than drifting.
/// The task stops itself by returning `ControlFlow::Break`. An error or a
/// panic escaping the task terminates the process.
pub fn repeat<F>(name: &str, period: Duration, mut task: F) -> Result<RepeatHandle>
where
    F: FnMut() -> Result<ControlFlow<()>> + Send + 'static,
{
    let (wake_tx, wake_rx) = mpsc::channel::<()>();
    let finished = Arc::new(AtomicBool::new(false));
    let thread_finished = Arc::clone(&finished);
    let task_name = name.to_string();

    thread::Builder::new()
        .name(format!("repeat:{name}"))
        .spawn(move || {
            let mut deadline = Instant::now();
            loop {
                match panic::catch_unwind(AssertUnwindSafe(&mut task)) {
                    Ok(Ok(ControlFlow::Continue(()))) => {}
                    Ok(Ok(ControlFlow::Break(()))) => break,
                    Ok(Err(e)) => fatal(&task_name, &format!("{e:#}")),
                    Err(payload) => fatal(&task_name, &panic_message(payload.as_ref())),
                }

                deadline += period;
                let now = Instant::now();
                if deadline < now {
                    deadline = now;
                }
                match wake_rx.recv_timeout(deadline - now) {
                    Err(RecvTimeoutError::Timeout) => continue,
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            }
            thread_finished.store(true, Ordering::Release);
        })
        .with_context(|| format!("Failed to spawn periodic task '{name}'"))?;

    Ok(RepeatHandle {
        wake: Mutex::new(Some(wake_tx)),
        finished,
    })
}

/// Cooperative cancellation flag handed to one-shot tasks.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// `Err(ProtocolError::Cancelled)` once cancellation was requested.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            return Err(ProtocolError::Cancelled.into());
        }
        Ok(())
    }
}

type OneShot<T> = Box<dyn FnOnce(&CancelToken) -> Result<T> + Send>;

struct AsyncInner<T> {
    name: String,
    channel: Channel<T>,
    lifecycle: Lifecycle,
    token: CancelToken,
    task: Mutex<Option<OneShot<T>>>,
    finished: Arc<AtomicBool>,
}

/// One-shot task running off the caller's thread. See [`run_async`].
pub struct AsyncTask<T> {
    inner: Arc<AsyncInner<T>>,
}

impl<T> Clone for AsyncTask<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Send + 'static> AsyncTask<T> {
    pub fn is_finished(&self) -> bool {
        self.inner.finished.load(Ordering::Acquire)
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.token.is_cancelled()
    }
}

impl<T: Send + 'static> Service for AsyncTask<T> {
    fn start(&self) -> Result<()> {
        if !self.inner.lifecycle.begin() {
            return Ok(());
        }
        let Some(task) = lock(&self.inner.task).take() else {
            return Ok(());
        };
        let inner = Arc::clone(&self.inner);
        thread::Builder::new()
            .name(format!("async:{}", self.inner.name))
            .spawn(move || {
                let outcome = panic::catch_unwind(AssertUnwindSafe(|| task(&inner.token)));
                match outcome {
                    Ok(Ok(value)) => {
                        if !inner.token.is_cancelled() {
                            if let Err(e) = inner.channel.publish(&value) {
                                fatal(&inner.name, &format!("{e:#}"));
                            }
                        }
                    }
                    Ok(Err(e)) => {
                        let cancelled = inner.token.is_cancelled()
                            || matches!(
                                e.downcast_ref::<ProtocolError>(),
                                Some(ProtocolError::Cancelled)
                            );
                        if cancelled {
                            tracing::debug!("Task '{}' cancelled", inner.name);
                        } else {
                            fatal(&inner.name, &format!("{e:#}"));
                        }
                    }
                    Err(payload) => fatal(&inner.name, &panic_message(payload.as_ref())),
                }
                inner.finished.store(true, Ordering::Release);
            })
            .with_context(|| format!("Failed to spawn task '{}'", self.inner.name))?;
        Ok(())
    }

    fn stop(&self) {
        self.inner.token.cancel();
        if self.inner.lifecycle.finish() {
            // Never started: drop the closure so nothing it captured lingers.
            lock(&self.inner.task).take();
        }
    }
}

impl<T: Send + 'static> Publisher<T> for AsyncTask<T> {
    fn subscribe<F>(&self, callback: F) -> Result<()>
    where
        F: Fn(&T) -> Result<()> + Send + Sync + 'static,
    {
        self.inner.channel.attach(callback);
        self.start()
    }
}

/// Wrap `task` as a lazily-started one-shot service.
///
/// The task runs on its own thread once a subscriber attaches, and its
/// value is published exactly once unless the task was stopped first.
/// Stopping cancels the token; a task that then returns an error (or
/// returns [`ProtocolError::Cancelled`] at any time) ends quietly. Any
/// other error is fatal.
pub fn run_async<T, F>(name: &str, task: F) -> AsyncTask<T>
where
    T: Send + 'static,
    F: FnOnce(&CancelToken) -> Result<T> + Send + 'static,
{
    AsyncTask {
        inner: Arc::new(AsyncInner {
            name: name.to_string(),
            channel: Channel::new(),
            lifecycle: Lifecycle::new(),
            token: CancelToken::new(),
            task: Mutex::new(Some(Box::new(task))),
            finished: Arc::new(AtomicBool::new(false)),
        }),
    }
}

/// Block the calling thread until `publisher` publishes, and return that
/// first value.
///
/// Sleeps in `tick` increments. Must not be called from inside a periodic
/// task: it would starve that task's own future ticks.
pub fn await_first<T, P>(publisher: &P, tick: Duration) -> Result<T>
where
    T: Clone + Send + 'static,
    P: Publisher<T>,
{
    let slot: Arc<Mutex<Option<T>>> = Arc::new(Mutex::new(None));
    let writer = Arc::clone(&slot);
    publisher.subscribe(move |value: &T| {
        let mut slot = lock(&writer);
        if slot.is_none() {
            *slot = Some(value.clone());
        }
        Ok(())
    })?;

    loop {
        if let Some(value) = lock(&slot).take() {
            return Ok(value);
        }
        thread::sleep(tick);
    }
}
