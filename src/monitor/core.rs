//! Lazy periodic polling shared by every monitor.
//!
//! A [`Poller`] turns one look at the filesystem into zero or more events;
//! [`Monitor`] drives it once per tick and starts only when the first
//! subscriber attaches.

use std::ops::ControlFlow;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;

use crate::services::{lock, repeat, Channel, Lifecycle, Publisher, RepeatHandle, Service};

/// Compares current observed state with the previous observation.
pub trait Poller: Send + 'static {
    type Event: Send + 'static;

    /// Return every change since the previous call, in publish order.
    fn poll(&mut self) -> Vec<Self::Event>;

    /// Whether the poller has nothing further to report. Checked after the
    /// events of each tick are published; the monitor stops once it is true.
    fn is_exhausted(&self) -> bool {
        false
    }
}

struct MonitorInner<P: Poller> {
    name: String,
    tick: Duration,
    channel: Channel<P::Event>,
    lifecycle: Lifecycle,
    poller: Mutex<Option<P>>,
    timer: Mutex<Option<RepeatHandle>>,
}

/// Lazily started periodic poller. Clones share the same poller and
/// subscribers.
///
/// The polling thread holds only the poller and the channel, so dropping
/// every handle drops the timer and ends the thread.
pub struct Monitor<P: Poller> {
    inner: Arc<MonitorInner<P>>,
}

impl<P: Poller> Clone for Monitor<P> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<P: Poller> Monitor<P> {
    pub fn new(name: impl Into<String>, poller: P, tick: Duration) -> Self {
        Self {
            inner: Arc::new(MonitorInner {
                name: name.into(),
                tick,
                channel: Channel::new(),
                lifecycle: Lifecycle::new(),
                poller: Mutex::new(Some(poller)),
                timer: Mutex::new(None),
            }),
        }
    }

    pub fn is_running(&self) -> bool {
        let running = lock(&self.inner.timer)
            .as_ref()
            .is_some_and(|timer| !timer.is_finished());
        running && !self.inner.lifecycle.is_stopped()
    }

    /// Attach a callback without starting the monitor. Used by composite
    /// services that control when their inner monitors start.
    pub(crate) fn attach<F>(&self, callback: F)
    where
        F: Fn(&P::Event) -> Result<()> + Send + Sync + 'static,
    {
        self.inner.channel.attach(callback);
    }

    /// True once the polling thread has exited (stopped or exhausted).
    pub fn is_finished(&self) -> bool {
        match lock(&self.inner.timer).as_ref() {
            Some(timer) => timer.is_finished(),
            None => self.inner.lifecycle.is_stopped(),
        }
    }
}

impl<P: Poller> Service for Monitor<P> {
    fn start(&self) -> Result<()> {
        // Held across the transition so a concurrent `stop` cannot slip in
        // between spawning the timer and recording it.
        let mut timer = lock(&self.inner.timer);
        if !self.inner.lifecycle.begin() {
            return Ok(());
        }
        let Some(mut poller) = lock(&self.inner.poller).take() else {
            return Ok(());
        };
        let channel = self.inner.channel.clone();
        let handle = repeat(&self.inner.name, self.inner.tick, move || {
            for event in poller.poll() {
                channel.publish(&event)?;
            }
            Ok(if poller.is_exhausted() {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            })
        })?;
        *timer = Some(handle);
        Ok(())
    }

    fn stop(&self) {
        self.inner.lifecycle.finish();
        if let Some(timer) = lock(&self.inner.timer).as_ref() {
            timer.stop();
        }
    }
}

impl<P: Poller> Publisher<P::Event> for Monitor<P> {
    fn subscribe<F>(&self, callback: F) -> Result<()>
    where
        F: Fn(&P::Event) -> Result<()> + Send + Sync + 'static,
    {
        self.attach(callback);
        self.start()
    }
}
