//! Heartbeat loss detection.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::Result;

use crate::config::ProtocolConfig;
use crate::monitor::{ContentMonitor, Monitor, Poller};
use crate::services::{lock, Lifecycle, Publisher, Service};

/// Second clock of a liveness monitor: fires once the content clock has not
/// been reset for longer than the timeout.
struct LivenessPoller {
    path: PathBuf,
    timeout: Duration,
    last_seen: Arc<Mutex<Instant>>,
    lost: Arc<AtomicBool>,
    content: ContentMonitor,
}

impl Poller for LivenessPoller {
    type Event = PathBuf;

    fn poll(&mut self) -> Vec<PathBuf> {
        if self.lost.load(Ordering::Acquire) {
            return Vec::new();
        }
        let elapsed = lock(&self.last_seen).elapsed();
        if elapsed <= self.timeout {
            return Vec::new();
        }
        tracing::debug!(
            "Heartbeat lost: {} (no change for {}ms)",
            self.path.display(),
            elapsed.as_millis()
        );
        self.lost.store(true, Ordering::Release);
        self.content.stop();
        vec![self.path.clone()]
    }

    fn is_exhausted(&self) -> bool {
        self.lost.load(Ordering::Acquire)
    }
}

struct LivenessInner {
    path: PathBuf,
    content: ContentMonitor,
    check: Monitor<LivenessPoller>,
    last_seen: Arc<Mutex<Instant>>,
    lost: Arc<AtomicBool>,
    lifecycle: Lifecycle,
}

/// Watches a heartbeat file and publishes its path once, when the writer is
/// judged dead.
///
/// One monitor resets a "last seen" clock on every content change; a
/// second checks the clock every tick. Loss is reported between `slack` and
/// `2 * tick + slack` after the writer's final write becomes visible. A path
/// that never receives a heartbeat is reported lost one timeout after start.
#[derive(Clone)]
pub struct LivenessMonitor {
    inner: Arc<LivenessInner>,
}

impl LivenessMonitor {
    pub fn new(path: &Path, config: &ProtocolConfig) -> Self {
        let content = ContentMonitor::watch(path, config.tick);
        let last_seen = Arc::new(Mutex::new(Instant::now()));
        let lost = Arc::new(AtomicBool::new(false));
        let poller = LivenessPoller {
            path: path.to_path_buf(),
            timeout: config.timeout(),
            last_seen: Arc::clone(&last_seen),
            lost: Arc::clone(&lost),
            content: content.clone(),
        };
        let check = Monitor::new(format!("liveness:{}", path.display()), poller, config.tick);
        Self {
            inner: Arc::new(LivenessInner {
                path: path.to_path_buf(),
                content,
                check,
                last_seen,
                lost,
                lifecycle: Lifecycle::new(),
            }),
        }
    }

    /// Whether loss has been detected.
    pub fn is_lost(&self) -> bool {
        self.inner.lost.load(Ordering::Acquire)
    }
}

impl Service for LivenessMonitor {
    fn start(&self) -> Result<()> {
        if !self.inner.lifecycle.begin() {
            return Ok(());
        }
        tracing::debug!("Watching liveness of {}", self.inner.path.display());
        *lock(&self.inner.last_seen) = Instant::now();
        let last_seen = Arc::clone(&self.inner.last_seen);
        self.inner.content.subscribe(move |_: &Option<String>| {
            *lock(&last_seen) = Instant::now();
            Ok(())
        })?;
        self.inner.check.start()
    }

    fn stop(&self) {
        if self.inner.lifecycle.finish() {
            self.inner.content.stop();
            self.inner.check.stop();
        }
    }
}

impl Publisher<PathBuf> for LivenessMonitor {
    fn subscribe<F>(&self, callback: F) -> Result<()>
    where
        F: Fn(&PathBuf) -> Result<()> + Send + Sync + 'static,
    {
        self.inner.check.attach(callback);
        self.start()
    }
}
