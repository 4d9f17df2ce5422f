//! Heartbeat writer and its interrupt marker.

use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};

use anyhow::Result;

use super::registry::HeartbeatRegistry;
use crate::config::ProtocolConfig;
use crate::fs::io;
use crate::fs::layout::interrupt_marker;
use crate::models::constants::HEARTBEAT_COUNTER_BOUND;
use crate::monitor::ContentMonitor;
use crate::services::{lock, repeat, Lifecycle, Publisher, RepeatHandle, Service};

struct WriterInner {
    path: PathBuf,
    registry: HeartbeatRegistry,
    lifecycle: Lifecycle,
    timer: Mutex<Option<RepeatHandle>>,
    interrupt: ContentMonitor,
    interrupt_armed: AtomicBool,
}

impl WriterInner {
    fn shutdown(&self) {
        if !self.lifecycle.finish() {
            return;
        }
        if let Some(timer) = lock(&self.timer).take() {
            timer.stop();
        }
        self.interrupt.stop();
        self.registry.unregister(&self.path);
        tracing::debug!("Heartbeat stopped: {}", self.path.display());
    }
}

/// Periodically stamps a file with a cycling counter to prove liveness.
///
/// At most one writer per path may exist in a process at a time; the
/// registry entry is released by `stop`.
#[derive(Clone)]
pub struct HeartbeatWriter {
    inner: Arc<WriterInner>,
}

impl HeartbeatWriter {
    /// Register `path` and start writing to it immediately.
    ///
    /// Fails with [`crate::error::ProtocolError::DuplicateHeartbeat`] if a
    /// writer for `path` is still active. Any stale interrupt marker next to
    /// `path` is removed first.
    pub fn start(
        registry: &HeartbeatRegistry,
        path: &Path,
        config: &ProtocolConfig,
    ) -> Result<Self> {
        registry.register(path)?;

        let marker = interrupt_marker(path);
        io::remove_recursive(&marker);

        let inner = Arc::new(WriterInner {
            path: path.to_path_buf(),
            registry: registry.clone(),
            lifecycle: Lifecycle::new(),
            timer: Mutex::new(None),
            interrupt: ContentMonitor::watch(&marker, config.tick),
            interrupt_armed: AtomicBool::new(false),
        });
        inner.lifecycle.begin();

        let write_path = path.to_path_buf();
        let mut counter: u64 = 0;
        let timer = repeat(
            &format!("heartbeat:{}", path.display()),
            config.tick,
            move || {
                counter = (counter + 1) % HEARTBEAT_COUNTER_BOUND;
                // The directory may be removed underneath a live writer.
                if let Err(e) = io::write(&write_path, &counter.to_string()) {
                    tracing::debug!("Heartbeat write skipped for {}: {e:#}", write_path.display());
                }
                Ok(ControlFlow::Continue(()))
            },
        );
        match timer {
            Ok(timer) => *lock(&inner.timer) = Some(timer),
            Err(e) => {
                registry.unregister(path);
                return Err(e);
            }
        }

        tracing::debug!("Heartbeat started: {}", path.display());
        Ok(Self { inner })
    }

    pub fn is_running(&self) -> bool {
        !self.inner.lifecycle.is_stopped()
    }

    /// Let an external process stop this writer by creating the sibling
    /// interrupt marker (`<stem>.interrupt`).
    ///
    /// The first call arms the marker watch; when the marker appears the
    /// writer stops itself before any observer of the returned signal runs.
    pub fn interrupt(&self) -> Result<InterruptSignal> {
        if !self.inner.interrupt_armed.swap(true, Ordering::AcqRel) {
            let weak: Weak<WriterInner> = Arc::downgrade(&self.inner);
            self.inner.interrupt.subscribe(move |content: &Option<String>| {
                if content.is_some() {
                    if let Some(inner) = weak.upgrade() {
                        tracing::info!("Interrupt marker detected for {}", inner.path.display());
                        inner.shutdown();
                    }
                }
                Ok(())
            })?;
        }
        Ok(InterruptSignal {
            monitor: self.inner.interrupt.clone(),
            marker: interrupt_marker(&self.inner.path),
        })
    }
}

impl Service for HeartbeatWriter {
    /// Writers start on construction; this is a no-op.
    fn start(&self) -> Result<()> {
        Ok(())
    }

    fn stop(&self) {
        self.inner.shutdown();
    }
}

/// Publishes the marker path when a writer's interrupt marker appears.
#[derive(Clone)]
pub struct InterruptSignal {
    monitor: ContentMonitor,
    marker: PathBuf,
}

impl InterruptSignal {
    pub fn marker(&self) -> &Path {
        &self.marker
    }
}

impl Service for InterruptSignal {
    fn start(&self) -> Result<()> {
        self.monitor.start()
    }

    fn stop(&self) {
        self.monitor.stop();
    }
}

impl Publisher<PathBuf> for InterruptSignal {
    fn subscribe<F>(&self, callback: F) -> Result<()>
    where
        F: Fn(&PathBuf) -> Result<()> + Send + Sync + 'static,
    {
        let marker = self.marker.clone();
        self.monitor.subscribe(move |content: &Option<String>| {
            if content.is_some() {
                callback(&marker)?;
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProtocolError;
    use std::sync::atomic::AtomicUsize;
    use std::thread;
    use std::time::{Duration, Instant};
    use tempfile::TempDir;

    fn config(temp: &TempDir) -> ProtocolConfig {
        ProtocolConfig::new(temp.path())
            .with_tick(Duration::from_millis(20))
            .with_slack(Duration::from_millis(20))
    }

    fn wait_until(timeout: Duration, mut predicate: impl FnMut() -> bool) -> bool {
        let start = Instant::now();
        while start.elapsed() < timeout {
            if predicate() {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        predicate()
    }

    #[test]
    fn test_writer_changes_content_every_tick() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("requests/p1/client.heartbeat");
        let writer = HeartbeatWriter::start(&HeartbeatRegistry::new(), &path, &config(&temp)).unwrap();

        assert!(wait_until(Duration::from_secs(1), || io::read(&path).is_some()));
        let first = io::read(&path);
        assert!(wait_until(Duration::from_secs(1), || io::read(&path) != first));
        let value: u64 = io::read(&path).unwrap().parse().unwrap();
        assert!(value < HEARTBEAT_COUNTER_BOUND);
        writer.stop();
    }

    #[test]
    fn test_writer_survives_directory_removal() {
        let temp = TempDir::new().unwrap();
        let requests = temp.path().join("requests");
        let path = requests.join("p1/client.heartbeat");
        let config = ProtocolConfig::new(temp.path()).with_tick(Duration::from_millis(1));
        let writer = HeartbeatWriter::start(&HeartbeatRegistry::new(), &path, &config).unwrap();

        let deadline = Instant::now() + Duration::from_millis(300);
        while Instant::now() < deadline {
            io::remove_recursive(&requests);
        }

        assert!(writer.is_running());
        assert!(wait_until(Duration::from_secs(1), || io::read(&path).is_some()));
        writer.stop();
    }

    #[test]
    fn test_duplicate_writer_rejected_until_stopped() {
        let temp = TempDir::new().unwrap();
        let registry = HeartbeatRegistry::new();
        let path = temp.path().join("server.heartbeat");

        let first = HeartbeatWriter::start(&registry, &path, &config(&temp)).unwrap();
        let err = HeartbeatWriter::start(&registry, &path, &config(&temp))
            .err()
            .expect("duplicate writer must fail");
        assert_eq!(
            err.downcast_ref::<ProtocolError>(),
            Some(&ProtocolError::DuplicateHeartbeat { path: path.clone() })
        );

        first.stop();
        first.stop();
        assert!(!registry.contains(&path));
        let second = HeartbeatWriter::start(&registry, &path, &config(&temp)).unwrap();
        second.stop();
    }

    #[test]
    fn test_stopped_writer_leaves_content_unchanged() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("server.heartbeat");
        let writer = HeartbeatWriter::start(&HeartbeatRegistry::new(), &path, &config(&temp)).unwrap();
        assert!(wait_until(Duration::from_secs(1), || io::read(&path).is_some()));

        writer.stop();
        thread::sleep(Duration::from_millis(40));
        let frozen = io::read(&path);
        thread::sleep(Duration::from_millis(80));
        assert_eq!(io::read(&path), frozen);
        assert!(!writer.is_running());
    }

    #[test]
    fn test_start_clears_stale_interrupt_marker() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("server.heartbeat");
        let marker = temp.path().join("server.interrupt");
        io::create(&marker).unwrap();

        let writer = HeartbeatWriter::start(&HeartbeatRegistry::new(), &path, &config(&temp)).unwrap();
        assert!(!marker.exists());
        writer.stop();
    }

    #[test]
    fn test_interrupt_stops_writer_then_notifies() {
        let temp = TempDir::new().unwrap();
        let registry = HeartbeatRegistry::new();
        let path = temp.path().join("server.heartbeat");
        let writer = HeartbeatWriter::start(&registry, &path, &config(&temp)).unwrap();

        let notified = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&notified);
        let observer = writer.clone();
        let signal = writer.interrupt().unwrap();
        signal
            .subscribe(move |marker: &PathBuf| {
                assert!(marker.ends_with("server.interrupt"));
                assert!(!observer.is_running());
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .unwrap();

        io::create(signal.marker()).unwrap();
        assert!(wait_until(Duration::from_secs(1), || notified.load(Ordering::SeqCst) == 1));
        assert!(!writer.is_running());
        assert!(!registry.contains(&path));
    }
}
