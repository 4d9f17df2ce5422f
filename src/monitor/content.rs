use std::path::{Path, PathBuf};
use std::time::Duration;

use super::core::{Monitor, Poller};
use crate::fs::io;

/// Tracks one file's content. Publishes `Some(content)` when the content
/// changes or the file appears, and `None` when it disappears.
pub struct ContentPoller {
    path: PathBuf,
    current: Option<String>,
}

impl ContentPoller {
    /// The baseline is read now, so content already present at construction
    /// is not reported as a change.
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            current: io::read(path),
        }
    }
}

impl Poller for ContentPoller {
    type Event = Option<String>;

    fn poll(&mut self) -> Vec<Option<String>> {
        let latest = io::read(&self.path);
        if latest == self.current {
            return Vec::new();
        }
        self.current = latest.clone();
        vec![latest]
    }
}

pub type ContentMonitor = Monitor<ContentPoller>;

impl Monitor<ContentPoller> {
    pub fn watch(path: &Path, tick: Duration) -> Self {
        Monitor::new(
            format!("content:{}", path.display()),
            ContentPoller::new(path),
            tick,
        )
    }
}
