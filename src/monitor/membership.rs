use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::core::{Monitor, Poller};
use crate::fs::io;

/// An entry appearing in or disappearing from a watched directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MembershipChange {
    Added(PathBuf),
    Removed(PathBuf),
}

/// Tracks the entries directly inside one directory. Non-recursive, and
/// blind to content changes of existing entries.
pub struct MembershipPoller {
    directory: PathBuf,
    entries: BTreeSet<PathBuf>,
}

impl MembershipPoller {
    pub fn new(directory: &Path) -> Self {
        Self {
            directory: directory.to_path_buf(),
            entries: io::list_dir(directory).into_iter().collect(),
        }
    }
}

impl Poller for MembershipPoller {
    type Event = MembershipChange;

    fn poll(&mut self) -> Vec<MembershipChange> {
        // A missing directory is a no-op tick: it may not be created yet.
        if !self.directory.exists() {
            return Vec::new();
        }

        let current: BTreeSet<PathBuf> = io::list_dir(&self.directory).into_iter().collect();
        let mut changes: Vec<MembershipChange> = self
            .entries
            .difference(&current)
            .cloned()
            .map(MembershipChange::Removed)
            .collect();
        changes.extend(
            current
                .difference(&self.entries)
                .cloned()
                .map(MembershipChange::Added),
        );
        self.entries = current;
        changes
    }
}

pub type MembershipMonitor = Monitor<MembershipPoller>;

impl Monitor<MembershipPoller> {
    pub fn watch(directory: &Path, tick: Duration) -> Self {
        Monitor::new(
            format!("membership:{}", directory.display()),
            MembershipPoller::new(directory),
            tick,
        )
    }
}
