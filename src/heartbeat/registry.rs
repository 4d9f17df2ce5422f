use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::error::ProtocolError;
use crate::services::lock;

/// Paths that currently have a live heartbeat writer in this process.
///
/// Created once per process and handed to every component that starts
/// writers. It only rejects double registration; it does not serialize
/// writes.
#[derive(Debug, Clone, Default)]
pub struct HeartbeatRegistry {
    paths: Arc<Mutex<HashSet<PathBuf>>>,
}

impl HeartbeatRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, path: &Path) -> Result<(), ProtocolError> {
        if !lock(&self.paths).insert(path.to_path_buf()) {
            return Err(ProtocolError::DuplicateHeartbeat {
                path: path.to_path_buf(),
            });
        }
        Ok(())
    }

    pub fn unregister(&self, path: &Path) {
        lock(&self.paths).remove(path);
    }

    pub fn contains(&self, path: &Path) -> bool {
        lock(&self.paths).contains(path)
    }

    pub fn len(&self) -> usize {
        lock(&self.paths).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
