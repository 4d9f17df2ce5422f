//! Storage layout under the shared root.
//!
//! ```text
//! <root>/server.heartbeat
//! <root>/server.interrupt
//! <root>/requests/<id>/{client.heartbeat,server.reply}
//! <root>/sessions/<sid>/<id>/{client.heartbeat,move.txt,server.reply}
//! ```

use std::path::{Path, PathBuf};

use crate::fs::io;

pub const SERVER_HEARTBEAT: &str = "server.heartbeat";
pub const CLIENT_HEARTBEAT: &str = "client.heartbeat";
pub const REPLY_FILE: &str = "server.reply";
pub const MOVE_FILE: &str = "move.txt";
pub const REQUESTS_DIR: &str = "requests";
pub const SESSIONS_DIR: &str = "sessions";
pub const INTERRUPT_EXTENSION: &str = "interrupt";

/// Path builder for the shared storage namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    root: PathBuf,
}

impl Layout {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Remove every entry under the root. The coordinator does this on
    /// startup and on interrupt; nothing survives a restart.
    pub fn clear(&self) {
        io::empty_dir(&self.root);
    }

    pub fn server_heartbeat(&self) -> PathBuf {
        self.root.join(SERVER_HEARTBEAT)
    }

    pub fn server_interrupt(&self) -> PathBuf {
        interrupt_marker(&self.server_heartbeat())
    }

    pub fn requests_dir(&self) -> PathBuf {
        self.root.join(REQUESTS_DIR)
    }

    pub fn request_dir(&self, requester_id: &str) -> PathBuf {
        self.requests_dir().join(requester_id)
    }

    pub fn request_heartbeat(&self, requester_id: &str) -> PathBuf {
        self.request_dir(requester_id).join(CLIENT_HEARTBEAT)
    }

    pub fn request_reply(&self, requester_id: &str) -> PathBuf {
        self.request_dir(requester_id).join(REPLY_FILE)
    }

    pub fn sessions_dir(&self) -> PathBuf {
        self.root.join(SESSIONS_DIR)
    }

    pub fn session_dir(&self, session_id: &str) -> PathBuf {
        self.sessions_dir().join(session_id)
    }

    pub fn participant_dir(&self, session_id: &str, participant_id: &str) -> PathBuf {
        self.session_dir(session_id).join(participant_id)
    }

    pub fn participant_heartbeat(&self, session_id: &str, participant_id: &str) -> PathBuf {
        self.participant_dir(session_id, participant_id)
            .join(CLIENT_HEARTBEAT)
    }

    pub fn move_file(&self, session_id: &str, participant_id: &str) -> PathBuf {
        self.participant_dir(session_id, participant_id)
            .join(MOVE_FILE)
    }

    pub fn participant_reply(&self, session_id: &str, participant_id: &str) -> PathBuf {
        self.participant_dir(session_id, participant_id)
            .join(REPLY_FILE)
    }
}

/// Sibling marker whose presence interrupts the heartbeat writer at `heartbeat`.
pub fn interrupt_marker(heartbeat: &Path) -> PathBuf {
    heartbeat.with_extension(INTERRUPT_EXTENSION)
}

/// Final path component as an owned string, if it is valid UTF-8.
pub fn entry_name(path: &Path) -> Option<String> {
    path.file_name()
        .and_then(|s| s.to_str())
        .map(str::to_string)
}
