use std::path::Path;
use std::thread;

use crate::config::ProtocolConfig;
use crate::fs::io;

/// One-shot check for a live writer at `path`.
///
/// Reads the file, sleeps one liveness timeout, and reads again; the writer
/// is alive iff the second read exists and differs from the first. Blocks
/// the caller for `config.timeout()`.
pub fn is_active(path: &Path, config: &ProtocolConfig) -> bool {
    let before = io::read(path);
    thread::sleep(config.timeout());
    let after = io::read(path);
    after.is_some() && after != before
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heartbeat::{HeartbeatRegistry, HeartbeatWriter};
    use crate::services::Service;
    use std::time::Duration;
    use tempfile::TempDir;

    fn config(temp: &TempDir) -> ProtocolConfig {
        ProtocolConfig::new(temp.path())
            .with_tick(Duration::from_millis(30))
            .with_slack(Duration::from_millis(30))
    }

    #[test]
    fn test_probe_missing_file_is_inactive() {
        let temp = TempDir::new().unwrap();
        assert!(!is_active(&temp.path().join("server.heartbeat"), &config(&temp)));
    }

    #[test]
    fn test_probe_stale_file_is_inactive() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("server.heartbeat");
        io::write(&path, "17").unwrap();
        assert!(!is_active(&path, &config(&temp)));
    }

    #[test]
    fn test_probe_live_writer_is_active() {
        let temp = TempDir::new().unwrap();
        let config = config(&temp);
        let path = temp.path().join("server.heartbeat");
        let writer = HeartbeatWriter::start(&HeartbeatRegistry::new(), &path, &config).unwrap();

        assert!(is_active(&path, &config));
        writer.stop();
    }
}
