//! Status command - probes the coordinator and counts pending work

use crate::config::ProtocolConfig;
use crate::fs::{io, Layout};
use crate::heartbeat;
use anyhow::Result;
use colored::Colorize;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub running: bool,
    pub requests: usize,
    pub sessions: usize,
}

fn count_dirs(path: &Path) -> usize {
    io::list_dir(path).iter().filter(|p| p.is_dir()).count()
}

/// Probe the coordinator heartbeat (blocks for one liveness timeout).
pub fn collect(layout: &Layout, config: &ProtocolConfig) -> Snapshot {
    Snapshot {
        running: heartbeat::is_active(&layout.server_heartbeat(), config),
        requests: count_dirs(&layout.requests_dir()),
        sessions: count_dirs(&layout.sessions_dir()),
    }
}

pub fn execute(layout: &Layout, config: &ProtocolConfig) -> Result<()> {
    let snapshot = collect(layout, config);
    if snapshot.running {
        println!(
            "{} Coordinator running at {}",
            "✓".green().bold(),
            layout.root().display()
        );
    } else {
        println!(
            "{} Coordinator not running at {}",
            "─".dimmed(),
            layout.root().display()
        );
    }
    println!("  Pending requests: {}", snapshot.requests);
    println!("  Sessions:         {}", snapshot.sessions);
    Ok(())
}
