//! Shared fixtures for end-to-end scenarios

use anyhow::Result;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use turnfile::config::{GameRules, ProtocolConfig};
use turnfile::coordinator::Matchmaker;
use turnfile::fs::{io, Layout};
use turnfile::heartbeat::{HeartbeatRegistry, HeartbeatWriter};
use turnfile::models::{PairingNotice, TurnStatus};
use turnfile::peer::{MoveStrategy, Peer, TurnView};
use turnfile::services::{CancelToken, Publisher};

pub const TICK: Duration = Duration::from_millis(40);

/// Default timeout for protocol steps in milliseconds.
pub const STEP_TIMEOUT_MS: u64 = 3000;

/// Wait for a condition to become true with timeout
pub fn wait_for_condition<F>(predicate: F, timeout_ms: u64) -> Result<()>
where
    F: Fn() -> bool,
{
    let start = Instant::now();
    let timeout = Duration::from_millis(timeout_ms);

    while start.elapsed() < timeout {
        if predicate() {
            return Ok(());
        }
        thread::sleep(Duration::from_millis(10));
    }

    anyhow::bail!("Timeout waiting for condition after {timeout_ms}ms")
}

/// A temporary storage root with a short clock.
pub struct TestRoot {
    _temp: TempDir,
    pub layout: Layout,
    pub config: ProtocolConfig,
    pub registry: HeartbeatRegistry,
}

impl TestRoot {
    pub fn new() -> Self {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let layout = Layout::new(temp.path());
        let config = ProtocolConfig::new(temp.path()).with_tick(TICK).with_slack(TICK);
        Self {
            _temp: temp,
            layout,
            config,
            registry: HeartbeatRegistry::new(),
        }
    }

    pub fn coordinator(&self, rules: GameRules) -> Matchmaker {
        Matchmaker::start(&self.layout, &self.config, rules, &self.registry)
            .expect("Failed to start coordinator")
    }

    pub fn peer(&self, id: &str, rules: GameRules, strategy: Arc<dyn MoveStrategy>) -> Peer {
        Peer::new(
            Some(id.to_string()),
            &self.layout,
            &self.config,
            rules,
            &self.registry,
            strategy,
        )
        .expect("Failed to create peer")
    }

    /// File a bare join request: just a heartbeat in `requests/<id>/`.
    pub fn request(&self, id: &str) -> HeartbeatWriter {
        HeartbeatWriter::start(&self.registry, &self.layout.request_heartbeat(id), &self.config)
            .expect("Failed to start request heartbeat")
    }

    pub fn notice(&self, id: &str) -> Option<PairingNotice> {
        io::read(&self.layout.request_reply(id))
            .and_then(|payload| PairingNotice::parse(&payload).ok().flatten())
    }

    pub fn reply(&self, session_id: &str, id: &str) -> Option<String> {
        io::read(&self.layout.participant_reply(session_id, id))
    }
}

impl Default for TestRoot {
    fn default() -> Self {
        Self::new()
    }
}

/// Record every status a peer publishes.
pub fn record_outcome(peer: &Peer) -> Arc<Mutex<Vec<Option<TurnStatus>>>> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    peer.subscribe(move |status: &Option<TurnStatus>| {
        sink.lock().unwrap().push(*status);
        Ok(())
    })
    .expect("Failed to start peer");
    seen
}

/// Plays a fixed list of slots, then falls back to the suggestion. Keeps the
/// `last_move` of every view it was shown.
#[derive(Default)]
pub struct Scripted {
    moves: Mutex<VecDeque<usize>>,
    pub seen: Mutex<Vec<Option<usize>>>,
}

impl Scripted {
    pub fn new(moves: &[usize]) -> Arc<Self> {
        Arc::new(Self {
            moves: Mutex::new(moves.iter().copied().collect()),
            seen: Mutex::new(Vec::new()),
        })
    }

    pub fn views(&self) -> Vec<Option<usize>> {
        self.seen.lock().unwrap().clone()
    }
}

impl MoveStrategy for Scripted {
    fn decide_move(&self, view: &TurnView, cancel: &CancelToken) -> Result<usize> {
        cancel.check()?;
        self.seen.lock().unwrap().push(view.last_move);
        let scripted = self.moves.lock().unwrap().pop_front();
        scripted
            .or(view.suggested)
            .ok_or_else(|| anyhow::anyhow!("No move left"))
    }

    fn log(&self, _message: &str) {}
}

/// Never decides; returns only once cancelled.
pub struct Stalling;

impl MoveStrategy for Stalling {
    fn decide_move(&self, _view: &TurnView, cancel: &CancelToken) -> Result<usize> {
        loop {
            cancel.check()?;
            thread::sleep(Duration::from_millis(10));
        }
    }

    fn log(&self, _message: &str) {}
}

/// Wait until a recorder from [`record_outcome`] holds a value and return it.
pub fn wait_for_outcome(seen: &Arc<Mutex<Vec<Option<TurnStatus>>>>) -> Option<TurnStatus> {
    wait_for_condition(|| !seen.lock().unwrap().is_empty(), STEP_TIMEOUT_MS * 3)
        .expect("peer should publish an outcome");
    seen.lock().unwrap()[0]
}
