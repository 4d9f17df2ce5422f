//! Matchmaking coordinator.
//!
//! Watches `requests/` for join requests, keeps them in arrival order, and
//! pairs the two oldest live requests into a fresh session. A request whose
//! heartbeat stops is dropped from the queue and its directory removed.

use std::collections::{HashMap, VecDeque};
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, Weak};

use anyhow::{Context, Result};
use uuid::Uuid;

use super::session::SessionCoordinator;
use crate::config::{GameRules, ProtocolConfig};
use crate::error::ProtocolError;
use crate::fs::layout::entry_name;
use crate::fs::{io, Layout};
use crate::heartbeat::{self, HeartbeatRegistry, HeartbeatWriter, InterruptSignal, LivenessMonitor};
use crate::models::constants::SESSION_SIZE;
use crate::models::PairingNotice;
use crate::monitor::{MembershipChange, MembershipMonitor};
use crate::services::{lock, Lifecycle, Publisher, Service};
use crate::validation::validate_id;

#[derive(Default)]
struct QueueState {
    queue: VecDeque<String>,
    requests: HashMap<String, LivenessMonitor>,
    sessions: Vec<SessionCoordinator>,
}

struct MatchmakerInner {
    layout: Layout,
    config: ProtocolConfig,
    rules: GameRules,
    lifecycle: Lifecycle,
    heartbeat: HeartbeatWriter,
    interrupt: InterruptSignal,
    requests: MembershipMonitor,
    state: Mutex<QueueState>,
}

/// The coordinator process: pairs join requests into sessions.
///
/// Requesters are queued in arrival order and paired two at a time. A
/// request whose heartbeat is lost leaves the queue and its storage is
/// removed; this is also how paired requests are cleaned up once their
/// peers move on to the session.
#[derive(Clone)]
pub struct Matchmaker {
    inner: Arc<MatchmakerInner>,
}

impl Matchmaker {
    /// Start coordinating under `layout`.
    ///
    /// Fails with [`ProtocolError::CoordinatorAlreadyRunning`] if another
    /// coordinator is heartbeating at the same root. Blocks for one
    /// liveness timeout while probing, then clears the root.
    pub fn start(
        layout: &Layout,
        config: &ProtocolConfig,
        rules: GameRules,
        registry: &HeartbeatRegistry,
    ) -> Result<Self> {
        let server = layout.server_heartbeat();
        if heartbeat::is_active(&server, config) {
            return Err(ProtocolError::CoordinatorAlreadyRunning { path: server }.into());
        }

        layout.clear();
        for dir in [layout.requests_dir(), layout.sessions_dir()] {
            fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
        }

        let heartbeat = HeartbeatWriter::start(registry, &server, config)?;
        let interrupt = match heartbeat.interrupt() {
            Ok(signal) => signal,
            Err(e) => {
                heartbeat.stop();
                return Err(e);
            }
        };

        let inner = Arc::new(MatchmakerInner {
            layout: layout.clone(),
            config: config.clone(),
            rules,
            lifecycle: Lifecycle::new(),
            heartbeat,
            interrupt,
            requests: MembershipMonitor::watch(&layout.requests_dir(), config.tick),
            state: Mutex::new(QueueState::default()),
        });
        inner.lifecycle.begin();

        let weak = Arc::downgrade(&inner);
        let subscribed = inner.requests.subscribe(move |change: &MembershipChange| {
            match weak.upgrade() {
                Some(inner) => inner.handle_request(&weak, change),
                None => Ok(()),
            }
        });
        let matchmaker = Self { inner };
        if let Err(e) = subscribed {
            matchmaker.stop();
            return Err(e);
        }

        tracing::info!("Coordinator started at {}", layout.root().display());
        Ok(matchmaker)
    }

    /// Pending requesters, oldest first.
    pub fn queue(&self) -> Vec<String> {
        lock(&self.inner.state).queue.iter().cloned().collect()
    }

    /// Number of sessions that have not yet closed.
    pub fn sessions(&self) -> usize {
        let mut state = lock(&self.inner.state);
        state.sessions.retain(|session| !session.is_closed());
        state.sessions.len()
    }

    /// Run `callback` when an operator creates the interrupt marker. The
    /// coordinator heartbeat has already stopped by the time it runs.
    pub fn on_interrupt<F>(&self, callback: F) -> Result<()>
    where
        F: Fn() -> Result<()> + Send + Sync + 'static,
    {
        self.inner.interrupt.subscribe(move |_: &PathBuf| callback())
    }

    pub fn layout(&self) -> &Layout {
        &self.inner.layout
    }
}

impl MatchmakerInner {
    fn handle_request(&self, weak: &Weak<MatchmakerInner>, change: &MembershipChange) -> Result<()> {
        let MembershipChange::Added(path) = change else {
            return Ok(());
        };
        if !path.is_dir() {
            return Ok(());
        }
        let Some(requester) = entry_name(path) else {
            return Ok(());
        };
        if let Err(e) = validate_id(&requester) {
            tracing::debug!("Ignoring request {}: {e}", path.display());
            return Ok(());
        }

        let mut state = lock(&self.state);
        if state.requests.contains_key(&requester) {
            return Ok(());
        }

        let liveness =
            LivenessMonitor::new(&self.layout.request_heartbeat(&requester), &self.config);
        let weak_lost = weak.clone();
        let lost_id = requester.clone();
        liveness.subscribe(move |_: &PathBuf| match weak_lost.upgrade() {
            Some(inner) => {
                inner.handle_abandoned(&lost_id);
                Ok(())
            }
            None => Ok(()),
        })?;
        state.requests.insert(requester.clone(), liveness);
        state.queue.push_back(requester.clone());
        tracing::info!("Request from {requester} queued ({} pending)", state.queue.len());

        while state.queue.len() >= SESSION_SIZE {
            self.pair(&mut state)?;
        }
        Ok(())
    }

    /// Promote the two oldest requests into a new session.
    fn pair(&self, state: &mut QueueState) -> Result<()> {
        let pair: Vec<String> = state.queue.drain(..SESSION_SIZE).collect();
        let [first, second] = pair.as_slice() else {
            return Err(ProtocolError::InvalidParticipantCount {
                expected: SESSION_SIZE,
                actual: pair.len(),
            }
            .into());
        };

        let session_id = Uuid::new_v4().to_string();
        let session = SessionCoordinator::start(&session_id, &self.layout, &self.config, self.rules)?;
        for (requester, opponent) in [(first, second), (second, first)] {
            let notice = PairingNotice {
                session_id: session_id.clone(),
                opponent_id: opponent.clone(),
            };
            io::write(&self.layout.request_reply(requester), &notice.to_string())?;
        }
        tracing::info!("Paired {first} with {second} in session {session_id}");

        state.sessions.retain(|session| !session.is_closed());
        state.sessions.push(session);
        Ok(())
    }

    /// Idempotent: a paired request is already out of the queue.
    fn handle_abandoned(&self, requester: &str) {
        let mut state = lock(&self.state);
        let queued = state.queue.len();
        state.queue.retain(|id| id != requester);
        if state.queue.len() != queued {
            tracing::info!("Request from {requester} abandoned");
        }
        state.requests.remove(requester);
        io::remove_recursive(&self.layout.request_dir(requester));
    }

    fn shutdown(&self) {
        if !self.lifecycle.finish() {
            return;
        }
        self.requests.stop();
        self.heartbeat.stop();
        let (requests, sessions) = {
            let mut state = lock(&self.state);
            state.queue.clear();
            (
                state.requests.drain().map(|(_, m)| m).collect::<Vec<_>>(),
                std::mem::take(&mut state.sessions),
            )
        };
        for monitor in requests {
            monitor.stop();
        }
        for session in sessions {
            session.stop();
        }
        tracing::info!("Coordinator stopped");
    }
}

impl Service for Matchmaker {
    /// The coordinator runs from construction; this is a no-op.
    fn start(&self) -> Result<()> {
        Ok(())
    }

    fn stop(&self) {
        self.inner.shutdown();
    }
}
