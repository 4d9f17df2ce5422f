//! Per-session coordinator: admission, turn dispatch, move intake and
//! abandonment scoring for one pair of participants.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, Weak};

use anyhow::{Context, Result};

use crate::config::{GameRules, ProtocolConfig};
use crate::fs::layout::entry_name;
use crate::fs::{io, Layout};
use crate::game::{Board, Outcome, TurnGame};
use crate::heartbeat::LivenessMonitor;
use crate::models::constants::SESSION_SIZE;
use crate::models::{TurnSignal, TurnStatus};
use crate::monitor::{ContentMonitor, MembershipChange, MembershipMonitor};
use crate::services::{lock, Lifecycle, Publisher, Service};
use crate::validation::validate_id;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    AwaitingParticipants,
    InProgress,
    Terminated,
}

impl std::fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionPhase::AwaitingParticipants => write!(f, "awaiting participants"),
            SessionPhase::InProgress => write!(f, "in progress"),
            SessionPhase::Terminated => write!(f, "terminated"),
        }
    }
}

struct SessionState {
    phase: SessionPhase,
    participants: Vec<String>,
    liveness: HashMap<String, LivenessMonitor>,
    moves: Vec<ContentMonitor>,
    game: Option<Board>,
}

struct SessionInner {
    id: String,
    layout: Layout,
    config: ProtocolConfig,
    rules: GameRules,
    lifecycle: Lifecycle,
    entrants: MembershipMonitor,
    state: Mutex<SessionState>,
}

/// Coordinator side of one session.
///
/// Admits the first two participant directories that appear under
/// `sessions/<id>/`, then relays turns between them through their reply and
/// move files until the game ends or a participant's heartbeat is lost. The
/// session removes its own storage once every participant is gone.
#[derive(Clone)]
pub struct SessionCoordinator {
    inner: Arc<SessionInner>,
}

impl SessionCoordinator {
    pub fn start(
        id: &str,
        layout: &Layout,
        config: &ProtocolConfig,
        rules: GameRules,
    ) -> Result<Self> {
        validate_id(id).with_context(|| format!("Invalid session id {id:?}"))?;
        let directory = layout.session_dir(id);
        fs::create_dir_all(&directory).with_context(|| {
            format!("Failed to create session directory: {}", directory.display())
        })?;

        let inner = Arc::new(SessionInner {
            id: id.to_string(),
            layout: layout.clone(),
            config: config.clone(),
            rules,
            lifecycle: Lifecycle::new(),
            entrants: MembershipMonitor::watch(&directory, config.tick),
            state: Mutex::new(SessionState {
                phase: SessionPhase::AwaitingParticipants,
                participants: Vec::new(),
                liveness: HashMap::new(),
                moves: Vec::new(),
                game: None,
            }),
        });
        inner.lifecycle.begin();

        let weak = Arc::downgrade(&inner);
        inner.entrants.subscribe(move |change: &MembershipChange| {
            match weak.upgrade() {
                Some(inner) => inner.handle_entry(&weak, change),
                None => Ok(()),
            }
        })?;

        tracing::debug!("Session {id} awaiting participants");
        Ok(Self { inner })
    }

    pub fn id(&self) -> &str {
        &self.inner.id
    }

    pub fn phase(&self) -> SessionPhase {
        lock(&self.inner.state).phase
    }

    /// Participants still connected, in admission order.
    pub fn participants(&self) -> Vec<String> {
        lock(&self.inner.state).participants.clone()
    }

    /// True once the session has torn itself down (or was stopped).
    pub fn is_closed(&self) -> bool {
        self.inner.lifecycle.is_stopped()
    }
}

impl SessionInner {
    fn handle_entry(&self, weak: &Weak<SessionInner>, change: &MembershipChange) -> Result<()> {
        let MembershipChange::Added(path) = change else {
            return Ok(());
        };
        if !path.is_dir() {
            return Ok(());
        }
        let Some(participant) = entry_name(path).filter(|name| validate_id(name).is_ok()) else {
            tracing::debug!("Session {}: ignoring entry {}", self.id, path.display());
            return Ok(());
        };

        let mut state = lock(&self.state);
        if state.participants.contains(&participant) {
            return Ok(());
        }
        if state.phase != SessionPhase::AwaitingParticipants
            || state.participants.len() >= SESSION_SIZE
        {
            tracing::info!("Session {}: rejecting extra participant {participant}", self.id);
            io::remove_recursive(path);
            return Ok(());
        }

        let liveness = LivenessMonitor::new(
            &self.layout.participant_heartbeat(&self.id, &participant),
            &self.config,
        );
        let weak_lost = weak.clone();
        let lost_id = participant.clone();
        liveness.subscribe(move |_: &PathBuf| match weak_lost.upgrade() {
            Some(inner) => inner.handle_lost(&lost_id),
            None => Ok(()),
        })?;
        state.liveness.insert(participant.clone(), liveness);
        state.participants.push(participant.clone());
        tracing::info!("Session {}: {participant} joined", self.id);

        if state.participants.len() == SESSION_SIZE {
            self.begin_game(weak, &mut state)?;
        }
        Ok(())
    }

    fn begin_game(&self, weak: &Weak<SessionInner>, state: &mut SessionState) -> Result<()> {
        self.entrants.stop();
        let board = Board::new(self.rules, &state.participants)?;

        for participant in &state.participants {
            let monitor =
                ContentMonitor::watch(&self.layout.move_file(&self.id, participant), self.config.tick);
            let weak_move = weak.clone();
            let mover = participant.clone();
            monitor.subscribe(move |content: &Option<String>| match weak_move.upgrade() {
                Some(inner) => inner.handle_move(&mover, content.as_deref()),
                None => Ok(()),
            })?;
            state.moves.push(monitor);
        }

        state.game = Some(board);
        state.phase = SessionPhase::InProgress;
        tracing::info!(
            "Session {} started: {}",
            self.id,
            state.participants.join(" vs ")
        );
        self.dispatch(state)
    }

    fn handle_move(&self, participant: &str, content: Option<&str>) -> Result<()> {
        let mut state = lock(&self.state);
        if state.phase != SessionPhase::InProgress {
            return Ok(());
        }
        let Some(game) = state.game.as_mut() else {
            return Ok(());
        };
        if game.next_player() != Some(participant) {
            tracing::debug!("Session {}: ignoring move from inactive {participant}", self.id);
            return Ok(());
        }
        let Some(payload) = content.map(str::trim).filter(|c| !c.is_empty()) else {
            return Ok(());
        };
        let Ok(slot) = payload.parse::<usize>() else {
            tracing::debug!("Session {}: malformed move {payload:?} from {participant}", self.id);
            return Ok(());
        };
        if let Err(e) = game.apply(Some(slot)) {
            tracing::debug!("Session {}: {participant}: {e}", self.id);
            return Ok(());
        }
        tracing::debug!("Session {}: {participant} played {slot}", self.id);
        self.dispatch(&mut state)
    }

    /// Tell each participant where the game stands after the latest move.
    fn dispatch(&self, state: &mut SessionState) -> Result<()> {
        let Some(game) = state.game.as_ref() else {
            return Ok(());
        };
        let last_move = game.last_move();

        if let Some(outcome) = game.outcome() {
            for participant in &state.participants {
                let status = match &outcome {
                    Outcome::Winner(winner) if winner == participant => TurnStatus::Won,
                    Outcome::Winner(_) => TurnStatus::Lost,
                    Outcome::Tie => TurnStatus::Tie,
                };
                self.signal(participant, TurnSignal::new(status, last_move))?;
            }
            match outcome {
                Outcome::Winner(winner) => {
                    tracing::info!("Session {}: {winner} won", self.id)
                }
                Outcome::Tie => tracing::info!("Session {}: tie", self.id),
            }
            self.finish_game(state);
            return Ok(());
        }

        let active = game.next_player().map(str::to_string);
        for participant in &state.participants {
            let signal = if active.as_deref() == Some(participant.as_str()) {
                TurnSignal::new(TurnStatus::YourTurn, last_move)
            } else {
                TurnSignal::bare(TurnStatus::Wait)
            };
            self.signal(participant, signal)?;
        }
        Ok(())
    }

    fn handle_lost(&self, participant: &str) -> Result<()> {
        let mut state = lock(&self.state);
        state.participants.retain(|p| p != participant);
        state.liveness.remove(participant);
        tracing::info!("Session {}: {participant} disconnected", self.id);

        if state.participants.is_empty() {
            self.close(&mut state);
            return Ok(());
        }
        if state.phase == SessionPhase::InProgress {
            // Abandonment is scored as a loss for whoever left.
            self.signal(participant, TurnSignal::bare(TurnStatus::Lost))?;
            for remaining in &state.participants {
                self.signal(remaining, TurnSignal::bare(TurnStatus::Won))?;
            }
            self.finish_game(&mut state);
        }
        Ok(())
    }

    fn signal(&self, participant: &str, signal: TurnSignal) -> Result<()> {
        let reply = self.layout.participant_reply(&self.id, participant);
        io::write(&reply, &signal.to_string())
    }

    /// Stop relaying moves. Liveness monitors stay so the session can
    /// remove its storage once both participants have left.
    fn finish_game(&self, state: &mut SessionState) {
        state.phase = SessionPhase::Terminated;
        for monitor in state.moves.drain(..) {
            monitor.stop();
        }
    }

    fn close(&self, state: &mut SessionState) {
        if !self.lifecycle.finish() {
            return;
        }
        state.phase = SessionPhase::Terminated;
        self.entrants.stop();
        for monitor in state.moves.drain(..) {
            monitor.stop();
        }
        for (_, monitor) in state.liveness.drain() {
            monitor.stop();
        }
        io::remove_recursive(&self.layout.session_dir(&self.id));
        tracing::info!("Session {} closed", self.id);
    }
}

impl Service for SessionCoordinator {
    /// Sessions start watching on construction; this is a no-op.
    fn start(&self) -> Result<()> {
        Ok(())
    }

    fn stop(&self) {
        let mut state = lock(&self.inner.state);
        self.inner.close(&mut state);
    }
}
