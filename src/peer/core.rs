//! Participant side of the protocol.
//!
//! A peer files a join request, waits for its pairing notice, then follows
//! the turn signals of its session until a final status arrives or the
//! coordinator goes away. Move decisions run off-thread through the
//! injected [`MoveStrategy`].

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use uuid::Uuid;

use super::strategy::{MoveStrategy, TurnView};
use crate::config::{GameRules, ProtocolConfig};
use crate::fs::{io, Layout};
use crate::game::{Board, TurnGame};
use crate::heartbeat::{HeartbeatRegistry, HeartbeatWriter, LivenessMonitor};
use crate::models::{PairingNotice, TurnSignal, TurnStatus};
use crate::monitor::ContentMonitor;
use crate::services::{lock, run_async, AsyncTask, Channel, Lifecycle, Publisher, Service};
use crate::validation::validate_id;

#[derive(Default)]
struct PeerState {
    status: Option<TurnStatus>,
    session_id: Option<String>,
    game: Option<Board>,
    heartbeat: Option<HeartbeatWriter>,
    coordinator: Option<LivenessMonitor>,
    pairing: Option<ContentMonitor>,
    signals: Option<ContentMonitor>,
    pending_move: Option<AsyncTask<usize>>,
}

impl PeerState {
    /// Everything the peer owns that must be stopped, leaving `self` empty.
    fn take_services(&mut self) -> Vec<Box<dyn Service + Send>> {
        let mut services: Vec<Box<dyn Service + Send>> = Vec::new();
        if let Some(task) = self.pending_move.take() {
            services.push(Box::new(task));
        }
        if let Some(monitor) = self.signals.take() {
            services.push(Box::new(monitor));
        }
        if let Some(monitor) = self.pairing.take() {
            services.push(Box::new(monitor));
        }
        if let Some(monitor) = self.coordinator.take() {
            services.push(Box::new(monitor));
        }
        if let Some(writer) = self.heartbeat.take() {
            services.push(Box::new(writer));
        }
        services
    }
}

struct PeerInner {
    id: String,
    layout: Layout,
    config: ProtocolConfig,
    rules: GameRules,
    registry: HeartbeatRegistry,
    strategy: Arc<dyn MoveStrategy>,
    channel: Channel<Option<TurnStatus>>,
    lifecycle: Lifecycle,
    state: Mutex<PeerState>,
}

/// One participant's side of the protocol.
///
/// Starting the peer files a join request; from then on it follows the
/// coordinator's signals on its own, asking the strategy for a move on each
/// `YOUR_TURN`. When it stops (game over, coordinator lost, or an explicit
/// `stop`) it publishes its last known status exactly once: `None` if the
/// game never started.
#[derive(Clone)]
pub struct Peer {
    inner: Arc<PeerInner>,
}

impl Peer {
    /// Build an idle peer. Without an explicit id a random one is used.
    pub fn new(
        id: Option<String>,
        layout: &Layout,
        config: &ProtocolConfig,
        rules: GameRules,
        registry: &HeartbeatRegistry,
        strategy: Arc<dyn MoveStrategy>,
    ) -> Result<Self> {
        let id = id.unwrap_or_else(|| Uuid::new_v4().to_string());
        validate_id(&id).with_context(|| format!("Invalid participant id {id:?}"))?;
        Ok(Self {
            inner: Arc::new(PeerInner {
                id,
                layout: layout.clone(),
                config: config.clone(),
                rules,
                registry: registry.clone(),
                strategy,
                channel: Channel::new(),
                lifecycle: Lifecycle::new(),
                state: Mutex::new(PeerState::default()),
            }),
        })
    }

    pub fn id(&self) -> &str {
        &self.inner.id
    }

    pub fn session_id(&self) -> Option<String> {
        lock(&self.inner.state).session_id.clone()
    }

    /// Latest status received from the session, if any.
    pub fn status(&self) -> Option<TurnStatus> {
        lock(&self.inner.state).status
    }

    pub fn is_stopped(&self) -> bool {
        self.inner.lifecycle.is_stopped()
    }
}

impl PeerInner {
    fn join(self: &Arc<Self>) -> Result<()> {
        self.strategy.log("Waiting for an opponent...");
        let weak = Arc::downgrade(self);

        // Capture the reply slot before the request becomes visible.
        let pairing = ContentMonitor::watch(&self.layout.request_reply(&self.id), self.config.tick);
        let heartbeat = HeartbeatWriter::start(
            &self.registry,
            &self.layout.request_heartbeat(&self.id),
            &self.config,
        )?;
        let coordinator = LivenessMonitor::new(&self.layout.server_heartbeat(), &self.config);
        {
            let mut state = lock(&self.state);
            state.heartbeat = Some(heartbeat);
            state.coordinator = Some(coordinator.clone());
            state.pairing = Some(pairing.clone());
        }

        let on_lost = weak.clone();
        coordinator.subscribe(move |_: &PathBuf| {
            if let Some(inner) = on_lost.upgrade() {
                inner.coordinator_lost();
            }
            Ok(())
        })?;
        pairing.subscribe(move |content: &Option<String>| match weak.upgrade() {
            Some(inner) => inner.handle_pairing(content.as_deref()),
            None => Ok(()),
        })
    }

    fn coordinator_lost(&self) {
        if self.lifecycle.is_stopped() {
            return;
        }
        self.strategy.log("Server connection failed.");
        lock(&self.state).status = Some(TurnStatus::Error);
        self.shutdown();
    }

    fn handle_pairing(self: &Arc<Self>, content: Option<&str>) -> Result<()> {
        let Some(payload) = content else {
            return Ok(());
        };
        let notice = match PairingNotice::parse(payload) {
            Ok(Some(notice)) => notice,
            Ok(None) => return Ok(()),
            Err(e) => {
                tracing::debug!("Peer {}: ignoring pairing notice: {e:#}", self.id);
                return Ok(());
            }
        };
        if validate_id(&notice.session_id).is_err() || validate_id(&notice.opponent_id).is_err() {
            tracing::debug!("Peer {}: ignoring malformed pairing notice", self.id);
            return Ok(());
        }

        let session_id = notice.session_id;
        let board = Board::new(self.rules, &[self.id.clone(), notice.opponent_id.clone()])?;
        let signals = ContentMonitor::watch(
            &self.layout.participant_reply(&session_id, &self.id),
            self.config.tick,
        );

        let request_services = {
            let mut state = lock(&self.state);
            if self.lifecycle.is_stopped() || state.game.is_some() {
                return Ok(());
            }
            let request: Vec<Box<dyn Service + Send>> = [
                state.heartbeat.take().map(|w| Box::new(w) as Box<dyn Service + Send>),
                state.pairing.take().map(|m| Box::new(m) as Box<dyn Service + Send>),
            ]
            .into_iter()
            .flatten()
            .collect();

            state.heartbeat = Some(HeartbeatWriter::start(
                &self.registry,
                &self.layout.participant_heartbeat(&session_id, &self.id),
                &self.config,
            )?);
            state.session_id = Some(session_id.clone());
            state.game = Some(board);
            state.signals = Some(signals.clone());
            request
        };
        for service in request_services {
            service.stop();
        }
        tracing::info!(
            "Peer {} paired with {} in session {session_id}",
            self.id,
            notice.opponent_id
        );

        let weak = Arc::downgrade(self);
        signals.subscribe(move |content: &Option<String>| match weak.upgrade() {
            Some(inner) => inner.handle_signal(content.as_deref()),
            None => Ok(()),
        })
    }

    fn handle_signal(self: &Arc<Self>, content: Option<&str>) -> Result<()> {
        let Some(payload) = content else {
            return Ok(());
        };
        let signal = match TurnSignal::parse(payload) {
            Ok(Some(signal)) => signal,
            Ok(None) => return Ok(()),
            Err(e) => {
                tracing::debug!("Peer {}: ignoring turn signal: {e:#}", self.id);
                return Ok(());
            }
        };

        let mut state = lock(&self.state);
        if self.lifecycle.is_stopped() {
            return Ok(());
        }
        let Some(game) = state.game.as_mut() else {
            return Ok(());
        };

        // Final signals repeat the move that ended the game, which may be
        // our own and is then already applied.
        let mut desynced = false;
        if let Some(slot) = signal.last_move {
            if game.last_move() != Some(slot) {
                if let Err(e) = game.apply(Some(slot)) {
                    tracing::warn!("Peer {}: cannot apply opponent move: {e}", self.id);
                    desynced = true;
                }
            }
        }
        let game_over = game.outcome().is_some();
        let view = (signal.status == TurnStatus::YourTurn && !desynced).then(|| TurnView {
            board: game.render(),
            board_size: self.rules.board_size,
            last_move: game.last_move(),
            suggested: game.suggest_move(),
            available: game.available_moves(),
        });

        if desynced {
            state.status = Some(TurnStatus::Error);
            drop(state);
            self.strategy.log("Lost track of the game state.");
            self.shutdown();
            return Ok(());
        }
        state.status = Some(signal.status);

        match signal.status {
            TurnStatus::YourTurn => {
                let Some(view) = view else {
                    return Ok(());
                };
                if state.pending_move.as_ref().is_some_and(|task| !task.is_finished()) {
                    return Ok(());
                }
                let strategy = Arc::clone(&self.strategy);
                let task = run_async(&format!("move:{}", self.id), move |cancel| {
                    strategy.decide_move(&view, cancel)
                });
                state.pending_move = Some(task.clone());
                drop(state);

                let weak = Arc::downgrade(self);
                task.subscribe(move |slot: &usize| match weak.upgrade() {
                    Some(inner) => inner.play(*slot),
                    None => Ok(()),
                })
            }
            TurnStatus::Wait => {
                drop(state);
                self.strategy.log("Opponent's turn...");
                Ok(())
            }
            TurnStatus::Won | TurnStatus::Lost | TurnStatus::Tie => {
                drop(state);
                self.announce(signal.status, game_over);
                self.shutdown();
                Ok(())
            }
            TurnStatus::Error => {
                drop(state);
                self.strategy.log("The session failed.");
                self.shutdown();
                Ok(())
            }
        }
    }

    fn announce(&self, status: TurnStatus, game_over: bool) {
        match status {
            TurnStatus::Won => {
                if !game_over {
                    self.strategy.log("Opponent disconnected.");
                }
                self.strategy.log("You won!");
            }
            TurnStatus::Lost => {
                if !game_over {
                    self.strategy.log("You disconnected.");
                }
                self.strategy.log("You lost!");
            }
            TurnStatus::Tie => self.strategy.log("It is a tie!"),
            _ => {}
        }
    }

    /// Apply a decided move locally and submit it.
    fn play(&self, slot: usize) -> Result<()> {
        let mut state = lock(&self.state);
        if self.lifecycle.is_stopped() {
            return Ok(());
        }
        let Some(session_id) = state.session_id.clone() else {
            return Ok(());
        };
        let Some(game) = state.game.as_mut() else {
            return Ok(());
        };
        game.apply(Some(slot))
            .with_context(|| format!("Strategy chose an unavailable slot {slot}"))?;
        io::write(&self.layout.move_file(&session_id, &self.id), &slot.to_string())?;
        tracing::debug!("Peer {} played {slot}", self.id);
        Ok(())
    }

    /// Publish the last status, then release everything.
    fn shutdown(&self) {
        if !self.lifecycle.finish() {
            return;
        }
        let (status, services) = {
            let mut state = lock(&self.state);
            (state.status, state.take_services())
        };
        if let Err(e) = self.channel.publish(&status) {
            tracing::warn!("Peer {}: status observer failed: {e:#}", self.id);
        }
        for service in services {
            service.stop();
        }
        tracing::debug!("Peer {} stopped", self.id);
    }
}

impl Service for Peer {
    fn start(&self) -> Result<()> {
        if !self.inner.lifecycle.begin() {
            return Ok(());
        }
        if let Err(e) = self.inner.join() {
            self.inner.shutdown();
            return Err(e);
        }
        Ok(())
    }

    fn stop(&self) {
        self.inner.shutdown();
    }
}

impl Publisher<Option<TurnStatus>> for Peer {
    fn subscribe<F>(&self, callback: F) -> Result<()>
    where
        F: Fn(&Option<TurnStatus>) -> Result<()> + Send + Sync + 'static,
    {
        self.inner.channel.attach(callback);
        self.start()
    }
}
