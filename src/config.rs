//! Runtime configuration: storage root, clock, and game rules.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use crate::models::constants::{
    DEFAULT_BOARD_SIZE, DEFAULT_SLACK, DEFAULT_TICK, DEFAULT_WIN_TARGET,
};

/// Storage root and clock shared by every poller and heartbeat writer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolConfig {
    pub root: PathBuf,
    pub tick: Duration,
    pub slack: Duration,
}

impl ProtocolConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    pub fn with_slack(mut self, slack: Duration) -> Self {
        self.slack = slack;
        self
    }

    /// Elapsed time without an observed heartbeat change after which a
    /// writer is considered gone.
    pub fn timeout(&self) -> Duration {
        self.tick + self.slack
    }
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            tick: DEFAULT_TICK,
            slack: DEFAULT_SLACK,
        }
    }
}

fn default_root() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("turnfile")
}

/// Board parameters handed to the game collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameRules {
    pub board_size: usize,
    pub win_target: usize,
}

impl GameRules {
    pub fn new(board_size: usize, win_target: usize) -> Result<Self> {
        if board_size == 0 {
            bail!("Board size must be at least 1");
        }
        if win_target == 0 || win_target > board_size {
            bail!("Win target must be between 1 and the board size ({board_size}), got {win_target}");
        }
        Ok(Self {
            board_size,
            win_target,
        })
    }

    pub fn slots(&self) -> usize {
        self.board_size * self.board_size
    }
}

impl Default for GameRules {
    fn default() -> Self {
        Self {
            board_size: DEFAULT_BOARD_SIZE,
            win_target: DEFAULT_WIN_TARGET,
        }
    }
}

/// On-disk settings file. Every field is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    pub root: Option<PathBuf>,
    #[serde(default)]
    pub protocol: ProtocolSettings,
    #[serde(default)]
    pub game: GameSettings,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProtocolSettings {
    pub tick_ms: Option<u64>,
    pub slack_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GameSettings {
    pub board_size: Option<usize>,
    pub win_target: Option<usize>,
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn protocol(&self) -> ProtocolConfig {
        let defaults = ProtocolConfig::default();
        ProtocolConfig {
            root: self.root.clone().unwrap_or(defaults.root),
            tick: self
                .protocol
                .tick_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.tick),
            slack: self
                .protocol
                .slack_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.slack),
        }
    }

    pub fn rules(&self) -> Result<GameRules> {
        let defaults = GameRules::default();
        GameRules::new(
            self.game.board_size.unwrap_or(defaults.board_size),
            self.game.win_target.unwrap_or(defaults.win_target),
        )
    }
}
