//! Entry points behind the `turnfile` subcommands.

pub mod interrupt;
pub mod play;
pub mod server;
pub mod status;

use crate::config::{GameRules, ProtocolConfig};
use crate::fs::Layout;
use crate::heartbeat::HeartbeatRegistry;

/// Resolved settings plus the process-wide heartbeat registry.
#[derive(Clone)]
pub struct Runtime {
    pub layout: Layout,
    pub config: ProtocolConfig,
    pub rules: GameRules,
    pub registry: HeartbeatRegistry,
}

impl Runtime {
    pub fn new(config: ProtocolConfig, rules: GameRules) -> Self {
        Self {
            layout: Layout::new(&config.root),
            config,
            rules,
            registry: HeartbeatRegistry::new(),
        }
    }
}
