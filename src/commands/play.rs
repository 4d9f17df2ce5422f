//! Play command - joins a game as an interactive or automated peer

use super::Runtime;
use crate::heartbeat;
use crate::models::TurnStatus;
use crate::peer::{Automated, Interactive, MoveStrategy, Peer};
use crate::services::{await_first, Service};
use anyhow::{bail, Context, Result};
use colored::Colorize;
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct PlayOptions {
    /// Also start an automated opponent in this process.
    pub cpu: bool,
    /// Let the game's suggestion play for you.
    pub auto: bool,
    pub id: Option<String>,
}

pub fn execute(runtime: &Runtime, options: PlayOptions) -> Result<()> {
    if !heartbeat::is_active(&runtime.layout.server_heartbeat(), &runtime.config) {
        bail!(
            "Coordinator is not running at {}. Start it with `turnfile server`.",
            runtime.layout.root().display()
        );
    }

    let strategy: Arc<dyn MoveStrategy> = if options.auto {
        Arc::new(Automated::labelled("you"))
    } else {
        Arc::new(Interactive::new())
    };
    let peer = Peer::new(
        options.id,
        &runtime.layout,
        &runtime.config,
        runtime.rules,
        &runtime.registry,
        strategy,
    )?;

    let opponent = if options.cpu {
        let cpu = Peer::new(
            None,
            &runtime.layout,
            &runtime.config,
            runtime.rules,
            &runtime.registry,
            Arc::new(Automated::labelled("cpu")),
        )?;
        cpu.start()?;
        Some(cpu)
    } else {
        None
    };

    let on_cancel = peer.clone();
    let cpu_on_cancel = opponent.clone();
    ctrlc::set_handler(move || {
        on_cancel.stop();
        if let Some(cpu) = &cpu_on_cancel {
            cpu.stop();
        }
    })
    .context("Failed to install Ctrl-C handler")?;

    let outcome: Option<TurnStatus> = await_first(&peer, runtime.config.tick)?;
    if let Some(cpu) = &opponent {
        cpu.stop();
    }

    match outcome {
        Some(TurnStatus::Won) => println!("{} You won", "✓".green().bold()),
        Some(TurnStatus::Lost) => println!("{} You lost", "✗".red().bold()),
        Some(TurnStatus::Tie) => println!("{} Tie", "=".yellow().bold()),
        Some(TurnStatus::Error) => bail!("Lost connection to the coordinator"),
        Some(status) => println!("{} Left the game ({status})", "─".dimmed()),
        None => println!("{} Left before the game started", "─".dimmed()),
    }
    Ok(())
}
