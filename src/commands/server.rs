//! Server command - runs the matchmaking coordinator in the foreground

use super::Runtime;
use crate::coordinator::Matchmaker;
use crate::models::constants::exit;
use crate::services::Service;
use anyhow::{Context, Result};
use colored::Colorize;
use std::sync::mpsc;

/// Run the coordinator until an operator interrupt (or Ctrl-C), then clear
/// the storage root and exit with the interrupted status.
pub fn execute(runtime: &Runtime) -> Result<()> {
    println!(
        "{} Starting coordinator at {}",
        "→".cyan().bold(),
        runtime.layout.root().display()
    );
    let matchmaker = Matchmaker::start(
        &runtime.layout,
        &runtime.config,
        runtime.rules,
        &runtime.registry,
    )
    .context("Failed to start coordinator")?;

    let (tx, rx) = mpsc::channel::<&'static str>();
    let marker_tx = tx.clone();
    matchmaker.on_interrupt(move || {
        let _ = marker_tx.send("Interrupt signal received.");
        Ok(())
    })?;
    ctrlc::set_handler(move || {
        let _ = tx.send("Ctrl-C received.");
    })
    .context("Failed to install Ctrl-C handler")?;

    println!(
        "{} Coordinator running (board {}x{}, {} in a row). Stop it with `turnfile interrupt`.",
        "✓".green().bold(),
        runtime.rules.board_size,
        runtime.rules.board_size,
        runtime.rules.win_target
    );

    let reason = rx.recv().context("Interrupt channel closed")?;
    println!("{} {reason}", "!".yellow().bold());
    matchmaker.stop();
    runtime.layout.clear();
    std::process::exit(exit::INTERRUPTED);
}
