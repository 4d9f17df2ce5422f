//! Interrupt command - asks a running coordinator to shut down

use crate::fs::{io, Layout};
use anyhow::{Context, Result};
use colored::Colorize;

/// Create the coordinator's interrupt marker.
pub fn execute(layout: &Layout) -> Result<()> {
    let marker = layout.server_interrupt();
    io::create(&marker)
        .with_context(|| format!("Failed to create interrupt marker: {}", marker.display()))?;
    println!("{} Interrupt requested", "→".cyan().bold());
    Ok(())
}
