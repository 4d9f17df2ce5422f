//! `turnfile` command-line entry point.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use turnfile::commands::play::PlayOptions;
use turnfile::commands::{interrupt, play, server, status, Runtime};
use turnfile::config::Settings;
use turnfile::validation::clap_id_validator;

#[derive(Parser)]
#[command(name = "turnfile")]
#[command(about = "Turn-based games between processes over a shared directory", long_about = None)]
#[command(version)]
struct Cli {
    /// Storage root shared by the coordinator and every peer
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// TOML settings file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Poll and heartbeat period in milliseconds
    #[arg(long, global = true)]
    tick_ms: Option<u64>,

    /// Extra grace period before a silent heartbeat counts as lost
    #[arg(long, global = true)]
    slack_ms: Option<u64>,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the matchmaking coordinator (blocks until interrupted)
    Server,

    /// Ask a running coordinator to shut down
    Interrupt,

    /// Show whether a coordinator is running and how busy it is
    Status,

    /// Join a game
    Play {
        /// Start an automated opponent in this process
        #[arg(long)]
        cpu: bool,

        /// Play the suggested move automatically
        #[arg(long)]
        auto: bool,

        /// Participant id (random if omitted)
        #[arg(long, value_parser = clap_id_validator)]
        id: Option<String>,
    },
}

fn setup_logging(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .init();
}

fn runtime(cli: &Cli) -> Result<Runtime> {
    let settings = match &cli.config {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };
    let mut config = settings.protocol();
    if let Some(root) = &cli.root {
        config.root = root.clone();
    }
    if let Some(tick) = cli.tick_ms {
        config.tick = Duration::from_millis(tick);
    }
    if let Some(slack) = cli.slack_ms {
        config.slack = Duration::from_millis(slack);
    }
    let rules = settings.rules().context("Invalid game settings")?;
    Ok(Runtime::new(config, rules))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);
    let runtime = runtime(&cli)?;

    match cli.command {
        Commands::Server => server::execute(&runtime),
        Commands::Interrupt => interrupt::execute(&runtime.layout),
        Commands::Status => status::execute(&runtime.layout, &runtime.config),
        Commands::Play { cpu, auto, id } => play::execute(&runtime, PlayOptions { cpu, auto, id }),
    }
}
