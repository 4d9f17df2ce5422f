//! Move decision strategies.

use std::io::{self, BufRead, Write};

use anyhow::{anyhow, bail, Context, Result};

use crate::services::CancelToken;

/// What a strategy sees when asked for a move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnView {
    pub board: String,
    pub board_size: usize,
    pub last_move: Option<usize>,
    pub suggested: Option<usize>,
    /// Free slots in ascending order.
    pub available: Vec<usize>,
}

impl TurnView {
    pub fn is_available(&self, slot: usize) -> bool {
        self.available.binary_search(&slot).is_ok()
    }

    /// `(row, column)` of a slot.
    pub fn coordinate(&self, slot: usize) -> (usize, usize) {
        (slot / self.board_size, slot % self.board_size)
    }
}

/// Decides a peer's moves and receives its progress messages.
///
/// `decide_move` runs on its own thread and may block for as long as it
/// likes; it should return [`crate::error::ProtocolError::Cancelled`] (via
/// `cancel.check()`) once the token is cancelled.
pub trait MoveStrategy: Send + Sync {
    fn decide_move(&self, view: &TurnView, cancel: &CancelToken) -> Result<usize>;

    fn log(&self, message: &str);
}

/// Plays the game's suggested move. Messages go to the debug log.
#[derive(Debug, Clone, Default)]
pub struct Automated {
    label: Option<String>,
}

impl Automated {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prefix log lines, e.g. with `cpu` when sharing a process with a human.
    pub fn labelled(label: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
        }
    }
}

impl MoveStrategy for Automated {
    fn decide_move(&self, view: &TurnView, cancel: &CancelToken) -> Result<usize> {
        cancel.check()?;
        view.suggested
            .or_else(|| view.available.first().copied())
            .ok_or_else(|| anyhow!("No free slot left to play"))
    }

    fn log(&self, message: &str) {
        match &self.label {
            Some(label) => tracing::debug!("[{label}] {message}"),
            None => tracing::debug!("{message}"),
        }
    }
}

/// Prompts on stdout and reads moves from stdin.
///
/// Accepts either `row col` (also `row,col`) or a single slot number; an
/// empty line takes the suggestion. Invalid input re-prompts.
#[derive(Debug, Clone, Default)]
pub struct Interactive;

impl Interactive {
    pub fn new() -> Self {
        Self
    }
}

/// Parse operator input into a slot. `Ok(None)` means "use the suggestion".
pub fn parse_move(input: &str, board_size: usize) -> Result<Option<usize>> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(None);
    }
    let parts: Vec<&str> = input
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|p| !p.is_empty())
        .collect();
    let number = |part: &str| {
        part.parse::<usize>()
            .with_context(|| format!("'{part}' is not a number"))
    };
    match parts.as_slice() {
        [slot] => Ok(Some(number(slot)?)),
        [row, col] => {
            let (row, col) = (number(row)?, number(col)?);
            if row >= board_size || col >= board_size {
                bail!("Row and column must be below {board_size}");
            }
            Ok(Some(row * board_size + col))
        }
        _ => bail!("Enter 'row col' or a slot number"),
    }
}

impl MoveStrategy for Interactive {
    fn decide_move(&self, view: &TurnView, cancel: &CancelToken) -> Result<usize> {
        println!("\n{}", view.board);
        let hint = view
            .suggested
            .map(|slot| {
                let (row, col) = view.coordinate(slot);
                format!(" [{row} {col}]")
            })
            .unwrap_or_default();

        let stdin = io::stdin();
        loop {
            cancel.check()?;
            print!("Your move (row col){hint}: ");
            io::stdout().flush().context("Failed to flush stdout")?;

            let mut line = String::new();
            let read = stdin
                .lock()
                .read_line(&mut line)
                .context("Failed to read move from stdin")?;
            cancel.check()?;
            if read == 0 {
                bail!("Input closed while waiting for a move");
            }

            let slot = match parse_move(&line, view.board_size) {
                Ok(Some(slot)) => slot,
                Ok(None) => match view.suggested {
                    Some(slot) => slot,
                    None => continue,
                },
                Err(e) => {
                    println!("{e}");
                    continue;
                }
            };
            if view.is_available(slot) {
                return Ok(slot);
            }
            println!("That slot is not available.");
        }
    }

    fn log(&self, message: &str) {
        println!("{message}");
    }
}
