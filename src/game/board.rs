//! k-in-a-row on an n x n grid.

use std::fmt::Write as _;

use super::{Outcome, TurnGame};
use crate::config::GameRules;
use crate::error::ProtocolError;
use crate::models::constants::SESSION_SIZE;
use crate::models::TurnStatus;

/// Unit vectors for vertical, horizontal, diagonal and anti-diagonal runs.
const ORIENTATIONS: [(isize, isize); 4] = [(1, 0), (0, 1), (1, 1), (1, -1)];

const CENTRE_BIAS: f64 = 0.5;

/// k-in-a-row on an n x n grid. Slots are numbered row-major from 0.
#[derive(Debug, Clone)]
pub struct Board {
    size: usize,
    target: usize,
    players: [String; SESSION_SIZE],
    cells: Vec<Option<usize>>,
    free: usize,
    previous_player: usize,
    last_move: Option<usize>,
    winner: Option<usize>,
    winning: Vec<usize>,
}

impl Board {
    /// Build a board for exactly two participants.
    ///
    /// The lexicographically smaller id moves first, whichever order the
    /// ids are given in. Marks follow the given order.
    pub fn new(rules: GameRules, participants: &[String]) -> Result<Self, ProtocolError> {
        let [first, second] = participants else {
            return Err(ProtocolError::InvalidParticipantCount {
                expected: SESSION_SIZE,
                actual: participants.len(),
            });
        };
        let slots = rules.slots();
        Ok(Self {
            size: rules.board_size,
            target: rules.win_target,
            players: [first.clone(), second.clone()],
            cells: vec![None; slots],
            free: slots,
            // Whoever did not "move previously" moves first.
            previous_player: if first > second { 0 } else { 1 },
            last_move: None,
            winner: None,
            winning: Vec::new(),
        })
    }

    /// Slots forming the winning run, empty until someone wins.
    pub fn winning_slots(&self) -> &[usize] {
        &self.winning
    }

    /// Every free slot in ascending order.
    pub fn available_moves(&self) -> Vec<usize> {
        (0..self.cells.len()).filter(|&slot| self.cells[slot].is_none()).collect()
    }

    fn coordinate(&self, slot: usize) -> (usize, usize) {
        (slot / self.size, slot % self.size)
    }

    fn centre(&self) -> (usize, usize) {
        (self.size / 2, self.size / 2)
    }

    fn next_ordinal(&self) -> Option<usize> {
        if self.winner.is_some() || self.free == 0 {
            return None;
        }
        Some((self.previous_player + 1) % SESSION_SIZE)
    }

    /// Walk from `slot` along `(dr, dc)` while cells belong to `player`.
    fn run_from(&self, slot: usize, (dr, dc): (isize, isize), player: usize) -> Vec<usize> {
        let (row, col) = self.coordinate(slot);
        let (mut r, mut c) = (row as isize, col as isize);
        let mut run = Vec::new();
        loop {
            r += dr;
            c += dc;
            if r < 0 || c < 0 || r >= self.size as isize || c >= self.size as isize {
                break;
            }
            let next = r as usize * self.size + c as usize;
            if self.cells[next] != Some(player) {
                break;
            }
            run.push(next);
        }
        run
    }

    fn winning_run(&self, slot: usize, player: usize) -> Option<Vec<usize>> {
        ORIENTATIONS.iter().find_map(|&(dr, dc)| {
            let mut run = vec![slot];
            run.extend(self.run_from(slot, (dr, dc), player));
            run.extend(self.run_from(slot, (-dr, -dc), player));
            (run.len() >= self.target).then(|| {
                run.sort_unstable();
                run
            })
        })
    }
}

/// Grid distance where a diagonal step costs sqrt(2).
fn distance(a: (usize, usize), b: (usize, usize)) -> f64 {
    let rows = a.0.abs_diff(b.0);
    let cols = a.1.abs_diff(b.1);
    std::f64::consts::SQRT_2 * rows.min(cols) as f64 + rows.abs_diff(cols) as f64
}

impl TurnGame for Board {
    fn apply(&mut self, slot: Option<usize>) -> Result<(), ProtocolError> {
        let Some(slot) = slot else {
            return Ok(());
        };
        let Some(player) = self.next_ordinal() else {
            return Err(ProtocolError::InvalidMove { slot });
        };
        if !self.is_available(slot) {
            return Err(ProtocolError::InvalidMove { slot });
        }

        self.cells[slot] = Some(player);
        self.free -= 1;
        self.previous_player = player;
        self.last_move = Some(slot);
        if let Some(run) = self.winning_run(slot, player) {
            self.winner = Some(player);
            self.winning = run;
        }
        Ok(())
    }

    fn next_player(&self) -> Option<&str> {
        self.next_ordinal().map(|ordinal| self.players[ordinal].as_str())
    }

    fn outcome(&self) -> Option<Outcome> {
        match self.winner {
            Some(ordinal) => Some(Outcome::Winner(self.players[ordinal].clone())),
            None if self.free == 0 => Some(Outcome::Tie),
            None => None,
        }
    }

    fn status_for(&self, participant: &str) -> TurnStatus {
        if !self.players.iter().any(|p| p == participant) {
            return TurnStatus::Error;
        }
        match self.outcome() {
            Some(Outcome::Winner(winner)) if winner == participant => TurnStatus::Won,
            Some(Outcome::Winner(_)) => TurnStatus::Lost,
            Some(Outcome::Tie) => TurnStatus::Tie,
            None if self.next_player() == Some(participant) => TurnStatus::YourTurn,
            None => TurnStatus::Wait,
        }
    }

    fn suggest_move(&self) -> Option<usize> {
        if self.outcome().is_some() {
            return None;
        }
        let centre = self.centre();
        let anchor = match self.last_move {
            Some(slot) => self.coordinate(slot),
            None => centre,
        };
        // `min_by` keeps the first of equal candidates, so ties go to the
        // lowest slot index.
        self.available_moves().into_iter().min_by(|&a, &b| {
            let score = |slot: usize| {
                let at = self.coordinate(slot);
                distance(at, anchor) + CENTRE_BIAS * distance(at, centre)
            };
            score(a).total_cmp(&score(b))
        })
    }

    fn last_move(&self) -> Option<usize> {
        self.last_move
    }

    fn is_available(&self, slot: usize) -> bool {
        self.cells.get(slot).is_some_and(Option::is_none)
    }

    /// Player one's marks are `x`, player two's `o` (in the order given to
    /// `new`); the winning run is upper-cased.
    fn render(&self) -> String {
        let width = self.size.saturating_sub(1).to_string().len().max(1) + 1;
        let mut out = String::new();
        let _ = write!(out, "{:width$}", "");
        for col in 0..self.size {
            let _ = write!(out, "{col:>width$}");
        }
        out.push('\n');
        for row in 0..self.size {
            let _ = write!(out, "{row:>width$}");
            for col in 0..self.size {
                let slot = row * self.size + col;
                let mark = match self.cells[slot] {
                    None => '.',
                    Some(0) => 'x',
                    Some(_) => 'o',
                };
                let mark = if self.winning.contains(&slot) {
                    mark.to_ascii_uppercase()
                } else {
                    mark
                };
                let _ = write!(out, "{mark:>width$}");
            }
            out.push('\n');
        }
        out
    }
}
