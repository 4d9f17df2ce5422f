//! Text payloads exchanged through reply files.

use std::fmt;

use anyhow::{bail, Context, Result};

use super::status::TurnStatus;

/// Coordinator-to-participant message: `"<STATUS>[\n<lastMove>]"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TurnSignal {
    pub status: TurnStatus,
    pub last_move: Option<usize>,
}

impl TurnSignal {
    pub fn new(status: TurnStatus, last_move: Option<usize>) -> Self {
        Self { status, last_move }
    }

    pub fn bare(status: TurnStatus) -> Self {
        Self::new(status, None)
    }

    /// Parse a reply payload. Empty payloads are not signals and yield `None`.
    pub fn parse(payload: &str) -> Result<Option<Self>> {
        let mut lines = payload.lines().map(str::trim).filter(|l| !l.is_empty());
        let Some(status_line) = lines.next() else {
            return Ok(None);
        };
        let status: TurnStatus = status_line.parse()?;
        let last_move = match lines.next() {
            Some(mv) => Some(
                mv.parse::<usize>()
                    .with_context(|| format!("Invalid move in turn signal: {mv:?}"))?,
            ),
            None => None,
        };
        if lines.next().is_some() {
            bail!("Turn signal has trailing lines: {payload:?}");
        }
        Ok(Some(Self { status, last_move }))
    }
}

impl fmt::Display for TurnSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.last_move {
            Some(mv) => write!(f, "{}\n{mv}", self.status),
            None => write!(f, "{}", self.status),
        }
    }
}

/// Matchmaker-to-requester message: `"<sessionId>\n<opponentId>"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairingNotice {
    pub session_id: String,
    pub opponent_id: String,
}

impl PairingNotice {
    pub fn parse(payload: &str) -> Result<Option<Self>> {
        let mut lines = payload.lines().map(str::trim).filter(|l| !l.is_empty());
        let Some(session_id) = lines.next() else {
            return Ok(None);
        };
        let Some(opponent_id) = lines.next() else {
            bail!("Pairing notice is missing the opponent id: {payload:?}");
        };
        Ok(Some(Self {
            session_id: session_id.to_string(),
            opponent_id: opponent_id.to_string(),
        }))
    }
}

impl fmt::Display for PairingNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\n{}", self.session_id, self.opponent_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_with_move() {
        let signal = TurnSignal::parse("YOUR_TURN\n42").unwrap().unwrap();
        assert_eq!(signal.status, TurnStatus::YourTurn);
        assert_eq!(signal.last_move, Some(42));
        assert_eq!(signal.to_string(), "YOUR_TURN\n42");
    }

    #[test]
    fn test_signal_without_move() {
        let signal = TurnSignal::parse("WAIT").unwrap().unwrap();
        assert_eq!(signal, TurnSignal::bare(TurnStatus::Wait));
        assert_eq!(signal.to_string(), "WAIT");
    }

    #[test]
    fn test_signal_tolerates_crlf() {
        let signal = TurnSignal::parse("LOST\r\n7\r\n").unwrap().unwrap();
        assert_eq!(signal, TurnSignal::new(TurnStatus::Lost, Some(7)));
    }

    #[test]
    fn test_empty_signal_is_none() {
        assert!(TurnSignal::parse("").unwrap().is_none());
        assert!(TurnSignal::parse("\n \n").unwrap().is_none());
    }

    #[test]
    fn test_malformed_signal() {
        assert!(TurnSignal::parse("MAYBE").is_err());
        assert!(TurnSignal::parse("WAIT\nabc").is_err());
        assert!(TurnSignal::parse("WAIT\n1\n2").is_err());
    }

    #[test]
    fn test_pairing_notice() {
        let notice = PairingNotice::parse("s-1\np2").unwrap().unwrap();
        assert_eq!(notice.session_id, "s-1");
        assert_eq!(notice.opponent_id, "p2");
        assert_eq!(notice.to_string(), "s-1\np2");
        assert!(PairingNotice::parse("s-1").is_err());
        assert!(PairingNotice::parse("").unwrap().is_none());
    }
}
