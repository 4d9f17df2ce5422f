use std::fmt;
use std::str::FromStr;

use anyhow::{bail, Error};

/// Status line of a turn signal, as seen by the participant it is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TurnStatus {
    YourTurn,
    Wait,
    Won,
    Lost,
    Tie,
    Error,
}

impl TurnStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::YourTurn => "YOUR_TURN",
            Self::Wait => "WAIT",
            Self::Won => "WON",
            Self::Lost => "LOST",
            Self::Tie => "TIE",
            Self::Error => "ERROR",
        }
    }
}

impl fmt::Display for TurnStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TurnStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "YOUR_TURN" => Ok(Self::YourTurn),
            "WAIT" => Ok(Self::Wait),
            "WON" => Ok(Self::Won),
            "LOST" => Ok(Self::Lost),
            "TIE" => Ok(Self::Tie),
            "ERROR" => Ok(Self::Error),
            other => bail!("Unknown turn status: {other:?}"),
        }
    }
}
