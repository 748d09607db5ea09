use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Trade direction. Normalized to Title case everywhere it is persisted or
/// hashed.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    /// The opposite side — used to size protective stop/target orders,
    /// which are always submitted on the side opposite the entry.
    pub fn opposite(self) -> Direction {
        match self {
            Direction::Long => Direction::Short,
            Direction::Short => Direction::Long,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Long => write!(f, "Long"),
            Direction::Short => write!(f, "Short"),
        }
    }
}

/// Error returned when a direction string does not match any known spelling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseDirectionError(pub String);

impl fmt::Display for ParseDirectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unrecognized direction: {:?}", self.0)
    }
}

impl std::error::Error for ParseDirectionError {}

impl FromStr for Direction {
    type Err = ParseDirectionError;

    /// Accepts any casing ("LONG", "long", "Long") through a single
    /// explicit parse point, rather than leaving ad-hoc casing checks
    /// scattered across call sites.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "long" => Ok(Direction::Long),
            "short" => Ok(Direction::Short),
            _ => Err(ParseDirectionError(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_title_case() {
        assert_eq!(Direction::Long.to_string(), "Long");
        assert_eq!(Direction::Short.to_string(), "Short");
    }

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!("LONG".parse::<Direction>().unwrap(), Direction::Long);
        assert_eq!("short".parse::<Direction>().unwrap(), Direction::Short);
        assert_eq!("ShOrT".parse::<Direction>().unwrap(), Direction::Short);
    }

    #[test]
    fn parse_rejects_unknown() {
        assert!("sideways".parse::<Direction>().is_err());
    }

    #[test]
    fn opposite_flips() {
        assert_eq!(Direction::Long.opposite(), Direction::Short);
        assert_eq!(Direction::Short.opposite(), Direction::Long);
    }
}
