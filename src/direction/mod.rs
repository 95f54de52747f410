//! Learning direction for a bilingual vocabulary pair
//!
//! This module provides:
//! - The `Direction` value (which language is prompt vs answer)
//! - Normalization of user/legacy direction strings
//! - `DirectionManager`, the shared observable current direction
//! - `DirectionStore`, persistence of the chosen direction

pub mod manager;
pub mod store;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use manager::{DirectionChange, DirectionManager, Subscription};
pub use store::DirectionStore;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DirectionError {
    #[error("Invalid direction: {0:?}")]
    InvalidDirection(String),
}

/// Which of the two languages is shown as the prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Direction {
    /// Language A is the prompt, language B the expected answer
    #[serde(rename = "a-b")]
    AToB,
    /// Language B is the prompt, language A the expected answer
    #[serde(rename = "b-a")]
    BToA,
}

impl Direction {
    pub const ALL: [Direction; 2] = [Direction::AToB, Direction::BToA];

    /// Stable code used in storage keys
    pub fn code(self) -> &'static str {
        match self {
            Direction::AToB => "a-b",
            Direction::BToA => "b-a",
        }
    }

    pub fn reversed(self) -> Direction {
        match self {
            Direction::AToB => Direction::BToA,
            Direction::BToA => Direction::AToB,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Direction {
    type Err = DirectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('_', "-");
        match normalized.as_str() {
            "a-b" | "a-to-b" | "atob" | "ab" => Ok(Direction::AToB),
            "b-a" | "b-to-a" | "btoa" | "ba" => Ok(Direction::BToA),
            _ => Err(DirectionError::InvalidDirection(s.to_string())),
        }
    }
}

/// The two language codes of a vocabulary pair, e.g. `bg` and `de`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguagePair {
    pub a: String,
    pub b: String,
}

impl Default for LanguagePair {
    fn default() -> Self {
        Self {
            a: "bg".to_string(),
            b: "de".to_string(),
        }
    }
}

impl LanguagePair {
    pub fn new(a: impl Into<String>, b: impl Into<String>) -> Self {
        Self {
            a: a.into(),
            b: b.into(),
        }
    }

    /// Language code shown as the prompt in `direction`
    pub fn source(&self, direction: Direction) -> &str {
        match direction {
            Direction::AToB => &self.a,
            Direction::BToA => &self.b,
        }
    }

    /// Language code expected as the answer in `direction`
    pub fn target(&self, direction: Direction) -> &str {
        self.source(direction.reversed())
    }

    /// Pair-specific code, e.g. `bg-de`
    pub fn code(&self, direction: Direction) -> String {
        format!("{}-{}", self.source(direction), self.target(direction))
    }

    /// Human-readable label, e.g. `bg → de`
    pub fn label(&self, direction: Direction) -> String {
        format!("{} → {}", self.source(direction), self.target(direction))
    }

    /// Normalize a direction string.
    ///
    /// Accepts the generic forms (`a-b`, `a_to_b`, ...) and the pair forms
    /// (`bg-de`, `bg_to_de`, ...), case-insensitively.
    pub fn normalize(&self, value: &str) -> Result<Direction, DirectionError> {
        let normalized = value.trim().to_lowercase().replace('_', "-");
        for direction in Direction::ALL {
            let source = self.source(direction).to_lowercase();
            let target = self.target(direction).to_lowercase();
            if normalized == format!("{}-{}", source, target)
                || normalized == format!("{}-to-{}", source, target)
            {
                return Ok(direction);
            }
        }
        value
            .parse()
            .map_err(|_| DirectionError::InvalidDirection(value.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_generic_forms() {
        assert_eq!("a-b".parse::<Direction>().unwrap(), Direction::AToB);
        assert_eq!("A_TO_B".parse::<Direction>().unwrap(), Direction::AToB);
        assert_eq!(" b-to-a ".parse::<Direction>().unwrap(), Direction::BToA);
        assert!("sideways".parse::<Direction>().is_err());
    }

    #[test]
    fn test_normalize_pair_forms() {
        let pair = LanguagePair::new("bg", "de");
        assert_eq!(pair.normalize("bg-de").unwrap(), Direction::AToB);
        assert_eq!(pair.normalize("BG_TO_DE").unwrap(), Direction::AToB);
        assert_eq!(pair.normalize("de-bg").unwrap(), Direction::BToA);
        assert_eq!(pair.normalize("de_to_bg").unwrap(), Direction::BToA);
        assert_eq!(pair.normalize("b-a").unwrap(), Direction::BToA);
        assert_eq!(
            pair.normalize("en-fr"),
            Err(DirectionError::InvalidDirection("en-fr".to_string()))
        );
    }

    #[test]
    fn test_pair_labels() {
        let pair = LanguagePair::new("bg", "de");
        assert_eq!(pair.code(Direction::BToA), "de-bg");
        assert_eq!(pair.label(Direction::AToB), "bg → de");
        assert_eq!(pair.target(Direction::AToB), "de");
    }

    #[test]
    fn test_serde_codes() {
        let json = serde_json::to_string(&Direction::AToB).unwrap();
        assert_eq!(json, "\"a-b\"");
        let parsed: Direction = serde_json::from_str("\"b-a\"").unwrap();
        assert_eq!(parsed, Direction::BToA);
    }
}
