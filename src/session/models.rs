//! Data models for study sessions

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::direction::Direction;
use crate::review::algorithm::is_correct;

/// Position of a session in its state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionState {
    /// Created, no cards yet
    Loading,
    /// Prompt of the current card is shown
    Ready,
    /// Answer of the current card is shown
    Revealed,
    /// A grade is being persisted
    Grading,
    /// Every card was graded
    Complete,
    /// Stopped early
    Ended,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionState::Complete | SessionState::Ended)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Loading => "loading",
            SessionState::Ready => "ready",
            SessionState::Revealed => "revealed",
            SessionState::Grading => "grading",
            SessionState::Complete => "complete",
            SessionState::Ended => "ended",
        };
        f.write_str(name)
    }
}

/// A card in a session: one vocabulary item with both language fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub id: String,
    pub prompt_a: String,
    pub prompt_b: String,
}

impl Card {
    pub fn new(id: impl Into<String>, prompt_a: impl Into<String>, prompt_b: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            prompt_a: prompt_a.into(),
            prompt_b: prompt_b.into(),
        }
    }

    /// Text shown on the front in `direction`
    pub fn prompt(&self, direction: Direction) -> &str {
        match direction {
            Direction::AToB => &self.prompt_a,
            Direction::BToA => &self.prompt_b,
        }
    }

    /// Text expected as the answer in `direction`
    pub fn answer(&self, direction: Direction) -> &str {
        self.prompt(direction.reversed())
    }
}

/// Statistics for one session. Not persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStats {
    pub started_at: DateTime<Utc>,
    pub total_cards: usize,
    pub reviewed_cards: usize,
    pub correct_answers: usize,
    pub grades: Vec<u8>,
}

impl SessionStats {
    pub fn new(started_at: DateTime<Utc>, total_cards: usize) -> Self {
        Self {
            started_at,
            total_cards,
            reviewed_cards: 0,
            correct_answers: 0,
            grades: Vec::new(),
        }
    }

    /// Record a grade that was successfully persisted
    pub(crate) fn record(&mut self, grade: i32) {
        self.reviewed_cards += 1;
        if is_correct(grade) {
            self.correct_answers += 1;
        }
        // Grades are validated to 0..=5 before they reach the stats
        self.grades.push(grade.clamp(0, 5) as u8);
    }

    /// Correct answers as a rounded percentage of reviewed cards
    pub fn accuracy(&self) -> u32 {
        if self.reviewed_cards == 0 {
            return 0;
        }
        (self.correct_answers as f64 / self.reviewed_cards as f64 * 100.0).round() as u32
    }

    /// Fraction of cards reviewed, 0.0-1.0
    pub fn progress(&self) -> f64 {
        if self.total_cards == 0 {
            return 0.0;
        }
        self.reviewed_cards as f64 / self.total_cards as f64
    }
}

/// What a presentation layer needs to render the session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub session_id: Uuid,
    pub state: SessionState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_card_id: Option<String>,
    /// Direction the current card was rendered in
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direction: Option<Direction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    /// Only present once the card is revealed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    pub is_revealed: bool,
    /// Zero-based position of the current card
    pub position: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<SessionStats>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionOutcome {
    Completed,
    Ended,
}

/// Final report of a finished session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub session_id: Uuid,
    pub outcome: SessionOutcome,
    pub stats: SessionStats,
    pub finished_at: DateTime<Utc>,
}

impl SessionSummary {
    pub fn duration(&self) -> Duration {
        self.finished_at - self.stats.started_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_stats_accuracy_and_progress() {
        let start = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
        let mut stats = SessionStats::new(start, 4);
        assert_eq!(stats.accuracy(), 0);

        stats.record(5);
        stats.record(2);
        stats.record(3);

        assert_eq!(stats.reviewed_cards, 3);
        assert_eq!(stats.correct_answers, 2);
        assert_eq!(stats.grades, vec![5, 2, 3]);
        assert_eq!(stats.accuracy(), 67);
        assert_eq!(stats.progress(), 0.75);
    }

    #[test]
    fn test_card_sides() {
        let card = Card::new("kotka", "котка", "Katze");
        assert_eq!(card.prompt(Direction::BToA), "Katze");
        assert_eq!(card.answer(Direction::BToA), "котка");
    }

    #[test]
    fn test_terminal_states() {
        assert!(SessionState::Complete.is_terminal());
        assert!(SessionState::Ended.is_terminal());
        assert!(!SessionState::Grading.is_terminal());
    }
}
