//! Data models for per-direction review state

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::direction::Direction;

/// Version written with every canonical review state
pub const SCHEMA_VERSION: u32 = 2;

/// Starting ease for an item that has never been reviewed
pub const DEFAULT_EASINESS_FACTOR: f64 = 2.5;

/// Minimum ease factor allowed
pub const MIN_EASINESS_FACTOR: f64 = 1.3;

/// Spaced repetition state for one item in one direction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewState {
    pub item_id: String,
    pub direction: Direction,
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    /// SM-2 ease factor, never below 1.3
    pub easiness_factor: f64,
    /// Days from the last review until the next one
    pub interval: u32,
    /// Consecutive successful repetitions since the last lapse
    pub repetitions: u32,
    pub next_review_at: DateTime<Utc>,
    #[serde(default)]
    pub last_reviewed_at: Option<DateTime<Utc>>,
    pub total_reviews: u32,
    pub correct_reviews: u32,
    /// Consecutive correct (grade >= 3) reviews
    pub streak: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

impl ReviewState {
    /// Fresh state for an item that has never been reviewed in `direction`
    pub fn new(item_id: impl Into<String>, direction: Direction, now: DateTime<Utc>) -> Self {
        Self {
            item_id: item_id.into(),
            direction,
            schema_version: SCHEMA_VERSION,
            easiness_factor: DEFAULT_EASINESS_FACTOR,
            interval: 1,
            repetitions: 0,
            next_review_at: now,
            last_reviewed_at: None,
            total_reviews: 0,
            correct_reviews: 0,
            streak: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.next_review_at <= now
    }

    /// Share of correct reviews as a rounded percentage
    pub fn accuracy(&self) -> u32 {
        if self.total_reviews == 0 {
            return 0;
        }
        (self.correct_reviews as f64 / self.total_reviews as f64 * 100.0).round() as u32
    }

    /// Check the structural invariants of a stored state
    pub fn validate(&self) -> Result<(), String> {
        if self.item_id.is_empty() {
            return Err("empty item id".to_string());
        }
        if !self.easiness_factor.is_finite() || self.easiness_factor < MIN_EASINESS_FACTOR {
            return Err(format!(
                "easiness factor {} below minimum {}",
                self.easiness_factor, MIN_EASINESS_FACTOR
            ));
        }
        if self.interval < 1 {
            return Err(format!("interval {} must be at least 1 day", self.interval));
        }
        if self.correct_reviews > self.total_reviews {
            return Err(format!(
                "{} correct reviews exceed {} total reviews",
                self.correct_reviews, self.total_reviews
            ));
        }
        Ok(())
    }
}

/// Per-item statistics derived from a review state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemStats {
    pub item_id: String,
    pub direction: Direction,
    pub total_reviews: u32,
    pub correct_reviews: u32,
    /// Percentage, 0-100
    pub accuracy: u32,
    pub streak: u32,
    pub easiness_factor: f64,
    pub interval: u32,
    pub next_review_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_reviewed_at: Option<DateTime<Utc>>,
}

impl From<&ReviewState> for ItemStats {
    fn from(state: &ReviewState) -> Self {
        Self {
            item_id: state.item_id.clone(),
            direction: state.direction,
            total_reviews: state.total_reviews,
            correct_reviews: state.correct_reviews,
            accuracy: state.accuracy(),
            streak: state.streak,
            easiness_factor: state.easiness_factor,
            interval: state.interval,
            next_review_at: state.next_review_at,
            last_reviewed_at: state.last_reviewed_at,
        }
    }
}

/// Aggregate statistics for all items in one direction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectionStats {
    pub direction: Direction,
    pub total: usize,
    pub due: usize,
    /// Mean ease factor, two decimals; 2.5 when there are no items
    pub average_ease: f64,
    /// Mean accuracy percentage over items with at least one review
    pub average_accuracy: u32,
}

impl DirectionStats {
    pub fn from_states(direction: Direction, states: &[ReviewState], now: DateTime<Utc>) -> Self {
        let states: Vec<&ReviewState> = states.iter().filter(|s| s.direction == direction).collect();
        let total = states.len();
        let due = states.iter().filter(|s| s.is_due(now)).count();

        let average_ease = if total > 0 {
            let sum: f64 = states.iter().map(|s| s.easiness_factor).sum();
            (sum / total as f64 * 100.0).round() / 100.0
        } else {
            DEFAULT_EASINESS_FACTOR
        };

        let reviewed: Vec<&&ReviewState> = states.iter().filter(|s| s.total_reviews > 0).collect();
        let average_accuracy = if reviewed.is_empty() {
            0
        } else {
            let sum: f64 = reviewed
                .iter()
                .map(|s| s.correct_reviews as f64 / s.total_reviews as f64 * 100.0)
                .sum();
            (sum / reviewed.len() as f64).round() as u32
        };

        Self {
            direction,
            total,
            due,
            average_ease,
            average_accuracy,
        }
    }
}

/// Schema-versioned dump of every canonical review state
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewExport {
    pub version: u32,
    pub exported_at: DateTime<Utc>,
    pub states: Vec<ReviewState>,
}

/// Outcome of importing a `ReviewExport`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub imported: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Outcome of a batch legacy migration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationReport {
    pub migrated: usize,
    pub skipped: usize,
    pub failed: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap()
    }

    #[test]
    fn test_new_state_is_due_immediately() {
        let state = ReviewState::new("haus", Direction::AToB, t0());
        assert!(state.is_due(t0()));
        assert_eq!(state.accuracy(), 0);
        assert!(state.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_broken_invariants() {
        let mut state = ReviewState::new("haus", Direction::AToB, t0());
        state.easiness_factor = 1.1;
        assert!(state.validate().is_err());

        let mut state = ReviewState::new("haus", Direction::AToB, t0());
        state.interval = 0;
        assert!(state.validate().is_err());

        let mut state = ReviewState::new("haus", Direction::AToB, t0());
        state.correct_reviews = 3;
        state.total_reviews = 2;
        assert!(state.validate().is_err());
    }

    #[test]
    fn test_missing_fields_fail_to_deserialize() {
        let json = r#"{"itemId":"haus","direction":"a-b","interval":1}"#;
        assert!(serde_json::from_str::<ReviewState>(json).is_err());
    }

    #[test]
    fn test_direction_stats() {
        let mut reviewed = ReviewState::new("a", Direction::AToB, t0());
        reviewed.total_reviews = 4;
        reviewed.correct_reviews = 3;
        reviewed.easiness_factor = 2.3;
        reviewed.next_review_at = t0() + Duration::days(3);

        let fresh = ReviewState::new("b", Direction::AToB, t0());
        let other = ReviewState::new("c", Direction::BToA, t0());

        let stats = DirectionStats::from_states(Direction::AToB, &[reviewed, fresh, other], t0());
        assert_eq!(stats.total, 2);
        assert_eq!(stats.due, 1);
        assert_eq!(stats.average_ease, 2.4);
        assert_eq!(stats.average_accuracy, 75);
    }

    #[test]
    fn test_empty_direction_stats() {
        let stats = DirectionStats::from_states(Direction::BToA, &[], t0());
        assert_eq!(stats.total, 0);
        assert_eq!(stats.average_ease, DEFAULT_EASINESS_FACTOR);
        assert_eq!(stats.average_accuracy, 0);
    }
}
