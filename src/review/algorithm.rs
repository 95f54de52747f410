//! SM-2 Spaced Repetition Algorithm
//!
//! Implementation of the SuperMemo 2 algorithm for calculating
//! optimal review intervals based on learner performance.
//!
//! Grades (0-5):
//! - 0: Complete blackout, no recall
//! - 1: Incorrect, but upon seeing answer, remembered
//! - 2: Incorrect, but answer seemed easy to recall
//! - 3: Correct response with serious difficulty
//! - 4: Correct response after hesitation
//! - 5: Perfect response with no hesitation

use chrono::{DateTime, Duration, Utc};

use super::errors::{SchedulerError, SchedulerResult};
use super::models::{ReviewState, MIN_EASINESS_FACTOR, SCHEMA_VERSION};
use crate::direction::Direction;

/// Lowest grade counted as a correct answer
pub const PASSING_GRADE: i32 = 3;

/// Ease lost on a failed review
const LAPSE_PENALTY: f64 = 0.2;

/// Longest interval ever scheduled, in days (about a century)
pub const MAX_INTERVAL_DAYS: u32 = 36_500;

/// Computes the next review state from the previous one and a grade.
///
/// Implementations must be pure: identical inputs give identical outputs.
pub trait Scheduler: Send + Sync {
    fn schedule(
        &self,
        previous: Option<&ReviewState>,
        item_id: &str,
        direction: Direction,
        grade: i32,
        now: DateTime<Utc>,
    ) -> SchedulerResult<ReviewState>;
}

/// The SM-2 scheduler
#[derive(Debug, Clone, Copy, Default)]
pub struct Sm2Scheduler;

impl Scheduler for Sm2Scheduler {
    fn schedule(
        &self,
        previous: Option<&ReviewState>,
        item_id: &str,
        direction: Direction,
        grade: i32,
        now: DateTime<Utc>,
    ) -> SchedulerResult<ReviewState> {
        schedule_next(previous, item_id, direction, grade, now)
    }
}

/// The numeric part of a review state that SM-2 evolves
#[derive(Debug, Clone, Copy, PartialEq)]
struct Sm2Step {
    easiness_factor: f64,
    interval: u32,
    repetitions: u32,
}

pub fn is_correct(grade: i32) -> bool {
    grade >= PASSING_GRADE
}

fn check_grade(grade: i32) -> SchedulerResult<()> {
    if (0..=5).contains(&grade) {
        Ok(())
    } else {
        Err(SchedulerError::InvalidGrade(grade))
    }
}

fn round_ease(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn next_step(step: Sm2Step, grade: i32) -> Sm2Step {
    if is_correct(grade) {
        // EF' = EF + (0.1 - (5-q) * (0.08 + (5-q) * 0.02))
        let miss = (5 - grade) as f64;
        let easiness_factor = round_ease(
            (step.easiness_factor + (0.1 - miss * (0.08 + miss * 0.02))).max(MIN_EASINESS_FACTOR),
        );
        let repetitions = step.repetitions + 1;
        let interval = match repetitions {
            1 => 1,
            2 => 6,
            _ => (step.interval as f64 * easiness_factor)
                .round()
                .clamp(1.0, MAX_INTERVAL_DAYS as f64) as u32,
        };
        Sm2Step {
            easiness_factor,
            interval,
            repetitions,
        }
    } else {
        Sm2Step {
            easiness_factor: round_ease((step.easiness_factor - LAPSE_PENALTY).max(MIN_EASINESS_FACTOR)),
            interval: 1,
            repetitions: 0,
        }
    }
}

/// Calculate the state after reviewing `item_id` in `direction` with `grade`.
///
/// A missing `previous` state is treated as a fresh item (ease 2.5, interval 1).
pub fn schedule_next(
    previous: Option<&ReviewState>,
    item_id: &str,
    direction: Direction,
    grade: i32,
    now: DateTime<Utc>,
) -> SchedulerResult<ReviewState> {
    check_grade(grade)?;

    let base = match previous {
        Some(state) => {
            state.validate().map_err(SchedulerError::InvalidState)?;
            if state.item_id != item_id || state.direction != direction {
                return Err(SchedulerError::InvalidState(format!(
                    "state belongs to {} ({}), not {} ({})",
                    state.item_id, state.direction, item_id, direction
                )));
            }
            state.clone()
        }
        None => ReviewState::new(item_id, direction, now),
    };

    let step = next_step(
        Sm2Step {
            easiness_factor: base.easiness_factor,
            interval: base.interval,
            repetitions: base.repetitions,
        },
        grade,
    );
    let correct = is_correct(grade);
    let next_review_at = now
        .checked_add_signed(Duration::days(i64::from(step.interval)))
        .ok_or_else(|| {
            SchedulerError::InvalidState(format!(
                "next review {} days after {} is out of range",
                step.interval, now
            ))
        })?;

    Ok(ReviewState {
        schema_version: SCHEMA_VERSION,
        easiness_factor: step.easiness_factor,
        interval: step.interval,
        repetitions: step.repetitions,
        next_review_at,
        last_reviewed_at: Some(now),
        total_reviews: base.total_reviews + 1,
        correct_reviews: base.correct_reviews + u32::from(correct),
        streak: if correct { base.streak + 1 } else { 0 },
        updated_at: now,
        ..base
    })
}

/// Calculate the preview intervals for the four answer buttons.
/// Used to show learners what interval each rating would give.
pub fn preview_intervals(previous: Option<&ReviewState>) -> [u32; 4] {
    // Again (1), Hard (3), Good (4), Easy (5)
    let step = previous.map_or(
        Sm2Step {
            easiness_factor: super::models::DEFAULT_EASINESS_FACTOR,
            interval: 1,
            repetitions: 0,
        },
        |s| Sm2Step {
            easiness_factor: s.easiness_factor,
            interval: s.interval,
            repetitions: s.repetitions,
        },
    );

    [1, 3, 4, 5].map(|grade| next_step(step, grade).interval)
}

/// Format an interval in days to a human-readable string
pub fn format_interval(days: u32) -> String {
    match days {
        0 => "now".to_string(),
        1..=6 => format!("{}d", days),
        7..=29 => format!("{}w", days / 7),
        30..=364 => format!("{}mo", days / 30),
        _ => format!("{}y", days / 365),
    }
}
