//! Study session driver
//!
//! State machine:
//! ```text
//! Loading ─start─▶ Ready ─reveal─▶ Revealed ─grade─▶ Grading ─┬─▶ Ready (next card)
//!                                     ▲                        ├─▶ Complete
//!                                     └──── store failure ─────┘
//! any non-terminal state ─end─▶ Ended
//! ```
//!
//! The controller is driven by discrete calls and takes `&self`, so it can be
//! shared between a driver and e.g. an "end session" handler. Mutable state
//! lives behind a mutex that is never held across a persistence call. While a
//! grade is being persisted the session is `Grading` and further `reveal` or
//! `grade` calls are rejected with `OperationInProgress` rather than queued.
//!
//! A `grade` future dropped before it finishes (a timeout, a `select!` that
//! picked another branch) puts the card back to `Revealed`, as a failed write
//! would. The write may or may not have reached the store by then; the stats
//! only count grades whose write was seen to complete.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use tokio::sync::watch;
use uuid::Uuid;

use super::errors::{SessionError, SessionResult};
use super::models::*;
use crate::clock::{Clock, SystemClock};
use crate::config::SessionConfig;
use crate::direction::{Direction, DirectionManager};
use crate::review::algorithm::{Scheduler, Sm2Scheduler};
use crate::review::errors::SchedulerError;
use crate::review::models::ReviewState;
use crate::review::storage::ReviewStateStore;

struct SessionInner {
    state: SessionState,
    cards: Vec<Card>,
    index: usize,
    /// Direction the current card was rendered in
    direction: Option<Direction>,
    stats: Option<SessionStats>,
    finished_at: Option<DateTime<Utc>>,
}

impl SessionInner {
    fn current_card(&self) -> Option<&Card> {
        match self.state {
            SessionState::Ready | SessionState::Revealed | SessionState::Grading => {
                self.cards.get(self.index)
            }
            _ => None,
        }
    }
}

pub struct SessionController {
    id: Uuid,
    store: Arc<dyn ReviewStateStore>,
    scheduler: Arc<dyn Scheduler>,
    directions: Arc<DirectionManager>,
    clock: Arc<dyn Clock>,
    config: SessionConfig,
    inner: Mutex<SessionInner>,
    snapshots: watch::Sender<SessionSnapshot>,
}

impl SessionController {
    /// Create a controller using the SM-2 scheduler and the system clock
    pub fn new(
        store: Arc<dyn ReviewStateStore>,
        directions: Arc<DirectionManager>,
        config: SessionConfig,
    ) -> Self {
        let id = Uuid::new_v4();
        let inner = SessionInner {
            state: SessionState::Loading,
            cards: Vec::new(),
            index: 0,
            direction: None,
            stats: None,
            finished_at: None,
        };
        let (snapshots, _) = watch::channel(Self::build_snapshot(id, &inner));

        Self {
            id,
            store,
            scheduler: Arc::new(Sm2Scheduler),
            directions,
            clock: Arc::new(SystemClock),
            config,
            inner: Mutex::new(inner),
            snapshots,
        }
    }

    pub fn with_scheduler(mut self, scheduler: Arc<dyn Scheduler>) -> Self {
        self.scheduler = scheduler;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    fn lock(&self) -> MutexGuard<'_, SessionInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ==================== Commands ====================

    /// Start the session with the given cards in `direction`.
    ///
    /// Cards are shuffled and bounded to the configured session size; the
    /// first card is shown immediately.
    pub fn start(&self, cards: Vec<Card>, direction: Direction) -> SessionResult<()> {
        let mut guard = self.lock();
        let inner = &mut *guard;

        if inner.state != SessionState::Loading {
            return Err(SessionError::InvalidTransition {
                from: inner.state,
                action: "start",
            });
        }
        if cards.is_empty() {
            return Err(SessionError::EmptySession);
        }

        let mut cards = cards;
        if self.config.shuffle {
            cards.shuffle(&mut rand::thread_rng());
        }
        if self.config.max_cards > 0 {
            cards.truncate(self.config.max_cards);
        }

        self.directions.set_direction(direction);

        let now = self.clock.now();
        inner.stats = Some(SessionStats::new(now, cards.len()));
        inner.cards = cards;
        inner.index = 0;
        log::info!(
            "Session {} started with {} cards ({})",
            self.id,
            inner.cards.len(),
            direction
        );

        self.show_current_card(inner);
        self.publish(inner);
        Ok(())
    }

    /// Show the answer of the current card
    pub fn reveal(&self) -> SessionResult<()> {
        let mut guard = self.lock();
        let inner = &mut *guard;

        match inner.state {
            SessionState::Ready => {}
            SessionState::Grading => return Err(SessionError::OperationInProgress),
            from => {
                return Err(SessionError::InvalidTransition {
                    from,
                    action: "reveal",
                })
            }
        }

        inner.state = SessionState::Revealed;
        log::debug!("Session {}: revealed card {}", self.id, inner.index);
        self.publish(inner);
        Ok(())
    }

    /// Grade the revealed card and advance.
    ///
    /// The new review state is written before the session statistics change.
    /// If the write fails the error is returned, the card stays revealed and
    /// the grade can be retried. Returns the state that was written.
    pub async fn grade(&self, score: i32) -> SessionResult<ReviewState> {
        let (item_id, direction) = {
            let mut guard = self.lock();
            let inner = &mut *guard;

            match inner.state {
                SessionState::Revealed => {}
                SessionState::Grading => return Err(SessionError::OperationInProgress),
                from => {
                    return Err(SessionError::InvalidTransition {
                        from,
                        action: "grade",
                    })
                }
            }
            if !(0..=5).contains(&score) {
                return Err(SchedulerError::InvalidGrade(score).into());
            }

            let (Some(card), Some(direction)) = (inner.current_card(), inner.direction) else {
                return Err(SessionError::InvalidTransition {
                    from: inner.state,
                    action: "grade",
                });
            };
            let item_id = card.id.clone();

            inner.state = SessionState::Grading;
            self.publish(inner);
            (item_id, direction)
        };

        let pending = PendingGrade { controller: self };
        let result = self.persist_grade(&item_id, direction, score).await;
        pending.settle();

        let mut guard = self.lock();
        let inner = &mut *guard;
        match &result {
            Ok(_) => {
                if let Some(stats) = inner.stats.as_mut() {
                    stats.record(score);
                }
                if inner.state == SessionState::Grading {
                    self.advance(inner);
                } else {
                    // Ended while the write was in flight: keep the write, stay ended
                    log::info!(
                        "Session {}: grade for {} persisted after the session ended",
                        self.id,
                        item_id
                    );
                }
            }
            Err(e) => {
                log::warn!(
                    "Session {}: failed to record grade {} for {} ({}): {}",
                    self.id,
                    score,
                    item_id,
                    direction,
                    e
                );
                if inner.state == SessionState::Grading {
                    inner.state = SessionState::Revealed;
                }
            }
        }
        self.publish(inner);

        result
    }

    /// Stop the session early. Review states already written are kept.
    pub fn end(&self) -> SessionResult<SessionSummary> {
        let mut guard = self.lock();
        let inner = &mut *guard;

        if inner.state.is_terminal() {
            return Err(SessionError::InvalidTransition {
                from: inner.state,
                action: "end",
            });
        }

        let now = self.clock.now();
        inner.state = SessionState::Ended;
        inner.finished_at = Some(now);
        let stats = inner
            .stats
            .get_or_insert_with(|| SessionStats::new(now, 0))
            .clone();
        log::info!(
            "Session {} ended early after {}/{} cards",
            self.id,
            stats.reviewed_cards,
            stats.total_cards
        );
        self.publish(inner);

        Ok(SessionSummary {
            session_id: self.id,
            outcome: SessionOutcome::Ended,
            stats,
            finished_at: now,
        })
    }

    // ==================== Queries ====================

    pub fn state(&self) -> SessionState {
        self.lock().state
    }

    pub fn stats(&self) -> Option<SessionStats> {
        self.lock().stats.clone()
    }

    pub fn current_card(&self) -> Option<Card> {
        self.lock().current_card().cloned()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        Self::build_snapshot(self.id, &self.lock())
    }

    /// Receive a new snapshot after every transition
    pub fn watch(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshots.subscribe()
    }

    /// Final report, once the session is complete or ended
    pub fn summary(&self) -> Option<SessionSummary> {
        let inner = self.lock();
        let outcome = match inner.state {
            SessionState::Complete => SessionOutcome::Completed,
            SessionState::Ended => SessionOutcome::Ended,
            _ => return None,
        };
        Some(SessionSummary {
            session_id: self.id,
            outcome,
            stats: inner.stats.clone()?,
            finished_at: inner.finished_at?,
        })
    }

    // ==================== Internals ====================

    async fn persist_grade(&self, item_id: &str, direction: Direction, score: i32) -> SessionResult<ReviewState> {
        let now = self.clock.now();
        let previous = self.store.get(item_id, direction).await?;

        let next = match self.scheduler.schedule(previous.as_ref(), item_id, direction, score, now) {
            Ok(next) => next,
            Err(SchedulerError::InvalidState(reason)) => {
                log::warn!(
                    "Reinitializing review state for {} ({}): {}",
                    item_id,
                    direction,
                    reason
                );
                self.scheduler.schedule(None, item_id, direction, score, now)?
            }
            Err(e) => return Err(e.into()),
        };

        self.store.put(&next).await?;
        Ok(next)
    }

    /// Render the card at `inner.index`, reading the direction once
    fn show_current_card(&self, inner: &mut SessionInner) {
        inner.state = SessionState::Ready;
        inner.direction = Some(self.directions.direction());
        log::debug!(
            "Session {}: showing card {}/{}",
            self.id,
            inner.index + 1,
            inner.cards.len()
        );
    }

    fn advance(&self, inner: &mut SessionInner) {
        inner.index += 1;
        if inner.index < inner.cards.len() {
            self.show_current_card(inner);
            return;
        }

        inner.state = SessionState::Complete;
        inner.direction = None;
        inner.finished_at = Some(self.clock.now());
        if let Some(stats) = &inner.stats {
            log::info!(
                "Session {} complete: {}/{} correct",
                self.id,
                stats.correct_answers,
                stats.reviewed_cards
            );
        }
    }

    /// Put an abandoned grade's card back on screen
    fn abandon_grade(&self) {
        let mut guard = self.lock();
        let inner = &mut *guard;
        if inner.state == SessionState::Grading {
            log::warn!("Session {}: grade abandoned before it was recorded", self.id);
            inner.state = SessionState::Revealed;
            self.publish(inner);
        }
    }

    fn publish(&self, inner: &SessionInner) {
        self.snapshots.send_replace(Self::build_snapshot(self.id, inner));
    }

    fn build_snapshot(session_id: Uuid, inner: &SessionInner) -> SessionSnapshot {
        let card = inner.current_card();
        let direction = card.and(inner.direction);
        let is_revealed = matches!(inner.state, SessionState::Revealed | SessionState::Grading);

        SessionSnapshot {
            session_id,
            state: inner.state,
            current_card_id: card.map(|c| c.id.clone()),
            direction,
            prompt: card.zip(direction).map(|(c, d)| c.prompt(d).to_string()),
            answer: card
                .zip(direction)
                .filter(|_| is_revealed)
                .map(|(c, d)| c.answer(d).to_string()),
            is_revealed,
            position: inner.index,
            stats: inner.stats.clone(),
        }
    }
}

/// Reverts `Grading` if the grade future is dropped mid-write
struct PendingGrade<'a> {
    controller: &'a SessionController,
}

impl PendingGrade<'_> {
    /// The write finished; the caller takes over the state change
    fn settle(self) {
        std::mem::forget(self);
    }
}

impl Drop for PendingGrade<'_> {
    fn drop(&mut self) {
        self.controller.abandon_grade();
    }
}
