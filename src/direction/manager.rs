//! Shared, observable current direction
//!
//! One writer (the direction toggle) and many readers (sessions, renderers).
//! Subscribers are called synchronously after every actual change.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock, Weak};

use super::{Direction, DirectionError, LanguagePair};

/// Event delivered to subscribers when the direction changes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirectionChange {
    pub previous: Direction,
    pub next: Direction,
}

type Handler = Arc<dyn Fn(&DirectionChange) + Send + Sync>;
type HandlerMap = Mutex<HashMap<u64, Handler>>;

pub struct DirectionManager {
    current: RwLock<Direction>,
    pair: LanguagePair,
    handlers: Arc<HandlerMap>,
    next_id: AtomicU64,
}

impl DirectionManager {
    pub fn new(initial: Direction, pair: LanguagePair) -> Self {
        Self {
            current: RwLock::new(initial),
            pair,
            handlers: Arc::new(Mutex::new(HashMap::new())),
            next_id: AtomicU64::new(0),
        }
    }

    pub fn direction(&self) -> Direction {
        *self.current.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn pair(&self) -> &LanguagePair {
        &self.pair
    }

    /// Set the current direction, notifying subscribers if it changed
    pub fn set_direction(&self, next: Direction) -> Option<DirectionChange> {
        let previous = {
            let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
            std::mem::replace(&mut *current, next)
        };

        if previous == next {
            return None;
        }

        let change = DirectionChange { previous, next };
        log::debug!("Direction changed: {} -> {}", previous, next);
        self.notify(&change);
        Some(change)
    }

    /// Normalize and set a direction given as a string
    pub fn set_direction_str(&self, value: &str) -> Result<Option<DirectionChange>, DirectionError> {
        let direction = self.pair.normalize(value)?;
        Ok(self.set_direction(direction))
    }

    /// Switch to the opposite direction and return it
    pub fn toggle(&self) -> Direction {
        let next = self.direction().reversed();
        self.set_direction(next);
        next
    }

    /// Register a change handler. The handler stays registered until the
    /// returned `Subscription` is dropped or unsubscribed.
    pub fn subscribe<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&DirectionChange) + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, Arc::new(handler));
        Subscription {
            id,
            handlers: Arc::downgrade(&self.handlers),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.handlers.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    fn notify(&self, change: &DirectionChange) {
        // Handlers run outside the lock so they may subscribe or unsubscribe.
        let handlers: Vec<Handler> = self
            .handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        for handler in handlers {
            handler(change);
        }
    }
}

/// Handle for a registered direction handler
pub struct Subscription {
    id: u64,
    handlers: Weak<HandlerMap>,
}

impl Subscription {
    pub fn unsubscribe(self) {
        // Removal happens in Drop
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(handlers) = self.handlers.upgrade() {
            handlers
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .remove(&self.id);
        }
    }
}
