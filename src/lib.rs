//! Bilingual vocabulary review with spaced repetition.
//!
//! - [`review`]: SM-2 scheduling and per-direction review state storage
//! - [`direction`]: the shared learning direction and its persistence
//! - [`session`]: the study session state machine
//! - [`catalog`], [`config`], [`clock`]: inputs and ambient wiring

pub mod catalog;
pub mod clock;
pub mod config;
pub mod direction;
pub mod review;
pub mod session;

pub use clock::{Clock, SystemClock};
pub use config::RecallConfig;
pub use direction::{Direction, DirectionManager, LanguagePair};
pub use review::{KvReviewStore, ReviewState, ReviewStateStore, Scheduler, Sm2Scheduler};
pub use session::{Card, SessionController, SessionError, SessionState};
