//! Spaced repetition state for vocabulary items
//!
//! This module provides:
//! - Per-direction review state models
//! - SM-2 spaced repetition algorithm
//! - Review state storage over swappable key/value backends
//! - Upgrade of legacy single-direction records

pub mod algorithm;
pub mod backend;
pub mod errors;
pub mod migration;
pub mod models;
pub mod storage;

pub use algorithm::{Scheduler, Sm2Scheduler};
pub use backend::{FileBackend, KeyValueBackend, MemoryBackend};
pub use errors::{SchedulerError, StorageError};
pub use models::*;
pub use storage::{KvReviewStore, ReviewStateStore};
