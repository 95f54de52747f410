//! Upgrade of review records written by earlier schedulers.
//!
//! Two older shapes are understood:
//! - Version 1 records, stored once per item (`<ns>:review:<item>`) with no
//!   direction. They are upgraded for the direction being asked for.
//! - Browser records, stored per language pair code
//!   (`<ns>:review_<item>_bg-de`) with epoch-millisecond timestamps. Their
//!   direction comes from the pair code.
//!
//! Nothing beyond these normalizations is guessed: a record that is missing
//! required fields or that breaks the state invariants after conversion is
//! treated as absent.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::errors::{StorageError, StorageResult};
use super::models::{ReviewExport, ReviewState, DEFAULT_EASINESS_FACTOR, SCHEMA_VERSION};
use crate::direction::{Direction, LanguagePair};

/// Shape written by the legacy single-direction scheduler
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyReviewState {
    pub word_id: String,
    #[serde(alias = "easeFactor")]
    pub easiness_factor: f64,
    pub interval: u32,
    pub repetitions: u32,
    pub next_review_date: DateTime<Utc>,
    #[serde(default)]
    pub last_review_date: Option<DateTime<Utc>>,
    pub total_reviews: u32,
    pub correct_answers: u32,
    #[serde(alias = "correctStreak")]
    pub streak: u32,
    #[serde(default)]
    pub created: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated: Option<DateTime<Utc>>,
}

impl LegacyReviewState {
    /// Convert to the canonical schema for `direction`
    pub fn upgrade(self, direction: Direction) -> ReviewState {
        let created_at = self.created.unwrap_or(self.next_review_date);
        ReviewState {
            item_id: self.word_id,
            direction,
            schema_version: SCHEMA_VERSION,
            easiness_factor: self.easiness_factor,
            interval: self.interval,
            repetitions: self.repetitions,
            next_review_at: self.next_review_date,
            last_reviewed_at: self.last_review_date,
            total_reviews: self.total_reviews,
            correct_reviews: self.correct_answers,
            streak: self.streak,
            created_at,
            updated_at: self.updated.unwrap_or(created_at),
        }
    }
}

/// Parse and upgrade a raw legacy record stored for `item_id`.
///
/// Returns `None` (after logging) when the record cannot be upgraded faithfully.
pub fn upgrade_legacy_record(raw: &str, item_id: &str, direction: Direction) -> Option<ReviewState> {
    let legacy: LegacyReviewState = match serde_json::from_str(raw) {
        Ok(legacy) => legacy,
        Err(e) => {
            log::warn!("Ignoring malformed legacy review record for {}: {}", item_id, e);
            return None;
        }
    };

    if legacy.word_id != item_id {
        log::warn!(
            "Ignoring legacy review record for {}: stored word id is {}",
            item_id,
            legacy.word_id
        );
        return None;
    }

    let state = legacy.upgrade(direction);
    if let Err(reason) = state.validate() {
        log::warn!("Ignoring legacy review record for {}: {}", item_id, reason);
        return None;
    }

    Some(state)
}

/// Shape written by the browser scheduler, one record per pair direction
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowserReviewState {
    #[serde(default)]
    pub item_id: Option<String>,
    /// Pair code such as `bg-de`
    #[serde(default)]
    pub direction: Option<String>,
    #[serde(default = "default_interval")]
    pub interval: u32,
    #[serde(default = "default_ease", alias = "easinessFactor")]
    pub ease_factor: f64,
    #[serde(default)]
    pub repetitions: u32,
    /// Epoch milliseconds
    pub next_review: i64,
    #[serde(default)]
    pub last_review: Option<i64>,
    #[serde(default)]
    pub total_reviews: u32,
    #[serde(default)]
    pub correct_answers: u32,
    #[serde(default)]
    pub correct_streak: u32,
    #[serde(default)]
    pub created: Option<i64>,
    #[serde(default)]
    pub updated: Option<i64>,
}

fn default_interval() -> u32 {
    1
}

fn default_ease() -> f64 {
    DEFAULT_EASINESS_FACTOR
}

fn from_millis(ms: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms)
}

impl BrowserReviewState {
    /// Convert to the canonical schema. `None` when a timestamp is out of range.
    pub fn upgrade(self, item_id: &str, direction: Direction) -> Option<ReviewState> {
        let next_review_at = from_millis(self.next_review)?;
        let last_reviewed_at = match self.last_review {
            Some(ms) => Some(from_millis(ms)?),
            None => None,
        };
        let created_at = match self.created {
            Some(ms) => from_millis(ms)?,
            None => last_reviewed_at.unwrap_or(next_review_at),
        };
        let updated_at = match self.updated {
            Some(ms) => from_millis(ms)?,
            None => created_at,
        };

        Some(ReviewState {
            item_id: item_id.to_string(),
            direction,
            schema_version: SCHEMA_VERSION,
            easiness_factor: self.ease_factor,
            interval: self.interval,
            repetitions: self.repetitions,
            next_review_at,
            last_reviewed_at,
            total_reviews: self.total_reviews,
            correct_reviews: self.correct_answers,
            streak: self.correct_streak,
            created_at,
            updated_at,
        })
    }
}

/// Check a converted browser record and log why it is rejected
fn accept_browser_state(state: Option<ReviewState>, origin: &str) -> Option<ReviewState> {
    let Some(state) = state else {
        log::warn!("Ignoring browser review record {}: timestamp out of range", origin);
        return None;
    };
    if let Err(reason) = state.validate() {
        log::warn!("Ignoring browser review record {}: {}", origin, reason);
        return None;
    }
    Some(state)
}

/// Parse and upgrade a browser record stored under the pair key of
/// (`item_id`, `direction`).
pub fn upgrade_browser_record(
    raw: &str,
    item_id: &str,
    direction: Direction,
    pair: &LanguagePair,
) -> Option<ReviewState> {
    let record: BrowserReviewState = match serde_json::from_str(raw) {
        Ok(record) => record,
        Err(e) => {
            log::warn!("Ignoring malformed browser review record for {}: {}", item_id, e);
            return None;
        }
    };

    if record.item_id.as_deref().is_some_and(|id| id != item_id) {
        log::warn!("Ignoring browser review record for {}: stored for another item", item_id);
        return None;
    }
    if let Some(code) = &record.direction {
        if pair.normalize(code).ok() != Some(direction) {
            log::warn!(
                "Ignoring browser review record for {} ({}): stored direction is {}",
                item_id,
                direction,
                code
            );
            return None;
        }
    }

    accept_browser_state(record.upgrade(item_id, direction), item_id)
}

/// Upgrade one entry of a browser export. The record names its own item and
/// direction.
fn upgrade_browser_export_entry(
    key: &str,
    value: serde_json::Value,
    pair: &LanguagePair,
) -> Option<ReviewState> {
    let record: BrowserReviewState = match serde_json::from_value(value) {
        Ok(record) => record,
        Err(e) => {
            log::warn!("Ignoring malformed browser review record {}: {}", key, e);
            return None;
        }
    };

    let Some(item_id) = record.item_id.clone().filter(|id| !id.is_empty()) else {
        log::warn!("Ignoring browser review record {}: no item id", key);
        return None;
    };
    let direction = match record.direction.as_deref().map(|code| pair.normalize(code)) {
        Some(Ok(direction)) => direction,
        _ => {
            log::warn!("Ignoring browser review record {}: no valid direction", key);
            return None;
        }
    };

    accept_browser_state(record.upgrade(&item_id, direction), key)
}

/// Export written by the browser scheduler: states keyed by storage key
#[derive(Debug, Deserialize)]
struct BrowserExport {
    /// Epoch milliseconds
    #[serde(default)]
    exported: i64,
    states: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ExportDocument {
    Current(ReviewExport),
    Browser(BrowserExport),
}

/// Read an export in the current format or the browser format.
///
/// Returns the canonical export and the number of browser entries that could
/// not be upgraded.
pub fn read_export(content: &str, pair: &LanguagePair) -> StorageResult<(ReviewExport, usize)> {
    match serde_json::from_str::<ExportDocument>(content)? {
        ExportDocument::Current(export) => {
            if export.version > SCHEMA_VERSION {
                return Err(StorageError::Incompatible(format!(
                    "export version {} is newer than supported version {}",
                    export.version, SCHEMA_VERSION
                )));
            }
            Ok((export, 0))
        }
        ExportDocument::Browser(export) => {
            let total = export.states.len();
            let states: Vec<ReviewState> = export
                .states
                .into_iter()
                .filter_map(|(key, value)| upgrade_browser_export_entry(&key, value, pair))
                .collect();
            let unreadable = total - states.len();

            Ok((
                ReviewExport {
                    version: SCHEMA_VERSION,
                    exported_at: from_millis(export.exported).unwrap_or_default(),
                    states,
                },
                unreadable,
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const LEGACY: &str = r#"{
        "wordId": "kniga",
        "easinessFactor": 2.36,
        "interval": 6,
        "repetitions": 2,
        "nextReviewDate": "2026-02-10T08:00:00.000Z",
        "lastReviewDate": "2026-02-04T08:00:00.000Z",
        "totalReviews": 3,
        "correctAnswers": 2,
        "streak": 2,
        "created": "2026-01-30T08:00:00.000Z",
        "updated": "2026-02-04T08:00:00.000Z"
    }"#;

    #[test]
    fn test_upgrade_legacy_record() {
        let state = upgrade_legacy_record(LEGACY, "kniga", Direction::BToA).unwrap();

        assert_eq!(state.item_id, "kniga");
        assert_eq!(state.direction, Direction::BToA);
        assert_eq!(state.schema_version, SCHEMA_VERSION);
        assert_eq!(state.easiness_factor, 2.36);
        assert_eq!(state.interval, 6);
        assert_eq!(state.correct_reviews, 2);
        assert_eq!(
            state.next_review_at,
            Utc.with_ymd_and_hms(2026, 2, 10, 8, 0, 0).unwrap()
        );
        assert_eq!(
            state.created_at,
            Utc.with_ymd_and_hms(2026, 1, 30, 8, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_upgrade_accepts_newer_legacy_field_names() {
        let raw = r#"{
            "wordId": "kniga",
            "easeFactor": 2.5,
            "interval": 1,
            "repetitions": 0,
            "nextReviewDate": "2026-02-10T08:00:00Z",
            "totalReviews": 0,
            "correctAnswers": 0,
            "correctStreak": 0
        }"#;
        let state = upgrade_legacy_record(raw, "kniga", Direction::AToB).unwrap();
        assert_eq!(state.created_at, state.next_review_at);
        assert_eq!(state.last_reviewed_at, None);
    }

    #[test]
    fn test_incomplete_legacy_record_is_absent() {
        let raw = r#"{"wordId": "kniga", "interval": 1}"#;
        assert!(upgrade_legacy_record(raw, "kniga", Direction::AToB).is_none());
    }

    #[test]
    fn test_legacy_record_for_other_word_is_absent() {
        assert!(upgrade_legacy_record(LEGACY, "stol", Direction::AToB).is_none());
    }

    #[test]
    fn test_legacy_record_violating_invariants_is_absent() {
        let raw = LEGACY.replace("\"interval\": 6", "\"interval\": 0");
        assert!(upgrade_legacy_record(&raw, "kniga", Direction::AToB).is_none());
    }

    const BROWSER: &str = r#"{
        "itemId": "kniga",
        "direction": "de-bg",
        "schemaVersion": 3,
        "phase": 2,
        "interval": 6,
        "easeFactor": 2.36,
        "repetitions": 2,
        "nextReview": 1770710400000,
        "lastReview": null,
        "totalReviews": 3,
        "correctAnswers": 2,
        "correctStreak": 2,
        "created": 1769760000000,
        "updated": 1770192000000
    }"#;

    #[test]
    fn test_upgrade_browser_record() {
        let pair = LanguagePair::default();
        let state = upgrade_browser_record(BROWSER, "kniga", Direction::BToA, &pair).unwrap();

        assert_eq!(state.direction, Direction::BToA);
        assert_eq!(state.schema_version, SCHEMA_VERSION);
        assert_eq!(state.easiness_factor, 2.36);
        assert_eq!(state.last_reviewed_at, None);
        assert_eq!(
            state.created_at,
            Utc.with_ymd_and_hms(2026, 1, 30, 8, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_browser_record_under_wrong_direction_is_absent() {
        let pair = LanguagePair::default();
        assert!(upgrade_browser_record(BROWSER, "kniga", Direction::AToB, &pair).is_none());
        assert!(upgrade_browser_record(BROWSER, "stol", Direction::BToA, &pair).is_none());
    }

    #[test]
    fn test_browser_record_without_due_date_is_absent() {
        let raw = r#"{"itemId": "kniga", "direction": "bg-de", "interval": 1}"#;
        let pair = LanguagePair::default();
        assert!(upgrade_browser_record(raw, "kniga", Direction::AToB, &pair).is_none());
    }

    #[test]
    fn test_read_browser_export() {
        let content = format!(
            r#"{{"version": 3, "exported": 1772355600000, "states": {{"bgde:review_kniga_de-bg": {}}}}}"#,
            BROWSER
        );
        let (export, unreadable) = read_export(&content, &LanguagePair::default()).unwrap();

        assert_eq!(unreadable, 0);
        assert_eq!(export.version, SCHEMA_VERSION);
        assert_eq!(
            export.exported_at,
            Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap()
        );
        assert_eq!(export.states[0].item_id, "kniga");
    }
}
