//! Storage of review states keyed by (item, direction)
//!
//! Key layout inside a backend:
//! ```text
//! {namespace}:review_{item_id}_{a-b|b-a}   # Canonical state, one per direction
//! {namespace}:review_{item_id}_{bg-de|de-bg} # Browser record, keyed by pair code
//! {namespace}:review:{item_id}             # Legacy single-direction record
//! ```
//!
//! Reads fall back to the older records only when no canonical record exists.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::backend::KeyValueBackend;
use super::errors::StorageResult;
use super::migration::{read_export, upgrade_browser_record, upgrade_legacy_record};
use super::models::*;
use crate::direction::{Direction, LanguagePair};

/// Persistence contract for review states.
///
/// A state stored under one direction is never returned for the other.
/// Writes are last-writer-wins.
#[async_trait]
pub trait ReviewStateStore: Send + Sync {
    /// Get the state for an item in a direction; malformed records read as absent
    async fn get(&self, item_id: &str, direction: Direction) -> StorageResult<Option<ReviewState>>;

    /// Replace the state stored under the state's own key
    async fn put(&self, state: &ReviewState) -> StorageResult<()>;

    async fn delete(&self, item_id: &str, direction: Direction) -> StorageResult<()>;

    /// All states in `direction` with `next_review_at <= now`, oldest first
    async fn list_due(&self, direction: Direction, now: DateTime<Utc>) -> StorageResult<Vec<ReviewState>>;
}

/// Review store over any namespaced key/value backend
pub struct KvReviewStore {
    backend: Arc<dyn KeyValueBackend>,
    namespace: String,
    pair: LanguagePair,
}

impl KvReviewStore {
    pub fn new(backend: Arc<dyn KeyValueBackend>, namespace: impl Into<String>) -> Self {
        Self {
            backend,
            namespace: namespace.into(),
            pair: LanguagePair::default(),
        }
    }

    /// Language pair whose codes name browser records
    pub fn with_pair(mut self, pair: LanguagePair) -> Self {
        self.pair = pair;
        self
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    fn canonical_prefix(&self) -> String {
        format!("{}:review_", self.namespace)
    }

    fn legacy_prefix(&self) -> String {
        format!("{}:review:", self.namespace)
    }

    /// Key for the canonical state of an item in a direction
    pub fn review_key(&self, item_id: &str, direction: Direction) -> String {
        format!("{}{}_{}", self.canonical_prefix(), item_id, direction.code())
    }

    /// Key of the legacy single-direction record of an item
    pub fn legacy_key(&self, item_id: &str) -> String {
        format!("{}{}", self.legacy_prefix(), item_id)
    }

    /// Key of the browser record of an item, unless pair codes collide with
    /// canonical direction codes
    fn browser_key(&self, item_id: &str, direction: Direction) -> Option<String> {
        let code = self.pair.code(direction);
        if Direction::ALL.iter().any(|d| d.code() == code) {
            return None;
        }
        Some(format!("{}{}_{}", self.canonical_prefix(), item_id, code))
    }

    /// Split a browser key back into (item id, direction)
    fn parse_browser_key(&self, key: &str) -> Option<(String, Direction)> {
        let rest = key.strip_prefix(&self.canonical_prefix())?;
        Direction::ALL.into_iter().find_map(|direction| {
            let code = self.pair.code(direction);
            if Direction::ALL.iter().any(|d| d.code() == code) {
                return None;
            }
            let item_id = rest.strip_suffix(&format!("_{}", code))?;
            (!item_id.is_empty()).then(|| (item_id.to_string(), direction))
        })
    }

    /// Split a canonical key back into (item id, direction)
    fn parse_review_key(&self, key: &str) -> Option<(String, Direction)> {
        let rest = key.strip_prefix(&self.canonical_prefix())?;
        let (item_id, code) = rest.rsplit_once('_')?;
        let direction = match code {
            "a-b" => Direction::AToB,
            "b-a" => Direction::BToA,
            _ => return None,
        };
        if item_id.is_empty() {
            return None;
        }
        Some((item_id.to_string(), direction))
    }

    /// Decode a canonical record, rejecting anything malformed or misfiled
    fn decode(key: &str, raw: &str, item_id: &str, direction: Direction) -> Option<ReviewState> {
        let state: ReviewState = match serde_json::from_str(raw) {
            Ok(state) => state,
            Err(e) => {
                log::warn!("Ignoring malformed review record {}: {}", key, e);
                return None;
            }
        };

        if state.item_id != item_id || state.direction != direction {
            log::warn!(
                "Ignoring review record {}: contains state for {} ({})",
                key,
                state.item_id,
                state.direction
            );
            return None;
        }

        if let Err(reason) = state.validate() {
            log::warn!("Ignoring review record {}: {}", key, reason);
            return None;
        }

        Some(state)
    }

    /// All canonical states, optionally restricted to one direction
    pub async fn list_all(&self, direction: Option<Direction>) -> StorageResult<Vec<ReviewState>> {
        let keys = self.backend.keys(&self.canonical_prefix()).await?;
        let mut states = Vec::new();

        for key in keys {
            let Some((item_id, key_direction)) = self.parse_review_key(&key) else {
                continue;
            };
            if direction.is_some_and(|d| d != key_direction) {
                continue;
            }
            if let Some(raw) = self.backend.read(&key).await? {
                if let Some(state) = Self::decode(&key, &raw, &item_id, key_direction) {
                    states.push(state);
                }
            }
        }

        Ok(states)
    }

    /// Aggregate statistics for one direction
    pub async fn direction_stats(&self, direction: Direction, now: DateTime<Utc>) -> StorageResult<DirectionStats> {
        let states = self.list_all(Some(direction)).await?;
        Ok(DirectionStats::from_states(direction, &states, now))
    }

    /// Statistics for a single item; `None` if it was never reviewed in `direction`
    pub async fn item_stats(&self, item_id: &str, direction: Direction) -> StorageResult<Option<ItemStats>> {
        Ok(self.get(item_id, direction).await?.as_ref().map(ItemStats::from))
    }

    /// Dump every canonical state with the current schema version
    pub async fn export(&self, now: DateTime<Utc>) -> StorageResult<ReviewExport> {
        Ok(ReviewExport {
            version: SCHEMA_VERSION,
            exported_at: now,
            states: self.list_all(None).await?,
        })
    }

    /// Write every valid state of an export. Invalid states are skipped;
    /// states that fail to write are counted as failed.
    pub async fn import(&self, export: &ReviewExport) -> StorageResult<ImportReport> {
        let mut report = ImportReport::default();

        for state in &export.states {
            if let Err(reason) = state.validate() {
                log::warn!("Skipping imported state for {}: {}", state.item_id, reason);
                report.skipped += 1;
                continue;
            }
            match self.put(state).await {
                Ok(()) => report.imported += 1,
                Err(e) => {
                    log::warn!("Failed to import state for {}: {}", state.item_id, e);
                    report.failed += 1;
                }
            }
        }

        log::info!(
            "Import complete: {} imported, {} skipped, {} failed",
            report.imported,
            report.skipped,
            report.failed
        );
        Ok(report)
    }

    /// Import an export document, either in the current format or as
    /// written by the browser scheduler
    pub async fn import_json(&self, content: &str) -> StorageResult<ImportReport> {
        let (export, unreadable) = read_export(content, &self.pair)?;
        let mut report = self.import(&export).await?;
        report.skipped += unreadable;
        Ok(report)
    }

    /// Upgrade every older record that has no canonical counterpart yet.
    ///
    /// Version 1 records are upgraded into `direction`; browser records keep
    /// the direction of their pair code. The old records are left in place.
    pub async fn migrate_all_legacy(&self, direction: Direction) -> StorageResult<MigrationReport> {
        let mut report = MigrationReport::default();

        let prefix = self.legacy_prefix();
        for key in self.backend.keys(&prefix).await? {
            let item_id = &key[prefix.len()..];
            if self.has_canonical(item_id, direction).await? {
                report.skipped += 1;
                continue;
            }

            let upgraded = match self.backend.read(&key).await? {
                Some(raw) => upgrade_legacy_record(&raw, item_id, direction),
                None => None,
            };
            self.store_migrated(upgraded, item_id, direction, &mut report).await;
        }

        for key in self.backend.keys(&self.canonical_prefix()).await? {
            let Some((item_id, pair_direction)) = self.parse_browser_key(&key) else {
                continue;
            };
            if self.has_canonical(&item_id, pair_direction).await? {
                report.skipped += 1;
                continue;
            }

            let upgraded = match self.backend.read(&key).await? {
                Some(raw) => upgrade_browser_record(&raw, &item_id, pair_direction, &self.pair),
                None => None,
            };
            self.store_migrated(upgraded, &item_id, pair_direction, &mut report).await;
        }

        Ok(report)
    }

    async fn has_canonical(&self, item_id: &str, direction: Direction) -> StorageResult<bool> {
        Ok(self.backend.read(&self.review_key(item_id, direction)).await?.is_some())
    }

    async fn store_migrated(
        &self,
        upgraded: Option<ReviewState>,
        item_id: &str,
        direction: Direction,
        report: &mut MigrationReport,
    ) {
        let Some(state) = upgraded else {
            report.failed += 1;
            return;
        };

        match self.put(&state).await {
            Ok(()) => {
                log::info!("Migrated review state for {} to {}", item_id, direction);
                report.migrated += 1;
            }
            Err(e) => {
                log::warn!("Failed to migrate review state for {}: {}", item_id, e);
                report.failed += 1;
            }
        }
    }
}

#[async_trait]
impl ReviewStateStore for KvReviewStore {
    async fn get(&self, item_id: &str, direction: Direction) -> StorageResult<Option<ReviewState>> {
        let key = self.review_key(item_id, direction);
        if let Some(raw) = self.backend.read(&key).await? {
            return Ok(Self::decode(&key, &raw, item_id, direction));
        }

        // Older records are only consulted when no canonical record exists.
        // The upgraded state becomes canonical on the next put for this key.
        if let Some(browser_key) = self.browser_key(item_id, direction) {
            if let Some(raw) = self.backend.read(&browser_key).await? {
                let upgraded = upgrade_browser_record(&raw, item_id, direction, &self.pair);
                if upgraded.is_some() {
                    log::info!("Upgraded browser review state for {} ({})", item_id, direction);
                }
                return Ok(upgraded);
            }
        }

        let Some(raw) = self.backend.read(&self.legacy_key(item_id)).await? else {
            return Ok(None);
        };
        let upgraded = upgrade_legacy_record(&raw, item_id, direction);
        if upgraded.is_some() {
            log::info!("Upgraded legacy review state for {} ({})", item_id, direction);
        }
        Ok(upgraded)
    }

    async fn put(&self, state: &ReviewState) -> StorageResult<()> {
        let key = self.review_key(&state.item_id, state.direction);
        let data = serde_json::to_string(state)?;
        self.backend.write(&key, &data).await
    }

    async fn delete(&self, item_id: &str, direction: Direction) -> StorageResult<()> {
        self.backend.remove(&self.review_key(item_id, direction)).await
    }

    async fn list_due(&self, direction: Direction, now: DateTime<Utc>) -> StorageResult<Vec<ReviewState>> {
        let mut due: Vec<ReviewState> = self
            .list_all(Some(direction))
            .await?
            .into_iter()
            .filter(|state| state.is_due(now))
            .collect();

        // Sort by due date (oldest first)
        due.sort_by(|a, b| a.next_review_at.cmp(&b.next_review_at));
        Ok(due)
    }
}
