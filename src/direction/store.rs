//! Persistence of the chosen learning direction.
//!
//! A single string under a well-known key, read at process start and written
//! on every change.

use std::sync::Arc;

use super::{Direction, LanguagePair};
use crate::review::backend::KeyValueBackend;
use crate::review::errors::StorageResult;

pub struct DirectionStore {
    backend: Arc<dyn KeyValueBackend>,
    namespace: String,
    pair: LanguagePair,
}

impl DirectionStore {
    pub fn new(backend: Arc<dyn KeyValueBackend>, namespace: impl Into<String>, pair: LanguagePair) -> Self {
        Self {
            backend,
            namespace: namespace.into(),
            pair,
        }
    }

    fn key(&self) -> String {
        format!("{}:language-direction", self.namespace)
    }

    fn legacy_key(&self) -> String {
        format!("{}:learning_direction", self.namespace)
    }

    /// Load the persisted direction. Unrecognized values are ignored.
    pub async fn load(&self) -> StorageResult<Option<Direction>> {
        for key in [self.key(), self.legacy_key()] {
            let Some(value) = self.backend.read(&key).await? else {
                continue;
            };
            // Older writers stored the value as a JSON string
            let value = value.trim().trim_matches('"');
            match self.pair.normalize(value) {
                Ok(direction) => return Ok(Some(direction)),
                Err(e) => log::warn!("Ignoring stored direction under {}: {}", key, e),
            }
        }
        Ok(None)
    }

    pub async fn save(&self, direction: Direction) -> StorageResult<()> {
        self.backend.write(&self.key(), &self.pair.code(direction)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::review::backend::MemoryBackend;

    fn create_test_store() -> (DirectionStore, Arc<MemoryBackend>) {
        let backend = Arc::new(MemoryBackend::new());
        let store = DirectionStore::new(backend.clone(), "bgde", LanguagePair::new("bg", "de"));
        (store, backend)
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let (store, backend) = create_test_store();
        assert_eq!(store.load().await.unwrap(), None);

        store.save(Direction::BToA).await.unwrap();
        assert_eq!(
            backend.read("bgde:language-direction").await.unwrap().as_deref(),
            Some("de-bg")
        );
        assert_eq!(store.load().await.unwrap(), Some(Direction::BToA));
    }

    #[tokio::test]
    async fn test_legacy_key_fallback() {
        let (store, backend) = create_test_store();
        backend.write("bgde:learning_direction", "\"bg_to_de\"").await.unwrap();
        assert_eq!(store.load().await.unwrap(), Some(Direction::AToB));
    }

    #[tokio::test]
    async fn test_unrecognized_value_ignored() {
        let (store, backend) = create_test_store();
        backend.write("bgde:language-direction", "en-fr").await.unwrap();
        assert_eq!(store.load().await.unwrap(), None);
    }
}
