use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};

use recall_lib::config::RecallConfig;
use recall_lib::direction::{Direction, DirectionManager, DirectionStore};
use recall_lib::review::{FileBackend, KeyValueBackend, KvReviewStore};

/// Shared application state for CLI commands
pub struct App {
    pub config: RecallConfig,
    pub store: Arc<KvReviewStore>,
    pub directions: Arc<DirectionManager>,
    direction_store: DirectionStore,
}

impl App {
    /// Load config, open the data directory and restore the saved direction
    pub async fn new(config_path: Option<&Path>, data_dir: Option<PathBuf>) -> Result<Self> {
        let mut config = RecallConfig::load(config_path).context("Failed to load config")?;
        if data_dir.is_some() {
            config.data_dir = data_dir;
        }

        let dir = config
            .resolve_data_dir()
            .context("Failed to get data directory")?;
        let backend = FileBackend::new(dir);
        backend
            .init()
            .await
            .with_context(|| format!("Failed to initialize {}", backend.dir().display()))?;

        Self::open(config, Arc::new(backend)).await
    }

    /// Build the app over an already initialized backend
    pub async fn open(config: RecallConfig, backend: Arc<dyn KeyValueBackend>) -> Result<Self> {
        let store = Arc::new(
            KvReviewStore::new(backend.clone(), config.namespace.clone())
                .with_pair(config.language.clone()),
        );
        let direction_store =
            DirectionStore::new(backend, config.namespace.clone(), config.language.clone());

        let initial = direction_store
            .load()
            .await
            .context("Failed to read saved direction")?
            .unwrap_or(config.default_direction);
        let directions = Arc::new(DirectionManager::new(initial, config.language.clone()));

        Ok(Self {
            config,
            store,
            directions,
            direction_store,
        })
    }

    /// Parse a user-supplied direction, falling back to the current one
    pub fn resolve_direction(&self, value: Option<&str>) -> Result<Direction> {
        match value {
            Some(value) => Ok(self.directions.pair().normalize(value)?),
            None => Ok(self.directions.direction()),
        }
    }

    /// Change the current direction and persist it.
    ///
    /// The in-memory direction changes even when the save fails.
    pub async fn set_direction(&self, direction: Direction) -> Result<()> {
        self.directions.set_direction(direction);
        self.direction_store
            .save(direction)
            .await
            .context("Failed to save direction")
    }

    pub async fn toggle_direction(&self) -> Result<Direction> {
        let next = self.directions.direction().reversed();
        self.set_direction(next).await?;
        Ok(next)
    }

    /// Human-readable direction, e.g. "bg → de"
    pub fn label(&self, direction: Direction) -> String {
        self.directions.pair().label(direction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use recall_lib::review::MemoryBackend;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_direction_survives_restart() {
        let temp_dir = TempDir::new().unwrap();
        let missing_config = temp_dir.path().join("absent.toml");

        let app = App::new(Some(missing_config.as_path()), Some(temp_dir.path().to_path_buf()))
            .await
            .unwrap();
        assert_eq!(app.directions.direction(), Direction::BToA);
        app.set_direction(Direction::AToB).await.unwrap();

        let reopened = App::new(Some(missing_config.as_path()), Some(temp_dir.path().to_path_buf()))
            .await
            .unwrap();
        assert_eq!(reopened.directions.direction(), Direction::AToB);
    }

    #[tokio::test]
    async fn test_failed_save_still_switches_direction() {
        let backend = Arc::new(MemoryBackend::new());
        let app = App::open(RecallConfig::default(), backend.clone()).await.unwrap();

        backend.set_available(false);
        assert!(app.toggle_direction().await.is_err());
        assert_eq!(app.directions.direction(), Direction::AToB);
    }
}
