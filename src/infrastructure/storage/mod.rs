//! File-based storage implementation

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

use crate::domain::traits::RuleStore;
use crate::domain::entities::KeywordsState;
use crate::application::errors::StorageError;

/// Keyword rules, settings and template in one JSON file
pub struct JsonRuleStore {
    path: PathBuf,
    // Serializes writers so two renames never race
    write_lock: Mutex<()>,
}

impl JsonRuleStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl RuleStore for JsonRuleStore {
    async fn load(&self) -> Result<KeywordsState, StorageError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(
                    path = %self.path.display(),
                    "No keyword file yet, starting with an empty rule table"
                );
                Ok(KeywordsState::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, state: &KeywordsState) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().await;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let content = serde_json::to_string_pretty(state)?;
        let temp = self.temp_path();
        tokio::fs::write(&temp, content).await?;
        tokio::fs::rename(&temp, &self.path).await?;

        tracing::debug!(path = %self.path.display(), rules = state.rules.len(), "Saved keyword rules");
        Ok(())
    }
}
