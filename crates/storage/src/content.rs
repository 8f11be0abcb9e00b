use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use owl_core::model::{Story, TopicCatalog, TopicContent, TopicContentRecord, TopicId};
use serde::de::DeserializeOwned;

use crate::repository::{ContentSource, StorageError};

/// Content laid out as `<root>/games.json`, `<root>/story.json` and
/// `<root>/levels/<topic>.json`.
#[derive(Debug, Clone)]
pub struct JsonContentDir {
    root: PathBuf,
}

impl JsonContentDir {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn topic_path(&self, topic: &TopicId) -> Result<PathBuf, StorageError> {
        let name = topic.as_str();
        let plain = !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !plain {
            return Err(StorageError::NotFound);
        }
        Ok(self.root.join("levels").join(format!("{name}.json")))
    }
}

async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, StorageError> {
    let raw = tokio::fs::read_to_string(path).await.map_err(|err| {
        if err.kind() == io::ErrorKind::NotFound {
            StorageError::NotFound
        } else {
            StorageError::Connection(format!("{}: {err}", path.display()))
        }
    })?;
    serde_json::from_str(&raw)
        .map_err(|err| StorageError::Serialization(format!("{}: {err}", path.display())))
}

#[async_trait]
impl ContentSource for JsonContentDir {
    async fn load_topic(&self, topic: &TopicId) -> Result<TopicContent, StorageError> {
        let path = self.topic_path(topic)?;
        let record: TopicContentRecord = read_json(&path).await?;
        let content = TopicContent::from_record(record)
            .map_err(|err| StorageError::InvalidContent(format!("{topic}: {err}")))?;
        tracing::debug!(%topic, tasks = content.len(), "loaded topic content");
        Ok(content)
    }

    async fn load_catalog(&self) -> Result<TopicCatalog, StorageError> {
        read_json(&self.root.join("games.json")).await
    }

    async fn load_story(&self) -> Result<Story, StorageError> {
        read_json(&self.root.join("story.json")).await
    }
}
