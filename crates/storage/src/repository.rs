use async_trait::async_trait;
use owl_core::model::{SessionProgress, Story, TopicCatalog, TopicContent, TopicId};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("invalid content: {0}")]
    InvalidContent(String),
}

/// Read-only source of task content, the topic catalog and the story script.
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Fetch and validate every task of a topic.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` for an unknown topic,
    /// `StorageError::InvalidContent` if any record fails validation.
    async fn load_topic(&self, topic: &TopicId) -> Result<TopicContent, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the catalog is missing or malformed.
    async fn load_catalog(&self) -> Result<TopicCatalog, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the story is missing or malformed.
    async fn load_story(&self) -> Result<Story, StorageError>;
}

/// Durable home of the learner's `SessionProgress`.
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// Load the last saved state, `None` when nothing was saved yet.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend is unreachable or the stored
    /// state cannot be decoded.
    async fn load(&self) -> Result<Option<SessionProgress>, StorageError>;

    /// Replace the stored state with `progress`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the state cannot be written.
    async fn save(&self, progress: &SessionProgress) -> Result<(), StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    progress: Arc<Mutex<Option<SessionProgress>>>,
    topics: Arc<Mutex<HashMap<TopicId, TopicContent>>>,
    catalog: Arc<Mutex<Option<TopicCatalog>>>,
    story: Arc<Mutex<Option<Story>>>,
    saves: Arc<AtomicUsize>,
}

fn poisoned<E: std::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the lock is poisoned.
    pub fn insert_topic(
        &self,
        topic: impl Into<TopicId>,
        content: TopicContent,
    ) -> Result<(), StorageError> {
        self.topics
            .lock()
            .map_err(poisoned)?
            .insert(topic.into(), content);
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the lock is poisoned.
    pub fn set_catalog(&self, catalog: TopicCatalog) -> Result<(), StorageError> {
        *self.catalog.lock().map_err(poisoned)? = Some(catalog);
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the lock is poisoned.
    pub fn set_story(&self, story: Story) -> Result<(), StorageError> {
        *self.story.lock().map_err(poisoned)? = Some(story);
        Ok(())
    }

    /// Number of successful `save` calls so far.
    #[must_use]
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContentSource for InMemoryRepository {
    async fn load_topic(&self, topic: &TopicId) -> Result<TopicContent, StorageError> {
        let guard = self.topics.lock().map_err(poisoned)?;
        guard.get(topic).cloned().ok_or(StorageError::NotFound)
    }

    async fn load_catalog(&self) -> Result<TopicCatalog, StorageError> {
        let guard = self.catalog.lock().map_err(poisoned)?;
        guard.clone().ok_or(StorageError::NotFound)
    }

    async fn load_story(&self) -> Result<Story, StorageError> {
        let guard = self.story.lock().map_err(poisoned)?;
        guard.clone().ok_or(StorageError::NotFound)
    }
}

#[async_trait]
impl ProgressRepository for InMemoryRepository {
    async fn load(&self) -> Result<Option<SessionProgress>, StorageError> {
        let guard = self.progress.lock().map_err(poisoned)?;
        Ok(guard.clone())
    }

    async fn save(&self, progress: &SessionProgress) -> Result<(), StorageError> {
        *self.progress.lock().map_err(poisoned)? = Some(progress.clone());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Aggregates content and progress behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub content: Arc<dyn ContentSource>,
    pub progress: Arc<dyn ProgressRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        Self::from_in_memory(&InMemoryRepository::new())
    }

    /// Share one in-memory repository for both roles, so callers can still seed it.
    #[must_use]
    pub fn from_in_memory(repo: &InMemoryRepository) -> Self {
        let content: Arc<dyn ContentSource> = Arc::new(repo.clone());
        let progress: Arc<dyn ProgressRepository> = Arc::new(repo.clone());
        Self { content, progress }
    }
}
