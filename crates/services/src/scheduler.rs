use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use owl_core::model::{Task, TaskId, TopicContent, TopicId, TopicProgress};
use owl_core::scheduler::{effective_difficulty, next_task};
use storage::repository::ContentSource;

use crate::error::SchedulerError;
use crate::progress::ProgressStore;

/// Picks the next task of a topic for the current learner.
///
/// Topic content is fetched once and cached for the lifetime of the
/// scheduler. A failed fetch is not cached, so the next call retries.
pub struct TaskScheduler {
    content: Arc<dyn ContentSource>,
    cache: Mutex<HashMap<TopicId, Arc<TopicContent>>>,
}

impl TaskScheduler {
    #[must_use]
    pub fn new(content: Arc<dyn ContentSource>) -> Self {
        Self {
            content,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// All tasks of `topic`, loading them on first use.
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError::Content` if the content source fails.
    pub async fn content(&self, topic: &TopicId) -> Result<Arc<TopicContent>, SchedulerError> {
        if let Some(hit) = self.cached(topic) {
            return Ok(hit);
        }

        let loaded = match self.content.load_topic(topic).await {
            Ok(content) => Arc::new(content),
            Err(err) => {
                tracing::warn!(%topic, error = %err, "failed to load topic");
                return Err(err.into());
            }
        };
        if let Ok(mut cache) = self.cache.lock() {
            cache.insert(topic.clone(), Arc::clone(&loaded));
        }
        Ok(loaded)
    }

    /// The first uncompleted task at or below the learner's current difficulty.
    ///
    /// Does not touch progress; a topic never played counts as empty history.
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError::Content` if the topic cannot be loaded.
    pub async fn next(
        &self,
        topic: &TopicId,
        store: &ProgressStore,
    ) -> Result<Option<Task>, SchedulerError> {
        let content = self.content(topic).await?;
        let empty = TopicProgress::default();
        let record = store.progress().topic(topic).unwrap_or(&empty);
        let difficulty = effective_difficulty(record, store.age());
        let task = next_task(&content, record, difficulty).cloned();
        tracing::debug!(
            %topic,
            difficulty,
            task = task.as_ref().map(|t| t.id().as_str()),
            "scheduled"
        );
        Ok(task)
    }

    /// Look up one task by id, regardless of difficulty or completion.
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError::Content` if the topic cannot be loaded.
    pub async fn task(&self, topic: &TopicId, id: &TaskId) -> Result<Option<Task>, SchedulerError> {
        let content = self.content(topic).await?;
        Ok(content.find(id).cloned())
    }

    fn cached(&self, topic: &TopicId) -> Option<Arc<TopicContent>> {
        self.cache
            .lock()
            .ok()
            .and_then(|cache| cache.get(topic).cloned())
    }
}
