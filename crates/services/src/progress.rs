use std::sync::Arc;

use owl_core::model::{
    AgeTier, RecordOutcome, SessionProgress, Story, StoryAdvance, TaskId, TopicId, TopicProgress,
    TopicSummary, Verdict,
};
use storage::repository::ProgressRepository;

/// Single owner of the learner's progress.
///
/// Every mutator writes the full state through the repository before it
/// returns. Write failures are logged and counted but never surface to the
/// caller: the in-memory state stays authoritative.
pub struct ProgressStore {
    progress: SessionProgress,
    repo: Arc<dyn ProgressRepository>,
    persist_failures: usize,
}

impl ProgressStore {
    /// Load saved progress, falling back to defaults when nothing is stored
    /// or the stored state cannot be read.
    pub async fn load(repo: Arc<dyn ProgressRepository>) -> Self {
        let progress = match repo.load().await {
            Ok(Some(progress)) => progress,
            Ok(None) => {
                tracing::debug!("no saved progress, starting fresh");
                SessionProgress::default()
            }
            Err(err) => {
                tracing::warn!(error = %err, "failed to load progress, starting fresh");
                SessionProgress::default()
            }
        };
        Self::with_progress(progress, repo)
    }

    #[must_use]
    pub fn with_progress(progress: SessionProgress, repo: Arc<dyn ProgressRepository>) -> Self {
        Self {
            progress,
            repo,
            persist_failures: 0,
        }
    }

    #[must_use]
    pub fn progress(&self) -> &SessionProgress {
        &self.progress
    }

    #[must_use]
    pub fn age(&self) -> AgeTier {
        self.progress.age()
    }

    #[must_use]
    pub fn stars(&self) -> u32 {
        self.progress.stars()
    }

    #[must_use]
    pub fn is_muted(&self) -> bool {
        self.progress.is_muted()
    }

    /// Number of saves that failed since this store was created.
    #[must_use]
    pub fn persist_failures(&self) -> usize {
        self.persist_failures
    }

    /// The topic record, created empty on first access. Creation alone is not persisted.
    pub fn topic_progress(&mut self, topic: &TopicId) -> &TopicProgress {
        self.progress.topic_entry(topic)
    }

    #[must_use]
    pub fn topic_summary(&self, topic: &TopicId) -> TopicSummary {
        TopicSummary::from_progress(self.progress.topic(topic))
    }

    pub async fn record_answer(
        &mut self,
        topic: &TopicId,
        task: &TaskId,
        verdict: Verdict,
    ) -> RecordOutcome {
        let outcome = self.progress.record_answer(topic, task, verdict);
        tracing::info!(
            %topic,
            %task,
            correct = verdict.is_correct(),
            newly_completed = outcome.newly_completed,
            stars = outcome.stars,
            "answer recorded"
        );
        self.persist().await;
        outcome
    }

    pub async fn set_age(&mut self, age: AgeTier) {
        self.progress.set_age(age);
        self.persist().await;
    }

    /// Returns the new mute flag.
    pub async fn toggle_mute(&mut self) -> bool {
        let muted = self.progress.toggle_mute();
        self.persist().await;
        muted
    }

    /// Forget everything, back to the first-launch state.
    pub async fn reset(&mut self) {
        self.progress = SessionProgress::default();
        tracing::info!("progress reset");
        self.persist().await;
    }

    pub async fn advance_story(&mut self, story: &Story) -> StoryAdvance {
        let advance = self.progress.advance_story(story);
        self.persist().await;
        advance
    }

    async fn persist(&mut self) {
        if let Err(err) = self.repo.save(&self.progress).await {
            self.persist_failures += 1;
            tracing::warn!(
                error = %err,
                failures = self.persist_failures,
                "failed to persist progress"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use storage::repository::{InMemoryRepository, StorageError};

    struct BrokenRepository;

    #[async_trait]
    impl ProgressRepository for BrokenRepository {
        async fn load(&self) -> Result<Option<SessionProgress>, StorageError> {
            Err(StorageError::Serialization("truncated".into()))
        }

        async fn save(&self, _progress: &SessionProgress) -> Result<(), StorageError> {
            Err(StorageError::Connection("disk full".into()))
        }
    }

    #[tokio::test]
    async fn every_mutation_is_persisted() {
        let repo = InMemoryRepository::new();
        let mut store = ProgressStore::load(Arc::new(repo.clone())).await;

        store.set_age(AgeTier::Older).await;
        store
            .record_answer(&"counting".into(), &"c1".into(), Verdict::Correct)
            .await;
        assert!(store.toggle_mute().await);
        assert_eq!(repo.save_count(), 3);

        let reloaded = ProgressStore::load(Arc::new(repo.clone())).await;
        assert_eq!(reloaded.progress(), store.progress());
        assert_eq!(reloaded.stars(), 1);
    }

    #[tokio::test]
    async fn stars_count_completed_tasks_once() {
        let mut store = ProgressStore::load(Arc::new(InMemoryRepository::new())).await;
        let topic = TopicId::new("counting");
        let task = TaskId::new("c1");

        let first = store.record_answer(&topic, &task, Verdict::Correct).await;
        let again = store.record_answer(&topic, &task, Verdict::Correct).await;
        assert!(first.newly_completed);
        assert!(!again.newly_completed);
        assert_eq!(again.stars, 1);
        assert_eq!(store.topic_progress(&topic).history().len(), 2);
    }

    #[tokio::test]
    async fn broken_backend_degrades_to_memory() {
        let mut store = ProgressStore::load(Arc::new(BrokenRepository)).await;
        assert_eq!(store.progress(), &SessionProgress::default());

        let outcome = store
            .record_answer(&"counting".into(), &"c1".into(), Verdict::Correct)
            .await;
        assert_eq!(outcome.stars, 1);
        assert_eq!(store.stars(), 1);
        assert_eq!(store.persist_failures(), 1);
    }

    #[tokio::test]
    async fn reset_returns_to_defaults() {
        let repo = InMemoryRepository::new();
        let mut store = ProgressStore::load(Arc::new(repo.clone())).await;
        store
            .record_answer(&"counting".into(), &"c1".into(), Verdict::Correct)
            .await;
        store.reset().await;

        assert_eq!(store.progress(), &SessionProgress::default());
        assert_eq!(store.topic_summary(&"counting".into()).completed, 0);
        let saved = ProgressRepository::load(&repo).await.unwrap();
        assert_eq!(saved, Some(SessionProgress::default()));
    }
}
